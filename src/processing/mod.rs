pub mod artwork;
pub mod readiness;
pub mod tagger;

use id3::frame::{Comment, Picture, PictureType};
use id3::{Tag, TagLike, Version};
use serde::Serialize;
use std::path::Path;

use crate::errors::Result;
use crate::metadata::CandidateTrack;

pub use tagger::TagWriter;

/// Frames cleared before every write so reruns never leave stale duplicates.
const CLEARED_FRAMES: &[&str] = &[
    "TIT2", "TPE1", "TALB", "TPE2", "TCON", "TYER", "TDRC", "TRCK", "COMM", "TSSE",
];

pub fn provenance_comment(source_id: &str) -> String {
    let source_id = source_id.trim();
    if source_id.is_empty() {
        "Downloaded from YouTube".to_string()
    } else {
        format!("YouTube: {}", source_id)
    }
}

/// Everything written into one file's tag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagSet {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub genre: String,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub comment: String,
    pub encoder: String,
    #[serde(skip)]
    pub cover: Option<Vec<u8>>,
}

impl TagSet {
    pub fn from_track(track: &CandidateTrack, source_id: &str, encoder: &str) -> Self {
        Self {
            title: track.title.trim().to_string(),
            artist: track.artist.trim().to_string(),
            album: track.album.trim().to_string(),
            album_artist: track.album_artist.trim().to_string(),
            genre: track.genre.trim().to_string(),
            year: track.year.filter(|y| *y > 0),
            track_number: track.track_number.filter(|n| *n > 0),
            comment: provenance_comment(source_id),
            encoder: encoder.to_string(),
            cover: None,
        }
    }

    pub fn with_cover(mut self, cover: Option<Vec<u8>>) -> Self {
        self.cover = cover.filter(|bytes| !bytes.is_empty());
        self
    }

    /// Blocking. Rewrites the file's ID3v2.3 tag in place.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Tag::new(),
            Err(e) => return Err(e.into()),
        };

        for id in CLEARED_FRAMES {
            tag.remove(*id);
        }

        if !self.title.is_empty() {
            tag.set_title(self.title.as_str());
        }
        if !self.artist.is_empty() {
            tag.set_artist(self.artist.as_str());
        }
        if !self.album.is_empty() {
            tag.set_album(self.album.as_str());
        }
        if !self.album_artist.is_empty() {
            tag.set_album_artist(self.album_artist.as_str());
        }
        if !self.genre.is_empty() {
            tag.set_genre(self.genre.as_str());
        }
        if let Some(year) = self.year {
            tag.set_year(year);
        }
        if let Some(track) = self.track_number {
            tag.set_track(track);
        }

        tag.add_frame(Comment {
            lang: "eng".to_string(),
            description: String::new(),
            text: self.comment.clone(),
        });
        if !self.encoder.is_empty() {
            tag.set_text("TSSE", self.encoder.as_str());
        }

        if let Some(cover) = &self.cover {
            tag.remove_all_pictures();
            tag.add_frame(Picture {
                mime_type: artwork::sniff_mime(cover).to_string(),
                picture_type: PictureType::CoverFront,
                description: "Cover".to_string(),
                data: cover.clone(),
            });
        }

        tag.write_to_path(path, Version::Id3v23)?;
        Ok(())
    }
}

/// A short run of silent MPEG-1 Layer III frames: enough for a decoder probe.
#[cfg(test)]
pub(crate) fn synthetic_mp3(frames: usize) -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    frame.repeat(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_track() -> CandidateTrack {
        let mut track = CandidateTrack::new("Song", "Band");
        track.album = "Album".to_string();
        track.genre = "Rock".to_string();
        track.year = Some(2019);
        track.track_number = Some(4);
        track
    }

    #[test]
    fn comment_mentions_source() {
        assert_eq!(provenance_comment("abc123"), "YouTube: abc123");
        assert_eq!(provenance_comment(""), "Downloaded from YouTube");
    }

    #[test]
    fn writes_fields_comment_and_encoder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, synthetic_mp3(20)).unwrap();

        TagSet::from_track(&sample_track(), "abc123", "yt-audio-dl")
            .write_to(&path)
            .unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.version(), Version::Id3v23);
        assert_eq!(tag.title(), Some("Song"));
        assert_eq!(tag.artist(), Some("Band"));
        assert_eq!(tag.album(), Some("Album"));
        assert_eq!(tag.album_artist(), Some("Band"));
        assert_eq!(tag.genre(), Some("Rock"));
        assert_eq!(tag.year(), Some(2019));
        assert_eq!(tag.track(), Some(4));
        assert_eq!(tag.comments().map(|c| c.text.as_str()).collect::<Vec<_>>(), ["YouTube: abc123"]);
        assert_eq!(tag.get("TSSE").and_then(|f| f.content().text()), Some("yt-audio-dl"));
    }

    #[test]
    fn rewrite_leaves_no_stale_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, synthetic_mp3(20)).unwrap();

        let first = TagSet::from_track(&sample_track(), "abc123", "enc").with_cover(Some(vec![0xFF, 0xD8, 0xFF]));
        first.write_to(&path).unwrap();

        let sparse = CandidateTrack::new("Other", "Someone");
        TagSet::from_track(&sparse, "xyz", "enc")
            .with_cover(Some(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]))
            .write_to(&path)
            .unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.title(), Some("Other"));
        assert_eq!(tag.album(), None);
        assert_eq!(tag.genre(), None);
        assert_eq!(tag.year(), None);
        assert_eq!(tag.comments().count(), 1);

        let pictures: Vec<_> = tag.pictures().collect();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].mime_type, "image/png");
        assert_eq!(pictures[0].picture_type, PictureType::CoverFront);
    }

    #[test]
    fn without_new_cover_existing_picture_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, synthetic_mp3(20)).unwrap();

        TagSet::from_track(&sample_track(), "a", "enc")
            .with_cover(Some(vec![0xFF, 0xD8, 0xFF]))
            .write_to(&path)
            .unwrap();
        TagSet::from_track(&sample_track(), "a", "enc").write_to(&path).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.pictures().count(), 1);
    }
}
