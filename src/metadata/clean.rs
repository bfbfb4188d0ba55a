use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Decorative suffixes removed before lookup, applied in this order.
const DECORATION_PATTERNS: &[&str] = &[
    r"(?i)\s*\(Official Video\).*$",
    r"(?i)\s*\(Official Music Video\).*$",
    r"(?i)\s*\(Official Audio\).*$",
    r"(?i)\s*\(Lyric Video\).*$",
    r"(?i)\s*\(Live\).*$",
    r"(?i)\s*\(HD\).*$",
    r"(?i)\s*\(4K\).*$",
    r"(?i)\s*\[Official Video\].*$",
    r"(?i)\s*\[Official Music Video\].*$",
    r"(?i)\s*\[Official Audio\].*$",
    r"(?i)\s*- Topic$",
    r"(?i)\s*VEVO$",
];

fn decoration_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DECORATION_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// NFC composition, trimmed. Non-Latin scripts pass through intact.
pub fn normalize_text(text: &str) -> String {
    text.nfc().collect::<String>().trim().to_string()
}

pub fn clean_title(title: &str) -> String {
    let mut cleaned = normalize_text(title);
    for pattern in decoration_patterns() {
        cleaned = pattern.replace(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(decoration_patterns().len(), DECORATION_PATTERNS.len());
    }

    #[test]
    fn official_video_and_topic_are_removed() {
        assert_eq!(clean_title("Song Name (Official Video) - Topic"), "Song Name");
    }

    #[test]
    fn suffix_markers_are_case_insensitive() {
        assert_eq!(clean_title("Artist - Track [official audio]"), "Artist - Track");
        assert_eq!(clean_title("Track (LIVE) at Wembley"), "Track");
        assert_eq!(clean_title("Artist - Topic"), "Artist");
        assert_eq!(clean_title("Hit SingleVEVO"), "Hit Single");
    }

    #[test]
    fn plain_titles_are_kept() {
        assert_eq!(clean_title("  Bohemian Rhapsody  "), "Bohemian Rhapsody");
        assert_eq!(clean_title("Live Forever"), "Live Forever");
    }

    #[test]
    fn decomposed_text_is_composed() {
        let decomposed = "Cafe\u{301}";
        assert_eq!(normalize_text(decomposed), "Caf\u{e9}");
        assert_eq!(clean_title("سلام (Official Video)"), "سلام");
    }
}
