use url::Url;

/// Query keys that tie a link to a collection rather than a single video.
pub const COLLECTION_KEYS: &[&str] = &[
    "list",
    "index",
    "start_radio",
    "pp",
    "playlist",
    "playnext",
    "si",
    "t",
];

const SHORT_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];
const CANONICAL_HOST: &str = "www.youtube.com";

/// Canonicalizes a source link. Never fails: anything that cannot be parsed
/// comes back exactly as it was given.
pub fn normalize(url: &str, allow_playlist: bool) -> String {
    try_normalize(url, allow_playlist).unwrap_or_else(|| url.to_string())
}

fn try_normalize(raw: &str, allow_playlist: bool) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    let mut pairs = collapse_duplicates(parsed.query_pairs().into_owned());

    if SHORT_HOSTS.contains(&host.as_str()) {
        let video_id = parsed.path().trim_matches('/').to_string();
        if !video_id.is_empty() {
            if allow_playlist {
                pairs.retain(|(key, _)| key != "v");
                pairs.insert(0, ("v".to_string(), video_id));
            } else {
                pairs = vec![("v".to_string(), video_id)];
            }
        } else if !allow_playlist {
            strip_collection_keys(&mut pairs);
        }

        parsed.set_host(Some(CANONICAL_HOST)).ok()?;
        parsed.set_path("/watch");
        replace_query(&mut parsed, &pairs);
        return Some(parsed.into());
    }

    if host.contains("youtube.com") {
        if !allow_playlist {
            strip_collection_keys(&mut pairs);
        }
        replace_query(&mut parsed, &pairs);
        return Some(parsed.into());
    }

    // Other hosts are only rewritten when something was actually removed.
    if !allow_playlist {
        let before = pairs.len();
        strip_collection_keys(&mut pairs);
        if pairs.len() != before {
            replace_query(&mut parsed, &pairs);
            return Some(parsed.into());
        }
    }

    None
}

/// Repeated keys keep their first position and their last value.
fn collapse_duplicates(pairs: impl Iterator<Item = (String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for (key, value) in pairs {
        match out.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => out.push((key, value)),
        }
    }
    out
}

fn strip_collection_keys(pairs: &mut Vec<(String, String)>) {
    pairs.retain(|(key, _)| !COLLECTION_KEYS.contains(&key.as_str()));
}

fn replace_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    url.set_query(Some(&query));
}
