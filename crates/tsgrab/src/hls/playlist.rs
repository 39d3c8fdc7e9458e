// m3u8 parsing: turns manifest lines into segments, variant redirects and key references.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::hls::PlaylistParseError;

pub const PLAYLIST_HEADER: &str = "#EXTM3U";
const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";
const KEY_TAG: &str = "#EXT-X-KEY";
const MEDIA_SEQUENCE_TAG: &str = "#EXT-X-MEDIA-SEQUENCE:";

static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([a-zA-Z-]+)=("[^"]+"|[^",]+)"#).unwrap());

/// Encryption method of an `EXT-X-KEY` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyMethod {
    /// `NONE`, or no `METHOD` attribute at all
    #[default]
    None,
    /// `AES-128`: AES-128-CBC over the whole segment
    Aes128,
}

impl KeyMethod {
    fn from_attribute(value: Option<&str>) -> Result<Self, String> {
        match value.unwrap_or_default() {
            "" | "NONE" => Ok(KeyMethod::None),
            "AES-128" => Ok(KeyMethod::Aes128),
            other => Err(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMethod::None => "NONE",
            KeyMethod::Aes128 => "AES-128",
        }
    }
}

impl fmt::Display for KeyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of a [`Key`] inside its [`Playlist`].
///
/// Every `EXT-X-KEY` tag gets its own handle, even when two tags carry the
/// same URI; segments refer to keys only through these handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(usize);

impl KeyId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub method: KeyMethod,
    pub uri: Option<String>,
    /// Raw `IV` attribute text, usually `0x` followed by 32 hex digits
    pub iv: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// URI exactly as written in the playlist, possibly relative
    pub uri: String,
    pub key: Option<KeyId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    /// Media segments in playlist order. The index is the segment ordinal.
    pub segments: Vec<Segment>,
    /// Variant playlist URIs from `EXT-X-STREAM-INF`, in order
    pub variant_uris: Vec<String>,
    pub keys: Vec<Key>,
    /// Value of `EXT-X-MEDIA-SEQUENCE`, 0 when absent
    pub media_sequence: u64,
}

impl Playlist {
    /// Parse a whole manifest body.
    pub fn from_text(text: &str) -> Result<Self, PlaylistParseError> {
        let lines: Vec<&str> = text.lines().collect();
        parse_playlist(&lines)
    }

    /// A master playlist redirects to at least one variant playlist.
    pub fn is_master(&self) -> bool {
        !self.variant_uris.is_empty()
    }

    pub fn key(&self, id: KeyId) -> &Key {
        &self.keys[id.0]
    }

    pub fn segment_key(&self, segment: &Segment) -> Option<(KeyId, &Key)> {
        segment.key.map(|id| (id, self.key(id)))
    }

    fn push_key(&mut self, key: Key) -> KeyId {
        self.keys.push(key);
        KeyId(self.keys.len() - 1)
    }
}

/// Parse manifest lines into a [`Playlist`].
///
/// The first line must be `#EXTM3U`. Blank lines and unknown tags are
/// skipped. Every other non-tag line is a segment bound to the most recent
/// `EXT-X-KEY`.
pub fn parse_playlist<S: AsRef<str>>(lines: &[S]) -> Result<Playlist, PlaylistParseError> {
    let header = lines
        .first()
        .map(|line| line.as_ref().trim().trim_start_matches('\u{feff}'))
        .ok_or(PlaylistParseError::MalformedHeader)?;
    if header != PLAYLIST_HEADER {
        return Err(PlaylistParseError::MalformedHeader);
    }

    let mut playlist = Playlist::default();
    let mut active_key: Option<KeyId> = None;
    let mut index = 1;

    while index < lines.len() {
        let line_no = index + 1;
        let line = lines[index].as_ref().trim();
        index += 1;

        if line.is_empty() {
            continue;
        }

        if line.starts_with(STREAM_INF_TAG) {
            let uri = next_uri_line(lines, &mut index)
                .ok_or(PlaylistParseError::MissingVariantUri { line: line_no })?;
            playlist.variant_uris.push(uri.to_string());
        } else if !line.starts_with('#') {
            playlist.segments.push(Segment {
                uri: line.to_string(),
                key: active_key,
            });
        } else if line.starts_with(KEY_TAG) {
            let key = parse_key_tag(line, line_no)?;
            active_key = Some(playlist.push_key(key));
        } else if let Some(value) = line.strip_prefix(MEDIA_SEQUENCE_TAG) {
            // an unparsable sequence number is skipped like any unknown tag
            if let Ok(sequence) = value.trim().parse::<u64>() {
                playlist.media_sequence = sequence;
            }
        }
    }

    Ok(playlist)
}

// The URI of a variant is the next non-blank line; a tag there means it is missing.
fn next_uri_line<'a, S: AsRef<str>>(lines: &'a [S], index: &mut usize) -> Option<&'a str> {
    while let Some(next) = lines.get(*index) {
        *index += 1;
        let next = next.as_ref().trim();
        if next.is_empty() {
            continue;
        }
        if next.starts_with('#') {
            return None;
        }
        return Some(next);
    }
    None
}

fn parse_key_tag(line: &str, line_no: usize) -> Result<Key, PlaylistParseError> {
    let attributes = parse_attributes(line);
    if attributes.is_empty() {
        return Err(PlaylistParseError::MalformedKeyTag {
            line: line_no,
            content: line.to_string(),
        });
    }

    let method = KeyMethod::from_attribute(attributes.get("METHOD").map(String::as_str))
        .map_err(|method| PlaylistParseError::UnsupportedCryptoMethod {
            method,
            line: line_no,
        })?;

    Ok(Key {
        method,
        uri: attributes.get("URI").cloned(),
        iv: attributes.get("IV").cloned(),
    })
}

/// Extract `NAME=value` pairs from a tag line. Values may be quoted or bare.
pub fn parse_attributes(line: &str) -> HashMap<String, String> {
    ATTRIBUTE_REGEX
        .captures_iter(line)
        .map(|caps| (caps[1].to_string(), caps[2].trim_matches('"').to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Playlist, PlaylistParseError> {
        Playlist::from_text(text)
    }

    #[test]
    fn test_plain_media_playlist() {
        let playlist = parse("#EXTM3U\nseg1.ts\nseg2.ts\n").unwrap();
        assert_eq!(playlist.segments.len(), 2);
        assert!(playlist.segments.iter().all(|s| s.key.is_none()));
        assert!(playlist.keys.is_empty());
        assert!(!playlist.is_master());
    }

    #[test]
    fn test_segment_order_follows_source_lines() {
        let text = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n\n#EXTINF:10,\nc.ts\n#EXTINF:10,\na.ts\n\n#EXTINF:9.5,\nhttp://cdn.example.com/b.ts\n#EXT-X-ENDLIST\n";
        let playlist = parse(text).unwrap();
        let uris: Vec<&str> = playlist.segments.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, vec!["c.ts", "a.ts", "http://cdn.example.com/b.ts"]);
    }

    #[test]
    fn test_missing_header_always_fails() {
        for text in [
            "",
            "seg1.ts\n#EXTM3U\n",
            "\n#EXTM3U\nseg1.ts",
            "#EXT-X-VERSION:3\nseg.ts",
            "#EXTM3U8\nseg.ts",
        ] {
            assert_eq!(parse(text), Err(PlaylistParseError::MalformedHeader), "{text:?}");
        }
    }

    #[test]
    fn test_header_tolerates_bom_and_crlf() {
        let playlist = parse("\u{feff}#EXTM3U\r\nseg1.ts\r\n").unwrap();
        assert_eq!(playlist.segments[0].uri, "seg1.ts");
    }

    #[test]
    fn test_shared_key_across_segments() {
        let text = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key1\",IV=0x0102030405060708090a0b0c0d0e0f10\ns1.ts\ns2.ts\ns3.ts\n";
        let playlist = parse(text).unwrap();
        assert_eq!(playlist.keys.len(), 1);
        let ids: Vec<Option<KeyId>> = playlist.segments.iter().map(|s| s.key).collect();
        assert_eq!(ids, vec![Some(KeyId(0)); 3]);

        let key = playlist.key(KeyId(0));
        assert_eq!(key.method, KeyMethod::Aes128);
        assert_eq!(key.uri.as_deref(), Some("key1"));
        assert_eq!(key.iv.as_deref(), Some("0x0102030405060708090a0b0c0d0e0f10"));
    }

    #[test]
    fn test_key_binds_only_following_segments() {
        let text = "#EXTM3U\nclear.ts\n#EXT-X-KEY:METHOD=AES-128,URI=\"k\"\nenc.ts\n";
        let playlist = parse(text).unwrap();
        assert_eq!(playlist.segments[0].key, None);
        assert_eq!(playlist.segments[1].key, Some(KeyId(0)));
    }

    #[test]
    fn test_same_uri_key_tags_are_distinct() {
        let text = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"k\"\na.ts\n#EXT-X-KEY:METHOD=AES-128,URI=\"k\"\nb.ts\n";
        let playlist = parse(text).unwrap();
        assert_eq!(playlist.keys.len(), 2);
        assert_ne!(playlist.segments[0].key, playlist.segments[1].key);
    }

    #[test]
    fn test_aes_key_without_uri_parses() {
        let playlist = parse("#EXTM3U\n#EXT-X-KEY:METHOD=AES-128\nseg.ts\n").unwrap();
        let (_, key) = playlist.segment_key(&playlist.segments[0]).unwrap();
        assert_eq!(key.method, KeyMethod::Aes128);
        assert_eq!(key.uri, None);
    }

    #[test]
    fn test_method_none_and_missing_method() {
        let playlist =
            parse("#EXTM3U\n#EXT-X-KEY:METHOD=NONE\na.ts\n#EXT-X-KEY:URI=\"k\"\nb.ts\n").unwrap();
        assert_eq!(playlist.keys[0].method, KeyMethod::None);
        assert_eq!(playlist.keys[1].method, KeyMethod::None);
        assert_eq!(playlist.segments[1].key, Some(KeyId(1)));
    }

    #[test]
    fn test_unsupported_method() {
        let err = parse("#EXTM3U\n#EXT-X-KEY:METHOD=SAMPLE-AES,URI=\"k\"\na.ts\n").unwrap_err();
        assert_eq!(
            err,
            PlaylistParseError::UnsupportedCryptoMethod {
                method: "SAMPLE-AES".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn test_key_tag_without_attributes() {
        let err = parse("#EXTM3U\nseg.ts\n#EXT-X-KEY:\nseg2.ts\n").unwrap_err();
        assert!(matches!(
            err,
            PlaylistParseError::MalformedKeyTag { line: 3, .. }
        ));
    }

    #[test]
    fn test_master_playlist_variants() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\nhigh/index.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=640000\n\nlow/index.m3u8\n";
        let playlist = parse(text).unwrap();
        assert!(playlist.is_master());
        assert_eq!(playlist.variant_uris, vec!["high/index.m3u8", "low/index.m3u8"]);
        assert!(playlist.segments.is_empty());
    }

    #[test]
    fn test_stream_inf_without_uri() {
        assert_eq!(
            parse("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n"),
            Err(PlaylistParseError::MissingVariantUri { line: 2 })
        );
        assert_eq!(
            parse("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n#EXT-X-ENDLIST\n"),
            Err(PlaylistParseError::MissingVariantUri { line: 2 })
        );
    }

    #[test]
    fn test_media_sequence() {
        let playlist = parse("#EXTM3U\n#EXT-X-MEDIA-SEQUENCE:42\na.ts\n").unwrap();
        assert_eq!(playlist.media_sequence, 42);

        let playlist = parse("#EXTM3U\n#EXT-X-MEDIA-SEQUENCE:abc\na.ts\n").unwrap();
        assert_eq!(playlist.media_sequence, 0);
    }

    #[test]
    fn test_parse_attributes_quoted_and_bare() {
        let attributes = parse_attributes(
            "#EXT-X-KEY:METHOD=AES-128,URI=\"https://k.example.com/key?id=1,2\",IV=0xABCDEF",
        );
        assert_eq!(attributes["METHOD"], "AES-128");
        assert_eq!(attributes["URI"], "https://k.example.com/key?id=1,2");
        assert_eq!(attributes["IV"], "0xABCDEF");
    }
}
