use std::path::{Path, PathBuf};

/// MPEG-TS packet sync byte
pub const TS_SYNC_BYTE: u8 = 0x47;

const SEGMENT_EXTENSION: &str = "ts";
const TEMP_SUFFIX: &str = "tmp";

/// Drop everything before the first sync byte. Data without any sync byte
/// is returned unchanged.
pub fn strip_to_sync_byte(data: &[u8]) -> &[u8] {
    match memchr::memchr(TS_SYNC_BYTE, data) {
        Some(pos) => &data[pos..],
        None => data,
    }
}

/// `{dir}/{ordinal}.ts`
pub fn segment_path(dir: &Path, ordinal: usize) -> PathBuf {
    dir.join(format!("{ordinal}.{SEGMENT_EXTENSION}"))
}

/// `{dir}/{ordinal}.ts.tmp`, the sibling a segment is written to before the rename
pub fn segment_temp_path(dir: &Path, ordinal: usize) -> PathBuf {
    dir.join(format!("{ordinal}.{SEGMENT_EXTENSION}.{TEMP_SUFFIX}"))
}

/// Whether `name` is one of the names segment files use (`{n}.ts`, `{n}.ts.tmp`).
pub fn is_segment_file_name(name: &str) -> bool {
    let stem = name
        .strip_suffix(&format!(".{SEGMENT_EXTENSION}.{TEMP_SUFFIX}"))
        .or_else(|| name.strip_suffix(&format!(".{SEGMENT_EXTENSION}")));
    stem.is_some_and(|stem| !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_garbage() {
        assert_eq!(strip_to_sync_byte(&[0x00, 0x10, 0x47, 0x01]), &[0x47, 0x01]);
        assert_eq!(strip_to_sync_byte(&[0x47, 0x00]), &[0x47, 0x00]);
    }

    #[test]
    fn test_no_sync_byte_keeps_data() {
        assert_eq!(strip_to_sync_byte(&[1, 2, 3]), &[1, 2, 3]);
        assert!(strip_to_sync_byte(&[]).is_empty());
    }

    #[test]
    fn test_segment_paths() {
        let dir = Path::new("/tmp/out");
        assert_eq!(segment_path(dir, 12), PathBuf::from("/tmp/out/12.ts"));
        assert_eq!(segment_temp_path(dir, 0), PathBuf::from("/tmp/out/0.ts.tmp"));
    }

    #[test]
    fn test_is_segment_file_name() {
        assert!(is_segment_file_name("0.ts"));
        assert!(is_segment_file_name("17.ts"));
        assert!(is_segment_file_name("3.ts.tmp"));
        assert!(!is_segment_file_name("main.ts"));
        assert!(!is_segment_file_name(".ts"));
        assert!(!is_segment_file_name("1.mp4"));
        assert!(!is_segment_file_name("v1.ts"));
    }
}
