use std::sync::Arc;

/// Errors raised while turning manifest text into a [`Playlist`](super::Playlist).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PlaylistParseError {
    #[error("invalid m3u8, missing #EXTM3U in line 1")]
    MalformedHeader,
    #[error("invalid EXT-X-KEY at line {line}: {content}")]
    MalformedKeyTag { line: usize, content: String },
    #[error("unsupported EXT-X-KEY method {method} at line {line}")]
    UnsupportedCryptoMethod { method: String, line: usize },
    #[error("EXT-X-STREAM-INF at line {line} is not followed by a playlist URI")]
    MissingVariantUri { line: usize },
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum HlsDownloaderError {
    #[error("Playlist parse error: {0}")]
    Parse(#[from] PlaylistParseError),
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Playlist {0} does not contain any segment")]
    EmptyPlaylist(String),
    #[error("Variant playlist {0} is itself a master playlist")]
    NestedMasterPlaylist(String),
    #[error("AES-128 key #{0} has no URI")]
    MissingKeyUri(usize),
    #[error("Decryption key from {url} has incorrect length: {len} bytes (expected 16)")]
    InvalidKeyLength { url: String, len: usize },
    #[error("Failed to parse IV '{iv}': {reason}")]
    InvalidIv { iv: String, reason: String },
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("Network error: {source}")]
    NetworkError {
        #[from]
        source: Arc<reqwest::Error>,
    },
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: Arc<std::io::Error>,
    },
    #[error("Decryption error: {0}")]
    DecryptionError(String),
    #[error("Output name {0:?} collides with a segment file name")]
    InvalidOutputName(String),
    #[error("{} segment(s) failed to download: {failed:?}", .failed.len())]
    SegmentsFailed { failed: Vec<usize> },
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Manual implementation of From<reqwest::Error> for HlsDownloaderError
// because of the Arc wrapping.
impl From<reqwest::Error> for HlsDownloaderError {
    fn from(err: reqwest::Error) -> Self {
        HlsDownloaderError::NetworkError {
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for HlsDownloaderError {
    fn from(err: std::io::Error) -> Self {
        HlsDownloaderError::IoError {
            source: Arc::new(err),
        }
    }
}

impl HlsDownloaderError {
    /// Whether a segment attempt that failed with this error may be retried.
    /// Client errors (4xx) are final, except request timeout and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            HlsDownloaderError::HttpStatus { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            HlsDownloaderError::InvalidUrl { .. }
            | HlsDownloaderError::InvalidOutputName(_)
            | HlsDownloaderError::InternalError(_) => false,
            _ => true,
        }
    }
}
