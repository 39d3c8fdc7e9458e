// HLS download pipeline: parse -> resolve -> fetch/decrypt/store -> assemble

pub mod assembler;
pub mod config;
pub mod decryption;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod hls_downloader;
pub mod playlist;
pub mod resolver;
pub mod scheduler;
pub(crate) mod segment_utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for easier access
pub use assembler::{AssemblyOutcome, assemble};
pub use config::HlsConfig;
pub use error::{HlsDownloaderError, PlaylistParseError};
pub use events::{DownloadEvent, EventCallback};
pub use fetcher::{SegmentFailure, SegmentWorker, StoredSegment};
pub use hls_downloader::{DownloadSummary, HlsDownloader};
pub use playlist::{Key, KeyId, KeyMethod, Playlist, Segment, parse_playlist};
pub use resolver::{KeyMaterial, KeyMaterialTable, PlaylistResolver, ResolvedPlaylist};
pub use scheduler::{DownloadReport, SegmentScheduler};
