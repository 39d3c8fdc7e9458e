//! # tsgrab
//!
//! A library for downloading segmented HLS (m3u8) media into a single file.
//!
//! ## Features
//!
//! - Line-compatible m3u8 parsing with master -> media playlist indirection
//! - AES-128 key resolution, fetching each distinct key exactly once
//! - Bounded-concurrency segment download with capped exponential backoff
//! - Crash-tolerant per-segment storage and ordered reassembly

pub mod builder;
pub mod config;
pub mod downloader;
pub mod error;
pub mod hls;
pub mod protocol_builder;
pub mod proxy;

pub use builder::DownloaderConfigBuilder;
pub use config::DownloaderConfig;
pub use error::DownloadError;

// Re-export downloader utilities
pub use downloader::{HttpClientFetcher, HttpFetch, create_client};

// Re-export protocol builders
pub use protocol_builder::HlsProtocolBuilder;

// Re-export proxy utilities
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
