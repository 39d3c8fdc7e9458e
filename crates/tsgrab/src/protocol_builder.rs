//! # Protocol Builders
//!
//! Fluent builder API for creating an [`HlsDownloader`] with a specific
//! configuration.

use std::{str::FromStr, time::Duration};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{
    DownloadError, DownloaderConfig,
    hls::{HlsDownloader, config::HlsConfig},
    proxy::ProxyConfig,
};

/// Builder for HLS downloaders
pub struct HlsProtocolBuilder {
    config: HlsConfig,
}

impl HlsProtocolBuilder {
    /// Create a new HLS protocol builder with default configuration
    pub fn new() -> Self {
        Self {
            config: HlsConfig::default(),
        }
    }

    pub fn with_base_config(mut self, base_config: DownloaderConfig) -> Self {
        self.config.base = base_config;
        self
    }

    // --- Base DownloaderConfig methods ---

    /// Set user agent for HTTP requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.base.user_agent = user_agent.into();
        self
    }

    /// Set overall HTTP timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.base.timeout = timeout;
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.base.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.base.read_timeout = timeout;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.base.follow_redirects = follow;
        self
    }

    /// Replace the HTTP headers
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.config.base.headers = headers;
        self
    }

    /// Add a single HTTP header. Invalid names or values are ignored.
    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.config.base.headers.insert(name, value);
        }
        self
    }

    pub fn proxy(mut self, proxy_config: ProxyConfig) -> Self {
        self.config.base.proxy = Some(proxy_config);
        self
    }

    /// Set whether to use system proxy settings
    pub fn use_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.base.use_system_proxy = use_system_proxy;
        self
    }

    /// Set whether to accept invalid TLS certificates (use with caution)
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.base.danger_accept_invalid_certs = accept;
        self
    }

    // --- HLS PlaylistConfig methods ---

    /// Set timeout for fetching master and media playlists.
    pub fn playlist_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.playlist_config.playlist_fetch_timeout = timeout;
        self
    }

    /// Set timeout for fetching a decryption key.
    pub fn key_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.playlist_config.key_fetch_timeout = timeout;
        self
    }

    // --- HLS SchedulerConfig methods ---

    /// Set maximum concurrent segment downloads.
    pub fn download_concurrency(mut self, concurrency: usize) -> Self {
        self.config.scheduler_config.download_concurrency = concurrency;
        self
    }

    // --- HLS FetcherConfig methods ---

    /// Set timeout for downloading a single segment.
    pub fn segment_download_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetcher_config.segment_download_timeout = timeout;
        self
    }

    /// Set maximum number of retries for downloading a segment.
    /// Alias for `max_segment_retries`.
    pub fn segment_retry_count(mut self, retries: u32) -> Self {
        self.config.fetcher_config.max_segment_retries = retries;
        self
    }

    pub fn max_segment_retries(mut self, retries: u32) -> Self {
        self.config.fetcher_config.max_segment_retries = retries;
        self
    }

    /// Set base delay for exponential backoff when retrying segment downloads.
    pub fn segment_retry_delay_base(mut self, delay: Duration) -> Self {
        self.config.fetcher_config.segment_retry_delay_base = delay;
        self
    }

    /// Set the upper bound of the backoff delay.
    pub fn segment_retry_delay_max(mut self, delay: Duration) -> Self {
        self.config.fetcher_config.segment_retry_delay_max = delay;
        self
    }

    // --- HLS OutputConfig methods ---

    /// Set the name of the assembled file inside the destination directory.
    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_config.output_file_name = name.into();
        self
    }

    /// Assemble the output even when some segments could not be downloaded.
    pub fn allow_partial(mut self, allow: bool) -> Self {
        self.config.output_config.allow_partial = allow;
        self
    }

    /// Delete the per-segment files once the output has been assembled.
    pub fn remove_segment_files(mut self, remove: bool) -> Self {
        self.config.output_config.remove_segment_files = remove;
        self
    }

    // --- General Builder Methods ---

    /// Access the raw HLS configuration for more advanced customization.
    pub fn with_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut HlsConfig),
    {
        f(&mut self.config);
        self
    }

    /// Get a copy of the current HLS configuration.
    pub fn get_config(&self) -> HlsConfig {
        self.config.clone()
    }

    pub fn build(self) -> Result<HlsDownloader, DownloadError> {
        HlsDownloader::new(self.config)
    }
}

impl Default for HlsProtocolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
