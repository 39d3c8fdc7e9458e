use std::time::Duration;

use crate::DownloaderConfig;

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct HlsConfig {
    /// Base downloader configuration
    pub base: DownloaderConfig,
    pub playlist_config: HlsPlaylistConfig,
    pub scheduler_config: HlsSchedulerConfig,
    pub fetcher_config: HlsFetcherConfig,
    pub output_config: HlsOutputConfig,
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct HlsPlaylistConfig {
    pub playlist_fetch_timeout: Duration,
    pub key_fetch_timeout: Duration,
}

impl Default for HlsPlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_fetch_timeout: Duration::from_secs(15),
            key_fetch_timeout: Duration::from_secs(5),
        }
    }
}

// --- Scheduler Configuration ---
#[derive(Debug, Clone)]
pub struct HlsSchedulerConfig {
    pub download_concurrency: usize, // Max concurrent segment downloads
}

impl Default for HlsSchedulerConfig {
    fn default() -> Self {
        Self {
            download_concurrency: 20,
        }
    }
}

// --- Fetcher Configuration ---
#[derive(Debug, Clone)]
pub struct HlsFetcherConfig {
    pub segment_download_timeout: Duration,
    /// Retries after the first attempt; a segment is tried at most `max_segment_retries + 1` times.
    pub max_segment_retries: u32,
    pub segment_retry_delay_base: Duration, // Base for exponential backoff
    pub segment_retry_delay_max: Duration,
}

impl Default for HlsFetcherConfig {
    fn default() -> Self {
        Self {
            segment_download_timeout: Duration::from_secs(60),
            max_segment_retries: 5,
            segment_retry_delay_base: Duration::from_millis(500),
            segment_retry_delay_max: Duration::from_secs(30),
        }
    }
}

impl HlsFetcherConfig {
    /// Backoff before the attempt following failed attempt number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.segment_retry_delay_base
            .saturating_mul(factor)
            .min(self.segment_retry_delay_max)
    }
}

// --- Output Configuration ---
#[derive(Debug, Clone)]
pub struct HlsOutputConfig {
    /// Name of the concatenated file inside the destination directory
    pub output_file_name: String,
    /// Assemble even when some segments failed for good
    pub allow_partial: bool,
    /// Delete the per-segment files after a successful assembly
    pub remove_segment_files: bool,
}

impl Default for HlsOutputConfig {
    fn default() -> Self {
        Self {
            output_file_name: "main.ts".to_string(),
            allow_partial: false,
            remove_segment_files: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_grows_exponentially() {
        let config = HlsFetcherConfig {
            segment_retry_delay_base: Duration::from_millis(100),
            segment_retry_delay_max: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_millis(100));
        assert_eq!(config.retry_delay(2), Duration::from_millis(200));
        assert_eq!(config.retry_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let config = HlsFetcherConfig {
            segment_retry_delay_base: Duration::from_secs(1),
            segment_retry_delay_max: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(config.retry_delay(10), Duration::from_secs(5));
        assert_eq!(config.retry_delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_reference_concurrency() {
        assert_eq!(HlsConfig::default().scheduler_config.download_concurrency, 20);
    }
}
