// Segment worker: download -> decrypt -> trim -> atomic store, with capped retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::HttpFetch;
use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::decryption::{decrypt_aes128, sequence_iv};
use crate::hls::events::{DownloadEvent, EventCallback};
use crate::hls::resolver::ResolvedPlaylist;
use crate::hls::segment_utils::{segment_path, segment_temp_path, strip_to_sync_byte};

/// A segment that reached its final `{ordinal}.ts` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSegment {
    pub ordinal: usize,
    pub path: PathBuf,
    pub bytes: u64,
    pub attempts: u32,
}

/// A segment given up on after exhausting its retries (or hitting a final error).
#[derive(Debug, Clone)]
pub struct SegmentFailure {
    pub ordinal: usize,
    pub url: String,
    pub attempts: u32,
    pub error: HlsDownloaderError,
}

pub struct SegmentWorker {
    http: Arc<dyn HttpFetch>,
    plan: Arc<ResolvedPlaylist>,
    config: Arc<HlsConfig>,
    dest_dir: PathBuf,
    events: Option<EventCallback>,
}

impl SegmentWorker {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        plan: Arc<ResolvedPlaylist>,
        config: Arc<HlsConfig>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            plan,
            config,
            dest_dir: dest_dir.into(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Option<EventCallback>) -> Self {
        self.events = events;
        self
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(events) = &self.events {
            events(event);
        }
    }

    /// Fetch, decrypt and store the segment at `ordinal`.
    ///
    /// Every step of an attempt restarts from the download on failure, up to
    /// `max_segment_retries` retries with exponential backoff. Client errors
    /// end the segment immediately.
    pub async fn fetch_segment(&self, ordinal: usize) -> Result<StoredSegment, SegmentFailure> {
        let url = self.plan.segment_url(ordinal).map_err(|error| SegmentFailure {
            ordinal,
            url: self
                .plan
                .playlist
                .segments
                .get(ordinal)
                .map(|s| s.uri.clone())
                .unwrap_or_default(),
            attempts: 0,
            error,
        })?;
        let fetcher_config = &self.config.fetcher_config;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_fetch(ordinal, &url).await {
                Ok(bytes) => {
                    debug!(ordinal, url = %url, bytes, attempts, "Segment stored");
                    self.emit(DownloadEvent::SegmentStored { ordinal, bytes });
                    return Ok(StoredSegment {
                        ordinal,
                        path: segment_path(&self.dest_dir, ordinal),
                        bytes,
                        attempts,
                    });
                }
                Err(error) => {
                    if !error.is_retryable() || attempts > fetcher_config.max_segment_retries {
                        warn!(ordinal, url = %url, attempts, error = %error, "Giving up on segment");
                        self.emit(DownloadEvent::SegmentFailed {
                            ordinal,
                            error: error.to_string(),
                        });
                        return Err(SegmentFailure {
                            ordinal,
                            url: url.to_string(),
                            attempts,
                            error,
                        });
                    }

                    let delay = fetcher_config.retry_delay(attempts);
                    warn!(
                        ordinal,
                        url = %url,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Segment attempt failed, retrying"
                    );
                    self.emit(DownloadEvent::SegmentRetry {
                        ordinal,
                        attempt: attempts,
                        error: error.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_fetch(&self, ordinal: usize, url: &Url) -> Result<u64, HlsDownloaderError> {
        let raw = self
            .http
            .get(url, self.config.fetcher_config.segment_download_timeout)
            .await?;
        let data = self.decrypt_if_needed(ordinal, raw)?;
        let payload = strip_to_sync_byte(&data);
        self.store(ordinal, payload).await?;
        Ok(payload.len() as u64)
    }

    fn decrypt_if_needed(&self, ordinal: usize, raw: Bytes) -> Result<Bytes, HlsDownloaderError> {
        let playlist = &self.plan.playlist;
        let segment = playlist.segments.get(ordinal).ok_or_else(|| {
            HlsDownloaderError::InternalError(format!("No segment with ordinal {ordinal}"))
        })?;

        // METHOD=NONE keys never get material
        let Some(material) = segment.key.and_then(|id| self.plan.keys.get(id)) else {
            return Ok(raw);
        };
        if material.key.is_empty() {
            return Ok(raw);
        }

        let iv = material
            .iv
            .unwrap_or_else(|| sequence_iv(playlist.media_sequence.wrapping_add(ordinal as u64)));
        decrypt_aes128(&raw, &material.key, &iv)
    }

    async fn store(&self, ordinal: usize, payload: &[u8]) -> Result<(), HlsDownloaderError> {
        let temp_path = segment_temp_path(&self.dest_dir, ordinal);
        let final_path = segment_path(&self.dest_dir, ordinal);

        if let Err(e) = write_and_rename(&temp_path, &final_path, payload).await {
            match tokio::fs::remove_file(&temp_path).await {
                Ok(()) => {}
                Err(remove_err) if remove_err.kind() == std::io::ErrorKind::NotFound => {}
                Err(remove_err) => warn!(
                    path = %temp_path.display(),
                    error = %remove_err,
                    "Failed to remove temporary segment file"
                ),
            }
            return Err(e.into());
        }
        Ok(())
    }
}

async fn write_and_rename(temp_path: &Path, final_path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(temp_path).await?;
    file.write_all(payload).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(temp_path, final_path).await
}
