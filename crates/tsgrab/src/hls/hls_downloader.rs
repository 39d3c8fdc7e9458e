use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::hls::HlsDownloaderError;
use crate::hls::assembler::{AssemblyOutcome, assemble, remove_segment_files};
use crate::hls::config::HlsConfig;
use crate::hls::events::{DownloadEvent, EventCallback};
use crate::hls::fetcher::SegmentWorker;
use crate::hls::resolver::{PlaylistResolver, ResolvedPlaylist};
use crate::hls::scheduler::{DownloadReport, SegmentScheduler};
use crate::hls::segment_utils::is_segment_file_name;
use crate::{DownloadError, HttpClientFetcher, HttpFetch, create_client};

/// Final result of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadSummary {
    /// URL of the media playlist that was downloaded
    pub playlist_url: String,
    pub report: DownloadReport,
    pub assembly: AssemblyOutcome,
}

pub struct HlsDownloader {
    http: Arc<dyn HttpFetch>,
    config: Arc<HlsConfig>,
    events: Option<EventCallback>,
}

impl HlsDownloader {
    pub fn new(config: HlsConfig) -> Result<Self, DownloadError> {
        let client = create_client(&config.base)?;
        Ok(Self::with_fetcher(
            config,
            Arc::new(HttpClientFetcher::new(client)),
        ))
    }

    /// Use a custom transport for every request.
    pub fn with_fetcher(config: HlsConfig, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            http,
            config: Arc::new(config),
            events: None,
        }
    }

    pub fn with_event_callback(mut self, events: EventCallback) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(events) = &self.events {
            events(event);
        }
    }

    /// Resolve `url` into a download plan without downloading any segment.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedPlaylist, HlsDownloaderError> {
        PlaylistResolver::new(Arc::clone(&self.http), Arc::clone(&self.config))
            .resolve(url)
            .await
    }

    /// Download the stream behind `url` into `dest_dir`.
    ///
    /// Segments land in `dest_dir/{ordinal}.ts` and are then concatenated
    /// into `dest_dir/{output_file_name}`.
    pub async fn download(
        &self,
        url: &str,
        dest_dir: impl AsRef<Path>,
    ) -> Result<DownloadSummary, DownloadError> {
        let dest_dir = dest_dir.as_ref();
        let output_config = &self.config.output_config;
        if is_segment_file_name(&output_config.output_file_name) {
            return Err(HlsDownloaderError::InvalidOutputName(
                output_config.output_file_name.clone(),
            )
            .into());
        }

        let plan = Arc::new(self.resolve(url).await?);
        let segment_count = plan.segment_count();
        self.emit(DownloadEvent::PlaylistResolved {
            url: plan.base_url.to_string(),
            segments: segment_count,
            keys: plan.keys.len(),
        });

        tokio::fs::create_dir_all(dest_dir).await?;

        let worker = SegmentWorker::new(
            Arc::clone(&self.http),
            Arc::clone(&plan),
            Arc::clone(&self.config),
            dest_dir,
        )
        .with_events(self.events.clone());
        let report = SegmentScheduler::new(Arc::new(worker), &self.config)
            .run(segment_count)
            .await;

        let failed = report.failed_ordinals();
        if !failed.is_empty() {
            if !output_config.allow_partial {
                error!(failed = ?failed, "Segments failed, not assembling output");
                return Err(HlsDownloaderError::SegmentsFailed { failed }.into());
            }
            warn!(failed = ?failed, "Assembling output without failed segments");
        }

        // Files left for failed ordinals belong to an earlier run
        let assembly = assemble(
            dest_dir,
            segment_count,
            &output_config.output_file_name,
            &failed,
        )
        .await?;
        self.emit(DownloadEvent::Assembled {
            path: assembly.path.clone(),
            bytes: assembly.bytes_written,
            skipped: assembly.skipped.clone(),
        });

        if output_config.remove_segment_files {
            remove_segment_files(dest_dir, segment_count).await;
        }

        info!(path = %assembly.path.display(), "Download complete");
        Ok(DownloadSummary {
            playlist_url: plan.base_url.to_string(),
            report,
            assembly,
        })
    }
}
