// Segment scheduler: one task per segment, bounded by a semaphore, joined into a report.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::fetcher::{SegmentFailure, SegmentWorker, StoredSegment};

/// Outcome of every segment of one download, ordered by ordinal.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub total: usize,
    pub stored: Vec<StoredSegment>,
    pub failed: Vec<SegmentFailure>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.stored.len() == self.total
    }

    pub fn failed_ordinals(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.ordinal).collect()
    }

    pub fn bytes_stored(&self) -> u64 {
        self.stored.iter().map(|s| s.bytes).sum()
    }
}

pub struct SegmentScheduler {
    worker: Arc<SegmentWorker>,
    concurrency: usize,
}

impl SegmentScheduler {
    pub fn new(worker: Arc<SegmentWorker>, config: &HlsConfig) -> Self {
        Self {
            worker,
            concurrency: config
                .scheduler_config
                .download_concurrency
                .clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    /// Download segments `0..segment_count` and wait for all of them.
    ///
    /// At most `download_concurrency` workers run at once. Completion order
    /// does not matter: each worker owns its own `{ordinal}.ts`.
    pub async fn run(&self, segment_count: usize) -> DownloadReport {
        info!(
            segments = segment_count,
            concurrency = self.concurrency,
            "Starting segment downloads"
        );
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let tasks: Vec<_> = (0..segment_count)
            .map(|ordinal| {
                let worker = Arc::clone(&self.worker);
                let semaphore = Arc::clone(&semaphore);
                let task = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| SegmentFailure {
                        ordinal,
                        url: String::new(),
                        attempts: 0,
                        error: HlsDownloaderError::InternalError(format!(
                            "Download slot unavailable: {e}"
                        )),
                    })?;
                    worker.fetch_segment(ordinal).await
                });
                (ordinal, task)
            })
            .collect();

        let mut report = DownloadReport {
            total: segment_count,
            ..Default::default()
        };
        for (ordinal, task) in tasks {
            match task.await {
                Ok(Ok(stored)) => report.stored.push(stored),
                Ok(Err(failure)) => report.failed.push(failure),
                Err(join_error) => {
                    error!(ordinal, error = %join_error, "Segment task aborted");
                    report.failed.push(SegmentFailure {
                        ordinal,
                        url: String::new(),
                        attempts: 0,
                        error: HlsDownloaderError::InternalError(format!(
                            "Segment task aborted: {join_error}"
                        )),
                    });
                }
            }
        }

        info!(
            stored = report.stored.len(),
            failed = report.failed.len(),
            bytes = report.bytes_stored(),
            "Segment downloads finished"
        );
        report
    }
}
