use std::path::PathBuf;
use std::sync::Arc;

/// Progress notifications emitted while a download runs.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    PlaylistResolved {
        url: String,
        segments: usize,
        keys: usize,
    },
    SegmentStored {
        ordinal: usize,
        bytes: u64,
    },
    SegmentRetry {
        ordinal: usize,
        attempt: u32,
        error: String,
    },
    SegmentFailed {
        ordinal: usize,
        error: String,
    },
    Assembled {
        path: PathBuf,
        bytes: u64,
        skipped: Vec<usize>,
    },
}

pub type EventCallback = Arc<dyn Fn(DownloadEvent) + Send + Sync>;
