use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tsgrab_engine::hls::DownloadEvent;

fn segment_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} segments ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders download events as a single segment counter bar.
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
    disabled: bool,
}

impl ProgressManager {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(segment_style());
        Self {
            bar,
            disabled: false,
        }
    }

    pub fn new_disabled() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            disabled: true,
        }
    }

    pub fn handle_event(&self, event: DownloadEvent) {
        if self.disabled {
            return;
        }

        match event {
            DownloadEvent::PlaylistResolved { url, segments, .. } => {
                self.bar.set_length(segments as u64);
                self.bar.set_message(format!("Downloading {url}"));
                self.bar.enable_steady_tick(Duration::from_millis(500));
            }
            DownloadEvent::SegmentStored { .. } => self.bar.inc(1),
            DownloadEvent::SegmentRetry { ordinal, attempt, .. } => {
                self.bar
                    .set_message(format!("Retrying segment {ordinal} (attempt {attempt})"));
            }
            DownloadEvent::SegmentFailed { ordinal, .. } => {
                self.bar.inc(1);
                self.bar.set_message(format!("Segment {ordinal} failed"));
            }
            DownloadEvent::Assembled { path, .. } => {
                self.bar
                    .finish_with_message(format!("Finished {}", path.display()));
            }
        }
    }

    /// Stop the bar without marking it finished.
    pub fn abandon(&self) {
        if !self.disabled {
            self.bar.abandon();
        }
    }
}
