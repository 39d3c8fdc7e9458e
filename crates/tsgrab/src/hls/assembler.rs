// Assembler: concatenates {ordinal}.ts files in ordinal order into the final output.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::hls::HlsDownloaderError;
use crate::hls::segment_utils::{is_segment_file_name, segment_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Ordinals left out: excluded by the caller, missing or unreadable
    pub skipped: Vec<usize>,
}

/// Concatenate `0.ts ..= {segment_count - 1}.ts` from `dest_dir` into
/// `dest_dir/output_name`, truncating any previous output.
///
/// Ordinals in `excluded` are never read, whatever is on disk for them. A
/// segment file that cannot be read is logged and left out. Failing to create
/// or write the output file is an error, and so is an `output_name` that is a
/// segment file name.
pub async fn assemble(
    dest_dir: &Path,
    segment_count: usize,
    output_name: &str,
    excluded: &[usize],
) -> Result<AssemblyOutcome, HlsDownloaderError> {
    if is_segment_file_name(output_name) {
        return Err(HlsDownloaderError::InvalidOutputName(
            output_name.to_string(),
        ));
    }
    let output_path = dest_dir.join(output_name);
    let mut writer = BufWriter::new(File::create(&output_path).await?);

    let mut bytes_written = 0u64;
    let mut skipped = Vec::new();
    for ordinal in 0..segment_count {
        if excluded.contains(&ordinal) {
            debug!(ordinal, "Leaving out failed segment");
            skipped.push(ordinal);
            continue;
        }
        let path = segment_path(dest_dir, ordinal);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(ordinal, path = %path.display(), error = %e, "Skipping unreadable segment");
                skipped.push(ordinal);
                continue;
            }
        };
        writer.write_all(&data).await?;
        bytes_written += data.len() as u64;
    }

    writer.flush().await?;
    writer.get_ref().sync_all().await?;

    info!(
        path = %output_path.display(),
        bytes = bytes_written,
        skipped = skipped.len(),
        "Output assembled"
    );
    Ok(AssemblyOutcome {
        path: output_path,
        bytes_written,
        skipped,
    })
}

/// Delete the per-segment files. Errors are only logged.
pub async fn remove_segment_files(dest_dir: &Path, segment_count: usize) {
    for ordinal in 0..segment_count {
        let path = segment_path(dest_dir, ordinal);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove segment file"),
        }
    }
    debug!(segments = segment_count, "Segment files removed");
}
