use std::{sync::Arc, time::Duration};

use clap::Parser;
use error::AppError;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tsgrab_engine::{DownloaderConfig, HlsProtocolBuilder, ProxyAuth, ProxyConfig, ProxyType};

mod cli;
mod error;
mod utils;

use cli::CliArgs;
use utils::progress::ProgressManager;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

/// Build the proxy settings, `None` meaning "no explicit proxy".
fn proxy_config(args: &CliArgs) -> Result<Option<ProxyConfig>, AppError> {
    if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        return Ok(None);
    }
    let Some(proxy_url) = args.proxy.as_ref() else {
        return Ok(None);
    };

    let proxy_type = match args.proxy_type.as_str() {
        "http" => ProxyType::Http,
        "https" => ProxyType::Https,
        "socks5" => ProxyType::Socks5,
        "all" => ProxyType::All,
        other => {
            return Err(AppError::InvalidInput(format!(
                "Invalid proxy type: '{other}'"
            )));
        }
    };

    let auth = match (&args.proxy_user, &args.proxy_pass) {
        (Some(username), Some(password)) => Some(ProxyAuth {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    info!(
        proxy_url = %proxy_url,
        proxy_type = ?proxy_type,
        has_auth = auth.is_some(),
        "Using explicit proxy configuration for downloads"
    );
    Ok(Some(ProxyConfig {
        url: proxy_url.clone(),
        proxy_type,
        auth,
    }))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("tsgrab.log")?;

    let multi_writer = MakeWriterExt::and(std::io::stdout, log_file);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    if args.concurrency == 0 {
        return Err(AppError::InvalidInput(
            "Concurrency must be at least 1".to_string(),
        ));
    }

    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, segment={}s",
        args.timeout, args.connect_timeout, args.segment_timeout
    );

    let download_config = {
        let mut builder = DownloaderConfig::builder()
            .with_timeout(Duration::from_secs(args.timeout))
            .with_connect_timeout(Duration::from_secs(args.connect_timeout))
            .with_headers(utils::parse_headers(&args.headers));

        builder = match proxy_config(&args)? {
            Some(proxy) => builder.with_proxy(proxy),
            None => builder.with_system_proxy(!args.no_proxy),
        };
        builder.build()
    };

    let progress_manager = if args.show_progress {
        ProgressManager::new()
    } else {
        ProgressManager::new_disabled()
    };
    let events = progress_manager.clone();

    let downloader = HlsProtocolBuilder::new()
        .with_base_config(download_config)
        .download_concurrency(args.concurrency)
        .segment_retry_count(args.retries)
        .segment_retry_delay_base(Duration::from_millis(args.retry_delay))
        .segment_download_timeout(Duration::from_secs(args.segment_timeout))
        .output_file_name(args.output_name.as_str())
        .allow_partial(args.allow_partial)
        .remove_segment_files(args.remove_segments)
        .build()?
        .with_event_callback(Arc::new(move |event| events.handle_event(event)));

    info!(url = %args.url, output_dir = %args.output_dir.display(), "Starting download");
    let summary = match downloader.download(&args.url, &args.output_dir).await {
        Ok(summary) => summary,
        Err(e) => {
            progress_manager.abandon();
            return Err(e.into());
        }
    };

    let report = &summary.report;
    info!(
        segments = report.total,
        stored = report.stored.len(),
        bytes = report.bytes_stored(),
        "Segments downloaded"
    );
    if !summary.assembly.skipped.is_empty() {
        warn!(
            skipped = ?summary.assembly.skipped,
            "Output is missing segments"
        );
    }
    info!(
        path = %summary.assembly.path.display(),
        bytes = summary.assembly.bytes_written,
        "Output assembled"
    );
    Ok(())
}
