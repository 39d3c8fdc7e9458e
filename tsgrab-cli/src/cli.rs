use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "HLS (m3u8) stream downloader",
    long_about = "Downloads every segment of an HLS media playlist, decrypting AES-128\n\
                  protected segments, and concatenates them into a single file.\n\
                  A master playlist is followed through its first variant."
)]
pub struct CliArgs {
    /// Manifest URL
    #[arg(required = true, help = "URL of the m3u8 playlist to download")]
    pub url: String,

    /// Output directory for segments and the assembled file
    #[arg(
        short,
        long,
        default_value = "./temp",
        help = "Directory where segment files and the assembled output are written"
    )]
    pub output_dir: PathBuf,

    /// Assembled file name
    #[arg(
        short = 'n',
        long = "name",
        default_value = "main.ts",
        help = "File name of the assembled output inside the output directory"
    )]
    pub output_name: String,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Number of concurrent segment downloads
    #[arg(
        short = 'c',
        long,
        default_value = "20",
        help = "Maximum number of concurrent segment downloads"
    )]
    pub concurrency: usize,

    /// Segment retry attempts
    #[arg(
        long,
        default_value = "5",
        help = "Number of retries for a failing segment before giving up"
    )]
    pub retries: u32,

    /// Base retry delay in milliseconds
    #[arg(
        long,
        default_value = "500",
        help = "Base delay in milliseconds for exponential backoff between segment retries"
    )]
    pub retry_delay: u64,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Overall timeout in seconds for HTTP requests (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Segment timeout in seconds
    #[arg(
        long,
        default_value = "60",
        help = "Timeout in seconds for downloading a single segment"
    )]
    pub segment_timeout: u64,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Proxy type (http, https, socks5, all)
    #[arg(
        long,
        default_value = "http",
        help = "Proxy type (http, https, socks5, all)",
        value_parser = ["http", "https", "socks5", "all"]
    )]
    pub proxy_type: String,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    /// Assemble even if some segments failed
    #[arg(
        long,
        help = "Assemble the output even when some segments could not be downloaded"
    )]
    pub allow_partial: bool,

    /// Delete segment files after assembly
    #[arg(long, help = "Delete the per-segment files once the output is assembled")]
    pub remove_segments: bool,

    /// Show progress bar
    #[arg(
        short = 'P',
        long = "progress",
        help = "Show a progress bar for segment downloads"
    )]
    pub show_progress: bool,
}
