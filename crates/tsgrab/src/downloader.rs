use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info, trace};
use url::Url;

use crate::hls::HlsDownloaderError;
use crate::{DownloadError, DownloaderConfig, proxy::build_proxy_from_config};

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(20)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.pool_idle_timeout(config.read_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        // Explicit proxy configuration takes precedence
        let proxy = build_proxy_from_config(proxy_config).map_err(DownloadError::ProxyError)?;
        client_builder = client_builder.proxy(proxy);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy for downloads");
    } else if config.use_system_proxy {
        // reqwest picks up system proxy settings unless no_proxy() is called
        debug!("Using system proxy settings for downloads");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled for downloads");
    }

    client_builder.build().map_err(DownloadError::from)
}

/// Plain HTTP GET of a whole resource. Playlists, keys and segments all go
/// through this seam.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch `url` and return the full response body.
    /// A zero `timeout` means no per-request timeout.
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Bytes, HlsDownloaderError>;
}

pub struct HttpClientFetcher {
    http_client: Client,
}

impl HttpClientFetcher {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    pub fn client(&self) -> &Client {
        &self.http_client
    }
}

#[async_trait]
impl HttpFetch for HttpClientFetcher {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Bytes, HlsDownloaderError> {
        let mut request_builder = self.http_client.get(url.clone());
        if !timeout.is_zero() {
            request_builder = request_builder.timeout(timeout);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HlsDownloaderError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        trace!(url = %url, len = body.len(), "Fetched resource");
        Ok(body)
    }
}
