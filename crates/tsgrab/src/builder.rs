//! # Builder for DownloaderConfig
//!
//! Fluent construction of [`DownloaderConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tsgrab_engine::DownloaderConfig;
//! use tsgrab_engine::proxy::{ProxyAuth, ProxyConfig, ProxyType};
//!
//! let config = DownloaderConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_connect_timeout(Duration::from_secs(15))
//!     .with_user_agent("MyApp/1.0")
//!     .with_header("Referer", "https://example.com/")
//!     .build();
//!
//! let config_with_proxy = DownloaderConfig::builder()
//!     .with_proxy(ProxyConfig {
//!         url: "http://proxy.example.com:8080".to_string(),
//!         proxy_type: ProxyType::Http,
//!         auth: Some(ProxyAuth {
//!             username: "user".to_string(),
//!             password: "pass".to_string(),
//!         }),
//!     })
//!     .build();
//! # let _ = (config, config_with_proxy);
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::{DownloaderConfig, proxy::ProxyConfig};

/// Builder for creating DownloaderConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DownloaderConfig::default(),
        }
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout of pooled connections
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge headers into the current set; later values win
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set the proxy configuration
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false; // Explicit proxy overrides system proxy
        self
    }

    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        // Only set system proxy if no explicit proxy is configured
        if self.config.proxy.is_none() {
            self.config.use_system_proxy = use_system_proxy;
        }
        self
    }

    /// Set whether to accept invalid certificates
    ///
    /// # Warning
    /// This is unsafe and should only be used for testing or in controlled environments.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}

impl Default for DownloaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::{ProxyAuth, ProxyType};

    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = DownloaderConfigBuilder::new().build();
        assert_eq!(config.timeout, Duration::ZERO);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.follow_redirects);
        assert!(config.use_system_proxy);
        assert!(!config.danger_accept_invalid_certs);
        assert!(config.headers.contains_key(reqwest::header::ACCEPT));
    }

    #[test]
    fn test_builder_customization() {
        let config = DownloaderConfigBuilder::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_follow_redirects(false)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_system_proxy(false)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert!(!config.use_system_proxy);

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let before = DownloaderConfigBuilder::new().build().headers.len();
        let config = DownloaderConfigBuilder::new()
            .with_header("bad header name", "value")
            .build();
        assert_eq!(config.headers.len(), before);
    }

    #[test]
    fn test_proxy_configuration() {
        let proxy_config = ProxyConfig {
            url: "http://proxy.example.com:8080".to_string(),
            proxy_type: ProxyType::Http,
            auth: Some(ProxyAuth {
                username: "user".to_string(),
                password: "pass".to_string(),
            }),
        };

        let config_with_proxy = DownloaderConfigBuilder::new()
            .with_proxy(proxy_config.clone())
            .with_system_proxy(true)
            .build();

        assert!(!config_with_proxy.use_system_proxy);

        let stored_proxy = config_with_proxy.proxy.unwrap();
        assert_eq!(stored_proxy.url, proxy_config.url);
        assert_eq!(stored_proxy.auth.as_ref().unwrap().username, "user");
        assert_eq!(stored_proxy.auth.as_ref().unwrap().password, "pass");
        assert_eq!(stored_proxy.proxy_type, proxy_config.proxy_type);
    }
}
