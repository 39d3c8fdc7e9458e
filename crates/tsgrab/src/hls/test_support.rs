// Shared fixtures for the pipeline tests: an in-memory HTTP origin and AES helpers.

use std::collections::HashMap;
use std::time::Duration;

use aes::Aes128;
use async_trait::async_trait;
use bytes::Bytes;
use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use parking_lot::Mutex;
use url::Url;

use crate::HttpFetch;
use crate::hls::HlsDownloaderError;

#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

struct Route {
    body: Bytes,
    failures_left: u32,
}

/// In-memory origin server. Unknown URLs answer 404, routes can be told to
/// fail a fixed number of times with a 503 before serving their body.
#[derive(Default)]
pub struct MockHttp {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.routes.lock().insert(
            url.to_string(),
            Route {
                body: body.into(),
                failures_left: 0,
            },
        );
        self
    }

    pub fn failing(self, url: &str, failures: u32) -> Self {
        if let Some(route) = self.routes.lock().get_mut(url) {
            route.failures_left = failures;
        }
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl HttpFetch for MockHttp {
    async fn get(&self, url: &Url, _timeout: Duration) -> Result<Bytes, HlsDownloaderError> {
        *self.calls.lock().entry(url.to_string()).or_default() += 1;

        let mut routes = self.routes.lock();
        let Some(route) = routes.get_mut(url.as_str()) else {
            return Err(HlsDownloaderError::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        };
        if route.failures_left > 0 {
            route.failures_left -= 1;
            return Err(HlsDownloaderError::HttpStatus {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(route.body.clone())
    }
}

pub fn encrypt_aes128(plain: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let encryptor = cbc::Encryptor::<Aes128>::new_from_slices(key, iv).unwrap();
    let mut buffer = vec![0u8; plain.len() + 16];
    buffer[..plain.len()].copy_from_slice(plain);
    let len = encryptor
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plain.len())
        .unwrap()
        .len();
    buffer.truncate(len);
    buffer
}

/// A fake transport stream chunk: `packets` packets of 188 bytes, each
/// starting with the sync byte and filled with `fill`.
pub fn ts_payload(fill: u8, packets: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(188 * packets);
    for _ in 0..packets {
        data.push(0x47);
        data.extend(std::iter::repeat_n(fill, 187));
    }
    data
}
