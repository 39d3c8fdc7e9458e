// Playlist resolution: manifest URL -> media playlist + fetched key material.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};
use url::Url;

use crate::HttpFetch;
use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::decryption::{KEY_LEN, parse_iv};
use crate::hls::playlist::{KeyId, KeyMethod, Playlist};

/// Secret bytes of one key plus its parsed IV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key: Bytes,
    pub iv: Option<[u8; 16]>,
}

/// Fetched key material by key handle. Filled once during resolution,
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct KeyMaterialTable {
    entries: HashMap<KeyId, KeyMaterial>,
}

impl KeyMaterialTable {
    pub fn get(&self, id: KeyId) -> Option<&KeyMaterial> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: KeyId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, id: KeyId, material: KeyMaterial) {
        self.entries.insert(id, material);
    }
}

/// Everything the download phase needs.
#[derive(Debug, Clone)]
pub struct ResolvedPlaylist {
    /// URL of the media playlist; relative segment URIs resolve against it
    pub base_url: Url,
    pub playlist: Playlist,
    pub keys: KeyMaterialTable,
}

impl ResolvedPlaylist {
    pub fn segment_count(&self) -> usize {
        self.playlist.segments.len()
    }

    /// Absolute URL of the segment at `ordinal`.
    pub fn segment_url(&self, ordinal: usize) -> Result<Url, HlsDownloaderError> {
        let segment = self.playlist.segments.get(ordinal).ok_or_else(|| {
            HlsDownloaderError::InternalError(format!("No segment with ordinal {ordinal}"))
        })?;
        join_url(&self.base_url, &segment.uri)
    }
}

pub struct PlaylistResolver {
    http: Arc<dyn HttpFetch>,
    config: Arc<HlsConfig>,
}

impl PlaylistResolver {
    pub fn new(http: Arc<dyn HttpFetch>, config: Arc<HlsConfig>) -> Self {
        Self { http, config }
    }

    /// Resolve a manifest URL into a download plan.
    ///
    /// A master playlist is followed through its first variant, once. Every
    /// AES-128 key referenced by a segment is fetched exactly once. Any
    /// failure here is final; retries belong to the download phase.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedPlaylist, HlsDownloaderError> {
        let url = Url::parse(url).map_err(|e| HlsDownloaderError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let (base_url, playlist) = self.load_media_playlist(url).await?;
        if playlist.segments.is_empty() {
            return Err(HlsDownloaderError::EmptyPlaylist(base_url.to_string()));
        }

        let keys = self.fetch_keys(&base_url, &playlist).await?;
        info!(
            url = %base_url,
            segments = playlist.segments.len(),
            keys = keys.len(),
            "Playlist resolved"
        );

        Ok(ResolvedPlaylist {
            base_url,
            playlist,
            keys,
        })
    }

    async fn load_playlist(&self, url: &Url) -> Result<Playlist, HlsDownloaderError> {
        let body = self
            .http
            .get(url, self.config.playlist_config.playlist_fetch_timeout)
            .await?;
        let text = String::from_utf8_lossy(&body);
        Ok(Playlist::from_text(&text)?)
    }

    async fn load_media_playlist(
        &self,
        url: Url,
    ) -> Result<(Url, Playlist), HlsDownloaderError> {
        let playlist = self.load_playlist(&url).await?;
        let Some(variant_uri) = playlist.variant_uris.first() else {
            return Ok((url, playlist));
        };

        if playlist.variant_uris.len() > 1 {
            debug!(
                variants = playlist.variant_uris.len(),
                "Master playlist lists several variants, following the first one"
            );
        }
        let variant_url = join_url(&url, variant_uri)?;
        info!(master = %url, variant = %variant_url, "Following master playlist");

        let media_playlist = self.load_playlist(&variant_url).await?;
        if media_playlist.is_master() {
            return Err(HlsDownloaderError::NestedMasterPlaylist(
                variant_url.to_string(),
            ));
        }
        Ok((variant_url, media_playlist))
    }

    async fn fetch_keys(
        &self,
        base_url: &Url,
        playlist: &Playlist,
    ) -> Result<KeyMaterialTable, HlsDownloaderError> {
        let mut table = KeyMaterialTable::default();

        for segment in &playlist.segments {
            let Some((key_id, key)) = playlist.segment_key(segment) else {
                continue;
            };
            if key.method == KeyMethod::None || table.contains(key_id) {
                continue;
            }

            let uri = key
                .uri
                .as_deref()
                .ok_or(HlsDownloaderError::MissingKeyUri(key_id.index()))?;
            let key_url = join_url(base_url, uri)?;
            let iv = key.iv.as_deref().map(parse_iv).transpose()?;

            let key_bytes = self
                .http
                .get(&key_url, self.config.playlist_config.key_fetch_timeout)
                .await?;
            if key_bytes.is_empty() {
                warn!(url = %key_url, "Key body is empty, segments using it will not be decrypted");
            } else if key_bytes.len() != KEY_LEN {
                return Err(HlsDownloaderError::InvalidKeyLength {
                    url: key_url.to_string(),
                    len: key_bytes.len(),
                });
            }
            debug!(url = %key_url, key = key_id.index(), "Fetched decryption key");

            table.insert(
                key_id,
                KeyMaterial {
                    key: key_bytes,
                    iv,
                },
            );
        }

        Ok(table)
    }
}

pub(crate) fn join_url(base: &Url, uri: &str) -> Result<Url, HlsDownloaderError> {
    base.join(uri).map_err(|e| HlsDownloaderError::InvalidUrl {
        url: uri.to_string(),
        reason: format!("could not join with {base}: {e}"),
    })
}
