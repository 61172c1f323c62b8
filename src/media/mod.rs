//! Media re-hosting: pull bytes from the messaging gateway, push them into
//! private object storage.
//!
//! Gateways commonly hand out media URLs pointing at their own loopback
//! interface, and different gateway generations disagree on which auth
//! header they expect. Both quirks are absorbed here so the rest of the
//! pipeline only ever sees an opaque storage reference.

use crate::config::GatewayConfig;
use crate::errors::LeadcrabError;
use crate::storage::{MediaReference, ObjectStorage};
use crate::utils::http::{default_http_client, limited_body};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// Hard cap on a single media download.
pub const MAX_MEDIA_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Exact Content-Type to extension table, checked before any substring
/// matching so `audio/mp4` lands on `m4a` rather than `mp4`.
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("audio/ogg", "ogg"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/wav", "wav"),
    ("video/mp4", "mp4"),
    ("video/3gpp", "3gp"),
    ("video/webm", "webm"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("text/plain", "txt"),
];

pub struct MediaIngestor {
    client: reqwest::Client,
    storage: Arc<dyn ObjectStorage>,
    gateway: Option<GatewayConfig>,
}

impl MediaIngestor {
    pub fn new(storage: Arc<dyn ObjectStorage>, gateway: Option<GatewayConfig>) -> Self {
        Self {
            client: default_http_client(),
            storage,
            gateway,
        }
    }

    /// Download `media_url` and re-host it under a per-lead path.
    ///
    /// Returns `None` on any failure — the caller persists the message
    /// without media rather than failing the whole ingest.
    pub async fn ingest(
        &self,
        media_url: &str,
        message_type: &str,
        lead_id: i64,
    ) -> Option<MediaReference> {
        match self.try_ingest(media_url, message_type, lead_id).await {
            Ok(reference) => Some(reference),
            Err(e) => {
                error!("media ingest: lead {}: {:#}", lead_id, e);
                None
            }
        }
    }

    async fn try_ingest(
        &self,
        media_url: &str,
        message_type: &str,
        lead_id: i64,
    ) -> Result<MediaReference> {
        let url = normalize_media_url(media_url)?;
        let url = rewrite_loopback(url, self.gateway_base().as_ref());
        debug!("media ingest: fetching {}", url);

        let resp = self.fetch(&url).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = limited_body(resp, MAX_MEDIA_BYTES).await?;
        if bytes.is_empty() {
            bail!("gateway returned an empty body for {}", url);
        }

        let ext = extension_for(&content_type, message_type);
        let path = format!(
            "leads/{}/{}_{:08x}.{}",
            lead_id,
            Utc::now().format("%Y%m%d_%H%M%S"),
            fastrand::u32(..),
            ext
        );
        self.storage
            .put(&path, &bytes, &content_type)
            .await
            .with_context(|| format!("storage upload failed for {}", path))?;

        let reference = MediaReference::new(self.storage.bucket(), path);
        info!(
            "media ingest: stored {} ({} bytes) as {}",
            url,
            bytes.len(),
            reference
        );
        Ok(reference)
    }

    /// Fetch with gateway auth when the URL targets the gateway itself.
    ///
    /// First attempt carries `X-Api-Key` and `Authorization: Bearer`
    /// together — one round trip covers both common gateway generations. A
    /// 401 retries with the bare `Authorization: <key>` form before giving
    /// up with a single collapsed error.
    async fn fetch(&self, url: &Url) -> Result<reqwest::Response> {
        let key = self
            .gateway
            .as_ref()
            .filter(|g| !g.api_key.is_empty() && self.targets_gateway(url))
            .map(|g| g.api_key.clone());

        let Some(key) = key else {
            let resp = self.client.get(url.clone()).send().await?;
            return ensure_success(resp, url);
        };

        let resp = self
            .client
            .get(url.clone())
            .header("X-Api-Key", key.as_str())
            .header(AUTHORIZATION, format!("Bearer {}", key))
            .send()
            .await?;
        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return ensure_success(resp, url);
        }

        debug!("media ingest: gateway rejected keyed headers, trying bare Authorization");
        let resp = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, key.as_str())
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Collapse the per-format diagnostics into one boundary error
            return Err(LeadcrabError::Gateway {
                message: format!("all auth header formats rejected for {}", url),
                auth_exhausted: true,
            }
            .into());
        }
        ensure_success(resp, url)
    }

    fn gateway_base(&self) -> Option<Url> {
        self.gateway
            .as_ref()
            .and_then(|g| g.base_url.as_deref())
            .and_then(|base| Url::parse(base).ok())
    }

    fn targets_gateway(&self, url: &Url) -> bool {
        let Some(base) = self.gateway_base() else {
            return false;
        };
        url.host_str() == base.host_str()
            && url.port_or_known_default() == base.port_or_known_default()
    }
}

fn ensure_success(resp: reqwest::Response, url: &Url) -> Result<reqwest::Response> {
    if !resp.status().is_success() {
        bail!("gateway returned {} for {}", resp.status(), url);
    }
    Ok(resp)
}

/// Parse a media URL, prepending `https://` when the gateway omitted the
/// scheme.
pub(crate) fn normalize_media_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("empty media URL");
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Url::parse(&with_scheme).with_context(|| format!("invalid media URL: {}", raw))
}

/// Swap a loopback host for the gateway's real scheme/host/port, keeping
/// the media URL's path and query.
pub(crate) fn rewrite_loopback(url: Url, gateway_base: Option<&Url>) -> Url {
    let Some(base) = gateway_base else {
        return url;
    };
    if !matches!(url.host_str(), Some("localhost" | "127.0.0.1")) {
        return url;
    }
    let mut rewritten = base.clone();
    rewritten.set_path(url.path());
    rewritten.set_query(url.query());
    rewritten
}

/// Map a response Content-Type to a file extension: exact table entry
/// first, then substring, then a fallback keyed on the message type.
pub(crate) fn extension_for(content_type: &str, message_type: &str) -> &'static str {
    let ct = content_type.to_lowercase();
    let bare = ct.split(';').next().unwrap_or("").trim();

    if let Some(&(_, ext)) = EXTENSION_TABLE.iter().find(|(mime, _)| *mime == bare) {
        return ext;
    }
    if let Some(&(_, ext)) = EXTENSION_TABLE.iter().find(|(mime, _)| ct.contains(mime)) {
        return ext;
    }

    match message_type {
        "audio" => "ogg",
        "video" => "mp4",
        "image" => "jpg",
        "sticker" => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests;
