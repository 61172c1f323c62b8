//! Webhook receiver for inbound gateway events.
//!
//! One POST endpoint, optionally protected by an HMAC-SHA256 shared
//! secret. Gateway deployments in the field speak two dialects — English
//! and Portuguese field names — which are absorbed by serde aliases right
//! here at the boundary; nothing bilingual leaks into the pipeline.

use crate::config::ServerConfig;
use crate::ingest::{InboundEvent, IngestOutcome, IngestPipeline};
use anyhow::Result;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Max webhook payload size: 1 MB.
const WEBHOOK_MAX_BODY: usize = 1_048_576;

#[derive(Clone)]
pub struct WebhookState {
    pipeline: Arc<IngestPipeline>,
    webhook_secret: Option<String>,
}

impl WebhookState {
    pub fn new(pipeline: Arc<IngestPipeline>, webhook_secret: Option<String>) -> Self {
        Self {
            pipeline,
            webhook_secret,
        }
    }
}

/// Inbound payload in either field dialect.
#[derive(Debug, Deserialize)]
pub struct InboundPayload {
    #[serde(rename = "chatId", alias = "chat_id", alias = "phone", alias = "telefone")]
    pub chat_id: String,
    #[serde(rename = "type", alias = "tipo", default)]
    pub message_type: String,
    #[serde(default, alias = "body", alias = "mensagem")]
    pub content: String,
    #[serde(default, rename = "mediaUrl", alias = "media_url", alias = "urlMidia")]
    pub media_url: Option<String>,
    #[serde(default, alias = "pushName", alias = "nome")]
    pub name: Option<String>,
}

impl From<InboundPayload> for InboundEvent {
    fn from(payload: InboundPayload) -> Self {
        Self {
            chat_id: payload.chat_id,
            message_type: payload.message_type,
            content: payload.content,
            media_url: payload.media_url,
            sender_name: payload.name,
        }
    }
}

/// Response body: the caller distinguishes skip from error without log
/// scraping.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(rename = "leadId", skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<i64>,
}

/// Validate an `X-Webhook-Signature` header: hex HMAC-SHA256 over the raw
/// body, optionally prefixed with `sha256=`. Constant-time compare.
pub fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    expected.as_slice().ct_eq(&provided).into()
}

async fn webhook_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    if body.len() > WEBHOOK_MAX_BODY {
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }

    if let Some(secret) = &state.webhook_secret {
        let Some(signature) = headers
            .get("X-Webhook-Signature")
            .and_then(|v| v.to_str().ok())
        else {
            warn!("webhook: missing X-Webhook-Signature header");
            return StatusCode::FORBIDDEN.into_response();
        };
        if !validate_webhook_signature(secret, signature, &body) {
            warn!("webhook: invalid signature");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let payload: InboundPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            debug!("webhook: unparseable payload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(IngestResponse {
                    status: "error",
                    reason: Some("invalid_payload"),
                    lead_id: None,
                }),
            )
                .into_response();
        }
    };

    let event = InboundEvent::from(payload);
    match state.pipeline.process(&event).await {
        Ok(IngestOutcome::Accepted { lead, .. }) => (
            StatusCode::OK,
            axum::Json(IngestResponse {
                status: "accepted",
                reason: None,
                lead_id: Some(lead.id),
            }),
        )
            .into_response(),
        Ok(IngestOutcome::Skipped { reason }) => (
            StatusCode::OK,
            axum::Json(IngestResponse {
                status: "skipped",
                reason: Some(reason.as_str()),
                lead_id: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("webhook: ingest failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn build_router(state: WebhookState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(webhook_handler))
        .with_state(state)
}

/// Bind and serve the webhook endpoint until the task is aborted.
pub async fn serve(config: &ServerConfig, pipeline: Arc<IngestPipeline>) -> Result<()> {
    let state = WebhookState::new(pipeline, config.webhook_secret.clone());
    let app = build_router(state, &config.webhook_path);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "webhook server listening on 0.0.0.0:{}{}",
        config.port, config.webhook_path
    );
    axum::serve(listener, app).await?;
    Ok(())
}
