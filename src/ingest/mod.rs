//! Inbound event pipeline: chat-id screening, lead resolution, message
//! normalization and media re-hosting for one gateway event.
//!
//! Invoked once per inbound message, synchronously, inside the webhook
//! handler. Each step only runs when the previous one let the event
//! through; everything that stops an event produces a machine-readable
//! skip reason instead of an error.

use crate::chat_id;
use crate::leads::resolver::LeadResolver;
use crate::leads::{Lead, LeadStore};
use crate::media::MediaIngestor;
use crate::message;
use crate::phone;
use crate::storage::MediaReference;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One inbound gateway event, already lifted out of the wire payload.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub chat_id: String,
    pub message_type: String,
    pub content: String,
    pub media_url: Option<String>,
    pub sender_name: Option<String>,
}

/// Why an event was dropped without persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    GroupChat,
    StatusBroadcast,
    LidChat,
    EmptyMessage,
    PlaceholderContent,
    UnsupportedType,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::GroupChat => "group_chat",
            SkipReason::StatusBroadcast => "status_broadcast",
            SkipReason::LidChat => "lid_chat",
            SkipReason::EmptyMessage => "empty_message",
            SkipReason::PlaceholderContent => "placeholder_content",
            SkipReason::UnsupportedType => "unsupported_type",
        }
    }
}

/// The normalized message tuple handed to the persistence layer.
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub message_type: String,
    pub content: String,
    pub media: Option<MediaReference>,
}

#[derive(Debug)]
pub enum IngestOutcome {
    Accepted {
        lead: Lead,
        message: NormalizedMessage,
    },
    Skipped {
        reason: SkipReason,
    },
}

pub struct IngestPipeline {
    store: Arc<LeadStore>,
    resolver: LeadResolver,
    media: MediaIngestor,
}

impl IngestPipeline {
    pub fn new(store: Arc<LeadStore>, media: MediaIngestor) -> Self {
        let resolver = LeadResolver::new(store.clone());
        Self {
            store,
            resolver,
            media,
        }
    }

    /// Run one inbound event through the full pipeline.
    ///
    /// `Err` means genuine store I/O failure (the handler turns it into a
    /// 5xx); every content-level rejection comes back as `Skipped`.
    pub async fn process(&self, event: &InboundEvent) -> Result<IngestOutcome> {
        if chat_id::is_group_chat(&event.chat_id) {
            debug!("ingest: dropping group chat {}", event.chat_id);
            return Ok(skip(SkipReason::GroupChat));
        }
        if chat_id::is_status_broadcast(&event.chat_id) {
            debug!("ingest: dropping status broadcast {}", event.chat_id);
            return Ok(skip(SkipReason::StatusBroadcast));
        }
        if chat_id::is_lid(&event.chat_id) {
            // A LID is not a phone number; matching it against leads.phone
            // would fabricate a contact
            debug!("ingest: dropping LID chat {}", event.chat_id);
            return Ok(skip(SkipReason::LidChat));
        }

        let lead = self.resolve_or_create(event)?;

        if message::is_unsupported_type(&event.message_type) {
            debug!(
                "ingest: unsupported type '{}' from lead {}",
                event.message_type, lead.id
            );
            return Ok(skip(SkipReason::UnsupportedType));
        }

        let check = message::validate(&event.content, event.media_url.as_deref());
        if !check.is_valid {
            let reason = match check.reason {
                Some("placeholder_content") => SkipReason::PlaceholderContent,
                _ => SkipReason::EmptyMessage,
            };
            debug!(
                "ingest: invalid message from lead {}: {}",
                lead.id,
                reason.as_str()
            );
            return Ok(skip(reason));
        }

        let type_check = message::validate_type(&event.message_type);
        let normalized_type = type_check.normalized_type;

        // A leaked media marker is not user text
        let mut content = if message::is_placeholder(&event.content) {
            String::new()
        } else {
            message::truncate(
                &message::sanitize(event.content.trim()),
                message::DEFAULT_MAX_CONTENT_CHARS,
            )
        };

        let media_url = event.media_url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let media = match media_url {
            Some(url) => self.media.ingest(url, &normalized_type, lead.id).await,
            None => None,
        };

        // A message must carry content or media, never neither
        if media.is_none() && media_url.is_some() && content.is_empty() {
            warn!(
                "ingest: media fetch failed and no caption, storing marker for lead {}",
                lead.id
            );
            content = format!("[{} - download failed]", normalized_type);
        }

        info!(
            "ingest: accepted {} message from lead {}: {}",
            normalized_type,
            lead.id,
            message::preview_content(&content, &normalized_type, message::DEFAULT_PREVIEW_CHARS)
        );

        Ok(IngestOutcome::Accepted {
            lead,
            message: NormalizedMessage {
                message_type: normalized_type,
                content,
                media,
            },
        })
    }

    /// Resolve the lead for this event's phone, falling back to the pushed
    /// display name, creating a fresh lead on first contact.
    fn resolve_or_create(&self, event: &InboundEvent) -> Result<Lead> {
        let digits = chat_id::extract_phone_from_chat_id(&event.chat_id);
        let name = event
            .sender_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        if let Some(lead) = self.resolver.find_by_phone(&digits) {
            self.refresh_whatsapp_name(&lead, name);
            return Ok(lead);
        }
        if let Some(name) = name
            && let Some(lead) = self.resolver.find_by_phone_and_name(&digits, name)
        {
            self.refresh_whatsapp_name(&lead, Some(name));
            return Ok(lead);
        }

        let parsed = phone::parse(&digits);
        let lead = self
            .store
            .create_lead(&parsed.local_number, &parsed.country_code, name)?;
        info!(
            "ingest: created lead {} for +{} {}",
            lead.id, lead.country_code, lead.phone
        );
        Ok(lead)
    }

    fn refresh_whatsapp_name(&self, lead: &Lead, name: Option<&str>) {
        let Some(name) = name else {
            return;
        };
        if lead.whatsapp_name.as_deref() == Some(name) {
            return;
        }
        if let Err(e) = self.store.update_whatsapp_name(lead.id, name) {
            warn!("ingest: failed to refresh whatsapp name: {}", e);
        }
    }
}

fn skip(reason: SkipReason) -> IngestOutcome {
    IngestOutcome::Skipped { reason }
}
