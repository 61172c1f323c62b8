//! Inbound/outbound message screening and normalization.
//!
//! The gateway leaks its own media-type markers ("[Áudio]", "[Image]", …)
//! into the text field and emits a long tail of type names that the CRM
//! collapses onto a small canonical set. Everything here returns typed
//! results; nothing panics on odd payloads.

use tracing::warn;

/// Hard cap on stored message content, in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 10_000;

/// Default budget for inbox preview snippets.
pub const DEFAULT_PREVIEW_CHARS: usize = 50;

/// Canonical message types the CRM persists.
const CANONICAL_TYPES: &[&str] = &[
    "text", "image", "audio", "video", "document", "sticker", "location", "contact",
];

/// Legacy and gateway-dialect aliases onto the canonical set.
const TYPE_ALIASES: &[(&str, &str)] = &[
    ("chat", "text"),
    ("ptt", "audio"),
    ("voice", "audio"),
    ("vcard", "contact"),
];

/// Recognized-but-not-ingested content kinds. Distinct from invalid: the
/// caller skips persistence without logging an error.
const UNSUPPORTED_TYPES: &[&str] = &[
    "poll",
    "poll_creation",
    "reaction",
    "product",
    "product_list",
    "order",
];

/// Gateway-emitted media markers, lowercase. Matched case-insensitively
/// against the trimmed content so "[Audio]", "[AUDIO]" and "[áudio]" all
/// hit the same entry.
const PLACEHOLDER_CONTENT: &[&str] = &[
    "[audio]",
    "[áudio]",
    "[image]",
    "[imagem]",
    "[video]",
    "[vídeo]",
    "[document]",
    "[documento]",
    "[sticker]",
    "[figurinha]",
    "[gif]",
    "[location]",
    "[localização]",
    "[contact]",
    "[contato]",
    "[media message]",
    "[mídia]",
];

/// Preview labels for non-text content, pt-BR like the rest of the inbox.
const PREVIEW_LABELS: &[(&str, &str)] = &[
    ("image", "[Imagem]"),
    ("audio", "[Áudio]"),
    ("video", "[Vídeo]"),
    ("document", "[Documento]"),
    ("sticker", "[Figurinha]"),
    ("location", "[Localização]"),
    ("contact", "[Contato]"),
];

/// Outcome of content validation, with a machine-readable skip reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCheck {
    pub is_valid: bool,
    pub reason: Option<&'static str>,
}

impl MessageCheck {
    fn ok() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    fn rejected(reason: &'static str) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

/// Outcome of type normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCheck {
    pub is_valid: bool,
    pub normalized_type: String,
}

/// Decide whether a message payload is worth persisting.
///
/// Rejects when both content and media are empty (`empty_message`) and when
/// the content is a bare gateway media marker with no media attached
/// (`placeholder_content`). A marker *with* media passes — the media is the
/// message and the caller blanks the leaked text.
pub fn validate(content: &str, media_url: Option<&str>) -> MessageCheck {
    let trimmed = content.trim();
    let has_media = media_url.is_some_and(|u| !u.trim().is_empty());

    if trimmed.is_empty() && !has_media {
        return MessageCheck::rejected("empty_message");
    }

    if !has_media && is_placeholder(trimmed) {
        return MessageCheck::rejected("placeholder_content");
    }

    MessageCheck::ok()
}

/// True when the trimmed content is one of the gateway's media markers.
pub fn is_placeholder(content: &str) -> bool {
    let lowered = content.trim().to_lowercase();
    PLACEHOLDER_CONTENT.contains(&lowered.as_str())
}

/// Strip NULs and normalize CRLF/CR line endings to LF.
pub fn sanitize(content: &str) -> String {
    content
        .replace('\0', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Truncate to a character budget. Char-safe — never splits a code point.
pub fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    content.chars().take(max_chars).collect()
}

/// Normalize a gateway type name onto the canonical set.
///
/// Aliases map directly; unrecognized names fall back to `text` with a
/// warning rather than rejecting — an unknown type is still a message.
pub fn validate_type(message_type: &str) -> TypeCheck {
    let lowered = message_type.trim().to_lowercase();

    if lowered.is_empty() {
        return TypeCheck {
            is_valid: false,
            normalized_type: "text".to_string(),
        };
    }

    if let Some(&(_, canonical)) = TYPE_ALIASES.iter().find(|(alias, _)| *alias == lowered) {
        return TypeCheck {
            is_valid: true,
            normalized_type: canonical.to_string(),
        };
    }

    if CANONICAL_TYPES.contains(&lowered.as_str()) {
        return TypeCheck {
            is_valid: true,
            normalized_type: lowered,
        };
    }

    warn!("message: unrecognized type '{}', defaulting to text", lowered);
    TypeCheck {
        is_valid: true,
        normalized_type: "text".to_string(),
    }
}

/// True for content kinds the CRM recognizes but does not ingest.
pub fn is_unsupported_type(message_type: &str) -> bool {
    let lowered = message_type.trim().to_lowercase();
    UNSUPPORTED_TYPES.contains(&lowered.as_str())
}

/// Build an inbox preview: non-text types get a bracketed label, and the
/// label's own length comes out of the budget so the total never exceeds
/// `max_chars`.
pub fn preview_content(content: &str, message_type: &str, max_chars: usize) -> String {
    let label = PREVIEW_LABELS
        .iter()
        .find(|(t, _)| *t == message_type)
        .map(|(_, l)| *l);

    let Some(label) = label else {
        return truncate(content.trim(), max_chars);
    };

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return truncate(label, max_chars);
    }

    let label_len = label.chars().count();
    if label_len + 1 >= max_chars {
        return truncate(label, max_chars);
    }
    let body = truncate(trimmed, max_chars - label_len - 1);
    format!("{} {}", label, body)
}
