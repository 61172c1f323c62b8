#![allow(dead_code)]

use thiserror::Error;

/// Typed error hierarchy for leadcrab.
///
/// Use at module boundaries (store access, gateway fetches, storage uploads,
/// config validation). Internal/leaf functions can continue using
/// `anyhow::Result` — the `Internal` variant allows seamless conversion via
/// the `?` operator.
#[derive(Debug, Error)]
pub enum LeadcrabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lead store error: {0}")]
    Store(String),

    #[error("Gateway error: {message}")]
    Gateway { message: String, auth_exhausted: bool },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using LeadcrabError.
pub type LeadcrabResult<T> = std::result::Result<T, LeadcrabError>;

impl LeadcrabError {
    /// Whether this error came from exhausting every gateway auth header format.
    pub fn is_auth_exhausted(&self) -> bool {
        matches!(
            self,
            LeadcrabError::Gateway {
                auth_exhausted: true,
                ..
            }
        )
    }
}
