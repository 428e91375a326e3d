use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    NotAuthenticated,

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Validates inbound HTTP requests before they reach the subtitle/translation handlers.
/// Separate from provider/translation auth (spec §4.5) — this gates the addon's own API.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    fn method_name(&self) -> &'static str;
}
