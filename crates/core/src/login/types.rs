use thiserror::Error;

use crate::error::ErrorClass;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("login queue congested after exhausting retry budget for {provider}")]
    QueueCongestion { provider: String },
    #[error("login HTTP call failed: {0}")]
    HttpFailure(String),
    #[error("login coordinator storage error: {0}")]
    Storage(String),
}

impl LoginError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LoginError::QueueCongestion { .. } => ErrorClass::RateLimit,
            LoginError::HttpFailure(_) => ErrorClass::Authentication,
            LoginError::Storage(_) => ErrorClass::DatabaseError,
        }
    }
}
