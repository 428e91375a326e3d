//! Shared error classification used across provider, login, and translate errors.
//!
//! Every subsystem keeps its own `thiserror` enum (see `provider::types::ProviderError`,
//! `login::LoginError`, `translate::TranslateError`, ...); this module gives them a common
//! vocabulary for retry policy and user-facing messaging (spec §7) without forcing them into
//! one giant enum.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Error taxonomy shared by every upstream-facing subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimit,
    ServiceUnavailable,
    DatabaseError,
    Authentication,
    QuotaExceeded,
    ClientError,
    ServerError,
    Timeout,
    Network,
    Dns,
    MaxTokens,
    ProhibitedContent,
    InvalidSource,
}

impl ErrorClass {
    /// Whether this error class should be retried by the caller.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            ErrorClass::RateLimit
                | ErrorClass::ServiceUnavailable
                | ErrorClass::DatabaseError
                | ErrorClass::ServerError
                | ErrorClass::Timeout
        )
    }

    /// User-facing guidance string for this error class.
    pub fn user_signal(self) -> &'static str {
        match self {
            ErrorClass::RateLimit => "wait a few minutes",
            ErrorClass::ServiceUnavailable => "try again later",
            ErrorClass::DatabaseError => "trying next provider",
            ErrorClass::Authentication => "check credentials",
            ErrorClass::QuotaExceeded => "daily limit reached",
            ErrorClass::ClientError => "invalid request",
            ErrorClass::ServerError => "server error",
            ErrorClass::Timeout | ErrorClass::Network | ErrorClass::Dns => "network issue",
            ErrorClass::MaxTokens => "translation too long for the model",
            ErrorClass::ProhibitedContent => "content was rejected by the translator",
            ErrorClass::InvalidSource => "source subtitle could not be parsed",
        }
    }

    /// Classify an HTTP status code using the provider-agnostic mapping of spec §7.
    pub fn from_http_status(status: u16) -> ErrorClass {
        match status {
            429 | 456 | 459 => ErrorClass::RateLimit,
            503 => ErrorClass::ServiceUnavailable,
            469 => ErrorClass::DatabaseError,
            401 | 403 => ErrorClass::Authentication,
            406 => ErrorClass::QuotaExceeded,
            400..=499 => ErrorClass::ClientError,
            500..=599 => ErrorClass::ServerError,
            _ => ErrorClass::ServerError,
        }
    }
}

/// Wraps an operational error with the bookkeeping needed to avoid re-logging it at every
/// layer it bubbles through (spec §7 "Deduplication of error logs").
#[derive(Debug, Clone)]
pub struct OpError {
    pub class: ErrorClass,
    pub message: String,
    pub already_logged: bool,
}

impl OpError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            already_logged: false,
        }
    }

    /// Mark as logged and return self, for use at the layer that actually emits the log line.
    pub fn mark_logged(mut self) -> Self {
        self.already_logged = true;
        self
    }
}

impl std::fmt::Display for OpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.class.user_signal())
    }
}

impl std::error::Error for OpError {}

/// Per-fingerprint send cap for telemetry reporting (spec §7): at most `TELEMETRY_SEND_CAP`
/// occurrences of the same error fingerprint are forwarded per process lifetime.
pub const TELEMETRY_SEND_CAP: u32 = 5;

static TELEMETRY_COUNTS: Lazy<Mutex<HashMap<String, AtomicU32>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns true if this fingerprint is still under the telemetry send cap, incrementing its
/// counter as a side effect. Operational patterns (rate limits, auth failures, network
/// transients) are expected to be filtered upstream of this call; this only bounds volume.
pub fn telemetry_should_send(fingerprint: &str) -> bool {
    let mut map = TELEMETRY_COUNTS.lock().expect("telemetry counter poisoned");
    let counter = map
        .entry(fingerprint.to_string())
        .or_insert_with(|| AtomicU32::new(0));
    let prev = counter.fetch_add(1, Ordering::Relaxed);
    prev < TELEMETRY_SEND_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(ErrorClass::RateLimit.retryable());
        assert!(ErrorClass::ServiceUnavailable.retryable());
        assert!(ErrorClass::ServerError.retryable());
        assert!(!ErrorClass::Authentication.retryable());
        assert!(!ErrorClass::ClientError.retryable());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorClass::from_http_status(429), ErrorClass::RateLimit);
        assert_eq!(ErrorClass::from_http_status(456), ErrorClass::RateLimit);
        assert_eq!(ErrorClass::from_http_status(503), ErrorClass::ServiceUnavailable);
        assert_eq!(ErrorClass::from_http_status(469), ErrorClass::DatabaseError);
        assert_eq!(ErrorClass::from_http_status(401), ErrorClass::Authentication);
        assert_eq!(ErrorClass::from_http_status(406), ErrorClass::QuotaExceeded);
        assert_eq!(ErrorClass::from_http_status(404), ErrorClass::ClientError);
        assert_eq!(ErrorClass::from_http_status(500), ErrorClass::ServerError);
    }

    #[test]
    fn telemetry_cap_enforced() {
        let fp = "unique-test-fingerprint-xyz";
        let mut allowed = 0;
        for _ in 0..10 {
            if telemetry_should_send(fp) {
                allowed += 1;
            }
        }
        assert_eq!(allowed, TELEMETRY_SEND_CAP as usize);
    }

    #[test]
    fn op_error_mark_logged() {
        let err = OpError::new(ErrorClass::Timeout, "boom");
        assert!(!err.already_logged);
        let err = err.mark_logged();
        assert!(err.already_logged);
    }
}
