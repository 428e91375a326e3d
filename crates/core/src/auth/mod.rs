mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::ApiKeyAuthenticator;
pub use none::NoneAuthenticator;
pub use traits::{AuthError, Authenticator};
pub use types::{AuthRequest, Identity};

use crate::config::{AuthConfig, AuthMethod};

/// Builds the configured [`Authenticator`] (spec §8.1 auth section), mirroring how
/// `ProviderKind`/`StorageBackend` each pick a concrete implementation from config.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AuthError::ConfigurationError("api_key must be set when using ApiKey auth method".into())
            })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_method_builds() {
        let config = AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        };
        assert_eq!(create_authenticator(&config).unwrap().method_name(), "none");
    }

    #[test]
    fn api_key_without_key_fails() {
        let config = AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: None,
        };
        assert!(matches!(
            create_authenticator(&config),
            Err(AuthError::ConfigurationError(_))
        ));
    }
}
