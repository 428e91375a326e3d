//! Loads configuration from a TOML file merged with `SUBMAKER_`-prefixed environment
//! variables, following the teacher's figment-based layering (`Toml::file` then
//! `Env::prefixed`, env wins).

use figment::providers::{Env, Format, Toml};
use figment::Figment;

use super::types::Config;
use crate::error::{ErrorClass, OpError};

/// Environment variable prefix for overriding any config key, e.g.
/// `SUBMAKER_SERVER__PORT=9100` overrides `server.port`.
pub const ENV_PREFIX: &str = "SUBMAKER_";

/// Loads configuration from `path`, merged with environment overrides, and validates it.
pub fn load(path: &str) -> Result<Config, OpError> {
    let figment = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment
        .extract()
        .map_err(|e| OpError::new(ErrorClass::ClientError, format!("config load failed: {e}")))?;

    super::validate::validate(&config)?;
    Ok(config)
}

/// Loads configuration purely from environment variables plus in-code defaults, useful for
/// container deployments with no mounted file.
pub fn load_from_env() -> Result<Config, OpError> {
    let figment = Figment::new().merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config: Config = figment
        .extract()
        .map_err(|e| OpError::new(ErrorClass::ClientError, format!("config load failed: {e}")))?;
    super::validate::validate(&config)?;
    Ok(config)
}
