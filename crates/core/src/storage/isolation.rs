//! Deployment-wide isolation key resolution (spec §4.10): derived from an env var, a hash of
//! the encryption key, or a persisted `.instance-id` file, in that priority order, and
//! guaranteed deterministic across restarts once the encryption key is materialized.
//!
//! Open Question resolved here (see DESIGN.md): the persisted marker lives at
//! `<isolation.instance_id_dir>/.instance-id` (default `data/.instance-id`), not at the
//! project root, so it sits alongside the rest of the filesystem-backed runtime state
//! instead of in version-controlled territory.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::IsolationConfig;
use crate::error::{ErrorClass, OpError};

/// Resolves the isolation key in priority order: configured env var, hash of an encryption
/// key if one is supplied, else a persisted random marker file.
pub fn resolve(config: &IsolationConfig, encryption_key: Option<&str>) -> Result<String, OpError> {
    if let Some(env_var) = &config.env_var {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                return Ok(value);
            }
        }
    }

    if let Some(key) = encryption_key {
        if !key.is_empty() {
            let mut hasher = Sha256::new();
            hasher.update(key.as_bytes());
            let digest = hasher.finalize();
            return Ok(hex_prefix(&digest, 16));
        }
    }

    read_or_create_instance_id(Path::new(&config.instance_id_dir))
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()[..chars].to_string()
}

fn instance_id_path(dir: &Path) -> PathBuf {
    dir.join(".instance-id")
}

fn read_or_create_instance_id(dir: &Path) -> Result<String, OpError> {
    let path = instance_id_path(dir);
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::fs::create_dir_all(dir).map_err(|e| {
        OpError::new(
            ErrorClass::ServerError,
            format!("failed to create isolation dir {}: {e}", dir.display()),
        )
    })?;

    let id = Uuid::new_v4().to_string();
    std::fs::write(&path, &id).map_err(|e| {
        OpError::new(
            ErrorClass::ServerError,
            format!("failed to persist instance id at {}: {e}", path.display()),
        )
    })?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_takes_priority() {
        std::env::set_var("SUBMAKER_TEST_ISOLATION_KEY", "from-env");
        let config = IsolationConfig {
            env_var: Some("SUBMAKER_TEST_ISOLATION_KEY".to_string()),
            instance_id_dir: "unused".to_string(),
        };
        let key = resolve(&config, Some("some-encryption-key")).unwrap();
        assert_eq!(key, "from-env");
        std::env::remove_var("SUBMAKER_TEST_ISOLATION_KEY");
    }

    #[test]
    fn encryption_key_hash_is_deterministic() {
        let config = IsolationConfig {
            env_var: None,
            instance_id_dir: "unused".to_string(),
        };
        let a = resolve(&config, Some("secret")).unwrap();
        let b = resolve(&config, Some("secret")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn instance_id_file_persists_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let config = IsolationConfig {
            env_var: None,
            instance_id_dir: dir.path().to_str().unwrap().to_string(),
        };
        let first = resolve(&config, None).unwrap();
        let second = resolve(&config, None).unwrap();
        assert_eq!(first, second);
        assert!(instance_id_path(dir.path()).exists());
    }
}
