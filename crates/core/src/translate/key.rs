//! Pure cache-key derivation (spec §3, §4.8, testable property §8.3).

use crate::language::LanguageCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    pub base_key: String,
    pub scoped_key: String,
    pub runtime_key: String,
    pub bypass_enabled: bool,
}

/// `generateCacheKeys` (spec §8.3): equal inputs produce equal keys; if bypass is requested
/// without a `configHash`, `bypassEnabled=false` and every key collapses to `baseKey`.
pub fn generate_cache_keys(
    source_file_id: &str,
    target_lang: LanguageCode,
    bypass_requested: bool,
    config_hash: Option<&str>,
) -> CacheKeys {
    let base_key = format!("{source_file_id}_{target_lang}");
    let bypass_enabled = bypass_requested && config_hash.map(|h| !h.is_empty()).unwrap_or(false);

    let scoped_key = if bypass_enabled {
        format!("{base_key}__u_{}", config_hash.unwrap())
    } else {
        base_key.clone()
    };

    let runtime_key = if bypass_enabled {
        scoped_key.clone()
    } else {
        base_key.clone()
    };

    CacheKeys {
        base_key,
        scoped_key,
        runtime_key,
        bypass_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_produce_equal_keys() {
        let a = generate_cache_keys("file123", LanguageCode::ENGLISH, true, Some("cfg-hash"));
        let b = generate_cache_keys("file123", LanguageCode::ENGLISH, true, Some("cfg-hash"));
        assert_eq!(a, b);
    }

    #[test]
    fn bypass_without_config_hash_falls_back_to_permanent() {
        let keys = generate_cache_keys("file123", LanguageCode::ENGLISH, true, None);
        assert!(!keys.bypass_enabled);
        assert_eq!(keys.runtime_key, keys.base_key);
    }

    #[test]
    fn bypass_with_empty_config_hash_falls_back_to_permanent() {
        let keys = generate_cache_keys("file123", LanguageCode::ENGLISH, true, Some(""));
        assert!(!keys.bypass_enabled);
    }

    #[test]
    fn bypass_enabled_scopes_key_to_config_hash() {
        let keys = generate_cache_keys("file123", LanguageCode::ENGLISH, true, Some("abc"));
        assert!(keys.bypass_enabled);
        assert_eq!(keys.scoped_key, "file123_eng__u_abc");
        assert_eq!(keys.runtime_key, keys.scoped_key);
    }

    #[test]
    fn permanent_scope_ignores_config_hash() {
        let keys = generate_cache_keys("file123", LanguageCode::ENGLISH, false, Some("abc"));
        assert_eq!(keys.scoped_key, keys.base_key);
        assert_eq!(keys.runtime_key, keys.base_key);
    }
}
