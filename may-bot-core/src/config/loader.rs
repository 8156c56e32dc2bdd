//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variables that map straight onto a config field
const ENV_ALIASES: [(&str, &str); 2] = [
    ("DEEPSEEK_API_KEY", "provider.api_key"),
    ("TELEGRAM_BOT_TOKEN", "telegram.token"),
];

/// Prefix for `MAY_BOT__SECTION__FIELD` overrides
const PATH_PREFIX: &str = "MAY_BOT__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".may-bot"))
            .unwrap_or_else(|| PathBuf::from(".may-bot"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment.
    ///
    /// Precedence, lowest first: built-in defaults, `config.json`,
    /// alias variables such as `DEEPSEEK_API_KEY`, `MAY_BOT__*` paths.
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the JSON config file
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), value);
    }
}

fn apply_alias_overrides(config: &mut Value) {
    for (env_key, target_path) in ENV_ALIASES {
        if let Ok(value) = std::env::var(env_key) {
            if value.trim().is_empty() {
                continue;
            }
            let path: Vec<String> = target_path.split('.').map(ToString::to_string).collect();
            set_path_value(config, &path, Value::String(value));
        }
    }
}

fn apply_path_overrides(config: &mut Value) {
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(PATH_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.is_empty() {
            continue;
        }
        // Secrets and free text stay strings even when they look like numbers
        let parsed = match segments.last().map(String::as_str) {
            Some("api_key") | Some("token") | Some("model") | Some("api_base") => {
                Value::String(value)
            }
            _ => parse_env_value(&value),
        };
        set_path_value(config, &segments, parsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::set_var(key, value) };
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::remove_var(key) };
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.original {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                unsafe { std::env::set_var(&self.key, value) };
            } else {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                unsafe { std::env::remove_var(&self.key) };
            }
        }
    }

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_load_default_config() {
        let _lock = lock_env();
        let _key = EnvVarGuard::unset("DEEPSEEK_API_KEY");
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.provider.model, "deepseek-chat");
        assert_eq!(config.provider.max_tokens, 1000);
        assert!(!config.provider.has_api_key());
    }

    #[test]
    fn test_save_and_load_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.provider.model = "deepseek-reasoner".to_string();

        loader.save(&config).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.provider.model, "deepseek-reasoner");
    }

    #[test]
    fn test_load_applies_alias_env_overrides() {
        let _lock = lock_env();
        let _api_key = EnvVarGuard::set("DEEPSEEK_API_KEY", "sk-from-env");
        let _token = EnvVarGuard::set("TELEGRAM_BOT_TOKEN", "123:abc");

        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.provider.api_key, "sk-from-env");
        assert_eq!(config.telegram.token, "123:abc");
    }

    #[test]
    fn test_empty_alias_does_not_clear_file_value() {
        let _lock = lock_env();
        let _api_key = EnvVarGuard::set("DEEPSEEK_API_KEY", "");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"provider":{"api_key":"sk-file"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.provider.api_key, "sk-file");
    }

    #[test]
    fn test_load_applies_path_env_overrides() {
        let _lock = lock_env();
        let _temp = EnvVarGuard::set("MAY_BOT__PROVIDER__TEMPERATURE", "0.2");
        let _tokens = EnvVarGuard::set("MAY_BOT__PROVIDER__MAX_TOKENS", "256");
        let _thinking = EnvVarGuard::set("MAY_BOT__TELEGRAM__THINKING_INDICATOR", "false");
        let _key = EnvVarGuard::set("MAY_BOT__PROVIDER__API_KEY", "12345");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert!((config.provider.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.provider.max_tokens, 256);
        assert!(!config.telegram.thinking_indicator);
        assert_eq!(config.provider.api_key, "12345");
    }

    #[test]
    fn test_path_env_overrides_alias_and_file() {
        let _lock = lock_env();
        let _alias = EnvVarGuard::set("DEEPSEEK_API_KEY", "sk-alias");
        let _path = EnvVarGuard::set("MAY_BOT__PROVIDER__API_KEY", "sk-path");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"provider":{"api_key":"sk-file"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.provider.api_key, "sk-path");
    }

    #[test]
    fn test_validation_rejects_invalid_temperature() {
        let _lock = lock_env();
        let _temp = EnvVarGuard::set("MAY_BOT__PROVIDER__TEMPERATURE", "2.5");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_malformed_file_is_a_serialization_error() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), "{not json").unwrap();

        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }
}
