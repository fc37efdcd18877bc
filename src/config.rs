//! Layered settings: built-in defaults, then an optional TOML file, then
//! `SHOPLIST_*` environment variables (`__` separates sections).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "shoplist";
const ENV_PREFIX: &str = "SHOPLIST";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub enabled: bool,
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        AiSettings {
            enabled: false,
            api_key: String::new(),
            model: "claude-3-5-haiku-latest".to_string(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            timeout_secs: 30,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            db_path: PathBuf::from("data/shoplist.sqlite"),
        }
    }
}

/// Load settings. An explicit `path` must exist; otherwise `shoplist.toml` in
/// the working directory is read when present.
pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
    load_with_env(path, env_source())
}

/// `SHOPLIST_AI__API_KEY` -> `ai.api_key`: one `_` after the prefix, `__`
/// between nested keys.
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Settings, SettingsError> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(CONFIG_FILE).required(false),
    };
    let settings = Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let s = Settings::default();
        assert!(!s.ai.enabled);
        assert!(s.ai.api_key.is_empty());
        assert_eq!(s.ai.max_tokens, 1024);
        assert_eq!(s.storage.db_path, PathBuf::from("data/shoplist.sqlite"));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ai]\nenabled = true\nmodel = \"test-model\"\n").unwrap();

        let s = load(Some(file.path())).unwrap();
        assert!(s.ai.enabled);
        assert_eq!(s.ai.model, "test-model");
        // untouched keys keep their defaults
        assert_eq!(s.ai.timeout_secs, 30);
        assert_eq!(s.storage.db_path, PathBuf::from("data/shoplist.sqlite"));
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        env_source().source(Some(map))
    }

    #[test]
    fn env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ai]\nmodel = \"from-file\"\n").unwrap();

        let s = load_with_env(
            Some(file.path()),
            env(&[
                ("SHOPLIST_AI__MODEL", "from-env"),
                ("SHOPLIST_AI__API_KEY", "sk-test"),
                ("SHOPLIST_AI__ENABLED", "true"),
                ("SHOPLIST_STORAGE__DB_PATH", "/tmp/lists.sqlite"),
            ]),
        )
        .unwrap();
        assert_eq!(s.ai.model, "from-env");
        assert_eq!(s.ai.api_key, "sk-test");
        assert!(s.ai.enabled);
        assert_eq!(s.storage.db_path, PathBuf::from("/tmp/lists.sqlite"));
    }

    #[test]
    fn double_underscore_after_prefix_is_ignored() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let s = load_with_env(Some(file.path()), env(&[("SHOPLIST__AI__MODEL", "ignored")])).unwrap();
        assert_eq!(s.ai.model, AiSettings::default().model);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/shoplist.toml"))).is_err());
    }
}
