use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "stepwise.toml";
/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "STEPWISE_CONFIG";
/// Environment variable overriding `service.base_url`
pub const URL_ENV: &str = "STEPWISE_URL";

/// Error type for config file operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not edit {path}: {source}")]
    EditError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
}

/// Pick the config file: an explicit path wins, then `$STEPWISE_CONFIG`,
/// then `./stepwise.toml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    resolve_config_path_with(explicit, std::env::var(CONFIG_ENV).ok())
}

fn resolve_config_path_with(explicit: Option<&Path>, from_env: Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match from_env {
        Some(env) if !env.trim().is_empty() => PathBuf::from(env),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

fn read_text(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Load the config. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let Some(text) = read_text(path)? else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Apply the base-URL overrides in precedence order: `$STEPWISE_URL`, then
/// the command-line flag.
pub fn apply_url_overrides(config: &mut Config, from_env: Option<String>, from_flag: Option<&str>) {
    let chosen = from_flag
        .map(str::to_string)
        .or(from_env.filter(|v| !v.trim().is_empty()));
    if let Some(url) = chosen {
        config.service.base_url = url;
    }
}

/// Read the config file as a format-preserving document for editing.
/// A missing file yields an empty document.
pub fn read_config_document(path: &Path) -> Result<toml_edit::DocumentMut, ConfigError> {
    let text = read_text(path)?.unwrap_or_default();
    text.parse().map_err(|e| ConfigError::EditError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config_document(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    fs::write(path, doc.to_string()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Set `service.base_url`, creating the table if needed
pub fn set_base_url(doc: &mut toml_edit::DocumentMut, url: &str) {
    if !doc.contains_key("service") {
        doc["service"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["service"]["base_url"] = toml_edit::value(url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"# stepwise settings
[service]
base_url = "http://localhost:8000"  # dev server
timeout_secs = 10

[editing]
cancel_reverts = true
"#;

    #[test]
    fn explicit_path_wins() {
        let p = resolve_config_path_with(Some(Path::new("/tmp/a.toml")), Some("/tmp/b.toml".into()));
        assert_eq!(p, PathBuf::from("/tmp/a.toml"));
    }

    #[test]
    fn env_path_then_default() {
        assert_eq!(
            resolve_config_path_with(None, Some("/etc/sw.toml".into())),
            PathBuf::from("/etc/sw.toml")
        );
        assert_eq!(
            resolve_config_path_with(None, Some("  ".into())),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
        assert_eq!(resolve_config_path_with(None, None), PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("stepwise.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reads_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stepwise.toml");
        fs::write(&path, SAMPLE).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.service.timeout_secs, 10);
        assert!(config.editing.cancel_reverts);
        assert!(config.cache.enabled);
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stepwise.toml");
        fs::write(&path, "[service\nbase_url = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn flag_beats_env() {
        let mut config = Config::default();
        apply_url_overrides(&mut config, Some("http://env:1".into()), Some("http://flag:2"));
        assert_eq!(config.service.base_url, "http://flag:2");

        let mut config = Config::default();
        apply_url_overrides(&mut config, Some("http://env:1".into()), None);
        assert_eq!(config.service.base_url, "http://env:1");

        let mut config = Config::default();
        apply_url_overrides(&mut config, Some(String::new()), None);
        assert_eq!(config.service.base_url, "http://localhost:8000");
    }

    #[test]
    fn set_base_url_preserves_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stepwise.toml");
        fs::write(&path, SAMPLE).unwrap();

        let mut doc = read_config_document(&path).unwrap();
        set_base_url(&mut doc, "https://tasks.example.com");
        write_config_document(&path, &doc).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# stepwise settings"));
        assert!(written.contains("timeout_secs = 10"));
        assert_eq!(
            load_config(&path).unwrap().service.base_url,
            "https://tasks.example.com"
        );
    }

    #[test]
    fn set_base_url_creates_file_and_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.toml");
        let mut doc = read_config_document(&path).unwrap();
        set_base_url(&mut doc, "http://127.0.0.1:8000");
        write_config_document(&path, &doc).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.service.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.service.timeout_secs, 30);
    }
}
