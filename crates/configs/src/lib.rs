use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Location of the counter record, `{"count": N}`.
    #[serde(default = "default_record_path")]
    pub path: PathBuf,
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_record_path(), io_timeout_ms: default_io_timeout() }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 3000 }
fn default_record_path() -> PathBuf { PathBuf::from("data/visitors.json") }
fn default_io_timeout() -> u64 { 2000 }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or defaults when it is absent), apply env overrides, validate.
    ///
    /// A config file that exists but does not parse is an error.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path).map_err(|e| anyhow!("{path}: {e}"))?
        } else {
            AppConfig::default()
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// `PORT`, `SERVER_HOST`, `COUNTER_FILE` and `TOKIO_WORKER_THREADS` win over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow!("PORT must be an integer in 1..=65535: {e}"))?;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(path) = lookup("COUNTER_FILE") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(anyhow!("storage.path is empty"));
        }
        if self.io_timeout_ms == 0 {
            return Err(anyhow!("storage.io_timeout_ms must be a positive number of milliseconds"));
        }
        Ok(())
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_listen_on_3000_with_data_dir_record() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.storage.path, PathBuf::from("data/visitors.json"));
        assert_eq!(cfg.storage.io_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn partial_toml_keeps_defaults() -> Result<()> {
        let cfg = parse("[server]\nport = 8088\n")?;
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.storage.io_timeout_ms, 2000);
        Ok(())
    }

    #[test]
    fn env_overrides_file_values() -> Result<()> {
        let mut cfg = parse("[server]\nport = 8088\n[storage]\npath = \"a.json\"\n")?;
        cfg.apply_env_overrides(env(&[("PORT", "4000"), ("COUNTER_FILE", "/tmp/b.json")]))?;
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.storage.path, PathBuf::from("/tmp/b.json"));
        Ok(())
    }

    #[test]
    fn bad_port_env_is_rejected() {
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_env_overrides(env(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn validation_rejects_zero_port_and_timeout() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.storage.io_timeout_ms = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(parse("[server]\nport = \"three thousand\"\n").is_err());
        assert!(parse("[storage\n").is_err());
    }

    #[test]
    fn load_from_missing_file_errors() {
        let path = std::env::temp_dir().join(format!("missing_{}.toml", uuid::Uuid::new_v4()));
        assert!(load_from_file(path.to_str().unwrap()).is_err());
    }
}
