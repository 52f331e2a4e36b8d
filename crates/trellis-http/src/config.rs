//! Server configuration loaded from TOML.

#![allow(missing_docs)]

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use smol_str::SmolStr;
use tracing::Level;

use crate::error::HttpError;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SmolStr,
    /// Threads answering requests.
    pub workers: usize,
    pub log_level: Level,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SmolStr::new(DEFAULT_LISTEN),
            workers: DEFAULT_WORKERS,
            log_level: Level::INFO,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HttpError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| HttpError::InvalidConfig(format!("{}: {err}", path.display()).into()))?;
        Self::from_toml(&text)
    }

    /// Parses a document with an optional `[server]` table. Missing keys
    /// take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, HttpError> {
        let raw: ConfigToml = toml::from_str(text)
            .map_err(|err| HttpError::InvalidConfig(err.to_string().into()))?;
        raw.server.unwrap_or_default().into_config()
    }

    #[must_use]
    pub fn with_listen(mut self, listen: impl Into<SmolStr>) -> Self {
        self.listen = listen.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    listen: Option<String>,
    workers: Option<usize>,
    log_level: Option<String>,
}

impl ServerSection {
    fn into_config(self) -> Result<ServerConfig, HttpError> {
        let defaults = ServerConfig::default();
        let workers = self.workers.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err(HttpError::InvalidConfig(
                "server.workers must be at least 1".into(),
            ));
        }
        let log_level = match self.log_level {
            Some(text) => Level::from_str(text.trim()).map_err(|_| {
                HttpError::InvalidConfig(format!("unknown server.log_level '{text}'").into())
            })?,
            None => defaults.log_level,
        };
        Ok(ServerConfig {
            listen: self.listen.map_or(defaults.listen, SmolStr::from),
            workers,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
        assert_eq!(
            ServerConfig::from_toml("[server]\n").unwrap(),
            ServerConfig::default()
        );
    }

    #[test]
    fn reads_server_table() {
        let config = ServerConfig::from_toml(
            r#"
[server]
listen = "0.0.0.0:9000"
workers = 2
log_level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.workers, 2);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.with_listen("127.0.0.1:1").listen, "127.0.0.1:1");
    }

    #[test]
    fn rejects_bad_values() {
        for text in [
            "[server]\nworkers = 0\n",
            "[server]\nlog_level = \"loud\"\n",
            "[server]\nport = 1\n",
            "[server\n",
        ] {
            assert!(
                matches!(ServerConfig::from_toml(text), Err(HttpError::InvalidConfig(_))),
                "{text}"
            );
        }
    }
}
