use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::warn;

/// Which config file a read targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// Secrets: bearer tokens.
    Auth,
    /// Operator preferences: default repo owner, issue channel, prefix.
    User,
}

impl ConfigKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ConfigKind::Auth => "auth.json",
            ConfigKind::User => "user.json",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub github_token: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserConfig {
    pub default_github_user: Option<String>,
    pub issue_creation_channel: Option<u64>,
    pub command_prefix: Option<String>,
}

/// Typed JSON config reads with an in-memory cache.
///
/// A missing or unparsable file is logged and treated as absent
/// configuration — command paths report "not configured" instead of
/// crashing.
pub struct ConfigStore {
    dir: PathBuf,
    cache: RwLock<HashMap<ConfigKind, serde_json::Value>>,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn path(&self, kind: ConfigKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Read a typed config. `reload` bypasses the cache and re-reads the
    /// file from disk.
    pub fn read<T: DeserializeOwned>(&self, kind: ConfigKind, reload: bool) -> Option<T> {
        if !reload {
            if let Some(cached) = self.cached(kind) {
                return self.typed(kind, cached);
            }
        }

        let value = self.read_from_file(kind)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(kind, value.clone());
        }
        self.typed(kind, value)
    }

    /// Write a config file (pretty-printed) and refresh the cache.
    pub fn write<T: Serialize>(&self, kind: ConfigKind, config: &T) -> Result<()> {
        let value = serde_json::to_value(config)?;
        let text = serde_json::to_string_pretty(&value)?;
        fs::write(self.path(kind), text)?;
        let mut cache = self
            .cache
            .write()
            .map_err(|e| anyhow!("config cache lock: {e}"))?;
        cache.insert(kind, value);
        Ok(())
    }

    fn cached(&self, kind: ConfigKind) -> Option<serde_json::Value> {
        self.cache.read().ok()?.get(&kind).cloned()
    }

    fn read_from_file(&self, kind: ConfigKind) -> Option<serde_json::Value> {
        let path = self.path(kind);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed reading config file");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed config file");
                None
            }
        }
    }

    fn typed<T: DeserializeOwned>(&self, kind: ConfigKind, value: serde_json::Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(err) => {
                warn!(file = kind.file_name(), error = %err, "config shape mismatch");
                None
            }
        }
    }
}
