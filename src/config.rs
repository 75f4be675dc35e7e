// File: src/config.rs
use crate::core::engine::TrieEngine;
use crate::error::{Result, TrieError};
use crate::persistence::load_from_disk;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the engine gets its dictionary from and how loudly it logs.
///
/// ```json
/// { "dictionary_path": "dict/jieba.dict.utf8", "snapshot_path": "dict.bin", "log_level": "debug" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Text dictionary in `<word> <count> [<tag>]` format.
    pub dictionary_path: Option<PathBuf>,
    /// Compiled snapshot; preferred over the text dictionary when present.
    pub snapshot_path: Option<PathBuf>,
    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dictionary_path: None,
            snapshot_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TrieError::FileNotFound(path.display().to_string()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Opens a frozen engine: the snapshot if it loads, otherwise the text dictionary.
    pub fn open_engine(&self) -> Result<TrieEngine> {
        if let Some(snapshot) = self.snapshot_path.as_deref().filter(|p| p.is_file()) {
            match load_from_disk(snapshot) {
                Ok(engine) => {
                    info!(path = %snapshot.display(), "using dictionary snapshot");
                    return Ok(engine);
                }
                Err(e) => warn!(path = %snapshot.display(), error = %e, "snapshot unusable, rebuilding"),
            }
        }
        match &self.dictionary_path {
            Some(path) => TrieEngine::from_dictionary(path),
            None => Err(TrieError::FileNotFound("no dictionary configured".to_string())),
        }
    }
}
