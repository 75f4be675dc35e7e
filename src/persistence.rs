// File: src/persistence.rs
use crate::core::engine::{total_count, TrieEngine};
use crate::core::types::{DictEntry, EngineState};
use crate::error::{Result, TrieError};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, error};

/// On-disk form of a frozen dictionary.
/// The trie itself is not stored; it is rebuilt from the entries on load.
#[derive(serde::Serialize, serde::Deserialize)]
struct DictionarySnapshot {
    entries: Vec<DictEntry>,
    total_count: u64,
    min_weight: f64,
}

/// Writes a frozen engine to `path`, replacing any existing file atomically.
pub fn save_to_disk(engine: &TrieEngine, path: &Path) -> Result<()> {
    if engine.state() != EngineState::Frozen {
        error!(state = engine.state().as_str(), "only a frozen dictionary can be saved");
        return Err(TrieError::InvalidState {
            op: "save_to_disk",
            state: engine.state().as_str(),
        });
    }

    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let snapshot = DictionarySnapshot {
        entries: engine.entries().cloned().collect(),
        total_count: engine.get_total_count(),
        min_weight: engine.get_min_weight(),
    };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, &snapshot)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| TrieError::Io(e.error))?;
    debug!(path = %path.display(), entries = snapshot.entries.len(), "dictionary snapshot saved");
    Ok(())
}

/// Restores a frozen engine saved by [`save_to_disk`].
pub fn load_from_disk(path: &Path) -> Result<TrieEngine> {
    if !path.is_file() {
        return Err(TrieError::FileNotFound(path.display().to_string()));
    }
    let reader = BufReader::new(File::open(path)?);
    let snapshot: DictionarySnapshot = bincode::deserialize_from(reader)?;

    let sum = total_count(&snapshot.entries)?;
    if sum != snapshot.total_count {
        return Err(TrieError::Snapshot(Box::new(bincode::ErrorKind::Custom(
            format!(
                "total count {} does not match entry sum {}",
                snapshot.total_count, sum
            ),
        ))));
    }

    let engine = TrieEngine::restore(snapshot.entries, snapshot.total_count, snapshot.min_weight)?;
    debug!(path = %path.display(), entries = engine.len(), "dictionary snapshot loaded");
    Ok(engine)
}
