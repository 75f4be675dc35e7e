// src/core/types.rs
use serde::{Deserialize, Serialize};

/// One decoded unit of text; the label on a trie edge.
pub type CodePoint = char;

/// Position of an entry in the engine's entry store.
/// Trie nodes hold this instead of a reference because the store grows during the build.
pub type StoreIndex = usize;

/// A single dictionary word and its frequency data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    pub word: Vec<CodePoint>,
    /// Frequency exactly as read from the dictionary.
    pub raw_count: u64,
    /// Optional classification label, e.g. a part-of-speech tag.
    pub tag: Option<String>,
    /// `ln(raw_count / total_count)`; zero until the engine is normalized.
    pub weight: f64,
    pub store_index: StoreIndex,
}

impl DictEntry {
    /// Creates an unweighted entry. The store index is assigned on insert.
    pub fn new(word: Vec<CodePoint>, raw_count: u64, tag: Option<String>) -> Self {
        Self {
            word,
            raw_count,
            tag,
            weight: 0.0,
            store_index: 0,
        }
    }

    pub fn from_text(word: &str, raw_count: u64, tag: Option<&str>) -> Self {
        Self::new(word.chars().collect(), raw_count, tag.map(str::to_string))
    }

    /// Number of code points in the word.
    pub fn len(&self) -> usize {
        self.word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    pub fn word_string(&self) -> String {
        self.word.iter().collect()
    }
}

/// Lifecycle of a [`TrieEngine`](crate::core::engine::TrieEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// Accepting inserts; weights are not yet assigned.
    Building,
    /// Weights assigned; read-only from here on.
    Frozen,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Building => "building",
            EngineState::Frozen => "frozen",
        }
    }
}
