// File: src/error.rs
use crate::core::types::StoreIndex;
use thiserror::Error;

/// Result type alias used throughout the dictionary engine.
pub type Result<T> = std::result::Result<T, TrieError>;

/// Everything that can go wrong while building or querying the dictionary.
///
/// `StoreIndexOutOfRange` and `ZeroFrequencyEntry` raised during normalization
/// describe a corrupted engine; those are never returned, the engine panics
/// with their message instead.
#[derive(Error, Debug)]
pub enum TrieError {
    #[error("engine is already initialized")]
    AlreadyInitialized,
    #[error("engine is not initialized")]
    NotInitialized,
    #[error("operation `{op}` is not valid while the engine is {state}")]
    InvalidState { op: &'static str, state: &'static str },
    #[error("allocation failed while extending the trie")]
    AllocationFailure,
    #[error("dictionary file not found: {0}")]
    FileNotFound(String),
    #[error("line {line}: word field is not valid text")]
    InvalidEncoding { line: usize },
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
    #[error("cannot insert an empty word")]
    EmptyWord,
    #[error("duplicate dictionary entry: {0}")]
    DuplicateEntry(String),
    #[error("dictionary is empty or its total frequency is zero")]
    EmptyDictionary,
    #[error("entry `{0}` has zero frequency")]
    ZeroFrequencyEntry(String),
    #[error("total frequency overflows a 64-bit count")]
    CountOverflow,
    #[error("weights have already been normalized")]
    NormalizationAlreadyRun,
    #[error("store index {index} is out of range for {len} entries")]
    StoreIndexOutOfRange { index: StoreIndex, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl TrieError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TrieError::MalformedLine {
            line,
            reason: reason.into(),
        }
    }
}
