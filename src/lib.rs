// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod persistence;

pub use crate::config::EngineConfig;
pub use crate::core::engine::TrieEngine;
pub use crate::core::transcode::{Transcoder, Utf8Transcoder};
pub use crate::core::types::{CodePoint, DictEntry, EngineState, StoreIndex};
pub use crate::error::{Result, TrieError};
