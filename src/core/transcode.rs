// File: src/core/transcode.rs
use crate::core::types::CodePoint;

/// Turns raw dictionary bytes into code points.
///
/// The engine only ever consumes this capability; the dictionary loader is the
/// one place that calls `decode` on untrusted input.
pub trait Transcoder {
    /// Decodes `bytes`, or returns `None` if they are not valid in this encoding.
    fn decode(&self, bytes: &[u8]) -> Option<Vec<CodePoint>>;
}

/// UTF-8 transcoder: one code point per Unicode scalar value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Transcoder;

impl Utf8Transcoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transcoder for Utf8Transcoder {
    fn decode(&self, bytes: &[u8]) -> Option<Vec<CodePoint>> {
        std::str::from_utf8(bytes).ok().map(|s| s.chars().collect())
    }
}
