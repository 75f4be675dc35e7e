//! Dictionary text format.
//!
//! One entry per line, fields separated by whitespace:
//!
//! ```text
//! <word> <count> [<tag>]
//! ```
//!
//! `<count>` is a non-negative integer and `<tag>` is free text. Lines with
//! no fields at all are ignored; any other field count is an error.

use crate::core::transcode::Transcoder;
use crate::core::types::DictEntry;
use crate::error::{Result, TrieError};
use std::path::Path;

/// Splits a raw line on ASCII whitespace, dropping empty fields.
pub fn split_fields(line: &[u8]) -> Vec<&[u8]> {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|field| !field.is_empty())
        .collect()
}

pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Parses one dictionary line into an unweighted entry.
///
/// `line_no` is 1-based and only used for error reporting.
/// Returns `Ok(None)` for blank lines.
pub fn parse_line(
    line_no: usize,
    line: &[u8],
    transcoder: &dyn Transcoder,
) -> Result<Option<DictEntry>> {
    let fields = split_fields(line);
    match fields.len() {
        0 => return Ok(None),
        2 | 3 => {}
        n => {
            return Err(TrieError::malformed(
                line_no,
                format!("expected 2 or 3 fields, found {}", n),
            ))
        }
    }

    let word = transcoder
        .decode(fields[0])
        .ok_or(TrieError::InvalidEncoding { line: line_no })?;

    let raw_count = std::str::from_utf8(fields[1])
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            TrieError::malformed(
                line_no,
                format!("invalid count `{}`", String::from_utf8_lossy(fields[1])),
            )
        })?;

    let tag = match fields.get(2) {
        Some(raw) => Some(
            std::str::from_utf8(raw)
                .map_err(|_| TrieError::InvalidEncoding { line: line_no })?
                .to_string(),
        ),
        None => None,
    };

    Ok(Some(DictEntry::new(word, raw_count, tag)))
}
