//! Managed-region partitioning.
//!
//! A managed region is bounded by two marker comments:
//!
//! ```text
//! <!-- News Start: automatically maintained -->
//! ...managed text...
//! <!-- News End -->
//! ```
//!
//! Everything outside the markers is handed back untouched as `prefix` and
//! `suffix`, so `prefix + new_body + suffix` rewrites only the region.

use crate::error::{NewscastError, Result};

/// A document split around its managed region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Text up to and including the start marker and the newline after it.
    pub prefix: String,
    /// The managed text, trimmed.
    pub body: String,
    /// The newline before the end marker and everything after it.
    pub suffix: String,
}

impl Partition {
    /// Reassemble the document around a new region body.
    pub fn assemble(&self, body: &str) -> String {
        format!("{}{}{}", self.prefix, body, self.suffix)
    }
}

/// Offset of the first `<!-- {label} {word}` marker whose word ends there,
/// as in `<!-- News Start -->` or `<!-- News Start: bot -->`, but not
/// `<!-- News Started -->`.
fn find_marker(text: &str, label: &str, word: &str) -> Option<usize> {
    let marker = format!("<!-- {label} {word}");
    text.match_indices(&marker)
        .map(|(at, _)| at)
        .find(|&at| !text[at + marker.len()..].starts_with(|c: char| c.is_alphanumeric()))
}

/// Split `text` around the region labelled `label`.
///
/// `document` only names the document in the error.
pub fn partition(text: &str, label: &str, document: &str) -> Result<Partition> {
    let missing = || NewscastError::MissingMarkers {
        document: document.to_string(),
        label: label.to_string(),
    };

    let marker_at = find_marker(text, label, "Start").ok_or_else(missing)?;
    let mut body_start = text[marker_at..].find("-->").ok_or_else(missing)? + marker_at + 3;
    if text[body_start..].starts_with('\n') {
        body_start += 1;
    }
    let mut body_end = find_marker(&text[body_start..], label, "End").ok_or_else(missing)? + body_start;
    // An empty region shares one newline between both markers; it ends up
    // on both sides.
    if text[..body_end].ends_with('\n') {
        body_end -= 1;
    }
    let body = text.get(body_start..body_end).unwrap_or_default();

    Ok(Partition {
        prefix: text[..body_start].to_string(),
        body: body.trim().to_string(),
        suffix: text[body_end..].to_string(),
    })
}
