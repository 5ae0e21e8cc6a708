//! Labelled-field extraction from the model's free-text answer.
//!
//! The model is asked to reply with `DETECTED TYPE:`, `CONFIDENCE:` and
//! `GUIDANCE:` lines. Labels match ASCII case-insensitively; any field that
//! cannot be found falls back to a fixed value.

use tracing::debug;

use super::{ClassificationRecord, Confidence, WasteType};

pub const NO_GUIDANCE: &str = "No guidance available.";

const DETECTED_TYPE_LABEL: &str = "DETECTED TYPE:";
const CONFIDENCE_LABEL: &str = "CONFIDENCE:";
const GUIDANCE_LABEL: &str = "GUIDANCE:";

/// Build a record from the full accumulated response text.
pub fn parse_response(text: &str) -> ClassificationRecord {
    let detected_type = labelled_token(text, DETECTED_TYPE_LABEL)
        .map(|t| WasteType::from_token(&t))
        .unwrap_or(WasteType::Unknown);
    let confidence = labelled_token(text, CONFIDENCE_LABEL)
        .map(|t| Confidence::from_token(&t))
        .unwrap_or(Confidence::Low);
    let guidance = labelled_block(text, GUIDANCE_LABEL).unwrap_or_else(|| {
        debug!("No guidance block in classification response");
        NO_GUIDANCE.to_string()
    });

    ClassificationRecord {
        detected_type,
        confidence,
        guidance,
        full_response: text.to_string(),
    }
}

/// First word (`[A-Za-z0-9_]+`) after any occurrence of `label`, lower-cased.
fn labelled_token(text: &str, label: &str) -> Option<String> {
    label_ends(text, label).find_map(|start| {
        let rest = text[start..].trim_start();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        (end > 0).then(|| rest[..end].to_ascii_lowercase())
    })
}

/// Text after the first `label`, up to a blank line or the end, trimmed.
fn labelled_block(text: &str, label: &str) -> Option<String> {
    let start = label_ends(text, label).next()?;
    let rest = text[start..].trim_start();
    let end = rest.find("\n\n").unwrap_or(rest.len());
    let block = rest[..end].trim();
    (!block.is_empty()).then(|| block.to_string())
}

/// Byte offsets just past each case-insensitive occurrence of `label`.
fn label_ends<'a>(text: &'a str, label: &'a str) -> impl Iterator<Item = usize> + 'a {
    // ASCII upper-casing keeps byte offsets aligned with `text`.
    let upper = text.to_ascii_uppercase();
    let mut from = 0;
    std::iter::from_fn(move || {
        let idx = upper[from..].find(label)? + from;
        from = idx + label.len();
        Some(from)
    })
}
