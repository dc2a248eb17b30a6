//! Pulls a rating out of the model's free-text reply.
//!
//! Candidate spans are balanced `{...}` regions, visited leftmost first and,
//! for the same start, outermost before anything nested inside. Brace
//! matching follows JSON string rules, so braces inside quoted text (with
//! `\"` escapes) do not open or close a span. An opening brace that is never
//! closed is a partial match and is skipped. The first candidate that parses
//! as a JSON object with a numeric `rating` (or `score`) wins; when none
//! does, the reply is kept verbatim as the explanation with a neutral rating.
//!
//! A greedy first-`{`-to-last-`}` span needs no separate pass: whenever it
//! parses as an object, it is exactly the first balanced candidate.
//!
//! Only the first [`MAX_SCAN_BYTES`] of the reply are scanned, and at most
//! [`MAX_CANDIDATE_STARTS`] opening braces are tried, so the work per reply
//! is bounded no matter how the model was steered.

use crate::messages::AnalysisResult;
use serde_json::{Map, Value};

/// Rating used when the reply carries no usable JSON object.
pub const DEFAULT_RATING: u8 = 5;
/// Upper bound of the rating scale; larger values are clamped to it.
pub const MAX_RATING: u8 = 10;
/// Prefix of the reply, in bytes, searched for JSON objects.
pub const MAX_SCAN_BYTES: usize = 16 * 1024;
/// Opening braces tried as candidate starts before giving up.
pub const MAX_CANDIDATE_STARTS: usize = 64;

pub fn parse_analysis(reply: &str) -> AnalysisResult {
    let mut candidates = 0usize;

    for span in json_spans(reply) {
        candidates += 1;
        let Ok(Value::Object(object)) = serde_json::from_str::<Value>(span) else {
            continue;
        };
        if let Some(result) = analysis_from_object(&object, reply) {
            return result;
        }
    }

    if candidates == 0 {
        log::debug!("Model reply has no JSON object, using the default rating");
    } else {
        log::warn!(
            "Model reply had {candidates} JSON-like span(s) but none carried a rating, using the default rating"
        );
    }
    AnalysisResult::new(DEFAULT_RATING, reply)
}

/// Balanced `{...}` spans in the scanned prefix of `text`, ordered by start position.
///
/// Spans are produced lazily, so callers that stop at the first usable one
/// never scan past it.
pub fn json_spans(text: &str) -> impl Iterator<Item = &str> {
    let window = &text[..scan_limit(text)];
    window
        .match_indices('{')
        .take(MAX_CANDIDATE_STARTS)
        .filter_map(move |(start, _)| matching_brace(window, start).map(|end| &window[start..=end]))
}

fn scan_limit(text: &str) -> usize {
    let mut limit = text.len().min(MAX_SCAN_BYTES);
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    limit
}

fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // all delimiters are ASCII, so byte offsets stay on char boundaries
    for (offset, byte) in text.as_bytes()[start..].iter().copied().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn analysis_from_object(object: &Map<String, Value>, reply: &str) -> Option<AnalysisResult> {
    let rating = object
        .get("rating")
        .or_else(|| object.get("score"))
        .and_then(normalize_rating)?;
    let explanation = match object.get("explanation").and_then(Value::as_str) {
        Some(explanation) => explanation.to_string(),
        None => reply.to_string(),
    };
    Some(AnalysisResult::new(rating, explanation))
}

/// Accepts integers, floats (rounded) and numeric strings, clamped to `0..=10`.
fn normalize_rating(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, f64::from(MAX_RATING)) as u8)
}
