//! Input sanitization.
//!
//! # Responsibilities
//! - Neutralize HTML-significant characters and script payloads in strings
//! - Recursively sanitize structured values (keys and values)
//!
//! # Design Decisions
//! - Strip rather than escape: escaping is not idempotent (`&` → `&amp;` → `&amp;amp;`)
//! - Protocol and handler stripping is a single left-to-right scan over an
//!   output stack: after each pushed char, a pattern ending at the top is
//!   popped. Removals that splice a new pattern together
//!   (`javajavascript:script:`) are caught without rescanning, so work stays
//!   linear and `sanitize_input(sanitize_input(x)) == sanitize_input(x)` holds
//! - The value space is `serde_json::Value`, a closed tagged variant

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
}

const PROTOCOLS: [&str; 3] = ["javascript", "vbscript", "livescript"];

fn is_stripped_char(c: char) -> bool {
    c == '<' || c == '>' || (c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn skip_whitespace_back(out: &[char], mut end: usize) -> usize {
    while end > 0 && out[end - 1].is_whitespace() {
        end -= 1;
    }
    end
}

/// Start index of `word` if `out[..end]` ends with it, ignoring ASCII case.
fn ends_with_word(out: &[char], end: usize, word: &str) -> Option<usize> {
    let len = word.len();
    if end < len {
        return None;
    }
    let start = end - len;
    out[start..end]
        .iter()
        .zip(word.chars())
        .all(|(a, b)| a.eq_ignore_ascii_case(&b))
        .then_some(start)
}

/// Start of a dangerous pattern that ends at the last char of `out`.
///
/// Recognized: `javascript:`, `vbscript:`, `livescript:` (whitespace allowed
/// before the colon), `data: text/html`, and `on<letters>=` handlers that
/// begin at a word boundary.
fn dangerous_suffix(out: &[char]) -> Option<usize> {
    let end = out.len().checked_sub(1)?;
    match out[end] {
        ':' => {
            let keyword_end = skip_whitespace_back(out, end);
            PROTOCOLS
                .iter()
                .find_map(|p| ends_with_word(out, keyword_end, p))
        }
        '=' => {
            let name_end = skip_whitespace_back(out, end);
            let mut start = name_end;
            while start > 0 && out[start - 1].is_ascii_alphabetic() {
                start -= 1;
            }
            let at_boundary = start == 0 || !is_word_char(out[start - 1]);
            let is_handler = name_end - start >= 3
                && out[start].eq_ignore_ascii_case(&'o')
                && out[start + 1].eq_ignore_ascii_case(&'n');
            (at_boundary && is_handler).then_some(start)
        }
        'l' | 'L' => {
            let mime_start = ends_with_word(out, out.len(), "text/html")?;
            let colon_end = skip_whitespace_back(out, mime_start);
            if colon_end == 0 || out[colon_end - 1] != ':' {
                return None;
            }
            let keyword_end = skip_whitespace_back(out, colon_end - 1);
            ends_with_word(out, keyword_end, "data")
        }
        _ => None,
    }
}

/// Sanitize a single untrusted string.
pub fn sanitize_input(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");

    let mut out: Vec<char> = Vec::with_capacity(without_scripts.len());
    for c in without_scripts.chars() {
        if is_stripped_char(c) {
            continue;
        }
        out.push(c);
        // Everything below the new char was already clean, so one pop suffices.
        if let Some(start) = dangerous_suffix(&out) {
            out.truncate(start);
        }
    }

    out.into_iter().collect::<String>().trim().to_string()
}

/// Recursively sanitize a value, preserving its shape.
///
/// Strings are sanitized, arrays are mapped in order, objects have both keys
/// and values sanitized. Numbers, booleans and null pass through. When two keys
/// collapse to the same sanitized key the later one (in map order) wins.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_input(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                out.insert(sanitize_input(&key), sanitize_value(val));
            }
            Value::Object(out)
        }
        other => other,
    }
}

/// Sanitize a raw text body.
///
/// JSON text is parsed, sanitized recursively and re-serialized; anything else
/// is treated as a plain string. The flag reports whether the body was JSON.
pub fn sanitize_body_text(body: &str) -> (String, bool) {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => (sanitize_value(parsed).to_string(), true),
        Err(_) => (sanitize_input(body), false),
    }
}
