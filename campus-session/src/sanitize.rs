//! Input sanitization
//!
//! Cleans every value crossing the trust boundary: network responses before
//! they reach state or storage, storage reads before they re-enter state,
//! and credential fields before they are sent (passwords excepted, since
//! trimming or truncation would silently corrupt a legitimate password).
//!
//! This is a best-effort defense-in-depth layer, not a correctness
//! boundary: there is no failure path, and values the walk does not
//! understand are returned unchanged.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Maximum length of a sanitized scalar, in characters
pub const MAX_SCALAR_LEN: usize = 150;

/// Maximum recursion depth for [`sanitize_value`]
const MAX_DEPTH: usize = 32;

/// Maximum number of nodes visited per [`sanitize_value`] call
const MAX_NODES: usize = 10_000;

/// Keys that are never copied into sanitized output, at any depth
const FORBIDDEN_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

static SCRIPT_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn script_block_regex() -> &'static Regex {
    SCRIPT_BLOCK_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script\s*>").unwrap()
    })
}

fn html_tag_regex() -> &'static Regex {
    HTML_TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Sanitize a single string: trim, bound to [`MAX_SCALAR_LEN`] characters,
/// then strip script blocks and HTML tags
pub fn sanitize_scalar(input: &str) -> String {
    let trimmed = input.trim();
    let bounded: String = trimmed.chars().take(MAX_SCALAR_LEN).collect();

    let without_scripts = script_block_regex().replace_all(&bounded, "");
    html_tag_regex()
        .replace_all(&without_scripts, "")
        .into_owned()
}

/// Recursively sanitize every string leaf of a JSON value graph
///
/// Array order and object key order are preserved. Keys named `__proto__`,
/// `constructor`, or `prototype` are dropped wherever they appear. The walk
/// is bounded by depth and node count; subtrees beyond the bound are
/// returned as-is rather than recursed.
pub fn sanitize_value(value: Value) -> Value {
    let mut budget = MAX_NODES;
    walk(value, 0, &mut budget)
}

fn walk(value: Value, depth: usize, budget: &mut usize) -> Value {
    if depth >= MAX_DEPTH || *budget == 0 {
        return value;
    }
    *budget -= 1;

    match value {
        Value::String(s) => Value::String(sanitize_scalar(&s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| walk(item, depth + 1, budget))
                .collect(),
        ),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, field) in fields {
                if FORBIDDEN_KEYS.contains(&key.as_str()) {
                    continue;
                }
                out.insert(key, walk(field, depth + 1, budget));
            }
            Value::Object(out)
        }
        // Numbers, booleans, and null pass through untouched
        other => other,
    }
}
