//! `${key}` / `${key:default}` placeholder expressions.
//!
//! Key extraction only reports the `key` part of each token; defaults are
//! skipped, but braces inside a default are balanced so a nested token such
//! as `${a:${b}}` still closes at the right place. Tokens without a closing
//! brace or with an empty key are kept as literal text.

use crate::{GrayCfgError, Result};

const PREFIX: &str = "${";
const VALUE_SEPARATOR: u8 = b':';
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder {
        key: &'a str,
        default: Option<&'a str>,
    },
}

/// Index of the `}` closing the token whose `${` starts at `start`.
fn find_token_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut nested = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(start + PREFIX.len()) {
        match b {
            b'{' => nested += 1,
            b'}' if nested == 0 => return Some(i),
            b'}' => nested -= 1,
            _ => {}
        }
    }
    None
}

fn split_default(body: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            VALUE_SEPARATOR if depth == 0 => return (&body[..i], Some(&body[i + 1..])),
            _ => {}
        }
    }
    (body, None)
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(PREFIX) {
        let start = cursor + offset;
        if start > cursor {
            out.push(Segment::Literal(&text[cursor..start]));
        }
        let Some(end) = find_token_end(text, start) else {
            out.push(Segment::Literal(&text[start..]));
            return out;
        };
        let (key, default) = split_default(&text[start + PREFIX.len()..end]);
        if key.is_empty() {
            out.push(Segment::Literal(&text[start..=end]));
        } else {
            out.push(Segment::Placeholder { key, default });
        }
        cursor = end + 1;
    }
    if cursor < text.len() {
        out.push(Segment::Literal(&text[cursor..]));
    }
    out
}

/// Extract the distinct placeholder keys referenced by `expression`, in order of appearance.
///
/// A key that is itself built from placeholders (`${${prefix}.port}`) contributes
/// the keys it is built from.
pub fn extract_keys(expression: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    collect_keys(expression, &mut keys);
    keys
}

fn collect_keys(expression: &str, keys: &mut Vec<String>) {
    for segment in segments(expression) {
        if let Segment::Placeholder { key, .. } = segment {
            if key.contains(PREFIX) {
                collect_keys(key, keys);
            } else if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
}

/// Substitute every placeholder in `expression` using `lookup`.
///
/// Resolved values and defaults are themselves resolved, so a value may refer
/// to other keys. A key with neither a value nor a default fails the whole
/// expression.
pub fn resolve_placeholders<F>(expression: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    resolve_nested(expression, expression, &lookup, 0)
}

fn resolve_nested(
    text: &str,
    original: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
    depth: usize,
) -> Result<String> {
    if depth > MAX_DEPTH {
        return Err(GrayCfgError::PlaceholderDepth(original.to_string()));
    }
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Placeholder { key, default } => {
                let key = if key.contains(PREFIX) {
                    resolve_nested(key, original, lookup, depth + 1)?
                } else {
                    key.to_string()
                };
                let value = match (lookup(&key), default) {
                    (Some(value), _) => resolve_nested(&value, original, lookup, depth + 1)?,
                    (None, Some(default)) => resolve_nested(default, original, lookup, depth + 1)?,
                    (None, None) => {
                        return Err(GrayCfgError::UnresolvablePlaceholder {
                            key,
                            expression: original.to_string(),
                        })
                    }
                };
                out.push_str(&value);
            }
        }
    }
    Ok(out)
}
