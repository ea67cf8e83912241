//! Best-effort repair of string-encoded tool arguments.
//!
//! The model sometimes returns structured parameters (objects/arrays)
//! serialized as strings. For parameters the schema declares as `object` or
//! `array`, a string value gets a strict JSON parse, then a permissive
//! literal parse (single quotes, `None`/`True`/`False`), and otherwise passes
//! through unchanged with a warning. This is advisory repair and is total:
//! no input can make it fail.

use serde_json::Value;
use tracing::{debug, warn};

use super::{InputSchema, PropertySchema, ToolInput};

/// Tokens the model uses for "no value" in string form.
const NULL_TOKENS: &[&str] = &["null", "None", ""];

/// Repair every parameter of a tool invocation against its declared schema.
///
/// Parameters not declared in the schema, non-string values, and parameters
/// of scalar declared type pass through untouched.
pub fn coerce_tool_input(input: ToolInput, schema: &InputSchema, tool_name: &str) -> ToolInput {
    if schema.properties.is_empty() {
        return input;
    }

    input
        .into_iter()
        .map(|(name, value)| {
            let coerced = match schema.properties.get(&name) {
                Some(property) => coerce_value(value, property, &name, tool_name),
                None => value,
            };
            (name, coerced)
        })
        .collect()
}

/// Repair a single value against its declared parameter schema. Total:
/// anything unparseable degrades to the original value.
pub fn coerce_value(value: Value, property: &PropertySchema, param: &str, tool: &str) -> Value {
    let raw = match &value {
        Value::String(s) => s,
        _ => return value,
    };

    if property.value_type != "object" && property.value_type != "array" {
        return value;
    }

    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match parse_structured(trimmed) {
            Some(parsed) => {
                debug!(param, tool, "auto-parsed string-encoded structured argument");
                parsed
            }
            None => {
                warn!(param, tool, "could not parse string-encoded structured argument");
                value
            }
        }
    } else if NULL_TOKENS.contains(&trimmed) {
        // A declared non-null default means the literal token was probably
        // intentional; keep it.
        match property.default {
            None | Some(Value::Null) => Value::Null,
            Some(_) => value,
        }
    } else {
        value
    }
}

/// Strict JSON first, then the permissive literal form.
fn parse_structured(raw: &str) -> Option<Value> {
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return Some(parsed);
    }
    serde_json::from_str::<Value>(&normalize_literal(raw)).ok()
}

/// Rewrite a Python-style literal expression into JSON: single-quoted
/// strings become double-quoted, bare `None`/`True`/`False` become their
/// JSON spellings. Content inside strings is preserved.
fn normalize_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '\'' | '"' => {
                chars.next();
                copy_string(c, &mut chars, &mut out);
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&w) = chars.peek() {
                    if w.is_ascii_alphanumeric() || w == '_' {
                        word.push(w);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "None" => out.push_str("null"),
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    other => out.push_str(other),
                }
            }
            _ => {
                out.push(c);
                chars.next();
            }
        }
    }

    out
}

fn copy_string(
    quote: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
) {
    out.push('"');
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                // \' has no meaning in JSON; unescape it
                Some('\'') if quote == '\'' => out.push('\''),
                Some(esc) => {
                    out.push('\\');
                    out.push(esc);
                }
                None => break,
            }
        } else if c == quote {
            out.push('"');
            return;
        } else if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
    }
    // Unterminated string: the caller's parse fails and the original value
    // passes through.
}
