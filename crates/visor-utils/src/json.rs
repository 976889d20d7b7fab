//! JSON encoding with tab indentation and a forgiving decoder.
//!
//! Hand-edited user files routinely end an object or array with a trailing
//! comma. [`from_json`] retries once with the last such comma removed; any
//! further damage is reported as a failed decode.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Serialises `value` as tab-indented JSON.
pub fn to_json<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Parses `text`, tolerating a single trailing comma.
#[must_use]
pub fn from_json<T>(text: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(_) => {
            let repaired = drop_last_trailing_comma(text)?;
            serde_json::from_str(&repaired).ok()
        }
    }
}

/// Removes the last comma that directly precedes a closing `}` or `]`,
/// ignoring whitespace and anything inside string literals.
fn drop_last_trailing_comma(text: &str) -> Option<String> {
    let mut in_string = false;
    let mut escaped = false;
    let mut pending_comma: Option<usize> = None;
    let mut last_trailing: Option<usize> = None;

    for (index, character) in text.char_indices() {
        if in_string {
            match character {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match character {
            '"' => {
                in_string = true;
                pending_comma = None;
            }
            ',' => pending_comma = Some(index),
            '}' | ']' => {
                if let Some(comma) = pending_comma.take() {
                    last_trailing = Some(comma);
                }
            }
            c if c.is_whitespace() => {}
            _ => pending_comma = None,
        }
    }

    let comma = last_trailing?;
    let mut repaired = String::with_capacity(text.len());
    repaired.push_str(text.get(..comma)?);
    repaired.push_str(text.get(comma + 1..)?);
    Some(repaired)
}
