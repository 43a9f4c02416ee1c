//! Write-path type inference.
//!
//! Bytes committed to a file are parsed as YAML first; anything that does
//! not parse into a non-null structure is kept as text.

use log::debug;
use yamlfs_core_store::Value;

use crate::convert::yaml_to_value;

/// Decide the tree value for bytes written to a file.
///
/// The policy is parse-first, string-fallback:
///
/// 1. If the text parses as YAML into a non-null value, that value is used.
///    Writing `key: value` therefore turns the file into a directory.
/// 2. Otherwise the text becomes a string. Multi-line text (after trailing
///    newlines are stripped) is kept verbatim; single-line text loses its
///    trailing newline.
///
/// Multi-line text that only parses as a folded plain scalar (`a\n- b`
/// reads as `a - b`) is not structure and takes the string path. Explicit
/// block and quoted scalars are still accepted.
///
/// ```rust
/// use yamlfs_serde_store::infer_value;
/// use yamlfs_core_store::Value;
///
/// assert_eq!(infer_value(b"plain text\n"), Value::from("plain text"));
/// assert_eq!(infer_value(b"a\n- b"), Value::from("a\n- b"));
/// assert_eq!(infer_value(b"123"), Value::Integer(123));
/// ```
pub fn infer_value(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);

    match serde_yaml_ng::from_str::<serde_yaml_ng::Value>(&text) {
        Ok(serde_yaml_ng::Value::Null) => {
            debug!("content parsed to null, storing as text");
        }
        Ok(parsed) if is_folded_scalar(&parsed, &text) => {
            debug!("multi-line content folded into one scalar, storing as text");
        }
        Ok(parsed) => {
            debug!("content parsed as structured YAML");
            return yaml_to_value(parsed);
        }
        Err(e) => {
            debug!("content is not valid YAML ({}), storing as text", e);
        }
    }

    text_value(&text)
}

fn text_value(text: &str) -> Value {
    let stripped = text.trim_end_matches('\n');
    if stripped.contains('\n') {
        Value::String(text.to_string())
    } else {
        Value::String(stripped.to_string())
    }
}

fn is_folded_scalar(parsed: &serde_yaml_ng::Value, text: &str) -> bool {
    let scalar = matches!(
        parsed,
        serde_yaml_ng::Value::String(_)
            | serde_yaml_ng::Value::Number(_)
            | serde_yaml_ng::Value::Bool(_)
    );
    if !scalar || !text.trim_end_matches('\n').contains('\n') {
        return false;
    }
    !matches!(
        text.trim_start().chars().next(),
        Some('|' | '>' | '"' | '\'')
    )
}
