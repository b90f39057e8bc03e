//! Path-field validation and expression interpolation.
//!
//! Data-flow fields written in the path-based dialect hold path expressions
//! anchored at the root selector `$`. Values may instead be unresolved
//! placeholders, late-bound text supplied by an outer system, which pass
//! through every check untouched.

use serde_json::{Map, Value};

use crate::error::{DefinitionError, DefinitionResult};

/// The selector every resolved path expression starts from.
pub const ROOT_SELECTOR: char = '$';

/// True when the value is an unresolved placeholder rather than a path.
pub fn is_placeholder(value: &str) -> bool {
    value.contains("${")
}

/// Validate a configured path expression.
///
/// A resolved path must begin with the root selector. Placeholders are
/// accepted as-is; whatever resolves them later owns their shape.
pub fn validate_path(field: &str, path: &str) -> DefinitionResult<()> {
    if is_placeholder(path) || path.starts_with(ROOT_SELECTOR) {
        return Ok(());
    }
    Err(DefinitionError::MalformedPath {
        field: field.to_string(),
        path: path.to_string(),
    })
}

/// Render a path-dialect parameter or assignment object.
///
/// Walks the value recursively. Every string value that begins with the
/// root selector selects data at evaluation time, so its key moves to the
/// `<key>.$` form; keys already carrying the suffix pass through verbatim,
/// as do non-path strings and non-string leaves.
pub fn render_object(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut rendered = Map::new();
            for (key, entry) in map {
                match entry {
                    Value::String(text)
                        if text.starts_with(ROOT_SELECTOR) && !key.ends_with(".$") =>
                    {
                        rendered.insert(format!("{key}.$"), entry.clone());
                    }
                    _ => {
                        rendered.insert(key.clone(), render_object(entry));
                    }
                }
            }
            Value::Object(rendered)
        }
        Value::Array(items) => Value::Array(items.iter().map(render_object).collect()),
        other => other.clone(),
    }
}
