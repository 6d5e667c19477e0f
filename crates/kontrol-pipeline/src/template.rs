//! Template rendering for step options.
//!
//! Supports variable substitution only — `<%= container.Id %>` — looked
//! up in the object store by dotted path. No expressions, no code
//! evaluation.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::store::ObjectStore;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unresolved template reference: {0}")]
    Unresolved(String),

    #[error("template reference {0} is not a scalar")]
    NotScalar(String),
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<%=\s*([A-Za-z0-9_.]+)\s*%>").unwrap())
}

/// Render one template string against the store.
pub fn render_template(template: &str, store: &ObjectStore) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder_re().captures_iter(template) {
        let whole = caps.get(0).unwrap();
        let path = &caps[1];

        out.push_str(&template[last..whole.start()]);
        let value = store
            .lookup_path(path)
            .ok_or_else(|| TemplateError::Unresolved(path.to_string()))?;
        out.push_str(&scalar_to_string(path, value)?);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Render every string leaf of a structured options value; non-string
/// literals pass through unchanged.
pub fn render_options(options: &Value, store: &ObjectStore) -> Result<Value, TemplateError> {
    match options {
        Value::String(s) => Ok(Value::String(render_template(s, store)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| render_options(item, store))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), render_options(v, store)?)))
            .collect::<Result<serde_json::Map<_, _>, TemplateError>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn scalar_to_string(path: &str, value: &Value) -> Result<String, TemplateError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(TemplateError::NotScalar(path.to_string())),
    }
}
