//! Filter matchers for collection results.
//!
//! Compiles the declarative [`Filter`] config into a predicate over JSON
//! objects: field equality, regex on a string field, or "any array
//! element matches", composable with conjunction.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use kontrol_state::Filter;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// A compiled filter predicate.
#[derive(Debug)]
pub enum Matcher {
    FieldEquals { field: String, value: Value },
    FieldMatches { field: String, regex: Regex },
    AnyElementMatches { field: String, regex: Regex },
    All(Vec<Matcher>),
}

impl Matcher {
    /// Compile a filter spec, validating its regexes.
    pub fn compile(filter: &Filter) -> Result<Self, FilterError> {
        match filter {
            Filter::FieldEquals { field, value } => Ok(Matcher::FieldEquals {
                field: field.clone(),
                value: value.clone(),
            }),
            Filter::FieldMatches { field, pattern } => Ok(Matcher::FieldMatches {
                field: field.clone(),
                regex: compile_regex(pattern)?,
            }),
            Filter::AnyElementMatches { field, pattern } => Ok(Matcher::AnyElementMatches {
                field: field.clone(),
                regex: compile_regex(pattern)?,
            }),
            Filter::All { filters } => filters
                .iter()
                .map(Matcher::compile)
                .collect::<Result<Vec<_>, _>>()
                .map(Matcher::All),
        }
    }

    /// Whether one object satisfies the predicate.
    pub fn matches(&self, object: &Value) -> bool {
        match self {
            Matcher::FieldEquals { field, value } => {
                field_path(object, field) == Some(value)
            }
            Matcher::FieldMatches { field, regex } => field_path(object, field)
                .and_then(Value::as_str)
                .is_some_and(|s| regex.is_match(s)),
            Matcher::AnyElementMatches { field, regex } => field_path(object, field)
                .and_then(Value::as_array)
                .is_some_and(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|s| regex.is_match(s))
                }),
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(object)),
        }
    }

    /// Narrow a collection to matching elements; a single survivor is
    /// unwrapped to the bare object.
    pub fn apply(&self, items: Vec<Value>) -> Value {
        let mut matched: Vec<Value> = items.into_iter().filter(|v| self.matches(v)).collect();
        if matched.len() == 1 {
            matched.pop().unwrap()
        } else {
            Value::Array(matched)
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(pattern).map_err(|source| FilterError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Navigate a dotted field path inside one object.
fn field_path<'a>(object: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = object;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}
