//! Observables submitted for enrichment and request body validation.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Observable types the relay enriches. Anything else is skipped silently.
pub const SUPPORTED_TYPES: &[&str] = &["ip"];

/// An entity submitted for enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observable {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Observable {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_TYPES.contains(&self.kind.as_str())
    }
}

const MISSING: &str = "Missing data for required field.";
const NOT_STRING: &str = "Not a valid string.";
const BLANK: &str = "Field may not be blank.";
const INVALID_INPUT: &str = "Invalid input type.";

/// Parse and validate a request body as a non-empty list of observables.
///
/// Error details name the offending index and field, e.g.
/// `{0: {'value': ['Missing data for required field.']}}`.
pub fn parse_observables(body: &[u8]) -> Result<Vec<Observable>, RelayError> {
    let items = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(items)) => items,
        _ => return Err(schema_error(INVALID_INPUT)),
    };

    if items.is_empty() {
        return Err(schema_error("Shorter than minimum length 1."));
    }

    let mut problems: BTreeMap<usize, Vec<(&str, &str)>> = BTreeMap::new();
    let mut observables = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            problems.insert(index, vec![("_schema", INVALID_INPUT)]);
            continue;
        };

        let mut fields = Vec::new();
        for field in ["type", "value"] {
            let problem = match object.get(field) {
                None | Some(Value::Null) => Some(MISSING),
                Some(Value::String(s)) if s.trim().is_empty() => Some(BLANK),
                Some(Value::String(_)) => None,
                Some(_) => Some(NOT_STRING),
            };
            if let Some(problem) = problem {
                fields.push((field, problem));
            }
        }

        if fields.is_empty() {
            observables.push(Observable {
                kind: str_field(object, "type"),
                value: str_field(object, "value"),
            });
        } else {
            problems.insert(index, fields);
        }
    }

    if problems.is_empty() {
        Ok(observables)
    } else {
        Err(RelayError::InvalidArgument(format_problems(&problems)))
    }
}

fn str_field(object: &serde_json::Map<String, Value>, field: &str) -> String {
    object
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn schema_error(message: &str) -> RelayError {
    RelayError::InvalidArgument(format!("{{'_schema': ['{message}']}}"))
}

fn format_problems(problems: &BTreeMap<usize, Vec<(&str, &str)>>) -> String {
    let mut out = String::from("{");
    for (i, (index, fields)) in problems.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{index}: {{");
        for (j, (field, message)) in fields.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "'{field}': ['{message}']");
        }
        out.push('}');
    }
    out.push('}');
    out
}
