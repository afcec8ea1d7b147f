//! Running entity store updates driven by `$store` directives.
//!
//! A declared example response may carry `"$store": "merge"` or
//! `"$store": "replace"`. After a scenario passes, the real response body is
//! folded into the `ENTITY` facts accordingly and `ENTITY_ID` is refreshed
//! from `ENTITY.id`.

use crate::error::StoreError;
use crate::facts::{FactStore, ENTITY, ENTITY_ID};
use crate::path::Path;
use crate::value::Value;

/// Reserved key carrying the store directive in a declared response body.
pub const STORE_DIRECTIVE_KEY: &str = "$store";

/// How a response body updates the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDirective {
    Merge,
    Replace,
}

impl StoreDirective {
    /// Read the directive from a declared body. Unknown values are ignored.
    pub fn from_body(declared: &Value) -> Option<StoreDirective> {
        match declared.get(STORE_DIRECTIVE_KEY)?.as_str()? {
            "merge" => Some(StoreDirective::Merge),
            "replace" => Some(StoreDirective::Replace),
            _ => None,
        }
    }
}

/// Compute the new entity store from `current` (entity facts only) and the
/// body of the final response.
pub fn apply_directive(
    current: &FactStore,
    directive: StoreDirective,
    body: &Value,
) -> Result<FactStore, StoreError> {
    let entity = match directive {
        StoreDirective::Replace => match body {
            Value::Object(_) => body.clone(),
            other => {
                return Err(StoreError::CouldNotReplaceStore {
                    actual: other.type_name().to_string(),
                })
            }
        },
        StoreDirective::Merge => {
            let incoming = merge_source(body)?;
            let existing = current.get(ENTITY).cloned().unwrap_or_else(Value::object);
            deep_merge(&existing, incoming)
        }
    };

    let mut updated = FactStore::flatten(&entity, &Path::root().field(ENTITY));
    let id = entity
        .get("id")
        .map(Value::string_form)
        .map(Value::string)
        .or_else(|| match directive {
            StoreDirective::Merge => current.get(ENTITY_ID).cloned(),
            StoreDirective::Replace => None,
        });
    if let Some(id) = id {
        updated.insert(ENTITY_ID, id);
    }
    Ok(updated)
}

fn merge_source(body: &Value) -> Result<&Value, StoreError> {
    match body {
        Value::Object(_) => Ok(body),
        Value::Array(items) => match items.first() {
            None => Err(StoreError::CouldNotMergeStore {
                reason: "response body is an empty array".to_string(),
            }),
            Some(first @ Value::Object(_)) => Ok(first),
            Some(other) => Err(StoreError::CouldNotMergeStore {
                reason: format!("first array element is {}, expected object", other.type_name()),
            }),
        },
        other => Err(StoreError::CouldNotMergeStore {
            reason: format!("response body is {}, expected object or array", other.type_name()),
        }),
    }
}

/// Objects merge key by key; anything else is taken from `incoming`.
fn deep_merge(existing: &Value, incoming: &Value) -> Value {
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                let next = match old.get(key) {
                    Some(previous) => deep_merge(previous, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => incoming.clone(),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
