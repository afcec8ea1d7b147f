//! Parsing declared example bodies into assertion trees.
//!
//! Only string leaves matching the token grammar, pattern tokens and `$if`
//! objects become assertions; literal values never do. Elements of a
//! declared array are parsed at the wildcard segment so they apply to every
//! element of the actual array. Other `$`-prefixed keys (such as `$store`)
//! are directives and are skipped.

use vouch_core::{Map, Path, Pattern, Value};

use super::{Assert, ExistenceCheck};

const IF: &str = "$if";
const CONDITIONS: &str = "$conditions";
const THEN: &str = "$then";
const ELSE: &str = "$else";

/// Parse every assertion declared in `declared`, rooted at `prefix`.
pub fn parse_asserts(prefix: &Path, declared: &Value) -> Vec<Assert> {
    let mut asserts = Vec::new();
    parse_into(prefix, declared, &mut asserts);
    asserts
}

fn parse_into(path: &Path, declared: &Value, out: &mut Vec<Assert>) {
    match declared {
        Value::Object(fields) => {
            if is_conditional(fields) {
                out.push(conditional(path, fields));
                return;
            }
            for (key, child) in fields {
                if key == IF {
                    if let Some(branches) = child.as_object().filter(|b| is_conditional(b)) {
                        out.push(conditional(path, branches));
                    }
                    continue;
                }
                if key.starts_with('$') {
                    continue;
                }
                match key.strip_suffix('?') {
                    Some(name) => {
                        let field = path.field(name);
                        let then = parse_asserts(&field, child);
                        if !then.is_empty() {
                            out.push(optional(field, then));
                        }
                    }
                    None => parse_into(&path.field(key.as_str()), child, out),
                }
            }
        }
        Value::Array(items) => {
            let element = path.wildcard();
            for item in items {
                parse_into(&element, item, out);
            }
        }
        Value::Scalar(_) => {
            if let Some(assert) = declared.as_str().and_then(|text| parse_leaf(path, text)) {
                out.push(assert);
            }
        }
        Value::Null => {}
    }
}

fn is_conditional(fields: &Map) -> bool {
    fields.contains_key(CONDITIONS) && (fields.contains_key(THEN) || fields.contains_key(ELSE))
}

fn conditional(path: &Path, fields: &Map) -> Assert {
    let branch = |key: &str| {
        fields
            .get(key)
            .map(|declared| parse_asserts(path, declared))
            .unwrap_or_default()
    };
    Assert::Conditional {
        path: path.clone(),
        conditions: branch(CONDITIONS),
        then: branch(THEN),
        otherwise: branch(ELSE),
    }
}

/// Assertions on an optional key apply only when the key is present.
fn optional(field: Path, then: Vec<Assert>) -> Assert {
    Assert::Conditional {
        path: field.clone(),
        conditions: vec![Assert::Existence {
            path: field,
            check: ExistenceCheck::Exists,
        }],
        then,
        otherwise: Vec::new(),
    }
}

/// Parse a single string leaf.
pub fn parse_leaf(path: &Path, text: &str) -> Option<Assert> {
    let text = text.trim();
    let lookup = |name: &str| argument(text, name).filter(|key| !key.is_empty());
    let empty_call = |name: &str| argument(text, name).is_some_and(str::is_empty);

    if let Some(key) = lookup("$eq") {
        return Some(Assert::Comparison {
            path: path.clone(),
            lookup: key.to_string(),
            equality: true,
        });
    }
    if let Some(key) = lookup("$neq") {
        return Some(Assert::Comparison {
            path: path.clone(),
            lookup: key.to_string(),
            equality: false,
        });
    }
    if let Some(key) = lookup("$array_has") {
        return Some(Assert::ArrayMembership {
            path: path.clone(),
            lookup: key.to_string(),
        });
    }

    let check = [
        ("$exists", ExistenceCheck::Exists),
        ("$not_exists", ExistenceCheck::NotExists),
        ("$is_null", ExistenceCheck::IsNull),
        ("$is_not_null", ExistenceCheck::IsNotNull),
    ]
    .into_iter()
    .find(|(name, _)| empty_call(name))
    .map(|(_, check)| check);
    if let Some(check) = check {
        return Some(Assert::Existence {
            path: path.clone(),
            check,
        });
    }

    Pattern::is_token(text).then(|| Assert::PatternMatch {
        path: path.clone(),
        pattern: text.to_string(),
    })
}

fn argument<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
