//! Structural patterns used for shape validation.
//!
//! A pattern token is a parenthesised descriptor such as `(string)`,
//! `(number)` or `(Product)`. A trailing `*` inside the parentheses means
//! "list of": `(string*)`. Named patterns resolve through a
//! [`PatternRegistry`]. Declared example bodies convert to patterns with
//! [`Pattern::from_example`], where object keys ending in `?` are optional.

use std::collections::BTreeMap;

use crate::path::Path;
use crate::value::{Map, Scalar, Value};

/// A structural descriptor for a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    String,
    Number,
    Boolean,
    Null,
    Any,
    AnyObject,
    AnyArray,
    ListOf(Box<Pattern>),
    Object(BTreeMap<String, KeyPattern>),
    Exact(Value),
    Named(String),
}

/// A field of an object pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    pub pattern: Pattern,
    pub optional: bool,
}

/// A single place where a value did not match its pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMismatch {
    pub path: Path,
    pub message: String,
}

/// Source of named patterns (the API specification's type system).
pub trait PatternRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Pattern>;
}

/// A registry backed by an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct PatternTable(BTreeMap<String, Pattern>);

impl PatternTable {
    pub fn new() -> Self {
        PatternTable(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, pattern: Pattern) {
        self.0.insert(name.into(), pattern);
    }

    pub fn with(mut self, name: impl Into<String>, pattern: Pattern) -> Self {
        self.insert(name, pattern);
        self
    }
}

impl PatternRegistry for PatternTable {
    fn resolve(&self, name: &str) -> Option<Pattern> {
        self.0.get(name).cloned()
    }
}

impl Pattern {
    /// Parse a pattern token. Returns `None` for anything that is not a
    /// parenthesised descriptor, so literal strings stay literal.
    pub fn from_token(token: &str) -> Option<Pattern> {
        let inner = token.strip_prefix('(')?.strip_suffix(')')?.trim();
        if inner.is_empty() || inner.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
            return None;
        }
        match inner.strip_suffix('*') {
            Some(element) if !element.is_empty() => {
                Some(Pattern::ListOf(Box::new(Pattern::from_name(element))))
            }
            Some(_) => None,
            None => Some(Pattern::from_name(inner)),
        }
    }

    pub fn is_token(text: &str) -> bool {
        Pattern::from_token(text).is_some()
    }

    fn from_name(name: &str) -> Pattern {
        match name {
            "string" => Pattern::String,
            "number" => Pattern::Number,
            "boolean" => Pattern::Boolean,
            "null" => Pattern::Null,
            "anyvalue" => Pattern::Any,
            "object" => Pattern::AnyObject,
            "array" => Pattern::AnyArray,
            other => Pattern::Named(other.to_string()),
        }
    }

    /// Derive a pattern from a declared example value. Pattern tokens become
    /// their pattern, `$name(...)` tokens (lookups and assertions checked
    /// elsewhere) accept anything, other scalars must match exactly,
    /// `$`-prefixed keys are directives and are skipped, and an array is
    /// described by its first element.
    pub fn from_example(declared: &Value) -> Pattern {
        Pattern::derive(declared, Leaves::Checked)
    }

    /// Derive only the structure of a declared example: keys, containers and
    /// literal values. Keys whose value is a pattern token or a `$name(...)`
    /// token are left out, as are conditional blocks; assertions parsed from
    /// the same example own both the presence and the value of those keys.
    pub fn skeleton(declared: &Value) -> Pattern {
        Pattern::derive(declared, Leaves::Deferred)
    }

    fn derive(declared: &Value, leaves: Leaves) -> Pattern {
        match declared {
            Value::Scalar(Scalar::String(s)) if s.starts_with('$') && s.ends_with(')') => {
                Pattern::Any
            }
            Value::Scalar(Scalar::String(s)) => match Pattern::from_token(s) {
                Some(_) if leaves == Leaves::Deferred => Pattern::Any,
                Some(pattern) => pattern,
                None => Pattern::Exact(declared.clone()),
            },
            Value::Scalar(_) => Pattern::Exact(declared.clone()),
            Value::Null => Pattern::Null,
            Value::Array(items) => match items.first() {
                Some(first) => Pattern::ListOf(Box::new(Pattern::derive(first, leaves))),
                None => Pattern::AnyArray,
            },
            Value::Object(fields)
                if leaves == Leaves::Deferred && is_conditional_block(fields) =>
            {
                Pattern::Any
            }
            Value::Object(fields) => Pattern::Object(
                fields
                    .iter()
                    .filter(|(key, value)| !key.starts_with('$') && !leaves.owns_key(value))
                    .map(|(key, value)| {
                        let (name, optional) = match key.strip_suffix('?') {
                            Some(name) => (name.to_string(), true),
                            None => (key.clone(), false),
                        };
                        (
                            name,
                            KeyPattern {
                                pattern: Pattern::derive(value, leaves),
                                optional,
                            },
                        )
                    })
                    .collect(),
            ),
        }
    }

    /// Human-readable descriptor used in mismatch messages.
    pub fn name(&self) -> String {
        match self {
            Pattern::String => "string".to_string(),
            Pattern::Number => "number".to_string(),
            Pattern::Boolean => "boolean".to_string(),
            Pattern::Null => "null".to_string(),
            Pattern::Any => "anyvalue".to_string(),
            Pattern::AnyObject | Pattern::Object(_) => "object".to_string(),
            Pattern::AnyArray => "array".to_string(),
            Pattern::ListOf(element) => format!("list of {}", element.name()),
            Pattern::Exact(value) => value.to_string(),
            Pattern::Named(name) => name.clone(),
        }
    }

    /// Structurally match `actual`, reporting every mismatch with the path at
    /// which it occurred.
    pub fn matches(
        &self,
        actual: &Value,
        path: &Path,
        registry: &dyn PatternRegistry,
    ) -> Vec<PatternMismatch> {
        let mut mismatches = Vec::new();
        self.collect_mismatches(actual, path, registry, &mut Vec::new(), &mut mismatches);
        mismatches
    }

    fn collect_mismatches(
        &self,
        actual: &Value,
        path: &Path,
        registry: &dyn PatternRegistry,
        resolving: &mut Vec<String>,
        out: &mut Vec<PatternMismatch>,
    ) {
        let accepted = match (self, actual) {
            (Pattern::Any, _) => true,
            (Pattern::String, Value::Scalar(Scalar::String(_))) => true,
            (Pattern::Number, Value::Scalar(Scalar::Number(_))) => true,
            (Pattern::Boolean, Value::Scalar(Scalar::Bool(_))) => true,
            (Pattern::Null, Value::Null) => true,
            (Pattern::AnyObject, Value::Object(_)) => true,
            (Pattern::AnyArray, Value::Array(_)) => true,
            (Pattern::Exact(expected), _) => expected == actual,
            (Pattern::ListOf(element), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    element.collect_mismatches(
                        item,
                        &path.index(index),
                        registry,
                        &mut Vec::new(),
                        out,
                    );
                }
                true
            }
            (Pattern::Object(fields), Value::Object(actual_fields)) => {
                for (key, field) in fields {
                    match actual_fields.get(key) {
                        Some(value) => field.pattern.collect_mismatches(
                            value,
                            &path.field(key.clone()),
                            registry,
                            &mut Vec::new(),
                            out,
                        ),
                        None if field.optional => {}
                        None => out.push(PatternMismatch {
                            path: path.field(key.clone()),
                            message: format!("Expected key named \"{}\" was missing", key),
                        }),
                    }
                }
                true
            }
            // Names resolved without descending into the value form a chain;
            // meeting one twice means the registry loops.
            (Pattern::Named(name), _) if resolving.contains(name) => {
                out.push(PatternMismatch {
                    path: path.clone(),
                    message: format!("Cyclic pattern ({})", name),
                });
                true
            }
            (Pattern::Named(name), _) => {
                match registry.resolve(name) {
                    Some(resolved) => {
                        resolving.push(name.clone());
                        resolved.collect_mismatches(actual, path, registry, resolving, out);
                        resolving.pop();
                    }
                    None => out.push(PatternMismatch {
                        path: path.clone(),
                        message: format!("Unknown pattern ({})", name),
                    }),
                }
                true
            }
            _ => false,
        };

        if !accepted {
            out.push(PatternMismatch {
                path: path.clone(),
                message: format!(
                    "Expected {}, actual was {} ({})",
                    self.name(),
                    actual,
                    actual.type_name()
                ),
            });
        }
    }
}

/// Whether pattern tokens in a declared example are checked structurally or
/// left to the assertions parsed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaves {
    Checked,
    Deferred,
}

impl Leaves {
    /// Whether a key declared with this value is checked by its assertion
    /// rather than by the derived pattern.
    fn owns_key(self, declared: &Value) -> bool {
        match self {
            Leaves::Checked => is_presence_check(declared),
            Leaves::Deferred => declared.as_str().is_some_and(|text| {
                let text = text.trim();
                (text.starts_with('$') && text.ends_with(')')) || Pattern::is_token(text)
            }),
        }
    }
}

/// `$conditions` with a `$then` or `$else` branch.
fn is_conditional_block(fields: &Map) -> bool {
    fields.contains_key("$conditions")
        && (fields.contains_key("$then") || fields.contains_key("$else"))
}

/// An argument-less `$name()` call owns the presence of its key.
fn is_presence_check(declared: &Value) -> bool {
    declared
        .as_str()
        .map(str::trim)
        .and_then(|text| text.strip_prefix('$'))
        .and_then(|text| text.strip_suffix("()"))
        .is_some_and(|name| !name.is_empty() && !name.contains('('))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
