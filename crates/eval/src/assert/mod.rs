//! Assertion DSL.
//!
//! Assertions are declared inside example response bodies as string tokens
//! (`$eq(key)`, `$neq(key)`, `$array_has(key)`, `$exists()`,
//! `$not_exists()`, `$is_null()`, `$is_not_null()`, pattern tokens such as
//! `(string)`) or as `$if` objects carrying `$conditions` / `$then` /
//! `$else`. They are parsed once into an immutable [`Assert`] tree
//! ([`parse`]), expanded over the actual response's arrays ([`expand`]) and
//! evaluated by a single exhaustive match ([`evaluate`]).

pub mod evaluate;
pub mod expand;
pub mod parse;

use vouch_core::{Path, Segment};

pub use evaluate::{evaluate, evaluate_all};
pub use expand::expand;
pub use parse::parse_asserts;

/// Presence/nullity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceCheck {
    Exists,
    NotExists,
    IsNull,
    IsNotNull,
}

/// One declared assertion, rooted at `path` in the actual store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assert {
    /// String-form equality (or inequality) with the value stored at `lookup`.
    Comparison {
        path: Path,
        lookup: String,
        equality: bool,
    },
    /// Some element of the nearest enclosing array equals the looked-up value.
    ArrayMembership { path: Path, lookup: String },
    /// `then` when every condition holds, `otherwise` when any does not.
    Conditional {
        path: Path,
        conditions: Vec<Assert>,
        then: Vec<Assert>,
        otherwise: Vec<Assert>,
    },
    Existence { path: Path, check: ExistenceCheck },
    /// The value matches the pattern token (e.g. `(string)`, `(Product)`).
    PatternMatch { path: Path, pattern: String },
}

impl Assert {
    pub fn path(&self) -> &Path {
        match self {
            Assert::Comparison { path, .. }
            | Assert::ArrayMembership { path, .. }
            | Assert::Conditional { path, .. }
            | Assert::Existence { path, .. }
            | Assert::PatternMatch { path, .. } => path,
        }
    }

    /// Apply `rewrite` to this assertion's path and, for conditionals, to
    /// every nested assertion's path.
    pub(crate) fn map_paths(&self, rewrite: &dyn Fn(&Path) -> Path) -> Assert {
        match self {
            Assert::Comparison {
                path,
                lookup,
                equality,
            } => Assert::Comparison {
                path: rewrite(path),
                lookup: lookup.clone(),
                equality: *equality,
            },
            Assert::ArrayMembership { path, lookup } => Assert::ArrayMembership {
                path: rewrite(path),
                lookup: lookup.clone(),
            },
            Assert::Conditional {
                path,
                conditions,
                then,
                otherwise,
            } => {
                let nested = |asserts: &[Assert]| {
                    asserts
                        .iter()
                        .map(|a| a.map_paths(rewrite))
                        .collect::<Vec<_>>()
                };
                Assert::Conditional {
                    path: rewrite(path),
                    conditions: nested(conditions),
                    then: nested(then),
                    otherwise: nested(otherwise),
                }
            }
            Assert::Existence { path, check } => Assert::Existence {
                path: rewrite(path),
                check: *check,
            },
            Assert::PatternMatch { path, pattern } => Assert::PatternMatch {
                path: rewrite(path),
                pattern: pattern.clone(),
            },
        }
    }

    /// Replace the segment at position `at` (a wildcard shared with every
    /// nested path) by `segment`.
    pub(crate) fn bind_segment(&self, at: usize, segment: &Segment) -> Assert {
        self.map_paths(&|path| {
            if path.segments().get(at) == Some(&Segment::Wildcard) {
                path.with_segment(at, segment.clone())
            } else {
                path.clone()
            }
        })
    }

    /// Drop the wildcard segment at position `at`.
    pub(crate) fn drop_segment(&self, at: usize) -> Assert {
        self.map_paths(&|path| {
            if path.segments().get(at) == Some(&Segment::Wildcard) {
                path.without_segment(at)
            } else {
                path.clone()
            }
        })
    }
}
