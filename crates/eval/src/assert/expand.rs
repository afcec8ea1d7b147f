//! Dynamic expansion of wildcard assertions over the actual response.
//!
//! An assertion whose path contains `[*]` is rewritten against the actual
//! store: when the value at the wildcard's prefix is an array of `n`
//! elements the assertion becomes `n` copies, one per index; when it is
//! anything else (or absent) the wildcard segment is dropped and a single
//! assertion remains. An empty actual array therefore yields nothing to
//! check. Expansion recurses until no expandable wildcard is left.
//!
//! Array membership keeps its last wildcard, which names the array it scans.
//! Conditionals expand along their own path only; their branches expand
//! when evaluated.

use vouch_core::{FactStore, Segment, Value};

use super::Assert;

/// Expand `assert` over the arrays of `actual`.
pub fn expand(assert: &Assert, actual: &FactStore) -> Vec<Assert> {
    let Some(at) = expandable_wildcard(assert) else {
        return vec![assert.clone()];
    };
    let (prefix, _) = assert.path().split_at(at);
    match actual.get_path(&prefix) {
        Some(Value::Array(items)) => (0..items.len())
            .flat_map(|index| expand(&assert.bind_segment(at, &Segment::Index(index)), actual))
            .collect(),
        _ => expand(&assert.drop_segment(at), actual),
    }
}

fn expandable_wildcard(assert: &Assert) -> Option<usize> {
    let path = assert.path();
    let first = path.first_wildcard()?;
    match assert {
        Assert::ArrayMembership { .. } if path.last_wildcard() == Some(first) => None,
        _ => Some(first),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
