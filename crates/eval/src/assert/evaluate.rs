//! Assertion evaluation.
//!
//! Every assertion is expanded against the actual store first, then each
//! concrete assertion is checked. Failures accumulate across siblings; no
//! check short-circuits another.

use tracing::debug;
use vouch_core::{FactStore, Path, Pattern, PatternRegistry, Value};

use super::{expand, Assert, ExistenceCheck};
use crate::result::{AssertFailure, FailureKind, ValidationResult};

/// Expand and evaluate one assertion.
pub fn evaluate(
    assert: &Assert,
    expected: &FactStore,
    actual: &FactStore,
    registry: &dyn PatternRegistry,
) -> ValidationResult {
    expand(assert, actual)
        .iter()
        .map(|concrete| check(concrete, expected, actual, registry))
        .collect()
}

/// Evaluate a list of sibling assertions, accumulating every failure.
pub fn evaluate_all(
    asserts: &[Assert],
    expected: &FactStore,
    actual: &FactStore,
    registry: &dyn PatternRegistry,
) -> ValidationResult {
    asserts
        .iter()
        .map(|assert| evaluate(assert, expected, actual, registry))
        .collect()
}

fn check(
    assert: &Assert,
    expected: &FactStore,
    actual: &FactStore,
    registry: &dyn PatternRegistry,
) -> ValidationResult {
    match assert {
        Assert::Comparison {
            path,
            lookup,
            equality,
        } => compare(path, lookup, *equality, expected, actual),
        Assert::ArrayMembership { path, lookup } => membership(path, lookup, expected, actual),
        Assert::Conditional {
            conditions,
            then,
            otherwise,
            ..
        } => {
            let met = evaluate_all(conditions, expected, actual, registry).is_success();
            debug!(path = %assert.path(), met, "conditional");
            if met {
                evaluate_all(then, expected, actual, registry)
            } else {
                evaluate_all(otherwise, expected, actual, registry)
            }
        }
        Assert::Existence { path, check } => existence(path, *check, actual),
        Assert::PatternMatch { path, pattern } => pattern_match(path, pattern, actual, registry),
    }
}

fn not_in_store(path: &Path, lookup: &str) -> ValidationResult {
    ValidationResult::failure(AssertFailure::new(
        path.to_string(),
        FailureKind::CouldNotResolveInStore,
        format!("Could not resolve \"{}\" in store", lookup),
    ))
}

fn not_in_response(path: &Path) -> ValidationResult {
    ValidationResult::failure(AssertFailure::new(
        path.to_string(),
        FailureKind::CouldNotResolveInResponse,
        format!("Could not resolve \"{}\" in response", path),
    ))
}

fn compare(
    path: &Path,
    lookup: &str,
    equality: bool,
    expected: &FactStore,
    actual: &FactStore,
) -> ValidationResult {
    let Some(wanted) = expected.get(lookup) else {
        return not_in_store(path, lookup);
    };
    let Some(found) = actual.get_path(path) else {
        return not_in_response(path);
    };
    let (wanted, found) = (wanted.string_form(), found.string_form());
    if (wanted == found) == equality {
        return ValidationResult::success();
    }
    let relation = if equality { "equal" } else { "not equal" };
    ValidationResult::failure(AssertFailure::new(
        path.to_string(),
        FailureKind::Mismatch,
        format!("Expected \"{}\" to {} \"{}\"", found, relation, wanted),
    ))
}

/// Scan the array named by the last wildcard of `path` (or the array at
/// `path` itself) for an element equal to the looked-up value.
fn membership(path: &Path, lookup: &str, expected: &FactStore, actual: &FactStore) -> ValidationResult {
    let Some(wanted) = expected.get(lookup) else {
        return not_in_store(path, lookup);
    };
    let (array, suffix) = match path.last_wildcard() {
        Some(at) => {
            let (head, tail) = path.split_at(at);
            (head, tail.without_segment(0))
        }
        None => (path.clone(), Path::root()),
    };
    let Some(items) = actual.get_path(&array).and_then(Value::as_array) else {
        return not_in_response(&array);
    };

    let wanted = wanted.string_form();
    let matched = (0..items.len()).any(|index| {
        actual
            .get_path(&array.index(index).join(&suffix))
            .is_some_and(|element| element.string_form() == wanted)
    });
    if matched {
        return ValidationResult::success();
    }
    ValidationResult::failure(AssertFailure::new(
        array.wildcard().join(&suffix).to_string(),
        FailureKind::Mismatch,
        format!("Expected an element equal to \"{}\" but none matched", wanted),
    ))
}

fn existence(path: &Path, check: ExistenceCheck, actual: &FactStore) -> ValidationResult {
    let found = actual.get_path(path);
    let failure = match (check, found) {
        (ExistenceCheck::Exists, Some(_)) | (ExistenceCheck::NotExists, None) => None,
        (ExistenceCheck::Exists, None) => Some(format!("Expected \"{}\" to exist", path)),
        (ExistenceCheck::NotExists, Some(value)) => Some(format!(
            "Expected \"{}\" to not exist, actual was {}",
            path, value
        )),
        (ExistenceCheck::IsNull | ExistenceCheck::IsNotNull, None) => {
            return not_in_response(path);
        }
        (ExistenceCheck::IsNull, Some(value)) if !value.is_null() => Some(format!(
            "Expected \"{}\" to be null, actual was {}",
            path, value
        )),
        (ExistenceCheck::IsNotNull, Some(value)) if value.is_null() => {
            Some(format!("Expected \"{}\" to not be null", path))
        }
        (ExistenceCheck::IsNull | ExistenceCheck::IsNotNull, Some(_)) => None,
    };
    match failure {
        Some(message) => ValidationResult::failure(AssertFailure::new(
            path.to_string(),
            FailureKind::Mismatch,
            message,
        )),
        None => ValidationResult::success(),
    }
}

fn pattern_match(
    path: &Path,
    token: &str,
    actual: &FactStore,
    registry: &dyn PatternRegistry,
) -> ValidationResult {
    let Some(pattern) = Pattern::from_token(token) else {
        return ValidationResult::failure(AssertFailure::new(
            path.to_string(),
            FailureKind::PatternMismatch,
            format!("Invalid pattern {}", token),
        ));
    };
    let Some(found) = actual.get_path(path) else {
        return not_in_response(path);
    };
    pattern
        .matches(found, path, registry)
        .into_iter()
        .map(|mismatch| {
            ValidationResult::failure(AssertFailure::new(
                mismatch.path.to_string(),
                FailureKind::PatternMismatch,
                mismatch.message,
            ))
        })
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
