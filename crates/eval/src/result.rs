//! Validation results with breadcrumbs.
//!
//! Failures accumulate: a [`ValidationResult`] is successful exactly when it
//! holds no failures, and combining results concatenates their failures.

use serde::Serialize;

/// Why a check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Values were compared and differed.
    Mismatch,
    /// The lookup key was absent from the expected-value store.
    CouldNotResolveInStore,
    /// The asserted path was absent from the response.
    CouldNotResolveInResponse,
    /// The value did not have the expected structure or type.
    PatternMismatch,
    /// The response does not fit the scenario declared in the API specification.
    ShapeMismatch,
    /// Asynchronous completion monitoring gave up or found a mismatch.
    Monitor,
    /// The service signalled a failure itself.
    Signalled,
}

/// One failure, located by a breadcrumb in fact-store notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertFailure {
    pub breadcrumb: String,
    pub kind: FailureKind,
    pub message: String,
}

impl AssertFailure {
    pub fn new(breadcrumb: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        AssertFailure {
            breadcrumb: breadcrumb.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Accumulated outcome of one or many checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    failures: Vec<AssertFailure>,
}

impl ValidationResult {
    pub fn success() -> Self {
        ValidationResult::default()
    }

    pub fn failure(failure: AssertFailure) -> Self {
        ValidationResult {
            failures: vec![failure],
        }
    }

    pub fn from_failures(failures: Vec<AssertFailure>) -> Self {
        ValidationResult { failures }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[AssertFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<AssertFailure> {
        self.failures
    }

    /// Append another result's failures.
    pub fn absorb(&mut self, other: ValidationResult) {
        self.failures.extend(other.failures);
    }

    /// Render as `>> breadcrumb` / message blocks separated by blank lines.
    pub fn report(&self) -> String {
        self.failures
            .iter()
            .map(|f| {
                if f.breadcrumb.is_empty() {
                    f.message.clone()
                } else {
                    format!(">> {}\n{}", f.breadcrumb, f.message)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl FromIterator<ValidationResult> for ValidationResult {
    fn from_iter<T: IntoIterator<Item = ValidationResult>>(iter: T) -> Self {
        let mut combined = ValidationResult::success();
        for result in iter {
            combined.absorb(result);
        }
        combined
    }
}
