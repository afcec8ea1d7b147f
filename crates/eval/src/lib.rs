//! vouch-eval -- substitution and assertion evaluation.
//!
//! - [`substitution`] resolves `$(key)` / `$rand(key)` tokens against the
//!   config and entity fact stores
//! - [`assert`] parses, expands and evaluates the assertion DSL declared in
//!   example bodies
//! - [`result`] accumulates failures with breadcrumbs

pub mod assert;
pub mod result;
pub mod substitution;

pub use assert::{evaluate, evaluate_all, expand, parse_asserts, Assert, ExistenceCheck};
pub use result::{AssertFailure, FailureKind, ValidationResult};
pub use substitution::{LookupPolicy, ResolveError, Resolver, Token};
