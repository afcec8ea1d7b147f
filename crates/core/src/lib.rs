//! vouch-core: data model shared by the vouch contract-test runner.
//!
//! - [`Value`] -- the JSON-like value tree every component trades in
//! - [`Path`] -- dotted/bracketed paths and their single joining rule
//! - [`FactStore`] -- flattened path → value maps used for lookups
//! - [`StoreDirective`] / [`apply_directive`] -- running entity updates
//! - [`HttpRequest`] / [`HttpResponse`] -- the exchange model
//! - [`Pattern`] / [`PatternRegistry`] -- structural shape descriptors

pub mod entity;
pub mod error;
pub mod facts;
pub mod http;
pub mod path;
pub mod pattern;
pub mod value;

pub use entity::{apply_directive, StoreDirective, STORE_DIRECTIVE_KEY};
pub use error::StoreError;
pub use facts::{FactStore, CONFIG, ENTITY, ENTITY_ID, REQUEST, RESPONSE};
pub use http::{HttpRequest, HttpResponse};
pub use path::{Path, Segment};
pub use pattern::{KeyPattern, Pattern, PatternMismatch, PatternRegistry, PatternTable};
pub use value::{Map, Scalar, Value};
