//! HTTP exchange model.
//!
//! Requests and responses carry their body as a [`Value`] tree so that the
//! substitution resolver and the assertion DSL can walk them directly.
//! Header names compare case-insensitively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::facts::{FactStore, REQUEST, RESPONSE};
use crate::path::Path;
use crate::value::Value;

/// A concrete request, either generated for a scenario or decoded from a
/// monitor envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "null_body")]
    pub body: Value,
}

/// A response as observed from the service under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    #[serde(alias = "statusCode")]
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "null_body")]
    pub body: Value,
}

fn null_body() -> Value {
    Value::Null
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        HttpRequest {
            method: method.into(),
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: Value::Null,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Path without any query string.
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }

    /// Flatten under `REQUEST`: `METHOD`, `PATH`, `QUERY.*`, `HEADERS.*`, `BODY`.
    pub fn to_facts(&self) -> FactStore {
        let root = Path::root().field(REQUEST);
        let mut facts = FactStore::new();
        facts.insert(root.field("METHOD").to_string(), Value::string(&self.method));
        facts.insert(root.field("PATH").to_string(), Value::string(self.path_only()));
        facts.insert_flattened(&string_map(&self.query), &root.field("QUERY"));
        facts.insert_flattened(&string_map(&self.headers), &root.field("HEADERS"));
        facts.insert_flattened(&self.body, &root.field("BODY"));
        facts
    }
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        HttpResponse {
            status,
            headers: BTreeMap::new(),
            body: Value::Null,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Flatten under `RESPONSE`: `STATUS`, `HEADERS.*`, `BODY`.
    pub fn to_facts(&self) -> FactStore {
        let root = Path::root().field(RESPONSE);
        let mut facts = FactStore::new();
        facts.insert(root.field("STATUS").to_string(), Value::from(self.status as i64));
        facts.insert_flattened(&string_map(&self.headers), &root.field("HEADERS"));
        facts.insert_flattened(&self.body, &root.field("BODY"));
        facts
    }
}

fn find_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::string(v)))
            .collect(),
    )
}
