//! Substitution of fact-store lookups into requests and responses.
//!
//! A string leaf is a substitution token when the whole leaf is `$(key)` or
//! `$rand(key)`:
//!
//! - `$(key)` is replaced by the value stored at `key`, with the entity
//!   store taking precedence over the config store.
//! - `$rand(key)` requires `key` to hold an array and is replaced by a random
//!   element whose string form differs from the current entity's value
//!   (`ENTITY.<last segment of key>`, falling back to `ENTITY_ID`).
//!
//! Every other leaf passes through untouched and the result always has the
//! same shape as the input.

use rand::seq::SliceRandom;
use tracing::debug;
use vouch_core::{
    FactStore, HttpRequest, HttpResponse, Map, Path, Segment, Value, ENTITY, ENTITY_ID,
};

/// What to do when a `$(key)` lookup finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPolicy {
    /// Fail the whole resolve with [`ResolveError::UnresolvedKey`].
    Fail,
    /// Leave the token text in place (filter and template rows).
    KeepToken,
}

/// Errors raised while resolving substitution tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("could not resolve \"{key}\" in the fact store")]
    UnresolvedKey { key: String },

    #[error("no value in \"{key}\" differs from the current entity value \"{excluded}\"")]
    NoQualifyingRandomValue { key: String, excluded: String },

    #[error("$rand({key}) needs an array, but \"{key}\" is {actual}")]
    NotAnArray { key: String, actual: String },
}

/// A recognised substitution token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Lookup(&'a str),
    Random(&'a str),
}

impl<'a> Token<'a> {
    pub fn parse(text: &'a str) -> Option<Token<'a>> {
        let text = text.trim();
        if let Some(key) = call_argument(text, "$rand") {
            return Some(Token::Random(key));
        }
        call_argument(text, "$").map(Token::Lookup)
    }
}

fn call_argument<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let key = text
        .strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')?
        .trim();
    (!key.is_empty()).then_some(key)
}

/// Resolves tokens against the config and entity stores.
pub struct Resolver<'a> {
    config: &'a FactStore,
    entity: &'a FactStore,
    policy: LookupPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a FactStore, entity: &'a FactStore, policy: LookupPolicy) -> Self {
        Resolver {
            config,
            entity,
            policy,
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a Value> {
        self.entity.get(key).or_else(|| self.config.get(key))
    }

    /// Resolve every string leaf of a value tree.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, ResolveError> {
        match value {
            Value::Object(fields) => {
                let mut resolved = Map::new();
                for (key, child) in fields {
                    resolved.insert(key.clone(), self.resolve_value(child)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Scalar(_) => match value.as_str() {
                Some(text) => Ok(self
                    .resolve_leaf(text)?
                    .unwrap_or_else(|| value.clone())),
                None => Ok(value.clone()),
            },
            Value::Null => Ok(Value::Null),
        }
    }

    /// Resolve a string-only slot (path segment, header, query parameter).
    pub fn resolve_text(&self, text: &str) -> Result<String, ResolveError> {
        Ok(match self.resolve_leaf(text)? {
            Some(value) => value.string_form(),
            None => text.to_string(),
        })
    }

    /// Resolve each `/`-separated path segment independently, keeping the
    /// segment count and any query string.
    pub fn resolve_path(&self, path: &str) -> Result<String, ResolveError> {
        let (route, query) = match path.split_once('?') {
            Some((route, query)) => (route, Some(query)),
            None => (path, None),
        };
        let segments = route
            .split('/')
            .map(|segment| self.resolve_text(segment))
            .collect::<Result<Vec<_>, _>>()?;
        let mut resolved = segments.join("/");
        if let Some(query) = query {
            resolved.push('?');
            resolved.push_str(query);
        }
        Ok(resolved)
    }

    pub fn resolve_request(&self, request: &HttpRequest) -> Result<HttpRequest, ResolveError> {
        Ok(HttpRequest {
            method: request.method.clone(),
            path: self.resolve_path(&request.path)?,
            query: self.resolve_strings(&request.query)?,
            headers: self.resolve_strings(&request.headers)?,
            body: self.resolve_value(&request.body)?,
        })
    }

    pub fn resolve_response(&self, response: &HttpResponse) -> Result<HttpResponse, ResolveError> {
        Ok(HttpResponse {
            status: response.status,
            headers: self.resolve_strings(&response.headers)?,
            body: self.resolve_value(&response.body)?,
        })
    }

    fn resolve_strings(
        &self,
        map: &std::collections::BTreeMap<String, String>,
    ) -> Result<std::collections::BTreeMap<String, String>, ResolveError> {
        map.iter()
            .map(|(k, v)| Ok((k.clone(), self.resolve_text(v)?)))
            .collect()
    }

    /// `Ok(None)` when `text` is not a token, or when the lookup failed under
    /// [`LookupPolicy::KeepToken`].
    fn resolve_leaf(&self, text: &str) -> Result<Option<Value>, ResolveError> {
        match Token::parse(text) {
            None => Ok(None),
            Some(Token::Lookup(key)) => match self.lookup(key) {
                Some(value) => {
                    debug!(key, "resolved lookup token");
                    Ok(Some(value.clone()))
                }
                None => self.missing(key),
            },
            Some(Token::Random(key)) => match self.lookup(key) {
                Some(value) => self.pick_random(key, value).map(Some),
                None => self.missing(key),
            },
        }
    }

    fn missing(&self, key: &str) -> Result<Option<Value>, ResolveError> {
        match self.policy {
            LookupPolicy::Fail => Err(ResolveError::UnresolvedKey {
                key: key.to_string(),
            }),
            LookupPolicy::KeepToken => Ok(None),
        }
    }

    fn pick_random(&self, key: &str, value: &Value) -> Result<Value, ResolveError> {
        let items = value.as_array().ok_or_else(|| ResolveError::NotAnArray {
            key: key.to_string(),
            actual: value.type_name().to_string(),
        })?;

        let excluded = self.excluded_value(key);
        let candidates: Vec<&Value> = items
            .iter()
            .filter(|item| Some(item.string_form()) != excluded)
            .collect();

        let picked = candidates
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| ResolveError::NoQualifyingRandomValue {
                key: key.to_string(),
                excluded: excluded.clone().unwrap_or_default(),
            })?;
        debug!(key, picked = %picked, "resolved random token");
        Ok((*picked).clone())
    }

    /// The value the current entity already holds for the field `key` names.
    fn excluded_value(&self, key: &str) -> Option<String> {
        let field = match Path::parse(key).last() {
            Some(Segment::Field(name)) => Some(Path::root().field(ENTITY).field(name.clone())),
            _ => None,
        };
        field
            .and_then(|path| self.entity.get_path(&path))
            .or_else(|| self.entity.get(ENTITY_ID))
            .map(Value::string_form)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
