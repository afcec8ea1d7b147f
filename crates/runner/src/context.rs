//! Per-run fact stores.
//!
//! A [`TestRunContext`] owns the config store (read-only after
//! construction) and the entity store. The entity store is shared by every
//! scenario of a run, so it sits behind a lock: reads take a snapshot,
//! writes replace the entity facts wholesale.

use std::sync::{PoisonError, RwLock};

use tracing::debug;
use vouch_core::{apply_directive, FactStore, StoreDirective, StoreError, Value};

use crate::config::ConfigStore;

#[derive(Debug, Default)]
pub struct TestRunContext {
    config: FactStore,
    entity: RwLock<FactStore>,
}

impl TestRunContext {
    pub fn new(config: ConfigStore) -> Self {
        TestRunContext {
            config: config.into_facts(),
            entity: RwLock::new(FactStore::new()),
        }
    }

    /// Start from an existing entity store (e.g. seeded by an earlier run).
    pub fn with_entity(config: ConfigStore, entity: FactStore) -> Self {
        TestRunContext {
            config: config.into_facts(),
            entity: RwLock::new(entity),
        }
    }

    pub fn config_facts(&self) -> &FactStore {
        &self.config
    }

    /// A snapshot of the current entity facts.
    pub fn entity_facts(&self) -> FactStore {
        self.entity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fold `body` into the entity store under `directive`.
    pub fn store_entity(&self, directive: StoreDirective, body: &Value) -> Result<(), StoreError> {
        let mut entity = self.entity.write().unwrap_or_else(PoisonError::into_inner);
        let updated = apply_directive(&entity, directive, body)?;
        debug!(?directive, keys = updated.len(), "entity store updated");
        *entity = updated;
        Ok(())
    }
}
