//! Endpoint registry.
//!
//! One id maps to one definition. Re-registering the identical definition
//! (the same `Arc`) is a no-op; a different definition under an existing id
//! is a programmer error and fails fast.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::definition::{MutationDef, QueryDef};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("endpoint `{0}` is already registered with a different definition")]
    Conflict(String),
}

enum Registered {
    Query(Arc<QueryDef>),
    Mutation(Arc<MutationDef>),
}

#[derive(Default)]
pub(crate) struct Registry {
    endpoints: HashMap<String, Registered>,
}

impl Registry {
    pub fn insert_query(&mut self, def: &Arc<QueryDef>) -> Result<(), RegistryError> {
        match self.endpoints.get(def.id()) {
            Some(Registered::Query(existing)) if Arc::ptr_eq(existing, def) => Ok(()),
            Some(_) => Err(RegistryError::Conflict(def.id().to_string())),
            None => {
                self.endpoints
                    .insert(def.id().to_string(), Registered::Query(Arc::clone(def)));
                Ok(())
            }
        }
    }

    pub fn insert_mutation(&mut self, def: &Arc<MutationDef>) -> Result<(), RegistryError> {
        match self.endpoints.get(def.id()) {
            Some(Registered::Mutation(existing)) if Arc::ptr_eq(existing, def) => Ok(()),
            Some(_) => Err(RegistryError::Conflict(def.id().to_string())),
            None => {
                self.endpoints
                    .insert(def.id().to_string(), Registered::Mutation(Arc::clone(def)));
                Ok(())
            }
        }
    }
}
