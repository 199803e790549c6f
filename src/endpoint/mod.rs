//! Declarative endpoint surface.
//!
//! Consumers describe their remote data as [`QueryDef`]s and [`MutationDef`]s
//! and register them against a cache, which hands back subscription and
//! trigger handles.

pub mod definition;
pub mod registry;

pub use definition::{MutationDef, QueryDef};
pub use registry::RegistryError;

pub(crate) use registry::Registry;
