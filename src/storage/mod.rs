//! Persistence port for version records.
//!
//! The [`VersionStore`] trait is the minimal durable-row contract the core
//! requires; [`InMemoryVersionStore`] is the reference implementation used
//! for embedded deployments and tests.

mod memory;
mod traits;

pub use memory::InMemoryVersionStore;
pub use traits::{StorageError, VersionStore};
