//! Item registry: reference data (items, categories, suppliers).
//!
//! [`RegistryStore`] is the storage seam; [`ItemRegistry`] is the validated,
//! authorized service the rest of the workspace talks to.

pub mod service;
pub mod store;

pub use service::{ItemListing, ItemRegistry};
pub use store::{InMemoryRegistryStore, RegistryStore};
