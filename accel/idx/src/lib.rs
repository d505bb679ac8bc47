//! Typed indices and dense arenas keyed by them.
//!
//! Every entity in the construction model (components, cells, groups, ports
//! of a flattened design) lives in an [`IndexedMap`] and is referred to by a
//! small copyable index type generated with [`impl_index!`].
mod index_trait;
mod macros;
pub mod maps;

pub use index_trait::IndexRef;
pub use maps::IndexedMap;
