//! ctrlcpp-util — core utilities shared by the scanner, preprocessor, and
//! driver crates.
//!
//! This crate carries the parts of a preprocessor that have nothing to do
//! with tokens or directives specifically: typed-index arenas, source
//! locations and the file registry, and the diagnostics sink.

pub mod diagnostics;
pub mod error;
pub mod index_vec;
pub mod location;

pub use index_vec::{Idx, IndexVec};
pub use location::{FileId, FileRegistry, Location};

// Re-export commonly used hash collections built on a non-cryptographic
// hasher; every hot map/set in this workspace (the defines table, the
// `#pragma once` set, the negative include-lookup cache) uses these rather
// than the libstd `HashMap`/`HashSet`.
pub use rustc_hash::{FxHashMap, FxHashSet};
