//! ctrlcpp-pp — the CTRL preprocessor core.
//!
//! Ties together constant folding, header resolution, the domain rewriter,
//! and the directive-dispatching driver into the one entry point most
//! callers need: [`preprocess`]. Each phase is also exported on its own for
//! callers (and tests) that want to drive a piece of the pipeline in
//! isolation, the way the reference exposes `simplecpp::preprocess` alongside
//! its constituent free functions rather than hiding them behind one opaque
//! facade.

pub mod driver;
pub mod dui;
pub mod fold;
pub mod include;
pub mod path;
pub mod pattern;
pub mod rewrite;
pub mod stringify;

pub use driver::preprocess;
pub use dui::{Dui, PathCache, UserDefine};
pub use fold::{fold, FoldError};
pub use include::resolve_header;
pub use stringify::stringify;
