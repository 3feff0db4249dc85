//! Configuration surface and process-wide path caches (`simplecpp::DUI` and
//! the Windows real-filename/non-existing-file caches in the reference).
//!
//! The reference keeps its two path caches as global statics guarded by a
//! `CRITICAL_SECTION`. Per the reworked design in the governing design notes,
//! this port makes that cache an explicit value (`PathCache`) constructed
//! once by the caller and threaded through every call that needs it, rather
//! than a hidden global — the two inner maps are each behind their own
//! `Mutex` so concurrent preprocessing of independent translation units can
//! still share one cache.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Mutex;

/// One configured substitution: a bare name that expands to a literal value
/// wherever it appears as a token (`simplecpp::UserDefinedValue`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDefine {
    pub value: String,
}

impl UserDefine {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

/// The configured include/define options for one preprocessing run.
#[derive(Clone, Debug, Default)]
pub struct Dui {
    /// Ordered list of directories searched for `<header>` and, in CTRL mode,
    /// for `scripts/libs/<header>.ctl` relative to each entry.
    pub include_paths: Vec<String>,
    /// Files force-included ahead of the root translation unit.
    pub includes: Vec<String>,
    /// Name-to-literal substitutions, seeded externally (`-D`-style) and
    /// mutated in place by `#define`/`#undef` during preprocessing.
    pub defines: FxHashMap<String, UserDefine>,
    /// Language variant tag; carried for parity with the reference's `std`
    /// field but not consulted by anything in this core (no `size_of_type`
    /// table is implemented).
    pub std: String,
}

/// The two process-wide lookup caches from the reference's Windows-only
/// `RealFileNameMap`/`NonExistingFilesCache`, made an explicit injected value
/// instead of a hidden global.
#[derive(Default)]
pub struct PathCache {
    /// Paths already confirmed not to exist on disk, so a repeated failed
    /// open can be skipped.
    non_existing: Mutex<FxHashSet<String>>,
    /// Per-segment real-case filename lookups; always empty on a
    /// non-Windows host (this port targets the reference's non-Windows
    /// branch, where `realFilename` is the identity), kept for API parity.
    real_names: Mutex<FxHashMap<String, String>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known_missing(&self, path: &str) -> bool {
        self.non_existing.lock().unwrap().contains(path)
    }

    pub fn mark_missing(&self, path: &str) {
        self.non_existing.lock().unwrap().insert(path.to_string());
    }

    pub fn real_name(&self, path: &str) -> String {
        self.real_names
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cache_roundtrips() {
        let cache = PathCache::new();
        assert!(!cache.is_known_missing("a/b.ctl"));
        cache.mark_missing("a/b.ctl");
        assert!(cache.is_known_missing("a/b.ctl"));
    }

    #[test]
    fn real_name_defaults_to_identity() {
        let cache = PathCache::new();
        assert_eq!(cache.real_name("Lib.ctl"), "Lib.ctl");
    }

    #[test]
    fn dui_defaults_to_empty() {
        let dui = Dui::default();
        assert!(dui.include_paths.is_empty());
        assert!(dui.defines.is_empty());
    }
}
