//! Header resolution (`openHeader`/`getFileName`/`load` in the reference).
//!
//! Resolution is tried in a fixed order and the first hit wins: an absolute
//! path is used verbatim; a `.ctl` source file falls back to
//! `<project_root>/scripts/libs/<header>.ctl`; a quoted header is tried next
//! to the including file; finally every configured include path is tried, in
//! CTRL mode appending `scripts/libs/<header>.ctl` instead of the bare name.

use crate::dui::{Dui, PathCache};
use crate::path::{is_absolute_path, simplify_path};
use std::path::Path;

/// Depth past which further `#include` expansion is refused
/// (`INCLUDE_NESTED_TOO_DEEPLY`), matching the reference's hardcoded limit.
pub const MAX_INCLUDE_DEPTH: usize = 400;

pub fn is_ctrl_file(path: &str) -> bool {
    path.rsplit_once('.').is_some_and(|(_, ext)| ext == "ctl")
}

/// Try to open `candidate` (after path simplification), consulting and
/// updating `cache`'s negative-lookup set. Returns the simplified path on
/// success.
fn try_open(cache: &PathCache, candidate: &str) -> Option<String> {
    let simple = simplify_path(candidate);
    if cache.is_known_missing(&simple) {
        return None;
    }
    if Path::new(&simple).is_file() {
        Some(simple)
    } else {
        cache.mark_missing(&simple);
        None
    }
}

/// Resolve `header` (as it appeared inside `<>`/`""`) included from
/// `sourcefile`, returning the normalised path of the file actually found,
/// or `None` if no candidate exists. Grounded directly on `openHeader`.
pub fn resolve_header(
    dui: &Dui,
    cache: &PathCache,
    sourcefile: &str,
    header: &str,
    systemheader: bool,
) -> Option<String> {
    if is_absolute_path(header) {
        return try_open(cache, header);
    }

    if is_ctrl_file(sourcefile) {
        // A `.ctl` source outside any `/scripts/` tree has no project root to
        // anchor `scripts/libs/` against, so resolution dead-ends here rather
        // than falling through to the configured include paths — this
        // matches `openHeader`'s unconditional `return "";` in that case,
        // not an oversight.
        let pos = sourcefile.find("/scripts/")?;
        let candidate = format!("{}/scripts/libs/{header}.ctl", &sourcefile[..pos]);
        if let Some(found) = try_open(cache, &candidate) {
            return Some(found);
        }
    } else if !systemheader {
        if let Some(slash) = sourcefile.rfind(['/', '\\']) {
            let candidate = format!("{}{}", &sourcefile[..slash + 1], header);
            if let Some(found) = try_open(cache, &candidate) {
                return Some(found);
            }
        } else if let Some(found) = try_open(cache, header) {
            return Some(found);
        }
    }

    for dir in &dui.include_paths {
        let mut base = dir.clone();
        if !base.is_empty() && !base.ends_with('/') && !base.ends_with('\\') {
            base.push('/');
        }
        let candidate = if is_ctrl_file(sourcefile) {
            format!("{base}scripts/libs/{header}.ctl")
        } else {
            format!("{base}{header}")
        };
        if let Some(found) = try_open(cache, &candidate) {
            return Some(found);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn classifies_ctl_extension() {
        assert!(is_ctrl_file("/scripts/libs/foo.ctl"));
        assert!(!is_ctrl_file("/src/foo.c"));
        assert!(!is_ctrl_file("noext"));
    }

    #[test]
    fn resolves_header_next_to_including_file() {
        let dir = tempdir().unwrap();
        let header_path = dir.path().join("h.c");
        std::fs::write(&header_path, "Q").unwrap();
        let sourcefile = dir.path().join("main.c");
        let dui = Dui::default();
        let cache = PathCache::new();
        let resolved = resolve_header(&dui, &cache, sourcefile.to_str().unwrap(), "h.c", false);
        assert!(resolved.is_some());
    }

    #[test]
    fn ctl_source_outside_a_scripts_tree_cannot_resolve_anything() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("h.ctl"), "Q").unwrap();
        let sourcefile = dir.path().join("main.ctl");
        let mut dui = Dui::default();
        dui.include_paths.push(dir.path().to_str().unwrap().to_string());
        let cache = PathCache::new();
        let resolved = resolve_header(&dui, &cache, sourcefile.to_str().unwrap(), "h.ctl", false);
        assert!(resolved.is_none());
    }

    #[test]
    fn ctl_source_under_a_scripts_tree_resolves_via_project_root() {
        let dir = tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        std::fs::create_dir_all(scripts.join("libs")).unwrap();
        std::fs::write(scripts.join("libs").join("h.ctl"), "Q").unwrap();
        let sourcefile = scripts.join("main.ctl");
        let dui = Dui::default();
        let cache = PathCache::new();
        let resolved = resolve_header(&dui, &cache, sourcefile.to_str().unwrap(), "h", false);
        assert!(resolved.is_some());
    }

    #[test]
    fn missing_header_resolves_to_none_and_is_cached() {
        let dir = tempdir().unwrap();
        let sourcefile = dir.path().join("main.ctl");
        let dui = Dui::default();
        let cache = PathCache::new();
        assert!(resolve_header(&dui, &cache, sourcefile.to_str().unwrap(), "missing.ctl", false).is_none());
        let simple = simplify_path(&format!("{}/missing.ctl", dir.path().to_str().unwrap()));
        assert!(cache.is_known_missing(&simple));
    }

    #[test]
    fn resolves_via_configured_include_path() {
        let dir = tempdir().unwrap();
        let libdir = dir.path().join("libs");
        std::fs::create_dir(&libdir).unwrap();
        std::fs::write(libdir.join("h.ctl"), "Q").unwrap();
        let mut dui = Dui::default();
        dui.include_paths.push(libdir.to_str().unwrap().to_string());
        let cache = PathCache::new();
        let resolved = resolve_header(&dui, &cache, "bare.c", "h.ctl", false);
        assert!(resolved.is_some());
    }
}
