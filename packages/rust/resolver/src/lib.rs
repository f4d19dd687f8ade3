//! Overlay-aware asset resolution.
//!
//! Merges the two overlay source trees into one deduplicated, ordered set of
//! asset units. Overlay files win by canonical name: a two-pass set-difference
//! over canonical names, never a positional merge. Both root scans are pure
//! functions returning sorted lists; the exclusion set is computed before
//! concatenation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use assetforge_shared::{AssetForgeError, AssetKind, AssetUnit, CourseRef, Result};

/// Course subdirectory name prefixes that are not courses.
const RESERVED_COURSE_PREFIXES: &[&str] = &["shared", "_"];

// ---------------------------------------------------------------------------
// OverlayLayer
// ---------------------------------------------------------------------------

/// An ordered pair of overlay roots. Files under `overlay` shadow files
/// under `base` with the same canonical name.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub base: PathBuf,
    pub overlay: PathBuf,
}

impl OverlayLayer {
    pub fn new(base: impl Into<PathBuf>, overlay: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            overlay: overlay.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a glob pattern over both overlay roots into asset units.
///
/// The pattern is expanded in both its flat form (`name.ext`) and its
/// directory-as-module form (`name/index.ext`); both normalize to the same
/// canonical name, so a directory module in one root shadows a flat file in
/// the other. A missing or unreadable root contributes zero matches.
///
/// Result ordering is base-root matches (not overridden) followed by overlay
/// matches. Override semantics come from the exclusion filter alone —
/// consumers must not rely on position.
pub fn resolve_units(
    pattern: &str,
    layer: &OverlayLayer,
    kind: AssetKind,
    out_root: &Path,
) -> Result<Vec<AssetUnit>> {
    let overlay_matches = scan_root(&layer.overlay, pattern)?;
    let base_matches = scan_root(&layer.base, pattern)?;

    let overridden: HashSet<String> = overlay_matches
        .iter()
        .map(|path| canonical_name(path))
        .collect();

    let mut units: Vec<AssetUnit> = Vec::new();

    for source in base_matches {
        let name = canonical_name(&source);
        if overridden.contains(&name) {
            trace!(source = %source.display(), %name, "shadowed by overlay");
            continue;
        }
        units.push(make_unit(source, &name, kind, out_root));
    }

    for source in overlay_matches {
        let name = canonical_name(&source);
        units.push(make_unit(source, &name, kind, out_root));
    }

    debug!(pattern, count = units.len(), "resolved {kind} units");
    Ok(units)
}

/// Resolve one exact relative path against the layer; the overlay wins by
/// presence. Returns `None` when neither root has the file.
pub fn resolve_exact(relative: &str, layer: &OverlayLayer) -> Option<PathBuf> {
    let overlay = layer.overlay.join(relative);
    if overlay.is_file() {
        return Some(overlay);
    }
    let base = layer.base.join(relative);
    base.is_file().then_some(base)
}

/// Enumerate courses under the content root.
///
/// Every subdirectory is a course except reserved names (prefixed `shared`
/// or `_`). A missing content root is zero courses. Sorted by id.
pub fn enumerate_courses(content_root: &Path) -> Vec<CourseRef> {
    let Ok(entries) = std::fs::read_dir(content_root) else {
        debug!(root = %content_root.display(), "content root unreadable, no courses");
        return Vec::new();
    };

    let mut courses: Vec<CourseRef> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let id = entry.file_name().to_string_lossy().into_owned();
            let reserved = RESERVED_COURSE_PREFIXES
                .iter()
                .any(|prefix| id.starts_with(prefix));
            (!reserved).then(|| CourseRef::new(id, entry.path()))
        })
        .collect();

    courses.sort_by(|a, b| a.id.cmp(&b.id));
    courses
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Expand the pattern under one root, in flat and directory-as-module forms.
/// Pure: returns a sorted list, touches nothing.
fn scan_root(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut matches: Vec<PathBuf> = Vec::new();

    for form in pattern_forms(pattern) {
        let full = root.join(&form);
        let glob_pattern = full.to_string_lossy().into_owned();
        let paths = glob::glob(&glob_pattern)
            .map_err(|e| AssetForgeError::pattern(format!("{glob_pattern}: {e}")))?;

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => matches.push(path),
                Ok(_) => {}
                // An unreadable match is treated as absent, not as a failure.
                Err(e) => trace!(error = %e, "skipping unreadable glob match"),
            }
        }
    }

    matches.sort();
    matches.dedup();
    Ok(matches)
}

/// The flat form plus the derived `name/index.ext` module form.
fn pattern_forms(pattern: &str) -> Vec<String> {
    let mut forms = vec![pattern.to_string()];

    let (dir, file) = match pattern.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, pattern),
    };

    if let Some((stem, ext)) = file.rsplit_once('.') {
        let module_file = format!("{stem}/index.{ext}");
        forms.push(match dir {
            Some(dir) => format!("{dir}/{module_file}"),
            None => module_file,
        });
    }

    forms
}

/// The override-matching key for a path: the file stem, except an
/// index-style file takes its parent directory's name.
pub fn canonical_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if stem == "index" {
        if let Some(parent) = path.parent().and_then(Path::file_name) {
            return parent.to_string_lossy().into_owned();
        }
    }

    stem
}

fn make_unit(source: PathBuf, name: &str, kind: AssetKind, out_root: &Path) -> AssetUnit {
    let dest = out_root.join(format!("{name}.{}", kind.output_ext()));
    AssetUnit::new(source, dest, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "// stub\n").unwrap();
    }

    #[test]
    fn overlay_wins_by_canonical_name() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let overlay = tmp.path().join("overlay");
        touch(&base.join("app.ts"));
        touch(&overlay.join("app.ts"));

        let layer = OverlayLayer::new(&base, &overlay);
        let units =
            resolve_units("*.ts", &layer, AssetKind::Script, Path::new("out")).unwrap();

        assert_eq!(units.len(), 1);
        assert!(units[0].source.starts_with(&overlay));
        assert_eq!(units[0].dest, Path::new("out/app.js"));
    }

    #[test]
    fn index_module_normalizes_to_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let overlay = tmp.path().join("overlay");
        touch(&base.join("editor.ts"));
        touch(&overlay.join("editor/index.ts"));

        let layer = OverlayLayer::new(&base, &overlay);
        let units =
            resolve_units("*.ts", &layer, AssetKind::Script, Path::new("out")).unwrap();

        // Same canonical name, so the overlay module shadows the flat file.
        assert_eq!(units.len(), 1);
        assert!(units[0].source.ends_with("editor/index.ts"));
        assert_eq!(units[0].dest, Path::new("out/editor.js"));
    }

    #[test]
    fn base_only_and_overlay_only_both_survive() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let overlay = tmp.path().join("overlay");
        touch(&base.join("main.scss"));
        touch(&overlay.join("theme.scss"));

        let layer = OverlayLayer::new(&base, &overlay);
        let units =
            resolve_units("*.scss", &layer, AssetKind::Style, Path::new("out")).unwrap();

        assert_eq!(units.len(), 2);
        // Base matches come first, then overlay matches.
        assert!(units[0].source.ends_with("main.scss"));
        assert!(units[1].source.ends_with("theme.scss"));
    }

    #[test]
    fn missing_root_is_zero_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let overlay = tmp.path().join("overlay");
        touch(&overlay.join("app.ts"));

        let layer = OverlayLayer::new(tmp.path().join("does-not-exist"), &overlay);
        let units =
            resolve_units("*.ts", &layer, AssetKind::Script, Path::new("out")).unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn nested_pattern_matches_icons() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        touch(&base.join("assets/icons/check.svg"));
        touch(&base.join("assets/icons/cross.svg"));

        let layer = OverlayLayer::new(&base, tmp.path().join("overlay"));
        let units = resolve_units(
            "assets/icons/*.svg",
            &layer,
            AssetKind::Icon,
            Path::new("out"),
        )
        .unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].dest, Path::new("out/check.svg"));
    }

    #[test]
    fn canonical_name_of_index_file() {
        assert_eq!(canonical_name(Path::new("src/editor/index.ts")), "editor");
        assert_eq!(canonical_name(Path::new("src/editor.ts")), "editor");
        assert_eq!(canonical_name(Path::new("_partial.scss")), "_partial");
    }

    #[test]
    fn resolve_exact_prefers_overlay() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let overlay = tmp.path().join("overlay");
        touch(&base.join("vendor/fetch.js"));
        touch(&overlay.join("vendor/fetch.js"));

        let layer = OverlayLayer::new(&base, &overlay);
        let resolved = resolve_exact("vendor/fetch.js", &layer).unwrap();
        assert!(resolved.starts_with(&overlay));

        assert!(resolve_exact("vendor/nope.js", &layer).is_none());
    }

    #[test]
    fn course_enumeration_skips_reserved_names() {
        let tmp = tempfile::tempdir().unwrap();
        let content = tmp.path().join("content");
        for dir in ["css-basics", "js-advanced", "shared-media", "_drafts"] {
            std::fs::create_dir_all(content.join(dir)).unwrap();
        }

        let courses = enumerate_courses(&content);
        let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["css-basics", "js-advanced"]);

        assert!(enumerate_courses(&tmp.path().join("missing")).is_empty());
    }
}
