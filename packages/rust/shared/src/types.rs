//! Core domain types for the asset pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

/// The kind of a compilable asset unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A script module entry point, bundled per locale.
    Script,
    /// A stylesheet entry point, compiled to a primary + RTL variant.
    Style,
    /// An individual icon feeding the sprite stage.
    Icon,
    /// Course markdown source, compiled to structured course data.
    Markdown,
    /// A polyfill source concatenated into the polyfill bundle.
    Polyfill,
}

impl AssetKind {
    /// File extension of the compiled output for this kind.
    pub fn output_ext(&self) -> &'static str {
        match self {
            AssetKind::Script | AssetKind::Polyfill => "js",
            AssetKind::Style => "css",
            AssetKind::Icon => "svg",
            AssetKind::Markdown => "json",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssetKind::Script => "script",
            AssetKind::Style => "style",
            AssetKind::Icon => "icon",
            AssetKind::Markdown => "markdown",
            AssetKind::Polyfill => "polyfill",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// AssetUnit
// ---------------------------------------------------------------------------

/// One logical compilable asset: a source path, a destination path, a kind.
///
/// Produced by the resolver, consumed read-only by every later stage.
/// Identity is `(source, kind)` — the destination is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUnit {
    /// Absolute or root-relative path of the source entry point.
    pub source: PathBuf,
    /// Destination path under the output root (before locale fan-out).
    pub dest: PathBuf,
    /// What the unit compiles to.
    pub kind: AssetKind,
}

impl AssetUnit {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>, kind: AssetKind) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            kind,
        }
    }

    /// Stable identity string used for logging and watch registration keys.
    pub fn unit_id(&self) -> String {
        format!("{}:{}", self.kind, self.source.display())
    }
}

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

/// An opaque locale tag (BCP-47-like, e.g. `en`, `pt-BR`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(pub String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

// ---------------------------------------------------------------------------
// BuildResult
// ---------------------------------------------------------------------------

/// Outcome of building one unit (or one course × locale pair).
///
/// Consumed only for reporting; nothing downstream branches on it except
/// the summary printout.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Identity of the unit this result belongs to.
    pub unit_id: String,
    /// Whether the unit compiled and wrote its outputs.
    pub success: bool,
    /// Error text when `success` is false.
    pub error: Option<String>,
    /// Wall-clock time spent on the unit.
    pub duration: Duration,
}

impl BuildResult {
    /// A successful result.
    pub fn ok(unit_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: true,
            error: None,
            duration,
        }
    }

    /// A captured failure.
    pub fn failed(
        unit_id: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: false,
            error: Some(error.into()),
            duration,
        }
    }
}

// ---------------------------------------------------------------------------
// CourseRef
// ---------------------------------------------------------------------------

/// A course discovered under the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRef {
    /// Course identifier — the content subdirectory name.
    pub id: String,
    /// Absolute path of the course directory.
    pub dir: PathBuf,
}

impl CourseRef {
    pub fn new(id: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            dir: dir.into(),
        }
    }

    /// The course markdown source file.
    pub fn source_file(&self) -> PathBuf {
        self.dir.join("index.md")
    }
}

/// Insert a locale suffix before a destination's file extension.
///
/// `main.js` + `fr` → `main.fr.js`. Used for every non-default locale.
pub fn localized_dest(dest: &Path, locale: &Locale) -> PathBuf {
    let stem = dest.file_stem().unwrap_or_default().to_string_lossy();
    let name = match dest.extension() {
        Some(ext) => format!("{stem}.{locale}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{locale}"),
    };
    dest.with_file_name(name)
}
