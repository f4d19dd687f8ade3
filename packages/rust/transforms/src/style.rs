//! Stylesheet transform: `@use`/`@import` inlining, optional direction
//! mirroring for RTL output, optional minification.
//!
//! The inliner resolves relative imports with the usual preprocessor
//! conventions (`name`, `name.scss`, `_name.scss`, `name/index.scss`) and
//! records every file it pulls in — that transitive set is the unit's true
//! watch dependency set, not just the entry point.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use assetforge_shared::{AssetForgeError, Result};

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*@(?:use|import)[ \t]+["']([^"']+)["'][^;\n]*;"#).unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LEFT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bleft\b").unwrap());
static RIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bright\b").unwrap());

/// Options for one style compilation.
#[derive(Debug, Clone, Default)]
pub struct StyleOptions {
    /// Produce the direction-mirrored (RTL) variant.
    pub mirror: bool,
    /// Strip comments and collapse whitespace.
    pub minify: bool,
}

/// Result of compiling one stylesheet entry point.
#[derive(Debug, Clone)]
pub struct StyleOutput {
    /// The compiled CSS text.
    pub css: String,
    /// Every file read during compilation, entry point included.
    pub dependencies: Vec<PathBuf>,
}

/// Compile a stylesheet entry point to CSS text.
pub fn compile_style(entry: &Path, opts: &StyleOptions) -> Result<StyleOutput> {
    let mut visited = HashSet::new();
    let mut dependencies = Vec::new();
    let mut css = inline_file(entry, &mut visited, &mut dependencies)?;

    if opts.mirror {
        css = mirror_directions(&css);
    }
    if opts.minify {
        css = minify_css(&css);
    }

    Ok(StyleOutput { css, dependencies })
}

/// Read one file and splice in every import it references, depth-first.
/// A file already inlined resolves to nothing (cycle guard).
fn inline_file(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
    dependencies: &mut Vec<PathBuf>,
) -> Result<String> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical.clone()) {
        trace!(path = %path.display(), "already inlined, skipping");
        return Ok(String::new());
    }
    dependencies.push(canonical);

    let content =
        std::fs::read_to_string(path).map_err(|e| AssetForgeError::io(path, e))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for caps in IMPORT_RE.captures_iter(&content) {
        let whole = caps.get(0).unwrap();
        let target = &caps[1];

        out.push_str(&content[last..whole.start()]);
        last = whole.end();

        let resolved = resolve_import(dir, target).ok_or_else(|| {
            AssetForgeError::transform(path, format!("cannot resolve import \"{target}\""))
        })?;
        out.push_str(&inline_file(&resolved, visited, dependencies)?);
    }

    out.push_str(&content[last..]);
    Ok(out)
}

/// Preprocessor-style import resolution, relative to the importing file.
fn resolve_import(dir: &Path, target: &str) -> Option<PathBuf> {
    let (sub, name) = match target.rsplit_once('/') {
        Some((sub, name)) => (Some(sub), name),
        None => (None, target),
    };
    let base = match sub {
        Some(sub) => dir.join(sub),
        None => dir.to_path_buf(),
    };

    let candidates = [
        base.join(name),
        base.join(format!("{name}.scss")),
        base.join(format!("_{name}.scss")),
        base.join(name).join("index.scss"),
        base.join(name).join("_index.scss"),
    ];
    candidates.into_iter().find(|c| c.is_file())
}

/// Swap `left` and `right` words wherever they appear as whole tokens —
/// property names, values, and positional offsets all flip together.
fn mirror_directions(css: &str) -> String {
    const PLACEHOLDER: &str = "\u{1}assetforge-left\u{1}";
    let tmp = LEFT_RE.replace_all(css, PLACEHOLDER);
    let tmp = RIGHT_RE.replace_all(&tmp, "left");
    tmp.replace(PLACEHOLDER, "right")
}

/// Conservative single-pass minifier: drop comments, collapse whitespace,
/// tighten around punctuation.
fn minify_css(css: &str) -> String {
    let no_comments = COMMENT_RE.replace_all(css, "");
    let mut out = String::with_capacity(no_comments.len());
    let mut pending_space = false;
    let mut last: Option<char> = None;

    for ch in no_comments.chars() {
        if ch.is_whitespace() {
            pending_space = last.is_some();
            continue;
        }
        if pending_space {
            let tight = |c: char| matches!(c, '{' | '}' | ';' | ':' | ',' | '>');
            if !tight(ch) && !last.is_some_and(tight) {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(ch);
        last = Some(ch);
    }

    out
}
