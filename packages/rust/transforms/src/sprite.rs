//! Icon sprite assembly: a collection of standalone SVG files becomes one
//! sprite document of `<symbol>` elements, addressable as `icons.svg#<name>`.
//!
//! Input order is preserved from the resolver (sorted scans), so the sprite
//! bytes — and therefore the content hash derived from them — are stable
//! across runs with identical icon content.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use assetforge_shared::{AssetForgeError, Result};

static SVG_ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg>").unwrap());
static VIEWBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"viewBox\s*=\s*"([^"]*)""#).unwrap());

/// Result of assembling the icon sprite.
#[derive(Debug, Clone)]
pub struct SpriteOutput {
    /// The complete sprite document.
    pub svg: String,
    /// Number of `<symbol>` elements.
    pub symbol_count: usize,
    /// The icon files that were read.
    pub dependencies: Vec<PathBuf>,
}

/// Assemble icon files into one sprite document.
///
/// Each icon contributes a `<symbol id="<file stem>">` carrying the source
/// `viewBox`. An icon that is not a well-formed single-root SVG fails the
/// whole sprite unit; the sprite is a single unit of failure.
pub fn assemble_sprite(icons: &[PathBuf]) -> Result<SpriteOutput> {
    let mut symbols = String::new();
    let mut dependencies = Vec::new();

    for path in icons {
        let content =
            std::fs::read_to_string(path).map_err(|e| AssetForgeError::io(path, e))?;
        dependencies.push(path.clone());
        symbols.push_str(&icon_to_symbol(path, &content)?);
    }

    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" aria-hidden=\"true\" style=\"display:none\">\n{symbols}</svg>\n"
    );

    debug!(symbol_count = icons.len(), bytes = svg.len(), "sprite assembled");
    Ok(SpriteOutput {
        svg,
        symbol_count: icons.len(),
        dependencies,
    })
}

/// Rewrap one icon's root element as a `<symbol>`.
fn icon_to_symbol(path: &Path, content: &str) -> Result<String> {
    let caps = SVG_ROOT_RE.captures(content).ok_or_else(|| {
        AssetForgeError::transform(path, "no <svg> root element")
    })?;

    let attrs = &caps[1];
    let inner = caps[2].trim();
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let viewbox = VIEWBOX_RE
        .captures(attrs)
        .map(|vb| format!(" viewBox=\"{}\"", &vb[1]))
        .unwrap_or_default();

    Ok(format!("  <symbol id=\"{id}\"{viewbox}>{inner}</symbol>\n"))
}
