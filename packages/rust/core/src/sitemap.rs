//! Sitemap aggregation: collects URLs discovered during the course stage
//! and renders the final URL-set document once, after every other stage
//! has settled.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};
use url::Url;

use assetforge_shared::{AssetForgeError, Result};

use crate::fanout::write_text;

/// Fixed per-URL metadata — the sitemap carries one value for every entry.
const CHANGE_FREQ: &str = "weekly";
const PRIORITY: &str = "0.7";

/// Accumulates site paths and renders `/sitemap.xml`.
///
/// The URL set only grows; rendering is always a full rebuild from the
/// current set, never an incremental update.
#[derive(Debug)]
pub struct SitemapAggregator {
    base: Url,
    paths: BTreeSet<String>,
}

impl SitemapAggregator {
    /// Create an aggregator seeded with the root path.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| AssetForgeError::config(format!("invalid site base_url: {e}")))?;

        let mut paths = BTreeSet::new();
        paths.insert("/".to_string());
        Ok(Self { base, paths })
    }

    /// Record one site path (e.g. `/courses/css-basics`).
    pub fn add_path(&mut self, path: &str) {
        self.paths.insert(normalize(path));
    }

    /// Number of accumulated paths, root included.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Render the URL-set document from the current set plus extras.
    pub fn build(&self, extra_paths: &[String]) -> String {
        let mut all = self.paths.clone();
        for path in extra_paths {
            all.insert(normalize(path));
        }

        let lastmod = chrono::Utc::now().format("%Y-%m-%d");
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

        for path in &all {
            let loc = self
                .base
                .join(path)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| format!("{}{path}", self.base));
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&loc)));
            xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
            xml.push_str(&format!("    <changefreq>{CHANGE_FREQ}</changefreq>\n"));
            xml.push_str(&format!("    <priority>{PRIORITY}</priority>\n"));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Render and write `sitemap.xml` under the output root.
    #[instrument(skip_all, fields(entries = self.paths.len()))]
    pub fn write(&self, out_root: &Path, extra_paths: &[String]) -> Result<PathBuf> {
        let document = self.build(extra_paths);
        let path = out_root.join("sitemap.xml");
        write_text(&path, &document)?;
        info!(path = %path.display(), entries = self.len() + extra_paths.len(), "sitemap written");
        Ok(path)
    }
}

/// Site paths are absolute; a bare path gains a leading slash.
fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
