//! Translation catalogs and `<<key>>` marker substitution.
//!
//! Compiled text carries translation keys between double-angle-bracket
//! markers. Each enabled locale has a `<locale>.toml` catalog of
//! `key = "text"` entries; a key with no entry for a locale falls back to
//! the raw key text, silently.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{AssetForgeError, Result};
use crate::types::Locale;

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<([A-Za-z0-9_.:\-]+)>>").unwrap());

/// Per-locale key → text tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<Locale, HashMap<String, String>>,
}

impl Catalog {
    /// Look up a key for a locale.
    pub fn lookup(&self, locale: &Locale, key: &str) -> Option<&str> {
        self.tables.get(locale)?.get(key).map(String::as_str)
    }

    /// Number of entries loaded for a locale.
    pub fn len(&self, locale: &Locale) -> usize {
        self.tables.get(locale).map_or(0, HashMap::len)
    }

    /// Insert a single entry (test fixtures and programmatic catalogs).
    pub fn insert(&mut self, locale: Locale, key: impl Into<String>, text: impl Into<String>) {
        self.tables
            .entry(locale)
            .or_default()
            .insert(key.into(), text.into());
    }

    /// Replace every `<<key>>` marker in `text` for the given locale.
    ///
    /// A key with no catalog entry is substituted with the key itself.
    pub fn apply(&self, text: &str, locale: &Locale) -> String {
        MARKER_RE
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                self.lookup(locale, key).unwrap_or(key).to_string()
            })
            .into_owned()
    }
}

/// Load catalogs for every enabled locale from `dir`.
///
/// A missing catalog file is an empty table for that locale, not an error —
/// the raw-key fallback covers every lookup.
pub fn load_catalog(dir: &Path, locales: &[Locale]) -> Result<Catalog> {
    let mut catalog = Catalog::default();

    for locale in locales {
        let path = dir.join(format!("{locale}.toml"));
        if !path.exists() {
            warn!(%locale, path = %path.display(), "no translation catalog, using raw keys");
            catalog.tables.insert(locale.clone(), HashMap::new());
            continue;
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| AssetForgeError::io(&path, e))?;
        let value: toml::Value = toml::from_str(&content).map_err(|e| {
            AssetForgeError::config(format!("failed to parse {}: {e}", path.display()))
        })?;

        let mut table = HashMap::new();
        flatten_into(&mut table, "", &value);
        debug!(%locale, entries = table.len(), "loaded translation catalog");
        catalog.tables.insert(locale.clone(), table);
    }

    Ok(catalog)
}

/// Flatten nested TOML tables into dotted keys; only string leaves count.
fn flatten_into(out: &mut HashMap<String, String>, prefix: &str, value: &toml::Value) {
    match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_into(out, &key, v);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        _ => {}
    }
}
