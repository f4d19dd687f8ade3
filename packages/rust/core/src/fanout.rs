//! Locale fan-out: one compiled unit template becomes N locale-specific
//! output files.
//!
//! The default locale keeps the unit's original destination name; every
//! other locale inserts `.{locale}` before the extension. Translation
//! markers are resolved per locale with the catalog's silent raw-key
//! fallback.

use std::path::{Path, PathBuf};

use tracing::debug;

use assetforge_shared::{AssetForgeError, Catalog, Locale, Result, localized_dest};

/// Render and write one output file per locale. Returns the written paths.
pub fn fan_out(
    template: &str,
    dest: &Path,
    default_locale: &Locale,
    locales: &[Locale],
    catalog: &Catalog,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(locales.len());

    for locale in locales {
        let text = catalog.apply(template, locale);
        let path = if locale == default_locale {
            dest.to_path_buf()
        } else {
            localized_dest(dest, locale)
        };
        write_text(&path, &text)?;
        written.push(path);
    }

    debug!(dest = %dest.display(), count = written.len(), "fanned out unit");
    Ok(written)
}

/// Write text to a path, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AssetForgeError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| AssetForgeError::io(path, e))
}

/// Serialize a value as pretty JSON and write it.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AssetForgeError::config(format!("serialize {}: {e}", path.display())))?;
    write_text(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales(tags: &[&str]) -> Vec<Locale> {
        tags.iter().map(|t| Locale::new(*t)).collect()
    }

    #[test]
    fn one_file_per_locale_with_default_unsuffixed() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("app.js");
        let en = Locale::new("en");

        let written = fan_out(
            "console.log(1);",
            &dest,
            &en,
            &locales(&["en", "fr", "pt-BR"]),
            &Catalog::default(),
        )
        .unwrap();

        assert_eq!(written.len(), 3);
        assert!(tmp.path().join("app.js").is_file());
        assert!(tmp.path().join("app.fr.js").is_file());
        assert!(tmp.path().join("app.pt-BR.js").is_file());
    }

    #[test]
    fn markers_are_localized_per_variant() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("nav.js");
        let en = Locale::new("en");

        let mut catalog = Catalog::default();
        catalog.insert(Locale::new("en"), "home", "Home");
        catalog.insert(Locale::new("fr"), "home", "Accueil");

        fan_out(
            "label(\"<<home>>\");",
            &dest,
            &en,
            &locales(&["en", "fr"]),
            &catalog,
        )
        .unwrap();

        let en_out = std::fs::read_to_string(tmp.path().join("nav.js")).unwrap();
        let fr_out = std::fs::read_to_string(tmp.path().join("nav.fr.js")).unwrap();
        assert!(en_out.contains("label(\"Home\")"));
        assert!(fr_out.contains("label(\"Accueil\")"));
    }

    #[test]
    fn missing_translation_falls_back_to_raw_key() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("app.js");
        let en = Locale::new("en");

        fan_out("<<cta.signup>>", &dest, &en, &locales(&["en"]), &Catalog::default())
            .unwrap();

        let out = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(out, "cta.signup");
    }

    #[test]
    fn nested_destination_directories_are_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("content/css-basics/index.js");
        let en = Locale::new("en");

        fan_out("x();", &dest, &en, &locales(&["en"]), &Catalog::default()).unwrap();
        assert!(dest.is_file());
    }
}
