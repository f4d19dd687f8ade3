//! Application configuration for assetforge.
//!
//! Project config lives at `assetforge.toml` in the project root.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssetForgeError, Result};
use crate::types::Locale;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "assetforge.toml";

// ---------------------------------------------------------------------------
// Config structs (matching assetforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source and output tree locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Site metadata for sitemap generation.
    #[serde(default)]
    pub site: SiteConfig,

    /// Locale fan-out settings.
    #[serde(default)]
    pub locales: LocalesConfig,

    /// Build stage settings.
    #[serde(default)]
    pub build: BuildConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base overlay root (platform defaults).
    #[serde(default = "default_base_root")]
    pub base_root: PathBuf,

    /// Overlay root whose files win by canonical name.
    #[serde(default = "default_overlay_root")]
    pub overlay_root: PathBuf,

    /// Content root containing one subdirectory per course.
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,

    /// Deployable output tree.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Directory of `<locale>.toml` translation catalogs.
    #[serde(default = "default_i18n_dir")]
    pub i18n_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_root: default_base_root(),
            overlay_root: default_overlay_root(),
            content_root: default_content_root(),
            output_root: default_output_root(),
            i18n_dir: default_i18n_dir(),
        }
    }
}

fn default_base_root() -> PathBuf {
    "app/assets".into()
}
fn default_overlay_root() -> PathBuf {
    "site/assets".into()
}
fn default_content_root() -> PathBuf {
    "content".into()
}
fn default_output_root() -> PathBuf {
    "public/assets".into()
}
fn default_i18n_dir() -> PathBuf {
    "i18n".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Canonical site origin used for sitemap URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Statically configured extra sitemap paths.
    #[serde(default)]
    pub extra_urls: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            extra_urls: Vec::new(),
        }
    }
}

fn default_base_url() -> String {
    "https://localhost".into()
}

/// `[locales]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalesConfig {
    /// The distinguished default locale (unsuffixed output names).
    #[serde(default = "default_locale")]
    pub default: Locale,

    /// Every locale to fan out to, including the default.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<Locale>,
}

impl LocalesConfig {
    pub fn is_default(&self, locale: &Locale) -> bool {
        *locale == self.default
    }
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            default: default_locale(),
            enabled: default_enabled(),
        }
    }
}

fn default_locale() -> Locale {
    Locale::new("en")
}
fn default_enabled() -> Vec<Locale> {
    vec![Locale::new("en")]
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Minify compiled output by default (CLI flag overrides).
    #[serde(default)]
    pub minify: bool,

    /// Course stage worker pool size. 1 = strictly sequential.
    #[serde(default = "default_course_concurrency")]
    pub course_concurrency: u32,

    /// Glob for top-level script entry points under each overlay root.
    #[serde(default = "default_script_pattern")]
    pub script_pattern: String,

    /// Glob for top-level style entry points under each overlay root.
    #[serde(default = "default_style_pattern")]
    pub style_pattern: String,

    /// Icon collection directory, relative to each overlay root.
    #[serde(default = "default_icons_dir")]
    pub icons_dir: String,

    /// Polyfill sources, relative to the overlay roots, concatenated in order.
    #[serde(default)]
    pub polyfills: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            minify: false,
            course_concurrency: default_course_concurrency(),
            script_pattern: default_script_pattern(),
            style_pattern: default_style_pattern(),
            icons_dir: default_icons_dir(),
            polyfills: Vec::new(),
        }
    }
}

fn default_course_concurrency() -> u32 {
    1
}
fn default_script_pattern() -> String {
    "*.ts".into()
}
fn default_style_pattern() -> String {
    "*.scss".into()
}
fn default_icons_dir() -> String {
    "assets/icons".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the application config from the working directory.
/// Returns defaults if `assetforge.toml` does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = PathBuf::from(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AssetForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        AssetForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file into `dir`. Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| AssetForgeError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AssetForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AssetForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_root"));
        assert!(toml_str.contains("base_url"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.build.course_concurrency, 1);
        assert_eq!(parsed.locales.default, Locale::new("en"));
        assert_eq!(parsed.paths.output_root, PathBuf::from("public/assets"));
    }

    #[test]
    fn config_with_overrides() {
        let toml_str = r#"
[paths]
overlay_root = "theme/assets"

[locales]
default = "ru"
enabled = ["ru", "en", "ar"]

[build]
minify = true
polyfills = ["vendor/fetch.js", "vendor/promise.js"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.paths.overlay_root, PathBuf::from("theme/assets"));
        assert_eq!(config.locales.enabled.len(), 3);
        assert!(config.locales.is_default(&Locale::new("ru")));
        assert!(config.build.minify);
        assert_eq!(config.build.polyfills.len(), 2);
        // Untouched sections keep their defaults
        assert_eq!(config.build.script_pattern, "*.ts");
    }

    #[test]
    fn init_writes_parseable_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = init_config(tmp.path()).expect("init");
        let parsed = load_config_from(&path).expect("reload");
        assert_eq!(parsed.build.style_pattern, "*.scss");
    }
}
