//! Shared types, error model, and configuration for assetforge.
//!
//! This crate is the foundation depended on by all other assetforge crates.
//! It provides:
//! - [`AssetForgeError`] — the unified error type
//! - Domain types ([`AssetUnit`], [`AssetKind`], [`Locale`], [`BuildResult`])
//! - Configuration ([`AppConfig`], config loading)
//! - Translation catalogs ([`Catalog`])

pub mod config;
pub mod error;
pub mod i18n;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, CONFIG_FILE_NAME, LocalesConfig, PathsConfig, SiteConfig, init_config,
    load_config, load_config_from,
};
pub use error::{AssetForgeError, Result};
pub use i18n::{Catalog, load_catalog};
pub use types::{AssetKind, AssetUnit, BuildResult, CourseRef, Locale, localized_dest};
