//! Cache-bust registry: the one process-wide published value.
//!
//! The icon stage hashes the assembled sprite and publishes the cache-busted
//! path; every later script compilation reads the current value at the
//! moment it runs. The happens-before edge is supplied by stage sequencing
//! in the orchestrator (the icon stage's future is awaited before any
//! consumer is spawned), not by this cell.

use std::sync::RwLock;

use sha2::{Digest, Sha256};
use tracing::info;

use assetforge_transforms::UNVERSIONED_SPRITE_PATH;

/// Single-writer/many-reader cell holding the current sprite path.
#[derive(Debug)]
pub struct CacheBustRegistry {
    current: RwLock<String>,
}

impl CacheBustRegistry {
    /// A fresh registry holding the unversioned fallback path.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(UNVERSIONED_SPRITE_PATH.to_string()),
        }
    }

    /// Publish the cache-busted path for a sprite content hash.
    /// Last write wins across watch-mode republishes.
    pub fn publish(&self, hash8: &str) -> String {
        let path = format!("/icons.{hash8}.svg");
        *self.current.write().expect("registry lock poisoned") = path.clone();
        info!(%path, "published cache-busted sprite path");
        path
    }

    /// The currently published path. Readers call this at run time and
    /// never cache the value across rebuilds.
    pub fn current(&self) -> String {
        self.current.read().expect("registry lock poisoned").clone()
    }
}

impl Default for CacheBustRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// First 8 hex characters of the SHA-256 digest of `content`.
pub fn content_hash8(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_unversioned_path() {
        let registry = CacheBustRegistry::new();
        assert_eq!(registry.current(), "/icons.svg");
    }

    #[test]
    fn publish_updates_current() {
        let registry = CacheBustRegistry::new();
        let path = registry.publish("ab12cd34");
        assert_eq!(path, "/icons.ab12cd34.svg");
        assert_eq!(registry.current(), "/icons.ab12cd34.svg");

        // Watch-mode republish: last write wins.
        registry.publish("ffffffff");
        assert_eq!(registry.current(), "/icons.ffffffff.svg");
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = content_hash8(b"<svg>one</svg>");
        let b = content_hash8(b"<svg>one</svg>");
        let c = content_hash8(b"<svg>two</svg>");

        assert_eq!(a.len(), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
