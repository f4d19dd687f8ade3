//! Watch-mode invalidation: per-unit dependency registration and targeted
//! rebuild-on-change.
//!
//! A change event triggers exactly the registrations whose dependency set
//! covers the changed path — never units that merely share a directory.
//! Each triggered rebuild runs as its own task: rebuilds of different units
//! overlap freely, and rapid successive events on the same unit run
//! redundant rebuilds rather than being deduplicated.
//!
//! Every rebuild returns its fresh dependency set and the event loop
//! performs an explicit replace-and-diff, so stale paths are dropped and
//! new imports are picked up without a restart.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use notify::{EventKind, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use assetforge_shared::{AssetForgeError, BuildResult, Result};

/// What a rebuild hands back: the reportable result plus the dependency
/// set the unit now has.
#[derive(Debug)]
pub struct RebuildOutcome {
    pub result: BuildResult,
    pub dependencies: Vec<PathBuf>,
}

pub type RebuildFuture = Pin<Box<dyn Future<Output = RebuildOutcome> + Send>>;

/// A re-runnable unit build. Cloned into the event loop and invoked once
/// per triggering event.
pub type RebuildFn = Arc<dyn Fn() -> RebuildFuture + Send + Sync>;

struct Registration {
    dependencies: HashSet<PathBuf>,
    rebuild: RebuildFn,
}

/// Per-unit file-dependency registry driving watch-mode rebuilds.
#[derive(Default)]
pub struct WatchInvalidator {
    registrations: Mutex<HashMap<String, Registration>>,
}

impl WatchInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a unit's dependency set and rebuild.
    ///
    /// Re-registration replaces the previous set for that unit only;
    /// added and removed paths are logged for diagnosis.
    pub fn register(&self, unit_id: &str, dependencies: Vec<PathBuf>, rebuild: RebuildFn) {
        let deps: HashSet<PathBuf> = dependencies
            .into_iter()
            .map(|p| p.canonicalize().unwrap_or(p))
            .collect();

        let mut registrations = self.registrations.lock().expect("watch lock poisoned");
        if let Some(previous) = registrations.get(unit_id) {
            let added = deps.difference(&previous.dependencies).count();
            let removed = previous.dependencies.difference(&deps).count();
            if added > 0 || removed > 0 {
                debug!(unit_id, added, removed, "dependency set replaced");
            }
        }
        registrations.insert(
            unit_id.to_string(),
            Registration {
                dependencies: deps,
                rebuild,
            },
        );
    }

    /// Number of currently registered units.
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().expect("watch lock poisoned").len()
    }

    /// The registered dependency set for a unit, if any.
    pub fn dependencies_of(&self, unit_id: &str) -> Option<Vec<PathBuf>> {
        let registrations = self.registrations.lock().expect("watch lock poisoned");
        registrations
            .get(unit_id)
            .map(|r| r.dependencies.iter().cloned().collect())
    }

    /// Every registration whose dependency set covers `path`: an exact
    /// dependency file, or any path under a registered directory.
    pub fn affected(&self, path: &Path) -> Vec<(String, RebuildFn)> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let registrations = self.registrations.lock().expect("watch lock poisoned");

        registrations
            .iter()
            .filter(|(_, reg)| {
                reg.dependencies
                    .iter()
                    .any(|dep| path == *dep || path.starts_with(dep))
            })
            .map(|(id, reg)| (id.clone(), reg.rebuild.clone()))
            .collect()
    }

    /// Watch the given roots and rebuild affected units until the process
    /// is terminated. Watcher errors are logged and the loop continues.
    pub async fn run(self: Arc<Self>, roots: &[PathBuf]) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(|e| AssetForgeError::Watch(e.to_string()))?;

        for root in roots.iter().filter(|r| r.exists()) {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| AssetForgeError::Watch(format!("{}: {e}", root.display())))?;
            info!(root = %root.display(), "watching");
        }

        while let Some(received) = rx.recv().await {
            match received {
                // Access events carry no content change.
                Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
                Ok(event) => {
                    for path in &event.paths {
                        for (unit_id, rebuild) in self.affected(path) {
                            debug!(%unit_id, changed = %path.display(), "change triggers rebuild");
                            let invalidator = Arc::clone(&self);
                            tokio::spawn(async move {
                                let outcome = rebuild().await;
                                if outcome.result.success {
                                    info!(
                                        unit_id = %outcome.result.unit_id,
                                        duration_ms = outcome.result.duration.as_millis(),
                                        "rebuilt"
                                    );
                                } else {
                                    warn!(
                                        unit_id = %outcome.result.unit_id,
                                        error = outcome.result.error.as_deref().unwrap_or("unknown"),
                                        "rebuild failed"
                                    );
                                }
                                invalidator.register(&unit_id, outcome.dependencies, rebuild);
                            });
                        }
                    }
                }
                Err(e) => warn!(error = %e, "watch event error, continuing"),
            }
        }

        Ok(())
    }
}
