use crate::cancel::ShutdownSignal;
use crate::entry::SurveyEntry;
use crate::error::{Result, SurveyError};
use crate::stats::WalkStats;
use crate::walker::walk;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Point-in-time mapping from survey id to entry.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: HashMap<String, SurveyEntry>,
    built_at: Option<DateTime<Utc>>,
    stats: WalkStats,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` until the first successful rebuild.
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    pub fn get(&self, id: &str) -> Option<&SurveyEntry> {
        self.entries.get(id)
    }

    /// Entries ordered by id.
    pub fn list(&self) -> Vec<SurveyEntry> {
        let mut list: Vec<SurveyEntry> = self.entries.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}

/// Rebuildable index of the survey documents under one root.
///
/// Readers always see a complete snapshot: `rebuild` walks the tree without
/// holding the snapshot lock and only takes it to swap in the new `Arc`.
#[derive(Debug)]
pub struct SurveyIndex {
    root: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
    rebuild_lock: Mutex<()>,
    shutdown: ShutdownSignal,
}

impl SurveyIndex {
    /// Create an empty index bound to `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_shutdown(root, ShutdownSignal::new())
    }

    /// Create an empty index whose rebuilds stop once `shutdown` is raised.
    pub fn with_shutdown(root: impl AsRef<Path>, shutdown: ShutdownSignal) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SurveyError::RootMissing(root));
        }

        Ok(Self {
            root,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            rebuild_lock: Mutex::new(()),
            shutdown,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root again and replace the snapshot.
    ///
    /// On error the previous snapshot stays in place. Overlapping calls are
    /// serialized.
    pub fn rebuild(&self) -> Result<WalkStats> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let outcome = walk(&self.root, &self.shutdown).inspect_err(|err| {
            log::warn!(
                "Rebuild of {} failed, keeping previous snapshot: {err}",
                self.root.display()
            );
        })?;

        let stats = outcome.stats.clone();
        let next = Arc::new(Snapshot {
            entries: outcome.entries,
            built_at: Some(Utc::now()),
            stats: outcome.stats,
        });
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        Ok(stats)
    }

    /// The current snapshot; unaffected by later rebuilds.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All entries ordered by id.
    pub fn list(&self) -> Vec<SurveyEntry> {
        self.snapshot().list()
    }

    /// Backing file of the survey with exactly this id.
    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        self.snapshot()
            .get(id)
            .map(|entry| entry.source_path.clone())
            .ok_or_else(|| SurveyError::NotFound { id: id.to_string() })
    }

    /// Raw bytes of the survey document with this id.
    pub fn fetch(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(id)?;
        std::fs::read(&path).map_err(|source| SurveyError::Unreadable {
            id: id.to_string(),
            path,
            source,
        })
    }
}
