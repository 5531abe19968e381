use serde::{Deserialize, Serialize};

/// Statistics about one directory walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Number of surveys indexed
    pub surveys: usize,

    /// `.json` files that were not survey documents
    pub rejected: usize,

    /// Symlinks skipped because they could not be resolved, looped back, or
    /// their tree could not be walked
    pub skipped_links: usize,

    /// Surveys replaced by a later one with the same id
    pub duplicates: usize,

    /// Directories visited, including symlinked ones
    pub directories: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl WalkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the counters of a symlinked sub-walk into this one.
    ///
    /// `surveys` is left alone: it always mirrors the merged mapping size.
    pub fn absorb(&mut self, other: &WalkStats) {
        self.rejected += other.rejected;
        self.skipped_links += other.skipped_links;
        self.duplicates += other.duplicates;
        self.directories += other.directories;
    }
}
