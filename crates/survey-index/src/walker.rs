use crate::cancel::ShutdownSignal;
use crate::document::parse_survey_document;
use crate::entry::SurveyEntry;
use crate::error::{Result, SurveyError};
use crate::stats::WalkStats;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

const SURVEY_SUFFIX: &str = ".json";

/// Complete result of one directory walk.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Surveys keyed by id.
    pub entries: HashMap<String, SurveyEntry>,
    pub stats: WalkStats,
}

/// What a visited node is, resolved once per node.
#[derive(Debug)]
enum NodeKind {
    Directory,
    SymlinkToDirectory(PathBuf),
    SymlinkToFile,
    RegularFile,
    Unreadable(io::Error),
    Special,
}

/// Walk `root` and collect every survey document below it.
///
/// Any filesystem error on a node of the root tree aborts the whole walk.
/// Symlinks that cannot be resolved, that point back into a directory already
/// being walked, or whose tree fails to walk are skipped. Symlinked
/// directories are walked and merged under `<link name>/`; symlinked files are
/// ignored.
pub fn walk(root: &Path, shutdown: &ShutdownSignal) -> Result<WalkOutcome> {
    let start = Instant::now();
    let root = fs::canonicalize(root).map_err(|source| {
        log::error!("Unable to read dir {}: {source}", root.display());
        SurveyError::WalkAborted {
            path: root.to_path_buf(),
            source,
        }
    })?;

    log::info!("Indexing surveys under {}", root.display());
    let mut walker = Walker {
        shutdown,
        active: vec![root.clone()],
    };
    let mut outcome = walker.walk_tree(&root)?;
    outcome.stats.time_ms = start.elapsed().as_millis() as u64;

    log::info!(
        "Indexed {} surveys in {} ms ({} rejected, {} links skipped)",
        outcome.stats.surveys,
        outcome.stats.time_ms,
        outcome.stats.rejected,
        outcome.stats.skipped_links
    );
    Ok(outcome)
}

struct Walker<'a> {
    shutdown: &'a ShutdownSignal,
    /// Canonical roots of the walks currently on the stack.
    active: Vec<PathBuf>,
}

impl Walker<'_> {
    fn walk_tree(&mut self, root: &Path) -> Result<WalkOutcome> {
        let mut entries = HashMap::new();
        let mut stats = WalkStats::new();

        for item in WalkDir::new(root).follow_links(false) {
            if self.shutdown.is_raised() {
                log::info!("Shutdown requested, abandoning walk of {}", root.display());
                return Err(SurveyError::Cancelled);
            }

            let node = item.map_err(|err| {
                log::error!("Walk aborted: {err}");
                SurveyError::walk_aborted(err)
            })?;

            match classify(&node) {
                NodeKind::Directory => stats.directories += 1,
                NodeKind::Special => {
                    log::debug!("Skipping special file {}", node.path().display());
                }
                NodeKind::SymlinkToFile => {
                    log::debug!("Ignoring symlinked file {}", node.path().display());
                }
                NodeKind::Unreadable(err) => {
                    log::warn!("Skipping symlink {}: {err}", node.path().display());
                    stats.skipped_links += 1;
                }
                NodeKind::SymlinkToDirectory(target) => {
                    if self.loops_back(&node, &target) {
                        log::warn!(
                            "Skipping symlink {}: {} is already being walked",
                            node.path().display(),
                            target.display()
                        );
                        stats.skipped_links += 1;
                        continue;
                    }
                    self.merge_linked_tree(&node, &target, &mut entries, &mut stats)?;
                }
                NodeKind::RegularFile => {
                    if !is_survey_candidate(&node) {
                        continue;
                    }
                    match detect_survey(root, &node)? {
                        Some(entry) => {
                            log::debug!("Added {} ({})", node.path().display(), entry.id);
                            insert_entry(&mut entries, entry, node.path(), &mut stats);
                        }
                        None => stats.rejected += 1,
                    }
                }
            }
        }

        stats.surveys = entries.len();
        Ok(WalkOutcome { entries, stats })
    }

    /// A link loops when its target contains the link itself or any walk
    /// root still on the stack.
    fn loops_back(&self, link: &DirEntry, target: &Path) -> bool {
        let inside_target = link
            .path()
            .parent()
            .is_some_and(|parent| parent.starts_with(target));
        inside_target || self.active.iter().any(|active| active.starts_with(target))
    }

    fn merge_linked_tree(
        &mut self,
        link: &DirEntry,
        target: &Path,
        entries: &mut HashMap<String, SurveyEntry>,
        stats: &mut WalkStats,
    ) -> Result<()> {
        self.active.push(target.to_path_buf());
        let linked = self.walk_tree(target);
        self.active.pop();

        let linked = match linked {
            Ok(linked) => linked,
            Err(SurveyError::Cancelled) => return Err(SurveyError::Cancelled),
            Err(err) => {
                log::warn!(
                    "Skipping symlinked tree {} -> {}: {err}",
                    link.path().display(),
                    target.display()
                );
                stats.skipped_links += 1;
                return Ok(());
            }
        };

        stats.absorb(&linked.stats);
        let prefix = format!("{}/", link.file_name().to_string_lossy());
        for (_, mut entry) in linked.entries {
            entry.id = format!("{prefix}{}", entry.id);
            insert_entry(entries, entry, link.path(), stats);
        }
        Ok(())
    }
}

/// Insert `entry`, replacing and reporting any survey already under its id.
fn insert_entry(
    entries: &mut HashMap<String, SurveyEntry>,
    entry: SurveyEntry,
    origin: &Path,
    stats: &mut WalkStats,
) {
    if let Some(previous) = entries.insert(entry.id.clone(), entry) {
        log::warn!(
            "Duplicate survey id {}: {} replaces {}",
            previous.id,
            origin.display(),
            previous.source_path.display()
        );
        stats.duplicates += 1;
    }
}

fn classify(node: &DirEntry) -> NodeKind {
    let file_type = node.file_type();
    if file_type.is_dir() {
        NodeKind::Directory
    } else if file_type.is_symlink() {
        match resolve_link(node.path()) {
            Ok((target, metadata)) if metadata.is_dir() => NodeKind::SymlinkToDirectory(target),
            Ok(_) => NodeKind::SymlinkToFile,
            Err(err) => NodeKind::Unreadable(err),
        }
    } else if file_type.is_file() {
        NodeKind::RegularFile
    } else {
        NodeKind::Special
    }
}

fn resolve_link(path: &Path) -> io::Result<(PathBuf, fs::Metadata)> {
    let target = fs::canonicalize(path)?;
    let metadata = fs::metadata(&target)?;
    Ok((target, metadata))
}

fn is_survey_candidate(node: &DirEntry) -> bool {
    node.file_name().to_string_lossy().ends_with(SURVEY_SUFFIX)
}

fn detect_survey(root: &Path, node: &DirEntry) -> Result<Option<SurveyEntry>> {
    let path = node.path();
    let modified = node
        .metadata()
        .map_err(SurveyError::walk_aborted)?
        .modified()
        .map_err(|source| SurveyError::WalkAborted {
            path: path.to_path_buf(),
            source,
        })?;

    let parsed = match parse_survey_document(path) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::debug!("Not a survey {}: {err}", path.display());
            return Ok(None);
        }
    };

    Ok(Some(SurveyEntry {
        id: relative_id(root, path),
        label: parsed.key,
        description: parsed.name,
        modified_time: DateTime::<Utc>::from(modified),
        study: study_name(path),
        metadata: parsed.metadata,
        source_path: path.to_path_buf(),
    }))
}

fn relative_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Name of the directory two levels above the file.
fn study_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
