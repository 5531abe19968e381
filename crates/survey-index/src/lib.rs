//! # Survey Index
//!
//! In-memory index of the survey definition documents under a directory tree.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> Walker (follows symlinked directories)
//!     │      └─> `.json` candidates
//!     │
//!     ├──> Document parser
//!     │      └─> Survey entries keyed by relative path
//!     │
//!     └──> Snapshot swap
//!            └─> list / resolve
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use survey_index::SurveyIndex;
//!
//! fn main() -> survey_index::Result<()> {
//!     let index = SurveyIndex::new("/srv/surveys")?;
//!     let stats = index.rebuild()?;
//!
//!     println!("Indexed {} surveys", stats.surveys);
//!     for entry in index.list() {
//!         println!("{} -> {}", entry.id, index.resolve(&entry.id)?.display());
//!     }
//!     Ok(())
//! }
//! ```

mod cancel;
mod document;
mod entry;
mod error;
mod index;
mod stats;
mod walker;

pub use cancel::ShutdownSignal;
pub use document::{
    localized_to_flat_map, parse_survey_bytes, parse_survey_document, ExpressionArg,
    LocalisedObject, ParsedSurvey, SurveyDefinition, SurveyDocument, SurveyProps,
};
pub use entry::SurveyEntry;
pub use error::{DocumentError, Result, SurveyError};
pub use index::{Snapshot, SurveyIndex};
pub use stats::WalkStats;
pub use walker::{walk, WalkOutcome};
