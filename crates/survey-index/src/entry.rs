use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One indexed survey, as exposed by the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyEntry {
    /// Path relative to the indexed root, `/`-separated.
    pub id: String,

    /// Declared `surveyDefinition.key`.
    pub label: String,

    /// Flattened localized survey name, keyed by locale code.
    pub description: BTreeMap<String, String>,

    /// Last modification time of the backing file at index time.
    #[serde(rename = "time")]
    pub modified_time: DateTime<Utc>,

    /// Grandparent directory name of the backing file.
    pub study: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,

    #[serde(skip)]
    pub(crate) source_path: PathBuf,
}

impl SurveyEntry {
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}
