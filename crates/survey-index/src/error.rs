use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurveyError>;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Survey directory does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Walk aborted at {path}: {source}")]
    WalkAborted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Walk cancelled by shutdown")]
    Cancelled,

    #[error("Unknown survey id: {id}")]
    NotFound { id: String },

    #[error("Unable to read survey {id} at {path}: {source}")]
    Unreadable {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SurveyError {
    /// Query-time failures the transport reports as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Unreadable { .. })
    }

    pub(crate) fn walk_aborted(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        Self::WalkAborted {
            path,
            source: err.into(),
        }
    }
}

/// Why a `.json` file is not a survey document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid survey format")]
    InvalidFormat,
}
