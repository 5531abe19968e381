use anyhow::{Context as AnyhowContext, Result};
use std::path::PathBuf;

pub(crate) const SURVEY_DIR_ENV: &str = "SURVEY_DIR";
pub(crate) const PORT_ENV: &str = "PORT";
const DEFAULT_PORT: u16 = 8080;

/// Settings for one survey-provider process.
#[derive(Clone, Debug)]
pub(crate) struct ServiceConfig {
    pub survey_dir: PathBuf,
    pub bind: String,
}

impl ServiceConfig {
    /// Validate the survey directory and settle the bind address.
    ///
    /// An explicit `bind` wins; otherwise `PORT` picks the port on all
    /// interfaces.
    pub(crate) fn resolve(survey_dir: PathBuf, bind: Option<String>) -> Result<Self> {
        if !survey_dir.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", survey_dir.display());
        }
        let bind = match bind {
            Some(bind) => bind,
            None => default_bind(std::env::var(PORT_ENV).ok().as_deref())?,
        };
        Ok(Self { survey_dir, bind })
    }
}

fn default_bind(port: Option<&str>) -> Result<String> {
    let port = match port.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("Invalid {PORT_ENV} value: {raw}"))?,
        None => DEFAULT_PORT,
    };
    Ok(format!("0.0.0.0:{port}"))
}
