//! Flat-file appeal storage
//!
//! One pretty-printed JSON file per appeal, named after the local time of
//! the request at second resolution. Two appeals saved within the same
//! second share a name and the later one replaces the earlier; this is only
//! flagged in the log.

use std::path::PathBuf;

use chrono::{DateTime, Local};

use super::types::Appeal;
use crate::error::ApiError;
use crate::logger;

#[derive(Debug, Clone)]
pub struct AppealStore {
    dir: PathBuf,
}

impl AppealStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `appeal_YYYYMMDD_HHMMSS.json`
    pub fn file_name(at: &DateTime<Local>) -> String {
        format!("appeal_{}.json", at.format("%Y%m%d_%H%M%S"))
    }

    /// Write `appeal` and return the file name it was written under.
    pub async fn save(&self, appeal: &Appeal, at: &DateTime<Local>) -> Result<String, ApiError> {
        let json = serde_json::to_string_pretty(appeal)?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let filename = Self::file_name(at);
        let path = self.dir.join(&filename);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            logger::log_warning(&format!(
                "Appeal file {} already exists and will be overwritten",
                path.display()
            ));
        }

        tokio::fs::write(&path, json).await?;
        logger::log_info(&format!("[Appeal] Saved {}", path.display()));

        Ok(filename)
    }
}
