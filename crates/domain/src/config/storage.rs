use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding transcript segments and call summaries.
    #[serde(default = "d_db_path")]
    pub db_path: PathBuf,
    /// Default directory for `voxgate export`.
    #[serde(default = "d_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: d_db_path(),
            export_dir: d_export_dir(),
        }
    }
}

fn d_db_path() -> PathBuf {
    PathBuf::from("data/transcripts.db")
}

fn d_export_dir() -> PathBuf {
    PathBuf::from("data/exports")
}
