use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the prompt catalog lives and which agent answers first contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "d_path")]
    pub path: PathBuf,
    #[serde(default = "d_default_agent")]
    pub default_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: d_path(),
            default_agent: d_default_agent(),
        }
    }
}

fn d_path() -> PathBuf {
    PathBuf::from("config/prompts.json")
}

fn d_default_agent() -> String {
    "receptionist".into()
}
