//! Prompt catalog: the read-only document describing every agent persona
//! (instructions + greeting) and the function tools offered to the
//! realtime session.
//!
//! The catalog is loaded once at startup.  Loading fails when the
//! designated default agent is missing, which lets agent resolution be
//! infallible for the rest of the process lifetime.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    medical_centre: CentreInfo,
    #[serde(default)]
    agents: BTreeMap<String, AgentEntry>,
    #[serde(default)]
    prompts: BTreeMap<String, PromptEntry>,
    #[serde(default)]
    functions: Vec<FunctionSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CentreInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentEntry {
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptEntry {
    #[serde(default)]
    pub greeting: Option<String>,
}

/// A function the realtime model may call, as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object")]
    pub parameters: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Catalog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validated, immutable prompt catalog.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    centre_name: String,
    default_agent: String,
    agents: BTreeMap<String, AgentEntry>,
    prompts: BTreeMap<String, PromptEntry>,
    functions: Vec<FunctionSpec>,
}

impl PromptCatalog {
    /// Read and validate the catalog file at `path`.
    pub fn load(path: &Path, default_agent: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("reading prompt catalog {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw, default_agent)
    }

    /// Parse and validate a catalog from JSON text.
    pub fn from_json_str(raw: &str, default_agent: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;

        if !file.agents.contains_key(default_agent) {
            return Err(Error::Config(format!(
                "prompt catalog has no entry for default agent '{default_agent}'"
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for func in &file.functions {
            if func.name.trim().is_empty() {
                return Err(Error::Config("prompt catalog function with empty name".into()));
            }
            if !seen.insert(func.name.as_str()) {
                return Err(Error::Config(format!(
                    "prompt catalog declares function '{}' twice",
                    func.name
                )));
            }
        }

        Ok(Self {
            centre_name: file
                .medical_centre
                .name
                .unwrap_or_else(|| "the medical centre".into()),
            default_agent: default_agent.to_owned(),
            agents: file.agents,
            prompts: file.prompts,
            functions: file.functions,
        })
    }

    pub fn centre_name(&self) -> &str {
        &self.centre_name
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    pub fn contains_agent(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    /// Agent ids in stable (sorted) order.
    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn instructions(&self, agent_id: &str) -> Option<&str> {
        self.agents.get(agent_id).map(|a| a.instructions.as_str())
    }

    /// The configured greeting, if the prompt entry carries one.
    pub fn greeting(&self, agent_id: &str) -> Option<&str> {
        self.prompts
            .get(agent_id)
            .and_then(|p| p.greeting.as_deref())
            .filter(|g| !g.trim().is_empty())
    }

    pub fn functions(&self) -> &[FunctionSpec] {
        &self.functions
    }
}
