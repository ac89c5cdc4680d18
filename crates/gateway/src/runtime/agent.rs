//! Agent resolution: maps an agent id to the persona the realtime session
//! should adopt.
//!
//! Every agent shares the same function tools; only instructions and the
//! greeting differ between personas.

use std::sync::Arc;

use vm_domain::catalog::PromptCatalog;
use vm_protocol::ToolSpec;

/// Everything a session needs to speak as one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// The id actually resolved, which differs from the request on fallback.
    pub agent_id: String,
    pub instructions: String,
    pub tools: Vec<ToolSpec>,
    pub greeting: String,
}

impl AgentConfig {
    /// The instruction used for the agent's opening line.
    pub fn greeting_instruction(&self) -> String {
        format!("Say: {}", self.greeting)
    }
}

#[derive(Clone)]
pub struct AgentResolver {
    catalog: Arc<PromptCatalog>,
}

impl AgentResolver {
    pub fn new(catalog: Arc<PromptCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    /// The agent that answers first contact.
    pub fn entry_agent(&self) -> &str {
        self.catalog.default_agent()
    }

    /// Look up `agent_id`, falling back to the default agent when the
    /// catalog has no such entry.  Never fails: the catalog is validated to
    /// contain the default agent at load time.
    pub fn resolve(&self, agent_id: &str) -> AgentConfig {
        let resolved = if self.catalog.contains_agent(agent_id) {
            agent_id
        } else {
            tracing::warn!(
                requested = agent_id,
                fallback = self.catalog.default_agent(),
                "unknown agent, using default"
            );
            self.catalog.default_agent()
        };

        AgentConfig {
            agent_id: resolved.to_owned(),
            instructions: self
                .catalog
                .instructions(resolved)
                .unwrap_or_default()
                .to_owned(),
            tools: self.toolset(),
            greeting: self.greeting_for(resolved),
        }
    }

    /// The full function tool list, independent of agent.
    pub fn toolset(&self) -> Vec<ToolSpec> {
        self.catalog
            .functions()
            .iter()
            .map(|f| ToolSpec::function(f.name.clone(), f.description.clone(), f.parameters.clone()))
            .collect()
    }

    fn greeting_for(&self, agent_id: &str) -> String {
        match self.catalog.greeting(agent_id) {
            Some(g) => g.to_owned(),
            None if agent_id == self.catalog.default_agent() => {
                format!("Hello! Welcome to {}.", self.catalog.centre_name())
            }
            None => format!("Hello, this is {agent_id}."),
        }
    }
}
