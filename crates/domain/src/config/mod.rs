mod catalog;
mod observability;
mod provider;
mod server;
mod storage;
mod summary;
mod transcription;

pub use catalog::*;
pub use observability::*;
pub use provider::*;
pub use server::*;
pub use storage::*;
pub use summary::*;
pub use transcription::*;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The full gateway configuration, deserialized once from TOML at startup
/// and shared read-only behind an `Arc` afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single problem found by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Check semantic constraints serde cannot express.  Returns every
    /// problem found rather than stopping at the first.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                field: "server.port",
                message: "must be non-zero".into(),
            });
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 || rl.burst_size == 0 {
                issues.push(ConfigIssue {
                    field: "server.rate_limit",
                    message: "requests_per_second and burst_size must be > 0".into(),
                });
            }
        }
        if self.provider.model.trim().is_empty() {
            issues.push(ConfigIssue {
                field: "provider.model",
                message: "must not be empty".into(),
            });
        }
        if self.provider.accept_timeout_ms == 0 {
            issues.push(ConfigIssue {
                field: "provider.accept_timeout_ms",
                message: "must be non-zero".into(),
            });
        }
        if self.provider.connect_timeout_ms == 0 {
            issues.push(ConfigIssue {
                field: "provider.connect_timeout_ms",
                message: "must be non-zero".into(),
            });
        }
        if self.provider.stream_idle_timeout_ms == 0 || self.provider.stream_ping_interval_ms == 0 {
            issues.push(ConfigIssue {
                field: "provider.stream_idle_timeout_ms",
                message: "stream_idle_timeout_ms and stream_ping_interval_ms must be non-zero".into(),
            });
        }
        if self.summary.timeout_ms == 0 {
            issues.push(ConfigIssue {
                field: "summary.timeout_ms",
                message: "must be non-zero".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.summary.temperature) {
            issues.push(ConfigIssue {
                field: "summary.temperature",
                message: "must be between 0.0 and 2.0".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            issues.push(ConfigIssue {
                field: "observability.sample_rate",
                message: "must be between 0.0 and 1.0".into(),
            });
        }
        if self.catalog.default_agent.trim().is_empty() {
            issues.push(ConfigIssue {
                field: "catalog.default_agent",
                message: "must not be empty".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn zero_port_is_reported() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "server.port");
    }

    #[test]
    fn zero_stream_idle_timeout_is_reported() {
        let mut cfg = Config::default();
        cfg.provider.stream_idle_timeout_ms = 0;
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "provider.stream_idle_timeout_ms");
    }

    #[test]
    fn multiple_issues_are_collected() {
        let mut cfg = Config::default();
        cfg.provider.model = " ".into();
        cfg.summary.temperature = 3.0;
        cfg.observability.sample_rate = -1.0;
        assert_eq!(cfg.validate().len(), 3);
    }
}
