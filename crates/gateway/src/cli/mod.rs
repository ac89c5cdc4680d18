pub mod calls;
pub mod config;
pub mod doctor;
pub mod export;
pub mod summarize;

use clap::{Parser, Subcommand};

use vm_domain::config::Config;

/// voxgate: realtime voice call gateway for multi-agent reception desks.
#[derive(Debug, Parser)]
#[command(name = "voxgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the webhook server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List recent calls with recorded transcripts.
    Calls {
        /// Maximum number of calls to list.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Export one call's transcript and summary as JSON.
    Export {
        call_id: String,
        /// Output file (defaults to a timestamped file in `storage.export_dir`).
        #[arg(long)]
        output: Option<std::path::PathBuf>,
    },
    /// Regenerate the summary for a finished call.
    Summarize {
        call_id: String,
        /// Agent recorded on the summary (defaults to the agent of the
        /// call's last segment).
        #[arg(long)]
        agent: Option<String>,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `VX_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("VX_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        eprintln!("{config_path} not found, using built-in defaults");
        Config::default()
    };

    Ok((config, config_path))
}
