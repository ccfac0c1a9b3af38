pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

/// logicle-engine: chat streaming and tool orchestration server.
#[derive(Debug, Parser)]
#[command(name = "logicle-engine", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send a single message and print the streamed answer.
    Run {
        /// The message to send.
        message: String,
        /// System prompt for the one-shot assistant.
        #[arg(long, default_value = "")]
        system: String,
        /// Model override (e.g. "openai/gpt-4o").
        #[arg(long)]
        model: Option<String>,
        /// Approve every tool call that asks for confirmation.
        #[arg(long)]
        approve: bool,
        /// Print every frame as JSON instead of plain text.
        #[arg(long)]
        json: bool,
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

/// Load the configuration from the path in `LC_CONFIG` (or `config.toml`
/// by default). A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(lc_domain::config::Config, String)> {
    let config_path = std::env::var("LC_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        lc_domain::config::Config::default()
    };

    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_subcommand_parses_flags() {
        let cli = Cli::parse_from(["logicle-engine", "run", "hi", "--system", "be brief", "--json"]);
        match cli.command {
            Some(Command::Run { message, system, json, approve, model }) => {
                assert_eq!(message, "hi");
                assert_eq!(system, "be brief");
                assert!(json);
                assert!(!approve);
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["logicle-engine"]);
        assert!(cli.command.is_none());
    }
}
