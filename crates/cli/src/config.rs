//! `paylist config` — inspect vocabulary config files.

use std::path::PathBuf;

use clap::Subcommand;

use paylist_recon::ReconConfig;

use crate::merge::load_config;
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Parse and validate a config file
    #[command(after_help = "\
Examples:
  paylist config check vocab.toml")]
    Check {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Print the built-in config as TOML
    Default,
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Check { config } => {
            load_config(Some(config.as_path()))?;
            eprintln!("{}: ok", config.display());
            Ok(())
        }
        ConfigCommands::Default => {
            let text = ReconConfig::default().to_toml()?;
            print!("{text}");
            Ok(())
        }
    }
}
