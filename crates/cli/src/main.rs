// Paylist CLI - reconcile yearly salary lists with their addenda

mod config;
mod exit_codes;
mod merge;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use config::ConfigCommands;
use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use paylist_recon::ReconError;

#[derive(Parser)]
#[command(name = "paylist")]
#[command(about = "Deduplicate salary lists and apply addenda")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a year's salary list with its addendum
    #[command(after_help = "\
Examples:
  paylist merge --salary salary_2023.csv --addendum addendum_2023.csv
  paylist merge --salary salary_2023.csv --addendum addendum_2023.csv -o out/ --json
  paylist merge --salary salary_2023.csv --config vocab.toml --quiet")]
    Merge {
        /// Base salary list (CSV)
        #[arg(long)]
        salary: PathBuf,

        /// Addendum with a status column (CSV). A path that does not exist
        /// passes the deduplicated salary list through.
        #[arg(long)]
        addendum: Option<PathBuf>,

        /// Directory for the merged CSV and the report
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// Status and column vocabulary (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Only log warnings and errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check a previously merged file against its inputs
    #[command(after_help = "\
Examples:
  paylist validate --salary salary_2023.csv --addendum addendum_2023.csv \\
      --merged merged_salary_2023_uncleaned.csv --report merge_report_2023.json")]
    Validate {
        /// Base salary list the merge started from
        #[arg(long)]
        salary: PathBuf,

        /// Addendum that was applied
        #[arg(long)]
        addendum: PathBuf,

        /// Merged output to check
        #[arg(long)]
        merged: PathBuf,

        /// Report written by `paylist merge`
        #[arg(long)]
        report: PathBuf,

        /// Status and column vocabulary (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print violations as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Only log warnings and errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Inspect vocabulary config files
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PAYLIST_BUILD_ID"), ")",
        "\ntarget:  ", env!("PAYLIST_TARGET"),
        "\nprofile: ", env!("PAYLIST_PROFILE"),
    )
}

fn init_logging(quiet: bool) {
    let level = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            salary,
            addendum,
            output,
            config,
            json,
            quiet,
        } => {
            init_logging(quiet);
            merge::cmd_merge(salary, addendum, output, config, json)
        }
        Commands::Validate {
            salary,
            addendum,
            merged,
            report,
            config,
            json,
            quiet,
        } => {
            init_logging(quiet);
            merge::cmd_validate(salary, addendum, merged, report, config, json)
        }
        Commands::Config(cmd) => {
            init_logging(true);
            config::cmd_config(cmd)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("map the source header in the [columns] section of a --config file".to_string())
            }
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                Some("run `paylist config default` for a valid starting point".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
