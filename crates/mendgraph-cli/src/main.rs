//! Mendgraph CLI
//!
//! Repairs the structural damage a text-level merge leaves in a project
//! document:
//! - `repair`: rewrite the document in place, keeping the original as a backup
//! - `check`: dry run; exit status 1 when a repair would change anything
//! - `stats`: index statistics and conflicts, without running any repair

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mendgraph_storage::{check_file, load_config, repair_file, scan_file, RepairConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

mod progress;
mod report;

use progress::StderrProgress;

#[derive(Parser)]
#[command(name = "mendgraph")]
#[command(author, version, about = "Mendgraph: repair merged project documents")]
#[command(propagate_version = true)]
struct Cli {
    /// More diagnostics on stderr (`-v` info, `-vv` debug). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair a document in place.
    ///
    /// The original is kept as `<file>.bak` and every change is listed in
    /// `<file>.fixlog`. A document that needs no repair is left untouched.
    Repair {
        /// Project document
        input: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Report what a repair would change, without writing anything.
    Check {
        /// Project document
        input: PathBuf,
        /// Exit with status 0 even when changes would be made
        #[arg(long)]
        no_fail: bool,
    },

    /// Node counts per class, ownership edges and conflicts.
    Stats {
        /// Project document
        input: PathBuf,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON repair config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extension appended to the kept original
    #[arg(long)]
    backup_extension: Option<String>,
    /// Extension appended to the change-log file
    #[arg(long)]
    log_extension: Option<String>,
    /// Writing-system store (default: `WritingSystemStore` next to the document)
    #[arg(long)]
    ws_store: Option<PathBuf>,
    /// Do not migrate `.ldml` side files of normalized writing systems
    #[arg(long)]
    no_migrate: bool,
    /// Keep `<file>.tmp` when the repair fails
    #[arg(long)]
    keep_temp: bool,
}

impl ConfigArgs {
    fn resolve(self) -> Result<RepairConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
            None => RepairConfig::default(),
        };
        if let Some(ext) = self.backup_extension {
            config.backup_extension = ext;
        }
        if let Some(ext) = self.log_extension {
            config.log_extension = ext;
        }
        if let Some(dir) = self.ws_store {
            config.ws_store_dir = Some(dir);
        }
        if self.no_migrate {
            config.migrate_side_files = false;
        }
        if self.keep_temp {
            config.keep_temp_on_failure = true;
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut progress = StderrProgress::new(cli.verbose > 0 && cli.format == Format::Text);

    match cli.command {
        Commands::Repair { input, config } => {
            let config = config.resolve()?;
            let outcome = repair_file(&input, &config, &mut progress)
                .with_context(|| format!("repairing {}", input.display()))?;
            report::print_outcome(&outcome, cli.format, report::Mode::Repair)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { input, no_fail } => {
            let outcome = check_file(&input, &mut progress)
                .with_context(|| format!("checking {}", input.display()))?;
            report::print_outcome(&outcome, cli.format, report::Mode::Check)?;
            if outcome.is_clean() || no_fail {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
        Commands::Stats { input } => {
            let scan = scan_file(&input, &mut progress)
                .with_context(|| format!("reading {}", input.display()))?;
            report::print_scan(&scan, cli.format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
