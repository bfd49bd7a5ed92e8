//! permitclean CLI
//!
//! Scaffolds, validates and runs permit normalization projects.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// permitclean - normalize vendor building-permit exports
#[derive(Parser)]
#[command(name = "permitclean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project file or directory
    #[arg(
        short,
        long,
        default_value = "permitclean.yaml",
        env = "PERMITCLEAN_CONFIG"
    )]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new permitclean project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Vendor of the exports (vendor_a / cl or vendor_b / cm)
        #[arg(long, default_value = "vendor_b")]
        vendor: String,
    },

    /// Validate the project, and optionally an input file against its schema
    Validate {
        /// Input CSV to check against the schema
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Run the pipeline on an input file
    Run {
        /// Input CSV
        input: String,

        /// Output CSV (defaults to the project's `output`)
        #[arg(short, long)]
        output: Option<String>,

        /// Fixed `starttime` value, `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        at: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { path, name, vendor } => {
            commands::init::run(&path, name.as_deref(), &vendor)?;
        }
        Commands::Validate { input } => {
            commands::validate::run(&cli.config, input.as_deref())?;
        }
        Commands::Run { input, output, at } => {
            commands::run::run(&cli.config, &input, output.as_deref(), at.as_deref())?;
        }
    }

    Ok(())
}
