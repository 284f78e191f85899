use crate::pathway::SlotStrategy;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that builds a branch tree.
#[derive(ClapArgs, Clone, Debug)]
pub struct ExpansionArgs {
    /// Patient history as a JSON array of events
    pub patient_file: PathBuf,

    /// Output file (prints to stdout when omitted)
    #[arg(short = 'o', long = "output")]
    pub output_file: Option<PathBuf>,

    /// Endpoint of the next-event model (overrides the config file)
    #[arg(long, conflicts_with = "replay")]
    pub model_url: Option<String>,

    /// Answer from a recorded candidate table instead of a live model
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Number of branching levels (default from config: 4)
    #[arg(long)]
    pub levels: Option<usize>,

    /// Children per path and level (default from config: 2)
    #[arg(long)]
    pub width: Option<usize>,

    /// Raw candidates requested from the model before filtering (default from config: 100)
    #[arg(long)]
    pub pool: Option<usize>,

    /// Always recompute instead of reusing a cached tree
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand a patient's history into hypothetical pathways
    Pathways {
        #[command(flatten)]
        expansion: ExpansionArgs,
    },

    /// Most frequent predicted codes across the pathway tree
    Predictions {
        #[command(flatten)]
        expansion: ExpansionArgs,

        /// Number of codes to report (default from config: 10)
        #[arg(long)]
        top: Option<usize>,

        /// How predictions are mapped to tree positions
        #[arg(long, value_enum, default_value = "ancestral")]
        strategy: SlotStrategy,
    },

    /// Show or update the configuration file
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
        #[arg(long)]
        model_url: Option<String>,
        #[arg(long)]
        model_timeout: Option<u64>,
        #[arg(long)]
        loinc: Option<PathBuf>,
        #[arg(long)]
        cpt4: Option<PathBuf>,
        #[arg(long)]
        cache_results: Option<bool>,
    },
}
