use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "portatype")]
#[command(about = "Prepare a portable-type schema and drive class instrumentation for a build")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root used to derive directory conventions.
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub main_classes: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub test_classes: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub main_resources: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub test_resources: Option<PathBuf>,

    /// Resolved dependency classpath, platform path-separator joined.
    #[arg(long, value_name = "PATHS")]
    pub classpath: Option<String>,

    /// File listing resolved dependency paths, one per line.
    #[arg(long, value_name = "FILE")]
    pub classpath_file: Option<PathBuf>,

    /// Marker annotation selecting portable types.
    #[arg(long, value_name = "FQN")]
    pub marker_annotation: Option<String>,

    #[arg(long)]
    pub instrument_test_classes: bool,

    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Build the merged schema and instrument every eligible class directory.
    Instrument {
        /// Instrumentation engine executable; falls back to PORTATYPE_ENGINE.
        #[arg(long, value_name = "CMD")]
        engine: Option<PathBuf>,
    },
    /// Build the merged schema and print it as JSON without instrumenting.
    Schema {
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
