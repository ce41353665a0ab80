use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "waymark")]
#[command(version)]
#[command(about = "Validate and inspect waymark workflow diagrams")]
#[command(long_about = "
waymark parses state diagram workflow descriptions and reports on the
resulting workflow definition before it is imported into an engine.

Example usage:
  waymark validate visit.mermaid         # Check a diagram parses cleanly
  waymark inspect visit.mermaid          # Show nodes, transitions, starts
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that a diagram file parses into a valid workflow definition
    #[command(long_about = "
Parses the diagram and runs full structural validation: unique node ids,
no dangling references, a start point, and unambiguous auto-advance edges.

Exit codes:
  0 - Diagram is valid
  2 - Parse or validation errors found

Example:
  waymark validate visit.mermaid
")]
    Validate {
        /// Path to the diagram file
        file: PathBuf,

        /// Workflow ID to assign (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,

        /// Workflow name to assign (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the nodes, transitions, and start points of a diagram
    #[command(long_about = "
Parses the diagram and prints the resulting definition: every node with its
kind and any attached action descriptor, every transition with its choice
label, and the declared start points in order.

Example:
  waymark inspect visit.mermaid
")]
    Inspect {
        /// Path to the diagram file
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
