use std::path::Path;
use std::process;

mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use waymark::{DiagramParser, NodeKind, WorkflowDefinition, WorkflowId};

const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_INVALID: i32 = 2;

fn main() {
    let cli = Cli::parse_args();

    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            EXIT_ERROR
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Validate { file, id, name } => validate(&file, id, name),
        Commands::Inspect { file } => inspect(&file),
    }
}

fn parse_file(
    file: &Path,
    id: Option<String>,
    name: Option<String>,
) -> Result<Result<WorkflowDefinition, waymark::ParseError>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read '{}'", file.display()))?;
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workflow")
        .to_string();
    let id = WorkflowId::new(id.unwrap_or_else(|| stem.clone()));
    let name = name.unwrap_or(stem);
    Ok(DiagramParser::new().parse(&content, id, name))
}

fn validate(file: &Path, id: Option<String>, name: Option<String>) -> Result<i32> {
    match parse_file(file, id, name)? {
        Ok(definition) => {
            println!(
                "OK: {} ({} nodes, {} transitions, {} start points)",
                definition.name(),
                definition.nodes().len(),
                definition.transitions().len(),
                definition.start_points().len()
            );
            Ok(EXIT_SUCCESS)
        }
        Err(error) => {
            eprintln!("invalid: {error}");
            Ok(EXIT_INVALID)
        }
    }
}

fn inspect(file: &Path) -> Result<i32> {
    let definition = match parse_file(file, None, None)? {
        Ok(definition) => definition,
        Err(error) => {
            eprintln!("invalid: {error}");
            return Ok(EXIT_INVALID);
        }
    };

    println!("workflow: {} ({})", definition.name(), definition.id());

    println!("nodes:");
    for node in definition.nodes() {
        let kind = match node.kind {
            NodeKind::Decision => " <<choice>>",
            NodeKind::Task => "",
        };
        let action = node
            .metadata
            .as_ref()
            .map(|d| format!(" [action: {}]", d.name))
            .unwrap_or_default();
        println!("  {} \"{}\"{}{}", node.id, node.label, kind, action);
    }

    println!("transitions:");
    for transition in definition.transitions() {
        match &transition.condition {
            Some(label) => println!("  {} --> {}: {}", transition.from, transition.to, label),
            None => println!("  {} --> {}", transition.from, transition.to),
        }
    }

    println!("start points:");
    for start in definition.start_points() {
        println!("  {start}");
    }

    Ok(EXIT_SUCCESS)
}
