//! dbsetup - runs the schema setup tasks against the configured resources.

mod catalog;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dbsetup_core::config::{Dialect, ResourceConfig, ResourceMap};
use dbsetup_core::impls::{DriverConnector, MemoryConnector, MemoryServer};
use dbsetup_core::ports::Connector;
use dbsetup_core::{EngineBuilder, RunReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dbsetup")]
#[command(version, about = "Create or update the database schema")]
pub struct Args {
    /// JSON file mapping resource names to connection settings
    #[arg(short, long, required_unless_present = "memory")]
    pub resources: Option<PathBuf>,

    /// Run against an empty in-memory database of this dialect
    #[arg(long, conflicts_with = "resources")]
    pub memory: Option<Dialect>,

    /// Print the resolved task order and exit
    #[arg(long)]
    pub plan: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbsetup=info")))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the run completed.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let (resources, connector): (ResourceMap, Arc<dyn Connector>) = match (&args.resources, args.memory) {
        (_, Some(dialect)) => {
            info!(%dialect, "using in-memory database");
            let config = ResourceConfig::new(dialect, "aimeos");
            let server = MemoryServer::new(&config.schema_name());
            (ResourceMap::new().with("db", config), Arc::new(MemoryConnector::new(server)))
        }
        (Some(path), None) => {
            let resources = ResourceMap::load(path)?;
            info!(path = %path.display(), resources = resources.len(), "loaded resources");
            (resources, Arc::new(DriverConnector::new()))
        }
        (None, None) => return Err("either --resources or --memory is required".into()),
    };

    let mut engine = EngineBuilder::new(resources, connector)
        .catalog(catalog::shop()?)?
        .build()?;

    if args.plan {
        for (i, name) in engine.plan()?.iter().enumerate() {
            println!("{:>3}. {}", i + 1, name);
        }
        return Ok(true);
    }

    let report = engine.run().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.completed)
}

fn print_report(report: &RunReport) {
    let width = report
        .tasks
        .iter()
        .map(|t| t.name.as_str().len())
        .max()
        .unwrap_or(0);

    for task in &report.tasks {
        println!("{:<width$}  {}", task.name.as_str(), task.status);
        if let Some(message) = &task.message {
            println!("{:<width$}    {}", "", message);
        }
    }

    match (&report.failed_task, &report.error) {
        (Some(task), Some(error)) => eprintln!("\n{}: aborted at {task}: {error}", report.run_id),
        _ => println!("\n{}: completed", report.run_id),
    }
}
