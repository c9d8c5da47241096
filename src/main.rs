// ssl-backbones - Self-supervised vision backbones by name
// Main entry point

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use ssl_backbones::config::{load_config, load_config_from, ZooConfig};
use ssl_backbones::models::{read_state_dict, CheckpointSource};
use ssl_backbones::{ModelKind, ModelResolver};

#[derive(Parser, Debug)]
#[command(name = "ssl-backbones")]
#[command(about = "Resolve pretrained self-supervised vision backbones by name", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.ssl-backbones/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// List supported model names
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load a model and print its descriptor
    Resolve {
        /// Model name (simclr-imagenet, swav-imagenet)
        name: String,

        /// Checkpoint path or URL instead of the default
        #[arg(long)]
        source: Option<String>,
    },
    /// Print the tensors stored in a checkpoint
    Inspect {
        /// Checkpoint path or URL
        source: String,
    },
}

#[derive(Serialize)]
struct ModelListing {
    name: &'static str,
    default_source: String,
    strict: bool,
    output_size: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match args.command {
        Command::List { json } => run_list(&config, json),
        Command::Resolve { name, source } => run_resolve(config, &name, source.as_deref()),
        Command::Inspect { source } => run_inspect(config, &source),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // reqwest/rustls log through the `log` crate
    tracing_log::LogTracer::init().ok();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn run_list(config: &ZooConfig, json: bool) -> Result<()> {
    let listings: Vec<ModelListing> = ModelKind::ALL
        .iter()
        .map(|kind| ModelListing {
            name: kind.name(),
            default_source: kind.default_source(&config.storage_root),
            strict: kind.strict_loading(),
            output_size: kind.output_size(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    for listing in listings {
        println!(
            "{:<16} size={:<5} strict={:<5} {}",
            listing.name, listing.output_size, listing.strict, listing.default_source
        );
    }
    Ok(())
}

fn run_resolve(config: ZooConfig, name: &str, source: Option<&str>) -> Result<()> {
    let descriptor = ModelResolver::from_config(config).resolve_with_source(name, source)?;

    println!("{}", serde_json::to_string_pretty(&descriptor.summary())?);
    Ok(())
}

fn run_inspect(config: ZooConfig, source: &str) -> Result<()> {
    let ctx = ModelResolver::from_config(config).load_context()?;
    let state = read_state_dict(&CheckpointSource::parse(source), &ctx)?;

    let mut names: Vec<&String> = state.keys().collect();
    names.sort();

    for name in names {
        let tensor = &state[name];
        println!("{:<60} {:?} {:?}", name, tensor.dtype(), tensor.dims());
    }
    eprintln!("{} tensors", state.len());
    Ok(())
}
