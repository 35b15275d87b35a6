//! keyprint - typing-biometrics web service and offline predictor.

mod config;
mod predict;
mod server;
mod store;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use keyprint::LoadPolicy;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Typing-biometrics web service and offline predictor.
#[derive(Parser, Debug)]
#[command(name = "keyprint")]
#[command(about = "Identify typists from keystroke timing")]
struct Cli {
    /// Config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the capture UI and the prediction API
    Serve(ServeArgs),
    /// Predict the typist of the first rows of a dataset
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address (e.g. 127.0.0.1:3000, :8080)
    #[arg(long)]
    addr: Option<String>,

    /// Model file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory holding the typing datasets
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Static files directory for the web UI
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// keep_on_failure or release_first
    #[arg(long, value_parser = config::parse_load_policy)]
    load_policy: Option<LoadPolicy>,
}

impl ServeArgs {
    fn apply(self, cfg: &mut Config) {
        if let Some(addr) = self.addr {
            cfg.addr = addr;
        }
        if let Some(model) = self.model {
            cfg.model_path = model;
        }
        if let Some(dir) = self.data_dir {
            cfg.data_dir = dir;
        }
        if let Some(dir) = self.static_dir {
            cfg.static_dir = Some(dir);
        }
        if let Some(policy) = self.load_policy {
            cfg.load_policy = policy;
        }
    }
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Model file (defaults to the configured model)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Dataset CSV (defaults to the configured base dataset)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Number of leading rows forming the sample
    #[arg(long, default_value_t = 3)]
    rows: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut cfg = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut cfg);
            server::serve(&cfg).await
        }
        Commands::Predict(args) => {
            let model = args.model.unwrap_or_else(|| cfg.model_path.clone());
            let csv = args.csv.unwrap_or_else(|| cfg.base_csv_path());
            let p = predict::run(&model, &csv, args.rows)?;

            println!("Predicted class index: {}", p.index);
            println!("Class -> participant mapping: {:?}", p.class_labels);
            match p.participant() {
                Some(who) => println!("That means participant: {who}"),
                None => println!("Predicted index is out of range for known participants."),
            }
            Ok(())
        }
    }
}
