//! Attention monitor: scores landmark frames and keeps a per-identity history.

use anyhow::{Context, Result};
use attention_monitor::{
    app::MonitorApp,
    config::{Config, EXAMPLE_CONFIG},
    query::QueryService,
};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Landmark frames, one JSON value per line (stdin when omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Identity the scores are recorded under
    #[arg(long, default_value = "local")]
    identity: String,

    /// Print the last N recorded scores when the input ends
    #[arg(long)]
    history: Option<usize>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Load configuration if provided
    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let app = MonitorApp::new(&config, args.identity.as_str())?;
    let stdout = io::stdout();

    match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open input {path}"))?;
            app.run(BufReader::new(file), stdout.lock())?;
        }
        None => {
            app.run(io::stdin().lock(), stdout.lock())?;
        }
    }

    if let Some(n) = args.history {
        let queries = QueryService::with_default_limit(app.store().clone(), config.store.default_query_limit);
        println!("{}", serde_json::to_string_pretty(&queries.scores(app.identity(), Some(n)))?);
    }

    Ok(())
}
