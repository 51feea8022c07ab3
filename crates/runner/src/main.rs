use dealroom_clock::SystemClock;
use dealroom_runner::{RecordingStatsRecorder, bootstrap, load_config, load_default_config};
use dealroom_store::InMemoryDealStore;
use log::info;
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"Dealroom - deal escrow and handover service

USAGE:
    dealroom [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    DEALROOM_CONFIG     Configuration file, used when --config is absent
    RUST_LOG            Log level filter
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = std::env::var("DEALROOM_CONFIG").ok();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => load_default_config()?,
    };

    let clock = Arc::new(SystemClock::new());
    let store = Arc::new(InMemoryDealStore::new());
    let stats = Arc::new(RecordingStatsRecorder::new(clock.clone()));
    let dealroom = bootstrap(&config, store, stats.clone(), clock);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    let report = dealroom.shutdown().await;
    info!(
        "Dealroom stopped flushed={} failed={} stat_rows={}",
        report.flushed,
        report.failed,
        stats.rows().len()
    );
    Ok(())
}
