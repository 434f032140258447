use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

use aquamon_service::analysis::cleaning::clean_dataset;
use aquamon_service::config::{self, ServiceConfig, DEFAULT_CONFIG_PATH};
use aquamon_service::ingest::csv_source;
use aquamon_service::logging::{self, DataSource, LogLevel};
use aquamon_service::{server, store};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("ingest") => cmd_ingest(&args),
        Some("serve") => cmd_serve(&args),
        Some("help") | Some("--help") => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Usage: aquamon_service <command> [--config <path>]");
    println!();
    println!("Commands:");
    println!("  ingest   Load CSV exports, clean them, and replace the store contents");
    println!("  serve    Serve the dashboard API");
    println!();
    println!("Config file defaults to {} (all settings optional).", DEFAULT_CONFIG_PATH);
}

/// Shared startup: .env, config file, logger.
fn setup(args: &[String]) -> Result<ServiceConfig, Box<dyn Error>> {
    dotenv::dotenv().ok();

    let explicit = config_path_arg(args);
    let config = config::load_config(
        explicit.unwrap_or(DEFAULT_CONFIG_PATH),
        explicit.is_some(),
    )?;

    logging::init_logger(
        LogLevel::from_config(&config.logging.level),
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );

    Ok(config)
}

fn config_path_arg(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn connect(config: &ServiceConfig) -> Result<postgres::Client, Box<dyn Error>> {
    let url = config.database_url()?;
    let client = postgres::Client::connect(&url, postgres::NoTls)?;
    Ok(client)
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

fn cmd_ingest(args: &[String]) -> Result<(), Box<dyn Error>> {
    let config = setup(args)?;
    let mut client = connect(&config)?;
    store::init_schema(&mut client)?;

    let source_dir = Path::new(&config.ingest.source_dir);
    let (rows, files_loaded) = csv_source::load_source_dir(source_dir)?;

    let (cleaned, report) = clean_dataset(&rows);
    logging::log_cleaning_summary(files_loaded, &report);

    println!("=== Cleaning Report ===");
    println!("Total rows originally:          {}", report.rows_total);
    println!("Rows removed as outliers:       {}", report.rows_removed);
    println!("Rows remaining after cleaning:  {}", report.rows_remaining);
    if report.rows_dropped_null > 0 {
        println!("Rows dropped for missing data:  {}", report.rows_dropped_null);
    }
    if report.cells_coerced > 0 {
        println!("Cells that failed coercion:     {}", report.cells_coerced);
    }

    let inserted = store::replace_all(&mut client, &cleaned)?;
    logging::info(
        DataSource::Database,
        None,
        &format!("store replaced with {} observations", inserted),
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

fn cmd_serve(args: &[String]) -> Result<(), Box<dyn Error>> {
    let config = setup(args)?;
    let mut client = connect(&config)?;
    // Serving an empty store is fine; the schema just has to exist.
    store::init_schema(&mut client)?;

    server::serve(&config.server.bind, client)?;
    Ok(())
}
