//! fhird
//!
//! An experimental HL7 FHIR R4 server profiled on US Core.

use clap::{Parser, Subcommand};
use fhird_rest::routing::{ROUTES, format_route_table};
use fhird_rest::{ServerConfig, create_app, init_logging, serve};
use tracing::info;

/// Command line interface.
#[derive(Debug, Parser)]
#[command(name = "fhird", version, about = "Experimental HL7 FHIR R4 server")]
struct Cli {
    /// Log at debug level, overriding --log-level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: ServerConfig,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the server (default).
    Start,
    /// Print the route table.
    Routes {
        /// Emit the table as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

/// Starts the server with the US Core registry.
async fn start(config: ServerConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        base_url = %config.base_url,
        timeout_secs = config.request_timeout,
        "Starting fhird"
    );

    let app = create_app(config.clone())?;
    println!("{}", format_route_table(ROUTES));
    serve(app, &config).await
}

fn print_routes(json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ROUTES)?);
    } else {
        print!("{}", format_route_table(ROUTES));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli.config;
    if cli.verbose {
        config.log_level = "debug".to_string();
    }

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => start(config).await,
        Command::Routes { json } => print_routes(json),
    }
}
