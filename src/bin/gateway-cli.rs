use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use api_gateway::config::load_config;
use api_gateway::http::request::normalize_path;
use api_gateway::proxy::compose_url;
use api_gateway::routing::RouteTable;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Offline tooling for API gateway configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print its route table
    Check { config: PathBuf },
    /// Show where a request path would be forwarded
    Resolve {
        config: PathBuf,
        path: String,
        /// Raw query string, without the leading '?'
        #[arg(short, long)]
        query: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Check { config } => {
            let config = load_config(&config)?;
            let table = RouteTable::from_config(&config.routes)?;
            println!("Configuration OK: {} route(s)", table.len());
            for route in table.routes() {
                println!(
                    "  {:<20} {:<40} strip={:<5} -> {}",
                    route.id(),
                    route.path_prefixes().join(", "),
                    route.strip_prefix(),
                    route.target().base_url()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve {
            config,
            path,
            query,
        } => {
            let config = load_config(&config)?;
            let table = RouteTable::from_config(&config.routes)?;
            let path = normalize_path(&path);
            match table.find_best_match(&path) {
                Some(matched) => {
                    let url = compose_url(
                        matched.route.target().base_url(),
                        &matched.downstream_path(&path),
                        query.as_deref(),
                    );
                    println!("route:          {}", matched.route.id());
                    println!("matched prefix: {}", matched.matched_prefix);
                    println!("downstream url: {url}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("GATEWAY.ROUTE_NOT_FOUND: no route matches {path}");
                    Ok(ExitCode::from(2))
                }
            }
        }
    }
}
