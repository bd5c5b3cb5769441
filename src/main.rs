//! Command-line front end for the resilient API client.
//!
//! # Architecture Overview
//!
//! ```text
//!     CLI args + config file
//!            │
//!            ▼
//!     ┌──────────────┐    ┌────────────────────────────────────────┐
//!     │ ClientConfig │───▶│            ResilientClient             │
//!     └──────────────┘    │  ┌──────────┐  ┌─────────┐  ┌───────┐  │
//!                         │  │ circuit  │─▶│ retries │─▶│timeout│──┼──▶ Server
//!                         │  │ breaker  │◀─│ backoff │◀─│       │◀─┼───
//!                         │  └──────────┘  └─────────┘  └───────┘  │
//!                         └────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use resilient_client::config::{load_config, ClientConfig};
use resilient_client::http::request::header_map;
use resilient_client::observability::logging::init_logging;
use resilient_client::{ApiResponse, ResilientClient};

#[derive(Parser)]
#[command(name = "resilient-client")]
#[command(about = "Issue HTTP API requests with retries and a circuit breaker", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured base URL.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Authentication token sent in the Authorization header.
    #[arg(short, long)]
    token: Option<String>,

    #[arg(long, default_value = "Bearer")]
    token_type: String,

    /// Issue the request this many times (observe the breaker trip).
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Print the circuit breaker state after the requests.
    #[arg(long)]
    show_state: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(RequestArgs),
    /// Send a POST request
    Post(RequestArgs),
    /// Send a PUT request
    Put(RequestArgs),
    /// Send a DELETE request
    Delete(RequestArgs),
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Endpoint relative to the base URL.
    endpoint: String,

    /// JSON request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Extra header as `name:value`; may be repeated.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }

    init_logging(&config.observability);

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let client = ResilientClient::new(config)?;
    if let Some(token) = &cli.token {
        client.set_auth_token_with_type(token, &cli.token_type)?;
    }

    let (method, args) = match &cli.command {
        Commands::Get(args) => ("GET", args),
        Commands::Post(args) => ("POST", args),
        Commands::Put(args) => ("PUT", args),
        Commands::Delete(args) => ("DELETE", args),
    };

    let data: Option<Value> = args.data.as_deref().map(serde_json::from_str::<Value>).transpose()?;
    let pairs = args
        .headers
        .iter()
        .map(|h| {
            h.split_once(':')
                .map(|(name, value)| (name.trim(), value.trim()))
                .ok_or_else(|| format!("header '{}' is not in name:value form", h))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let headers = header_map(pairs)?;

    let mut failed = false;
    for _ in 0..cli.repeat.max(1) {
        let headers = Some(headers.clone());
        let call = async {
            match method {
                "GET" => client.get(&args.endpoint, headers).await,
                "POST" => client.post(&args.endpoint, data.as_ref(), headers).await,
                "PUT" => client.put(&args.endpoint, data.as_ref(), headers).await,
                _ => client.delete(&args.endpoint, headers).await,
            }
        };

        let result = tokio::select! {
            result = call => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, cancelling request");
                return Ok(ExitCode::from(130));
            }
        };

        match result {
            Ok(response) => print_response(&response)?,
            Err(e) => {
                failed = true;
                eprintln!("Error: {}", e);
                if let Some(status) = e.status() {
                    eprintln!("Status: {}", status);
                }
            }
        }
    }

    if cli.show_state {
        let state = client.get_resilience_state();
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn print_response(response: &ApiResponse) -> Result<(), Box<dyn std::error::Error>> {
    println!("Status: {}", response.status);
    match response.json_value() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}
