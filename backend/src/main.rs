//! Ingestgate CLI - Parse, validate and gate record file uploads
//!
//! ```bash
//! ingestgate serve                      # Start HTTP server (port 3000)
//! ingestgate process people.txt -v      # Parse + validate a local file
//! ingestgate check-ip 203.0.113.7       # Run the access decision for an address
//! ingestgate config                     # Show effective configuration
//! ```

use clap::{Parser, Subcommand};
use ingestgate::{
    access::normalize_client_ip, process_file, AccessDecision, Config, ProcessOptions,
    ServerError,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ingestgate")]
#[command(about = "Parse, validate and gate pipe-delimited record files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides INGESTGATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Parse a local record file and output JSON
    Process {
        /// Input file
        input: PathBuf,

        /// Apply field validation
        #[arg(short, long)]
        validate: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the access decision for a client address
    CheckIp {
        /// Connection address
        address: String,

        /// X-Forwarded-For header value
        #[arg(long)]
        forwarded_for: Option<String>,

        /// X-Real-IP header value
        #[arg(long)]
        real_ip: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Process {
            input,
            validate,
            output,
        } => cmd_process(&input, validate, output.as_deref()),

        Commands::CheckIp {
            address,
            forwarded_for,
            real_ip,
        } => cmd_check_ip(&address, forwarded_for.as_deref(), real_ip.as_deref()).await,

        Commands::Config => cmd_config(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_serve(port: Option<u16>) -> Result<bool, ServerError> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }

    ingestgate::server::start_server(config).await?;
    Ok(true)
}

fn cmd_process(input: &Path, validate: bool, output: Option<&Path>) -> Result<bool, ServerError> {
    eprintln!("📄 Processing: {}", input.display());

    let result = process_file(input, ProcessOptions { validate })?;

    eprintln!("   Lines:   {}", result.lines_read);
    eprintln!("   Valid:   {}", result.valid_records.len());
    eprintln!("   Errors:  {}", result.errors.len());
    for error in &result.errors {
        eprintln!("   ⚠️  {}", error);
    }

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, output)?;

    Ok(result.is_clean())
}

async fn cmd_check_ip(
    address: &str,
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
) -> Result<bool, ServerError> {
    let config = Config::from_env()?;
    let client_ip = normalize_client_ip(forwarded_for, real_ip, address)?;
    eprintln!("🌐 Client address: {}", client_ip);

    let cache = config.access_cache()?;
    let decision = cache.decide(client_ip).await;

    match &decision {
        AccessDecision::Allow => eprintln!("✅ Allowed"),
        AccessDecision::Deny(reason) => eprintln!("⛔ {}", reason),
    }

    let json = json!({ "address": client_ip.to_string(), "decision": decision });
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(decision.is_allowed())
}

fn cmd_config() -> Result<bool, ServerError> {
    let config = Config::from_env()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(true)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), ServerError> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Saved to: {}", p.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
