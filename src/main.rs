//! gateway-sync: DNS gateway policy synchronizer
//!
//! This is the main entry point for the synchronizer.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! gateway-sync
//!
//! # Run with custom configuration
//! gateway-sync -c /path/to/config.json
//!
//! # Run with environment overrides
//! GATEWAY_SYNC_LOG_LEVEL=debug gateway-sync
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use gateway_sync::api::HttpGatewayClient;
use gateway_sync::config::{create_default_config, load_config_with_env, Config};
use gateway_sync::reconcile::Reconciler;
use gateway_sync::sources::{load_block_domains, load_override_routes};

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from("/etc/gateway-sync/config.json");
        let mut generate_config = false;
        let mut check_config = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("gateway-sync v{}", gateway_sync::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
        }
    }
}

fn print_help() {
    println!(
        r#"gateway-sync v{}

Synchronizes DNS block/override policy with a Zero Trust gateway.
Previously generated rules and lists are always removed first; run with
empty sources to clear the gateway's block/redirect settings.

USAGE:
    gateway-sync [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: /etc/gateway-sync/config.json]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    GATEWAY_SYNC_API_TOKEN          Override API token
    GATEWAY_SYNC_ACCOUNT_ID         Override account id
    GATEWAY_SYNC_BLOCK_SOURCES      Override block sources (comma-separated)
    GATEWAY_SYNC_REDIRECT_SOURCES   Override redirect sources (ip=src|src,ip=src)
    GATEWAY_SYNC_LOG_LEVEL          Override log level (trace, debug, info, warn, error)
"#,
        gateway_sync::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("rustls=warn".parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle generate-config
    if args.generate_config {
        create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    // Load configuration
    let config = load_config_with_env(&args.config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {:?}: {}",
            args.config_path,
            e
        )
    })?;

    // Handle check-config
    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config);

    info!("gateway-sync v{}", gateway_sync::VERSION);
    info!("Configuration loaded from {:?}", args.config_path);

    // Load desired policy
    let block_domains = load_block_domains(&config.sources.block).await?;
    let override_routes = load_override_routes(&config.sources.redirect).await?;
    if block_domains.is_empty() && override_routes.is_empty() {
        warn!("No domain sources configured; existing engine rules and lists will be cleared");
    }

    // Run reconciliation
    let client = HttpGatewayClient::new(&config.api)?;
    let reconciler = Reconciler::new(Arc::new(client));

    match reconciler.run(&block_domains, &override_routes).await {
        Ok(report) => {
            info!("Synchronization complete: {}", report);
            Ok(())
        }
        Err(e) => {
            error!("Synchronization failed: {}", e);
            Err(e.into())
        }
    }
}
