//! tgw-echo: echo server behind a gateway that injects an extra header.
//!
//! ```text
//!  gateway ──"GET / HTTP/1.1\r\nHost: ...\r\n\r\n" + payload──▶ listener
//!                                                                  │
//!                                                     resolver (strip header)
//!                                                                  │
//!                                                     echo session (payload)
//! ```
//!
//! Usage: `tgw-echo 8000 [--config tgw.toml] [--deadline-ms 800]`

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use tgw_resolver::config::{
    load_config, validate_config, ConfigError, HeaderModeSettings, ServerConfig, ValidationLevel,
};
use tgw_resolver::echo::EchoServer;
use tgw_resolver::lifecycle::{signals::shutdown_signal, Shutdown};
use tgw_resolver::net::listener::Listener;
use tgw_resolver::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "tgw-echo")]
#[command(about = "Echo server that strips a gateway-injected extra header", long_about = None)]
struct Cli {
    /// Port to listen on; replaces the port of listener.bind_address
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Abandon connections whose header is not resolved within this many ms
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Expect the fixed header a gateway sends for this domain
    #[arg(long)]
    fixed_host: Option<String>,

    /// Port advertised in the fixed header (defaults to the listen port)
    #[arg(long, requires = "fixed_host")]
    fixed_port: Option<u16>,

    /// How the fixed header is checked: skip, tail-only or full
    #[arg(long, default_value = "full", value_parser = parse_validation)]
    validation: ValidationLevel,
}

fn parse_validation(value: &str) -> Result<ValidationLevel, String> {
    match value {
        "skip" => Ok(ValidationLevel::Skip),
        "tail-only" => Ok(ValidationLevel::TailOnly),
        "full" => Ok(ValidationLevel::Full),
        other => Err(format!("unknown validation level `{other}`")),
    }
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    fn apply(&self, config: &mut ServerConfig) -> Result<(), Box<dyn Error>> {
        let mut bind: SocketAddr = config.listener.bind_address.parse()?;
        if let Some(port) = self.port {
            bind.set_port(port);
            config.listener.bind_address = bind.to_string();
        }

        if let Some(deadline_ms) = self.deadline_ms {
            config.resolver.deadline_ms = Some(deadline_ms);
        }

        if let Some(host) = &self.fixed_host {
            config.resolver.mode = HeaderModeSettings::FixedLiteral {
                literal: None,
                host: Some(host.clone()),
                port: Some(self.fixed_port.unwrap_or(bind.port())),
                validation: self.validation,
            };
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability)?;

    tracing::info!("tgw-echo v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        capacity = config.resolver.capacity,
        legacy_compat = ?config.resolver.legacy_compat,
        mode = ?config.resolver.mode,
        deadline_ms = ?config.resolver.deadline_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = EchoServer::new(&config)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
