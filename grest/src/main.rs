//! # Grest CLI Entry Point
//!
//! The main executable for the Grest bridge. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the
//!    tracing subscriber (`RUST_LOG` controls verbosity, `info` by default).
//! 2. **Assembly**: Loads the configuration and schema, and builds a [`Bridge`] on top of a
//!    `reqwest` transport.
//! 3. **Serving**: Exposes the bridge as an HTTP/2 gRPC server until Ctrl-C is received.
//! 4. **Presentation**: Formats and prints routes and errors to standard output/error.

mod cli;
mod config;
mod formatter;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::BridgeConfig;
use formatter::{EndpointErrors, FormattedString, RouteList};
use grest_core::{
    bridge::{Bridge, EndpointError},
    grpc::server::BridgeService,
    transport::ReqwestTransport,
};
use hyper::server::conn::http2;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    service::TowerToHyperService,
};
use reqwest::Url;
use std::{net::SocketAddr, path::Path, process, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let result = match args.command {
        Commands::Serve {
            config,
            listen,
            upstream,
        } => serve(&config, listen, upstream).await,
        Commands::Check { config } => check(&config),
    };

    if let Err(err) = result {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

/// Builds the bridge described by a configuration, with an optional upstream override.
fn assemble(config: &BridgeConfig, upstream: Option<Url>) -> Result<(Bridge, Vec<EndpointError>)> {
    let schema = config.load_schema()?;

    let base_url = match upstream {
        Some(url) => url,
        None => {
            let raw = config
                .upstream
                .as_deref()
                .context("No upstream URL: set 'upstream' in the configuration or pass --upstream")?;
            Url::parse(raw).with_context(|| format!("Invalid upstream URL '{raw}'"))?
        }
    };

    let mut client = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
        client = client.timeout(Duration::from_secs(secs));
    }
    let client = client.build().context("Failed to build HTTP client")?;

    let transport = Arc::new(ReqwestTransport::new(client, base_url));
    Ok(Bridge::build(&schema, config.endpoints.clone(), transport))
}

fn check(path: &Path) -> Result<()> {
    let config = BridgeConfig::load(path)?;
    let (bridge, errors) = assemble(&config, None)?;

    println!("{}", FormattedString::from(RouteList(&bridge)));

    if !errors.is_empty() {
        eprintln!("{}", FormattedString::from(EndpointErrors(&errors)));
        process::exit(1);
    }

    Ok(())
}

async fn serve(path: &Path, listen: Option<SocketAddr>, upstream: Option<Url>) -> Result<()> {
    let config = BridgeConfig::load(path)?;
    let (bridge, errors) = assemble(&config, upstream)?;

    if !errors.is_empty() {
        eprintln!("{}", FormattedString::from(EndpointErrors(&errors)));
    }
    println!("{}", FormattedString::from(RouteList(&bridge)));

    let addr = listen.unwrap_or(config.listen);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind '{addr}'"))?;
    info!(%addr, endpoints = bridge.len(), "listening");

    let service = BridgeService::new(bridge);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "failed to accept connection");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        };

        let io = TokioIo::new(stream);
        let service = TowerToHyperService::new(service.clone());

        tokio::spawn(async move {
            if let Err(err) = http2::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                error!(%peer, error = %err, "connection failed");
            }
        });
    }
}
