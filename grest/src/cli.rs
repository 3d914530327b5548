//! # CLI
//!
//! This module defines the command-line interface of `grest` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring the
//! listen address and upstream URL are well formed).
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::{net::SocketAddr, path::PathBuf};

#[derive(Parser)]
#[command(name = "grest", version, about = "Serve a REST API as a gRPC service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gRPC server
    ///
    /// Every endpoint declared in the configuration is exposed as a unary gRPC method.
    /// Endpoints that fail to build are reported and skipped.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// grest serve --config bridge.json --upstream https://petstore.example.com/v2
    /// ```
    Serve {
        /// Path to the bridge configuration (.json)
        #[arg(short, long)]
        config: PathBuf,

        /// Address to listen on, overrides the configuration
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Base URL of the REST service, overrides the configuration
        #[arg(long, value_parser = parse_url)]
        upstream: Option<Url>,
    },

    /// Build every endpoint without serving, and report the result
    Check {
        /// Path to the bridge configuration (.json)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn parse_url(value: &str) -> Result<Url, String> {
    Url::parse(value).map_err(|e| format!("Invalid URL '{value}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides_are_parsed() {
        let cli = Cli::try_parse_from([
            "grest",
            "serve",
            "--config",
            "bridge.json",
            "--listen",
            "0.0.0.0:9000",
            "--upstream",
            "http://localhost:8080/api",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve {
                config,
                listen,
                upstream,
            } => {
                assert_eq!(config, PathBuf::from("bridge.json"));
                assert_eq!(listen, Some("0.0.0.0:9000".parse().unwrap()));
                assert_eq!(upstream.unwrap().as_str(), "http://localhost:8080/api");
            }
            Commands::Check { .. } => panic!("Expected the serve command"),
        }
    }

    #[test]
    fn test_invalid_upstream_is_rejected() {
        let result = Cli::try_parse_from([
            "grest",
            "serve",
            "--config",
            "bridge.json",
            "--upstream",
            "not a url",
        ]);
        assert!(result.is_err());
    }
}
