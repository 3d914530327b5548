//! # Configuration
//!
//! The bridge is configured by a single JSON file: where to listen, which REST service to call,
//! which schema to load and the list of endpoints to expose.
//!
//! ```json
//! {
//!   "listen": "127.0.0.1:50051",
//!   "upstream": "https://petstore.example.com/v2",
//!   "schema": "petstore.proto",
//!   "endpoints": [
//!     {
//!       "service": "petstore.PetService",
//!       "method": "GetPet",
//!       "http_method": "GET",
//!       "path": "/pets/{petId}",
//!       "parameters": [{ "name": "petId", "in": "path" }]
//!     }
//!   ]
//! }
//! ```
use anyhow::{Context, Result};
use grest_core::{
    bridge::EndpointSpec,
    schema::{ImportPolicy, Schema},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Base URL of the REST service. Endpoint paths are appended to it.
    pub upstream: Option<String>,
    /// `.proto` source, or a binary `FileDescriptorSet` (`.bin`, `.pb`).
    /// Relative paths are resolved against the directory of the configuration file.
    pub schema: PathBuf,
    /// Lets `.proto` imports be read from disk, relative to the schema's directory.
    #[serde(default = "default_true")]
    pub allow_filesystem_imports: bool,
    /// Timeout applied to every upstream request, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub endpoints: Vec<EndpointSpec>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 50051))
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    /// Reads and parses the configuration file, resolving the schema path against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read configuration file '{}'", path.display()))?;
        let mut config: BridgeConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration file '{}'", path.display()))?;

        if config.schema.is_relative() {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            config.schema = base_dir.join(&config.schema);
        }

        Ok(config)
    }

    /// Compiles or decodes the configured schema.
    pub fn load_schema(&self) -> Result<Schema> {
        let is_descriptor_set = matches!(
            self.schema.extension().and_then(|ext| ext.to_str()),
            Some("bin" | "pb")
        );

        let schema = if is_descriptor_set {
            let bytes = fs::read(&self.schema).with_context(|| {
                format!("Could not read descriptor set '{}'", self.schema.display())
            })?;
            Schema::from_descriptor_set(&bytes)?
        } else {
            Schema::from_file(&self.schema, self.import_policy())?
        };

        Ok(schema)
    }

    fn import_policy(&self) -> ImportPolicy {
        if !self.allow_filesystem_imports {
            return ImportPolicy::Sandboxed;
        }

        let root = self
            .schema
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ImportPolicy::Filesystem { root }
    }
}
