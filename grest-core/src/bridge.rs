//! # Bridge
//!
//! Builds the [`OperationAdapter`] of every declared endpoint and indexes them by gRPC path
//! (`/package.Service/Method`).
//!
//! Endpoints are independent: one that fails to build is reported in the returned error list
//! and skipped, the others are still served.
use crate::{
    adapter::{BuildError, OperationAdapter, OperationBinding},
    parameter::ParameterMetadata,
    schema::{LookupError, Schema},
    transport::Transport,
};
use http::Method;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

/// Declaration of one REST operation exposed as a gRPC method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Fully qualified gRPC service name (e.g. `petstore.PetService`).
    pub service: String,
    /// gRPC method name (e.g. `GetPet`).
    pub method: String,
    /// HTTP method of the REST operation (e.g. `GET`).
    pub http_method: String,
    /// Path template of the REST operation (e.g. `/pets/{petId}`).
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
}

impl EndpointSpec {
    /// The gRPC request path this endpoint answers on.
    pub fn grpc_path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointErrorKind {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("Streaming methods are not supported")]
    Streaming,
    #[error("Invalid HTTP method '{0}'")]
    InvalidHttpMethod(String),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// An endpoint that could not be built.
#[derive(Debug, thiserror::Error)]
#[error("Endpoint '{endpoint}': {kind}")]
pub struct EndpointError {
    pub endpoint: String,
    pub kind: EndpointErrorKind,
}

/// The set of adapters served by one process.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    routes: HashMap<String, OperationAdapter>,
}

impl Bridge {
    /// Builds every endpoint against `schema`, sharing `transport` among them.
    ///
    /// # Returns
    ///
    /// The bridge holding every endpoint that built, and the errors of those that did not.
    pub fn build(
        schema: &Schema,
        endpoints: impl IntoIterator<Item = EndpointSpec>,
        transport: Arc<dyn Transport>,
    ) -> (Self, Vec<EndpointError>) {
        let mut routes = HashMap::new();
        let mut errors = Vec::new();

        for endpoint in endpoints {
            let path = endpoint.grpc_path();

            match build_endpoint(schema, &endpoint, Arc::clone(&transport)) {
                Ok(adapter) => {
                    info!(
                        grpc.path = %path,
                        http.method = %endpoint.http_method,
                        http.route = %endpoint.path,
                        "endpoint ready"
                    );
                    routes.insert(path, adapter);
                }
                Err(kind) => {
                    warn!(grpc.path = %path, error = %kind, "skipping endpoint");
                    errors.push(EndpointError {
                        endpoint: path,
                        kind,
                    });
                }
            }
        }

        (Self { routes }, errors)
    }

    /// Looks up the adapter serving a gRPC request path.
    pub fn route(&self, grpc_path: &str) -> Option<&OperationAdapter> {
        self.routes.get(grpc_path)
    }

    /// Every served gRPC path, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<_> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn build_endpoint(
    schema: &Schema,
    endpoint: &EndpointSpec,
    transport: Arc<dyn Transport>,
) -> Result<OperationAdapter, EndpointErrorKind> {
    let method = schema.method(&endpoint.service, &endpoint.method)?;

    if method.is_client_streaming() || method.is_server_streaming() {
        return Err(EndpointErrorKind::Streaming);
    }

    let http_method = Method::from_bytes(endpoint.http_method.to_ascii_uppercase().as_bytes())
        .map_err(|_| EndpointErrorKind::InvalidHttpMethod(endpoint.http_method.clone()))?;

    let binding =
        OperationBinding::for_method(&method, http_method, &endpoint.path, &endpoint.parameters)?;

    Ok(OperationAdapter::new(
        method.full_name(),
        binding,
        transport,
    ))
}
