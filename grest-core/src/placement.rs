//! # Parameter Placement
//!
//! Writes the string values of a parameter into the slot of the [`OutboundRequest`] its
//! declared location points at.
//!
//! * `query` / `header`: any number of values, all of them sent.
//! * `path` / `body`: a single value. Extra values are dropped with a warning.
//! * `formData` / `cookie` and unknown locations: rejected when the endpoint is built.
use crate::{
    parameter::{ParameterLocation, ParameterMetadata},
    request::OutboundRequest,
};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("formData parameters are not supported (parameter '{0}')")]
    FormData(String),
    #[error("cookie parameters are not supported (parameter '{0}')")]
    Cookie(String),
    #[error("Unknown parameter location '{location}' for parameter '{name}'")]
    UnknownLocation { name: String, location: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("Parameter '{0}' requires a value but none was supplied")]
    MissingValue(String),
}

/// Where a parameter's values go, resolved once per endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Query(String),
    Header(String),
    Path(String),
    Body(String),
}

/// Resolves the placement for a declared parameter.
pub fn placer_for(param: &ParameterMetadata) -> Result<Placement, ConfigurationError> {
    let name = param.name.clone();
    match &param.location {
        ParameterLocation::Query => Ok(Placement::Query(name)),
        ParameterLocation::Header => Ok(Placement::Header(name)),
        // Some Swagger files declare "path" parameters that actually live in the query string,
        // those are sent as declared.
        ParameterLocation::Path => Ok(Placement::Path(name)),
        // Swagger 2.0 only, OpenAPI 3 declares the body outside of the parameter list.
        ParameterLocation::Body => Ok(Placement::Body(name)),
        ParameterLocation::FormData => Err(ConfigurationError::FormData(name)),
        ParameterLocation::Cookie => Err(ConfigurationError::Cookie(name)),
        ParameterLocation::Other(location) => Err(ConfigurationError::UnknownLocation {
            name,
            location: location.clone(),
        }),
    }
}

impl Placement {
    pub fn name(&self) -> &str {
        match self {
            Placement::Query(name)
            | Placement::Header(name)
            | Placement::Path(name)
            | Placement::Body(name) => name,
        }
    }

    /// Writes `values` into `request`.
    pub fn place(
        &self,
        values: Vec<String>,
        request: &mut OutboundRequest,
    ) -> Result<(), PlacementError> {
        match self {
            Placement::Query(name) => request.set_query_param(name, values),
            Placement::Header(name) => request.set_header_param(name, values),
            Placement::Path(name) => request.set_path_param(name, single_value(name, values)?),
            // The value is already serialized, it is sent verbatim.
            Placement::Body(name) => request.set_body(single_value(name, values)?),
        }
        Ok(())
    }
}

fn single_value(name: &str, values: Vec<String>) -> Result<String, PlacementError> {
    if values.len() > 1 {
        warn!(
            parameter = name,
            count = values.len(),
            "parameter had multiple values, only the first one is sent"
        );
    }
    values
        .into_iter()
        .next()
        .ok_or_else(|| PlacementError::MissingValue(name.to_string()))
}
