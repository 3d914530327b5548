//! # Parameter Metadata
//!
//! Per-endpoint description of where each input field travels in the HTTP request.
//!
//! The metadata is produced by whatever translated the REST schema into Protobuf, and it is
//! read as-is: the names follow the Swagger parameter object (`name`, `in`, `enum`).
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a parameter lives in the HTTP request.
///
/// Unknown location strings are kept verbatim in [`ParameterLocation::Other`] so that the
/// error can be reported when the endpoint is built rather than when the metadata is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Body,
    FormData,
    Cookie,
    Other(String),
}

impl From<&str> for ParameterLocation {
    fn from(value: &str) -> Self {
        match value {
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "path" => ParameterLocation::Path,
            "body" => ParameterLocation::Body,
            "formData" => ParameterLocation::FormData,
            "cookie" => ParameterLocation::Cookie,
            other => ParameterLocation::Other(other.to_string()),
        }
    }
}

impl From<String> for ParameterLocation {
    fn from(value: String) -> Self {
        ParameterLocation::from(value.as_str())
    }
}

impl From<ParameterLocation> for String {
    fn from(value: ParameterLocation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Path => "path",
            ParameterLocation::Body => "body",
            ParameterLocation::FormData => "formData",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Other(other) => other,
        };
        f.write_str(name)
    }
}

/// A single declared parameter of a REST operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    /// The parameter name as it appears in the HTTP request.
    pub name: String,
    /// Where the parameter is placed.
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Permitted values of an enum parameter, index-aligned with the ordinals of the
    /// Protobuf enum the field was translated to.
    ///
    /// Kept as raw JSON because the REST schema does not restrict enum members to strings.
    #[serde(
        default,
        rename = "enum",
        alias = "enumValues",
        skip_serializing_if = "Option::is_none"
    )]
    pub enum_values: Option<Vec<serde_json::Value>>,
}

impl ParameterMetadata {
    pub fn new(name: impl Into<String>, location: impl Into<ParameterLocation>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            enum_values: None,
        }
    }

    /// Attaches a list of string enum values.
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(
            values
                .into_iter()
                .map(|v| serde_json::Value::String(v.into()))
                .collect(),
        );
        self
    }

    /// Name of the Protobuf field this parameter binds to.
    ///
    /// Protobuf field names cannot contain hyphens, so they are replaced by underscores.
    pub fn field_name(&self) -> String {
        self.name.replace('-', "_")
    }
}
