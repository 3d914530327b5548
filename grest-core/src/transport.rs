//! # HTTP Transport
//!
//! The collaborator that actually talks to the REST service. The bridge only needs
//! [`Transport::submit`]; connection pooling, TLS and timeouts belong to the implementation.
//!
//! [`ReqwestTransport`] is the production implementation. Tests plug in their own.
use crate::request::{HttpResponse, OutboundRequest, RenderError};
use http::{
    HeaderName, HeaderValue,
    header::{ACCEPT, CONTENT_TYPE, InvalidHeaderName, InvalidHeaderValue},
};
use reqwest::Url;
use std::str::FromStr;

/// Content type used for both requests and responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Failed to render request path: '{0}'")]
    Path(#[from] RenderError),
    #[error("Base URL '{0}' cannot carry a path")]
    CannotBeABase(String),
    #[error("Invalid header name '{name}': '{source}'")]
    InvalidHeaderName {
        name: String,
        source: InvalidHeaderName,
    },
    #[error("Invalid value for header '{name}': '{source}'")]
    InvalidHeaderValue {
        name: String,
        source: InvalidHeaderValue,
    },
    #[error("HTTP request failed: '{0}'")]
    Http(#[from] reqwest::Error),
}

/// Sends an assembled request to the REST service.
///
/// Implementations are shared by every in-flight call and must tolerate concurrent use.
#[tonic::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn submit(&self, request: OutboundRequest) -> Result<HttpResponse, SubmitError>;
}

/// A [`Transport`] backed by a `reqwest` client and a base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Builds the full URL: base URL, rendered path template and query string.
    pub fn url_for(&self, request: &OutboundRequest) -> Result<Url, SubmitError> {
        let segments = request.path_segments()?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SubmitError::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        Ok(url)
    }
}

#[tonic::async_trait]
impl Transport for ReqwestTransport {
    async fn submit(&self, request: OutboundRequest) -> Result<HttpResponse, SubmitError> {
        let url = self.url_for(&request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE);

        for (name, value) in request.headers {
            let key = HeaderName::from_str(&name).map_err(|source| {
                SubmitError::InvalidHeaderName {
                    name: name.clone(),
                    source,
                }
            })?;
            let val = HeaderValue::from_str(&value)
                .map_err(|source| SubmitError::InvalidHeaderValue { name, source })?;
            builder = builder.header(key, val);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn test_url_joins_base_path_and_encodes_segments() {
        let mut request = OutboundRequest::new(Method::GET, "/pets/{petId}");
        request.set_path_param("petId", "a b/c".into());

        let url = transport("http://localhost:8080/api/v1/")
            .url_for(&request)
            .unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/pets/a%20b%2Fc");
    }

    #[test]
    fn test_url_carries_repeated_query_params() {
        let mut request = OutboundRequest::new(Method::GET, "/pets");
        request.set_query_param("tag", vec!["a&b".into(), "c".into()]);

        let url = transport("http://localhost:8080").url_for(&request).unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/pets?tag=a%26b&tag=c");
    }

    #[test]
    fn test_url_fails_on_unresolved_variables() {
        let request = OutboundRequest::new(Method::GET, "/pets/{petId}");
        let result = transport("http://localhost:8080").url_for(&request);
        assert!(matches!(result, Err(SubmitError::Path(_))));
    }
}
