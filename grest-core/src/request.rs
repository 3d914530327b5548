//! # Outbound HTTP Request
//!
//! The request assembled for a single call, before it is handed to a
//! [`crate::transport::Transport`]. Parameter writers fill its slots, the transport renders it.
use bytes::Bytes;
use http::{Method, StatusCode};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Path variable '{0}' has no value")]
    UnresolvedPathVariable(String),
    #[error("Unterminated path variable in template '{0}'")]
    UnterminatedVariable(String),
}

/// An HTTP request under construction.
///
/// `query` and `headers` keep every value of a parameter, in order. Setting a parameter
/// again replaces its previous values.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    /// Path template, e.g. `/pets/{petId}`. Never contains a query string.
    pub path_template: String,
    pub path_params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: Method, path_template: impl Into<String>) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            path_params: HashMap::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn set_query_param(&mut self, name: &str, values: Vec<String>) {
        set_multi(&mut self.query, name, values);
    }

    pub fn set_header_param(&mut self, name: &str, values: Vec<String>) {
        set_multi(&mut self.headers, name, values);
    }

    pub fn set_path_param(&mut self, name: &str, value: String) {
        self.path_params.insert(name.to_string(), value);
    }

    pub fn set_body(&mut self, body: String) {
        self.body = Some(body);
    }

    /// All values of a query parameter, in order.
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        get_multi(&self.query, name)
    }

    /// All values of a header, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        get_multi(&self.headers, name)
    }

    /// Splits the path template into segments with every `{variable}` substituted.
    ///
    /// Segments are returned raw; percent-encoding them is up to the caller.
    pub fn path_segments(&self) -> Result<Vec<String>, RenderError> {
        self.path_template
            .trim_start_matches('/')
            .split('/')
            .map(|segment| self.render_segment(segment))
            .collect()
    }

    fn render_segment(&self, segment: &str) -> Result<String, RenderError> {
        let mut rendered = String::with_capacity(segment.len());
        let mut rest = segment;

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let end = rest[start..]
                .find('}')
                .ok_or_else(|| RenderError::UnterminatedVariable(self.path_template.clone()))?;
            let name = &rest[start + 1..start + end];
            let value = self
                .path_params
                .get(name)
                .ok_or_else(|| RenderError::UnresolvedPathVariable(name.to_string()))?;
            rendered.push_str(value);
            rest = &rest[start + end + 1..];
        }
        rendered.push_str(rest);

        Ok(rendered)
    }
}

fn set_multi(slots: &mut Vec<(String, String)>, name: &str, values: Vec<String>) {
    slots.retain(|(k, _)| k != name);
    slots.extend(values.into_iter().map(|v| (name.to_string(), v)));
}

fn get_multi<'a>(slots: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    slots
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// The raw answer of the upstream REST service.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued_params_keep_order_and_replace() {
        let mut request = OutboundRequest::new(Method::GET, "/pets");
        request.set_query_param("tag", vec!["a".into(), "b".into()]);
        request.set_query_param("limit", vec!["10".into()]);

        assert_eq!(request.query_values("tag"), vec!["a", "b"]);

        request.set_query_param("tag", vec!["c".into()]);
        assert_eq!(request.query_values("tag"), vec!["c"]);
        assert_eq!(request.query_values("limit"), vec!["10"]);

        request.set_header_param("X-Trace", vec![]);
        assert!(request.header_values("X-Trace").is_empty());
    }

    #[test]
    fn test_path_segments_substitute_variables() {
        let mut request = OutboundRequest::new(Method::GET, "/stores/{storeId}/pets/{petId}:feed");
        request.set_path_param("storeId", "s 1".into());
        request.set_path_param("petId", "42".into());

        assert_eq!(
            request.path_segments().unwrap(),
            vec!["stores", "s 1", "pets", "42:feed"]
        );
    }

    #[test]
    fn test_path_segments_report_missing_variables() {
        let request = OutboundRequest::new(Method::GET, "/pets/{petId}");
        assert!(matches!(
            request.path_segments(),
            Err(RenderError::UnresolvedPathVariable(name)) if name == "petId"
        ));

        let request = OutboundRequest::new(Method::GET, "/pets/{petId");
        assert!(matches!(
            request.path_segments(),
            Err(RenderError::UnterminatedVariable(_))
        ));
    }
}
