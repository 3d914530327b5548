use colored::*;
use grest_core::{
    adapter::OperationAdapter,
    bridge::{Bridge, EndpointError},
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// Every route served by a bridge, one line per gRPC method.
pub struct RouteList<'a>(pub &'a Bridge);

/// Endpoints that were skipped while building a bridge.
pub struct EndpointErrors<'a>(pub &'a [EndpointError]);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        FormattedString(format!("{}\n\n'{:#}'", "Error:".red().bold(), err))
    }
}

impl From<&OperationAdapter> for FormattedString {
    fn from(adapter: &OperationAdapter) -> Self {
        let binding = adapter.binding();

        FormattedString(format!(
            "{} {}({}) {} ({}) -> {} {}",
            "rpc".cyan(),
            adapter.name().green(),
            binding.input().name().yellow(),
            "returns".cyan(),
            binding.output().name().yellow(),
            binding.http_method().as_str().blue().bold(),
            binding.path()
        ))
    }
}

impl From<RouteList<'_>> for FormattedString {
    fn from(RouteList(bridge): RouteList<'_>) -> Self {
        if bridge.is_empty() {
            return FormattedString("No endpoints to serve.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Served Endpoints:\n");
        for path in bridge.paths() {
            if let Some(adapter) = bridge.route(path) {
                out.push_str(&format!("  - {}\n", FormattedString::from(adapter).0));
            }
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<EndpointErrors<'_>> for FormattedString {
    fn from(EndpointErrors(errors): EndpointErrors<'_>) -> Self {
        let mut out = format!("{}\n", "Skipped Endpoints:".red().bold());
        for err in errors {
            out.push_str(&format!("  - {}: {}\n", err.endpoint.yellow(), err.kind));
        }
        FormattedString(out.trim_end().to_string())
    }
}
