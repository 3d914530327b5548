//! # Operation Adapter
//!
//! Adapts a single REST operation (HTTP method + path template) to a single gRPC method.
//!
//! ## Construction
//!
//! [`OperationBinding::new`] binds every declared parameter to the input field of the same
//! name (hyphens become underscores), and resolves its [`Converter`] and [`Placement`] once.
//! Any failure aborts the construction of this endpoint only.
//!
//! ## Per call
//!
//! [`OperationAdapter::handle_call`] runs a linear pipeline, with no state kept between calls:
//!
//! 1. Decode the Protobuf payload into a `DynamicMessage` of the input type.
//! 2. Run every parameter writer, in declaration order, to assemble the [`OutboundRequest`].
//! 3. Submit it through the shared [`Transport`].
//! 4. Decode the JSON response permissively into a `DynamicMessage` of the output type.
//! 5. Encode that message back to Protobuf bytes.
use crate::{
    convert::{ConvertError, Converter, UnsupportedTypeError, converter_for},
    extract::extract,
    parameter::ParameterMetadata,
    placement::{ConfigurationError, Placement, PlacementError, placer_for},
    request::OutboundRequest,
    transport::{SubmitError, Transport},
};
use bytes::{Buf, Bytes};
use http::{Method, StatusCode};
use prost::Message;
use prost_reflect::{
    DeserializeOptions, DynamicMessage, FieldDescriptor, MessageDescriptor, MethodDescriptor,
};
use std::sync::Arc;
use tonic::{Code, Status};
use tracing::{Instrument, debug, debug_span, info_span, warn};

/// Failure to compile an endpoint.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Could not find field '{field}' in message '{message}' for parameter '{parameter}'")]
    Binding {
        parameter: String,
        field: String,
        message: String,
    },
    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedTypeError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Path template '{0}' must not contain a query string")]
    QueryInPath(String),
}

/// Failure of a single call. Surfaced to the gRPC caller as a [`Status`].
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Failed to decode request message: '{0}'")]
    Decode(#[from] prost::DecodeError),
    #[error("Failed to convert parameter '{parameter}': '{source}'")]
    Convert {
        parameter: String,
        source: ConvertError,
    },
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("Failed to submit HTTP request: '{0}'")]
    Submit(#[from] SubmitError),
    #[error("Upstream service answered {status}: '{body}'")]
    UpstreamStatus { status: StatusCode, body: String },
    #[error("Failed to decode response body: '{0}'")]
    ResponseDecode(#[from] serde_json::Error),
}

impl From<CallError> for Status {
    fn from(err: CallError) -> Self {
        let code = match &err {
            CallError::Decode(_) | CallError::Placement(_) => Code::InvalidArgument,
            CallError::Convert { .. } | CallError::ResponseDecode(_) => Code::Internal,
            CallError::Submit(_) => Code::Unavailable,
            CallError::UpstreamStatus { status, .. } => code_for_status(*status),
        };
        Status::new(code, err.to_string())
    }
}

fn code_for_status(status: StatusCode) -> Code {
    match status.as_u16() {
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::NotFound,
        409 => Code::AlreadyExists,
        412 => Code::FailedPrecondition,
        429 => Code::ResourceExhausted,
        501 => Code::Unimplemented,
        502..=504 => Code::Unavailable,
        _ => Code::Unknown,
    }
}

/// One bound parameter: the field it reads, how its values are rendered, where they go.
#[derive(Debug, Clone)]
pub struct ParamWriter {
    field: FieldDescriptor,
    converter: Converter,
    placement: Placement,
}

impl ParamWriter {
    /// Extracts, converts and places this parameter.
    pub fn write(
        &self,
        message: &DynamicMessage,
        request: &mut OutboundRequest,
    ) -> Result<(), CallError> {
        let values =
            extract(message, &self.field, &self.converter).map_err(|source| CallError::Convert {
                parameter: self.placement.name().to_string(),
                source,
            })?;
        self.placement.place(values, request)?;
        Ok(())
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }
}

/// The compiled, immutable translation plan of one endpoint.
#[derive(Debug, Clone)]
pub struct OperationBinding {
    http_method: Method,
    path: String,
    writers: Vec<ParamWriter>,
    input: MessageDescriptor,
    output: MessageDescriptor,
}

impl OperationBinding {
    /// Compiles an endpoint.
    ///
    /// # Arguments
    ///
    /// * `input` / `output` - The gRPC request and response message types.
    /// * `http_method` - The HTTP method of the REST operation.
    /// * `path` - The path template, e.g. `/pets/{petId}`. May not contain a query string.
    /// * `parameters` - The declared parameters, in the order their writers must run.
    pub fn new(
        input: MessageDescriptor,
        output: MessageDescriptor,
        http_method: Method,
        path: impl Into<String>,
        parameters: &[ParameterMetadata],
    ) -> Result<Self, BuildError> {
        let path = path.into();
        if path.contains('?') {
            return Err(BuildError::QueryInPath(path));
        }

        let writers = parameters
            .iter()
            .map(|param| {
                let field_name = param.field_name();
                let field = input.get_field_by_name(&field_name).ok_or_else(|| {
                    BuildError::Binding {
                        parameter: param.name.clone(),
                        field: field_name,
                        message: input.full_name().to_string(),
                    }
                })?;

                let converter = converter_for(&field, param)?;
                let placement = placer_for(param)?;

                Ok(ParamWriter {
                    field,
                    converter,
                    placement,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        Ok(Self {
            http_method,
            path,
            writers,
            input,
            output,
        })
    }

    /// Compiles an endpoint for a gRPC method, taking its input and output types.
    pub fn for_method(
        method: &MethodDescriptor,
        http_method: Method,
        path: impl Into<String>,
        parameters: &[ParameterMetadata],
    ) -> Result<Self, BuildError> {
        Self::new(method.input(), method.output(), http_method, path, parameters)
    }

    pub fn http_method(&self) -> &Method {
        &self.http_method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn writers(&self) -> &[ParamWriter] {
        &self.writers
    }

    pub fn input(&self) -> &MessageDescriptor {
        &self.input
    }

    pub fn output(&self) -> &MessageDescriptor {
        &self.output
    }

    /// Decodes a Protobuf payload into a message of the input type.
    pub fn decode_request(&self, payload: impl Buf) -> Result<DynamicMessage, CallError> {
        Ok(DynamicMessage::decode(self.input.clone(), payload)?)
    }

    /// Runs every writer against `message`. The first failure aborts the assembly.
    pub fn build_request(&self, message: &DynamicMessage) -> Result<OutboundRequest, CallError> {
        let mut request = OutboundRequest::new(self.http_method.clone(), self.path.clone());

        for writer in &self.writers {
            let span = debug_span!(
                "param",
                param.name = %writer.placement.name(),
                param.field = %writer.field.name(),
            );
            span.in_scope(|| writer.write(message, &mut request))?;
        }

        Ok(request)
    }

    /// Decodes a JSON response body into a message of the output type.
    ///
    /// Unknown fields are ignored, the REST service may answer with more than the schema knows.
    /// An empty body yields the default message.
    pub fn decode_response(&self, body: &[u8]) -> Result<DynamicMessage, CallError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(DynamicMessage::new(self.output.clone()));
        }

        let options = DeserializeOptions::new().deny_unknown_fields(false);
        let mut deserializer = serde_json::Deserializer::from_slice(body);
        let message =
            DynamicMessage::deserialize_with_options(self.output.clone(), &mut deserializer, &options)?;
        deserializer.end()?;

        Ok(message)
    }
}

/// An [`OperationBinding`] paired with the transport its calls go through.
///
/// Cheap to clone and safe to share between concurrent calls.
#[derive(Clone)]
pub struct OperationAdapter {
    name: String,
    binding: Arc<OperationBinding>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for OperationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationAdapter")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl OperationAdapter {
    /// # Arguments
    ///
    /// * `name` - Name used in diagnostics, usually the gRPC method's full name.
    pub fn new(
        name: impl Into<String>,
        binding: OperationBinding,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            binding: Arc::new(binding),
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &OperationBinding {
        &self.binding
    }

    /// Handles a single gRPC call by proxying it to the REST service.
    ///
    /// # Returns
    ///
    /// * `Ok(Bytes)` - The Protobuf encoded response message.
    /// * `Err(CallError)` - The first failure of the pipeline. Nothing is retried.
    pub async fn handle_call(&self, payload: Bytes) -> Result<Bytes, CallError> {
        let span = info_span!(
            "rpc.call",
            rpc.method = %self.name,
            http.method = %self.binding.http_method,
            http.route = %self.binding.path,
        );

        self.proxy(payload)
            .instrument(span)
            .await
            .inspect_err(|err| warn!(rpc.method = %self.name, error = %err, "call failed"))
    }

    async fn proxy(&self, payload: Bytes) -> Result<Bytes, CallError> {
        let message = self.binding.decode_request(payload)?;
        let request = self.binding.build_request(&message)?;

        debug!(
            query = request.query.len(),
            headers = request.headers.len(),
            has_body = request.body.is_some(),
            "submitting request"
        );
        let response = self.transport.submit(request).await?;

        if !response.status.is_success() {
            return Err(CallError::UpstreamStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let output = self.binding.decode_response(&response.body)?;
        Ok(Bytes::from(output.encode_to_vec()))
    }
}
