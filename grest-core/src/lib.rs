//! # Grest Core
//!
//! `grest-core` is the engine powering the Grest bridge. It exposes a REST service as a
//! gRPC service without compile-time knowledge of either side: the Protobuf schema is
//! loaded at runtime and every endpoint is described by plain parameter metadata.
//!
//! ## Key Components
//!
//! * **[`schema::Schema`]:** Loads `.proto` source text (or a binary `FileDescriptorSet`)
//!   into a navigable `DescriptorPool`.
//! * **[`convert::Converter`]:** Renders a single decoded field value as its canonical string form.
//! * **[`extract::extract`]:** Pulls the string values of one field out of a `DynamicMessage`,
//!   keeping repeated fields and maps apart.
//! * **[`placement::Placement`]:** Writes string values into the right slot of an
//!   [`request::OutboundRequest`] (query, header, path or body).
//! * **[`adapter::OperationAdapter`]:** Compiles all of the above once per endpoint and
//!   runs the decode -> assemble -> submit -> decode pipeline for every call.
//! * **[`bridge::Bridge`]:** Builds the adapters of a whole service, isolating the
//!   failure of one endpoint from its siblings.
//!
//! ## gRPC plumbing
//!
//! * **[`grpc::server::BridgeService`]:** A `tower` service routing gRPC requests to the
//!   matching adapter.
//! * **[`grpc::codec::BytesCodec`]:** An implementation of `tonic::codec::Codec` that hands the
//!   raw message bytes to the adapter, which owns the decoding.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod adapter;
pub mod bridge;
pub mod convert;
pub mod extract;
pub mod grpc;
pub mod parameter;
pub mod placement;
pub mod request;
pub mod schema;
pub mod transport;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
