//! # gRPC Plumbing
//!
//! This module contains the server-side building blocks that expose a [`crate::bridge::Bridge`]
//! over gRPC.
//!
//! Unlike standard `tonic` servers, which are generated from a schema at build time, the
//! components here route and answer calls using only runtime information: the request path
//! picks the adapter, and the adapter owns the Protobuf decoding.
pub mod codec;
pub mod server;
