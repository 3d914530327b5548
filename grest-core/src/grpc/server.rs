//! # Routing gRPC Service
//!
//! [`BridgeService`] is a `tower` service answering HTTP/2 gRPC requests. It plays the role
//! a generated `tonic` server plays for a static schema: it matches the request path against
//! the bridge's routes and runs the matching adapter through `tonic::server::Grpc`, which
//! handles framing, compression flags and status trailers.
//!
//! Unknown paths are answered with `Unimplemented`, like generated servers do.
use super::codec::BytesCodec;
use crate::{BoxError, adapter::OperationAdapter, bridge::Bridge};
use bytes::Bytes;
use http_body::Body as HttpBody;
use std::{
    convert::Infallible,
    sync::Arc,
    task::{Context, Poll},
};
use tonic::{
    Code, Status,
    codegen::{BoxFuture, Service},
    server::{Grpc, UnaryService},
};

/// Serves every route of a [`Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeService {
    bridge: Arc<Bridge>,
}

impl BridgeService {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge: Arc::new(bridge),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}

impl<B> Service<http::Request<B>> for BridgeService
where
    B: HttpBody + Send + 'static,
    B::Error: Into<BoxError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match self.bridge.route(req.uri().path()).cloned() {
            Some(adapter) => Box::pin(async move {
                let mut grpc = Grpc::new(BytesCodec);
                Ok(grpc.unary(AdapterCall(adapter), req).await)
            }),
            None => Box::pin(async move {
                let mut response = http::Response::new(tonic::body::Body::default());
                let headers = response.headers_mut();
                headers.insert(Status::GRPC_STATUS, (Code::Unimplemented as i32).into());
                headers.insert(
                    http::header::CONTENT_TYPE,
                    tonic::metadata::GRPC_CONTENT_TYPE,
                );
                Ok(response)
            }),
        }
    }
}

/// Adapts an [`OperationAdapter`] to `tonic`'s unary handler interface.
struct AdapterCall(OperationAdapter);

impl UnaryService<Bytes> for AdapterCall {
    type Response = Bytes;
    type Future = BoxFuture<tonic::Response<Self::Response>, Status>;

    fn call(&mut self, request: tonic::Request<Bytes>) -> Self::Future {
        let adapter = self.0.clone();
        Box::pin(async move {
            adapter
                .handle_call(request.into_inner())
                .await
                .map(tonic::Response::new)
                .map_err(Status::from)
        })
    }
}
