use bytes::{BufMut, Bytes, BytesMut};
use grest_core::{
    bridge::{Bridge, EndpointSpec},
    grpc::server::BridgeService,
    parameter::ParameterMetadata,
    tonic::codegen::Service,
};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use petstore::{RecordingTransport, decode, encode, schema};
use std::sync::Arc;


fn service(transport: Arc<RecordingTransport>) -> BridgeService {
    let endpoints = [EndpointSpec {
        service: "petstore.PetService".to_string(),
        method: "Search".to_string(),
        http_method: "GET".to_string(),
        path: "/search".to_string(),
        parameters: vec![ParameterMetadata::new("stringValue", "query")],
    }];

    let (bridge, errors) = Bridge::build(&schema(), endpoints, transport);
    assert!(errors.is_empty());
    BridgeService::new(bridge)
}

/// Wraps a payload in a gRPC frame (uncompressed flag + big endian length).
fn grpc_request(path: &str, payload: Bytes) -> http::Request<Full<Bytes>> {
    let mut frame = BytesMut::with_capacity(payload.len() + 5);
    frame.put_u8(0);
    frame.put_u32(payload.len() as u32);
    frame.put(payload);

    http::Request::builder()
        .method(http::Method::POST)
        .uri(path)
        .header(http::header::CONTENT_TYPE, "application/grpc")
        .header("te", "trailers")
        .body(Full::new(frame.freeze()))
        .unwrap()
}

#[tokio::test]
async fn test_unary_call_is_routed_to_the_adapter() {
    let transport = Arc::new(RecordingTransport::answering(
        StatusCode::OK,
        serde_json::json!({ "pets": [{ "name": "rex" }] }),
    ));
    let mut service = service(transport.clone());

    let payload = encode("petstore.SearchRequest", serde_json::json!({ "stringValue": "foo" }));
    let response = service
        .call(grpc_request("/petstore.PetService/Search", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    let collected = response.into_body().collect().await.unwrap();
    let trailers = collected.trailers().cloned().unwrap_or_default();
    let data = collected.to_bytes();

    assert_eq!(trailers.get("grpc-status").unwrap(), "0");
    assert_eq!(
        decode("petstore.ListPetsResponse", &data[5..]),
        serde_json::json!({ "pets": [{ "name": "rex" }] })
    );
    assert_eq!(transport.requests()[0].query_values("stringValue"), vec!["foo"]);
}

#[tokio::test]
async fn test_call_errors_become_grpc_statuses() {
    let transport = Arc::new(RecordingTransport::answering(
        StatusCode::SERVICE_UNAVAILABLE,
        serde_json::json!({ "message": "down for maintenance" }),
    ));
    let mut service = service(transport);

    let payload = encode("petstore.SearchRequest", serde_json::json!({ "stringValue": "foo" }));
    let response = service
        .call(grpc_request("/petstore.PetService/Search", payload))
        .await
        .unwrap();

    // Trailers-only response: the status travels in the headers
    let code = grest_core::tonic::Code::Unavailable as i32;
    assert_eq!(
        response.headers().get("grpc-status").unwrap(),
        code.to_string().as_str()
    );
}

#[tokio::test]
async fn test_unknown_paths_are_unimplemented() {
    let transport = Arc::new(RecordingTransport::answering(
        StatusCode::OK,
        serde_json::json!({}),
    ));
    let mut service = service(transport.clone());

    let response = service
        .call(grpc_request("/petstore.PetService/Ghost", Bytes::new()))
        .await
        .unwrap();

    assert_eq!(response.headers().get("grpc-status").unwrap(), "12");
    assert!(transport.requests().is_empty());
}
