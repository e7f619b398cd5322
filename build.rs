// Generates the Envoy metrics service skeleton without protoc.
//
// Message types live in src/ingest/proto.rs as hand-declared prost structs;
// only the service plumbing is generated here.

fn main() {
    let metrics_service = tonic_build::manual::Service::builder()
        .name("MetricsService")
        .package("envoy.service.metrics.v3")
        .method(
            tonic_build::manual::Method::builder()
                .name("stream_metrics")
                .route_name("StreamMetrics")
                .input_type("crate::ingest::proto::StreamMetricsMessage")
                .output_type("crate::ingest::proto::StreamMetricsResponse")
                .codec_path("tonic::codec::ProstCodec")
                .client_streaming()
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[metrics_service]);

    println!("cargo:rerun-if-changed=build.rs");
}
