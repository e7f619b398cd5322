//! Envoy metrics service wire types
//!
//! Hand-declared prost messages covering the fields this service reads from
//! `envoy.service.metrics.v3.StreamMetricsMessage` and the embedded
//! `io.prometheus.client.MetricFamily`. Tags match the upstream protos;
//! fields that are not declared here are skipped by the decoder.
//!
//! The gRPC service skeleton (`service::metrics_service_server`,
//! `service::metrics_service_client`) is generated by `build.rs`.

use std::collections::BTreeMap;

use crate::identity::NodeIdentifier;

/// Generated `MetricsService` server and client
pub mod service {
    include!(concat!(
        env!("OUT_DIR"),
        "/envoy.service.metrics.v3.MetricsService.rs"
    ));
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamMetricsMessage {
    /// Only present on the first message of a stream
    #[prost(message, optional, tag = "1")]
    pub identifier: ::core::option::Option<Identifier>,
    #[prost(message, repeated, tag = "2")]
    pub envoy_metrics: ::prost::alloc::vec::Vec<MetricFamily>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamMetricsResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Identifier {
    #[prost(message, optional, tag = "1")]
    pub node: ::core::option::Option<Node>,
}

/// `envoy.config.core.v3.Node`, identity fields only
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Node {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub cluster: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub metadata: ::core::option::Option<::prost_types::Struct>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MetricType {
    Counter = 0,
    Gauge = 1,
    Summary = 2,
    Untyped = 3,
    Histogram = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetricFamily {
    #[prost(string, optional, tag = "1")]
    pub name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub help: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "MetricType", optional, tag = "3")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(message, repeated, tag = "4")]
    pub metric: ::prost::alloc::vec::Vec<Metric>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    #[prost(message, repeated, tag = "1")]
    pub label: ::prost::alloc::vec::Vec<LabelPair>,
    #[prost(message, optional, tag = "2")]
    pub gauge: ::core::option::Option<Gauge>,
    #[prost(message, optional, tag = "3")]
    pub counter: ::core::option::Option<Counter>,
    #[prost(message, optional, tag = "4")]
    pub summary: ::core::option::Option<Summary>,
    #[prost(message, optional, tag = "5")]
    pub untyped: ::core::option::Option<Untyped>,
    #[prost(int64, optional, tag = "6")]
    pub timestamp_ms: ::core::option::Option<i64>,
    #[prost(message, optional, tag = "7")]
    pub histogram: ::core::option::Option<Histogram>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LabelPair {
    #[prost(string, optional, tag = "1")]
    pub name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub value: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Gauge {
    #[prost(double, optional, tag = "1")]
    pub value: ::core::option::Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Counter {
    #[prost(double, optional, tag = "1")]
    pub value: ::core::option::Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Untyped {
    #[prost(double, optional, tag = "1")]
    pub value: ::core::option::Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Quantile {
    #[prost(double, optional, tag = "1")]
    pub quantile: ::core::option::Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub value: ::core::option::Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Summary {
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: ::core::option::Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub sample_sum: ::core::option::Option<f64>,
    #[prost(message, repeated, tag = "3")]
    pub quantile: ::prost::alloc::vec::Vec<Quantile>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Bucket {
    #[prost(uint64, optional, tag = "1")]
    pub cumulative_count: ::core::option::Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub upper_bound: ::core::option::Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Histogram {
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: ::core::option::Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub sample_sum: ::core::option::Option<f64>,
    #[prost(message, repeated, tag = "3")]
    pub bucket: ::prost::alloc::vec::Vec<Bucket>,
}

impl StreamMetricsMessage {
    /// The node carried by this message, if any
    pub fn node(&self) -> Option<&Node> {
        self.identifier.as_ref().and_then(|id| id.node.as_ref())
    }
}

impl From<&Node> for NodeIdentifier {
    /// Keeps only string-valued metadata entries
    fn from(node: &Node) -> Self {
        let metadata = node.metadata.as_ref().map(|st| {
            st.fields
                .iter()
                .filter_map(|(key, value)| match &value.kind {
                    Some(::prost_types::value::Kind::StringValue(s)) => {
                        Some((key.clone(), s.clone()))
                    }
                    _ => None,
                })
                .collect::<BTreeMap<String, String>>()
        });
        NodeIdentifier {
            id: node.id.clone(),
            metadata,
        }
    }
}
