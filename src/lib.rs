//! Micro-benchmarks comparing serialization formats (JSON, protobuf, bincode)
//! and RPC transports (binary RPC over TCP, JSON-RPC, RPC bridged over HTTP,
//! gRPC, plain HTTP and HTTPS) on one small fixed record.

pub mod accept_stream;
pub mod benchmarks;
pub mod certs;
pub mod config;
pub mod error;
pub mod formats;
pub mod framing;
pub mod grpc;
pub mod harness;
pub mod http;
pub mod proto;
pub mod record;
pub mod report;
pub mod rpc;
pub mod server_loop;
pub mod servers;
pub mod types;

pub use config::{BenchConfig, TransportKind};
pub use error::BenchError;
pub use record::{generate_record, Record};
pub use servers::ServerRegistry;
