//! Error types shared by the formats, transports and the harness.
//!
//! Every error is benchmark-invalidating: the harness never retries and never
//! counts a failed call as a sample.

use std::path::PathBuf;

use hyper::StatusCode;
use thiserror::Error;

use crate::framing::FrameError;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("HTTP request build error: {0}")]
    HttpBuild(#[from] hyper::http::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    #[error("gRPC transport error: {0}")]
    GrpcTransport(#[from] tonic::transport::Error),

    #[error("gRPC status: {0}")]
    GrpcStatus(Box<tonic::Status>),

    #[error("rpc call {method} failed: {message}")]
    Rpc { method: String, message: String },

    #[error("request failed with HTTP status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("TLS material not found at '{}'", .0.display())]
    MissingTlsMaterial(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<tonic::Status> for BenchError {
    fn from(status: tonic::Status) -> Self {
        BenchError::GrpcStatus(Box::new(status))
    }
}
