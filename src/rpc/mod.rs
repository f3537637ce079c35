//! RPC method registry shared by the binary, JSON and HTTP-bridged transports.
//!
//! Every method ignores its argument and returns fixed output.

pub mod binary;
pub mod http;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;
use crate::record::{generate_record, Record};

/// Control method: replies with [`SERVE_REPLY`].
pub const SERVE_METHOD: &str = "Handler.Serve";
/// Data method: replies with the fixture record.
pub const RECORD_METHOD: &str = "Handler.Record";

pub const SERVE_REPLY: &str = "OK.\n";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Record(Record),
}

impl Reply {
    pub fn into_text(self) -> Result<String, BenchError> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Record(_) => Err(BenchError::UnexpectedReply(
                "expected text, got record".to_string(),
            )),
        }
    }

    pub fn into_record(self) -> Result<Record, BenchError> {
        match self {
            Reply::Record(record) => Ok(record),
            Reply::Text(text) => Err(BenchError::UnexpectedReply(format!(
                "expected record, got text {:?}",
                text
            ))),
        }
    }
}

/// Request header and argument of one binary-RPC call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RpcRequest {
    pub seq: u64,
    pub method: String,
    pub arg: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RpcResponse {
    pub seq: u64,
    pub error: Option<String>,
    pub reply: Option<Reply>,
}

/// The single registered service.
#[derive(Debug, Default, Clone, Copy)]
pub struct Handler;

impl Handler {
    pub fn dispatch(&self, method: &str, _arg: i64) -> Result<Reply, String> {
        match method {
            SERVE_METHOD => Ok(Reply::Text(SERVE_REPLY.to_string())),
            RECORD_METHOD => Ok(Reply::Record(generate_record())),
            other => Err(format!("rpc: can't find method {}", other)),
        }
    }

    pub fn respond(&self, request: RpcRequest) -> RpcResponse {
        match self.dispatch(&request.method, request.arg) {
            Ok(reply) => RpcResponse {
                seq: request.seq,
                error: None,
                reply: Some(reply),
            },
            Err(error) => RpcResponse {
                seq: request.seq,
                error: Some(error),
                reply: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_known_methods() {
        assert_eq!(
            Handler.dispatch(SERVE_METHOD, 7).unwrap(),
            Reply::Text("OK.\n".to_string())
        );
        assert_eq!(
            Handler.dispatch(RECORD_METHOD, 0).unwrap(),
            Reply::Record(generate_record())
        );
    }

    #[test]
    fn test_respond_unknown_method_keeps_seq() {
        let response = Handler.respond(RpcRequest {
            seq: 42,
            method: "Handler.Missing".to_string(),
            arg: 0,
        });
        assert_eq!(response.seq, 42);
        assert!(response.reply.is_none());
        assert_eq!(
            response.error.as_deref(),
            Some("rpc: can't find method Handler.Missing")
        );
    }

    #[test]
    fn test_reply_accessors_reject_wrong_shape() {
        assert!(Reply::Text("x".to_string()).into_record().is_err());
        assert!(Reply::Record(generate_record()).into_text().is_err());
    }
}
