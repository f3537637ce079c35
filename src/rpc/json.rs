//! Text RPC: newline-delimited JSON-RPC 1.0.
//!
//! ```text
//! -> {"method":"Handler.Serve","params":[0],"id":0}
//! <- {"id":0,"result":"OK.\n","error":null}
//! ```

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use super::{Handler, Reply};
use crate::accept_stream::tcp_accept_stream;
use crate::error::BenchError;
use crate::record::Record;
use crate::server_loop::serve_stream;
use crate::types::{GenericBoxedStream, ShutdownSignal};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: [i64; 1],
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct JsonRpcResponse {
    pub id: u64,
    pub result: Value,
    pub error: Value,
}

impl JsonRpcResponse {
    fn from_dispatch(id: u64, outcome: Result<Reply, String>) -> Result<Self, BenchError> {
        Ok(match outcome {
            Ok(Reply::Text(text)) => JsonRpcResponse {
                id,
                result: Value::String(text),
                error: Value::Null,
            },
            Ok(Reply::Record(record)) => JsonRpcResponse {
                id,
                result: serde_json::to_value(record)?,
                error: Value::Null,
            },
            Err(message) => JsonRpcResponse {
                id,
                result: Value::Null,
                error: Value::String(message),
            },
        })
    }
}

/// A bare JSON string is a text reply, an object is a record.
fn reply_from_value(value: Value) -> Result<Reply, BenchError> {
    match value {
        Value::String(text) => Ok(Reply::Text(text)),
        object @ Value::Object(_) => Ok(Reply::Record(serde_json::from_value::<Record>(object)?)),
        other => Err(BenchError::UnexpectedReply(format!("unexpected result {}", other))),
    }
}

pub async fn serve_conn<S>(stream: S, handler: Handler) -> Result<(), BenchError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufStream::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = serde_json::from_str(&line)?;
        let outcome = handler.dispatch(&request.method, request.params[0]);
        let response = JsonRpcResponse::from_dispatch(request.id, outcome)?;

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stream.write_all(&out).await?;
        stream.flush().await?;
    }
}

pub fn spawn_server(listener: TcpListener, shutdown: ShutdownSignal) -> Result<SocketAddr, BenchError> {
    let addr = listener.local_addr()?;
    info!("JSON RPC listening on {}", addr);

    let stream: GenericBoxedStream<Result<TcpStream, std::io::Error>> =
        Box::pin(tcp_accept_stream(listener));
    tokio::spawn(serve_stream("json-rpc", stream, shutdown, |conn| {
        tokio::spawn(async move {
            match conn {
                Ok(conn) => {
                    if let Err(e) = serve_conn(conn, Handler).await {
                        error!("JSON RPC connection error: {}", e);
                    }
                }
                Err(e) => error!("JSON RPC accept error: {}", e),
            }
        })
    }));

    Ok(addr)
}

pub struct JsonRpcClient<S> {
    stream: BufStream<S>,
    id: u64,
    line: String,
}

impl JsonRpcClient<TcpStream> {
    pub async fn dial(addr: SocketAddr) -> Result<Self, BenchError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("JSON RPC client connected to {}", addr);
        Ok(Self::new(stream))
    }
}

impl<S> JsonRpcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
            id: 0,
            line: String::new(),
        }
    }

    pub async fn call(&mut self, method: &str, arg: i64) -> Result<Reply, BenchError> {
        let id = self.id;
        self.id += 1;

        let request = JsonRpcRequest {
            method: method.to_string(),
            params: [arg],
            id,
        };
        let mut out = serde_json::to_vec(&request)?;
        out.push(b'\n');
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;

        self.line.clear();
        if self.stream.read_line(&mut self.line).await? == 0 {
            return Err(BenchError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        let response: JsonRpcResponse = serde_json::from_str(&self.line)?;
        if response.id != id {
            return Err(BenchError::UnexpectedReply(format!(
                "id mismatch: sent {}, got {}",
                id, response.id
            )));
        }
        match response.error {
            Value::Null => reply_from_value(response.result),
            Value::String(message) => Err(BenchError::Rpc {
                method: method.to_string(),
                message,
            }),
            other => Err(BenchError::Rpc {
                method: method.to_string(),
                message: other.to_string(),
            }),
        }
    }
}
