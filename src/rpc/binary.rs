//! Binary RPC: bincode frames over a byte stream.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use super::{Handler, Reply, RpcRequest, RpcResponse};
use crate::accept_stream::tcp_accept_stream;
use crate::error::BenchError;
use crate::framing::{read_frame, write_frame, FrameError};
use crate::server_loop::serve_stream;
use crate::types::{GenericBoxedStream, ShutdownSignal};

/// Answer framed requests on one connection until the peer hangs up.
pub async fn serve_conn<S>(stream: S, handler: Handler) -> Result<(), BenchError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufStream::new(stream);
    loop {
        let request: RpcRequest = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(FrameError::EndOfStream) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let response = handler.respond(request);
        write_frame(&mut stream, &response).await?;
    }
}

/// Start the accept loop on an already bound listener.
pub fn spawn_server(listener: TcpListener, shutdown: ShutdownSignal) -> Result<SocketAddr, BenchError> {
    let addr = listener.local_addr()?;
    info!("Binary RPC listening on {}", addr);

    let stream: GenericBoxedStream<Result<TcpStream, std::io::Error>> =
        Box::pin(tcp_accept_stream(listener));
    tokio::spawn(serve_stream("binary-rpc", stream, shutdown, |conn| {
        tokio::spawn(async move {
            match conn {
                Ok(conn) => {
                    if let Err(e) = serve_conn(conn, Handler).await {
                        error!("Binary RPC connection error: {}", e);
                    }
                }
                Err(e) => error!("Binary RPC accept error: {}", e),
            }
        })
    }));

    Ok(addr)
}

/// Sequential client: one outstanding call at a time.
pub struct BinaryRpcClient<S> {
    stream: BufStream<S>,
    seq: u64,
}

impl BinaryRpcClient<TcpStream> {
    pub async fn dial(addr: SocketAddr) -> Result<Self, BenchError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("Binary RPC client connected to {}", addr);
        Ok(Self::new(stream))
    }
}

impl<S> BinaryRpcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
            seq: 0,
        }
    }

    pub async fn call(&mut self, method: &str, arg: i64) -> Result<Reply, BenchError> {
        let seq = self.seq;
        self.seq += 1;

        let request = RpcRequest {
            seq,
            method: method.to_string(),
            arg,
        };
        write_frame(&mut self.stream, &request).await?;

        let response: RpcResponse = read_frame(&mut self.stream).await?;
        if response.seq != seq {
            return Err(BenchError::UnexpectedReply(format!(
                "sequence mismatch: sent {}, got {}",
                seq, response.seq
            )));
        }
        if let Some(message) = response.error {
            return Err(BenchError::Rpc {
                method: method.to_string(),
                message,
            });
        }
        response
            .reply
            .ok_or_else(|| BenchError::UnexpectedReply("response without reply".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::generate_record;
    use crate::rpc::{RECORD_METHOD, SERVE_METHOD};

    #[tokio::test]
    async fn test_client_and_server_over_duplex() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(serve_conn(server_io, Handler));

        let mut client = BinaryRpcClient::new(client_io);
        for n in 0..3 {
            let reply = client.call(SERVE_METHOD, n).await.unwrap();
            assert_eq!(reply.into_text().unwrap(), "OK.\n");
        }
        let reply = client.call(RECORD_METHOD, 0).await.unwrap();
        assert_eq!(reply.into_record().unwrap(), generate_record());

        drop(client);
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_method_is_rpc_error() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve_conn(server_io, Handler));

        let mut client = BinaryRpcClient::new(client_io);
        let err = client.call("Handler.Nope", 0).await.unwrap_err();
        assert!(matches!(err, BenchError::Rpc { .. }));

        // the connection stays usable after an error reply
        assert!(client.call(SERVE_METHOD, 0).await.is_ok());
    }
}
