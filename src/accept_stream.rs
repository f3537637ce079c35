use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures_util::Stream;
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::net::{TcpListener, TcpStream};
use tokio_openssl::SslStream;
use tracing::{debug, error};

/// Accepted plain TCP connections, with Nagle disabled so small RPC frames
/// are not delayed.
pub fn tcp_accept_stream(listener: TcpListener) -> impl Stream<Item = Result<TcpStream, io::Error>> {
    stream! {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }
                    debug!("Accepted connection from {}", addr);
                    yield Ok(stream);
                }
                Err(e) => {
                    error!("TCP accept error: {}", e);
                    continue;
                }
            }
        }
    }
}

/// Accepted connections that completed a TLS handshake. Handshake failures are
/// logged and skipped.
pub fn tls_accept_stream(
    listener: TcpListener,
    acceptor: Arc<SslAcceptor>,
) -> impl Stream<Item = Result<SslStream<TcpStream>, io::Error>> {
    stream! {
        loop {
            let (stream, addr): (TcpStream, SocketAddr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("TCP accept error: {}", e);
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
            }

            let ssl = match Ssl::new(acceptor.context()) {
                Ok(ssl) => ssl,
                Err(e) => {
                    error!("Failed to create SSL context for {}: {}", addr, e);
                    continue;
                }
            };

            match SslStream::new(ssl, stream) {
                Ok(mut ssl_stream) => {
                    match Pin::new(&mut ssl_stream).accept().await {
                        Ok(_) => {
                            debug!("TLS handshake successful with {}", addr);
                            yield Ok(ssl_stream);
                        }
                        Err(e) => {
                            error!("TLS handshake failed with {}: {}", addr, e);
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to create SSL stream for {}: {}", addr, e);
                }
            }
        }
    }
}
