//! Binary RPC bridged over HTTP.
//!
//! The client asks for an HTTP/1.1 upgrade on [`RPC_PATH`]; once the server
//! answers `101 Switching Protocols` the connection carries the same frames as
//! [`super::binary`].

use std::net::SocketAddr;

use hyper::client::HttpConnector;
use hyper::header::{CONNECTION, CONTENT_TYPE, UPGRADE};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::upgrade::Upgraded;
use hyper::{Body, Client, Request, Response, StatusCode};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use super::binary::{self, BinaryRpcClient};
use super::Handler;
use crate::accept_stream::tcp_accept_stream;
use crate::error::BenchError;
use crate::server_loop::serve_stream;
use crate::types::{GenericBoxedStream, ShutdownSignal};

pub const RPC_PATH: &str = "/_rpc_";
pub const RPC_PROTOCOL: &str = "wirebench-rpc";

fn wants_rpc_upgrade(req: &Request<Body>) -> bool {
    req.headers()
        .get(UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case(RPC_PROTOCOL))
        .unwrap_or(false)
}

pub async fn route_bridge(req: Request<Body>) -> Result<Response<Body>, hyper::http::Error> {
    if req.uri().path() != RPC_PATH {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from("404 page not found\n"));
    }
    if !wants_rpc_upgrade(&req) {
        return Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from("405 must upgrade to wirebench-rpc\n"));
    }

    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                if let Err(e) = binary::serve_conn(upgraded, Handler).await {
                    error!("HTTP RPC connection error: {}", e);
                }
            }
            Err(e) => error!("HTTP RPC upgrade failed: {}", e),
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(CONNECTION, "upgrade")
        .header(UPGRADE, RPC_PROTOCOL)
        .body(Body::empty())
}

pub fn spawn_server(listener: TcpListener, shutdown: ShutdownSignal) -> Result<SocketAddr, BenchError> {
    let addr = listener.local_addr()?;
    info!("HTTP RPC listening on http://{}{}", addr, RPC_PATH);

    let stream: GenericBoxedStream<Result<TcpStream, std::io::Error>> =
        Box::pin(tcp_accept_stream(listener));
    tokio::spawn(serve_stream("http-rpc", stream, shutdown, |conn| {
        tokio::spawn(async move {
            match conn {
                Ok(conn) => {
                    let served = Http::new()
                        .serve_connection(conn, service_fn(route_bridge))
                        .with_upgrades()
                        .await;
                    if let Err(e) = served {
                        error!("HTTP RPC connection error: {}", e);
                    }
                }
                Err(e) => error!("HTTP RPC accept error: {}", e),
            }
        })
    }));

    Ok(addr)
}

/// Open an upgraded connection to the bridge and wrap it in a binary client.
pub async fn dial_http(addr: SocketAddr) -> Result<BinaryRpcClient<Upgraded>, BenchError> {
    let mut connector = HttpConnector::new();
    connector.set_nodelay(true);
    let client: Client<_, Body> = Client::builder().build(connector);

    let req = Request::builder()
        .uri(format!("http://{}{}", addr, RPC_PATH))
        .header(CONNECTION, "upgrade")
        .header(UPGRADE, RPC_PROTOCOL)
        .body(Body::empty())?;
    let res = client.request(req).await?;
    if res.status() != StatusCode::SWITCHING_PROTOCOLS {
        return Err(BenchError::UnexpectedStatus(res.status()));
    }

    let upgraded = hyper::upgrade::on(res).await?;
    debug!("HTTP RPC client upgraded connection to {}", addr);
    Ok(BinaryRpcClient::new(upgraded))
}
