//! Plain HTTP and HTTPS servers plus the benchmark client for both.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use hyper::body::Bytes;
use hyper::client::connect::Connect;
use hyper::client::HttpConnector;
use hyper::header::{CONNECTION, CONTENT_TYPE};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Client, Method, Request, Response, StatusCode};
use hyper_openssl::HttpsConnector;
use openssl::ssl::{SslAcceptor, SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_openssl::SslStream;
use tracing::{error, info};

use crate::accept_stream::{tcp_accept_stream, tls_accept_stream};
use crate::error::BenchError;
use crate::record::generate_record;
use crate::rpc::SERVE_REPLY;
use crate::server_loop::serve_stream;
use crate::types::{GenericBoxedStream, ShutdownSignal};

pub async fn handle_connection<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if let Err(e) = Http::new()
        .serve_connection(stream, service_fn(route_request))
        .await
    {
        error!("HTTP connection error: {}", e);
    }
}

pub async fn route_request(req: Request<Body>) -> Result<Response<Body>, hyper::http::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/record") => match serde_json::to_vec(&generate_record()) {
            Ok(json) => Response::builder()
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json)),
            Err(e) => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from(e.to_string())),
        },
        (&Method::GET, "/health") => {
            // Compile-time version and build hash, set with env! or option_env!
            let version = env!("CARGO_PKG_VERSION");
            let build = option_env!("GIT_COMMIT_HASH").unwrap_or("unknown");
            let json = format!(r#"{{ "version": "{}", "build": "{}" }}"#, version, build);
            Response::builder()
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json))
        }
        // Every other method and path gets the fixed reply.
        _ => Response::builder()
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from(SERVE_REPLY)),
    }
}

pub fn spawn_http_server(listener: TcpListener, shutdown: ShutdownSignal) -> Result<SocketAddr, BenchError> {
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);

    let stream: GenericBoxedStream<Result<TcpStream, std::io::Error>> =
        Box::pin(tcp_accept_stream(listener));
    tokio::spawn(serve_stream("http", stream, shutdown, |conn| {
        tokio::spawn(async move {
            match conn {
                Ok(conn) => handle_connection(conn).await,
                Err(e) => error!("HTTP accept error: {}", e),
            }
        })
    }));

    Ok(addr)
}

/// Build a TLS acceptor from PEM files. A missing file yields
/// [`BenchError::MissingTlsMaterial`].
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<SslAcceptor, BenchError> {
    for path in [cert_path, key_path] {
        if !path.exists() {
            return Err(BenchError::MissingTlsMaterial(path.to_path_buf()));
        }
    }

    let mut builder = SslAcceptor::mozilla_intermediate(SslMethod::tls())?;
    builder.set_certificate_chain_file(cert_path)?;
    builder.set_private_key_file(key_path, SslFiletype::PEM)?;
    builder.check_private_key()?;
    Ok(builder.build())
}

pub fn spawn_https_server(
    listener: TcpListener,
    acceptor: SslAcceptor,
    shutdown: ShutdownSignal,
) -> Result<SocketAddr, BenchError> {
    let addr = listener.local_addr()?;
    info!("Listening on https://{}", addr);

    let stream: GenericBoxedStream<Result<SslStream<TcpStream>, std::io::Error>> =
        Box::pin(tls_accept_stream(listener, Arc::new(acceptor)));
    tokio::spawn(serve_stream("https", stream, shutdown, |stream_result| {
        tokio::spawn(async move {
            match stream_result {
                Ok(stream) => handle_connection(stream).await,
                Err(e) => error!("TLS stream error during connection: {}", e),
            }
        })
    }));

    Ok(addr)
}

/// GET client used by the HTTP benchmarks. Without keep-alive every request
/// opens a fresh connection (and, over TLS, a fresh handshake).
pub struct HttpBenchClient<C> {
    client: Client<C, Body>,
    keep_alive: bool,
}

impl HttpBenchClient<HttpConnector> {
    pub fn plain(keep_alive: bool) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        Self::with_connector(connector, keep_alive)
    }
}

impl HttpBenchClient<HttpsConnector<HttpConnector>> {
    /// TLS client that accepts any server certificate.
    pub fn insecure_tls(keep_alive: bool) -> Result<Self, BenchError> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);

        let mut ssl = SslConnector::builder(SslMethod::tls())?;
        ssl.set_verify(SslVerifyMode::NONE);
        let https = HttpsConnector::with_connector(http, ssl)?;
        Ok(Self::with_connector(https, keep_alive))
    }
}

impl<C> HttpBenchClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    fn with_connector(connector: C, keep_alive: bool) -> Self {
        let mut builder = Client::builder();
        if !keep_alive {
            builder.pool_max_idle_per_host(0);
        }
        Self {
            client: builder.build(connector),
            keep_alive,
        }
    }

    /// Issue a GET and return the body. Anything but 200 is an error.
    pub async fn get(&self, url: &str) -> Result<Bytes, BenchError> {
        let mut req = Request::get(url);
        if !self.keep_alive {
            req = req.header(CONNECTION, "close");
        }
        let res = self.client.request(req.body(Body::empty())?).await?;
        if res.status() != StatusCode::OK {
            return Err(BenchError::UnexpectedStatus(res.status()));
        }
        Ok(hyper::body::to_bytes(res.into_body()).await?)
    }
}
