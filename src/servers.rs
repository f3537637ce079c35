//! Server registry: at most one listener per transport kind.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{watch, OnceCell};
use tracing::info;

use crate::config::{BenchConfig, TransportKind};
use crate::error::BenchError;
use crate::types::ShutdownSignal;
use crate::{grpc, http, rpc};

/// Holds the listening address of every started server.
///
/// Each slot is an async once-cell, so concurrent first use from several tasks
/// still binds exactly once. Slots are never reset; dropping the registry or
/// calling [`ServerRegistry::shutdown`] stops all accept loops.
pub struct ServerRegistry {
    config: BenchConfig,
    shutdown_tx: watch::Sender<bool>,
    http: OnceCell<SocketAddr>,
    tcp_rpc: OnceCell<SocketAddr>,
    json_rpc: OnceCell<SocketAddr>,
    http_rpc: OnceCell<SocketAddr>,
    grpc: OnceCell<SocketAddr>,
    https: OnceCell<SocketAddr>,
}

impl ServerRegistry {
    pub fn new(config: BenchConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            http: OnceCell::new(),
            tcp_rpc: OnceCell::new(),
            json_rpc: OnceCell::new(),
            http_rpc: OnceCell::new(),
            grpc: OnceCell::new(),
            https: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    fn slot(&self, kind: TransportKind) -> &OnceCell<SocketAddr> {
        match kind {
            TransportKind::Http => &self.http,
            TransportKind::TcpRpc => &self.tcp_rpc,
            TransportKind::JsonRpc => &self.json_rpc,
            TransportKind::HttpRpc => &self.http_rpc,
            TransportKind::Grpc => &self.grpc,
            TransportKind::Https => &self.https,
        }
    }

    /// Address of a started server, `None` while unstarted.
    pub fn addr(&self, kind: TransportKind) -> Option<SocketAddr> {
        self.slot(kind).get().copied()
    }

    /// Start the server for `kind` unless it is already listening, and return
    /// its bound address. Bind and TLS setup failures are returned and leave
    /// the slot unstarted.
    pub async fn start(&self, kind: TransportKind) -> Result<SocketAddr, BenchError> {
        let addr = self
            .slot(kind)
            .get_or_try_init(|| launch(kind, &self.config, self.shutdown_tx.subscribe()))
            .await?;
        Ok(*addr)
    }

    /// Ask every accept loop to stop. Established connections are left to
    /// finish on their own.
    pub fn shutdown(&self) {
        info!("Stopping benchmark servers");
        self.shutdown_tx.send_replace(true);
    }
}

async fn launch(
    kind: TransportKind,
    config: &BenchConfig,
    shutdown: ShutdownSignal,
) -> Result<SocketAddr, BenchError> {
    // TLS material is loaded before binding so a failure leaves the port free.
    let acceptor = match kind {
        TransportKind::Https => Some(http::load_acceptor(&config.cert_path, &config.key_path)?),
        _ => None,
    };

    let listener = TcpListener::bind(config.addr(kind)?).await?;
    info!("Starting {} server", kind.label());

    match (kind, acceptor) {
        (TransportKind::Https, Some(acceptor)) => {
            http::spawn_https_server(listener, acceptor, shutdown)
        }
        (TransportKind::Http, _) => http::spawn_http_server(listener, shutdown),
        (TransportKind::TcpRpc, _) => rpc::binary::spawn_server(listener, shutdown),
        (TransportKind::JsonRpc, _) => rpc::json::spawn_server(listener, shutdown),
        (TransportKind::HttpRpc, _) => rpc::http::spawn_server(listener, shutdown),
        (TransportKind::Grpc, _) => grpc::spawn_server(listener, shutdown),
        (TransportKind::Https, None) => Err(BenchError::Config(
            "HTTPS server requires a TLS acceptor".to_string(),
        )),
    }
}
