use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// One listener per transport variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Http,
    TcpRpc,
    JsonRpc,
    HttpRpc,
    Grpc,
    Https,
}

impl TransportKind {
    pub const ALL: [TransportKind; 6] = [
        TransportKind::Http,
        TransportKind::TcpRpc,
        TransportKind::JsonRpc,
        TransportKind::HttpRpc,
        TransportKind::Grpc,
        TransportKind::Https,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::TcpRpc => "tcp-rpc",
            TransportKind::JsonRpc => "json-rpc",
            TransportKind::HttpRpc => "http-rpc",
            TransportKind::Grpc => "grpc",
            TransportKind::Https => "https",
        }
    }
}

/// Where every server binds and where the HTTPS material lives.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BenchConfig {
    pub host: String,
    pub http_port: u16,
    pub tcp_rpc_port: u16,
    pub json_rpc_port: u16,
    pub http_rpc_port: u16,
    pub grpc_port: u16,
    pub https_port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: 8080,
            tcp_rpc_port: 8081,
            json_rpc_port: 8082,
            http_rpc_port: 8083,
            grpc_port: 8084,
            https_port: 8443,
            cert_path: PathBuf::from("https-server.crt"),
            key_path: PathBuf::from("https-server.key"),
        }
    }
}

impl BenchConfig {
    /// Every port set to 0, so the OS picks a free one per listener.
    pub fn ephemeral() -> Self {
        Self {
            http_port: 0,
            tcp_rpc_port: 0,
            json_rpc_port: 0,
            http_rpc_port: 0,
            grpc_port: 0,
            https_port: 0,
            ..Self::default()
        }
    }

    /// Load a JSON config file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn port(&self, kind: TransportKind) -> u16 {
        match kind {
            TransportKind::Http => self.http_port,
            TransportKind::TcpRpc => self.tcp_rpc_port,
            TransportKind::JsonRpc => self.json_rpc_port,
            TransportKind::HttpRpc => self.http_rpc_port,
            TransportKind::Grpc => self.grpc_port,
            TransportKind::Https => self.https_port,
        }
    }

    pub fn addr(&self, kind: TransportKind) -> Result<SocketAddr, BenchError> {
        let addr = format!("{}:{}", self.host, self.port(kind));
        addr.parse()
            .map_err(|e| BenchError::Config(format!("invalid address '{}': {}", addr, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_ports() {
        let config = BenchConfig::default();
        assert_eq!(config.port(TransportKind::Http), 8080);
        assert_eq!(config.port(TransportKind::TcpRpc), 8081);
        assert_eq!(config.port(TransportKind::JsonRpc), 8082);
        assert_eq!(config.port(TransportKind::HttpRpc), 8083);
        assert_eq!(config.port(TransportKind::Grpc), 8084);
        assert_eq!(config.port(TransportKind::Https), 8443);
        assert_eq!(
            config.addr(TransportKind::Grpc).unwrap(),
            "127.0.0.1:8084".parse().unwrap()
        );
    }

    #[test]
    fn test_ephemeral_keeps_host_and_paths() {
        let config = BenchConfig::ephemeral();
        for kind in TransportKind::ALL {
            assert_eq!(config.port(kind), 0);
        }
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.cert_path, PathBuf::from("https-server.crt"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "http_port": 9090, "key_path": "/tmp/k.pem" }}"#).unwrap();

        let config = BenchConfig::load(file.path()).unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.key_path, PathBuf::from("/tmp/k.pem"));
        assert_eq!(config.grpc_port, 8084);
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let config = BenchConfig {
            host: "not a host".to_string(),
            ..BenchConfig::default()
        };
        assert!(matches!(
            config.addr(TransportKind::Http),
            Err(BenchError::Config(_))
        ));
    }
}
