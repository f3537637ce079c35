//! The named benchmark set and the driver that runs it.

use tracing::{debug, info};

use crate::config::TransportKind;
use crate::error::BenchError;
use crate::formats::FormatKind;
use crate::grpc::AgentRpcClient;
use crate::harness::{BenchResult, Bencher, RunMode};
use crate::http::HttpBenchClient;
use crate::record::generate_record;
use crate::rpc::binary::BinaryRpcClient;
use crate::rpc::http::dial_http;
use crate::rpc::json::JsonRpcClient;
use crate::rpc::{RECORD_METHOD, SERVE_METHOD, SERVE_REPLY};
use crate::servers::ServerRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benchmark {
    JsonMarshal,
    JsonUnmarshal,
    ProtobufMarshal,
    ProtobufUnmarshal,
    BincodeMarshal,
    BincodeUnmarshal,
    TcpRpc,
    TcpRpcRecord,
    JsonRpc,
    HttpRpc,
    Grpc,
    Http,
    HttpNoKeepAlive,
    HttpsNoKeepAlive,
}

impl Benchmark {
    pub const ALL: [Benchmark; 14] = [
        Benchmark::JsonMarshal,
        Benchmark::JsonUnmarshal,
        Benchmark::ProtobufMarshal,
        Benchmark::ProtobufUnmarshal,
        Benchmark::BincodeMarshal,
        Benchmark::BincodeUnmarshal,
        Benchmark::TcpRpc,
        Benchmark::TcpRpcRecord,
        Benchmark::JsonRpc,
        Benchmark::HttpRpc,
        Benchmark::Grpc,
        Benchmark::Http,
        Benchmark::HttpNoKeepAlive,
        Benchmark::HttpsNoKeepAlive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Benchmark::JsonMarshal => "JSONMarshal",
            Benchmark::JsonUnmarshal => "JSONUnmarshal",
            Benchmark::ProtobufMarshal => "ProtoBufMarshal",
            Benchmark::ProtobufUnmarshal => "ProtoBufUnmarshal",
            Benchmark::BincodeMarshal => "BincodeMarshal",
            Benchmark::BincodeUnmarshal => "BincodeUnmarshal",
            Benchmark::TcpRpc => "TCPRPC",
            Benchmark::TcpRpcRecord => "TCPRPCRecord",
            Benchmark::JsonRpc => "JSONRPC",
            Benchmark::HttpRpc => "HTTPRPC",
            Benchmark::Grpc => "GRPC",
            Benchmark::Http => "HTTP",
            Benchmark::HttpNoKeepAlive => "HTTPNoKeepAlive",
            Benchmark::HttpsNoKeepAlive => "HTTPSNoKeepAlive",
        }
    }

    /// The server this benchmark talks to, if any.
    pub fn transport(self) -> Option<TransportKind> {
        match self {
            Benchmark::JsonMarshal
            | Benchmark::JsonUnmarshal
            | Benchmark::ProtobufMarshal
            | Benchmark::ProtobufUnmarshal
            | Benchmark::BincodeMarshal
            | Benchmark::BincodeUnmarshal => None,
            Benchmark::TcpRpc | Benchmark::TcpRpcRecord => Some(TransportKind::TcpRpc),
            Benchmark::JsonRpc => Some(TransportKind::JsonRpc),
            Benchmark::HttpRpc => Some(TransportKind::HttpRpc),
            Benchmark::Grpc => Some(TransportKind::Grpc),
            Benchmark::Http | Benchmark::HttpNoKeepAlive => Some(TransportKind::Http),
            Benchmark::HttpsNoKeepAlive => Some(TransportKind::Https),
        }
    }

    /// Case-insensitive substring match on the name.
    pub fn matches(self, filter: &str) -> bool {
        self.name().to_lowercase().contains(&filter.to_lowercase())
    }

    /// Execute one run: setup, reset the clock, `b.n()` timed calls.
    pub async fn run(self, registry: &ServerRegistry, b: &mut Bencher) -> Result<(), BenchError> {
        match self {
            Benchmark::JsonMarshal => marshal(FormatKind::Json, b),
            Benchmark::JsonUnmarshal => unmarshal(FormatKind::Json, b),
            Benchmark::ProtobufMarshal => marshal(FormatKind::Protobuf, b),
            Benchmark::ProtobufUnmarshal => unmarshal(FormatKind::Protobuf, b),
            Benchmark::BincodeMarshal => marshal(FormatKind::Bincode, b),
            Benchmark::BincodeUnmarshal => unmarshal(FormatKind::Bincode, b),
            Benchmark::TcpRpc => {
                let addr = registry.start(TransportKind::TcpRpc).await?;
                let mut client = BinaryRpcClient::dial(addr).await?;
                b.reset_timer();
                for n in 0..b.n() {
                    client.call(SERVE_METHOD, n as i64).await?;
                }
                b.stop_timer();
                Ok(())
            }
            Benchmark::TcpRpcRecord => {
                let addr = registry.start(TransportKind::TcpRpc).await?;
                let mut client = BinaryRpcClient::dial(addr).await?;
                b.reset_timer();
                for n in 0..b.n() {
                    client.call(RECORD_METHOD, n as i64).await?.into_record()?;
                }
                b.stop_timer();
                Ok(())
            }
            Benchmark::JsonRpc => {
                let addr = registry.start(TransportKind::JsonRpc).await?;
                let mut client = JsonRpcClient::dial(addr).await?;
                b.reset_timer();
                for n in 0..b.n() {
                    client.call(SERVE_METHOD, n as i64).await?;
                }
                b.stop_timer();
                Ok(())
            }
            Benchmark::HttpRpc => {
                let addr = registry.start(TransportKind::HttpRpc).await?;
                let mut client = dial_http(addr).await?;
                b.reset_timer();
                for n in 0..b.n() {
                    client.call(SERVE_METHOD, n as i64).await?;
                }
                b.stop_timer();
                Ok(())
            }
            Benchmark::Grpc => {
                let addr = registry.start(TransportKind::Grpc).await?;
                let mut client = AgentRpcClient::connect(addr).await?;
                b.reset_timer();
                for _ in 0..b.n() {
                    client.fetch().await?;
                }
                b.stop_timer();
                Ok(())
            }
            Benchmark::Http | Benchmark::HttpNoKeepAlive => {
                let addr = registry.start(TransportKind::Http).await?;
                let client = HttpBenchClient::plain(self == Benchmark::Http);
                let url = format!("http://{}/", addr);
                b.reset_timer();
                for _ in 0..b.n() {
                    client.get(&url).await?;
                }
                b.stop_timer();
                Ok(())
            }
            Benchmark::HttpsNoKeepAlive => {
                let addr = registry.start(TransportKind::Https).await?;
                let client = HttpBenchClient::insecure_tls(false)?;
                let url = format!("https://{}/", addr);
                b.reset_timer();
                for _ in 0..b.n() {
                    client.get(&url).await?;
                }
                b.stop_timer();
                Ok(())
            }
        }
    }
}

fn marshal(kind: FormatKind, b: &mut Bencher) -> Result<(), BenchError> {
    let format = kind.adapter();
    let record = generate_record();
    b.iter(|| format.encode(&record))
}

fn unmarshal(kind: FormatKind, b: &mut Bencher) -> Result<(), BenchError> {
    let format = kind.adapter();
    let encoded = format.encode(&generate_record())?;
    b.iter(|| format.decode(&encoded))
}

/// Run `bench` under `mode` and report the final run.
pub async fn run_benchmark(
    bench: Benchmark,
    registry: &ServerRegistry,
    mode: RunMode,
) -> Result<BenchResult, BenchError> {
    let mut n = mode.initial();
    loop {
        let mut b = Bencher::new(n);
        bench.run(registry, &mut b).await?;
        debug!("{}: n={} elapsed={:?}", bench.name(), b.n(), b.elapsed());
        match mode.next(&b) {
            Some(next) => n = next,
            None => return Ok(BenchResult::new(bench.name(), &b)),
        }
    }
}

/// Benchmarks accepted by `filter`, in declaration order.
pub fn selected(filter: Option<&str>) -> Vec<Benchmark> {
    Benchmark::ALL
        .into_iter()
        .filter(|bench| filter.map_or(true, |f| bench.matches(f)))
        .collect()
}

/// Distinct transports needed by `benches`, in first-use order.
pub fn required_transports(benches: &[Benchmark]) -> Vec<TransportKind> {
    let mut kinds = Vec::new();
    for kind in benches.iter().filter_map(|bench| bench.transport()) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

/// Run every benchmark accepted by `filter`, in declaration order. Each
/// transport involved is checked with [`verify_transport`] before any timing
/// starts. The first failure aborts the whole run.
pub async fn run_all(
    registry: &ServerRegistry,
    mode: RunMode,
    filter: Option<&str>,
) -> Result<Vec<BenchResult>, BenchError> {
    let benches = selected(filter);
    for kind in required_transports(&benches) {
        verify_transport(registry, kind).await?;
        debug!("{} transport verified", kind.label());
    }

    let mut results = Vec::new();
    for bench in benches {
        info!("Running {}", bench.name());
        results.push(run_benchmark(bench, registry, mode).await?);
    }
    Ok(results)
}

/// Start the server for `kind` if needed and check that it hands back the
/// fixture unchanged.
pub async fn verify_transport(registry: &ServerRegistry, kind: TransportKind) -> Result<(), BenchError> {
    let addr = registry.start(kind).await?;
    let expected = generate_record();
    let matches = match kind {
        TransportKind::TcpRpc => {
            let mut client = BinaryRpcClient::dial(addr).await?;
            client.call(SERVE_METHOD, 0).await?.into_text()? == SERVE_REPLY
                && client.call(RECORD_METHOD, 0).await?.into_record()? == expected
        }
        TransportKind::JsonRpc => {
            let mut client = JsonRpcClient::dial(addr).await?;
            client.call(RECORD_METHOD, 0).await?.into_record()? == expected
        }
        TransportKind::HttpRpc => {
            let mut client = dial_http(addr).await?;
            client.call(RECORD_METHOD, 0).await?.into_record()? == expected
        }
        TransportKind::Grpc => AgentRpcClient::connect(addr).await?.fetch().await? == expected,
        TransportKind::Http => {
            let body = HttpBenchClient::plain(true)
                .get(&format!("http://{}/", addr))
                .await?;
            &body[..] == SERVE_REPLY.as_bytes()
        }
        TransportKind::Https => {
            let body = HttpBenchClient::insecure_tls(false)?
                .get(&format!("https://{}/", addr))
                .await?;
            &body[..] == SERVE_REPLY.as_bytes()
        }
    };
    if matches {
        Ok(())
    } else {
        Err(BenchError::UnexpectedReply(format!(
            "{} returned something other than the fixture",
            kind.label()
        )))
    }
}
