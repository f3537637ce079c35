use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wirebench::benchmarks::{self, Benchmark};
use wirebench::certs::{self, DEFAULT_SUBJECT_NAMES};
use wirebench::harness::RunMode;
use wirebench::report::Report;
use wirebench::{BenchConfig, ServerRegistry};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    http_port: Option<u16>,
    #[arg(long)]
    tcp_rpc_port: Option<u16>,
    #[arg(long)]
    json_rpc_port: Option<u16>,
    #[arg(long)]
    http_rpc_port: Option<u16>,
    #[arg(long)]
    grpc_port: Option<u16>,
    #[arg(long)]
    https_port: Option<u16>,
    #[arg(long, help = "Path to TLS certificate file")]
    cert_path: Option<PathBuf>,
    #[arg(long, help = "Path to TLS private key file")]
    key_path: Option<PathBuf>,

    /// Target duration of the final run of each benchmark, in milliseconds
    #[arg(long, default_value = "1000")]
    bench_time_ms: u64,
    /// Run each benchmark once with exactly this many iterations
    #[arg(long, conflicts_with = "bench_time_ms")]
    iterations: Option<u64>,
    /// Only run benchmarks whose name contains this (case-insensitive)
    #[arg(long)]
    filter: Option<String>,
    /// Print a JSON report instead of one line per benchmark
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the benchmarks (default)
    Run,

    /// List benchmark names
    List,

    /// Generate a self-signed certificate for the HTTPS benchmark
    GenCerts {
        #[arg(long, default_value = "https-server.crt", help = "Path to TLS certificate file")]
        cert_path: PathBuf,
        #[arg(long, default_value = "https-server.key", help = "Path to TLS private key file")]
        key_path: PathBuf,
    },
}

impl Args {
    fn bench_config(&self) -> Result<BenchConfig, wirebench::BenchError> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        let ports = [
            (self.http_port, &mut config.http_port),
            (self.tcp_rpc_port, &mut config.tcp_rpc_port),
            (self.json_rpc_port, &mut config.json_rpc_port),
            (self.http_rpc_port, &mut config.http_rpc_port),
            (self.grpc_port, &mut config.grpc_port),
            (self.https_port, &mut config.https_port),
        ];
        for (flag, port) in ports {
            if let Some(value) = flag {
                *port = value;
            }
        }
        if let Some(path) = &self.cert_path {
            config.cert_path = path.clone();
        }
        if let Some(path) = &self.key_path {
            config.key_path = path.clone();
        }
        Ok(config)
    }

    fn run_mode(&self) -> RunMode {
        match self.iterations {
            Some(n) => RunMode::Fixed(n),
            None => RunMode::Scaled(Duration::from_millis(self.bench_time_ms)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match &args.command {
        Some(Command::List) => {
            for bench in Benchmark::ALL {
                println!("Benchmark{}", bench.name());
            }
            return Ok(());
        }
        Some(Command::GenCerts {
            cert_path,
            key_path,
        }) => {
            certs::generate_self_signed_cert(cert_path, key_path, &DEFAULT_SUBJECT_NAMES)?;
            return Ok(());
        }
        Some(Command::Run) | None => {}
    }

    let config = args.bench_config()?;
    let registry = ServerRegistry::new(config);
    let started_at = chrono::Utc::now();

    let outcome = tokio::select! {
        outcome = benchmarks::run_all(&registry, args.run_mode(), args.filter.as_deref()) => outcome,
        interrupted = signal::ctrl_c() => {
            if let Err(e) = interrupted {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Interrupted");
            registry.shutdown();
            std::process::exit(130);
        }
    };
    registry.shutdown();

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            error!("Benchmark aborted: {}", e);
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", Report::new(started_at, results).to_json()?);
    } else {
        for result in &results {
            println!("{}", result);
        }
    }

    Ok(())
}
