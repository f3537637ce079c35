//! gRPC transport: `agent.Agent/Fetch` returns the fixture record.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tonic::transport::{Channel, Server};
use tonic::{Request, Response, Status};
use tracing::{error, info};

use crate::accept_stream::tcp_accept_stream;
use crate::error::BenchError;
use crate::proto::agent_client::AgentClient;
use crate::proto::agent_server::{Agent, AgentServer};
use crate::proto::{AgentData, AgentRequest};
use crate::record::{generate_record, Record};
use crate::types::{GenericBoxedStream, ShutdownSignal};

#[derive(Debug, Default)]
pub struct AgentService;

#[tonic::async_trait]
impl Agent for AgentService {
    async fn fetch(&self, _request: Request<AgentRequest>) -> Result<Response<AgentData>, Status> {
        Ok(Response::new(generate_record().into()))
    }
}

pub fn spawn_server(listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<SocketAddr, BenchError> {
    let addr = listener.local_addr()?;
    info!("gRPC listening on {}", addr);

    let incoming: GenericBoxedStream<Result<TcpStream, std::io::Error>> =
        Box::pin(tcp_accept_stream(listener));
    tokio::spawn(async move {
        let signal = async move {
            let _ = shutdown.wait_for(|stopped| *stopped).await;
            info!("grpc listener shutdown requested");
        };
        let served = Server::builder()
            .add_service(AgentServer::new(AgentService))
            .serve_with_incoming_shutdown(incoming, signal)
            .await;
        if let Err(e) = served {
            error!("gRPC server error: {}", e);
        }
    });

    Ok(addr)
}

pub struct AgentRpcClient {
    client: AgentClient<Channel>,
}

impl AgentRpcClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, BenchError> {
        let client = AgentClient::connect(format!("http://{}", addr)).await?;
        Ok(Self { client })
    }

    pub async fn fetch(&mut self) -> Result<Record, BenchError> {
        let request = Request::new(AgentRequest {
            data: String::new(),
        });
        let reply = self.client.fetch(request).await?;
        Ok(reply.into_inner().into())
    }
}
