//! Types and service stubs generated from `proto/agent.proto`.

tonic::include_proto!("agent");
