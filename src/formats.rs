//! Format adapters: one encode/decode pair per serialization representation.

use prost::Message;

use crate::error::BenchError;
use crate::proto::AgentData;
use crate::record::Record;

pub trait RecordFormat: Send + Sync {
    fn name(&self) -> &'static str;
    fn encode(&self, record: &Record) -> Result<Vec<u8>, BenchError>;
    fn decode(&self, bytes: &[u8]) -> Result<Record, BenchError>;
}

/// Textual key/value encoding.
pub struct JsonFormat;

impl RecordFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, BenchError> {
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, BenchError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Self-describing tagged fields through the generated `AgentData` message.
pub struct ProtobufFormat;

impl RecordFormat for ProtobufFormat {
    fn name(&self) -> &'static str {
        "ProtoBuf"
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, BenchError> {
        Ok(AgentData::from(record).encode_to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, BenchError> {
        Ok(AgentData::decode(bytes)?.into())
    }
}

/// Plain structural binary dump.
pub struct BincodeFormat;

impl RecordFormat for BincodeFormat {
    fn name(&self) -> &'static str {
        "Bincode"
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, BenchError> {
        Ok(bincode::serialize(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, BenchError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Json,
    Protobuf,
    Bincode,
}

impl FormatKind {
    pub const ALL: [FormatKind; 3] = [FormatKind::Json, FormatKind::Protobuf, FormatKind::Bincode];

    pub fn adapter(self) -> &'static dyn RecordFormat {
        match self {
            FormatKind::Json => &JsonFormat,
            FormatKind::Protobuf => &ProtobufFormat,
            FormatKind::Bincode => &BincodeFormat,
        }
    }
}
