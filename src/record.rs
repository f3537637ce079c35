use serde::{Deserialize, Serialize};

use crate::proto::AgentData;

/// The fixed sample record every benchmark serializes or transmits.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub hostname: String,
    pub status: String,
    pub timestamp: i64,
    pub lsns: Vec<String>,
}

/// Build the fixture record. Every call returns a fresh, independent value so
/// benchmarks and server responses never share state.
pub fn generate_record() -> Record {
    Record {
        hostname: "10.64.6.138".to_string(),
        status: "In Progress".to_string(),
        timestamp: 1282368345,
        lsns: vec!["16/B374D848".to_string(), "16/B374D010".to_string()],
    }
}

impl From<Record> for AgentData {
    fn from(record: Record) -> Self {
        AgentData {
            hostname: record.hostname,
            status: record.status,
            timestamp: record.timestamp,
            lsns: record.lsns,
        }
    }
}

impl From<&Record> for AgentData {
    fn from(record: &Record) -> Self {
        AgentData::from(record.clone())
    }
}

impl From<AgentData> for Record {
    fn from(data: AgentData) -> Self {
        Record {
            hostname: data.hostname,
            status: data.status,
            timestamp: data.timestamp,
            lsns: data.lsns,
        }
    }
}
