use serde::{Deserialize, Serialize};

use crate::{
    domain::{AgentId, AgentRecord},
    error::ApiError,
};

/// Frames pushed by the orchestrator over `/ws`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Complete fleet state; always replaces, never a delta.
    FullUpdate {
        agents: Vec<AgentRecord>,
    },
    Logs {
        container_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
        #[serde(default)]
        logs: Option<String>,
    },
    CommandReceipt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error(ApiError),
}

impl ServerEvent {
    /// Values of the `type` tag this protocol understands.
    pub const KNOWN_TYPES: [&'static str; 4] = ["full_update", "logs", "command_receipt", "error"];

    pub fn is_known_type(tag: &str) -> bool {
        Self::KNOWN_TYPES.contains(&tag)
    }
}

/// Commands sent to the orchestrator. Serialized as
/// `{"action": ..., "container_id": ...}` with the tag first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    Start { container_id: AgentId },
    Stop { container_id: AgentId },
    Restart { container_id: AgentId },
    RetireAgent { container_id: AgentId },
    GetLogs { container_id: AgentId },
    CreateAgent { name: String, image: String },
}

impl ClientCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Stop { .. } => "stop",
            Self::Restart { .. } => "restart",
            Self::RetireAgent { .. } => "retire_agent",
            Self::GetLogs { .. } => "get_logs",
            Self::CreateAgent { .. } => "create_agent",
        }
    }

    pub fn container_id(&self) -> Option<&AgentId> {
        match self {
            Self::Start { container_id }
            | Self::Stop { container_id }
            | Self::Restart { container_id }
            | Self::RetireAgent { container_id }
            | Self::GetLogs { container_id } => Some(container_id),
            Self::CreateAgent { .. } => None,
        }
    }
}
