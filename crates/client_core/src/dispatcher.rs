//! Operator intents to protocol commands.

use std::sync::Arc;

use shared::{domain::AgentId, protocol::ClientCommand};
use tracing::{info, warn};

use crate::{codec::encode_command, error::DispatchError, transport::Transport};

/// Image used by the orchestrator when none is given.
pub const DEFAULT_IMAGE: &str = "hello-world";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start(AgentId),
    Stop(AgentId),
    Restart(AgentId),
    Retire(AgentId),
    FetchLogs(AgentId),
    CreateAgent { name: String, image: Option<String> },
}

impl Intent {
    /// Validate the intent and build the command it stands for.
    pub fn into_command(self, default_image: &str) -> Result<ClientCommand, DispatchError> {
        let command = match self {
            Intent::Start(id) => ClientCommand::Start {
                container_id: require_id(id)?,
            },
            Intent::Stop(id) => ClientCommand::Stop {
                container_id: require_id(id)?,
            },
            Intent::Restart(id) => ClientCommand::Restart {
                container_id: require_id(id)?,
            },
            Intent::Retire(id) => ClientCommand::RetireAgent {
                container_id: require_id(id)?,
            },
            Intent::FetchLogs(id) => ClientCommand::GetLogs {
                container_id: require_id(id)?,
            },
            Intent::CreateAgent { name, image } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(DispatchError::Validation(
                        "agent name is required".to_string(),
                    ));
                }
                let image = image
                    .as_deref()
                    .map(str::trim)
                    .filter(|image| !image.is_empty())
                    .unwrap_or(default_image);
                ClientCommand::CreateAgent {
                    name: name.to_string(),
                    image: image.to_string(),
                }
            }
        };
        Ok(command)
    }
}

fn require_id(id: AgentId) -> Result<AgentId, DispatchError> {
    if id.as_str().trim().is_empty() {
        return Err(DispatchError::Validation(
            "container id is required".to_string(),
        ));
    }
    Ok(id)
}

/// Sends commands over an injected transport. Fire-and-forget: nothing is
/// retried or queued.
#[derive(Clone)]
pub struct CommandDispatcher {
    transport: Arc<dyn Transport>,
    default_image: String,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            default_image: DEFAULT_IMAGE.to_string(),
        }
    }

    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = image.into();
        self
    }

    pub async fn dispatch(&self, intent: Intent) -> Result<ClientCommand, DispatchError> {
        let command = intent.into_command(&self.default_image)?;
        let text = encode_command(&command)?;
        let action = command.action();
        let agent_id = command.container_id().map(AgentId::short).unwrap_or("-");

        match self.transport.send_text(text).await {
            Ok(()) => {
                info!(action, agent_id, "command sent");
                Ok(command)
            }
            Err(error) => {
                warn!(action, agent_id, %error, "command not sent");
                Err(error.into())
            }
        }
    }

    pub async fn start(&self, id: impl Into<AgentId>) -> Result<ClientCommand, DispatchError> {
        self.dispatch(Intent::Start(id.into())).await
    }

    pub async fn stop(&self, id: impl Into<AgentId>) -> Result<ClientCommand, DispatchError> {
        self.dispatch(Intent::Stop(id.into())).await
    }

    pub async fn restart(&self, id: impl Into<AgentId>) -> Result<ClientCommand, DispatchError> {
        self.dispatch(Intent::Restart(id.into())).await
    }

    pub async fn retire(&self, id: impl Into<AgentId>) -> Result<ClientCommand, DispatchError> {
        self.dispatch(Intent::Retire(id.into())).await
    }

    pub async fn fetch_logs(
        &self,
        id: impl Into<AgentId>,
    ) -> Result<ClientCommand, DispatchError> {
        self.dispatch(Intent::FetchLogs(id.into())).await
    }

    pub async fn create_agent(
        &self,
        name: impl Into<String>,
        image: Option<String>,
    ) -> Result<ClientCommand, DispatchError> {
        self.dispatch(Intent::CreateAgent {
            name: name.into(),
            image,
        })
        .await
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
