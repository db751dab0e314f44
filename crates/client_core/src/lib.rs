use std::sync::Arc;

use shared::{
    domain::{AgentId, AgentRecord},
    error::ApiError,
    protocol::{ClientCommand, ServerEvent},
};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod log_cache;
pub mod placement;
pub mod registry;
pub mod selection;
pub mod transport;
pub mod zones;

pub use dispatcher::{CommandDispatcher, Intent, DEFAULT_IMAGE};
pub use error::{CodecError, DispatchError, TransportError};
pub use log_cache::{LogCache, LogEntry, LogView};
pub use placement::{Placement, PlacementCache, Position};
pub use registry::{AgentRegistry, ReconcileSummary};
pub use selection::Selection;
pub use transport::{
    ConnectionState, DisconnectedTransport, Transport, TransportEvent, TransportSession,
    DEFAULT_ENDPOINT,
};
pub use zones::Zone;

/// What changed after one inbound event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetUpdate {
    Connection(ConnectionState),
    AgentsReconciled(ReconcileSummary),
    LogsUpdated { agent_id: AgentId },
    CommandReceipt {
        success: Option<bool>,
        message: Option<String>,
    },
    BackendError(ApiError),
}

#[derive(Debug, Clone, Copy)]
pub struct PlacedAgent<'a> {
    pub agent: &'a AgentRecord,
    pub placement: Placement,
    pub selected: bool,
}

/// Read-only view handed to the renderer each frame.
#[derive(Debug, Clone)]
pub struct SceneView<'a> {
    pub connection: &'a ConnectionState,
    pub active: Vec<PlacedAgent<'a>>,
    pub retired: Vec<PlacedAgent<'a>>,
    pub selected: Option<&'a AgentId>,
}

impl<'a> SceneView<'a> {
    pub fn in_zone(&self, zone: Zone) -> impl Iterator<Item = &PlacedAgent<'a>> {
        self.active
            .iter()
            .chain(self.retired.iter())
            .filter(move |placed| placed.placement.zone == zone)
    }
}

/// Client-side fleet state.
///
/// Registry, placements and log cache change only through
/// [`FleetState::apply_transport_event`] and [`FleetState::apply_server_event`];
/// selection changes only through [`FleetState::select`]. Everything else is
/// a read.
#[derive(Debug, Clone)]
pub struct FleetState {
    connection: ConnectionState,
    registry: AgentRegistry,
    placements: PlacementCache,
    selection: Selection,
    logs: LogCache,
}

impl Default for FleetState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Connecting,
            registry: AgentRegistry::new(),
            placements: PlacementCache::new(),
            selection: Selection::default(),
            logs: LogCache::new(),
        }
    }
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_transport_event(&mut self, event: TransportEvent) -> Option<FleetUpdate> {
        match event {
            TransportEvent::Opened => Some(self.set_connection(ConnectionState::Open)),
            TransportEvent::Closed => Some(self.set_connection(ConnectionState::Closed)),
            TransportEvent::Errored(reason) => {
                Some(self.set_connection(ConnectionState::Errored(reason)))
            }
            TransportEvent::Frame(text) => {
                codec::decode_or_discard(&text).map(|event| self.apply_server_event(event))
            }
        }
    }

    pub fn apply_server_event(&mut self, event: ServerEvent) -> FleetUpdate {
        match event {
            ServerEvent::FullUpdate { agents } => {
                let summary = self.registry.apply_snapshot(agents);
                self.placements.sync(self.registry.iter());
                FleetUpdate::AgentsReconciled(summary)
            }
            ServerEvent::Logs {
                container_id,
                success,
                logs,
            } => {
                let entry = self.logs.record(container_id.clone(), success, logs);
                if matches!(entry, LogEntry::Failed { .. }) {
                    warn!(agent_id = container_id.short(), "log fetch failed");
                }
                FleetUpdate::LogsUpdated {
                    agent_id: container_id,
                }
            }
            ServerEvent::CommandReceipt { success, message } => {
                info!(
                    success = success.unwrap_or(true),
                    message = message.as_deref().unwrap_or_default(),
                    "command receipt"
                );
                FleetUpdate::CommandReceipt { success, message }
            }
            ServerEvent::Error(error) => {
                warn!(message = %error.message, "orchestrator reported an error");
                FleetUpdate::BackendError(error)
            }
        }
    }

    fn set_connection(&mut self, state: ConnectionState) -> FleetUpdate {
        self.connection = state.clone();
        FleetUpdate::Connection(state)
    }

    /// Toggle selection of `id`, returning what is selected afterwards.
    pub fn select(&mut self, id: &AgentId) -> Option<&AgentId> {
        self.selection.toggle(id)
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn active_agents(&self) -> &[AgentRecord] {
        self.registry.active()
    }

    pub fn retired_agents(&self) -> &[AgentRecord] {
        self.registry.retired()
    }

    pub fn placement(&self, id: &AgentId) -> Option<Placement> {
        self.placements.get(id)
    }

    pub fn selected(&self) -> Option<&AgentId> {
        self.selection.selected()
    }

    /// The selected agent, if it is still in the registry.
    pub fn selected_agent(&self) -> Option<&AgentRecord> {
        self.selection.selected().and_then(|id| self.registry.get(id))
    }

    pub fn logs(&self, id: &AgentId) -> LogView<'_> {
        self.logs.view(id)
    }

    pub fn log_entry(&self, id: &AgentId) -> Option<&LogEntry> {
        self.logs.get(id)
    }

    pub fn scene(&self) -> SceneView<'_> {
        SceneView {
            connection: &self.connection,
            active: self.placed(self.registry.active()),
            retired: self.placed(self.registry.retired()),
            selected: self.selection.selected(),
        }
    }

    fn placed<'a>(&'a self, agents: &'a [AgentRecord]) -> Vec<PlacedAgent<'a>> {
        agents
            .iter()
            .map(|agent| PlacedAgent {
                agent,
                placement: self
                    .placements
                    .get(&agent.id)
                    .unwrap_or_else(|| placement::place(agent)),
                selected: self.selection.is_selected(&agent.id),
            })
            .collect()
    }
}

/// Owns one transport session, its command dispatcher and the fleet state fed
/// by it.
pub struct FleetClient {
    session: Arc<TransportSession>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    dispatcher: CommandDispatcher,
    state: FleetState,
}

impl FleetClient {
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let (session, events) = TransportSession::connect(endpoint).await?;
        let dispatcher = CommandDispatcher::new(Arc::clone(&session) as Arc<dyn Transport>);
        Ok(Self {
            session,
            events,
            dispatcher,
            state: FleetState::new(),
        })
    }

    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.dispatcher = self.dispatcher.with_default_image(image);
        self
    }

    /// Wait for the next inbound event that changes something and apply it.
    ///
    /// Returns `None` once the session has closed or errored.
    pub async fn next_update(&mut self) -> Option<FleetUpdate> {
        if self.state.connection().is_terminal() {
            return None;
        }
        loop {
            let event = self.events.recv().await?;
            if let Some(update) = self.state.apply_transport_event(event) {
                return Some(update);
            }
        }
    }

    pub fn state(&self) -> &FleetState {
        &self.state
    }

    pub fn select(&mut self, id: &AgentId) -> Option<&AgentId> {
        self.state.select(id)
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub async fn dispatch(&self, intent: Intent) -> Result<ClientCommand, DispatchError> {
        self.dispatcher.dispatch(intent).await
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
