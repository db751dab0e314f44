use super::*;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{net::TcpListener, time::timeout};

fn full_update(agents: Value) -> TransportEvent {
    TransportEvent::Frame(json!({ "type": "full_update", "agents": agents }).to_string())
}

fn offsets(id: &str) -> (f64, f64) {
    placement::identity_offset(&AgentId::new(id))
}

#[test]
fn running_agent_is_placed_in_echo_plaza_then_retired_to_omega_gate() {
    let mut state = FleetState::new();
    let update = state.apply_transport_event(full_update(json!([
        { "id": "abcd1234ef", "name": "x", "status": "running", "active": true }
    ])));
    assert!(matches!(update, Some(FleetUpdate::AgentsReconciled(_))));

    let id = AgentId::new("abcd1234ef");
    let (dx, dz) = offsets("abcd1234ef");
    let placed = state.placement(&id).expect("placed");
    assert_eq!(placed.zone, Zone::EchoPlaza);
    assert_eq!(placed.position, Position::new(6.0 + dx, 0.5, -6.0 + dz));
    assert_eq!(state.active_agents()[0].name, "x");

    state.apply_transport_event(full_update(json!([
        { "id": "abcd1234ef", "name": "x", "status": "running", "active": false }
    ])));

    assert!(state.active_agents().is_empty());
    assert_eq!(state.retired_agents().len(), 1);
    let retired = state.placement(&id).expect("still placed");
    assert_eq!(retired.zone, Zone::OmegaGate);
    assert_eq!(retired.position, Position::new(6.0 + dx, 0.5, 6.0 + dz));

    let scene = state.scene();
    assert!(scene.active.is_empty());
    assert_eq!(scene.retired[0].placement, retired);
}

#[test]
fn unrelated_agents_do_not_move() {
    let mut state = FleetState::new();
    state.apply_transport_event(full_update(json!([
        { "id": "11112222", "name": "a", "status": "running", "active": true },
        { "id": "33334444", "name": "b", "status": "paused", "active": true }
    ])));
    let a = AgentId::new("11112222");
    let before = state.placement(&a).expect("a placed");

    state.apply_transport_event(full_update(json!([
        { "id": "55556666", "name": "c", "status": "created", "active": true },
        { "id": "11112222", "name": "a", "status": "running", "active": true },
        { "id": "33334444", "name": "b", "status": "exited", "active": true }
    ])));
    assert_eq!(state.placement(&a), Some(before));

    state.apply_transport_event(full_update(json!([
        { "id": "11112222", "name": "a", "status": "running", "active": true }
    ])));
    assert_eq!(state.placement(&a), Some(before));
    assert_eq!(state.placement(&AgentId::new("33334444")), None);
}

#[test]
fn bad_and_unknown_frames_leave_state_untouched() {
    let mut state = FleetState::new();
    state.apply_transport_event(full_update(json!([
        { "id": "abcd1234", "name": "x", "status": "running", "active": true }
    ])));
    let registry = state.registry().clone();

    for frame in [
        "{broken",
        r#"{"type":"full_update","agents":42}"#,
        r#"{"type":"heartbeat"}"#,
        r#"{"agents":[]}"#,
    ] {
        let update = state.apply_transport_event(TransportEvent::Frame(frame.to_string()));
        assert_eq!(update, None, "frame {frame}");
    }
    assert_eq!(state.registry(), &registry);
}

#[test]
fn receipts_and_backend_errors_are_informational() {
    let mut state = FleetState::new();
    state.apply_transport_event(full_update(json!([
        { "id": "abcd1234", "name": "x", "status": "running", "active": true }
    ])));
    let registry = state.registry().clone();

    let receipt = state.apply_transport_event(TransportEvent::Frame(
        json!({ "type": "command_receipt", "success": true, "message": "ok" }).to_string(),
    ));
    assert_eq!(
        receipt,
        Some(FleetUpdate::CommandReceipt {
            success: Some(true),
            message: Some("ok".into()),
        })
    );

    let error = state.apply_transport_event(TransportEvent::Frame(
        json!({ "type": "error", "message": "Agent name is required." }).to_string(),
    ));
    assert!(matches!(
        error,
        Some(FleetUpdate::BackendError(ref e)) if e.message == "Agent name is required."
    ));
    assert_eq!(state.registry(), &registry);
}

#[test]
fn log_responses_overwrite_per_agent() {
    let mut state = FleetState::new();
    let id = AgentId::new("abcd1234");
    assert_eq!(state.logs(&id), LogView::Loading);

    for text in ["first", "second"] {
        let update = state.apply_transport_event(TransportEvent::Frame(
            json!({ "type": "logs", "container_id": "abcd1234", "success": true, "logs": text })
                .to_string(),
        ));
        assert_eq!(
            update,
            Some(FleetUpdate::LogsUpdated {
                agent_id: id.clone()
            })
        );
    }
    assert_eq!(state.logs(&id), LogView::Text("second"));
    assert_eq!(state.logs(&AgentId::new("other")), LogView::Loading);
}

#[test]
fn selection_is_independent_of_the_registry() {
    let mut state = FleetState::new();
    state.apply_transport_event(full_update(json!([
        { "id": "aaaa0000", "name": "a", "status": "running", "active": true },
        { "id": "bbbb0000", "name": "b", "status": "running", "active": true }
    ])));
    let registry = state.registry().clone();
    let a = AgentId::new("aaaa0000");
    let b = AgentId::new("bbbb0000");

    state.select(&a);
    assert_eq!(state.selected_agent().map(|agent| agent.name.as_str()), Some("a"));
    state.select(&b);
    assert_eq!(state.selected(), Some(&b));
    let scene = state.scene();
    let flagged: Vec<_> = scene
        .active
        .iter()
        .filter(|placed| placed.selected)
        .map(|placed| placed.agent.id.clone())
        .collect();
    assert_eq!(flagged, [b.clone()]);

    state.select(&b);
    assert_eq!(state.selected(), None);
    assert_eq!(state.registry(), &registry);
}

#[test]
fn selection_survives_its_agent_leaving() {
    let mut state = FleetState::new();
    state.apply_transport_event(full_update(json!([
        { "id": "aaaa0000", "name": "a", "status": "running", "active": true }
    ])));
    let a = AgentId::new("aaaa0000");
    state.select(&a);
    state.apply_transport_event(full_update(json!([])));

    assert_eq!(state.selected(), Some(&a));
    assert!(state.selected_agent().is_none());
}

#[test]
fn connection_events_track_state() {
    let mut state = FleetState::new();
    assert_eq!(state.connection(), &ConnectionState::Connecting);
    assert_eq!(
        state.apply_transport_event(TransportEvent::Opened),
        Some(FleetUpdate::Connection(ConnectionState::Open))
    );
    state.apply_transport_event(TransportEvent::Errored("reset".into()));
    assert_eq!(
        state.connection(),
        &ConnectionState::Errored("reset".into())
    );
}

#[test]
fn scene_groups_by_zone() {
    let mut state = FleetState::new();
    state.apply_transport_event(full_update(json!([
        { "id": "aaaa0000", "name": "a", "status": "created", "active": true },
        { "id": "bbbb0000", "name": "b", "status": "Up", "active": true },
        { "id": "cccc0000", "name": "c", "status": "weird", "active": true },
        { "id": "dddd0000", "name": "d", "status": "running", "active": false }
    ])));
    let scene = state.scene();
    let names = |zone| {
        scene
            .in_zone(zone)
            .map(|placed| placed.agent.name.as_str())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(Zone::AlphaHall), ["a"]);
    assert_eq!(names(Zone::EchoPlaza), ["b"]);
    assert_eq!(names(Zone::TheVoid), ["c"]);
    assert_eq!(names(Zone::OmegaGate), ["d"]);
    assert!(names(Zone::DockerCore).is_empty());
}

#[derive(Clone)]
struct BackendState {
    greeting: Arc<Vec<String>>,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<BackendState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| backend_connection(state, socket))
}

async fn backend_connection(state: BackendState, mut socket: WebSocket) {
    for frame in state.greeting.iter() {
        if socket.send(WsMessage::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    while let Some(Ok(msg)) = socket.recv().await {
        let WsMessage::Text(text) = msg else {
            continue;
        };
        let Some(reply) = respond(&text) else {
            continue;
        };
        if socket.send(WsMessage::Text(reply)).await.is_err() {
            break;
        }
    }
}

fn respond(text: &str) -> Option<String> {
    let command: Value = serde_json::from_str(text).ok()?;
    let action = command.get("action")?.as_str()?;
    let reply = match action {
        "get_logs" => {
            let id = command.get("container_id")?.as_str()?;
            json!({ "type": "logs", "container_id": id, "success": true, "logs": format!("logs for {id}") })
        }
        "create_agent" => json!({
            "type": "command_receipt",
            "success": true,
            "message": format!("Agent {} created successfully.", command.get("name")?.as_str()?),
        }),
        other => json!({ "type": "command_receipt", "success": true, "message": format!("{other} ok") }),
    };
    Some(reply.to_string())
}

async fn spawn_backend(greeting: Vec<Value>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = BackendState {
        greeting: Arc::new(greeting.iter().map(Value::to_string).collect()),
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("ws://{addr}/ws")
}

async fn next_update(client: &mut FleetClient) -> FleetUpdate {
    timeout(Duration::from_secs(5), client.next_update())
        .await
        .expect("update in time")
        .expect("session still open")
}

#[tokio::test]
async fn client_reconciles_snapshots_and_fetches_logs() {
    let endpoint = spawn_backend(vec![
        json!({ "type": "full_update", "agents": [
            { "id": "abcd1234ef", "name": "x", "status": "running", "is_active": 1 },
            { "id": "ffff0000aa", "name": "y", "status": "exited", "is_active": 0 }
        ]}),
        json!({ "type": "heartbeat" }),
    ])
    .await;
    let mut client = FleetClient::connect(&endpoint).await.expect("connect");

    assert_eq!(
        next_update(&mut client).await,
        FleetUpdate::Connection(ConnectionState::Open)
    );
    assert!(matches!(
        next_update(&mut client).await,
        FleetUpdate::AgentsReconciled(ReconcileSummary {
            active: 1,
            retired: 1,
            ..
        })
    ));

    let id = AgentId::new("abcd1234ef");
    client
        .dispatch(Intent::FetchLogs(id.clone()))
        .await
        .expect("dispatch");
    assert_eq!(client.state().logs(&id), LogView::Loading);
    assert_eq!(
        next_update(&mut client).await,
        FleetUpdate::LogsUpdated {
            agent_id: id.clone()
        }
    );
    assert_eq!(client.state().logs(&id), LogView::Text("logs for abcd1234ef"));

    client
        .dispatcher()
        .create_agent("scout", None)
        .await
        .expect("create");
    assert_eq!(
        next_update(&mut client).await,
        FleetUpdate::CommandReceipt {
            success: Some(true),
            message: Some("Agent scout created successfully.".into()),
        }
    );

    client.close().await;
}

#[tokio::test]
async fn commands_on_a_closed_session_fail_and_leave_logs_alone() {
    let endpoint = spawn_backend(Vec::new()).await;
    let mut client = FleetClient::connect(&endpoint).await.expect("connect");
    assert_eq!(
        next_update(&mut client).await,
        FleetUpdate::Connection(ConnectionState::Open)
    );

    client.close().await;
    assert_eq!(
        next_update(&mut client).await,
        FleetUpdate::Connection(ConnectionState::Closed)
    );
    assert_eq!(client.next_update().await, None);

    let id = AgentId::new("abcd1234ef");
    let err = client
        .dispatch(Intent::FetchLogs(id.clone()))
        .await
        .expect_err("closed session");
    assert!(err.is_transport());
    assert_eq!(client.state().logs(&id), LogView::Loading);
    assert!(client.state().log_entry(&id).is_none());
}
