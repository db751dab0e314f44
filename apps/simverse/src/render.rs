//! Plain-text rendering of a fleet scene for the terminal.

use chrono::{DateTime, Utc};
use client_core::{LogView, PlacedAgent, SceneView, Zone};

pub fn render_scene(scene: &SceneView<'_>) -> String {
    let mut out = format!(
        "connection: {}  active: {}  retired: {}\n",
        scene.connection,
        scene.active.len(),
        scene.retired.len()
    );

    for zone in Zone::ALL {
        let residents: Vec<_> = scene
            .active
            .iter()
            .filter(|placed| placed.placement.zone == zone)
            .collect();
        out.push_str(&format!(
            "{} {} ({})\n    {}\n",
            zone.emoji(),
            zone.name(),
            residents.len(),
            zone.description()
        ));
        if residents.is_empty() {
            out.push_str("    This zone is quiet.\n");
        }
        for placed in residents {
            out.push_str(&format!("    {}\n", agent_line(placed)));
        }
    }

    out.push_str(&format!("🪦 Memory Garden ({})\n", scene.retired.len()));
    for placed in &scene.retired {
        let faded = placed
            .agent
            .updated_at
            .as_deref()
            .map(|at| format!(" faded {at}"))
            .unwrap_or_default();
        out.push_str(&format!("    {} (retired{faded})\n", agent_line(placed)));
    }
    out
}

fn agent_line(placed: &PlacedAgent<'_>) -> String {
    let position = placed.placement.position;
    let marker = if placed.selected { "▶" } else { "-" };
    format!(
        "{marker} {} [{}] status={} at ({:.2}, {:.2}, {:.2})",
        placed.agent.name,
        placed.agent.id.short(),
        placed.agent.status.as_deref().unwrap_or("unknown"),
        position.x,
        position.y,
        position.z
    )
}

/// `received_at` is when the response arrived; it is absent while loading.
pub fn render_logs(view: LogView<'_>, received_at: Option<DateTime<Utc>>) -> String {
    let stamp = received_at
        .map(|at| format!(" at {}", at.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_default();
    match view {
        LogView::Loading => view.display_text().to_string(),
        LogView::Text(text) => format!("fetched{stamp}\n{text}"),
        LogView::Failed(reason) => format!("log fetch failed{stamp}: {reason}"),
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
