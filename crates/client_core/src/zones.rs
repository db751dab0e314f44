//! Fixed zone layout and the status → zone classifier.

use std::fmt;

use crate::placement::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    AlphaHall,
    EchoPlaza,
    DockerCore,
    OmegaGate,
    TheVoid,
}

impl Zone {
    pub const ALL: [Zone; 5] = [
        Zone::AlphaHall,
        Zone::EchoPlaza,
        Zone::DockerCore,
        Zone::OmegaGate,
        Zone::TheVoid,
    ];

    /// Case-insensitive, first match wins; anything unrecognized (including
    /// an absent or empty status) lands in The Void.
    pub fn classify(status: Option<&str>) -> Zone {
        let status = status.unwrap_or_default().to_ascii_lowercase();
        match status.as_str() {
            "created" => Zone::AlphaHall,
            "running" | "up" => Zone::EchoPlaza,
            "restarting" | "paused" => Zone::DockerCore,
            "exited" | "dead" | "stopped" => Zone::OmegaGate,
            _ => Zone::TheVoid,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Zone::AlphaHall => "Alpha Hall",
            Zone::EchoPlaza => "Echo Plaza",
            Zone::DockerCore => "Docker Core",
            Zone::OmegaGate => "Omega Gate",
            Zone::TheVoid => "The Void",
        }
    }

    pub fn anchor(self) -> Position {
        match self {
            Zone::AlphaHall => Position::new(-6.0, 0.0, -6.0),
            Zone::EchoPlaza => Position::new(6.0, 0.0, -6.0),
            Zone::DockerCore => Position::new(-6.0, 0.0, 6.0),
            Zone::OmegaGate => Position::new(6.0, 0.0, 6.0),
            Zone::TheVoid => Position::new(0.0, 0.0, 0.0),
        }
    }

    /// Display color as a CSS hex string.
    pub fn color(self) -> &'static str {
        match self {
            Zone::AlphaHall => "#3b82f6",
            Zone::EchoPlaza => "#22c55e",
            Zone::DockerCore => "#f97316",
            Zone::OmegaGate => "#ef4444",
            Zone::TheVoid => "#6b7280",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Zone::AlphaHall => "The birthplace of new Echoes, where potential takes form.",
            Zone::EchoPlaza => "The bustling hub where active Echoes live and interact.",
            Zone::DockerCore => {
                "The inner sanctum where the fundamental forces of the Simverse are at work."
            }
            Zone::OmegaGate => "The final gateway, where Echoes prepare to fade into memory.",
            Zone::TheVoid => "An uncharted space between defined zones.",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Zone::AlphaHall => "✨",
            Zone::EchoPlaza => "🏙️",
            Zone::DockerCore => "⚙️",
            Zone::OmegaGate => "🚪",
            Zone::TheVoid => "🌌",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "tests/zones_tests.rs"]
mod tests;
