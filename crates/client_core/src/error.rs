use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket is not open (state: {state})")]
    NotOpen { state: String },
    #[error("invalid websocket endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to connect websocket {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("websocket send failed: {0}")]
    Send(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid {frame_type} frame: {source}")]
    InvalidShape {
        frame_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid command: {0}")]
    Validation(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl DispatchError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
