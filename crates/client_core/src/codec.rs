//! JSON framing between the orchestrator wire format and typed protocol values.

use serde_json::Value;
use shared::protocol::{ClientCommand, ServerEvent};
use tracing::{debug, warn};

use crate::error::CodecError;

/// Parse one inbound text frame.
///
/// `Ok(None)` means the frame is well-formed JSON but not a shape this client
/// acts on (missing or unknown `type`). Errors are reserved for frames that
/// are not JSON at all, or that claim a known `type` but do not match it.
pub fn decode_frame(text: &str) -> Result<Option<ServerEvent>, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(CodecError::Malformed)?;
    let Some(frame_type) = value.get("type").and_then(Value::as_str) else {
        debug!("ignoring frame without a type tag");
        return Ok(None);
    };
    if !ServerEvent::is_known_type(frame_type) {
        debug!(frame_type, "ignoring unrecognized frame type");
        return Ok(None);
    }
    let frame_type = frame_type.to_string();
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| CodecError::InvalidShape { frame_type, source })
}

/// Decode a frame, reporting and discarding anything that fails.
pub fn decode_or_discard(text: &str) -> Option<ServerEvent> {
    match decode_frame(text) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, frame_len = text.len(), "discarding undecodable frame");
            None
        }
    }
}

pub fn encode_command(command: &ClientCommand) -> Result<String, CodecError> {
    serde_json::to_string(command).map_err(CodecError::Encode)
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
