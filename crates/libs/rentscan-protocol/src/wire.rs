//! JSON message encode/decode.
//!
//! Every message is a flat JSON object discriminated by its `cmd` field. The
//! field names and codes are fixed by the gateway firmware
//! (`rentscan_protocol.h`), so this module only validates and maps them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::status::RentalStatus;
use crate::tag::{TagId, TagIdError};
use crate::DELIMITER;

pub const CMD_RENTAL_START: u64 = 1;
pub const CMD_RENTAL_END: u64 = 2;
pub const CMD_STATUS_REQUEST: u64 = 3;
pub const CMD_STATUS_RESPONSE: u64 = 4;
pub const CMD_ERROR: u64 = 0xFF;

/// Largest duration the firmware can represent (`uint32_t`).
const MAX_DURATION_SECS: u64 = u32::MAX as u64;

/// Errors from wire protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("json encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<TagIdError> for WireError {
    fn from(err: TagIdError) -> Self {
        Self::MalformedMessage(format!("tag_id: {err}"))
    }
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin a rental. `duration` is `None` when absent or unusable.
    RentalStart { tag: TagId, duration: Option<u64> },
    RentalEnd { tag: TagId },
    StatusRequest { tag: TagId },
    StatusResponse(StatusResponse),
    Error,
    Unknown { cmd: u64 },
}

impl Command {
    pub fn code(&self) -> u64 {
        match self {
            Self::RentalStart { .. } => CMD_RENTAL_START,
            Self::RentalEnd { .. } => CMD_RENTAL_END,
            Self::StatusRequest { .. } => CMD_STATUS_REQUEST,
            Self::StatusResponse(_) => CMD_STATUS_RESPONSE,
            Self::Error => CMD_ERROR,
            Self::Unknown { cmd } => *cmd,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RentalStart { .. } => "rental_start",
            Self::RentalEnd { .. } => "rental_end",
            Self::StatusRequest { .. } => "status_request",
            Self::StatusResponse(_) => "status_response",
            Self::Error => "error",
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// A decoded message: the command plus every field the command did not consume.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub command: Command,
    pub extra: Map<String, Value>,
}

impl Message {
    /// Decode one frame payload (delimiter already stripped).
    ///
    /// Any non-negative integer `cmd` decodes; codes outside the known set
    /// become [`Command::Unknown`]. A `cmd` that is not a non-negative integer
    /// (negative, fractional, string) is [`WireError::MalformedMessage`].
    /// Either way the dispatcher drops the frame without a reply.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|err| WireError::MalformedMessage(err.to_string()))?;
        let Value::Object(map) = value else {
            return Err(WireError::MalformedMessage("expected a JSON object".into()));
        };

        let mut fields = Fields(map);
        let cmd = fields.require_u64("cmd")?;
        let command = match cmd {
            CMD_RENTAL_START => {
                let tag = fields.require_tag()?;
                let duration = fields.optional_duration();
                Command::RentalStart { tag, duration }
            }
            CMD_RENTAL_END => Command::RentalEnd { tag: fields.require_tag()? },
            CMD_STATUS_REQUEST => Command::StatusRequest { tag: fields.require_tag()? },
            CMD_STATUS_RESPONSE => {
                let status = fields.require_u64("status")?;
                let status = u8::try_from(status)
                    .ok()
                    .and_then(RentalStatus::from_code)
                    .ok_or_else(|| {
                        WireError::MalformedMessage(format!("unknown status code {status}"))
                    })?;
                let tag = fields.require_tag()?;
                let timestamp = fields.require_u64("timestamp")?;
                let duration = fields.require_u64("duration")?;
                Command::StatusResponse(StatusResponse { status, tag, timestamp, duration })
            }
            CMD_ERROR => Command::Error,
            other => Command::Unknown { cmd: other },
        };

        Ok(Self { command, extra: fields.0 })
    }
}

/// Outbound status report, sent as a reply or as an unsolicited push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: RentalStatus,
    pub tag: TagId,
    pub timestamp: u64,
    pub duration: u64,
}

#[derive(Serialize)]
struct WireStatusResponse {
    cmd: u64,
    status: RentalStatus,
    tag_id: String,
    tag_id_len: usize,
    timestamp: u64,
    duration: u64,
}

impl StatusResponse {
    /// A response with no rental timing attached.
    pub fn bare(tag: TagId, status: RentalStatus) -> Self {
        Self { status, tag, timestamp: 0, duration: 0 }
    }

    /// Encode to a delimiter-terminated frame.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let wire = WireStatusResponse {
            cmd: CMD_STATUS_RESPONSE,
            status: self.status,
            tag_id: self.tag.to_hex(),
            tag_id_len: self.tag.len(),
            timestamp: self.timestamp,
            duration: self.duration,
        };
        let mut frame = serde_json::to_vec(&wire).map_err(WireError::Encode)?;
        frame.push(DELIMITER);
        Ok(frame)
    }
}

struct Fields(Map<String, Value>);

impl Fields {
    fn take(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name).filter(|value| !value.is_null())
    }

    fn require_u64(&mut self, name: &'static str) -> Result<u64, WireError> {
        let value = self.take(name).ok_or(WireError::MissingField(name))?;
        value.as_u64().ok_or_else(|| {
            WireError::MalformedMessage(format!("{name} must be a non-negative integer"))
        })
    }

    fn require_tag(&mut self) -> Result<TagId, WireError> {
        let tag_id = self.take("tag_id").ok_or(WireError::MissingField("tag_id"))?;
        let Value::String(tag_hex) = tag_id else {
            return Err(WireError::MalformedMessage("tag_id must be a hex string".into()));
        };
        let declared_len = self.require_u64("tag_id_len")?;
        let tag = TagId::from_hex(&tag_hex)?;
        if declared_len != tag.len() as u64 {
            log::warn!(
                "wire: tag_id_len mismatch tag={} declared={} actual={}",
                tag,
                declared_len,
                tag.len()
            );
        }
        Ok(tag)
    }

    fn optional_duration(&mut self) -> Option<u64> {
        let value = self.take("duration")?;
        match value.as_u64() {
            Some(secs) if secs > 0 && secs <= MAX_DURATION_SECS => Some(secs),
            _ => {
                log::warn!("wire: ignoring invalid duration={}", value);
                None
            }
        }
    }
}
