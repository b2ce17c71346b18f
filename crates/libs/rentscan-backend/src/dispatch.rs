use std::sync::Arc;

use rentscan_protocol::{Command, Message, RentalStatus};

use crate::machine::RentalMachine;
use crate::sink::ResponseSink;

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Replied(RentalStatus),
    Dropped,
    SendFailed,
}

/// Routes decoded gateway commands to the rental state machine and sends the
/// resulting status back through the sink.
pub struct Dispatcher {
    machine: Arc<RentalMachine>,
    sink: Arc<dyn ResponseSink>,
}

impl Dispatcher {
    pub fn new(machine: Arc<RentalMachine>, sink: Arc<dyn ResponseSink>) -> Self {
        Self { machine, sink }
    }

    pub fn machine(&self) -> &RentalMachine {
        &self.machine
    }

    pub async fn handle_frame(&self, payload: &[u8]) -> DispatchOutcome {
        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(err) => {
                log::warn!(
                    "dispatch: dropping frame err={} payload={}",
                    err,
                    String::from_utf8_lossy(payload)
                );
                return DispatchOutcome::Dropped;
            }
        };
        log::info!("dispatch: rx cmd={} ({})", message.command.code(), message.command.name());
        if !message.extra.is_empty() {
            log::debug!("dispatch: extra fields {:?}", message.extra);
        }

        let response = match &message.command {
            Command::RentalStart { tag, duration } => self.machine.start(tag, *duration),
            Command::RentalEnd { tag } => self.machine.end(tag),
            Command::StatusRequest { tag } => self.machine.status(tag),
            Command::Unknown { cmd } => {
                log::warn!("dispatch: unknown command cmd={}", cmd);
                return DispatchOutcome::Dropped;
            }
            Command::StatusResponse(_) | Command::Error => {
                log::warn!(
                    "dispatch: ignoring outbound-only command cmd={}",
                    message.command.code()
                );
                return DispatchOutcome::Dropped;
            }
        };

        match self.sink.send(&response).await {
            Ok(()) => DispatchOutcome::Replied(response.status),
            Err(err) => {
                log::error!("dispatch: failed to send response tag={} err={}", response.tag, err);
                DispatchOutcome::SendFailed
            }
        }
    }
}
