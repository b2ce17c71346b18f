//! Inbound half of the gateway link.

use std::time::Duration;

use rentscan_protocol::framing::DEFAULT_MAX_FRAME_LEN;
use rentscan_protocol::LineFramer;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::BackendError;

const READ_BUFFER_SIZE: usize = 1024;

/// How the receive loop treats a failed or exhausted read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A line that stays open for the life of the process (serial). EOF and
    /// read errors pause the loop, then reading resumes.
    Persistent,
    /// A single accepted connection (TCP). EOF or a read error ends the loop.
    Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveSettings {
    pub max_frame_len: usize,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
        }
    }
}

/// Why the receive loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveExit {
    Cancelled,
    Closed,
}

/// Double `current`, capped at `max`.
pub fn bounded_backoff_next(current: Duration, max: Duration) -> Duration {
    let current_ms = current.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(current_ms.saturating_mul(2).min(max_ms))
}

/// Read frames from `reader` and dispatch them in arrival order until the
/// link closes or `cancel` fires.
pub async fn run_receive_loop<R>(
    mut reader: R,
    link: LinkKind,
    dispatcher: &Dispatcher,
    settings: ReceiveSettings,
    cancel: CancellationToken,
) -> Result<ReceiveExit, BackendError>
where
    R: AsyncRead + Unpin,
{
    log::info!("receive: loop started link={:?}", link);
    let mut framer = LineFramer::with_max_frame_len(settings.max_frame_len);
    let mut read_buffer = vec![0_u8; READ_BUFFER_SIZE];
    let mut retry_delay = settings.retry_delay;

    'read: loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = reader.read(&mut read_buffer[..]) => result,
        };

        let failure = match result {
            Ok(0) => None,
            Ok(n) => {
                retry_delay = settings.retry_delay;
                for payload in framer.feed(&read_buffer[..n]) {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break 'read,
                        _ = dispatcher.handle_frame(&payload) => {}
                    }
                }
                continue;
            }
            Err(err) => Some(err),
        };

        match (link, failure) {
            (LinkKind::Connection, None) => {
                log::warn!("receive: connection closed by peer");
                return Ok(ReceiveExit::Closed);
            }
            (LinkKind::Connection, Some(err)) => {
                log::error!("receive: read error err={}", err);
                return Err(BackendError::TransportRead(err));
            }
            (LinkKind::Persistent, failure) => {
                if let Some(err) = failure {
                    log::warn!("receive: read error err={} retry_in={:?}", err, retry_delay);
                } else {
                    log::debug!("receive: no data retry_in={:?}", retry_delay);
                }
                tokio::select! {
                    _ = cancel.cancelled() => break 'read,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
                retry_delay = bounded_backoff_next(retry_delay, settings.max_retry_delay);
            }
        }
    }

    log::info!("receive: loop cancelled");
    Ok(ReceiveExit::Cancelled)
}
