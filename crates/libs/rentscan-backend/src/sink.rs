use async_trait::async_trait;
use rentscan_protocol::StatusResponse;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// Outbound half of the gateway link.
///
/// Replies from the dispatcher and pushes from the expiration monitor share
/// one sink; implementations must write each frame atomically.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn send(&self, response: &StatusResponse) -> Result<(), BackendError>;
}

/// Sink writing encoded frames to an `AsyncWrite` behind a write lock.
///
/// A send blocked on a peer that stopped reading gives up with
/// [`BackendError::Cancelled`] once the sink's token fires.
pub struct WriterSink<W> {
    writer: Mutex<W>,
    cancel: CancellationToken,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_cancel(writer, CancellationToken::new())
    }

    pub fn with_cancel(writer: W, cancel: CancellationToken) -> Self {
        Self { writer: Mutex::new(writer), cancel }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> ResponseSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, response: &StatusResponse) -> Result<(), BackendError> {
        let frame = response.encode()?;
        let write = async {
            let mut writer = self.writer.lock().await;
            writer.write_all(&frame).await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::debug!("sink: send abandoned tag={} (cancelled)", response.tag);
                return Err(BackendError::Cancelled);
            }
            result = write => result.map_err(BackendError::TransportWrite)?,
        }
        log::debug!(
            "sink: sent tag={} status={} timestamp={} duration={}",
            response.tag,
            response.status,
            response.timestamp,
            response.duration
        );
        Ok(())
    }
}
