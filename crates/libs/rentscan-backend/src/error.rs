use rentscan_protocol::WireError;

/// Errors raised by the backend's transport-facing operations.
///
/// Business conflicts (a second start, an end on an available item) are not
/// errors; they are answered with an ordinary status response.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport read error: {0}")]
    TransportRead(#[source] std::io::Error),

    #[error("transport write error: {0}")]
    TransportWrite(#[source] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("link cancelled before the frame was written")]
    Cancelled,
}

impl BackendError {
    /// Returns `true` for errors caused by the underlying byte channel.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportRead(_) | Self::TransportWrite(_))
    }
}
