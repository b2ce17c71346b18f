use std::net::SocketAddr;
use std::time::Duration;

use rentscan_backend::session::bounded_backoff_next;
use tokio::net::{TcpListener, TcpStream};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::sync::CancellationToken;

use crate::config::{DataBits, FlowControl, Parity, StopBits, TransportConfig};

const DEFAULT_REOPEN_DELAY: Duration = Duration::from_millis(500);
const MAX_REOPEN_DELAY: Duration = Duration::from_secs(5);

/// Serial line settings plus the reopen policy used while the device is
/// missing or busy.
#[derive(Debug, Clone)]
pub struct SerialLink {
    device: String,
    baud_rate: u32,
    data_bits: tokio_serial::DataBits,
    parity: tokio_serial::Parity,
    stop_bits: tokio_serial::StopBits,
    flow_control: tokio_serial::FlowControl,
    reconnect_backoff: Duration,
    max_reconnect_backoff: Duration,
}

impl SerialLink {
    pub fn from_config(device: &str, config: &TransportConfig) -> Self {
        Self {
            device: device.to_string(),
            baud_rate: config.baud_rate,
            data_bits: match config.data_bits {
                DataBits::Five => tokio_serial::DataBits::Five,
                DataBits::Six => tokio_serial::DataBits::Six,
                DataBits::Seven => tokio_serial::DataBits::Seven,
                DataBits::Eight => tokio_serial::DataBits::Eight,
            },
            parity: match config.parity {
                Parity::None => tokio_serial::Parity::None,
                Parity::Even => tokio_serial::Parity::Even,
                Parity::Odd => tokio_serial::Parity::Odd,
            },
            stop_bits: match config.stop_bits {
                StopBits::One => tokio_serial::StopBits::One,
                StopBits::Two => tokio_serial::StopBits::Two,
            },
            flow_control: match config.flow_control {
                FlowControl::None => tokio_serial::FlowControl::None,
                FlowControl::Software => tokio_serial::FlowControl::Software,
                FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
            },
            reconnect_backoff: DEFAULT_REOPEN_DELAY,
            max_reconnect_backoff: MAX_REOPEN_DELAY,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Set the first reopen delay and its cap; the cap never drops below the
    /// first delay.
    pub fn with_reopen_delays(mut self, first: Duration, max: Duration) -> Self {
        self.reconnect_backoff = first;
        self.max_reconnect_backoff = max.max(first);
        self
    }

    fn try_open(&self) -> Result<SerialStream, tokio_serial::Error> {
        tokio_serial::new(self.device.clone(), self.baud_rate)
            .data_bits(self.data_bits)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .flow_control(self.flow_control)
            .open_native_async()
    }

    /// Open the device, retrying with bounded backoff until it succeeds.
    /// Returns `None` once `cancel` fires.
    pub async fn open(&self, cancel: &CancellationToken) -> Option<SerialStream> {
        let mut active_backoff = self.reconnect_backoff;
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self.try_open() {
                Ok(port) => {
                    log::info!(
                        "serial: opened device={} baud_rate={} data_bits={:?} parity={:?} stop_bits={:?} flow_control={:?}",
                        self.device,
                        self.baud_rate,
                        self.data_bits,
                        self.parity,
                        self.stop_bits,
                        self.flow_control
                    );
                    return Some(port);
                }
                Err(err) => {
                    log::warn!(
                        "serial: failed to open device={} baud_rate={} err={} retry_in={:?}",
                        self.device,
                        self.baud_rate,
                        err,
                        active_backoff
                    );
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(active_backoff) => {}
            }
            active_backoff = bounded_backoff_next(active_backoff, self.max_reconnect_backoff);
        }
    }
}

/// Listen on `addr` and accept a single gateway connection. The listener is
/// closed once the connection is established. Returns `Ok(None)` if `cancel`
/// fires first.
pub async fn accept_gateway(
    addr: &str,
    cancel: &CancellationToken,
) -> std::io::Result<Option<(TcpStream, SocketAddr)>> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("tcp: listening addr={}", listener.local_addr()?);
    accept_one(listener, cancel).await
}

async fn accept_one(
    listener: TcpListener,
    cancel: &CancellationToken,
) -> std::io::Result<Option<(TcpStream, SocketAddr)>> {
    let accepted = tokio::select! {
        _ = cancel.cancelled() => return Ok(None),
        accepted = listener.accept() => accepted?,
    };
    let (stream, peer) = accepted;
    if let Err(err) = stream.set_nodelay(true) {
        log::warn!("tcp: failed to set nodelay peer={} err={}", peer, err);
    }
    log::info!("tcp: gateway connected peer={}", peer);
    Ok(Some((stream, peer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::timeout;

    #[test]
    fn from_config_maps_line_settings() {
        let config = TransportConfig {
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            flow_control: FlowControl::Hardware,
            ..TransportConfig::default()
        };
        let link = SerialLink::from_config("/dev/ttyUSB0", &config);
        assert_eq!(link.device(), "/dev/ttyUSB0");
        assert_eq!(link.data_bits, tokio_serial::DataBits::Seven);
        assert_eq!(link.parity, tokio_serial::Parity::Even);
        assert_eq!(link.stop_bits, tokio_serial::StopBits::Two);
        assert_eq!(link.flow_control, tokio_serial::FlowControl::Hardware);
        assert_eq!(link.reconnect_backoff, DEFAULT_REOPEN_DELAY);
    }

    #[test]
    fn max_reopen_delay_never_drops_below_first() {
        let link = SerialLink::from_config("dummy", &TransportConfig::default())
            .with_reopen_delays(Duration::from_secs(8), Duration::from_secs(1));
        assert_eq!(link.max_reconnect_backoff, Duration::from_secs(8));
    }

    #[tokio::test]
    async fn open_retry_loop_honors_cancel_after_failures() {
        let link = SerialLink::from_config("__definitely_not_a_device__", &TransportConfig::default())
            .with_reopen_delays(Duration::from_millis(25), Duration::from_millis(100));
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { link.open(&cancel).await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(90)).await;
        cancel.cancel();

        let opened = timeout(Duration::from_secs(2), task)
            .await
            .expect("open should stop after cancel")
            .expect("join open task");
        assert!(!opened);
    }

    #[tokio::test]
    async fn accepts_a_single_gateway_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let cancel = CancellationToken::new();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.expect("connect");
            stream.write_all(b"ping\n").await.expect("write");
        });

        let (mut stream, _peer) = timeout(Duration::from_secs(2), accept_one(listener, &cancel))
            .await
            .expect("accept in time")
            .expect("accept")
            .expect("connection");
        client.await.expect("join client");

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.expect("read");
        assert_eq!(buf, b"ping\n");

        assert!(TcpStream::connect(addr).await.is_err(), "listener is closed after accept");
    }

    #[tokio::test]
    async fn accept_returns_none_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let accepted = accept_gateway("127.0.0.1:0", &cancel).await.expect("bind");
        assert!(accepted.is_none());
    }
}
