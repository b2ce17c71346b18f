use std::sync::Arc;
use std::time::Duration;

use rentscan_protocol::DEFAULT_RENTAL_DURATION_SECS;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::dispatch::Dispatcher;
use crate::machine::RentalMachine;
use crate::monitor::{ExpirationMonitor, DEFAULT_SWEEP_INTERVAL};
use crate::session::{run_receive_loop, LinkKind, ReceiveExit, ReceiveSettings};
use crate::sink::{ResponseSink, WriterSink};
use crate::store::RentalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    pub default_duration_secs: u64,
    pub sweep_interval: Duration,
    pub receive: ReceiveSettings,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_RENTAL_DURATION_SECS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            receive: ReceiveSettings::default(),
        }
    }
}

/// The rental backend: one store, served over a gateway link.
pub struct Backend {
    store: RentalStore,
    clock: Arc<dyn Clock>,
    config: BackendConfig,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BackendConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store: RentalStore::new(), clock, config }
    }

    /// Handle to the rental table, for inspection and bulk clear.
    pub fn store(&self) -> RentalStore {
        self.store.clone()
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Serve one duplex link until `cancel` fires.
    ///
    /// Runs the receive loop and the expiration monitor as two tasks and
    /// joins both before returning. On a [`LinkKind::Connection`] link the
    /// receive task ends when the peer disconnects; the monitor keeps sweeping
    /// the store until cancellation.
    pub async fn serve<IO>(&self, io: IO, link: LinkKind, cancel: CancellationToken)
    where
        IO: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(io);
        let sink: Arc<dyn ResponseSink> = Arc::new(WriterSink::with_cancel(writer, cancel.clone()));

        let machine = Arc::new(
            RentalMachine::new(self.store.clone(), self.clock.clone())
                .with_default_duration(self.config.default_duration_secs),
        );
        let dispatcher = Dispatcher::new(machine, sink.clone());
        let monitor = ExpirationMonitor::new(self.store.clone(), self.clock.clone(), sink)
            .with_interval(self.config.sweep_interval);

        let rx_task = {
            let cancel = cancel.clone();
            let settings = self.config.receive;
            tokio::spawn(async move {
                match run_receive_loop(reader, link, &dispatcher, settings, cancel).await {
                    Ok(ReceiveExit::Cancelled) => {}
                    Ok(ReceiveExit::Closed) => {
                        log::warn!("backend: gateway link closed; expiry keeps running")
                    }
                    Err(err) => log::error!("backend: receive task failed err={}", err),
                }
            })
        };

        let sweep_task = tokio::spawn(async move { monitor.run(cancel).await });

        let (rx_result, sweep_result) = tokio::join!(rx_task, sweep_task);
        if let Err(err) = rx_result {
            log::error!("backend: receive task join failed err={}", err);
        }
        if let Err(err) = sweep_result {
            log::error!("backend: expiry task join failed err={}", err);
        }
        log::info!("backend: link served, records={}", self.store.len());
    }
}
