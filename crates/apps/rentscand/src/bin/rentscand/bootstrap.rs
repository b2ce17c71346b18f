use std::sync::Arc;

use anyhow::{anyhow, Context};
use rentscan_backend::Backend;
use rentscan_daemon::config::{DaemonConfig, LinkMode};
use rentscan_daemon::transport::SerialLink;

use super::Args;

pub(super) enum LinkTarget {
    Serial(SerialLink),
    Tcp(String),
}

pub(super) struct BootstrapContext {
    pub(super) target: LinkTarget,
    pub(super) backend: Arc<Backend>,
    pub(super) console: bool,
}

pub(super) fn bootstrap(args: Args) -> anyhow::Result<BootstrapContext> {
    let mut config = match args.config.as_ref() {
        Some(path) => DaemonConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.transport.mode = mode;
    }
    if let Some(port) = args.port {
        config.transport.port = Some(port);
    }
    if let Some(baud) = args.baud {
        config.transport.baud_rate = baud;
    }
    if let Some(secs) = args.sweep_interval_secs {
        config.rental.sweep_interval_secs = secs;
    }
    if let Some(secs) = args.default_duration_secs {
        config.rental.default_duration_secs = secs;
    }
    config.validate().map_err(|err| anyhow!(err))?;

    let port = config
        .transport
        .port
        .clone()
        .context("no gateway port configured: pass --port or set transport.port")?;

    let target = match config.transport.mode {
        LinkMode::Serial => LinkTarget::Serial(SerialLink::from_config(&port, &config.transport)),
        LinkMode::Tcp => LinkTarget::Tcp(port),
    };

    let backend_config = config.backend_config();
    log::info!(
        "daemon: starting mode={:?} default_duration_secs={} sweep_interval={:?}",
        config.transport.mode,
        backend_config.default_duration_secs,
        backend_config.sweep_interval
    );

    Ok(BootstrapContext {
        target,
        backend: Arc::new(Backend::new(backend_config)),
        console: !args.no_console,
    })
}
