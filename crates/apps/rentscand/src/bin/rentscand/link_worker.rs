use std::sync::Arc;

use anyhow::Context;
use rentscan_backend::{Backend, LinkKind, RentalStore};
use rentscan_daemon::console::{Console, ConsoleExit};
use rentscan_daemon::transport::accept_gateway;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use super::bootstrap::{BootstrapContext, LinkTarget};

pub(super) async fn run(context: BootstrapContext) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let store = context.backend.store();

    let mut link_task = {
        let cancel = cancel.clone();
        tokio::spawn(serve_link(context.backend, context.target, cancel))
    };

    tokio::select! {
        joined = &mut link_task => {
            return joined.context("link task panicked")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for interrupt")?;
            log::info!("daemon: interrupt received");
        }
        _ = wait_for_console_exit(store, context.console, cancel.child_token()) => {
            log::info!("daemon: exit requested from console");
        }
    }

    cancel.cancel();
    link_task.await.context("link task panicked")??;
    log::info!("daemon: stopped");
    Ok(())
}

async fn serve_link(
    backend: Arc<Backend>,
    target: LinkTarget,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    match target {
        LinkTarget::Serial(link) => {
            if let Some(port) = link.open(&cancel).await {
                backend.serve(port, LinkKind::Persistent, cancel).await;
            }
        }
        LinkTarget::Tcp(addr) => {
            let accepted = accept_gateway(&addr, &cancel)
                .await
                .with_context(|| format!("failed to accept gateway on {addr}"))?;
            if let Some((stream, _peer)) = accepted {
                backend.serve(stream, LinkKind::Connection, cancel).await;
            }
        }
    }
    Ok(())
}

/// Completes only when the operator types `exit`. End of stdin leaves the
/// backend running.
async fn wait_for_console_exit(store: RentalStore, enabled: bool, cancel: CancellationToken) {
    if enabled {
        let console = Console::new(store);
        let input = BufReader::new(tokio::io::stdin());
        match console.run(input, tokio::io::stdout(), cancel).await {
            Ok(ConsoleExit::Exit) => return,
            Ok(ConsoleExit::Eof) => log::info!("console: stdin closed, backend keeps running"),
            Ok(ConsoleExit::Cancelled) => {}
            Err(err) => log::warn!("console: io error err={}", err),
        }
    }
    std::future::pending::<()>().await
}
