#[path = "rentscand/bootstrap.rs"]
mod bootstrap;
#[path = "rentscand/link_worker.rs"]
mod link_worker;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rentscan_daemon::config::LinkMode;

#[derive(Parser, Debug)]
#[command(name = "rentscand", about = "RentScan backend emulator")]
struct Args {
    /// Serial device, or `host:port` to listen on in TCP mode.
    #[arg(long)]
    port: Option<String>,
    #[arg(long, value_enum)]
    mode: Option<LinkMode>,
    #[arg(long)]
    baud: Option<u32>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    sweep_interval_secs: Option<u64>,
    #[arg(long)]
    default_duration_secs: Option<u64>,
    /// Run without the stdin operator console.
    #[arg(long, default_value_t = false)]
    no_console: bool,
}

// A pending stdin read cannot be cancelled, so shutdown does not wait on it.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> anyhow::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    let context = bootstrap::bootstrap(args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(link_worker::run(context));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}
