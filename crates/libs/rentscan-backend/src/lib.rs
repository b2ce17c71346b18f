//! # rentscan-backend
//!
//! Backend kernel for the RentScan gateway link.
//!
//! A [`Backend`] owns the [`RentalStore`] and serves one duplex byte channel at a
//! time. Serving runs two tasks until cancelled:
//!
//! - the receive loop: transport bytes → [`LineFramer`](rentscan_protocol::LineFramer)
//!   → [`Dispatcher`] → [`RentalMachine`] → [`ResponseSink`]
//! - the [`ExpirationMonitor`]: a periodic sweep that expires overdue rentals and
//!   pushes their new status through the same sink
//!
//! Both tasks share the store behind a single mutex and the sink behind a write
//! lock, so replies and pushes never interleave on the wire.

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod machine;
pub mod monitor;
pub mod service;
pub mod session;
pub mod sink;
pub mod store;
#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::BackendError;
pub use machine::RentalMachine;
pub use monitor::{ExpirationMonitor, SweepReport, DEFAULT_SWEEP_INTERVAL};
pub use service::{Backend, BackendConfig};
pub use session::{run_receive_loop, LinkKind, ReceiveExit, ReceiveSettings};
pub use sink::{ResponseSink, WriterSink};
pub use store::{RentalRecord, RentalStore};
