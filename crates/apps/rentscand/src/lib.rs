//! Process-level pieces of the RentScan backend daemon: configuration,
//! transport bootstrap, and the operator console.

pub mod config;
pub mod console;
pub mod transport;
