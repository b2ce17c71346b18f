//! # rentscan-protocol
//!
//! Wire protocol spoken between a RentScan gateway and its backend.
//!
//! The gateway and the backend exchange UTF-8 JSON objects over a byte stream
//! (serial line or TCP), one object per line:
//!
//! ```text
//! gateway -> backend   {"cmd":1,"tag_id":"aabbcc","tag_id_len":3,"duration":5}
//! backend -> gateway   {"cmd":4,"status":1,"tag_id":"aabbcc","tag_id_len":3,"timestamp":0,"duration":0}
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rentscan_protocol::{Command, LineFramer, Message};
//!
//! let mut framer = LineFramer::new();
//! let frames = framer.feed(b"{\"cmd\":3,\"tag_id\":\"aabbcc\",\"tag_id_len\":3}\n");
//! let message = Message::decode(&frames[0]).unwrap();
//! assert!(matches!(message.command, Command::StatusRequest { .. }));
//! ```

pub mod framing;
pub mod status;
pub mod tag;
pub mod wire;

pub use framing::LineFramer;
pub use status::RentalStatus;
pub use tag::{TagId, TagIdError};
pub use wire::{Command, Message, StatusResponse, WireError};

/// Frame delimiter on the wire.
pub const DELIMITER: u8 = b'\n';

/// Longest tag identifier the gateway firmware can carry.
pub const MAX_TAG_ID_LEN: usize = 16;

/// Rental duration applied when a start request carries no usable duration.
pub const DEFAULT_RENTAL_DURATION_SECS: u64 = 3600;
