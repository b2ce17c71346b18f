use std::fmt;

use serde::{Deserialize, Serialize};

/// Rental state of a tagged item, with the codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum RentalStatus {
    #[default]
    Available = 0,
    Rented = 1,
    Expired = 2,
    Error = 0xFF,
}

impl RentalStatus {
    /// Convert from a raw wire code. Codes outside the closed set yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Available),
            1 => Some(Self::Rented),
            2 => Some(Self::Expired),
            0xFF => Some(Self::Error),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Rented => "RENTED",
            Self::Expired => "EXPIRED",
            Self::Error => "ERROR",
        }
    }
}

impl TryFrom<u8> for RentalStatus {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, UnknownStatus> {
        Self::from_code(code).ok_or(UnknownStatus(code))
    }
}

impl From<RentalStatus> for u8 {
    fn from(status: RentalStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown rental status code: {0}")]
pub struct UnknownStatus(pub u8);
