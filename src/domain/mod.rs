//! Domain types for the asset desk with strong typing.
//!
//! Roles, capabilities, supply counters and the status vocabularies of
//! requisitions and maintenance tickets. The database stores all of these as plain strings;
//! conversion happens at the repository boundary through [`std::str::FromStr`]
//! and the `as_str` accessors.

pub mod role;
pub mod status;
pub mod supply;

pub use role::{Capability, Identity, Role};
pub use status::{DeliveryStatus, MaintenanceStatus, RequisitionStatus};
pub use supply::{SupplyCounter, SupplyCounts};

use thiserror::Error;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// wire representation is a fixed snake_case string.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::domain::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::domain::ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

pub(crate) use string_enum;
