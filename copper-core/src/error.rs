//! Error types for the `copper` simulation core.
//!
//! Most of these correspond to what the original C++ model treats as fatal,
//! abort-style programming errors (§7 of the spec this crate implements):
//! sending to an address the wire has never seen, double-scheduling a PDU,
//! registering a duplicate address, setting a receiver's address twice.
//! Rather than panicking, we surface them through `Result` so a caller (or a
//! test) can assert on the precondition violation — see DESIGN.md for the
//! rationale.

use copper_types::UnicastAddress;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CopperError>;

#[derive(Debug, Error)]
pub enum CopperError {
    #[error("unicast target {0} is not registered on this wire")]
    AddressNotRegistered(UnicastAddress),

    #[error("address {0} is already registered on this wire")]
    DuplicateAddress(UnicastAddress),

    #[error("transmission for this PDU is already scheduled on this wire")]
    DuplicateTransmission,

    #[error("unicast address may only be set once")]
    AddressAlreadySet,

    #[error("address is invalid (zero/default address cannot be used)")]
    InvalidAddress,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
