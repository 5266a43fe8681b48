//! copper-types — Level 1 foundation types for the `copper` shared-wire model.
//!
//! Pure data structures only: the PDU handle, the unicast address, and the
//! `Transmission` variants that tie a PDU to a sender. Nothing in this crate
//! touches the wire, a scheduler, or a clock — those live in `copper-core`.
//!
//! ## Critical rule
//!
//! This crate depends on nothing in the workspace. Everything here must stay
//! expressible in terms of std (+ serde for the handful of types worth
//! serializing). Adding a `copper-core` dependency here would invert the
//! dependency graph the rest of the workspace relies on.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// ============================================================================
// UNICAST ADDRESS
// ============================================================================

/// A Layer-2-style unicast address. Opaque beyond its validity predicate and
/// equality/hash — the simulation core never interprets the bits.
///
/// The zero value is reserved as "invalid": a freshly constructed `Receiver`
/// has no address until `set_dll_unicast_address` is called exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct UnicastAddress(u32);

impl UnicastAddress {
    /// The invalid/default address. No `Wire` ever accepts this as a
    /// registration key or a send target.
    pub const INVALID: UnicastAddress = UnicastAddress(0);

    pub fn new(value: u32) -> Self {
        UnicastAddress(value)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnicastAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for UnicastAddress {
    fn from(value: u32) -> Self {
        UnicastAddress::new(value)
    }
}

// ============================================================================
// PDU HANDLE
// ============================================================================

/// An opaque, shared-ownership handle to an upper-layer frame payload.
///
/// The simulation core never looks inside a `Pdu` beyond its bit length.
/// Two handles are equal (and hash identically) iff they refer to the same
/// underlying allocation — construction always produces a fresh identity,
/// even for two PDUs of equal length and payload. This is what lets `Wire`
/// key its `transmissions` / `transmissionEndEvents` maps on PDU identity.
#[derive(Debug, Clone)]
pub struct Pdu(Rc<PduData>);

#[derive(Debug)]
struct PduData {
    bits: u64,
    payload: Vec<u8>,
}

impl Pdu {
    /// A PDU of the given bit length carrying no payload bytes — the common
    /// case in this simulation, which cares about duration, not content.
    pub fn new(length_in_bits: u64) -> Self {
        Pdu(Rc::new(PduData {
            bits: length_in_bits,
            payload: Vec::new(),
        }))
    }

    /// A PDU wrapping real payload bytes; its length is derived from them.
    pub fn with_payload(payload: Vec<u8>) -> Self {
        let bits = payload.len() as u64 * 8;
        Pdu(Rc::new(PduData { bits, payload }))
    }

    pub fn length_in_bits(&self) -> u64 {
        self.0.bits
    }

    pub fn payload(&self) -> &[u8] {
        &self.0.payload
    }
}

impl PartialEq for Pdu {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Pdu {}

impl Hash for Pdu {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

// ============================================================================
// TRANSMITTER FEEDBACK CAPABILITY
// ============================================================================

/// The capability a `Transmission` needs to notify its originator once the
/// wire has finished carrying it. Implemented by `Transmitter` in
/// `copper-core`; kept here because `Transmission` must be able to name the
/// capability without depending on the crate that implements it.
pub trait DataSentSink {
    fn on_data_sent(&self, pdu: &Pdu);
}

// ============================================================================
// TRANSMISSION
// ============================================================================

/// A PDU while it is traversing the wire, tagged with a sender and a
/// monotonic collision flag.
///
/// `collision` starts `false` and, once set by the `Wire`, is never cleared
/// again — see spec invariant: collision is monotonic per transmission.
#[derive(Clone)]
pub enum Transmission {
    Broadcast {
        pdu: Pdu,
        sender: Rc<dyn DataSentSink>,
        collision: bool,
    },
    Unicast {
        pdu: Pdu,
        sender: Rc<dyn DataSentSink>,
        collision: bool,
        target: UnicastAddress,
    },
}

impl fmt::Debug for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transmission::Broadcast { pdu, collision, .. } => f
                .debug_struct("Broadcast")
                .field("pdu", pdu)
                .field("collision", collision)
                .finish(),
            Transmission::Unicast {
                pdu,
                collision,
                target,
                ..
            } => f
                .debug_struct("Unicast")
                .field("pdu", pdu)
                .field("collision", collision)
                .field("target", target)
                .finish(),
        }
    }
}

impl Transmission {
    pub fn broadcast(pdu: Pdu, sender: Rc<dyn DataSentSink>) -> Self {
        Transmission::Broadcast {
            pdu,
            sender,
            collision: false,
        }
    }

    pub fn unicast(pdu: Pdu, sender: Rc<dyn DataSentSink>, target: UnicastAddress) -> Self {
        Transmission::Unicast {
            pdu,
            sender,
            collision: false,
            target,
        }
    }

    pub fn pdu(&self) -> &Pdu {
        match self {
            Transmission::Broadcast { pdu, .. } => pdu,
            Transmission::Unicast { pdu, .. } => pdu,
        }
    }

    pub fn sender(&self) -> &Rc<dyn DataSentSink> {
        match self {
            Transmission::Broadcast { sender, .. } => sender,
            Transmission::Unicast { sender, .. } => sender,
        }
    }

    pub fn collision(&self) -> bool {
        match self {
            Transmission::Broadcast { collision, .. } => *collision,
            Transmission::Unicast { collision, .. } => *collision,
        }
    }

    /// Irreversibly marks this transmission as collided. A no-op if already
    /// set — the flag never clears.
    pub fn mark_collision(&mut self) {
        match self {
            Transmission::Broadcast { collision, .. } => *collision = true,
            Transmission::Unicast { collision, .. } => *collision = true,
        }
    }

    pub fn target(&self) -> Option<UnicastAddress> {
        match self {
            Transmission::Broadcast { .. } => None,
            Transmission::Unicast { target, .. } => Some(*target),
        }
    }
}
