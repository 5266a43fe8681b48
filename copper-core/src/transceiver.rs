//! Co-locates a `Transmitter` and a `Receiver` on a single named wire, and
//! the process-wide registry (`WireBroker`) that lets multiple stations
//! discover and share the same `Wire` instance by name.
//!
//! Grounded on `original_source/src/Transceiver.cpp` (constructs its
//! transmitter and receiver together against one wire) and `Wire.cpp`'s
//! static `getWireForName` registry — reworked here into an explicit,
//! dependency-injected `WireBroker` rather than a hidden process-global
//! singleton, per the design notes' guidance against global mutable state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use copper_types::UnicastAddress;

use crate::ber::BerDistribution;
use crate::clock::{Scheduler, Time};
use crate::error::Result;
use crate::receiver::Receiver;
use crate::transmitter::Transmitter;
use crate::wire::Wire;

/// Looks up (or creates) the `Wire` shared by all stations attached to the
/// same named medium. Pass one broker instance to every `Transceiver` that
/// should be able to talk to each other.
pub struct WireBroker {
    scheduler: Rc<RefCell<dyn Scheduler>>,
    wires: HashMap<String, Wire>,
}

impl WireBroker {
    pub fn new(scheduler: Rc<RefCell<dyn Scheduler>>) -> Self {
        WireBroker {
            scheduler,
            wires: HashMap::new(),
        }
    }

    /// Returns the wire registered under `name`, creating it on first use.
    pub fn wire_for_name(&mut self, name: &str) -> Wire {
        self.wires
            .entry(name.to_string())
            .or_insert_with(|| Wire::new(name, self.scheduler.clone()))
            .clone()
    }
}

/// One station: a transmitter and a receiver sharing a wire and a unicast
/// address.
pub struct Transceiver {
    pub transmitter: Transmitter,
    pub receiver: Receiver,
}

impl Transceiver {
    /// Builds a transmitter/receiver pair on `wire`, registers the receiver
    /// under `address`, and sets the receiver's own address to match.
    pub fn new(
        wire: Wire,
        address: UnicastAddress,
        data_rate_bps: f64,
        transmitter_sensing_time: Time,
        receiver_sensing_time: Time,
        ber: Box<dyn BerDistribution>,
    ) -> Result<Self> {
        let receiver = Receiver::new(receiver_sensing_time, ber);
        receiver.set_dll_unicast_address(&wire, address)?;
        let transmitter = Transmitter::new(wire, data_rate_bps, transmitter_sensing_time);
        Ok(Transceiver {
            transmitter,
            receiver,
        })
    }
}
