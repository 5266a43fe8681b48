//! The shared-medium state machine: accepts scheduled transmissions, detects
//! overlap (collisions), and drives time-ordered delivery, cancellation, and
//! carrier-status notification to attached receivers.
//!
//! Grounded on `original_source/src/Wire.cpp` — `sendDataGeneric`,
//! `checkForCollision`, `stopTransmission` (both the cancel-before-fire and
//! fire-on-event overloads), and `signalCopperFreeAgainToReceivers` map
//! directly onto `send_data`, the collision tagging inside it,
//! `stop_transmission`, `fire_end_of_transmission`, and
//! `free_again_fan_out` below.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use copper_types::{Pdu, Transmission, UnicastAddress};

use crate::clock::{EventHandle, Scheduler, Time};
use crate::error::{CopperError, Result};

/// The narrow capability `Wire` depends on to notify a receiver. A
/// `Receiver` (§4.3) implements this; `Wire` never sees the richer
/// `Handler`/`CarrierSensing` observer surface a `Receiver` fans out to —
/// that split is exactly the "template dispatch over Transmission subtypes…
/// model as a tagged variant" + "narrow ReceiverInterface capability"
/// guidance in the spec's design notes.
pub trait ReceiverCapability {
    /// Delivers a finished transmission. Returns whether this receiver
    /// accepted it (a unicast receiver self-filters by address).
    fn on_data(&self, transmission: &Transmission) -> bool;
    fn on_copper_busy(&self, sched: &mut dyn Scheduler);
    fn on_copper_free(&self, sched: &mut dyn Scheduler);
    fn on_collision(&self, sched: &mut dyn Scheduler);
}

struct WireState {
    name: String,
    scheduler: Rc<RefCell<dyn Scheduler>>,
    receivers: Vec<Rc<dyn ReceiverCapability>>,
    address_mapping: HashMap<UnicastAddress, Rc<dyn ReceiverCapability>>,
    transmissions: HashMap<Pdu, Transmission>,
    transmission_end_events: HashMap<Pdu, EventHandle>,
    time_wire_blocked: Time,
    round_robin_cursor: usize,
}

/// A cheaply-cloneable handle to a `Wire`. All of `Wire`'s public API is
/// implemented on this handle rather than on the state struct directly,
/// because the end-of-transmission event `Wire::send_data` schedules needs
/// to hold a reference back to the wire it belongs to.
#[derive(Clone)]
pub struct Wire(Rc<RefCell<WireState>>);

impl Wire {
    pub fn new(name: impl Into<String>, scheduler: Rc<RefCell<dyn Scheduler>>) -> Self {
        let name = name.into();
        tracing::debug!(wire = %name, "created wire");
        Wire(Rc::new(RefCell::new(WireState {
            name,
            scheduler,
            receivers: Vec::new(),
            address_mapping: HashMap::new(),
            transmissions: HashMap::new(),
            transmission_end_events: HashMap::new(),
            time_wire_blocked: 0.0,
            round_robin_cursor: 0,
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Register a receiver under a unicast address. Fatal (in the original)
    /// to double-register an address; here, a plain error.
    pub fn add_receiver(&self, receiver: Rc<dyn ReceiverCapability>, address: UnicastAddress) -> Result<()> {
        if !address.is_valid() {
            return Err(CopperError::InvalidAddress);
        }
        let mut state = self.0.borrow_mut();
        if state.address_mapping.contains_key(&address) {
            return Err(CopperError::DuplicateAddress(address));
        }
        tracing::debug!(wire = %state.name, %address, "adding receiver");
        state.address_mapping.insert(address, receiver.clone());
        state.receivers.push(receiver);
        Ok(())
    }

    /// Returns a negative value if idle, otherwise the elapsed time since
    /// the current busy period began.
    pub fn blocked_since(&self) -> Time {
        let state = self.0.borrow();
        if state.transmissions.is_empty() {
            -1.0
        } else {
            let now = state.scheduler.borrow().now();
            now - state.time_wire_blocked
        }
    }

    /// Enqueue `transmission` onto the medium for `duration` seconds.
    /// Returns the arrival (end-of-transmission) time.
    pub fn send_data(&self, mut transmission: Transmission, duration: Time) -> Result<Time> {
        if let Some(target) = transmission.target() {
            let registered = self.0.borrow().address_mapping.contains_key(&target);
            if !registered {
                return Err(CopperError::AddressNotRegistered(target));
            }
        }
        if self.0.borrow().transmissions.contains_key(transmission.pdu()) {
            return Err(CopperError::DuplicateTransmission);
        }

        let scheduler = self.0.borrow().scheduler.clone();
        let mut sched = scheduler.borrow_mut();

        let was_idle = self.0.borrow().transmissions.is_empty();
        if was_idle {
            let now = sched.now();
            let mut state = self.0.borrow_mut();
            state.time_wire_blocked = now;
            let receivers = state.receivers.clone();
            drop(state);
            for r in &receivers {
                r.on_copper_busy(&mut *sched);
            }
        } else {
            transmission.mark_collision();
            self.tag_collision(&mut *sched);
        }

        let arrival_time = sched.now() + duration;
        let pdu = transmission.pdu().clone();
        {
            let mut state = self.0.borrow_mut();
            state.transmissions.insert(pdu.clone(), transmission);
        }

        let wire_for_event = self.clone();
        let pdu_for_event = pdu.clone();
        let handle = sched.schedule_at(
            arrival_time,
            Box::new(move |sched: &mut dyn Scheduler| {
                wire_for_event.fire_end_of_transmission(&pdu_for_event, sched);
            }),
        );
        self.0
            .borrow_mut()
            .transmission_end_events
            .insert(pdu, handle);

        tracing::debug!(wire = %self.name(), %arrival_time, "scheduled end of transmission");
        Ok(arrival_time)
    }

    fn tag_collision(&self, sched: &mut dyn Scheduler) {
        let mut state = self.0.borrow_mut();
        for t in state.transmissions.values_mut() {
            t.mark_collision();
        }
        tracing::info!(wire = %state.name, "collision occurred");
        let receivers = state.receivers.clone();
        drop(state);
        for r in &receivers {
            r.on_collision(sched);
        }
    }

    /// Cancel an in-flight transmission before its end-event fires. Returns
    /// `true` if a transmission was actually cancelled, `false` if `pdu` was
    /// not in flight — see DESIGN.md's resolution of the open question on
    /// cancelling an unknown PDU.
    pub fn stop_transmission(&self, pdu: &Pdu) -> bool {
        let had_it = self.0.borrow().transmissions.contains_key(pdu);
        if !had_it {
            return false;
        }

        let scheduler = self.0.borrow().scheduler.clone();
        let mut sched = scheduler.borrow_mut();

        let handle = self.0.borrow_mut().transmission_end_events.remove(pdu);
        if let Some(handle) = handle {
            sched.cancel(handle);
        }
        self.0.borrow_mut().transmissions.remove(pdu);

        tracing::debug!(wire = %self.name(), "transmission cancelled");

        let now_idle = self.0.borrow().transmissions.is_empty();
        if now_idle {
            self.free_again_fan_out(&mut *sched);
        }
        true
    }

    fn fire_end_of_transmission(&self, pdu: &Pdu, sched: &mut dyn Scheduler) {
        self.0.borrow_mut().transmission_end_events.remove(pdu);
        let transmission = match self.0.borrow_mut().transmissions.remove(pdu) {
            Some(t) => t,
            None => return, // defensive: cancelled concurrently, should not happen
        };

        transmission.sender().on_data_sent(transmission.pdu());

        match &transmission {
            Transmission::Broadcast { .. } => {
                let receivers = self.0.borrow().receivers.clone();
                for r in &receivers {
                    r.on_data(&transmission);
                }
            }
            Transmission::Unicast { target, .. } => {
                let receiver = self.0.borrow().address_mapping.get(target).cloned();
                if let Some(r) = receiver {
                    r.on_data(&transmission);
                }
            }
        }

        let now_idle = self.0.borrow().transmissions.is_empty();
        if now_idle {
            self.free_again_fan_out(sched);
        }
    }

    /// Round-robin "wire free again" fan-out (spec §4.1.2): every receiver
    /// gets `onCopperFree`, rotating the start position across calls so
    /// each receiver gets to be first in turn over many busy→idle cycles.
    /// Stops early if a receiver callback re-busies the wire.
    ///
    /// The start position advances by one per *call*, not per notified
    /// receiver: snapshot it once, walk `n` (or fewer, if re-busied)
    /// receivers from there, then leave the cursor one past the snapshot so
    /// the next free-again event starts after the last notified receiver of
    /// this round — not past every individual notification.
    fn free_again_fan_out(&self, sched: &mut dyn Scheduler) {
        let n = self.0.borrow().receivers.len();
        if n == 0 {
            return;
        }
        tracing::info!(wire = %self.name(), "wire is free again");
        let start = self.0.borrow().round_robin_cursor % n;
        self.0.borrow_mut().round_robin_cursor = (start + 1) % n;
        let mut notified = 0;
        while notified < n && self.0.borrow().transmissions.is_empty() {
            let idx = (start + notified) % n;
            let receiver = self.0.borrow().receivers[idx].clone();
            receiver.on_copper_free(sched);
            notified += 1;
        }
    }
}
