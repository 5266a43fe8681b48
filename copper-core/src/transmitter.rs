//! The sending half of a station: frames an outgoing PDU, computes its
//! on-wire duration from a configured data rate, senses the medium through a
//! configurable sensing delay, and fans delivery feedback out to interested
//! observers.
//!
//! Grounded on `original_source/src/Transmitter.cpp`: `sendData` always
//! forwards unconditionally to the wire (no busy-check of its own —
//! `Wire::send_data` is the only place a duplicate PDU is rejected),
//! `cancelData` forwards the caller's PDU handle straight to
//! `stopTransmission`, and `isFree` compares `wire.blockedSince()` against
//! this transmitter's own `sensingTime` rather than tracking an in-flight
//! flag.

use std::cell::RefCell;
use std::rc::Rc;

use copper_types::{DataSentSink, Pdu, UnicastAddress};

use crate::clock::Time;
use crate::error::Result;
use crate::wire::Wire;

/// Observer notified once a `Transmitter`'s PDU has finished crossing the
/// wire (spec §4.2, "DataTransmissionFeedback").
pub trait DataTransmissionFeedback {
    fn on_data_sent(&self, pdu: &Pdu);
}

struct TransmitterState {
    wire: Wire,
    data_rate_bps: f64,
    sensing_time: Time,
    observers: Vec<Rc<dyn DataTransmissionFeedback>>,
}

/// One station's transmitting half. `data_rate_bps` turns a PDU's length
/// into an on-wire duration; `sensing_time` models how long it takes this
/// transmitter to detect the wire's state (spec §4.2). A `sensing_time` of
/// `0.0` gives collision-free carrier sensing from this transmitter's own
/// point of view; larger values model a CSMA hidden-start window.
#[derive(Clone)]
pub struct Transmitter(Rc<RefCell<TransmitterState>>);

impl Transmitter {
    pub fn new(wire: Wire, data_rate_bps: f64, sensing_time: Time) -> Self {
        Transmitter(Rc::new(RefCell::new(TransmitterState {
            wire,
            data_rate_bps,
            sensing_time,
            observers: Vec::new(),
        })))
    }

    pub fn add_observer(&self, observer: Rc<dyn DataTransmissionFeedback>) {
        self.0.borrow_mut().observers.push(observer);
    }

    /// Whether this transmitter currently senses the wire as free.
    pub fn is_free(&self) -> bool {
        let state = self.0.borrow();
        state.wire.blocked_since() < state.sensing_time
    }

    fn duration_for(&self, pdu: &Pdu) -> Time {
        let rate = self.0.borrow().data_rate_bps;
        pdu.length_in_bits() as f64 / rate
    }

    /// Broadcast `pdu` onto the wire.
    pub fn send_broadcast(&self, pdu: Pdu) -> Result<Time> {
        self.send(pdu, None)
    }

    /// Unicast `pdu` to `target`. Fails if `target` is not registered on the
    /// wire, or if `pdu` is already scheduled.
    pub fn send_unicast(&self, pdu: Pdu, target: UnicastAddress) -> Result<Time> {
        self.send(pdu, Some(target))
    }

    fn send(&self, pdu: Pdu, target: Option<UnicastAddress>) -> Result<Time> {
        let duration = self.duration_for(&pdu);
        let sink: Rc<dyn DataSentSink> = Rc::new(self.clone());
        let transmission = match target {
            Some(target) => copper_types::Transmission::unicast(pdu, sink, target),
            None => copper_types::Transmission::broadcast(pdu, sink),
        };
        let wire = self.0.borrow().wire.clone();
        wire.send_data(transmission, duration)
    }

    /// Cancel `pdu` if it is still in flight on the wire. Returns `false`
    /// otherwise — see `Wire::stop_transmission`.
    pub fn cancel(&self, pdu: &Pdu) -> bool {
        let wire = self.0.borrow().wire.clone();
        wire.stop_transmission(pdu)
    }
}

/// `Transmitter` is itself the sink the wire calls back into once one of its
/// PDUs has finished transmission, so it can fan the notification out to its
/// own feedback observers.
impl DataSentSink for Transmitter {
    fn on_data_sent(&self, pdu: &Pdu) {
        let observers = self.0.borrow().observers.clone();
        for o in &observers {
            o.on_data_sent(pdu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Scheduler, SimScheduler};
    use crate::error::CopperError;
    use std::cell::RefCell as Cell;

    #[derive(Default)]
    struct RecordingFeedback {
        notified: Cell<Vec<Pdu>>,
    }
    impl DataTransmissionFeedback for RecordingFeedback {
        fn on_data_sent(&self, pdu: &Pdu) {
            self.notified.borrow_mut().push(pdu.clone());
        }
    }

    fn wire() -> (Wire, Rc<RefCell<SimScheduler>>) {
        let sched: Rc<RefCell<SimScheduler>> = Rc::new(RefCell::new(SimScheduler::new()));
        (Wire::new("w", sched.clone()), sched)
    }

    #[test]
    fn duration_is_bits_over_rate() {
        let (wire, sched) = wire();
        let tx = Transmitter::new(wire, 1000.0, 0.0);
        let arrival = tx.send_broadcast(Pdu::new(8000)).unwrap();
        assert_eq!(arrival, 8.0);
        sched.borrow_mut().run_all();
    }

    #[test]
    fn sending_the_same_pdu_twice_is_an_error() {
        let (wire, _sched) = wire();
        let tx = Transmitter::new(wire, 1000.0, 0.0);
        let pdu = Pdu::new(8000);
        tx.send_broadcast(pdu.clone()).unwrap();
        let err = tx.send_broadcast(pdu).unwrap_err();
        assert!(matches!(err, CopperError::DuplicateTransmission));
    }

    #[test]
    fn notifies_feedback_observers_once_delivered() {
        let (wire, sched) = wire();
        let tx = Transmitter::new(wire, 1000.0, 0.0);
        let fb = Rc::new(RecordingFeedback::default());
        tx.add_observer(fb.clone());
        tx.send_broadcast(Pdu::new(8000)).unwrap();
        sched.borrow_mut().run_all();
        assert_eq!(fb.notified.borrow().len(), 1);
    }

    #[test]
    fn cancel_frees_the_wire_without_notifying_feedback() {
        let (wire, _sched) = wire();
        let tx = Transmitter::new(wire, 1000.0, 0.0);
        let fb = Rc::new(RecordingFeedback::default());
        tx.add_observer(fb.clone());
        let pdu = Pdu::new(8000);
        tx.send_broadcast(pdu.clone()).unwrap();
        assert!(tx.cancel(&pdu));
        assert!(fb.notified.borrow().is_empty());
    }

    #[test]
    fn cancelling_an_unknown_pdu_is_false() {
        let (wire, _sched) = wire();
        let tx = Transmitter::new(wire, 1000.0, 0.0);
        assert!(!tx.cancel(&Pdu::new(8)));
    }

    // S7: Transmitter.isFree with sensing_time = 0.1 and various
    // wire.blockedSince() readings.
    #[test]
    fn s7_is_free_compares_blocked_since_against_sensing_time() {
        let sched: Rc<RefCell<SimScheduler>> = Rc::new(RefCell::new(SimScheduler::new()));
        let wire = Wire::new("w", sched.clone());
        let tx = Transmitter::new(wire.clone(), 1000.0, 0.1);
        let sink: Rc<dyn DataSentSink> = Rc::new(NullSink);

        // blockedSince == -1.0 (idle)
        assert!(tx.is_free());

        wire.send_data(
            copper_types::Transmission::broadcast(Pdu::new(8), sink),
            10.0,
        )
        .unwrap();
        // blockedSince == 0.0
        assert!(tx.is_free());

        sched.borrow_mut().schedule_at(0.05, Box::new(|_| {}));
        sched.borrow_mut().run_next();
        // blockedSince == 0.05
        assert!(tx.is_free());

        sched.borrow_mut().schedule_at(0.1, Box::new(|_| {}));
        sched.borrow_mut().run_next();
        // blockedSince == 0.1, not strictly less than sensing_time
        assert!(!tx.is_free());

        sched.borrow_mut().schedule_at(1.0, Box::new(|_| {}));
        sched.borrow_mut().run_next();
        // blockedSince == 1.0
        assert!(!tx.is_free());
    }

    struct NullSink;
    impl DataSentSink for NullSink {
        fn on_data_sent(&self, _pdu: &Pdu) {}
    }
}
