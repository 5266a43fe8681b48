//! Discrete-event simulation core for a shared wired broadcast medium:
//! `Wire`, `Transmitter`, `Receiver`, `Transceiver`, and the `WireBroker`
//! registry that ties multiple stations to the same medium.
//!
//! Single-threaded and cooperative throughout — every type here is built on
//! `Rc`/`RefCell`, not `Arc`/`Mutex`, because nothing in this crate ever
//! crosses a real thread or suspends at an `.await` point. Time only
//! advances when the host's `Scheduler` runs the next event.

pub mod ber;
pub mod clock;
pub mod config;
pub mod error;
pub mod receiver;
pub mod transceiver;
pub mod transmitter;
pub mod wire;

pub use ber::{BerDistribution, BerSpec, FixedBer, UniformBer};
pub use clock::{Clock, EventHandle, Scheduler, SimScheduler, Time};
pub use config::{ReceiverConfig, ScenarioConfig, StationConfig, TransmitterConfig};
pub use error::{CopperError, Result};
pub use receiver::{CarrierSensing, Handler, Receiver};
pub use transceiver::{Transceiver, WireBroker};
pub use transmitter::{DataTransmissionFeedback, Transmitter};
pub use wire::{ReceiverCapability, Wire};

pub use copper_types::{DataSentSink, Pdu, Transmission, UnicastAddress};
