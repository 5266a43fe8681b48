//! Deserializable configuration for wiring up a simulation scenario from
//! YAML (spec §6, "Configuration (from host)").
//!
//! Grounded on the teacher's config-loading style in
//! `sem_os_core`'s port definitions (serde structs, `#[serde(rename_all =
//! "snake_case")]`, validation surfaced through the crate's own error type
//! rather than a bare `serde_yaml::Error`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use copper_types::UnicastAddress;

use crate::ber::BerSpec;
use crate::clock::Time;
use crate::error::{CopperError, Result};

/// One station's receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReceiverConfig {
    pub address: UnicastAddress,
    pub sensing_time: Time,
    pub ber: BerSpec,
}

/// One station's transmitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransmitterConfig {
    pub data_rate_bps: f64,
    pub sensing_time: Time,
}

/// One station: a transmitter/receiver pair attached to a named wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StationConfig {
    pub wire: String,
    pub transmitter: TransmitterConfig,
    pub receiver: ReceiverConfig,
}

/// A full scenario: every station that should be constructed and attached
/// to its wire at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioConfig {
    pub stations: HashMap<String, StationConfig>,
}

impl ScenarioConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|err| CopperError::InvalidConfig(format!("invalid scenario YAML: {err}")))
    }
}

impl TransmitterConfig {
    fn validate(&self) -> Result<()> {
        if self.data_rate_bps <= 0.0 {
            return Err(CopperError::InvalidConfig(format!(
                "data_rate_bps must be positive, got {}",
                self.data_rate_bps
            )));
        }
        if self.sensing_time < 0.0 {
            return Err(CopperError::InvalidConfig(format!(
                "sensing_time must be non-negative, got {}",
                self.sensing_time
            )));
        }
        Ok(())
    }
}

impl ReceiverConfig {
    fn validate(&self) -> Result<()> {
        if !self.address.is_valid() {
            return Err(CopperError::InvalidConfig(
                "receiver address must be non-zero".to_string(),
            ));
        }
        if self.sensing_time < 0.0 {
            return Err(CopperError::InvalidConfig(format!(
                "sensing_time must be non-negative, got {}",
                self.sensing_time
            )));
        }
        Ok(())
    }
}

impl StationConfig {
    pub fn validate(&self) -> Result<()> {
        self.transmitter.validate()?;
        self.receiver.validate()?;
        Ok(())
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        for station in self.stations.values() {
            station.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
stations:
  alice:
    wire: shared
    transmitter:
      data_rate_bps: 1000.0
      sensing_time: 0.0
    receiver:
      address: 1
      sensing_time: 0.0
      ber:
        kind: fixed
        value: 0.0
  bob:
    wire: shared
    transmitter:
      data_rate_bps: 1000.0
      sensing_time: 0.0
    receiver:
      address: 2
      sensing_time: 0.01
      ber:
        kind: uniform
        low: 0.0
        high: 0.001
"#;

    #[test]
    fn parses_a_two_station_scenario() {
        let scenario = ScenarioConfig::from_yaml(YAML).unwrap();
        assert_eq!(scenario.stations.len(), 2);
        assert!(scenario.validate().is_ok());
        let alice = &scenario.stations["alice"];
        assert_eq!(alice.receiver.address, UnicastAddress::new(1));
        assert_eq!(alice.wire, "shared");
    }

    #[test]
    fn rejects_zero_data_rate() {
        let yaml = YAML.replace("data_rate_bps: 1000.0", "data_rate_bps: 0.0");
        let scenario = ScenarioConfig::from_yaml(&yaml).unwrap();
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(ScenarioConfig::from_yaml("not: [valid, scenario").is_err());
    }
}
