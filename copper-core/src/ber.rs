//! Bit-error-rate sampling.
//!
//! A `Receiver` draws a fresh BER per delivered frame, independent of
//! collision state (spec §4.3). `original_source` resolves the distribution
//! through a named plugin registry (`ber.__plugin__`); this crate reduces
//! that generality to the two strategies the configuration surface (§6) and
//! the test suite actually need — a fixed value for deterministic tests and
//! a uniform draw for everything else. Arbitrary random-variate
//! distributions are the external "distributions used to sample BER"
//! collaborator spec §1 places out of scope.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CopperError, Result};

/// Samples a bit-error-rate value in `[0, 1]` for one delivered frame.
pub trait BerDistribution {
    fn sample(&mut self) -> f64;
}

/// Always returns the same value. Useful for deterministic tests and for
/// MAC-layer development before a real channel model is wired in.
pub struct FixedBer(f64);

impl FixedBer {
    pub fn new(value: f64) -> Self {
        FixedBer(value)
    }
}

impl BerDistribution for FixedBer {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Draws uniformly from `[low, high]` using the thread-local RNG.
pub struct UniformBer {
    low: f64,
    high: f64,
}

impl UniformBer {
    pub fn new(low: f64, high: f64) -> Self {
        UniformBer { low, high }
    }
}

impl BerDistribution for UniformBer {
    fn sample(&mut self) -> f64 {
        if (self.high - self.low).abs() < f64::EPSILON {
            return self.low;
        }
        rand::thread_rng().gen_range(self.low..=self.high)
    }
}

/// The `receiver.ber` configuration key (spec §6): names a distribution and
/// carries its parameters. Deserializes from the tagged YAML shape
/// `{ kind: fixed, value: 0.0 }` / `{ kind: uniform, low: 0.0, high: 0.01 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BerSpec {
    Fixed { value: f64 },
    Uniform { low: f64, high: f64 },
}

impl BerSpec {
    pub fn build(&self) -> Result<Box<dyn BerDistribution>> {
        match *self {
            BerSpec::Fixed { value } => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(CopperError::InvalidConfig(format!(
                        "fixed BER value {value} out of [0, 1]"
                    )));
                }
                Ok(Box::new(FixedBer::new(value)))
            }
            BerSpec::Uniform { low, high } => {
                if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) || low > high {
                    return Err(CopperError::InvalidConfig(format!(
                        "uniform BER range [{low}, {high}] is not a valid sub-range of [0, 1]"
                    )));
                }
                Ok(Box::new(UniformBer::new(low, high)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ber_is_deterministic() {
        let mut d = FixedBer::new(0.42);
        assert_eq!(d.sample(), 0.42);
        assert_eq!(d.sample(), 0.42);
    }

    #[test]
    fn uniform_ber_stays_in_range() {
        let mut d = UniformBer::new(0.1, 0.2);
        for _ in 0..100 {
            let v = d.sample();
            assert!((0.1..=0.2).contains(&v));
        }
    }

    #[test]
    fn spec_rejects_out_of_range_fixed_value() {
        let spec = BerSpec::Fixed { value: 1.5 };
        assert!(spec.build().is_err());
    }

    #[test]
    fn spec_builds_from_yaml() {
        let spec: BerSpec = serde_yaml::from_str("kind: uniform\nlow: 0.0\nhigh: 0.01\n").unwrap();
        assert!(spec.build().is_ok());
    }
}
