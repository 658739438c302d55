#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::{
    constants::MULTIPATH_SLIP_THRESHOLD_M,
    prelude::{Duration, Position},
};

fn default_sampling_interval() -> Duration {
    Duration::from_seconds(1.0)
}

fn default_slip_threshold_m() -> f64 {
    MULTIPATH_SLIP_THRESHOLD_M
}

fn default_reference_position() -> Option<Position> {
    None
}

/// Quality control session [Config]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Nominal sampling interval of the observation stream.
    /// Gap detection and the expected observation count derive from it.
    #[cfg_attr(feature = "serde", serde(default = "default_sampling_interval"))]
    pub sampling_interval: Duration,

    /// Station reference [Position]. Without it, elevation, azimuth
    /// and DOP cannot be determined, but the session still runs.
    #[cfg_attr(feature = "serde", serde(default = "default_reference_position"))]
    pub reference_position: Option<Position>,

    /// Multipath residual (meters) above which a cycle slip is declared
    #[cfg_attr(feature = "serde", serde(default = "default_slip_threshold_m"))]
    pub slip_threshold_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_interval: default_sampling_interval(),
            reference_position: default_reference_position(),
            slip_threshold_m: default_slip_threshold_m(),
        }
    }
}

impl Config {
    /// Copies and returns [Config] with nominal sampling interval
    pub fn with_sampling_interval(&self, interval: Duration) -> Self {
        let mut s = self.clone();
        s.sampling_interval = interval;
        s
    }

    /// Copies and returns [Config] with station reference [Position]
    pub fn with_reference_position(&self, position: Position) -> Self {
        let mut s = self.clone();
        s.reference_position = Some(position);
        s
    }

    /// Copies and returns [Config] with custom multipath slip threshold (meters)
    pub fn with_slip_threshold_m(&self, threshold_m: f64) -> Self {
        let mut s = self.clone();
        s.slip_threshold_m = threshold_m;
        s
    }

    /// Maximal silence on one channel, before a gap is declared.
    pub(crate) fn gap_tolerance(&self) -> Duration {
        self.sampling_interval * crate::constants::GAP_INTERVAL_FACTOR
    }
}
