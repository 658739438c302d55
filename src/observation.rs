//! Observation epochs, as delivered by the data parsers
use std::collections::BTreeMap;

use crate::prelude::{Carrier, Epoch, SV};

/// Signal [Observation] on one frequency channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// [Carrier] frequency.
    pub carrier: Carrier,
    /// Pseudo range observation, expressed in meters.
    pub pseudo_range_m: Option<f64>,
    /// Ambiguous phase range observation, expressed in meters.
    /// Only present when the carrier is being tracked.
    pub phase_range_m: Option<f64>,
    /// Possible SNR indication (in dB/Hz).
    pub snr_dbhz: Option<f64>,
    /// Loss of lock, as reported by the receiver.
    pub slip: bool,
}

impl Observation {
    /// Creates new pseudo range [Observation] (in meters), with possible
    /// SNR in dB/Hz.
    pub fn pseudo_range(carrier: Carrier, range_m: f64, snr_dbhz: Option<f64>) -> Self {
        Self {
            carrier,
            snr_dbhz,
            slip: false,
            phase_range_m: None,
            pseudo_range_m: Some(range_m),
        }
    }

    /// Creates new ambiguous phase range [Observation] (in meters), with possible
    /// SNR in dB/Hz.
    pub fn phase_range(carrier: Carrier, range_m: f64, snr_dbhz: Option<f64>) -> Self {
        Self {
            carrier,
            snr_dbhz,
            slip: false,
            pseudo_range_m: None,
            phase_range_m: Some(range_m),
        }
    }

    /// Creates new [Observation] with both code and phase (in meters).
    pub fn code_phase(carrier: Carrier, pseudo_range_m: f64, phase_range_m: f64) -> Self {
        Self {
            carrier,
            slip: false,
            snr_dbhz: None,
            pseudo_range_m: Some(pseudo_range_m),
            phase_range_m: Some(phase_range_m),
        }
    }

    /// Copies and returns new [Observation] with defined pseudo range (in meters).
    pub fn with_pseudo_range_m(&self, pseudo_range_m: f64) -> Self {
        let mut s = self.clone();
        s.pseudo_range_m = Some(pseudo_range_m);
        s
    }

    /// Copies and returns new [Observation] with defined phase range (in meters).
    pub fn with_phase_range_m(&self, phase_range_m: f64) -> Self {
        let mut s = self.clone();
        s.phase_range_m = Some(phase_range_m);
        s
    }

    /// Copies and returns new [Observation] with SNR (in dB/Hz).
    pub fn with_snr_dbhz(&self, snr_dbhz: f64) -> Self {
        let mut s = self.clone();
        s.snr_dbhz = Some(snr_dbhz);
        s
    }

    /// Copies and returns new [Observation] flagged with loss of lock.
    pub fn with_slip(&self) -> Self {
        let mut s = self.clone();
        s.slip = true;
        s
    }

    /// True when either code or phase is present
    pub fn is_valid(&self) -> bool {
        self.pseudo_range_m.is_some() || self.phase_range_m.is_some()
    }
}

/// One satellite's [Observation]s within an epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteObservation {
    /// [SV]
    pub sv: SV,
    /// Per channel [Observation]s
    pub observations: Vec<Observation>,
}

impl SatelliteObservation {
    pub fn new(sv: SV, observations: Vec<Observation>) -> Self {
        Self { sv, observations }
    }

    /// Returns [Observation] for this [Carrier], if any
    pub fn observation(&self, carrier: Carrier) -> Option<&Observation> {
        self.observations.iter().find(|obs| obs.carrier == carrier)
    }
}

/// Timestamped set of [SatelliteObservation]s for one station.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationEpoch {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Observations, per [SV]
    pub satellites: BTreeMap<SV, SatelliteObservation>,
}

impl ObservationEpoch {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            satellites: Default::default(),
        }
    }

    /// Copies and returns [ObservationEpoch] with this [SatelliteObservation].
    /// Replaces any former observation of the same [SV].
    pub fn with_satellite(&self, satellite: SatelliteObservation) -> Self {
        let mut s = self.clone();
        s.satellites.insert(satellite.sv, satellite);
        s
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}
