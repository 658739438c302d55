#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod averager;
mod bytes_counter;
mod carrier;
mod cfg;
mod ephemeris;
mod error;
mod observation;
mod position;

// public modules
pub mod constants;
pub mod qc;
pub mod relay;
pub mod transport;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::averager::Averager;
    pub use crate::bytes_counter::ByteActivityCounter;
    pub use crate::carrier::Carrier;
    pub use crate::cfg::Config;
    pub use crate::ephemeris::{Ephemeris, EphemerisGate};
    pub use crate::error::Error;
    pub use crate::observation::{Observation, ObservationEpoch, SatelliteObservation};
    pub use crate::position::Position;
    pub use crate::qc::{
        ChannelKey, DilutionOfPrecision, QcChannelReport, QcEpochRecord, QcReport,
        QcReportAggregator, QcSatReport, QcSession, SessionInfo, SignalTrackState,
    };
    pub use crate::relay::{PositionRelay, RelayConfig, RelayState, StationPosition};
    pub use crate::transport::{MemoryRing, Registry, StaticRegistry, Transport};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
