use thiserror::Error;

use crate::{
    prelude::{Epoch, RelayState},
    relay::ConfigError,
    transport::TransportError,
};

#[derive(Debug, Error)]
pub enum Error {
    /// An [ObservationEpoch] must carry at least one satellite.
    #[error("{0} - empty epoch: no satellite observed")]
    EmptyEpoch(Epoch),

    /// Epochs must be strictly increasing, within one session.
    #[error("{0} - non monotonic epoch: previous epoch was {1}")]
    NonMonotonicEpoch(Epoch, Epoch),

    /// The report has been finalized and may no longer be modified.
    #[error("report is finalized: no more epochs accepted")]
    ReportFinalized,

    /// The QC worker thread stopped unexpectedly.
    #[error("qc worker thread panicked")]
    WorkerPanic,

    /// Any relay operation attempted from the wrong state.
    #[error("invalid relay operation \"{operation}\" in state {state}")]
    InvalidState {
        operation: &'static str,
        state: RelayState,
    },

    /// [StationPosition] must contain 3 cartesian coordinates followed by
    /// 3 topocentric offsets.
    #[error("{0} - invalid position vector: expecting 6 components, got {1}")]
    InvalidPositionVector(String, usize),

    /// The TRACEBUF2 packet would exceed the transport payload limit.
    #[error("packet size {size} exceeds maximal transport payload ({max} bytes)")]
    PacketTooLarge { size: usize, max: usize },

    /// A millimeter sample does not fit in the 32-bit payload word.
    #[error("{channel} - value {value_mm} mm does not fit a 32-bit sample")]
    SampleOverflow { channel: &'static str, value_mm: f64 },

    /// Wire packet does not decode.
    #[error("malformed trace packet: {0}")]
    MalformedPacket(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
