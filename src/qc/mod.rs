//! Streaming observation quality control
mod dop;
mod multipath;
mod processor;
mod report;
mod session;
mod summary;
mod tracker;

pub use dop::DilutionOfPrecision;
pub use processor::EpochProcessor;
pub use report::{
    CarrierSeries, PlotData, QcChannelReport, QcReport, QcReportAggregator, QcSatReport,
    SessionInfo, SkyPoint,
};
pub use session::QcSession;
pub use summary::{
    ChannelCounts, QcChannelEpoch, QcChannelSummary, QcEpochRecord, QcSatEpoch, QcSatSummary,
};
pub use tracker::{ChannelKey, SignalTrackState};
