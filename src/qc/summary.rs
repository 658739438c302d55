use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{
    averager::Averager,
    prelude::{Carrier, DilutionOfPrecision, Epoch, SV},
};

/// Quality of one channel, at one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcChannelEpoch {
    /// [Carrier]
    pub carrier: Carrier,
    /// Phase observation present
    pub phase_valid: bool,
    /// Code observation present
    pub code_valid: bool,
    /// Loss of lock reported by the receiver
    pub slip_flagged: bool,
    /// Cycle slip found by the multipath check
    pub slip_found: bool,
    /// Channel was silent for too long
    pub gap: bool,
    /// Multipath (arc standard deviation) in meters
    pub multipath_m: Option<f64>,
    /// SNR in dB/Hz
    pub snr_dbhz: Option<f64>,
}

impl QcChannelEpoch {
    pub fn slip(&self) -> bool {
        self.slip_flagged || self.slip_found
    }

    /// True when code or phase was observed
    pub fn is_valid(&self) -> bool {
        self.code_valid || self.phase_valid
    }
}

/// Quality of one satellite, at one epoch
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcSatEpoch {
    pub sv: SV,
    /// Elevation in degrees, when it could be determined
    pub elevation_deg: Option<f64>,
    /// Azimuth in degrees, when it could be determined
    pub azimuth_deg: Option<f64>,
    /// Per channel quality
    pub channels: Vec<QcChannelEpoch>,
}

/// Channel counts of one epoch, for one [Carrier]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ChannelCounts {
    /// Phase tracked without anomaly
    pub ok: usize,
    /// Slipped (flagged or found)
    pub slipped: usize,
    /// Resumed after a gap
    pub gapped: usize,
}

/// [QcEpochRecord] produced for each processed epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcEpochRecord {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// [DilutionOfPrecision], None when undefined (fewer than 4
    /// satellites with known elevation and azimuth).
    pub dop: Option<DilutionOfPrecision>,
    /// Satellites that contributed
    pub satellites: Vec<QcSatEpoch>,
    /// Satellites that were observed but excluded for lack of ephemeris
    pub excluded: Vec<SV>,
    /// Per [Carrier] counts
    pub counts: BTreeMap<Carrier, ChannelCounts>,
}

impl QcEpochRecord {
    pub(crate) fn new(
        epoch: Epoch,
        dop: Option<DilutionOfPrecision>,
        satellites: Vec<QcSatEpoch>,
        excluded: Vec<SV>,
    ) -> Self {
        let mut counts = BTreeMap::<Carrier, ChannelCounts>::new();

        for channel in satellites.iter().flat_map(|sat| sat.channels.iter()) {
            let counts = counts.entry(channel.carrier).or_default();
            if channel.slip() {
                counts.slipped += 1;
            } else if channel.gap {
                counts.gapped += 1;
            } else if channel.phase_valid {
                counts.ok += 1;
            }
        }

        Self {
            epoch,
            dop,
            satellites,
            excluded,
            counts,
        }
    }

    /// Position dilution of precision, if defined
    pub fn pdop(&self) -> Option<f64> {
        self.dop.map(|dop| dop.pdop)
    }

    /// Number of contributing satellites
    pub fn num_sat(&self) -> usize {
        self.satellites.len()
    }

    /// Elevation of each satellite, when known
    pub fn elevations(&self) -> impl Iterator<Item = (SV, f64)> + '_ {
        self.satellites
            .iter()
            .filter_map(|sat| Some((sat.sv, sat.elevation_deg?)))
    }
}

/// Per channel statistics, over the whole session
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcChannelSummary {
    pub num_obs: u64,
    pub num_slips_flagged: u64,
    pub num_slips_found: u64,
    pub num_gaps: u64,
    pub snr: Averager,
    pub multipath: Averager,
}

/// Per satellite statistics, over the whole session
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcSatSummary {
    /// Per [Carrier] statistics
    pub channels: BTreeMap<Carrier, QcChannelSummary>,
    /// Number of epochs this satellite was observed
    /// but excluded for lack of ephemeris
    pub num_excluded: u64,
}

impl QcSatSummary {
    /// Folds one [QcSatEpoch] into this summary
    pub(crate) fn update(&mut self, sat: &QcSatEpoch) {
        for channel in sat.channels.iter() {
            let summary = self.channels.entry(channel.carrier).or_default();

            if channel.is_valid() {
                summary.num_obs += 1;
            }

            if channel.slip_flagged {
                summary.num_slips_flagged += 1;
            }
            if channel.slip_found {
                summary.num_slips_found += 1;
            }
            if channel.gap {
                summary.num_gaps += 1;
            }
            if let Some(snr) = channel.snr_dbhz {
                summary.snr.add(snr);
            }
            if let Some(mp) = channel.multipath_m {
                summary.multipath.add(mp);
            }
        }
    }
}
