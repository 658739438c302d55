use std::collections::{BTreeMap, BTreeSet};

use log::info;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{
    prelude::{Carrier, Duration, Epoch, Error, SV},
    qc::summary::{QcEpochRecord, QcSatSummary},
};

/// Session description, as found in the observation header
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SessionInfo {
    pub marker_name: Option<String>,
    pub antenna_name: Option<String>,
    pub receiver_type: Option<String>,
}

/// Final statistics of one channel
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcChannelReport {
    pub carrier: Carrier,
    /// Number of observations
    pub num_obs: u64,
    /// Observations present / expected, in %
    pub availability_percent: Option<f64>,
    pub num_slips_flagged: u64,
    pub num_slips_found: u64,
    /// Slips (flagged and found) per hour of observation
    pub slips_per_hour: Option<f64>,
    pub num_gaps: u64,
    pub mean_snr_dbhz: Option<f64>,
    pub multipath_mean_m: Option<f64>,
    pub multipath_std_m: Option<f64>,
}

/// Final statistics of one satellite
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcSatReport {
    pub sv: SV,
    /// Expected number of observations over the session
    pub num_expected: u64,
    /// Observed epochs excluded for lack of ephemeris
    pub num_excluded: u64,
    pub channels: Vec<QcChannelReport>,
}

/// Per [Carrier] plotting series
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CarrierSeries {
    pub ok: Vec<f64>,
    pub slip: Vec<f64>,
    pub gap: Vec<f64>,
}

/// Sky plot sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SkyPoint {
    pub sv: SV,
    pub carrier: Carrier,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub multipath_m: Option<f64>,
    pub snr_dbhz: Option<f64>,
}

/// Time series, ready for the plotting collaborators
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PlotData {
    /// MJD (UTC) x 24: time in hours
    pub mjd_x24: Vec<f64>,
    pub num_sat: Vec<f64>,
    /// PDOP, NaN when undefined
    pub pdop: Vec<f64>,
    pub carriers: BTreeMap<Carrier, CarrierSeries>,
    /// Elevation series, per satellite: (MJD x 24, elevation in degrees)
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_per_sv"))]
    pub elevation_deg: BTreeMap<SV, Vec<(f64, f64)>>,
    pub sky: Vec<SkyPoint>,
}

#[cfg(feature = "serde")]
fn serialize_per_sv<S: serde::Serializer>(
    series: &BTreeMap<SV, Vec<(f64, f64)>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(series.iter().map(|(sv, points)| (sv.to_string(), points)))
}

impl PlotData {
    fn new(records: &[QcEpochRecord]) -> Self {
        let mut s = Self::default();

        let carriers = records
            .iter()
            .flat_map(|rec| rec.counts.keys().copied())
            .collect::<BTreeSet<_>>();

        for rec in records.iter() {
            let hours = rec.epoch.to_mjd_utc_days() * 24.0;

            s.mjd_x24.push(hours);
            s.num_sat.push(rec.num_sat() as f64);
            s.pdop.push(rec.pdop().unwrap_or(f64::NAN));

            for carrier in carriers.iter() {
                let counts = rec.counts.get(carrier).copied().unwrap_or_default();
                let series = s.carriers.entry(*carrier).or_default();
                series.ok.push(counts.ok as f64);
                series.slip.push(counts.slipped as f64);
                series.gap.push(counts.gapped as f64);
            }

            for (sv, elev) in rec.elevations() {
                s.elevation_deg.entry(sv).or_default().push((hours, elev));
            }

            for sat in rec.satellites.iter() {
                let (elevation_deg, azimuth_deg) = match (sat.elevation_deg, sat.azimuth_deg) {
                    (Some(elev), Some(azim)) => (elev, azim),
                    _ => continue,
                };
                for channel in sat.channels.iter() {
                    s.sky.push(SkyPoint {
                        sv: sat.sv,
                        carrier: channel.carrier,
                        azimuth_deg,
                        elevation_deg,
                        multipath_m: channel.multipath_m,
                        snr_dbhz: channel.snr_dbhz,
                    });
                }
            }
        }
        s
    }
}

/// Finalized quality control [QcReport]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QcReport {
    pub info: SessionInfo,
    /// Nominal sampling interval
    pub interval: Duration,
    pub first_epoch: Option<Epoch>,
    pub last_epoch: Option<Epoch>,
    /// Number of processed epochs
    pub num_epochs: usize,
    /// Number of rejected (malformed) epochs
    pub num_rejected: usize,
    /// Expected number of epochs over the session
    pub num_expected_epochs: u64,
    pub satellites: Vec<QcSatReport>,
    pub epochs: Vec<QcEpochRecord>,
    pub plot: PlotData,
}

impl QcReport {
    /// [QcSatReport] for this [SV]
    pub fn satellite(&self, sv: SV) -> Option<&QcSatReport> {
        self.satellites.iter().find(|sat| sat.sv == sv)
    }

    /// [QcChannelReport] for this channel
    pub fn channel(&self, sv: SV, carrier: Carrier) -> Option<&QcChannelReport> {
        self.satellite(sv)?
            .channels
            .iter()
            .find(|ch| ch.carrier == carrier)
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{:.*}", precision, value),
        None => "-".to_string(),
    }
}

impl std::fmt::Display for QcReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        writeln!(f, "QC Report")?;
        writeln!(f, "---------")?;

        let fields = [
            ("Marker name", &self.info.marker_name),
            ("Antenna name", &self.info.antenna_name),
            ("Receiver type", &self.info.receiver_type),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                writeln!(f, "{:<16}: {}", label, value)?;
            }
        }

        if let (Some(first), Some(last)) = (self.first_epoch, self.last_epoch) {
            writeln!(f, "{:<16}: {}", "Start time", first)?;
            writeln!(f, "{:<16}: {}", "End time", last)?;
        }

        writeln!(f, "{:<16}: {}", "Interval", self.interval)?;
        writeln!(
            f,
            "{:<16}: {} / {} expected ({} rejected)",
            "Epochs", self.num_epochs, self.num_expected_epochs, self.num_rejected
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "{:<4} {:<8} {:>7} {:>7} {:>6} {:>6} {:>7} {:>5} {:>6} {:>7} {:>7}",
            "SV", "Signal", "Obs", "Avail%", "Flag", "Found", "Slip/h", "Gaps", "SNR", "MP", "MPstd"
        )?;

        for sat in self.satellites.iter() {
            if sat.channels.is_empty() {
                writeln!(
                    f,
                    "{:<4} {:<8} {:>7} {:>7}   (excluded: {}, expected: {})",
                    sat.sv.to_string(), "-", 0, "0.0", sat.num_excluded, sat.num_expected
                )?;
            }
            for ch in sat.channels.iter() {
                writeln!(
                    f,
                    "{:<4} {:<8} {:>7} {:>7} {:>6} {:>6} {:>7} {:>5} {:>6} {:>7} {:>7}",
                    sat.sv.to_string(),
                    ch.carrier.to_string(),
                    ch.num_obs,
                    fmt_opt(ch.availability_percent, 1),
                    ch.num_slips_flagged,
                    ch.num_slips_found,
                    fmt_opt(ch.slips_per_hour, 2),
                    ch.num_gaps,
                    fmt_opt(ch.mean_snr_dbhz, 1),
                    fmt_opt(ch.multipath_mean_m, 3),
                    fmt_opt(ch.multipath_std_m, 3),
                )?;
            }
        }
        Ok(())
    }
}

/// [QcReportAggregator] owns the session summaries and the
/// ordered [QcEpochRecord] sequence.
#[derive(Debug, Clone)]
pub struct QcReportAggregator {
    /// Nominal sampling interval
    interval: Duration,
    info: SessionInfo,
    summaries: BTreeMap<SV, QcSatSummary>,
    /// Satellites expected to be seen (broadcast ephemeris)
    expected: BTreeSet<SV>,
    records: Vec<QcEpochRecord>,
    num_rejected: usize,
    report: Option<QcReport>,
}

impl QcReportAggregator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            info: Default::default(),
            summaries: Default::default(),
            expected: Default::default(),
            records: Default::default(),
            num_rejected: 0,
            report: None,
        }
    }

    /// Copies and returns [QcReportAggregator] with [SessionInfo]
    pub fn with_info(&self, info: SessionInfo) -> Self {
        let mut s = self.clone();
        s.info = info;
        s
    }

    /// Declares satellites for which observations are expected,
    /// even if they are never observed.
    pub fn expect<I: IntoIterator<Item = SV>>(&mut self, svs: I) {
        self.expected.extend(svs);
    }

    pub fn is_finalized(&self) -> bool {
        self.report.is_some()
    }

    /// Running [QcSatSummary] of this [SV]
    pub fn summary(&self, sv: SV) -> Option<&QcSatSummary> {
        self.summaries.get(&sv)
    }

    /// Records collected so far, in chronological order
    pub fn records(&self) -> &[QcEpochRecord] {
        &self.records
    }

    /// Folds a new [QcEpochRecord] into the running summaries.
    pub fn add(&mut self, record: QcEpochRecord) -> Result<(), Error> {
        if self.is_finalized() {
            return Err(Error::ReportFinalized);
        }

        for sat in record.satellites.iter() {
            self.summaries.entry(sat.sv).or_default().update(sat);
        }

        for sv in record.excluded.iter() {
            self.summaries.entry(*sv).or_default().num_excluded += 1;
        }

        self.records.push(record);
        Ok(())
    }

    /// Counts one rejected epoch
    pub fn reject(&mut self) -> Result<(), Error> {
        if self.is_finalized() {
            return Err(Error::ReportFinalized);
        }
        self.num_rejected += 1;
        Ok(())
    }

    /// Nominal number of epochs over the session:
    /// elevation independent, from session duration and interval.
    fn expected_epochs(&self) -> u64 {
        let (first, last) = match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => (first.epoch, last.epoch),
            _ => return 0,
        };
        let interval_s = self.interval.to_seconds();
        if interval_s <= 0.0 {
            return self.records.len() as u64;
        }
        ((last - first).to_seconds() / interval_s).round() as u64 + 1
    }

    /// Finalizes and returns the [QcReport]. Calling this again returns
    /// the same report without recomputing it.
    pub fn finalize(&mut self) -> &QcReport {
        let report = match self.report.take() {
            Some(report) => report,
            None => {
                let report = self.build_report();
                info!(
                    "qc session finalized: {} epochs, {} satellites",
                    report.num_epochs,
                    report.satellites.len()
                );
                report
            },
        };
        self.report.insert(report)
    }

    /// Finalizes and consumes this [QcReportAggregator]
    pub fn into_report(mut self) -> QcReport {
        match self.report.take() {
            Some(report) => report,
            None => self.build_report(),
        }
    }

    fn build_report(&self) -> QcReport {
        let num_expected = self.expected_epochs();
        let hours_per_obs = self.interval.to_seconds() / 3600.0;

        let svs = self
            .summaries
            .keys()
            .chain(self.expected.iter())
            .copied()
            .collect::<BTreeSet<_>>();

        let satellites = svs
            .into_iter()
            .map(|sv| {
                let summary = self.summaries.get(&sv).cloned().unwrap_or_default();
                let channels = summary
                    .channels
                    .iter()
                    .map(|(carrier, ch)| {
                        let num_slips = ch.num_slips_flagged + ch.num_slips_found;
                        let obs_hours = ch.num_obs as f64 * hours_per_obs;
                        QcChannelReport {
                            carrier: *carrier,
                            num_obs: ch.num_obs,
                            availability_percent: if num_expected > 0 {
                                Some(100.0 * ch.num_obs as f64 / num_expected as f64)
                            } else {
                                None
                            },
                            num_slips_flagged: ch.num_slips_flagged,
                            num_slips_found: ch.num_slips_found,
                            slips_per_hour: if obs_hours > 0.0 {
                                Some(num_slips as f64 / obs_hours)
                            } else {
                                None
                            },
                            num_gaps: ch.num_gaps,
                            mean_snr_dbhz: ch.snr.mean(),
                            multipath_mean_m: ch.multipath.mean(),
                            multipath_std_m: ch.multipath.std_dev(),
                        }
                    })
                    .collect();

                QcSatReport {
                    sv,
                    num_expected,
                    num_excluded: summary.num_excluded,
                    channels,
                }
            })
            .collect();

        QcReport {
            info: self.info.clone(),
            interval: self.interval,
            first_epoch: self.records.first().map(|rec| rec.epoch),
            last_epoch: self.records.last().map(|rec| rec.epoch),
            num_epochs: self.records.len(),
            num_rejected: self.num_rejected,
            num_expected_epochs: num_expected,
            satellites,
            epochs: self.records.clone(),
            plot: PlotData::new(&self.records),
        }
    }
}
