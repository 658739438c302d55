use log::{debug, warn};

use crate::{
    ephemeris::EphemerisGate,
    prelude::{Config, DilutionOfPrecision, Epoch, Error, ObservationEpoch},
    qc::{
        multipath,
        summary::{QcChannelEpoch, QcEpochRecord, QcSatEpoch},
        tracker::{ChannelKey, SignalTrackState, TrackTable},
    },
};

/// [EpochProcessor] consumes observation epochs in chronological order
/// and maintains one [SignalTrackState] per channel.
#[derive(Debug, Clone)]
pub struct EpochProcessor {
    /// [Config]
    cfg: Config,
    /// Tracking states
    table: TrackTable,
    /// Latest processed [Epoch]
    last_epoch: Option<Epoch>,
}

impl EpochProcessor {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            last_epoch: None,
            table: TrackTable::default(),
        }
    }

    /// [Config] in use
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Latest processed [Epoch]
    pub fn last_epoch(&self) -> Option<Epoch> {
        self.last_epoch
    }

    /// [SignalTrackState] of this channel, if it was ever seen
    pub fn track_state(&self, key: &ChannelKey) -> Option<&SignalTrackState> {
        self.table.state(key)
    }

    /// Number of tracked channels
    pub fn num_channels(&self) -> usize {
        self.table.len()
    }

    /// Processes a new [ObservationEpoch], returning its [QcEpochRecord].
    /// Satellites without valid ephemeris are excluded from the computation.
    /// Empty and non chronological epochs are rejected: the processor state
    /// is not modified and the next epoch may be processed.
    pub fn process_epoch(
        &mut self,
        epoch: &ObservationEpoch,
        gate: &EphemerisGate,
    ) -> Result<QcEpochRecord, Error> {
        let t = epoch.epoch;

        if epoch.is_empty() {
            warn!("{} - rejecting empty epoch", t);
            return Err(Error::EmptyEpoch(t));
        }

        if let Some(last) = self.last_epoch {
            if t <= last {
                warn!("{} - rejecting non chronological epoch (last: {})", t, last);
                return Err(Error::NonMonotonicEpoch(t, last));
            }
        }

        self.last_epoch = Some(t);

        let gap_tolerance = self.cfg.gap_tolerance();
        let slip_threshold_m = self.cfg.slip_threshold_m;

        let mut satellites = Vec::with_capacity(epoch.satellites.len());
        let mut excluded = Vec::new();

        for (sv, satellite) in epoch.satellites.iter() {
            let eph = match gate.select(*sv, t) {
                Some(eph) => eph,
                None => {
                    debug!("{} ({}) - no valid ephemeris", t, sv);
                    excluded.push(*sv);
                    continue;
                },
            };

            let (elevation_deg, azimuth_deg) = match &self.cfg.reference_position {
                Some(reference) => match eph.position_ecef_m(t) {
                    Some(sv_ecef_m) => {
                        let (elev, azim) = reference.elevation_azimuth_deg(sv_ecef_m);
                        (Some(elev), Some(azim))
                    },
                    None => (None, None),
                },
                None => (None, None),
            };

            let mut channels = Vec::with_capacity(satellite.observations.len());

            for obs in satellite.observations.iter() {
                let multipath_m = multipath::partner(satellite, obs)
                    .and_then(|partner| multipath::code_multipath_m(obs, partner));

                let state = self.table.state_mut(ChannelKey::new(*sv, obs.carrier));
                let update = state.update(t, obs, multipath_m, gap_tolerance, slip_threshold_m);

                if update.slip_flagged || update.slip_found || update.gap {
                    debug!(
                        "{} ({}:{}) - slip flagged={} found={} gap={}",
                        t, sv, obs.carrier, update.slip_flagged, update.slip_found, update.gap
                    );
                }

                channels.push(QcChannelEpoch {
                    carrier: obs.carrier,
                    phase_valid: obs.phase_range_m.is_some(),
                    code_valid: obs.pseudo_range_m.is_some(),
                    slip_flagged: update.slip_flagged,
                    slip_found: update.slip_found,
                    gap: update.gap,
                    multipath_m: update.multipath_m,
                    snr_dbhz: obs.snr_dbhz,
                });
            }

            satellites.push(QcSatEpoch {
                sv: *sv,
                elevation_deg,
                azimuth_deg,
                channels,
            });
        }

        let sky = satellites
            .iter()
            .filter_map(|sat| Some((sat.elevation_deg?, sat.azimuth_deg?)))
            .collect::<Vec<_>>();

        let dop = DilutionOfPrecision::from_sky(&sky);

        match dop {
            Some(dop) => debug!("{} - pdop={:.2} ({} sv)", t, dop.pdop, sky.len()),
            None => debug!("{} - undefined dop ({} sv)", t, sky.len()),
        }

        Ok(QcEpochRecord::new(t, dop, satellites, excluded))
    }
}
