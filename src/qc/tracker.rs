use std::collections::HashMap;

use log::debug;

use crate::{
    averager::Averager,
    prelude::{Carrier, Duration, Epoch, Observation, SV},
};

/// Identifies one tracked signal: one [Carrier] of one [SV].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelKey {
    pub sv: SV,
    pub carrier: Carrier,
}

impl ChannelKey {
    pub fn new(sv: SV, carrier: Carrier) -> Self {
        Self { sv, carrier }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}:{}", self.sv, self.carrier)
    }
}

/// Outcome of one [SignalTrackState] update
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TrackUpdate {
    pub slip_flagged: bool,
    pub slip_found: bool,
    pub gap: bool,
    pub multipath_m: Option<f64>,
}

/// Tracking state of one channel, from one epoch to the next.
#[derive(Debug, Clone, Default)]
pub struct SignalTrackState {
    /// Latest epoch with a valid (code or phase) observation
    last_valid: Option<Epoch>,
    /// Latest valid phase observation
    last_phase: Option<(Epoch, f64)>,
    /// Multipath combination over the ongoing continuous arc
    arc: Averager,
    /// Slip detected at latest update
    slip: bool,
    /// Gap detected at latest update
    gap: bool,
}

impl SignalTrackState {
    /// Latest [Epoch] with a valid observation on this channel
    pub fn last_valid(&self) -> Option<Epoch> {
        self.last_valid
    }

    /// Latest valid phase observation (meters) and its [Epoch]
    pub fn last_phase(&self) -> Option<(Epoch, f64)> {
        self.last_phase
    }

    /// True if latest update declared a slip (flagged or found)
    pub fn slip(&self) -> bool {
        self.slip
    }

    /// True if latest update declared a gap
    pub fn gap(&self) -> bool {
        self.gap
    }

    /// Number of multipath samples in the ongoing arc
    pub fn arc_len(&self) -> u64 {
        self.arc.count
    }

    /// Updates this channel with a new [Observation].
    /// - gap_tolerance: silence beyond which a gap is declared
    /// - multipath_m: raw multipath combination for this epoch, if any
    /// - slip_threshold_m: maximal multipath residual
    pub(crate) fn update(
        &mut self,
        epoch: Epoch,
        obs: &Observation,
        multipath_m: Option<f64>,
        gap_tolerance: Duration,
        slip_threshold_m: f64,
    ) -> TrackUpdate {
        let slip_flagged = obs.slip;
        let valid = obs.is_valid();

        // declared once, by the valid observation that ends the silence
        let gap = match self.last_valid {
            Some(last) if valid => epoch - last > gap_tolerance,
            _ => false,
        };

        if slip_flagged || gap {
            self.arc.reset();
        }

        let phase_continuity = match self.last_phase {
            Some((t, _)) => epoch - t <= gap_tolerance,
            None => false,
        };

        let mut slip_found = false;

        if let Some(mp) = multipath_m {
            if !slip_flagged && phase_continuity {
                if let Some(mean) = self.arc.mean() {
                    let residual = mp - mean;
                    if residual.abs() > slip_threshold_m {
                        debug!("{} - multipath jump {:.3}m: cycle slip", epoch, residual);
                        slip_found = true;
                        self.arc.reset();
                    }
                }
            }
            self.arc.add(mp);
        }

        if valid {
            debug_assert!(self.last_valid.map(|t| t <= epoch).unwrap_or(true));
            self.last_valid = Some(epoch);
        }

        if let Some(phase) = obs.phase_range_m {
            self.last_phase = Some((epoch, phase));
        }

        self.slip = slip_flagged || slip_found;
        self.gap = gap;

        TrackUpdate {
            gap,
            slip_found,
            slip_flagged,
            multipath_m: if multipath_m.is_some() {
                self.arc.std_dev()
            } else {
                None
            },
        }
    }
}

/// Fixed shape table of [SignalTrackState]s: contiguous storage
/// indexed by [ChannelKey].
#[derive(Debug, Clone, Default)]
pub(crate) struct TrackTable {
    index: HashMap<ChannelKey, usize>,
    states: Vec<SignalTrackState>,
}

impl TrackTable {
    /// Returns [SignalTrackState] of this channel, creating it on first sighting.
    pub fn state_mut(&mut self, key: ChannelKey) -> &mut SignalTrackState {
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                debug!("{} - new channel", key);
                let idx = self.states.len();
                self.states.push(SignalTrackState::default());
                self.index.insert(key, idx);
                idx
            },
        };
        &mut self.states[idx]
    }

    pub fn state(&self, key: &ChannelKey) -> Option<&SignalTrackState> {
        let idx = self.index.get(key)?;
        self.states.get(*idx)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }
}
