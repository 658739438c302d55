use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, warn};

use crate::prelude::{Constellation, Duration, Ephemeris, Epoch, SV};

/// Default validity window of a broadcast frame, per [Constellation].
fn default_max_dtoe(constellation: Constellation) -> Duration {
    match constellation {
        Constellation::BeiDou => Duration::from_seconds(3600.0),
        Constellation::Glonass => Duration::from_seconds(1800.0),
        c if c.is_sbas() => Duration::from_seconds(1800.0),
        _ => Duration::from_seconds(4.0 * 3600.0),
    }
}

/// [EphemerisGate] indexes the loaded [Ephemeris] frames and decides
/// which satellites may contribute to one epoch.
#[derive(Debug, Clone, Default)]
pub struct EphemerisGate {
    /// Healthy frames, per [SV], sorted by ToE
    inner: HashMap<SV, Vec<Ephemeris>>,
    /// Custom validity windows
    max_dtoe: HashMap<Constellation, Duration>,
    /// Number of refused frames
    rejected: usize,
}

impl EphemerisGate {
    /// Builds new [EphemerisGate] from a set of [Ephemeris] frames.
    pub fn new<I: IntoIterator<Item = Ephemeris>>(ephemerides: I) -> Self {
        let mut s = Self::default();
        for eph in ephemerides {
            s.insert(eph);
        }
        s
    }

    /// Copies and returns [EphemerisGate] with custom validity window
    /// for this [Constellation].
    pub fn with_max_dtoe(&self, constellation: Constellation, max_dtoe: Duration) -> Self {
        let mut s = self.clone();
        s.max_dtoe.insert(constellation, max_dtoe);
        s
    }

    fn max_dtoe(&self, constellation: Constellation) -> Duration {
        self.max_dtoe
            .get(&constellation)
            .copied()
            .unwrap_or_else(|| default_max_dtoe(constellation))
    }

    /// Indexes a new [Ephemeris] frame. Unhealthy frames are refused.
    /// Returns true when the frame was retained.
    pub fn insert(&mut self, eph: Ephemeris) -> bool {
        if !eph.healthy {
            warn!("{}({}) - refusing unhealthy ephemeris", eph.toe, eph.sv);
            self.rejected += 1;
            return false;
        }

        let frames = self.inner.entry(eph.sv).or_default();

        if frames.iter().any(|frame| frame.toe == eph.toe) {
            debug!("{}({}) - duplicate ephemeris", eph.toe, eph.sv);
            return false;
        }

        let pos = frames.partition_point(|frame| frame.toe < eph.toe);
        frames.insert(pos, eph);
        true
    }

    /// Returns true if a valid [Ephemeris] exists for this [SV] at this [Epoch].
    pub fn is_available(&self, sv: SV, epoch: Epoch) -> bool {
        self.select(sv, epoch).is_some()
    }

    /// Selects the valid [Ephemeris] with closest ToE.
    pub fn select(&self, sv: SV, epoch: Epoch) -> Option<&Ephemeris> {
        let max_dtoe = self.max_dtoe(sv.constellation);
        self.inner
            .get(&sv)?
            .iter()
            .filter(|eph| eph.is_valid(epoch, max_dtoe))
            .min_by_key(|eph| (epoch - eph.toe).abs())
    }

    /// Lists the satellites that have no valid [Ephemeris] at this [Epoch].
    pub fn missing<'a, I: IntoIterator<Item = &'a SV>>(&self, svs: I, epoch: Epoch) -> Vec<SV> {
        svs.into_iter()
            .filter(|sv| !self.is_available(**sv, epoch))
            .copied()
            .sorted()
            .collect()
    }

    /// Satellites this gate knows about.
    pub fn satellites(&self) -> Vec<SV> {
        self.inner.keys().copied().sorted().collect()
    }

    /// Number of unhealthy frames that were refused.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Total number of indexed frames.
    pub fn len(&self) -> usize {
        self.inner.values().map(|frames| frames.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::EphemerisGate;
    use crate::prelude::{Constellation, Duration, Ephemeris, Epoch, SV};
    use std::str::FromStr;

    fn frame(sv: SV, toe: &str) -> Ephemeris {
        let toe = Epoch::from_str(toe).unwrap();
        Ephemeris::circular(sv, toe, 26_559_700.0, 0.96, 0.0, 0.0)
    }

    #[test]
    fn availability() {
        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let c05 = SV::new(Constellation::BeiDou, 5);

        let gate = EphemerisGate::new([
            frame(g01, "2020-06-25T00:00:00 GPST"),
            frame(g01, "2020-06-25T02:00:00 GPST"),
            frame(c05, "2020-06-25T00:00:00 GPST"),
            frame(g02, "2020-06-25T00:00:00 GPST").unhealthy(),
        ]);

        assert_eq!(gate.len(), 3);
        assert_eq!(gate.rejected(), 1);

        let t = Epoch::from_str("2020-06-25T01:30:00 GPST").unwrap();

        assert!(gate.is_available(g01, t));
        assert!(!gate.is_available(g02, t));
        assert!(!gate.is_available(c05, t), "beidou window is 1 hour");

        let selected = gate.select(g01, t).unwrap();
        assert_eq!(
            selected.toe,
            Epoch::from_str("2020-06-25T02:00:00 GPST").unwrap()
        );

        assert_eq!(gate.missing([g01, g02, c05].iter(), t), vec![g02, c05]);
    }

    #[test]
    fn custom_window() {
        let c05 = SV::new(Constellation::BeiDou, 5);
        let gate = EphemerisGate::new([frame(c05, "2020-06-25T00:00:00 GPST")])
            .with_max_dtoe(Constellation::BeiDou, Duration::from_seconds(7200.0));

        let t = Epoch::from_str("2020-06-25T01:30:00 GPST").unwrap();
        assert!(gate.is_available(c05, t));
    }

    #[test]
    fn duplicates() {
        let g01 = SV::new(Constellation::GPS, 1);
        let mut gate = EphemerisGate::default();
        assert!(gate.insert(frame(g01, "2020-06-25T00:00:00 GPST")));
        assert!(!gate.insert(frame(g01, "2020-06-25T00:00:00 GPST")));
        assert_eq!(gate.len(), 1);
        assert_eq!(gate.satellites(), vec![g01]);
    }
}
