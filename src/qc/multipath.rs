//! Code multipath combination
use crate::prelude::{Observation, SatelliteObservation};

/// Dual frequency code minus carrier combination, in meters:
///
/// MP_i = P_i - (1 + 2/(α-1)) L_i + 2/(α-1) L_j,  α = (f_i/f_j)²
///
/// Geometry, clocks, troposphere and first order ionosphere cancel out;
/// what is left is code multipath and noise plus a constant
/// (phase ambiguities), valid over one continuous arc.
pub(crate) fn code_multipath_m(obs: &Observation, partner: &Observation) -> Option<f64> {
    let p_i = obs.pseudo_range_m?;
    let l_i = obs.phase_range_m?;
    let l_j = partner.phase_range_m?;

    let (f_i, f_j) = (obs.carrier.frequency(), partner.carrier.frequency());
    if f_i == f_j {
        return None;
    }

    let alpha = (f_i / f_j).powi(2);
    let k = 2.0 / (alpha - 1.0);

    Some(p_i - (1.0 + k) * l_i + k * l_j)
}

/// Selects the second frequency, used to form the multipath combination
/// of this [Observation]: first phase tracked carrier of this satellite,
/// on another frequency.
pub(crate) fn partner<'a>(
    satellite: &'a SatelliteObservation,
    obs: &Observation,
) -> Option<&'a Observation> {
    let freq = obs.carrier.frequency();
    satellite
        .observations
        .iter()
        .filter(|other| other.phase_range_m.is_some() && other.carrier.frequency() != freq)
        .min_by_key(|other| other.carrier)
}
