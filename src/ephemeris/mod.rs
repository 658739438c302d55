use crate::prelude::{Epoch, SV};

mod gate;
mod kepler;

pub use gate::EphemerisGate;

/// Broadcast [Ephemeris], already decoded by the navigation parser.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Ephemeris {
    /// [SV]
    pub sv: SV,

    /// Time of Issue of [Ephemeris] that must be expressed in correct timescale
    pub toe: Epoch,

    /// Health flag: unhealthy frames are never used
    pub healthy: bool,

    /// Semi-major axis (in meters)
    pub semi_major_axis_m: f64,

    /// Eccentricity
    pub eccentricity: f64,

    /// m0 (in radians)
    pub m0_rad: f64,

    /// (in radians)
    pub i0_rad: f64,

    /// (in radians/s)
    pub idot_rad_s: f64,

    /// (in radians)
    pub dn_rad: f64,

    /// (in radians)
    pub omega0_rad: f64,

    /// (in radians)
    pub omega_rad: f64,

    /// (in radians/s)
    pub omega_dot_rad_s: f64,

    /// Sine Cosine (in radians)
    pub cus_cuc_rad: (f64, f64),

    /// Sine / Cosine (in radians)
    pub cis_cic_rad: (f64, f64),

    /// Sine / Cosine (in meters)
    pub crs_crc_m: (f64, f64),
}

impl Ephemeris {
    /// Builds a healthy [Ephemeris] describing a circular orbit
    /// (no perturbation terms).
    pub fn circular(
        sv: SV,
        toe: Epoch,
        semi_major_axis_m: f64,
        i0_rad: f64,
        omega0_rad: f64,
        m0_rad: f64,
    ) -> Self {
        Self {
            sv,
            toe,
            i0_rad,
            m0_rad,
            omega0_rad,
            healthy: true,
            semi_major_axis_m,
            ..Default::default()
        }
    }

    /// Copies and returns [Ephemeris] marked as unhealthy
    pub fn unhealthy(&self) -> Self {
        let mut s = *self;
        s.healthy = false;
        s
    }
}
