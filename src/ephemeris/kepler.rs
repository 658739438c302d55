use log::{debug, error};
use nalgebra::{Rotation3, Vector3};

use crate::{
    constants::{EARTH_ANGULAR_VEL_RAD, EARTH_GRAVITATION_MU_M3_S2},
    prelude::{Duration, Ephemeris, Epoch},
};

/// Kepler solver iterations limit
const MAX_KEPLER_ITER: usize = 30;

impl Ephemeris {
    /// Returns True if this [Ephemeris] frame is still valid
    pub fn is_valid(&self, now: Epoch, max_dtoe: Duration) -> bool {
        (now - self.toe).abs() <= max_dtoe
    }

    /// Returns ToE in seconds of week, in the [SV] timescale.
    pub fn weekly_toe_seconds(&self) -> f64 {
        let toe = match self.sv.constellation.timescale() {
            Some(ts) => self.toe.to_time_scale(ts),
            None => self.toe,
        };
        (toe.to_time_of_week().1 as f64) / 1.0E9
    }

    /// Resolves Kepler equations from [Ephemeris], returning the
    /// satellite ECEF coordinates in meters.
    pub fn position_ecef_m(&self, epoch: Epoch) -> Option<Vector3<f64>> {
        let e = self.eccentricity;
        let e_2 = e.powi(2);
        let a = self.semi_major_axis_m;
        let a_3 = a.powi(3);

        let (cus, cuc) = self.cus_cuc_rad;
        let (cis, cic) = self.cis_cic_rad;
        let (crs, crc) = self.crs_crc_m;
        let (i0, idot) = (self.i0_rad, self.idot_rad_s);
        let (omega0, omega, omega_dot) = (self.omega0_rad, self.omega_rad, self.omega_dot_rad_s);

        let t_k = (epoch - self.toe).to_seconds();

        let n0 = (EARTH_GRAVITATION_MU_M3_S2 / a_3).sqrt();
        let n = n0 + self.dn_rad;
        let m = self.m0_rad + n * t_k;

        let mut e_k = m;
        let mut converged = false;

        for _ in 0..MAX_KEPLER_ITER {
            let e_next = m + e * e_k.sin();
            let delta = (e_next - e_k).abs();
            e_k = e_next;
            if delta < 1E-12 {
                converged = true;
                break;
            }
        }

        if !converged {
            error!("{}({}) - kepler solver in failure", epoch, self.sv);
            return None;
        }

        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let v_k = ((1.0 - e_2).sqrt() * sin_e_k).atan2(cos_e_k - e);

        let phi = v_k + omega;
        let (sin_2phi, cos_2phi) = (2.0 * phi).sin_cos();

        let u_k = phi + cuc * cos_2phi + cus * sin_2phi;
        let r_k = a * (1.0 - e * cos_e_k) + crc * cos_2phi + crs * sin_2phi;
        let i_k = i0 + idot * t_k + cic * cos_2phi + cis * sin_2phi;
        let omega_k = omega0 + (omega_dot - EARTH_ANGULAR_VEL_RAD) * t_k
            - EARTH_ANGULAR_VEL_RAD * self.weekly_toe_seconds();

        let orbital_plane = Vector3::new(r_k * u_k.cos(), r_k * u_k.sin(), 0.0);

        // orbital plane to ECEF rotation
        let rot_x3 = Rotation3::from_axis_angle(&Vector3::x_axis(), i_k);
        let rot_z3 = Rotation3::from_axis_angle(&Vector3::z_axis(), omega_k);
        let xyz_ecef = rot_z3 * rot_x3 * orbital_plane;

        debug!(
            "{}({}) - kepler solving x_m={:.3} y_m={:.3} z_m={:.3} t_k={}",
            epoch, self.sv, xyz_ecef[0], xyz_ecef[1], xyz_ecef[2], t_k
        );

        Some(xyz_ecef)
    }
}
