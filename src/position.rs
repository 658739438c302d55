/// 3D Position coordinates
use crate::prelude::Vector3;
use map_3d::{ecef2geodetic, Ellipsoid};
use nalgebra::Matrix3;

/// Station reference [Position], used to project satellites
/// into the local sky.
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[f64; 3]"))]
pub struct Position {
    /// ECEF coordinates in meters
    pub(crate) ecef: Vector3<f64>,
    /// Geodetic coordinates in radians
    pub(crate) geodetic: Vector3<f64>,
}

impl From<[f64; 3]> for Position {
    fn from(ecef_m: [f64; 3]) -> Self {
        Self::from_ecef(Vector3::new(ecef_m[0], ecef_m[1], ecef_m[2]))
    }
}

impl Position {
    /// Builds new [Position] from ECEF coordinates expressed in meter.
    pub fn from_ecef(ecef: Vector3<f64>) -> Self {
        let (x, y, z) = (ecef[0], ecef[1], ecef[2]);
        let (lat, lon, h) = ecef2geodetic(x, y, z, Ellipsoid::WGS84);
        Self {
            ecef,
            geodetic: Vector3::new(lat, lon, h),
        }
    }

    /// Returns ECEF coordinates.
    pub fn ecef(&self) -> Vector3<f64> {
        self.ecef
    }

    /// Returns Geodetic coordinates
    /// - latitude [rad]
    /// - longitude [rad]
    /// - altitude above sea levl [m]
    pub fn geodetic(&self) -> Vector3<f64> {
        self.geodetic
    }

    /// ECEF to local (east, north, up) rotation matrix
    pub(crate) fn ecef_to_enu(&self) -> Matrix3<f64> {
        let (sin_lat, cos_lat) = self.geodetic[0].sin_cos();
        let (sin_lon, cos_lon) = self.geodetic[1].sin_cos();
        Matrix3::new(
            -sin_lon,
            cos_lon,
            0.0,
            -sin_lat * cos_lon,
            -sin_lat * sin_lon,
            cos_lat,
            cos_lat * cos_lon,
            cos_lat * sin_lon,
            sin_lat,
        )
    }

    /// Returns (elevation, azimuth) in degrees of a target expressed
    /// in ECEF meters. Azimuth is counted clockwise from north, in [0, 360[.
    pub fn elevation_azimuth_deg(&self, target_ecef_m: Vector3<f64>) -> (f64, f64) {
        let enu = self.ecef_to_enu() * (target_ecef_m - self.ecef);
        let range = enu.norm();

        let elev_deg = (enu[2] / range).asin().to_degrees();
        let mut azim_deg = enu[0].atan2(enu[1]).to_degrees();

        if azim_deg < 0.0 {
            azim_deg += 360.0;
        }

        (elev_deg, azim_deg)
    }
}

#[cfg(test)]
mod test {
    use super::Position;
    use crate::prelude::Vector3;

    const REFERENCE_COORDS_ECEF_M: (f64, f64, f64) = (3628427.9118, 562059.0936, 5197872.2150);

    fn reference() -> Position {
        let (x, y, z) = REFERENCE_COORDS_ECEF_M;
        Position::from_ecef(Vector3::new(x, y, z))
    }

    #[test]
    fn zenith() {
        let position = reference();
        let rot = position.ecef_to_enu();
        let up = rot.transpose() * Vector3::new(0.0, 0.0, 1.0);
        let sv = position.ecef() + up * 20_000_000.0;

        let (elev, _) = position.elevation_azimuth_deg(sv);
        assert!((elev - 90.0).abs() < 1.0E-6, "elevation: {}", elev);
    }

    #[test]
    fn cardinal_points() {
        let position = reference();
        let rot = position.ecef_to_enu().transpose();

        for (enu, azim) in [
            (Vector3::new(0.0, 1.0, 1.0), 0.0),
            (Vector3::new(1.0, 0.0, 1.0), 90.0),
            (Vector3::new(0.0, -1.0, 1.0), 180.0),
            (Vector3::new(-1.0, 0.0, 1.0), 270.0),
        ] {
            let sv = position.ecef() + rot * enu * 1.0E7;
            let (elev_deg, azim_deg) = position.elevation_azimuth_deg(sv);
            assert!((elev_deg - 45.0).abs() < 1.0E-6, "elevation: {}", elev_deg);
            let err_deg = (azim_deg - azim + 180.0).rem_euclid(360.0) - 180.0;
            assert!(err_deg.abs() < 1.0E-6, "azimuth: {}", azim_deg);
        }
    }

    #[test]
    fn geodetic_latitude() {
        let lat_deg = reference().geodetic()[0].to_degrees();
        assert!(lat_deg > 54.0 && lat_deg < 56.0, "latitude: {}", lat_deg);
    }
}
