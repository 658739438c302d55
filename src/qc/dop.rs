use nalgebra::{Matrix4, RowVector4};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Epoch [DilutionOfPrecision], from the local sky geometry
#[derive(Debug, Clone, Default, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,

    /// Position DOP
    pub pdop: f64,

    /// Horizontal DOP
    pub hdop: f64,

    /// Vertical DOP
    pub vdop: f64,

    /// Temporal DOP
    pub tdop: f64,
}

impl DilutionOfPrecision {
    /// Minimal number of satellites
    pub const MIN_SATELLITES: usize = 4;

    /// Normal matrix is considered singular below this determinant
    const MIN_DETERMINANT: f64 = 1.0E-9;

    /// Geometry matrix row, in local (east, north, up) frame
    fn geometry_row(elev_deg: f64, azim_deg: f64) -> RowVector4<f64> {
        let (sin_el, cos_el) = elev_deg.to_radians().sin_cos();
        let (sin_az, cos_az) = azim_deg.to_radians().sin_cos();
        RowVector4::new(-cos_el * sin_az, -cos_el * cos_az, -sin_el, 1.0)
    }

    /// Creates new [DilutionOfPrecision] from (elevation, azimuth) pairs,
    /// in degrees. Returns None when fewer than 4 satellites are proposed
    /// or the geometry is degenerate.
    pub fn from_sky(sky: &[(f64, f64)]) -> Option<Self> {
        if sky.len() < Self::MIN_SATELLITES {
            return None;
        }

        let mut g_t_g = Matrix4::<f64>::zeros();

        for (elev_deg, azim_deg) in sky {
            let row = Self::geometry_row(*elev_deg, *azim_deg);
            g_t_g += row.transpose() * row;
        }

        if g_t_g.determinant().abs() < Self::MIN_DETERMINANT {
            return None;
        }

        let q = g_t_g.try_inverse()?;

        if (0..4).any(|i| !q[(i, i)].is_finite() || q[(i, i)] <= 0.0) {
            return None;
        }

        Some(Self {
            gdop: q.trace().sqrt(),
            pdop: (q[(0, 0)] + q[(1, 1)] + q[(2, 2)]).sqrt(),
            hdop: (q[(0, 0)] + q[(1, 1)]).sqrt(),
            vdop: q[(2, 2)].sqrt(),
            tdop: q[(3, 3)].sqrt(),
        })
    }
}
