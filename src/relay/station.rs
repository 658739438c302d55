use crate::{
    prelude::{Epoch, Error, Vector3},
    relay::AxisCorrections,
};

/// One of the three relayed axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X (ECEF) or North
    X,
    /// Y (ECEF) or East
    Y,
    /// Z (ECEF) or Up
    Z,
}

impl Axis {
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Channel tag
    pub fn channel(&self) -> &'static str {
        match self {
            Self::X => "GPX",
            Self::Y => "GPY",
            Self::Z => "GPZ",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// [StationPosition] as resolved by the positioning filter
#[derive(Debug, Clone, PartialEq)]
pub struct StationPosition {
    /// Station identifier
    pub station: String,
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// ECEF coordinates (m)
    pub ecef_m: Vector3<f64>,
    /// North, East, Up offsets (m)
    pub neu_m: Vector3<f64>,
}

impl StationPosition {
    pub fn new(station: &str, epoch: Epoch, ecef_m: Vector3<f64>, neu_m: Vector3<f64>) -> Self {
        Self {
            station: station.to_string(),
            epoch,
            ecef_m,
            neu_m,
        }
    }

    /// Builds [StationPosition] from the filter raw output:
    /// 3 ECEF coordinates followed by 3 topocentric offsets.
    pub fn from_vector(station: &str, epoch: Epoch, vector: &[f64]) -> Result<Self, Error> {
        match vector {
            [x, y, z, n, e, u] => Ok(Self::new(
                station,
                epoch,
                Vector3::new(*x, *y, *z),
                Vector3::new(*n, *e, *u),
            )),
            _ => Err(Error::InvalidPositionVector(
                station.to_string(),
                vector.len(),
            )),
        }
    }

    /// Value relayed on this [Axis], in meters
    pub fn axis_value_m(&self, axis: Axis, corrections: &AxisCorrections) -> f64 {
        match corrections.get(axis) {
            Some(zero_level_m) => self.neu_m[axis.index()] - zero_level_m,
            None => self.ecef_m[axis.index()],
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Axis, StationPosition};
    use crate::{
        prelude::{Epoch, Error},
        relay::AxisCorrections,
    };

    #[test]
    fn raw_vector() {
        let t = Epoch::from_gregorian_utc_at_midnight(2020, 6, 25);

        let pos = StationPosition::from_vector("WTZR", t, &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3]).unwrap();
        assert_eq!(pos.ecef_m[2], 3.0);
        assert_eq!(pos.neu_m[0], 0.1);

        match StationPosition::from_vector("WTZR", t, &[1.0, 2.0, 3.0]) {
            Err(Error::InvalidPositionVector(sta, 3)) => assert_eq!(sta, "WTZR"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn corrected_axes() {
        let t = Epoch::from_gregorian_utc_at_midnight(2020, 6, 25);
        let pos = StationPosition::from_vector(
            "WTZR",
            t,
            &[4075580.0, 931853.0, 4801568.0, 0.5, -0.25, 1.0],
        )
        .unwrap();

        let corrections = AxisCorrections {
            x: None,
            y: Some(-0.5),
            z: Some(0.75),
        };

        assert_eq!(pos.axis_value_m(Axis::X, &corrections), 4075580.0);
        assert_eq!(pos.axis_value_m(Axis::Y, &corrections), 0.25);
        assert_eq!(pos.axis_value_m(Axis::Z, &corrections), 0.25);

        let tags = Axis::ALL.iter().map(|a| a.channel()).collect::<Vec<_>>();
        assert_eq!(tags, vec!["GPX", "GPY", "GPZ"]);
    }
}
