use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    prelude::Constellation,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1 and B1aB1c
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS) same frequency as E5A and B2A
    L5,
    /// L6 (QZSS) same frequency as E6
    L6,
    /// G1 (Glonass) FDMA, nominal center frequency
    G1,
    /// G2 (Glonass) FDMA, nominal center frequency
    G2,
    /// G3 (Glonass) CDMA
    G3,
    /// E1 (Galileo)
    E1,
    /// E5 (Galileo) same frequency as B2
    E5,
    /// E5A (Galileo) same frequency as L5
    E5A,
    /// E5B (Galileo) same frequency as B2iB2b
    E5B,
    /// E6 (Galileo) same frequency as L6
    E6,
    /// B1aB1c (BDS) same frequency as L1
    B1aB1c,
    /// B1I (BDS)
    B1I,
    /// B2I/B2B (BDS) same frequency as E5b
    B2iB2b,
    /// B2 (BDS) same frequency as E5
    B2,
    /// B2A (BDS) same frequency as L5 and E5A
    B2A,
    /// B3 (BDS)
    B3,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::L6 => write!(f, "L6"),
            Self::G1 => write!(f, "G1"),
            Self::G2 => write!(f, "G2"),
            Self::G3 => write!(f, "G3"),
            Self::E1 => write!(f, "E1"),
            Self::E5 => write!(f, "E5"),
            Self::E5A => write!(f, "E5A"),
            Self::E5B => write!(f, "E5B"),
            Self::E6 => write!(f, "E6"),
            Self::B1I => write!(f, "B1I"),
            Self::B1aB1c => write!(f, "B1A/B1C"),
            Self::B2iB2b => write!(f, "B2I/B2B"),
            Self::B2 => write!(f, "B2"),
            Self::B3 => write!(f, "B3"),
            Self::B2A => write!(f, "B2A"),
        }
    }
}

impl Carrier {
    /// Carrier frequency in Hz. Glonass FDMA carriers return the
    /// nominal (channel 0) frequency: the G1/G2 ratio is 9/7 for
    /// every channel, which is all the multipath combination needs.
    pub fn frequency(&self) -> f64 {
        match self {
            Self::L1 | Self::E1 | Self::B1aB1c => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 | Self::E5A | Self::B2A => 1176.45E6_f64,
            Self::E5 | Self::B2 => 1191.795E6_f64,
            Self::L6 | Self::E6 => 1278.750E6_f64,
            Self::G1 => 1602.0E6_f64,
            Self::G2 => 1246.0E6_f64,
            Self::G3 => 1202.025E6_f64,
            Self::B3 => 1268.52E6_f64,
            Self::E5B | Self::B2iB2b => 1207.14E6_f64,
            Self::B1I => 1561.098E6_f64,
        }
    }

    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / self.frequency()
    }

    /// Identifies the [Carrier] from a RINEX observation code
    /// (like "1C", "2W" or "C5Q"), for given [Constellation].
    pub fn from_rinex_code(constellation: Constellation, code: &str) -> Option<Self> {
        let code = code.trim();
        let band = match code.len() {
            2 => code.chars().next()?,
            3 => code.chars().nth(1)?,
            _ => return None,
        };

        match constellation {
            Constellation::GPS | Constellation::QZSS => match band {
                '1' => Some(Self::L1),
                '2' => Some(Self::L2),
                '5' => Some(Self::L5),
                '6' if constellation == Constellation::QZSS => Some(Self::L6),
                _ => None,
            },
            Constellation::Glonass => match band {
                '1' => Some(Self::G1),
                '2' => Some(Self::G2),
                '3' => Some(Self::G3),
                _ => None,
            },
            Constellation::Galileo => match band {
                '1' => Some(Self::E1),
                '5' => Some(Self::E5A),
                '6' => Some(Self::E6),
                '7' => Some(Self::E5B),
                '8' => Some(Self::E5),
                _ => None,
            },
            Constellation::BeiDou => match band {
                '1' => Some(Self::B1aB1c),
                '2' => Some(Self::B1I),
                '5' => Some(Self::B2A),
                '6' => Some(Self::B3),
                '7' => Some(Self::B2iB2b),
                '8' => Some(Self::B2),
                _ => None,
            },
            Constellation::IRNSS => match band {
                '5' => Some(Self::L5),
                _ => None,
            },
            c if c.is_sbas() => match band {
                '1' => Some(Self::L1),
                '5' => Some(Self::L5),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Carrier;
    use crate::prelude::Constellation;
    use rstest::*;

    #[rstest]
    #[case(Constellation::GPS, "1C", Some(Carrier::L1))]
    #[case(Constellation::GPS, "2W", Some(Carrier::L2))]
    #[case(Constellation::GPS, "C5Q", Some(Carrier::L5))]
    #[case(Constellation::GPS, "6C", None)]
    #[case(Constellation::QZSS, "6C", Some(Carrier::L6))]
    #[case(Constellation::Galileo, "7Q", Some(Carrier::E5B))]
    #[case(Constellation::Galileo, "L5Q", Some(Carrier::E5A))]
    #[case(Constellation::BeiDou, "2I", Some(Carrier::B1I))]
    #[case(Constellation::Glonass, "1C", Some(Carrier::G1))]
    #[case(Constellation::GPS, "1", None)]
    fn rinex_codes(
        #[case] constellation: Constellation,
        #[case] code: &str,
        #[case] expected: Option<Carrier>,
    ) {
        assert_eq!(Carrier::from_rinex_code(constellation, code), expected);
    }

    #[test]
    fn glonass_fdma_ratio() {
        let ratio = Carrier::G1.frequency() / Carrier::G2.frequency();
        assert!((ratio - 9.0 / 7.0).abs() < 1.0E-12);
    }

    #[test]
    fn l1_wavelength() {
        assert!((Carrier::L1.wavelength() - 0.190293672798).abs() < 1.0E-9);
    }
}
