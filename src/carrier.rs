use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    prelude::{Constellation, Error},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS) same frequency as E5A and B2A
    L5,
    /// E1 (Galileo)
    E1,
    /// E5A (Galileo) same frequency as L5
    E5A,
    /// E5B (Galileo)
    E5B,
    /// E6 (Galileo)
    E6,
    /// B1I (BDS)
    B1I,
    /// B2A (BDS) same frequency as L5 and E5A
    B2A,
    /// B3I (BDS)
    B3I,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::E1 => write!(f, "E1"),
            Self::E5A => write!(f, "E5A"),
            Self::E5B => write!(f, "E5B"),
            Self::E6 => write!(f, "E6"),
            Self::B1I => write!(f, "B1I"),
            Self::B2A => write!(f, "B2A"),
            Self::B3I => write!(f, "B3I"),
        }
    }
}

impl std::str::FromStr for Carrier {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            "L5" => Ok(Self::L5),
            "E1" => Ok(Self::E1),
            "E5A" => Ok(Self::E5A),
            "E5B" => Ok(Self::E5B),
            "E6" => Ok(Self::E6),
            "B1I" => Ok(Self::B1I),
            "B2A" => Ok(Self::B2A),
            "B3I" | "B3" => Ok(Self::B3I),
            _ => Err(Error::UnknownCarrier),
        }
    }
}

impl Carrier {
    /// Carrier frequency in Hz
    pub fn frequency(&self) -> f64 {
        match self {
            Self::L1 | Self::E1 => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 | Self::E5A | Self::B2A => 1176.45E6_f64,
            Self::E6 => 1278.750E6_f64,
            Self::B3I => 1268.52E6_f64,
            Self::E5B => 1207.14E6_f64,
            Self::B1I => 1561.098E6_f64,
        }
    }

    /// Carrier wavelength in meters
    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / self.frequency()
    }

    /// Frequency pair used for iono-free processing and ambiguity
    /// resolution of this [Constellation].
    pub fn dual_frequency(constellation: Constellation) -> Option<DualCarrier> {
        match constellation {
            Constellation::GPS => Some(DualCarrier::new(Self::L1, Self::L2)),
            Constellation::Galileo => Some(DualCarrier::new(Self::E1, Self::E5A)),
            Constellation::BeiDou => Some(DualCarrier::new(Self::B1I, Self::B3I)),
            _ => None,
        }
    }
}

/// Two carriers combined together, `lhs` being the highest frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DualCarrier {
    pub lhs: Carrier,
    pub rhs: Carrier,
}

impl std::fmt::Display for DualCarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.lhs, self.rhs)
    }
}

impl DualCarrier {
    pub fn new(lhs: Carrier, rhs: Carrier) -> Self {
        Self { lhs, rhs }
    }

    /// (f1/f2)²
    pub fn gamma(&self) -> f64 {
        (self.lhs.frequency() / self.rhs.frequency()).powi(2)
    }

    /// Iono-free coefficient applied to the first carrier.
    pub fn alpha(&self) -> f64 {
        let gamma = self.gamma();
        -gamma / (1.0 - gamma)
    }

    /// Iono-free coefficient applied to the second carrier.
    pub fn beta(&self) -> f64 {
        1.0 / (1.0 - self.gamma())
    }

    /// Noise amplification of the iono-free combination (α² + β²)
    pub fn noise_factor(&self) -> f64 {
        self.alpha().powi(2) + self.beta().powi(2)
    }

    /// Wide lane wavelength c / (f1 - f2), in meters
    pub fn wide_lane_wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / (self.lhs.frequency() - self.rhs.frequency())
    }

    /// Narrow lane wavelength c / (f1 + f2), in meters
    pub fn narrow_lane_wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / (self.lhs.frequency() + self.rhs.frequency())
    }
}
