use crate::prelude::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ionosphere handling, which defines the observables the
/// equation system is built on. Triple frequency modes are not supported.
#[allow(non_camel_case_types)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IonosphereMode {
    /// Single frequency uncombined code and phase.
    /// Slant ionosphere delays are estimated per satellite.
    UC1,
    /// Dual frequency uncombined code and phase.
    /// Slant ionosphere delays are estimated per satellite,
    /// one ambiguity per frequency.
    UC12,
    /// Dual frequency iono-free combinations. This is the only
    /// mode compatible with ambiguity resolution.
    #[default]
    IF12,
}

impl IonosphereMode {
    /// True if this mode estimates slant ionosphere delays
    pub fn is_uncombined(&self) -> bool {
        matches!(self, Self::UC1 | Self::UC12)
    }
}

impl std::fmt::Display for IonosphereMode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::UC1 => write!(fmt, "UC1"),
            Self::UC12 => write!(fmt, "UC12"),
            Self::IF12 => write!(fmt, "IF12"),
        }
    }
}

impl std::str::FromStr for IonosphereMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uc1" => Ok(Self::UC1),
            "uc12" => Ok(Self::UC12),
            "if12" => Ok(Self::IF12),
            _ => Err(Error::UnknownIonosphereMode),
        }
    }
}

/// Narrow lane ambiguity fixing strategy
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AmbiguityFixMode {
    /// Single differenced narrow lane ambiguities are rounded to
    /// the nearest integer, after narrow lane UPD correction.
    Round,
    /// Single differenced narrow lane ambiguities are searched
    /// with partial integer least squares, and validated with the ratio test.
    #[default]
    Ils,
}

impl std::fmt::Display for AmbiguityFixMode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Round => write!(fmt, "ROUND"),
            Self::Ils => write!(fmt, "ILS"),
        }
    }
}

impl std::str::FromStr for AmbiguityFixMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round" | "sdifround" => Ok(Self::Round),
            "ils" | "lambda" | "sdifils" => Ok(Self::Ils),
            _ => Err(Error::UnknownAmbiguityFixMode),
        }
    }
}
