use crate::prelude::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Receiver [Profile], which defines how the position states evolve.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Profile {
    /// Receiver held in static.
    /// Typically used in Geodetic surveys (GNSS stations Referencing)
    /// and laboratories applications. Position states are constant.
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "static", alias = "Static"))]
    Static,
    /// Roaming receiver: the position is re-estimated at every epoch
    /// (white noise process).
    #[cfg_attr(feature = "serde", serde(alias = "kinematic", alias = "Kinematic"))]
    Kinematic,
}

impl Profile {
    /// True if this [Profile] is [Profile::Static]
    pub fn is_static(&self) -> bool {
        *self == Self::Static
    }
}

impl std::str::FromStr for Profile {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        let trimmed = s.trim();
        match trimmed {
            "static" => Ok(Self::Static),
            "kinematic" | "dynamic" => Ok(Self::Kinematic),
            _ => Err(Error::InvalidUserProfile),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "Static"),
            Self::Kinematic => write!(f, "Kinematic"),
        }
    }
}
