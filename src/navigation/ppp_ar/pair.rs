use crate::prelude::SV;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Single difference between one satellite and its reference.
/// Orientation is kept (sv - reference), while [SatPair::canonical]
/// identifies the pair regardless of orientation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatPair {
    pub sv: SV,
    pub reference: SV,
}

impl std::fmt::Display for SatPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.sv, self.reference)
    }
}

impl SatPair {
    pub fn new(sv: SV, reference: SV) -> Self {
        Self { sv, reference }
    }

    /// Orientation independent identity
    pub fn canonical(&self) -> (SV, SV) {
        if self.sv < self.reference {
            (self.sv, self.reference)
        } else {
            (self.reference, self.sv)
        }
    }
}

/// Fixed wide lane ambiguity
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WideLaneFix {
    pub pair: SatPair,
    /// Single differenced float wide lane (cycles)
    pub float: f64,
    /// Integer wide lane
    pub fixed: i64,
    /// |fixed - float| (cycles)
    pub residual: f64,
    /// Float variance (cycles²)
    pub variance: f64,
    /// Bootstrapping success rate
    pub confidence: f64,
}

/// Narrow lane ambiguity candidate, fixed once accepted.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NarrowLaneFix {
    pub pair: SatPair,
    /// Single differenced float narrow lane (cycles)
    pub float: f64,
    /// Integer narrow lane
    pub fixed: i64,
    /// |fixed - float| (cycles)
    pub residual: f64,
    /// Variance of the single differenced iono-free ambiguity (m²)
    pub variance: f64,
    /// Integer wide lane this narrow lane relies on
    pub wide_lane: i64,
    /// Single differenced float iono-free ambiguity (m)
    pub sd_float_m: f64,
    /// State slots of (sv, reference) iono-free ambiguities
    pub indexes: (usize, usize),
    /// Narrow lane wavelength (m)
    pub lambda_nl: f64,
    /// Second carrier wavelength (m)
    pub lambda_2: f64,
    /// Iono-free coefficient of the second carrier
    pub beta: f64,
    /// Single differenced narrow lane UPD (cycles)
    pub upd: f64,
}

impl NarrowLaneFix {
    /// Fixed single differenced iono-free ambiguity (m)
    pub fn fixed_sd_m(&self) -> f64 {
        self.lambda_nl * (self.fixed as f64 - self.upd) - self.beta * self.lambda_2 * self.wide_lane as f64
    }
}
