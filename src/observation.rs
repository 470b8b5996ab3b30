//! Per epoch, per satellite observation records
use std::collections::BTreeMap;

use crate::{
    carrier::{Carrier, DualCarrier},
    prelude::{Epoch, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Observable that an equation may be built on.
/// All values are expressed in meters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Observable {
    /// Pseudo range
    Code(Carrier),
    /// Phase range
    Phase(Carrier),
    /// Iono-free pseudo range combination
    IonoFreeCode(DualCarrier),
    /// Iono-free phase range combination
    IonoFreePhase(DualCarrier),
}

impl std::fmt::Display for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Code(c) => write!(f, "C{}", c),
            Self::Phase(c) => write!(f, "L{}", c),
            Self::IonoFreeCode(dual) => write!(f, "PC({})", dual),
            Self::IonoFreePhase(dual) => write!(f, "LC({})", dual),
        }
    }
}

impl Observable {
    /// True if this is a phase observable
    pub fn is_phase(&self) -> bool {
        matches!(self, Self::Phase(_) | Self::IonoFreePhase(_))
    }

    /// True if this is an iono-free combination
    pub fn is_iono_free(&self) -> bool {
        matches!(self, Self::IonoFreeCode(_) | Self::IonoFreePhase(_))
    }
}

/// Observation record of a single satellite at a single epoch.
/// Prefit residuals have already been corrected for every known
/// geometric, clock and atmospheric term.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteObservation {
    /// Elevation angle in degrees
    pub elevation_deg: f64,
    /// Azimuth angle in degrees
    pub azimuth_deg: f64,
    /// Cycle slip (or loss of lock) was detected on this satellite
    pub cycle_slip: bool,
    /// Partial derivatives of the range with respect to
    /// the receiver ECEF coordinates
    pub los: (f64, f64, f64),
    /// Wet troposphere mapping function
    pub wet_mapping: f64,
    /// Optional weight factor applied to every equation of this satellite
    pub weight: Option<f64>,
    /// Prefit residuals, in meters
    pub prefit: BTreeMap<Observable, f64>,
    /// Raw code and phase ranges, in meters
    pub raw: BTreeMap<Observable, f64>,
}

impl SatelliteObservation {
    /// Builds a new [SatelliteObservation] seen under said angles.
    pub fn new(elevation_deg: f64, azimuth_deg: f64) -> Self {
        Self {
            elevation_deg,
            azimuth_deg,
            ..Default::default()
        }
    }

    /// Copies and returns with line of sight partial derivatives
    pub fn with_los(&self, los: (f64, f64, f64)) -> Self {
        let mut s = self.clone();
        s.los = los;
        s
    }

    /// Copies and returns with wet mapping factor
    pub fn with_wet_mapping(&self, wet_mapping: f64) -> Self {
        let mut s = self.clone();
        s.wet_mapping = wet_mapping;
        s
    }

    /// Copies and returns with cycle slip flag
    pub fn with_cycle_slip(&self, cycle_slip: bool) -> Self {
        let mut s = self.clone();
        s.cycle_slip = cycle_slip;
        s
    }

    /// Copies and returns with one more prefit residual
    pub fn with_prefit(&self, observable: Observable, value: f64) -> Self {
        let mut s = self.clone();
        s.prefit.insert(observable, value);
        s
    }

    /// Copies and returns with one more raw observation
    pub fn with_raw(&self, observable: Observable, value: f64) -> Self {
        let mut s = self.clone();
        s.raw.insert(observable, value);
        s
    }

    /// Returns raw (L1, L2, P1, P2) observations on this frequency pair.
    pub(crate) fn dual_frequency_raw(&self, dual: &DualCarrier) -> Option<(f64, f64, f64, f64)> {
        let l1 = self.raw.get(&Observable::Phase(dual.lhs))?;
        let l2 = self.raw.get(&Observable::Phase(dual.rhs))?;
        let p1 = self.raw.get(&Observable::Code(dual.lhs))?;
        let p2 = self.raw.get(&Observable::Code(dual.rhs))?;
        Some((*l1, *l2, *p1, *p2))
    }
}

/// All satellite observations sampled at one epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpochObservations {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Observations per satellite
    pub satellites: BTreeMap<SV, SatelliteObservation>,
}

impl EpochObservations {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            satellites: Default::default(),
        }
    }

    /// Copies and returns with one more satellite
    pub fn with_satellite(&self, sv: SV, observation: SatelliteObservation) -> Self {
        let mut s = self.clone();
        s.satellites.insert(sv, observation);
        s
    }

    /// Number of satellites in sight
    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}
