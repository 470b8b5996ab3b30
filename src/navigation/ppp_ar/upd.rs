//! Uncalibrated phase delays
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::prelude::{Duration, Epoch, SV};

/// Kind of [UpdProvider] product
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UpdKind {
    WideLane,
    NarrowLane,
}

impl std::fmt::Display for UpdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::WideLane => write!(f, "WL"),
            Self::NarrowLane => write!(f, "NL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdError {
    /// Satellite must be excluded from this fixing step
    #[error("{2}({0}) - {1} upd not available")]
    NotAvailable(SV, UpdKind, Epoch),
}

/// How wide lane UPD are applied to the MW ambiguity.
/// Products differ in convention: most are removed from the
/// MW ambiguity, some (like IRC products) must be added instead.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum UpdSign {
    #[default]
    Subtracted,
    Added,
}

impl UpdSign {
    /// Correction (cycles) to add to the MW ambiguity, for this UPD value
    pub fn correction(&self, upd: f64) -> f64 {
        match self {
            Self::Subtracted => -upd,
            Self::Added => upd,
        }
    }
}

/// Satellite UPD source. Values are expressed in cycles.
pub trait UpdProvider {
    fn satellite_upd(&self, sv: SV, kind: UpdKind, epoch: Epoch) -> Result<f64, UpdError>;

    /// Wide lane convention of this product
    fn wide_lane_sign(&self) -> UpdSign {
        UpdSign::Subtracted
    }
}

/// [UpdProvider] that never corrects anything
#[derive(Debug, Copy, Clone, Default)]
pub struct NoUpd;

impl UpdProvider for NoUpd {
    fn satellite_upd(&self, _: SV, _: UpdKind, _: Epoch) -> Result<f64, UpdError> {
        Ok(0.0)
    }
}

/// In memory [UpdProvider]: one wide lane value per satellite
/// and time tagged narrow lane values.
#[derive(Debug, Clone)]
pub struct UpdTable {
    wide_lane: HashMap<SV, f64>,
    narrow_lane: HashMap<SV, BTreeMap<Epoch, f64>>,
    /// Narrow lane values older than this are not used
    tolerance: Duration,
    wide_lane_sign: UpdSign,
}

impl Default for UpdTable {
    fn default() -> Self {
        Self::new(Duration::from_seconds(900.0))
    }
}

impl UpdTable {
    /// Builds a new empty [UpdTable] with narrow lane validity [Duration]
    pub fn new(tolerance: Duration) -> Self {
        Self {
            tolerance,
            wide_lane: Default::default(),
            narrow_lane: Default::default(),
            wide_lane_sign: Default::default(),
        }
    }

    /// Copies and returns with this wide lane [UpdSign] convention
    pub fn with_wide_lane_sign(&self, sign: UpdSign) -> Self {
        let mut s = self.clone();
        s.wide_lane_sign = sign;
        s
    }

    /// Copies and returns with wide lane UPD (cycles)
    pub fn with_wide_lane(&self, sv: SV, upd: f64) -> Self {
        let mut s = self.clone();
        s.wide_lane.insert(sv, upd);
        s
    }

    /// Copies and returns with narrow lane UPD (cycles) valid from this [Epoch]
    pub fn with_narrow_lane(&self, sv: SV, epoch: Epoch, upd: f64) -> Self {
        let mut s = self.clone();
        s.narrow_lane.entry(sv).or_default().insert(epoch, upd);
        s
    }
}

impl UpdProvider for UpdTable {
    fn satellite_upd(&self, sv: SV, kind: UpdKind, epoch: Epoch) -> Result<f64, UpdError> {
        let value = match kind {
            UpdKind::WideLane => self.wide_lane.get(&sv).copied(),
            UpdKind::NarrowLane => self
                .narrow_lane
                .get(&sv)
                .and_then(|values| values.range(..=epoch).next_back())
                .filter(|(t, _)| epoch - **t <= self.tolerance)
                .map(|(_, upd)| *upd),
        };
        value.ok_or(UpdError::NotAvailable(sv, kind, epoch))
    }

    fn wide_lane_sign(&self) -> UpdSign {
        self.wide_lane_sign
    }
}
