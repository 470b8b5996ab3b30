//! Float and fixed solutions
use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::{
    navigation::{
        ppp_ar::{NarrowLaneFix, WideLaneFix},
        Parameter, VariableKey,
    },
    observation::{EpochObservations, Observable},
    prelude::{Epoch, SV},
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Float PPP solution, resolved by the [crate::prelude::PPPSolver].
#[derive(Debug, Clone, PartialEq)]
pub struct FloatSolution {
    pub epoch: Epoch,
    /// Apriori ECEF position (m)
    pub apriori_m: (f64, f64, f64),
    /// Estimated ECEF position (m)
    pub position_m: (f64, f64, f64),
    /// Unknown → state slot
    pub variables: BTreeMap<VariableKey, usize>,
    /// State vector
    pub x: DVector<f64>,
    /// Covariance matrix
    pub p: DMatrix<f64>,
    /// (prefit, postfit) residuals (m)
    pub residuals: BTreeMap<(SV, Observable), (f64, f64)>,
}

impl FloatSolution {
    /// State slot of this [Parameter] (for this [SV], if satellite indexed).
    pub fn find(&self, parameter: Parameter, sv: Option<SV>) -> Option<usize> {
        self.variables
            .iter()
            .find(|(key, _)| key.parameter == parameter && key.sv == sv)
            .map(|(_, index)| *index)
    }

    /// Estimated value of this [Parameter]
    pub fn value(&self, parameter: Parameter, sv: Option<SV>) -> Option<f64> {
        self.find(parameter, sv).map(|i| self.x[i])
    }

    /// Postfit residual (m) of this observable
    pub fn postfit(&self, sv: SV, observable: Observable) -> Option<f64> {
        self.residuals
            .get(&(sv, observable))
            .map(|(_, postfit)| *postfit)
    }

    /// Prefit residual (m) of this observable
    pub fn prefit(&self, sv: SV, observable: Observable) -> Option<f64> {
        self.residuals
            .get(&(sv, observable))
            .map(|(prefit, _)| *prefit)
    }

    /// State slots of the position unknowns
    pub fn position_indexes(&self) -> Option<[usize; 3]> {
        Some([
            self.find(Parameter::Dx, None)?,
            self.find(Parameter::Dy, None)?,
            self.find(Parameter::Dz, None)?,
        ])
    }

    /// Norm of the position variances (m²)
    pub fn position_variance(&self) -> Option<f64> {
        let [x, y, z] = self.position_indexes()?;
        Some((self.p[(x, x)].powi(2) + self.p[(y, y)].powi(2) + self.p[(z, z)].powi(2)).sqrt())
    }
}

/// Integer ambiguity fixed solution
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FixedSolution {
    pub epoch: Epoch,
    /// Float ECEF position (m)
    pub float_position_m: (f64, f64, f64),
    /// Fixed ECEF position (m)
    pub fixed_position_m: (f64, f64, f64),
    /// Fixed position covariance (m²)
    pub covariance: [[f64; 3]; 3],
    /// Fixed - float position (m)
    pub dxyz_m: (f64, f64, f64),
    /// Ratio test value, when integer least squares was used
    pub ratio: Option<f64>,
    /// Number of fixed narrow lane ambiguities
    pub nb_fixed: usize,
    /// Reference satellites
    pub references: Vec<SV>,
    pub wide_lane: Vec<WideLaneFix>,
    pub narrow_lane: Vec<NarrowLaneFix>,
}

/// Reason why no fixed solution was produced
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum NoFixReason {
    /// Float position not converged yet (m²)
    PositionVariance(f64),
    /// Float solution does not rely on iono-free ambiguities
    IonosphereMode,
    /// Not enough satellites selected
    NotEnoughSatellites(usize),
    /// Not enough fixed wide lane ambiguities
    NotEnoughWideLane(usize),
    /// Not enough narrow lane candidates
    NotEnoughNarrowLane(usize),
    /// Integer search validation failed, with best ratio
    RatioTest(f64),
}

impl std::fmt::Display for NoFixReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PositionVariance(var) => write!(f, "position variance too large: {:.3} m²", var),
            Self::IonosphereMode => write!(f, "no iono-free ambiguities"),
            Self::NotEnoughSatellites(n) => write!(f, "not enough satellites: {}", n),
            Self::NotEnoughWideLane(n) => write!(f, "not enough wide lane fixes: {}", n),
            Self::NotEnoughNarrowLane(n) => write!(f, "not enough narrow lane candidates: {}", n),
            Self::RatioTest(ratio) => write!(f, "ratio test failed: {:.3}", ratio),
        }
    }
}

/// Outcome of an ambiguity resolution attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ArOutcome {
    Fixed(FixedSolution),
    NoFix(NoFixReason),
}

impl ArOutcome {
    /// Fixed solution, if any
    pub fn fixed(&self) -> Option<&FixedSolution> {
        match self {
            Self::Fixed(solution) => Some(solution),
            Self::NoFix(_) => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

/// Processed epoch, stored for later (backward) processing
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSnapshot {
    pub observations: EpochObservations,
    pub variables: BTreeMap<VariableKey, usize>,
    pub state: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{carrier::Carrier, prelude::Constellation};
    use std::str::FromStr;

    #[test]
    fn float_solution_lookups() {
        let t = Epoch::from_str("2020-06-25T00:00:00 GPST").unwrap();
        let g01 = SV::new(Constellation::GPS, 1);
        let dual = Carrier::dual_frequency(Constellation::GPS).unwrap();
        let amb = Parameter::Ambiguity(Observable::IonoFreePhase(dual));

        let mut variables = BTreeMap::new();
        for (i, parameter) in [Parameter::Dx, Parameter::Dy, Parameter::Dz].iter().enumerate() {
            variables.insert(VariableKey::new(*parameter), i);
        }
        variables.insert(VariableKey::new(amb).with_sv(g01).with_arc(0), 3);

        let solution = FloatSolution {
            epoch: t,
            apriori_m: (0.0, 0.0, 0.0),
            position_m: (1.0, 2.0, 3.0),
            variables,
            x: DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.5]),
            p: DMatrix::from_diagonal(&DVector::from_row_slice(&[0.3, 0.4, 0.0, 1.0])),
            residuals: [((g01, Observable::IonoFreePhase(dual)), (0.1, 0.002))]
                .into_iter()
                .collect(),
        };

        assert_eq!(solution.position_indexes(), Some([0, 1, 2]));
        assert_eq!(solution.value(amb, Some(g01)), Some(4.5));
        assert_eq!(solution.find(amb, None), None);
        assert_eq!(solution.postfit(g01, Observable::IonoFreePhase(dual)), Some(0.002));
        assert_eq!(solution.prefit(g01, Observable::IonoFreePhase(dual)), Some(0.1));
        assert!((solution.position_variance().unwrap() - 0.5).abs() < 1.0E-12);
    }

    #[test]
    fn no_fix_reason() {
        assert_eq!(
            NoFixReason::NotEnoughWideLane(2).to_string(),
            "not enough wide lane fixes: 2"
        );
        assert!(!ArOutcome::NoFix(NoFixReason::IonosphereMode).is_fixed());
    }
}
