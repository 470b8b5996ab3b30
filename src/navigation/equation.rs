//! Observation equation templates
use crate::{
    navigation::{
        stochastic::ProcessModel,
        variable::{Parameter, SourceId, VariableKey},
    },
    observation::{Observable, SatelliteObservation},
    prelude::{Constellation, SV},
};

/// Design matrix coefficient of one term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficient {
    /// Fixed value
    Forced(f64),
    /// Line of sight X component, read from the record
    LosX,
    /// Line of sight Y component, read from the record
    LosY,
    /// Line of sight Z component, read from the record
    LosZ,
    /// Wet troposphere mapping, read from the record
    WetMapping,
}

impl Coefficient {
    /// Evaluate this [Coefficient] for this record
    pub fn evaluate(&self, observation: &SatelliteObservation) -> f64 {
        match self {
            Self::Forced(value) => *value,
            Self::LosX => observation.los.0,
            Self::LosY => observation.los.1,
            Self::LosZ => observation.los.2,
            Self::WetMapping => observation.wet_mapping,
        }
    }
}

/// Describes how to build the unknowns of one kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableTemplate {
    pub parameter: Parameter,
    /// One unknown per satellite
    pub sv_indexed: bool,
    /// One unknown per receiver
    pub source_indexed: bool,
    /// One unknown per continuous tracking arc
    pub arc_indexed: bool,
    /// Variance of the unknown when it is born
    pub initial_variance: f64,
    /// Dynamics of the unknown
    pub model: ProcessModel,
}

impl VariableTemplate {
    /// Receiver level unknown
    pub fn new(parameter: Parameter, initial_variance: f64, model: ProcessModel) -> Self {
        Self {
            parameter,
            sv_indexed: false,
            source_indexed: true,
            arc_indexed: false,
            initial_variance,
            model,
        }
    }

    /// Copies and returns as satellite indexed
    pub fn sv_indexed(&self) -> Self {
        let mut s = *self;
        s.sv_indexed = true;
        s
    }

    /// Copies and returns as tracking arc indexed. Only applies to satellite indexed unknowns.
    pub fn arc_indexed(&self) -> Self {
        let mut s = *self;
        s.sv_indexed = true;
        s.arc_indexed = true;
        s
    }

    /// Copies and returns as a receiver independent unknown
    pub fn without_source(&self) -> Self {
        let mut s = *self;
        s.source_indexed = false;
        s
    }

    /// [VariableKey] of the unknown this template builds, for this satellite and arc.
    pub fn key(&self, sv: SV, arc: u32) -> VariableKey {
        VariableKey {
            parameter: self.parameter,
            source: if self.source_indexed {
                Some(SourceId::default())
            } else {
                None
            },
            sv: if self.sv_indexed { Some(sv) } else { None },
            arc: if self.arc_indexed { Some(arc) } else { None },
        }
    }
}

/// Describes one observation equation, instantiated for every
/// satellite of said [Constellation] that carries the observable.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationTemplate {
    /// Independent term
    pub observable: Observable,
    pub constellation: Constellation,
    /// Weight (1/σ²)
    pub weight: f64,
    pub terms: Vec<(VariableTemplate, Coefficient)>,
}

impl EquationTemplate {
    pub fn new(observable: Observable, constellation: Constellation, weight: f64) -> Self {
        Self {
            observable,
            constellation,
            weight,
            terms: Vec::with_capacity(8),
        }
    }

    /// Copies and returns with one more term
    pub fn with_term(&self, variable: VariableTemplate, coefficient: Coefficient) -> Self {
        let mut s = self.clone();
        s.terms.push((variable, coefficient));
        s
    }

    /// True if this template applies to this satellite record
    pub fn applies(&self, sv: SV, observation: &SatelliteObservation) -> bool {
        sv.constellation == self.constellation && observation.prefit.contains_key(&self.observable)
    }
}

/// Observation equation of one satellite
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub sv: SV,
    pub observable: Observable,
    /// Prefit residual (m)
    pub prefit: f64,
    /// Weight (1/σ²)
    pub weight: f64,
    pub terms: Vec<(VariableKey, f64)>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        carrier::Carrier,
        constants::VAR_BIAS_M2,
        prelude::{Constellation, SV},
    };

    #[test]
    fn template_keys() {
        let sv = SV::new(Constellation::GPS, 5);

        let clock = VariableTemplate::new(
            Parameter::ClockOffset(Constellation::GPS),
            3600.0,
            ProcessModel::white_noise(60.0),
        );

        let key = clock.key(sv, 3);
        assert_eq!(key.sv, None);
        assert_eq!(key.arc, None);
        assert_eq!(key.source, Some(SourceId(0)));

        let amb = VariableTemplate::new(
            Parameter::Ambiguity(Observable::Phase(Carrier::L1)),
            VAR_BIAS_M2,
            ProcessModel::phase_ambiguity(2.0E4),
        )
        .arc_indexed();

        let key = amb.key(sv, 3);
        assert_eq!(key.sv, Some(sv));
        assert_eq!(key.arc, Some(3));

        let key = amb.without_source().key(sv, 0);
        assert_eq!(key.source, None);
    }

    #[test]
    fn coefficients() {
        let sv = SV::new(Constellation::GPS, 1);
        let obs = SatelliteObservation::new(45.0, 0.0)
            .with_los((0.1, -0.2, 0.3))
            .with_wet_mapping(1.5)
            .with_prefit(Observable::Code(Carrier::L1), 1.0);

        assert_eq!(Coefficient::LosX.evaluate(&obs), 0.1);
        assert_eq!(Coefficient::LosY.evaluate(&obs), -0.2);
        assert_eq!(Coefficient::LosZ.evaluate(&obs), 0.3);
        assert_eq!(Coefficient::WetMapping.evaluate(&obs), 1.5);
        assert_eq!(Coefficient::Forced(-1.0).evaluate(&obs), -1.0);

        let template = EquationTemplate::new(Observable::Code(Carrier::L1), Constellation::GPS, 1.0);
        assert!(template.applies(sv, &obs));
        assert!(!template.applies(SV::new(Constellation::Galileo, 1), &obs));

        let template = EquationTemplate::new(Observable::Phase(Carrier::L1), Constellation::GPS, 1.0);
        assert!(!template.applies(sv, &obs));
    }
}
