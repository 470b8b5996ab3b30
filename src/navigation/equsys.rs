//! Equation system, rebuilt at every epoch from the templates
//! and the satellites in sight.
use std::collections::BTreeMap;

use log::{debug, error};
use nalgebra::{DMatrix, DVector};

use crate::{
    navigation::{
        equation::{Equation, EquationTemplate, VariableTemplate},
        stochastic::StochasticModel,
        variable::{IdSequence, Variable, VariableKey},
    },
    observation::{EpochObservations, Observable, SatelliteObservation},
    prelude::{Epoch, Error, SV},
};

/// Equation system of one epoch, ready to be fed to the filter.
/// Nothing is committed until [EquationSystem::commit].
#[derive(Debug, Clone)]
pub struct PreparedSystem {
    pub epoch: Epoch,
    /// Unknowns, sorted by current slot
    pub variables: Vec<Variable>,
    /// Unknown → slot
    pub index: BTreeMap<VariableKey, usize>,
    pub equations: Vec<Equation>,
    /// Design matrix
    pub h: DMatrix<f64>,
    /// Prefit residuals
    pub y: DVector<f64>,
    /// Weight matrix
    pub r: DMatrix<f64>,
    /// State transition
    pub phi: DMatrix<f64>,
    /// Process noise
    pub q: DMatrix<f64>,
    arcs: BTreeMap<SV, u32>,
    next_id: u64,
}

impl PreparedSystem {
    /// Number of unknowns
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Current tracking arc of this satellite
    pub fn arc(&self, sv: SV) -> Option<u32> {
        self.arcs.get(&sv).copied()
    }
}

#[derive(Debug, Clone)]
pub struct EquationSystem {
    templates: Vec<EquationTemplate>,
    min_equations: usize,
    combination_noise: bool,
    ids: IdSequence,
    /// Last committed unknowns
    variables: BTreeMap<VariableKey, Variable>,
    /// Tracking arc per satellite
    arcs: BTreeMap<SV, u32>,
}

impl EquationSystem {
    /// Builds a new [EquationSystem]
    /// ## Input
    /// - templates: equation descriptions
    /// - min_equations: minimal number of equations per epoch
    /// - combination_noise: deflate iono-free equations weight
    pub fn new(templates: Vec<EquationTemplate>, min_equations: usize, combination_noise: bool) -> Self {
        Self {
            templates,
            min_equations,
            combination_noise,
            ids: IdSequence::default(),
            variables: Default::default(),
            arcs: Default::default(),
        }
    }

    /// Last committed unknowns, sorted by slot
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = self.variables.values().collect::<Vec<_>>();
        vars.sort_by_key(|v| v.now_index);
        vars
    }

    /// Last committed [Variable] for this [VariableKey]
    pub fn variable(&self, key: &VariableKey) -> Option<&Variable> {
        self.variables.get(key)
    }

    /// Forget all unknowns
    pub fn reset(&mut self) {
        self.variables.clear();
        self.arcs.clear();
    }

    /// Weight of this equation template for this record
    fn weight(&self, template: &EquationTemplate, observation: &SatelliteObservation) -> f64 {
        let mut weight = template.weight * observation.weight.unwrap_or(1.0);
        if self.combination_noise {
            match template.observable {
                Observable::IonoFreeCode(dual) | Observable::IonoFreePhase(dual) => {
                    weight /= dual.noise_factor();
                },
                _ => {},
            }
        }
        weight
    }

    /// Prepares the equation system of this epoch. [Self] is not modified.
    pub fn prepare(
        &self,
        epoch: Epoch,
        observations: &EpochObservations,
    ) -> Result<PreparedSystem, Error> {
        // tracking arcs
        let mut arcs = BTreeMap::<SV, u32>::new();
        for (sv, obs) in observations.satellites.iter() {
            let arc = match self.arcs.get(sv) {
                Some(arc) if obs.cycle_slip => {
                    debug!("{}({}) - cycle slip, new arc #{}", epoch, sv, arc + 1);
                    arc + 1
                },
                Some(arc) => *arc,
                None => 0,
            };
            arcs.insert(*sv, arc);
        }

        // instantiate equations
        let mut equations = Vec::<Equation>::new();
        let mut templates = BTreeMap::<VariableKey, (VariableTemplate, Option<SV>)>::new();

        for template in self.templates.iter() {
            for (sv, obs) in observations.satellites.iter() {
                if !template.applies(*sv, obs) {
                    continue;
                }

                let prefit = match obs.prefit.get(&template.observable) {
                    Some(prefit) => *prefit,
                    None => continue,
                };

                let arc = arcs.get(sv).copied().unwrap_or_default();

                let terms = template
                    .terms
                    .iter()
                    .map(|(variable, coefficient)| {
                        let key = variable.key(*sv, arc);
                        templates
                            .entry(key)
                            .or_insert((*variable, key.sv.map(|_| *sv)));
                        (key, coefficient.evaluate(obs))
                    })
                    .collect::<Vec<_>>();

                equations.push(Equation {
                    sv: *sv,
                    observable: template.observable,
                    prefit,
                    weight: self.weight(template, obs),
                    terms,
                });
            }
        }

        if equations.len() < self.min_equations {
            error!(
                "{} - not enough equations: {}/{}",
                epoch,
                equations.len(),
                self.min_equations
            );
            return Err(Error::NotEnoughEquations {
                found: equations.len(),
                required: self.min_equations,
            });
        }

        // unknowns: key order defines slot order
        let mut next_id = self.ids.peek();
        let mut variables = Vec::<Variable>::with_capacity(templates.len());
        let mut index = BTreeMap::<VariableKey, usize>::new();

        for (now_index, (key, (template, sv))) in templates.iter().enumerate() {
            let record = sv.and_then(|sv| observations.satellites.get(&sv));

            let variable = match self.variables.get(key) {
                Some(previous) => {
                    let mut model = previous.model;
                    model.prepare(epoch, record);
                    Variable {
                        id: previous.id,
                        key: *key,
                        now_index,
                        pre_index: Some(previous.now_index),
                        initial_variance: previous.initial_variance,
                        model,
                    }
                },
                None => {
                    let mut model = template.model;
                    model.prepare(epoch, record);
                    Variable {
                        id: IdSequence::issue(&mut next_id),
                        key: *key,
                        now_index,
                        pre_index: None,
                        initial_variance: template.initial_variance,
                        model,
                    }
                },
            };

            index.insert(*key, now_index);
            variables.push(variable);
        }

        // matrices
        let (nb_equations, nb_variables) = (equations.len(), variables.len());

        let mut h = DMatrix::<f64>::zeros(nb_equations, nb_variables);
        let mut y = DVector::<f64>::zeros(nb_equations);
        let mut r = DMatrix::<f64>::zeros(nb_equations, nb_equations);

        for (i, equation) in equations.iter().enumerate() {
            y[i] = equation.prefit;
            r[(i, i)] = equation.weight;
            for (key, coefficient) in equation.terms.iter() {
                let j = index.get(key).ok_or(Error::UnknownVariable(*key))?;
                h[(i, *j)] += coefficient;
            }
        }

        let mut phi = DMatrix::<f64>::zeros(nb_variables, nb_variables);
        let mut q = DMatrix::<f64>::zeros(nb_variables, nb_variables);

        for variable in variables.iter() {
            let i = variable.now_index;
            if variable.is_new() {
                q[(i, i)] = variable.initial_variance;
            } else {
                phi[(i, i)] = variable.model.phi();
                q[(i, i)] = variable.model.q();
            }
        }

        debug!(
            "{} - {} equations, {} unknowns",
            epoch, nb_equations, nb_variables
        );

        Ok(PreparedSystem {
            epoch,
            variables,
            index,
            equations,
            h,
            y,
            r,
            phi,
            q,
            arcs,
            next_id,
        })
    }

    /// Install a [PreparedSystem] as the new committed state.
    pub fn commit(&mut self, prepared: PreparedSystem) {
        self.ids.advance_to(prepared.next_id);
        self.arcs = prepared.arcs;
        self.variables = prepared
            .variables
            .into_iter()
            .map(|v| (v.key, v))
            .collect();
    }
}
