//! Float PPP solver
use std::collections::BTreeMap;

use log::{debug, error, info};
use nalgebra::{DMatrix, DVector};

use crate::{
    cfg::Config,
    navigation::{
        equsys::{EquationSystem, PreparedSystem},
        kalman::{Kalman, KfEstimate},
        layout::equation_templates,
        variable::{Parameter, Variable, VariableKey},
    },
    observation::EpochObservations,
    prelude::{Epoch, Error},
    solutions::{EpochSnapshot, FloatSolution},
};

/// PPP float solver: a Kalman filter running over an
/// [EquationSystem] whose unknowns change every epoch.
#[derive(Debug, Clone)]
pub struct PPPSolver {
    /// [Config] preset
    cfg: Config,
    /// Apriori ECEF position (m)
    apriori_m: (f64, f64, f64),
    /// [EquationSystem]
    system: EquationSystem,
    /// [Kalman] filter
    kalman: Kalman,
    /// Latest processed [Epoch]
    prev_epoch: Option<Epoch>,
    /// Stored epochs
    snapshots: BTreeMap<Epoch, EpochSnapshot>,
}

impl PPPSolver {
    /// Builds a new [PPPSolver]
    /// ## Input
    /// - cfg: [Config] preset
    /// - apriori_m: apriori ECEF position (m), all observations
    /// are expected to be linearized around this position.
    pub fn new(cfg: &Config, apriori_m: (f64, f64, f64)) -> Self {
        let templates = equation_templates(cfg);
        Self {
            cfg: cfg.clone(),
            apriori_m,
            system: EquationSystem::new(
                templates,
                cfg.solver.min_equations,
                cfg.solver.combination_noise,
            ),
            kalman: Kalman::new(),
            prev_epoch: None,
            snapshots: Default::default(),
        }
    }

    /// Process a new epoch. The solver state is only updated on success:
    /// on error, the previous state remains and the next epoch may be processed.
    pub fn process(&mut self, observations: &EpochObservations) -> Result<FloatSolution, Error> {
        let epoch = observations.epoch;

        if let Some(prev_epoch) = self.prev_epoch {
            if epoch <= prev_epoch {
                error!("{} - epoch is not posterior to {}", epoch, prev_epoch);
                return Err(Error::NonIncreasingEpoch(epoch));
            }
        }

        let (prepared, apriori) = self.pre_compute(observations)?;
        let estimate = self.compute(&prepared, &apriori)?;
        let solution = self.post_compute(&prepared, &estimate);

        if self.cfg.solver.store_epochs {
            self.snapshots.insert(
                epoch,
                EpochSnapshot {
                    observations: observations.clone(),
                    variables: solution.variables.clone(),
                    state: estimate.x.clone(),
                    covariance: estimate.p.clone(),
                },
            );
        }

        self.kalman.commit(estimate);
        self.system.commit(prepared);
        self.prev_epoch = Some(epoch);

        info!(
            "{} - float position ({:.3}, {:.3}, {:.3}) m",
            epoch, solution.position_m.0, solution.position_m.1, solution.position_m.2
        );

        Ok(solution)
    }

    /// Prepares the equation system and the apriori estimate, expressed
    /// in the layout of the current unknowns.
    pub(crate) fn pre_compute(
        &self,
        observations: &EpochObservations,
    ) -> Result<(PreparedSystem, KfEstimate), Error> {
        let prepared = self.system.prepare(observations.epoch, observations)?;

        let n = prepared.len();
        let mut apriori = KfEstimate::zero(n);

        match self.kalman.estimate() {
            Some(previous) if self.kalman.initialized => {
                for v in prepared.variables.iter() {
                    match v.pre_index {
                        Some(pre_i) => {
                            apriori.x[v.now_index] = previous.x[pre_i];
                            for w in prepared.variables.iter() {
                                if let Some(pre_j) = w.pre_index {
                                    apriori.p[(v.now_index, w.now_index)] =
                                        previous.p[(pre_i, pre_j)];
                                }
                            }
                        },
                        None => {
                            apriori.p[(v.now_index, v.now_index)] = v.initial_variance;
                        },
                    }
                }
            },
            _ => {
                for v in prepared.variables.iter() {
                    apriori.p[(v.now_index, v.now_index)] = v.initial_variance;
                }
            },
        }

        Ok((prepared, apriori))
    }

    fn compute(&self, prepared: &PreparedSystem, apriori: &KfEstimate) -> Result<KfEstimate, Error> {
        debug!(
            "{} - H={} y={} W={}",
            prepared.epoch,
            prepared.h,
            prepared.y.transpose(),
            prepared.r.diagonal().transpose()
        );

        Kalman::run(
            apriori,
            &prepared.phi,
            &prepared.q,
            &prepared.h,
            &prepared.r,
            &prepared.y,
        )
    }

    fn post_compute(&self, prepared: &PreparedSystem, estimate: &KfEstimate) -> FloatSolution {
        let postfit: DVector<f64> = &prepared.y - &prepared.h * &estimate.x;

        let residuals = prepared
            .equations
            .iter()
            .enumerate()
            .map(|(i, eq)| ((eq.sv, eq.observable), (eq.prefit, postfit[i])))
            .collect();

        let component = |parameter: Parameter| {
            prepared
                .index
                .get(&VariableKey::new(parameter))
                .map(|i| estimate.x[*i])
                .unwrap_or_default()
        };

        let (x0, y0, z0) = self.apriori_m;

        FloatSolution {
            epoch: prepared.epoch,
            apriori_m: self.apriori_m,
            position_m: (
                x0 + component(Parameter::Dx),
                y0 + component(Parameter::Dy),
                z0 + component(Parameter::Dz),
            ),
            variables: prepared.index.clone(),
            x: estimate.x.clone(),
            p: estimate.p.clone(),
            residuals,
        }
    }

    /// Latest estimate of this unknown
    pub fn variable_value(&self, key: &VariableKey) -> Option<f64> {
        let variable = self.system.variable(key)?;
        let estimate = self.kalman.estimate()?;
        Some(estimate.x[variable.now_index])
    }

    /// Latest estimated ECEF position (m)
    pub fn position(&self) -> Option<(f64, f64, f64)> {
        self.kalman.estimate()?;
        let component = |parameter: Parameter| {
            self.variable_value(&VariableKey::new(parameter))
                .unwrap_or_default()
        };
        let (x0, y0, z0) = self.apriori_m;
        Some((
            x0 + component(Parameter::Dx),
            y0 + component(Parameter::Dy),
            z0 + component(Parameter::Dz),
        ))
    }

    /// Currently estimated unknowns, sorted by state slot
    pub fn variables(&self) -> Vec<&Variable> {
        self.system.variables()
    }

    /// Latest state vector
    pub fn state(&self) -> Option<&DVector<f64>> {
        self.kalman.estimate().map(|e| &e.x)
    }

    /// Latest covariance matrix
    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.kalman.estimate().map(|e| &e.p)
    }

    /// Stored epochs, when [crate::prelude::SolverOpts::store_epochs] is enabled
    pub fn snapshots(&self) -> &BTreeMap<Epoch, EpochSnapshot> {
        &self.snapshots
    }

    /// Takes ownership of the stored epochs
    pub fn take_snapshots(&mut self) -> BTreeMap<Epoch, EpochSnapshot> {
        std::mem::take(&mut self.snapshots)
    }

    /// Reset this solver: all unknowns are forgotten.
    pub fn reset(&mut self) {
        self.kalman.reset();
        self.system.reset();
        self.prev_epoch = None;
        self.snapshots.clear();
    }
}
