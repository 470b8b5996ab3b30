//! PPP ambiguity resolution: wide lane then narrow lane fixing of
//! single differenced iono-free ambiguities, and fixed position.
use itertools::Itertools;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

mod confidence;
mod lambda;
mod mw;
mod pair;
mod upd;

pub use confidence::{confidence, erfc};
pub use lambda::{Lambda, LambdaSolution};
pub use mw::{melbourne_wubbena, MwSmoother, MwState};
pub use pair::{NarrowLaneFix, SatPair, WideLaneFix};
pub use upd::{NoUpd, UpdError, UpdKind, UpdProvider, UpdSign, UpdTable};

use crate::{
    carrier::{Carrier, DualCarrier},
    cfg::{AmbiguityFixMode, AmbiguityOpts, Config},
    navigation::{kalman::spd_inverse, Parameter},
    observation::{EpochObservations, Observable},
    prelude::{Constellation, Epoch, Error, SV},
    solutions::{ArOutcome, FixedSolution, FloatSolution, NoFixReason},
};

/// Minimal number of fixed pairs, per reference and in total
const MIN_FIXES: usize = 3;

/// Satellite retained for ambiguity resolution
#[derive(Debug, Clone, Copy)]
struct ArCandidate {
    sv: SV,
    elevation_deg: f64,
    dual: DualCarrier,
    /// Slot of the iono-free ambiguity in the float state
    ambiguity: Option<usize>,
}

/// Rounds a float wide lane (cycles) of said variance (cycles²).
/// Returns the integer, the rounding residual and the bootstrapping success rate.
pub(crate) fn round_wide_lane(float: f64, variance: f64) -> (i64, f64, f64) {
    let fixed = float.round() as i64;
    let residual = (fixed as f64 - float).abs();
    (fixed, residual, confidence(fixed, float, variance.sqrt()))
}

pub(crate) fn wide_lane_accepted(residual: f64, confidence: f64, opts: &AmbiguityOpts) -> bool {
    residual <= opts.wl_max_residual && confidence >= opts.wl_min_confidence
}

/// Outcome of the partial integer search
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PartialSearch {
    /// The `count` first ambiguities were validated
    Accepted {
        count: usize,
        best: DVector<f64>,
        ratio: f64,
    },
    /// Nothing passed validation
    Rejected { ratio: f64 },
}

/// Partial integer least squares: ambiguities are sorted by increasing variance,
/// and the worst one is dropped until the subset passes both the ADOP and ratio tests.
pub(crate) fn partial_search(a: &DVector<f64>, q: &DMatrix<f64>, opts: &AmbiguityOpts) -> PartialSearch {
    let mut best_ratio = 0.0_f64;

    for i in (MIN_FIXES..=a.len()).rev() {
        let q_i = q.view((0, 0), (i, i)).into_owned();
        let a_i = a.rows(0, i).into_owned();

        let adop = q_i.determinant();
        if adop > opts.adop_base.powi(2 * i as i32) {
            debug!("ils - n={} adop={:e} too large", i, adop);
            continue;
        }

        let solution = match Lambda::solve(&a_i, &q_i, 2) {
            Ok(solution) => solution,
            Err(e) => {
                debug!("ils - n={} {}", i, e);
                continue;
            },
        };

        let ratio = match solution.ratio() {
            Some(ratio) => ratio,
            None => {
                debug!("ils - n={} null residuals", i);
                continue;
            },
        };

        best_ratio = best_ratio.max(ratio);

        if ratio > opts.ratio_threshold {
            return PartialSearch::Accepted {
                count: i,
                best: solution.best(),
                ratio,
            };
        }

        debug!("ils - n={} ratio={:.3} rejected", i, ratio);
    }

    PartialSearch::Rejected { ratio: best_ratio }
}

/// PPP ambiguity solver. Only the MW smoothing persists from one epoch to the other.
#[derive(Debug, Clone)]
pub struct AmbiguitySolver {
    cfg: Config,
    mw: MwSmoother,
}

impl AmbiguitySolver {
    /// Builds a new [AmbiguitySolver]
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            mw: MwSmoother::default(),
        }
    }

    /// Smoothed MW state of this satellite
    pub fn mw_state(&self, sv: &SV) -> Option<&MwState> {
        self.mw.get(sv)
    }

    /// Reset all smoothing
    pub fn reset(&mut self) {
        self.mw.reset();
    }

    fn upd(
        &self,
        provider: &dyn UpdProvider,
        sv: SV,
        kind: UpdKind,
        epoch: Epoch,
    ) -> Result<f64, Error> {
        if !self.cfg.ambiguity.use_upd {
            return Ok(0.0);
        }
        Ok(provider.satellite_upd(sv, kind, epoch)?)
    }

    /// Wide lane UPD (cycles) to remove from the MW ambiguity,
    /// in the convention of this product.
    fn wide_lane_upd(&self, provider: &dyn UpdProvider, sv: SV, epoch: Epoch) -> Result<f64, Error> {
        let upd = self.upd(provider, sv, UpdKind::WideLane, epoch)?;
        Ok(-provider.wide_lane_sign().correction(upd))
    }

    /// Attempts to fix the ambiguities of this [FloatSolution].
    /// ## Input
    /// - float: [FloatSolution] of this epoch
    /// - observations: [EpochObservations] the float solution was resolved from
    /// - upd: [UpdProvider]
    /// ## Returns
    /// - [ArOutcome::Fixed] when the ambiguities were fixed and validated
    /// - [ArOutcome::NoFix] when this epoch does not allow fixing
    /// - [Error] on numerical failure
    pub fn resolve(
        &mut self,
        float: &FloatSolution,
        observations: &EpochObservations,
        upd: &dyn UpdProvider,
    ) -> Result<ArOutcome, Error> {
        let epoch = observations.epoch;
        let opts = self.cfg.ambiguity.clone();

        // MW smoothing
        for (sv, observation) in observations.satellites.iter() {
            if let Some(dual) = Carrier::dual_frequency(sv.constellation) {
                let sigma = self.cfg.sigma(sv.constellation);
                self.mw.update(
                    epoch,
                    *sv,
                    observation,
                    &dual,
                    &sigma,
                    opts.sampling_interval_s,
                );
            }
        }

        // satellite selection
        let selected = observations
            .satellites
            .iter()
            .filter_map(|(sv, observation)| {
                if !self.cfg.constellations.contains(&sv.constellation) {
                    return None;
                }
                let dual = Carrier::dual_frequency(sv.constellation)?;
                if observation.elevation_deg < opts.min_elevation_deg {
                    debug!("{}({}) - elevation below mask", epoch, sv);
                    return None;
                }
                // one wide lane observable per satellite and per epoch
                let mw = self.mw.get(sv)?;
                if mw.last_epoch != epoch {
                    debug!("{}({}) - no mw sample this epoch", epoch, sv);
                    return None;
                }
                Some(ArCandidate {
                    sv: *sv,
                    elevation_deg: observation.elevation_deg,
                    dual,
                    ambiguity: float.find(
                        Parameter::Ambiguity(Observable::IonoFreePhase(dual)),
                        Some(*sv),
                    ),
                })
            })
            .collect::<Vec<_>>();

        self.mw.retain(|sv| selected.iter().any(|c| c.sv == *sv));

        let position_variance = float.position_variance().unwrap_or(f64::INFINITY);
        if position_variance > opts.max_position_variance {
            debug!("{} - float position not converged ({:.3} m²)", epoch, position_variance);
            return Ok(ArOutcome::NoFix(NoFixReason::PositionVariance(position_variance)));
        }

        if selected.len() < opts.min_satellites {
            debug!("{} - not enough satellites ({})", epoch, selected.len());
            return Ok(ArOutcome::NoFix(NoFixReason::NotEnoughSatellites(selected.len())));
        }

        if selected.iter().all(|c| c.ambiguity.is_none()) {
            return Ok(ArOutcome::NoFix(NoFixReason::IonosphereMode));
        }

        // reference selection & wide lane
        let (references, wide_lane) = self.wide_lane(epoch, float, &selected, upd);

        if wide_lane.len() < MIN_FIXES {
            info!("{} - not enough wide lane fixes ({})", epoch, wide_lane.len());
            return Ok(ArOutcome::NoFix(NoFixReason::NotEnoughWideLane(wide_lane.len())));
        }

        // narrow lane
        let mut narrow_lane = self.narrow_lane_candidates(epoch, float, &selected, &wide_lane, upd);

        if narrow_lane.len() < MIN_FIXES {
            info!("{} - not enough narrow lane candidates ({})", epoch, narrow_lane.len());
            return Ok(ArOutcome::NoFix(NoFixReason::NotEnoughNarrowLane(narrow_lane.len())));
        }

        let ratio = match opts.fix_mode {
            AmbiguityFixMode::Round => None,
            AmbiguityFixMode::Ils => {
                let (a, q) = Self::narrow_lane_covariance(float, &narrow_lane);
                match partial_search(&a, &q, &opts) {
                    PartialSearch::Accepted { count, best, ratio } => {
                        narrow_lane.truncate(count);
                        for (fix, n) in narrow_lane.iter_mut().zip(best.iter()) {
                            fix.fixed = n.round() as i64;
                            fix.residual = (*n - fix.float).abs();
                        }
                        Some(ratio)
                    },
                    PartialSearch::Rejected { ratio } => {
                        info!("{} - ratio test failed ({:.3})", epoch, ratio);
                        return Ok(ArOutcome::NoFix(NoFixReason::RatioTest(ratio)));
                    },
                }
            },
        };

        let solution = Self::fixed_solution(float, references, wide_lane, narrow_lane, ratio)?;

        info!(
            "{} - fixed {} ambiguities ({}) - dxyz=({:.3}, {:.3}, {:.3}) m",
            epoch,
            solution.nb_fixed,
            opts.fix_mode,
            solution.dxyz_m.0,
            solution.dxyz_m.1,
            solution.dxyz_m.2
        );

        Ok(ArOutcome::Fixed(solution))
    }

    /// Selects one reference per constellation, by descending elevation,
    /// and fixes the wide lane ambiguities against it.
    fn wide_lane(
        &self,
        epoch: Epoch,
        float: &FloatSolution,
        selected: &[ArCandidate],
        upd: &dyn UpdProvider,
    ) -> (Vec<SV>, Vec<WideLaneFix>) {
        let opts = &self.cfg.ambiguity;
        let mut references = Vec::<SV>::new();
        let mut fixes = Vec::<WideLaneFix>::new();
        let mut done = Vec::<Constellation>::new();

        let by_elevation = selected
            .iter()
            .sorted_by(|a, b| b.elevation_deg.total_cmp(&a.elevation_deg));

        for reference in by_elevation {
            if done.contains(&reference.sv.constellation) || reference.ambiguity.is_none() {
                continue;
            }

            let observable = Observable::IonoFreePhase(reference.dual);
            match float.postfit(reference.sv, observable) {
                Some(residual) if residual.abs() <= opts.max_reference_residual => {},
                Some(residual) => {
                    debug!(
                        "{}({}) - reference rejected: residual {:.4} m",
                        epoch, reference.sv, residual
                    );
                    continue;
                },
                None => {
                    debug!("{}({}) - reference rejected: no residual", epoch, reference.sv);
                    continue;
                },
            }

            let pairs = self.wide_lane_fixes(epoch, reference, selected, upd);

            if pairs.len() < MIN_FIXES {
                debug!(
                    "{}({}) - reference rejected: {} wide lane fixes",
                    epoch,
                    reference.sv,
                    pairs.len()
                );
                continue;
            }

            debug!("{}({}) - new reference", epoch, reference.sv);
            done.push(reference.sv.constellation);
            references.push(reference.sv);
            fixes.extend(pairs);
        }

        let fixes = fixes
            .into_iter()
            .unique_by(|fix| fix.pair.canonical())
            .collect();

        (references, fixes)
    }

    /// Wide lane fixes of every satellite against this reference
    fn wide_lane_fixes(
        &self,
        epoch: Epoch,
        reference: &ArCandidate,
        selected: &[ArCandidate],
        upd: &dyn UpdProvider,
    ) -> Vec<WideLaneFix> {
        let opts = &self.cfg.ambiguity;
        let mut fixes = Vec::new();

        let mw_ref = match self.mw.get(&reference.sv) {
            Some(mw) => mw,
            None => return fixes,
        };

        let upd_ref = match self.wide_lane_upd(upd, reference.sv, epoch) {
            Ok(upd) => upd,
            Err(e) => {
                debug!("{}", e);
                return fixes;
            },
        };

        let lambda_wl = reference.dual.wide_lane_wavelength();

        for candidate in selected.iter() {
            if candidate.sv == reference.sv
                || candidate.sv.constellation != reference.sv.constellation
                || candidate.ambiguity.is_none()
            {
                continue;
            }

            let mw = match self.mw.get(&candidate.sv) {
                Some(mw) => mw,
                None => continue,
            };

            let upd_sv = match self.wide_lane_upd(upd, candidate.sv, epoch) {
                Ok(upd) => upd,
                Err(e) => {
                    debug!("{}", e);
                    continue;
                },
            };

            let float = (mw.mean() / lambda_wl - upd_sv) - (mw_ref.mean() / lambda_wl - upd_ref);
            let variance = (mw.variance() / mw.count() as f64
                + mw_ref.variance() / mw_ref.count() as f64)
                / lambda_wl.powi(2);

            let (fixed, residual, confidence) = round_wide_lane(float, variance);

            let pair = SatPair::new(candidate.sv, reference.sv);

            if !wide_lane_accepted(residual, confidence, opts) {
                debug!(
                    "{}({}) - wide lane rejected: wl={:.3} res={:.3} p={:.4}",
                    epoch, pair, float, residual, confidence
                );
                continue;
            }

            fixes.push(WideLaneFix {
                pair,
                float,
                fixed,
                residual,
                variance,
                confidence,
            });
        }

        fixes
    }

    /// Narrow lane candidates, sorted by increasing variance
    fn narrow_lane_candidates(
        &self,
        epoch: Epoch,
        float: &FloatSolution,
        selected: &[ArCandidate],
        wide_lane: &[WideLaneFix],
        upd: &dyn UpdProvider,
    ) -> Vec<NarrowLaneFix> {
        let opts = &self.cfg.ambiguity;
        let mut candidates = Vec::<NarrowLaneFix>::new();

        for wl in wide_lane.iter() {
            let pair = wl.pair;

            let find = |sv: SV| selected.iter().find(|c| c.sv == sv);

            let (sv, reference) = match (find(pair.sv), find(pair.reference)) {
                (Some(sv), Some(reference)) => (sv, reference),
                _ => continue,
            };

            let (i_sv, i_ref) = match (sv.ambiguity, reference.ambiguity) {
                (Some(i_sv), Some(i_ref)) => (i_sv, i_ref),
                _ => continue,
            };

            let dual = sv.dual;
            let (beta, lambda_2, lambda_nl) = (
                dual.beta(),
                dual.rhs.wavelength(),
                dual.narrow_lane_wavelength(),
            );

            let upd = if opts.fix_mode == AmbiguityFixMode::Round {
                let upd_sv = self.upd(upd, pair.sv, UpdKind::NarrowLane, epoch);
                let upd_ref = self.upd(upd, pair.reference, UpdKind::NarrowLane, epoch);
                match (upd_sv, upd_ref) {
                    (Ok(upd_sv), Ok(upd_ref)) => upd_sv - upd_ref,
                    (Err(e), _) | (_, Err(e)) => {
                        debug!("{}", e);
                        continue;
                    },
                }
            } else {
                0.0
            };

            let sd_float_m = float.x[i_sv] - float.x[i_ref];
            let nl = (sd_float_m + beta * lambda_2 * wl.fixed as f64) / lambda_nl + upd;

            let fixed = nl.round() as i64;
            let residual = (fixed as f64 - nl).abs();

            if residual > opts.nl_max_residual {
                debug!(
                    "{}({}) - narrow lane rejected: nl={:.3} res={:.3}",
                    epoch, pair, nl, residual
                );
                continue;
            }

            let observable = Observable::IonoFreePhase(dual);
            match (
                float.postfit(pair.sv, observable),
                float.postfit(pair.reference, observable),
            ) {
                (Some(res_sv), Some(res_ref)) => {
                    if (res_sv - res_ref).abs() > opts.max_pair_residual_delta {
                        debug!(
                            "{}({}) - narrow lane rejected: residuals {:.4}/{:.4} m",
                            epoch, pair, res_sv, res_ref
                        );
                        continue;
                    }
                },
                _ => continue,
            }

            let variance =
                float.p[(i_sv, i_sv)] + float.p[(i_ref, i_ref)] - 2.0 * float.p[(i_sv, i_ref)];

            candidates.push(NarrowLaneFix {
                pair,
                float: nl,
                fixed,
                residual,
                variance,
                wide_lane: wl.fixed,
                sd_float_m,
                indexes: (i_sv, i_ref),
                lambda_nl,
                lambda_2,
                beta,
                upd,
            });
        }

        candidates.sort_by(|a, b| a.variance.total_cmp(&b.variance));
        candidates
    }

    /// Float narrow lane ambiguities (cycles) and their covariance
    fn narrow_lane_covariance(
        float: &FloatSolution,
        candidates: &[NarrowLaneFix],
    ) -> (DVector<f64>, DMatrix<f64>) {
        let (n, nx) = (candidates.len(), float.x.nrows());
        let mut h = DMatrix::<f64>::zeros(n, nx);
        let mut a = DVector::<f64>::zeros(n);

        for (k, fix) in candidates.iter().enumerate() {
            h[(k, fix.indexes.0)] = 1.0 / fix.lambda_nl;
            h[(k, fix.indexes.1)] = -1.0 / fix.lambda_nl;
            a[k] = fix.float;
        }

        let q = &h * &float.p * h.transpose();
        (a, q)
    }

    /// Conditional least squares: constrains the float position with the fixed ambiguities
    fn fixed_solution(
        float: &FloatSolution,
        references: Vec<SV>,
        wide_lane: Vec<WideLaneFix>,
        narrow_lane: Vec<NarrowLaneFix>,
        ratio: Option<f64>,
    ) -> Result<FixedSolution, Error> {
        let [ix, iy, iz] = float.position_indexes().ok_or(Error::MatrixDimension)?;

        let (nb, nx) = (narrow_lane.len(), float.x.nrows());

        let mut d = DMatrix::<f64>::zeros(nb + 3, nx);
        let mut yb = DVector::<f64>::zeros(nb);

        for (k, fix) in narrow_lane.iter().enumerate() {
            d[(k, fix.indexes.0)] = 1.0;
            d[(k, fix.indexes.1)] = -1.0;
            yb[k] = fix.sd_float_m - fix.fixed_sd_m();
        }

        d[(nb, ix)] = 1.0;
        d[(nb + 1, iy)] = 1.0;
        d[(nb + 2, iz)] = 1.0;

        let qq = &d * &float.p * d.transpose();
        let qb = qq.view((0, 0), (nb, nb)).into_owned();
        let qab = qq.view((nb, 0), (3, nb)).into_owned();

        let k = &qab * spd_inverse(&qb)?;
        let dx = -(&k * &yb);
        let pa = -(&k * qab.transpose());

        let mut covariance = [[0.0; 3]; 3];
        for (i, row) in [ix, iy, iz].iter().enumerate() {
            for (j, col) in [ix, iy, iz].iter().enumerate() {
                covariance[i][j] = float.p[(*row, *col)] + pa[(i, j)];
            }
        }

        let (x0, y0, z0) = float.position_m;

        Ok(FixedSolution {
            epoch: float.epoch,
            float_position_m: float.position_m,
            fixed_position_m: (x0 + dx[0], y0 + dx[1], z0 + dx[2]),
            covariance,
            dxyz_m: (dx[0], dx[1], dx[2]),
            ratio,
            nb_fixed: nb,
            references,
            wide_lane,
            narrow_lane,
        })
    }
}
