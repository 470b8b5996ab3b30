//! Melbourne-Wübbena combination smoothing
use std::collections::BTreeMap;

use log::debug;

use crate::{
    averager::Averager,
    carrier::DualCarrier,
    cfg::MeasurementSigma,
    observation::SatelliteObservation,
    prelude::{Epoch, SV},
};

/// Smoothed MW combination of one satellite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MwState {
    /// MW combination (m)
    mw: Averager,
    /// MW variance (m²)
    variance: Averager,
    /// Latest update
    pub last_epoch: Epoch,
}

impl MwState {
    fn new(epoch: Epoch) -> Self {
        Self {
            mw: Averager::new(),
            variance: Averager::new(),
            last_epoch: epoch,
        }
    }

    /// Smoothed MW combination (m)
    pub fn mean(&self) -> f64 {
        self.mw.mean
    }

    /// Mean MW variance (m²)
    pub fn variance(&self) -> f64 {
        self.variance.mean
    }

    /// Number of samples since last reset
    pub fn count(&self) -> u32 {
        self.mw.count
    }
}

/// Melbourne-Wübbena combination (m) of raw L1, L2 phase and P1, P2 code ranges (m)
pub fn melbourne_wubbena(dual: &DualCarrier, l1: f64, l2: f64, p1: f64, p2: f64) -> f64 {
    let (f1, f2) = (dual.lhs.frequency(), dual.rhs.frequency());
    let lc = (f1 * l1 - f2 * l2) / (f1 - f2);
    let pc = (f1 * p1 + f2 * p2) / (f1 + f2);
    lc - pc
}

/// Variance (m²) of the MW combination, at this elevation
pub fn melbourne_wubbena_variance(dual: &DualCarrier, sigma: &MeasurementSigma, elevation_deg: f64) -> f64 {
    let (f1, f2) = (dual.lhs.frequency(), dual.rhs.frequency());
    let sin_el = elevation_deg.to_radians().sin();
    let sigma_m = (sigma.phase_m.powi(2) + (sigma.phase_m / sin_el).powi(2)).sqrt() * sigma.code_ratio;
    (f1.powi(2) + f2.powi(2)) / (f1 + f2).powi(2) * sigma_m.powi(2)
}

/// Smooths the MW combination of every satellite, along continuous tracking arcs.
#[derive(Debug, Clone, Default)]
pub struct MwSmoother {
    states: BTreeMap<SV, MwState>,
}

impl MwSmoother {
    /// Update with a new observation. Returns false when
    /// the raw observations are missing: the state of this satellite
    /// is then left untouched, unless a cycle slip was flagged, which
    /// always drops the current arc.
    pub fn update(
        &mut self,
        epoch: Epoch,
        sv: SV,
        observation: &SatelliteObservation,
        dual: &DualCarrier,
        sigma: &MeasurementSigma,
        sampling_interval_s: f64,
    ) -> bool {
        if observation.cycle_slip && self.states.remove(&sv).is_some() {
            debug!("{}({}) - mw reset (cycle slip)", epoch, sv);
        }

        let (l1, l2, p1, p2) = match observation.dual_frequency_raw(dual) {
            Some(raw) => raw,
            None => {
                debug!("{}({}) - missing raw {} observations", epoch, sv, dual);
                return false;
            },
        };

        let state = self.states.entry(sv).or_insert_with(|| MwState::new(epoch));

        let gap_s = (epoch - state.last_epoch).to_seconds();
        if gap_s > sampling_interval_s {
            debug!("{}({}) - mw reset (data gap)", epoch, sv);
            state.mw.reset();
            state.variance.reset();
        }

        state.mw.add(melbourne_wubbena(dual, l1, l2, p1, p2));
        state
            .variance
            .add(melbourne_wubbena_variance(dual, sigma, observation.elevation_deg));
        state.last_epoch = epoch;
        true
    }

    /// Smoothed state of this satellite
    pub fn get(&self, sv: &SV) -> Option<&MwState> {
        self.states.get(sv)
    }

    /// Drop every satellite that does not verify the predicate
    pub fn retain<F: Fn(&SV) -> bool>(&mut self, f: F) {
        self.states.retain(|sv, _| f(sv));
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        carrier::Carrier,
        observation::Observable,
        prelude::{Constellation, Duration, Epoch},
    };
    use std::str::FromStr;

    fn observation(dual: &DualCarrier, range: f64, n1: f64, n2: f64, slip: bool) -> SatelliteObservation {
        SatelliteObservation::new(40.0, 0.0)
            .with_cycle_slip(slip)
            .with_raw(Observable::Phase(dual.lhs), range + dual.lhs.wavelength() * n1)
            .with_raw(Observable::Phase(dual.rhs), range + dual.rhs.wavelength() * n2)
            .with_raw(Observable::Code(dual.lhs), range)
            .with_raw(Observable::Code(dual.rhs), range)
    }

    #[test]
    fn combination() {
        let dual = DualCarrier::new(Carrier::L1, Carrier::L2);
        let obs = observation(&dual, 22_000_000.0, 10.0, 3.0, false);
        let (l1, l2, p1, p2) = obs.dual_frequency_raw(&dual).unwrap();
        let mw = melbourne_wubbena(&dual, l1, l2, p1, p2);
        assert!((mw / dual.wide_lane_wavelength() - 7.0).abs() < 1.0E-6);
    }

    #[test]
    fn smoothing_and_resets() {
        let dual = DualCarrier::new(Carrier::L1, Carrier::L2);
        let sigma = MeasurementSigma::default();
        let sv = SV::new(Constellation::GPS, 1);
        let t0 = Epoch::from_str("2020-06-25T00:00:00 GPST").unwrap();

        let mut smoother = MwSmoother::default();

        for i in 0..4 {
            let t = t0 + Duration::from_seconds(30.0 * i as f64);
            let obs = observation(&dual, 22_000_000.0 + 100.0 * i as f64, 10.0, 3.0, false);
            assert!(smoother.update(t, sv, &obs, &dual, &sigma, 30.0));
        }

        let state = smoother.get(&sv).unwrap();
        assert_eq!(state.count(), 4);
        assert!((state.mean() / dual.wide_lane_wavelength() - 7.0).abs() < 1.0E-6);
        assert!(state.variance() > 0.0);

        // cycle slip
        let t = t0 + Duration::from_seconds(120.0);
        let obs = observation(&dual, 22_000_000.0, 20.0, 3.0, true);
        assert!(smoother.update(t, sv, &obs, &dual, &sigma, 30.0));
        let state = smoother.get(&sv).unwrap();
        assert_eq!(state.count(), 1);
        assert!((state.mean() / dual.wide_lane_wavelength() - 17.0).abs() < 1.0E-6);

        // data gap
        let t = t0 + Duration::from_seconds(300.0);
        let obs = observation(&dual, 22_000_000.0, 20.0, 3.0, false);
        assert!(smoother.update(t, sv, &obs, &dual, &sigma, 30.0));
        assert_eq!(smoother.get(&sv).unwrap().count(), 1);

        // missing raw data
        let t = t0 + Duration::from_seconds(330.0);
        let obs = SatelliteObservation::new(40.0, 0.0);
        assert!(!smoother.update(t, sv, &obs, &dual, &sigma, 30.0));
        assert_eq!(smoother.get(&sv).unwrap().count(), 1);

        // missing raw data on a cycle slip: the arc is dropped
        let obs = SatelliteObservation::new(40.0, 0.0).with_cycle_slip(true);
        assert!(!smoother.update(t, sv, &obs, &dual, &sigma, 30.0));
        assert!(smoother.get(&sv).is_none());

        let t = t0 + Duration::from_seconds(360.0);
        let obs = observation(&dual, 22_000_000.0, 20.0, 3.0, false);
        assert!(smoother.update(t, sv, &obs, &dual, &sigma, 30.0));
        assert_eq!(smoother.get(&sv).unwrap().count(), 1);

        smoother.retain(|s| *s != sv);
        assert!(smoother.is_empty());
    }
}
