//! Synthetic, noise free, static receiver scenario
use std::collections::BTreeMap;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::{
    navigation::{Parameter, VariableKey},
    prelude::{
        Carrier, Constellation, DualCarrier, Epoch, EpochObservations, FloatSolution, Observable,
        SatelliteObservation, SV,
    },
};

pub const T0: &str = "2020-06-25T00:00:00 GPST";

/// Sampling interval (s)
pub const INTERVAL_S: f64 = 30.0;

pub const APRIORI_ECEF_M: (f64, f64, f64) = (3_628_427.9118, 562_059.0936, 5_197_872.215);

pub fn t0() -> Epoch {
    Epoch::from_str(T0).unwrap()
}

/// i-th epoch of the scenario
pub fn epoch(i: usize) -> Epoch {
    t0() + hifitime::Duration::from_seconds(INTERVAL_S * i as f64)
}

#[derive(Debug, Clone, Copy)]
pub struct SyntheticSat {
    pub sv: SV,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    /// L1 ambiguity (cycles)
    pub n1: i64,
    /// L2 ambiguity (cycles)
    pub n2: i64,
}

impl SyntheticSat {
    pub fn new(prn: u8, elevation_deg: f64, azimuth_deg: f64, n1: i64, n2: i64) -> Self {
        Self {
            sv: SV::new(Constellation::GPS, prn),
            elevation_deg,
            azimuth_deg,
            n1,
            n2,
        }
    }

    pub fn dual(&self) -> DualCarrier {
        Carrier::dual_frequency(self.sv.constellation).unwrap()
    }

    /// Line of sight partial derivatives
    pub fn los(&self) -> (f64, f64, f64) {
        let (el, az) = (self.elevation_deg.to_radians(), self.azimuth_deg.to_radians());
        (-el.cos() * az.sin(), -el.cos() * az.cos(), -el.sin())
    }

    pub fn wet_mapping(&self) -> f64 {
        1.0 / self.elevation_deg.to_radians().sin()
    }

    /// Iono-free ambiguity (m)
    pub fn if_ambiguity_m(&self) -> f64 {
        let dual = self.dual();
        dual.alpha() * dual.lhs.wavelength() * self.n1 as f64
            + dual.beta() * dual.rhs.wavelength() * self.n2 as f64
    }

    /// Wide lane ambiguity (cycles)
    pub fn wide_lane(&self) -> i64 {
        self.n1 - self.n2
    }
}

/// Six GPS satellites above 30°
pub fn gps_sats() -> Vec<SyntheticSat> {
    vec![
        SyntheticSat::new(1, 75.0, 30.0, 10, 7),
        SyntheticSat::new(2, 55.0, 120.0, -4, 3),
        SyntheticSat::new(5, 40.0, 210.0, 22, 15),
        SyntheticSat::new(7, 35.0, 300.0, 5, -2),
        SyntheticSat::new(9, 62.0, 250.0, -12, -9),
        SyntheticSat::new(12, 30.0, 80.0, 7, 7),
    ]
}

#[derive(Debug, Clone)]
pub struct Scenario {
    /// True position offset to the apriori (m)
    pub dx_m: (f64, f64, f64),
    /// True receiver clock offset (m)
    pub clock_m: f64,
    /// True zenith wet delay (m)
    pub tropo_m: f64,
    pub sats: Vec<SyntheticSat>,
}

impl Scenario {
    pub fn new(sats: Vec<SyntheticSat>) -> Self {
        Self {
            dx_m: (1.2, -2.1, 0.6),
            clock_m: 15.0,
            tropo_m: 0.0,
            sats,
        }
    }

    /// Geometric part of the prefit residuals (m)
    fn geometry_m(&self, sat: &SyntheticSat) -> f64 {
        let los = sat.los();
        los.0 * self.dx_m.0
            + los.1 * self.dx_m.1
            + los.2 * self.dx_m.2
            + self.clock_m
            + sat.wet_mapping() * self.tropo_m
    }

    /// Complete observation record of this satellite
    pub fn observation(&self, sat: &SyntheticSat) -> SatelliteObservation {
        let dual = sat.dual();
        let geometry = self.geometry_m(sat);
        let range = 22_000_000.0 + 1_000.0 * sat.sv.prn as f64;

        SatelliteObservation::new(sat.elevation_deg, sat.azimuth_deg)
            .with_los(sat.los())
            .with_wet_mapping(sat.wet_mapping())
            .with_prefit(Observable::IonoFreeCode(dual), geometry)
            .with_prefit(Observable::IonoFreePhase(dual), geometry + sat.if_ambiguity_m())
            .with_raw(
                Observable::Phase(dual.lhs),
                range + dual.lhs.wavelength() * sat.n1 as f64,
            )
            .with_raw(
                Observable::Phase(dual.rhs),
                range + dual.rhs.wavelength() * sat.n2 as f64,
            )
            .with_raw(Observable::Code(dual.lhs), range)
            .with_raw(Observable::Code(dual.rhs), range)
    }

    /// All observations at this epoch
    pub fn epoch_observations(&self, t: Epoch) -> EpochObservations {
        let mut observations = EpochObservations::new(t);
        for sat in self.sats.iter() {
            observations = observations.with_satellite(sat.sv, self.observation(sat));
        }
        observations
    }

    /// Float solution, as if the filter had converged to the truth.
    /// State layout is (dx, dy, dz, clock, ambiguities..).
    pub fn float_solution(&self, t: Epoch) -> FloatSolution {
        let n = 4 + self.sats.len();

        let mut variables = BTreeMap::new();
        variables.insert(VariableKey::new(Parameter::Dx), 0);
        variables.insert(VariableKey::new(Parameter::Dy), 1);
        variables.insert(VariableKey::new(Parameter::Dz), 2);
        variables.insert(
            VariableKey::new(Parameter::ClockOffset(Constellation::GPS)),
            3,
        );

        let mut x = DVector::<f64>::zeros(n);
        x[0] = self.dx_m.0;
        x[1] = self.dx_m.1;
        x[2] = self.dx_m.2;
        x[3] = self.clock_m;

        let mut p = DMatrix::<f64>::zeros(n, n);
        for i in 0..3 {
            p[(i, i)] = 1.0E-2;
        }
        p[(3, 3)] = 1.0;

        let mut residuals = BTreeMap::new();

        for (i, sat) in self.sats.iter().enumerate() {
            let dual = sat.dual();
            let key = VariableKey::new(Parameter::Ambiguity(Observable::IonoFreePhase(dual)))
                .with_sv(sat.sv)
                .with_arc(0);
            variables.insert(key, 4 + i);
            x[4 + i] = sat.if_ambiguity_m();
            p[(4 + i, 4 + i)] = 1.0E-3;
            residuals.insert((sat.sv, Observable::IonoFreePhase(dual)), (0.0, 0.0));
            residuals.insert((sat.sv, Observable::IonoFreeCode(dual)), (0.0, 0.0));
        }

        let (x0, y0, z0) = APRIORI_ECEF_M;

        FloatSolution {
            epoch: t,
            apriori_m: APRIORI_ECEF_M,
            position_m: (x0 + self.dx_m.0, y0 + self.dx_m.1, z0 + self.dx_m.2),
            variables,
            x,
            p,
            residuals,
        }
    }
}
