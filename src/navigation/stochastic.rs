//! Process models, which describe how each unknown evolves between two epochs.
use crate::{observation::SatelliteObservation, prelude::Epoch};

/// Random walk interval (s) used until a time difference is known.
pub const DEFAULT_INTERVAL_S: f64 = 30.0;

/// Lowest elevation (degrees) applied to the ionosphere process noise
const IONO_MIN_ELEVATION_DEG: f64 = 7.0;

/// Below this elevation (degrees), ionosphere process noise is amplified
const IONO_MAPPING_ELEVATION_DEG: f64 = 30.0;

/// Dynamics of one unknown.
///
/// [StochasticModel::prepare] is called exactly once per unknown and per epoch,
/// before its transition (phi) and process noise (q) are read.
pub trait StochasticModel {
    /// Prepare this model for the upcoming epoch.
    /// The satellite record is provided for satellite indexed unknowns.
    fn prepare(&mut self, epoch: Epoch, observation: Option<&SatelliteObservation>);
    /// State transition coefficient
    fn phi(&self) -> f64;
    /// Process noise variance
    fn q(&self) -> f64;
}

/// Unknown that does not change in time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constant;

impl StochasticModel for Constant {
    fn prepare(&mut self, _: Epoch, _: Option<&SatelliteObservation>) {}
    fn phi(&self) -> f64 {
        1.0
    }
    fn q(&self) -> f64 {
        0.0
    }
}

/// Unknown that is re-estimated at every epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteNoise {
    /// Standard deviation
    pub sigma: f64,
}

impl StochasticModel for WhiteNoise {
    fn prepare(&mut self, _: Epoch, _: Option<&SatelliteObservation>) {}
    fn phi(&self) -> f64 {
        0.0
    }
    fn q(&self) -> f64 {
        self.sigma.powi(2)
    }
}

/// Unknown whose variance grows linearly with elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWalk {
    /// Process spectral density (unit²/s)
    pub qprime: f64,
    /// Interval (s) applied when no time has elapsed yet
    pub default_interval_s: f64,
    previous: Option<Epoch>,
    current: Option<Epoch>,
}

impl RandomWalk {
    pub fn new(qprime: f64) -> Self {
        Self {
            qprime,
            default_interval_s: DEFAULT_INTERVAL_S,
            previous: None,
            current: None,
        }
    }

    /// Copies and returns with default interval (s)
    pub fn with_default_interval(&self, interval_s: f64) -> Self {
        let mut s = *self;
        s.default_interval_s = interval_s;
        s
    }

    /// Elapsed time (s) since previous preparation
    fn dt_s(&self) -> f64 {
        let dt_s = match (self.previous, self.current) {
            (Some(previous), Some(current)) => (current - previous).to_seconds().abs(),
            _ => 0.0,
        };
        if dt_s == 0.0 {
            self.default_interval_s
        } else {
            dt_s
        }
    }
}

impl StochasticModel for RandomWalk {
    fn prepare(&mut self, epoch: Epoch, _: Option<&SatelliteObservation>) {
        self.previous = self.current;
        self.current = Some(epoch);
    }
    fn phi(&self) -> f64 {
        1.0
    }
    fn q(&self) -> f64 {
        self.qprime * self.dt_s()
    }
}

/// Slant ionosphere random walk, which gets noisier at low elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonosphereRandomWalk {
    walk: RandomWalk,
    elevation_deg: f64,
}

impl IonosphereRandomWalk {
    pub fn new(qprime: f64) -> Self {
        Self {
            walk: RandomWalk::new(qprime),
            elevation_deg: 90.0,
        }
    }

    /// Copies and returns with default interval (s)
    pub fn with_default_interval(&self, interval_s: f64) -> Self {
        let mut s = *self;
        s.walk = s.walk.with_default_interval(interval_s);
        s
    }
}

impl StochasticModel for IonosphereRandomWalk {
    fn prepare(&mut self, epoch: Epoch, observation: Option<&SatelliteObservation>) {
        self.walk.prepare(epoch, observation);
        if let Some(observation) = observation {
            self.elevation_deg = observation.elevation_deg.max(IONO_MIN_ELEVATION_DEG);
        }
    }
    fn phi(&self) -> f64 {
        1.0
    }
    fn q(&self) -> f64 {
        let q = self.walk.q();
        if self.elevation_deg < IONO_MAPPING_ELEVATION_DEG {
            q / 2.0 / self.elevation_deg.to_radians().sin()
        } else {
            q
        }
    }
}

/// Phase ambiguity: constant, until a cycle slip is flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseAmbiguity {
    /// Standard deviation applied on cycle slip
    pub sigma: f64,
    cycle_slip: bool,
}

impl PhaseAmbiguity {
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            cycle_slip: false,
        }
    }

    /// Flag (or clear) a cycle slip
    pub fn set_cs(&mut self, cycle_slip: bool) {
        self.cycle_slip = cycle_slip;
    }

    /// True if a cycle slip is currently flagged
    pub fn cs(&self) -> bool {
        self.cycle_slip
    }
}

impl StochasticModel for PhaseAmbiguity {
    fn prepare(&mut self, _: Epoch, observation: Option<&SatelliteObservation>) {
        if let Some(observation) = observation {
            self.cycle_slip = observation.cycle_slip;
        }
    }
    fn phi(&self) -> f64 {
        if self.cycle_slip {
            0.0
        } else {
            1.0
        }
    }
    fn q(&self) -> f64 {
        if self.cycle_slip {
            self.sigma.powi(2)
        } else {
            0.0
        }
    }
}

/// [ProcessModel] attached to each unknown.
/// Every unknown owns its own instance, so time is tracked per unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessModel {
    Constant(Constant),
    WhiteNoise(WhiteNoise),
    RandomWalk(RandomWalk),
    Ionosphere(IonosphereRandomWalk),
    PhaseAmbiguity(PhaseAmbiguity),
}

impl ProcessModel {
    pub fn constant() -> Self {
        Self::Constant(Constant)
    }

    pub fn white_noise(sigma: f64) -> Self {
        Self::WhiteNoise(WhiteNoise { sigma })
    }

    pub fn random_walk(qprime: f64, default_interval_s: f64) -> Self {
        Self::RandomWalk(RandomWalk::new(qprime).with_default_interval(default_interval_s))
    }

    pub fn ionosphere(qprime: f64, default_interval_s: f64) -> Self {
        Self::Ionosphere(IonosphereRandomWalk::new(qprime).with_default_interval(default_interval_s))
    }

    pub fn phase_ambiguity(sigma: f64) -> Self {
        Self::PhaseAmbiguity(PhaseAmbiguity::new(sigma))
    }

    fn as_model(&self) -> &dyn StochasticModel {
        match self {
            Self::Constant(m) => m,
            Self::WhiteNoise(m) => m,
            Self::RandomWalk(m) => m,
            Self::Ionosphere(m) => m,
            Self::PhaseAmbiguity(m) => m,
        }
    }

    fn as_model_mut(&mut self) -> &mut dyn StochasticModel {
        match self {
            Self::Constant(m) => m,
            Self::WhiteNoise(m) => m,
            Self::RandomWalk(m) => m,
            Self::Ionosphere(m) => m,
            Self::PhaseAmbiguity(m) => m,
        }
    }
}

impl StochasticModel for ProcessModel {
    fn prepare(&mut self, epoch: Epoch, observation: Option<&SatelliteObservation>) {
        self.as_model_mut().prepare(epoch, observation);
    }
    fn phi(&self) -> f64 {
        self.as_model().phi()
    }
    fn q(&self) -> f64 {
        self.as_model().q()
    }
}
