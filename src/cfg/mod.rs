use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::Constellation;

mod method;
mod profile;

pub use method::{AmbiguityFixMode, IonosphereMode};
pub use profile::Profile;

const fn default_phase_sigma() -> f64 {
    0.003
}

const fn default_code_ratio() -> f64 {
    100.0
}

const fn default_min_equations() -> usize {
    4
}

const fn default_store_epochs() -> bool {
    false
}

const fn default_combination_noise() -> bool {
    true
}

const fn default_interval_s() -> f64 {
    30.0
}

const fn default_kinematic_sigma() -> f64 {
    60.0
}

const fn default_clock_sigma() -> f64 {
    60.0
}

const fn default_tropo_qprime() -> f64 {
    1.0E-8
}

const fn default_iono_qprime() -> f64 {
    4.0E-2
}

const fn default_ifb_qprime() -> f64 {
    1.0E-8
}

const fn default_inter_system_bias() -> bool {
    false
}

const fn default_isb_qprime() -> f64 {
    1.0E-7
}

const fn default_ambiguity_sigma() -> f64 {
    2.0E4
}

const fn default_max_position_variance() -> f64 {
    0.5
}

const fn default_min_elevation() -> f64 {
    15.0
}

const fn default_min_satellites() -> usize {
    4
}

const fn default_max_reference_residual() -> f64 {
    0.01
}

const fn default_wl_max_residual() -> f64 {
    0.25
}

const fn default_wl_min_confidence() -> f64 {
    0.99
}

const fn default_nl_max_residual() -> f64 {
    0.25
}

const fn default_max_pair_residual_delta() -> f64 {
    0.005
}

const fn default_ratio_threshold() -> f64 {
    2.0
}

const fn default_adop_base() -> f64 {
    0.14
}

const fn default_use_upd() -> bool {
    true
}

fn default_constellations() -> Vec<Constellation> {
    vec![
        Constellation::GPS,
        Constellation::Galileo,
        Constellation::BeiDou,
    ]
}

/// Measurement noise of one [Constellation]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementSigma {
    /// Phase measurement sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_phase_sigma"))]
    pub phase_m: f64,
    /// Code to phase noise ratio
    #[cfg_attr(feature = "serde", serde(default = "default_code_ratio"))]
    pub code_ratio: f64,
}

impl Default for MeasurementSigma {
    fn default() -> Self {
        Self {
            phase_m: default_phase_sigma(),
            code_ratio: default_code_ratio(),
        }
    }
}

impl MeasurementSigma {
    /// Code equation weight (1/σ²)
    pub fn code_weight(&self) -> f64 {
        (1.0 / (self.phase_m * self.code_ratio)).powi(2)
    }

    /// Phase equation weight (1/σ²)
    pub fn phase_weight(&self) -> f64 {
        (1.0 / self.phase_m).powi(2)
    }
}

/// Float filter customization
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOpts {
    /// Minimal number of equations to attempt a measurement update.
    #[cfg_attr(feature = "serde", serde(default = "default_min_equations"))]
    pub min_equations: usize,
    /// Store observations, state and covariance of every epoch,
    /// for later backward processing.
    #[cfg_attr(feature = "serde", serde(default = "default_store_epochs"))]
    pub store_epochs: bool,
    /// Deflate the weight of iono-free combinations by their noise amplification factor.
    #[cfg_attr(feature = "serde", serde(default = "default_combination_noise"))]
    pub combination_noise: bool,
    /// Random walk interval (s) used when no time has elapsed yet.
    #[cfg_attr(feature = "serde", serde(default = "default_interval_s"))]
    pub default_interval_s: f64,
    /// Position white noise sigma (m), in kinematic profile.
    #[cfg_attr(feature = "serde", serde(default = "default_kinematic_sigma"))]
    pub kinematic_sigma_m: f64,
    /// Receiver clock white noise sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_clock_sigma"))]
    pub clock_sigma_m: f64,
    /// Wet troposphere random walk spectral density (m²/s)
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_qprime"))]
    pub tropo_qprime: f64,
    /// Slant ionosphere random walk spectral density (m²/s)
    #[cfg_attr(feature = "serde", serde(default = "default_iono_qprime"))]
    pub iono_qprime: f64,
    /// Inter frequency bias random walk spectral density (m²/s)
    #[cfg_attr(feature = "serde", serde(default = "default_ifb_qprime"))]
    pub ifb_qprime: f64,
    /// Estimate a single receiver clock, referred to the first constellation,
    /// and one inter system bias per other constellation. Otherwise, each
    /// constellation gets its own clock offset.
    #[cfg_attr(feature = "serde", serde(default = "default_inter_system_bias"))]
    pub inter_system_bias: bool,
    /// Inter system bias random walk spectral density (m²/s)
    #[cfg_attr(feature = "serde", serde(default = "default_isb_qprime"))]
    pub isb_qprime: f64,
    /// Phase ambiguity sigma (m), applied on cycle slips.
    #[cfg_attr(feature = "serde", serde(default = "default_ambiguity_sigma"))]
    pub ambiguity_sigma_m: f64,
}

impl Default for SolverOpts {
    fn default() -> Self {
        Self {
            min_equations: default_min_equations(),
            store_epochs: default_store_epochs(),
            combination_noise: default_combination_noise(),
            default_interval_s: default_interval_s(),
            kinematic_sigma_m: default_kinematic_sigma(),
            clock_sigma_m: default_clock_sigma(),
            tropo_qprime: default_tropo_qprime(),
            iono_qprime: default_iono_qprime(),
            ifb_qprime: default_ifb_qprime(),
            inter_system_bias: default_inter_system_bias(),
            isb_qprime: default_isb_qprime(),
            ambiguity_sigma_m: default_ambiguity_sigma(),
        }
    }
}

/// Ambiguity resolution customization
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AmbiguityOpts {
    /// Narrow lane [AmbiguityFixMode]
    #[cfg_attr(feature = "serde", serde(default))]
    pub fix_mode: AmbiguityFixMode,
    /// Apply satellite UPD corrections
    #[cfg_attr(feature = "serde", serde(default = "default_use_upd"))]
    pub use_upd: bool,
    /// Do not attempt to fix while the float position variance norm (m²)
    /// remains above this value.
    #[cfg_attr(feature = "serde", serde(default = "default_max_position_variance"))]
    pub max_position_variance: f64,
    /// Elevation mask (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_min_elevation"))]
    pub min_elevation_deg: f64,
    /// Minimal number of satellites to attempt a fix.
    #[cfg_attr(feature = "serde", serde(default = "default_min_satellites"))]
    pub min_satellites: usize,
    /// Expected MW sampling interval (s): larger gaps reset the smoothing.
    #[cfg_attr(feature = "serde", serde(default = "default_interval_s"))]
    pub sampling_interval_s: f64,
    /// Maximal postfit residual (m) of a reference satellite
    #[cfg_attr(feature = "serde", serde(default = "default_max_reference_residual"))]
    pub max_reference_residual: f64,
    /// Maximal wide lane rounding residual (cycles)
    #[cfg_attr(feature = "serde", serde(default = "default_wl_max_residual"))]
    pub wl_max_residual: f64,
    /// Minimal wide lane bootstrapping confidence
    #[cfg_attr(feature = "serde", serde(default = "default_wl_min_confidence"))]
    pub wl_min_confidence: f64,
    /// Maximal narrow lane rounding residual (cycles)
    #[cfg_attr(feature = "serde", serde(default = "default_nl_max_residual"))]
    pub nl_max_residual: f64,
    /// Maximal postfit residual difference (m) within a satellite pair
    #[cfg_attr(feature = "serde", serde(default = "default_max_pair_residual_delta"))]
    pub max_pair_residual_delta: f64,
    /// Minimal LAMBDA ratio
    #[cfg_attr(feature = "serde", serde(default = "default_ratio_threshold"))]
    pub ratio_threshold: f64,
    /// ADOP bound of the partial search, per ambiguity
    #[cfg_attr(feature = "serde", serde(default = "default_adop_base"))]
    pub adop_base: f64,
}

impl Default for AmbiguityOpts {
    fn default() -> Self {
        Self {
            fix_mode: AmbiguityFixMode::default(),
            use_upd: default_use_upd(),
            max_position_variance: default_max_position_variance(),
            min_elevation_deg: default_min_elevation(),
            min_satellites: default_min_satellites(),
            sampling_interval_s: default_interval_s(),
            max_reference_residual: default_max_reference_residual(),
            wl_max_residual: default_wl_max_residual(),
            wl_min_confidence: default_wl_min_confidence(),
            nl_max_residual: default_nl_max_residual(),
            max_pair_residual_delta: default_max_pair_residual_delta(),
            ratio_threshold: default_ratio_threshold(),
            adop_base: default_adop_base(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// [Profile] defines the type of application.
    #[cfg_attr(feature = "serde", serde(default))]
    pub profile: Profile,
    /// [IonosphereMode] defines the observables in use.
    #[cfg_attr(feature = "serde", serde(default))]
    pub iono_mode: IonosphereMode,
    /// Only use pseudo range observations.
    #[cfg_attr(feature = "serde", serde(default))]
    pub code_only: bool,
    /// Constellations to process
    #[cfg_attr(feature = "serde", serde(default = "default_constellations"))]
    pub constellations: Vec<Constellation>,
    /// Measurement noise per [Constellation]. Unlisted constellations
    /// use the default [MeasurementSigma].
    #[cfg_attr(feature = "serde", serde(default))]
    pub sigmas: HashMap<Constellation, MeasurementSigma>,
    /// Float filter customization
    #[cfg_attr(feature = "serde", serde(default))]
    pub solver: SolverOpts,
    /// Ambiguity resolution customization
    #[cfg_attr(feature = "serde", serde(default))]
    pub ambiguity: AmbiguityOpts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            iono_mode: IonosphereMode::default(),
            code_only: false,
            constellations: default_constellations(),
            sigmas: HashMap::new(),
            solver: SolverOpts::default(),
            ambiguity: AmbiguityOpts::default(),
        }
    }
}

impl Config {
    /// Returns [Config] for static PPP-AR positioning, with desired [AmbiguityFixMode].
    /// You can then customize [Self] as you will.
    pub fn static_preset(fix_mode: AmbiguityFixMode) -> Self {
        let mut s = Self::default();
        s.profile = Profile::Static;
        s.iono_mode = IonosphereMode::IF12;
        s.ambiguity.fix_mode = fix_mode;
        s
    }

    /// Returns [Config] for kinematic PPP-AR positioning, with desired [AmbiguityFixMode].
    /// You can then customize [Self] as you will.
    pub fn kinematic_preset(fix_mode: AmbiguityFixMode) -> Self {
        let mut s = Self::static_preset(fix_mode);
        s.profile = Profile::Kinematic;
        s
    }

    /// [MeasurementSigma] to apply to this [Constellation]
    pub fn sigma(&self, constellation: Constellation) -> MeasurementSigma {
        self.sigmas
            .get(&constellation)
            .copied()
            .unwrap_or_default()
    }
}
