mod equation;
mod equsys;
mod kalman;
mod layout;
mod ppp;
mod stochastic;
mod variable;

pub mod ppp_ar;

pub use equation::{Coefficient, Equation, EquationTemplate, VariableTemplate};
pub use equsys::{EquationSystem, PreparedSystem};
pub use kalman::{Kalman, KfEstimate};
pub use layout::equation_templates;
pub use ppp::PPPSolver;
pub use stochastic::{
    Constant, IonosphereRandomWalk, PhaseAmbiguity, ProcessModel, RandomWalk, StochasticModel,
    WhiteNoise, DEFAULT_INTERVAL_S,
};
pub use variable::{IdSequence, Parameter, SourceId, Variable, VariableKey};
