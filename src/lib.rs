#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod averager;
mod carrier;
mod cfg;
mod constants;
mod error;
mod observation;
mod solutions;

pub mod navigation;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::carrier::{Carrier, DualCarrier};
    pub use crate::cfg::{
        AmbiguityFixMode, AmbiguityOpts, Config, IonosphereMode, MeasurementSigma, Profile,
        SolverOpts,
    };
    pub use crate::constants::SPEED_OF_LIGHT_M_S;
    pub use crate::error::{Error, ErrorKind};
    pub use crate::navigation::{
        ppp_ar::{
            AmbiguitySolver, NarrowLaneFix, NoUpd, SatPair, UpdError, UpdKind, UpdProvider,
            UpdSign, UpdTable, WideLaneFix,
        },
        PPPSolver, Parameter, VariableKey,
    };
    pub use crate::observation::{EpochObservations, Observable, SatelliteObservation};
    pub use crate::solutions::{ArOutcome, EpochSnapshot, FixedSolution, FloatSolution, NoFixReason};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
}

// pub export
pub use error::Error;
