use thiserror::Error;

use crate::{
    navigation::{ppp_ar::UpdError, VariableKey},
    prelude::Epoch,
};

/// Coarse classification of [Error]s, which tells the caller
/// how to react to them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Singular or ill conditioned system: the current epoch is lost,
    /// the filter remains in its last committed state.
    Numerical,
    /// Some external product is missing. Processing stages absorb these
    /// and simply exclude the concerned satellite.
    DataAvailability,
    /// Internal inconsistency or invalid usage: this is a bug or a bad setup,
    /// not a runtime condition.
    Configuration,
}

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// Not enough usable equations were formed for this epoch (degenerate geometry).
    #[error("not enough equations: {found} formed, {required} required")]
    NotEnoughEquations { found: usize, required: usize },

    /// Invalid input or degenerate geometry will cause the algebric
    /// calculations to wind up here.
    #[error("failed to invert matrix")]
    MatrixInversion,

    #[error("internal error: invalid matrix setup")]
    MatrixDimension,

    /// An equation refers to a variable that does not exist in the current set.
    #[error("equation refers to unknown variable {0}")]
    UnknownVariable(VariableKey),

    /// Epochs must be processed in chronological order.
    #[error("{0}: epoch is not posterior to previous epoch")]
    NonIncreasingEpoch(Epoch),

    /// Ambiguity covariance is not positive definite
    #[error("ambiguity factorization error")]
    AmbiguityFactorization,

    /// Integer search did not complete within the iteration limit
    #[error("ambiguity search exceeded iteration limit")]
    AmbiguitySearch,

    /// Matrix inversion error during ambiguity solving process
    #[error("ambiguity inverse error")]
    AmbiguityInverse,

    #[error("upd product: {0}")]
    Upd(#[from] UpdError),

    #[error("unknown carrier")]
    UnknownCarrier,

    #[error("unknown ionosphere mode")]
    UnknownIonosphereMode,

    #[error("unknown ambiguity fix mode")]
    UnknownAmbiguityFixMode,

    #[error("invalid user profile")]
    InvalidUserProfile,
}

impl Error {
    /// Returns the [ErrorKind] of this [Error].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotEnoughEquations { .. }
            | Self::MatrixInversion
            | Self::AmbiguityFactorization
            | Self::AmbiguitySearch
            | Self::AmbiguityInverse => ErrorKind::Numerical,
            Self::Upd(_) => ErrorKind::DataAvailability,
            Self::MatrixDimension
            | Self::UnknownVariable(_)
            | Self::NonIncreasingEpoch(_)
            | Self::UnknownCarrier
            | Self::UnknownIonosphereMode
            | Self::UnknownAmbiguityFixMode
            | Self::InvalidUserProfile => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Error, ErrorKind};
    use crate::{
        navigation::ppp_ar::{UpdError, UpdKind},
        prelude::{Constellation, Epoch, SV},
    };
    use std::str::FromStr;

    #[test]
    fn error_kinds() {
        let t = Epoch::from_str("2020-06-25T00:00:00 GPST").unwrap();
        let sv = SV::new(Constellation::GPS, 1);

        assert_eq!(Error::MatrixInversion.kind(), ErrorKind::Numerical);
        assert_eq!(
            Error::NotEnoughEquations {
                found: 2,
                required: 4
            }
            .kind(),
            ErrorKind::Numerical
        );
        assert_eq!(Error::NonIncreasingEpoch(t).kind(), ErrorKind::Configuration);

        let upd: Error = UpdError::NotAvailable(sv, UpdKind::NarrowLane, t).into();
        assert_eq!(upd.kind(), ErrorKind::DataAvailability);
        assert!(upd.to_string().contains("NL upd not available"));
    }
}
