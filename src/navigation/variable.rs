//! Filter unknowns
use crate::{
    carrier::Carrier,
    navigation::stochastic::ProcessModel,
    observation::Observable,
    prelude::{Constellation, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical nature of an unknown.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parameter {
    /// ECEF X correction to the apriori position (m)
    Dx,
    /// ECEF Y correction to the apriori position (m)
    Dy,
    /// ECEF Z correction to the apriori position (m)
    Dz,
    /// Receiver clock offset of this system (m)
    ClockOffset(Constellation),
    /// Zenith wet troposphere delay (m)
    WetTropo,
    /// Slant ionosphere delay, referred to this carrier (m)
    SlantIono(Carrier),
    /// Receiver code inter frequency bias (m)
    InterFrequencyBias(Constellation, Carrier),
    /// Receiver clock offset of this system, relative to the reference system clock (m)
    InterSystemBias(Constellation),
    /// Phase ambiguity, expressed in meters
    Ambiguity(Observable),
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Dx => write!(f, "dx"),
            Self::Dy => write!(f, "dy"),
            Self::Dz => write!(f, "dz"),
            Self::ClockOffset(c) => write!(f, "clk({})", c),
            Self::WetTropo => write!(f, "tropo"),
            Self::SlantIono(carrier) => write!(f, "iono({})", carrier),
            Self::InterFrequencyBias(c, carrier) => write!(f, "ifb({}, {})", c, carrier),
            Self::InterSystemBias(c) => write!(f, "isb({})", c),
            Self::Ambiguity(obs) => write!(f, "amb({})", obs),
        }
    }
}

/// Identifies the receiver an unknown belongs to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(pub u16);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "rx{}", self.0)
    }
}

/// Identity of a [Variable]. Two variables with the same key are the same unknown,
/// wherever and whenever they were created.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableKey {
    pub parameter: Parameter,
    pub source: Option<SourceId>,
    pub sv: Option<SV>,
    /// Continuous tracking arc, only defined for arc indexed unknowns
    pub arc: Option<u32>,
}

impl std::fmt::Display for VariableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.parameter)?;
        if let Some(source) = self.source {
            write!(f, "[{}]", source)?;
        }
        if let Some(sv) = self.sv {
            write!(f, "[{}]", sv)?;
        }
        if let Some(arc) = self.arc {
            write!(f, "#{}", arc)?;
        }
        Ok(())
    }
}

impl VariableKey {
    /// Receiver level unknown
    pub fn new(parameter: Parameter) -> Self {
        Self {
            parameter,
            source: Some(SourceId::default()),
            sv: None,
            arc: None,
        }
    }

    /// Copies and returns with [SV] index
    pub fn with_sv(&self, sv: SV) -> Self {
        let mut s = *self;
        s.sv = Some(sv);
        s
    }

    /// Copies and returns with tracking arc index
    pub fn with_arc(&self, arc: u32) -> Self {
        let mut s = *self;
        s.arc = Some(arc);
        s
    }

    /// Copies and returns without source index
    pub fn without_source(&self) -> Self {
        let mut s = *self;
        s.source = None;
        s
    }

    /// True if this is an ambiguity unknown
    pub fn is_ambiguity(&self) -> bool {
        matches!(self.parameter, Parameter::Ambiguity(_))
    }
}

/// Hands out unique [Variable] identifiers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Next identifier in sequence, counted from `next`.
    pub(crate) fn issue(next: &mut u64) -> u64 {
        let id = *next;
        *next += 1;
        id
    }

    /// Next identifier to be issued
    pub fn peek(&self) -> u64 {
        self.next
    }

    pub(crate) fn advance_to(&mut self, next: u64) {
        self.next = self.next.max(next);
    }
}

/// Unknown of the current equation system
#[derive(Debug, Clone)]
pub struct Variable {
    /// Unique identifier, stable for the lifetime of this unknown
    pub id: u64,
    pub key: VariableKey,
    /// Slot in the current state vector
    pub now_index: usize,
    /// Slot in the previously committed state vector, if this
    /// unknown was already estimated.
    pub pre_index: Option<usize>,
    /// Variance of this unknown when it is born
    pub initial_variance: f64,
    /// Dynamics of this unknown
    pub model: ProcessModel,
}

impl Variable {
    /// True if this unknown is born at the current epoch.
    pub fn is_new(&self) -> bool {
        self.pre_index.is_none()
    }
}
