//! Tagging of degenerate results.
//!
//! Functions that can meet a mathematically degenerate input (no variance,
//! a singular design matrix, no residual degrees of freedom) still return a
//! neutral value so the caller has something to display, but wrap it in
//! [`Outcome::Degenerate`] together with the reason. Contract violations are
//! reported separately through [`crate::error::Error`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a computation fell back to a neutral result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Degeneracy {
    /// The error or within-group variance is zero.
    ZeroVariance,
    /// A degrees-of-freedom term is zero or negative.
    InsufficientDegreesOfFreedom,
    /// Too few observations to estimate a variance.
    InsufficientData,
    /// The design matrix cannot be inverted.
    SingularMatrix,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Degeneracy::ZeroVariance => "zero variance",
            Degeneracy::InsufficientDegreesOfFreedom => "insufficient degrees of freedom",
            Degeneracy::InsufficientData => "insufficient data",
            Degeneracy::SingularMatrix => "singular design matrix",
        };
        f.write_str(text)
    }
}

/// A computed value, or the neutral value that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome<T> {
    Computed(T),
    Degenerate(T, Degeneracy),
}

impl<T> Outcome<T> {
    /// Builds a degenerate outcome and logs the fallback.
    pub(crate) fn degenerate(value: T, reason: Degeneracy, context: &str) -> Self {
        log::debug!("{}: falling back to neutral result ({})", context, reason);
        Outcome::Degenerate(value, reason)
    }

    /// The carried value, whether computed or neutral.
    pub fn value(&self) -> &T {
        match self {
            Outcome::Computed(v) | Outcome::Degenerate(v, _) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Computed(v) | Outcome::Degenerate(v, _) => v,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Outcome::Degenerate(..))
    }

    pub fn degeneracy(&self) -> Option<Degeneracy> {
        match self {
            Outcome::Computed(_) => None,
            Outcome::Degenerate(_, reason) => Some(*reason),
        }
    }

    /// The value only if it was actually computed.
    pub fn computed(self) -> Option<T> {
        match self {
            Outcome::Computed(v) => Some(v),
            Outcome::Degenerate(..) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Computed(v) => Outcome::Computed(f(v)),
            Outcome::Degenerate(v, reason) => Outcome::Degenerate(f(v), reason),
        }
    }
}
