//! Error taxonomy and lifecycle result codes.
//!
//! All fallible operations return [`OtgError`] through a plain `Result`;
//! the non-error lifecycle of a running trajectory is reported separately
//! as [`UpdateStatus`]. Shape and unit problems are always detected before
//! any heavy computation, and numeric non-convergence inside the solvers
//! escalates to [`OtgError::Infeasible`] rather than degrading silently.

use thiserror::Error;

/// Errors reported by trajectory calculation and the per-cycle update.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OtgError {
    /// Input shape or value problem, detectable before computation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No profile satisfies the limits/target combination.
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The bounded search exceeded the caller's calculation budget.
    ///
    /// The previously valid trajectory (if any) stays installed and the
    /// output is sampled from it, so a caller that ignores the error still
    /// commands a valid — if stale — setpoint.
    #[error("calculation exceeded budget: {elapsed_us}us > {budget_us}us")]
    CalculationTimeout {
        /// Wall-clock time spent before the abort [µs].
        elapsed_us: u64,
        /// Configured budget [µs].
        budget_us: u64,
    },
}

/// Lifecycle state of the current trajectory, returned on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStatus {
    /// A trajectory exists and sampling has not yet reached its duration.
    #[default]
    Working,
    /// The most recent sample is at or beyond the trajectory duration.
    ///
    /// Further updates with an unchanged input keep returning `Finished`
    /// with the final state — idempotent by contract.
    Finished,
}

impl UpdateStatus {
    /// Whether the caller should keep cycling.
    #[inline]
    pub const fn is_working(&self) -> bool {
        matches!(self, Self::Working)
    }
}
