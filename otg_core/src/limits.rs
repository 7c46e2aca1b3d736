//! Per-axis kinematic limits with optional asymmetric and positional bounds.

use serde::{Deserialize, Serialize};

use crate::error::OtgError;

/// Kinematic bounds for one axis.
///
/// The `min_*` bounds default to the negated `max_*` values; set them
/// explicitly for asymmetric behavior (e.g. gravity-loaded axes).
/// `max_jerk = f64::INFINITY` disables jerk limiting for the axis, which
/// degenerates profiles to trapezoidal velocity with discontinuous
/// acceleration across phase boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum velocity [user units/s], > 0.
    pub max_velocity: f64,
    /// Minimum velocity [user units/s], < 0.
    pub min_velocity: f64,
    /// Maximum acceleration [user units/s²], > 0.
    pub max_acceleration: f64,
    /// Minimum acceleration [user units/s²], < 0.
    pub min_acceleration: f64,
    /// Maximum jerk magnitude [user units/s³], > 0 or infinite.
    pub max_jerk: f64,
    /// Lower position bound [user units], optional.
    pub min_position: Option<f64>,
    /// Upper position bound [user units], optional.
    pub max_position: Option<f64>,
}

impl Limits {
    /// Symmetric limits from the three magnitude caps.
    pub fn symmetric(max_velocity: f64, max_acceleration: f64, max_jerk: f64) -> Self {
        Self {
            max_velocity,
            min_velocity: -max_velocity,
            max_acceleration,
            min_acceleration: -max_acceleration,
            max_jerk,
            min_position: None,
            max_position: None,
        }
    }

    /// Whether jerk limiting is active for this axis.
    #[inline]
    pub fn has_finite_jerk(&self) -> bool {
        self.max_jerk.is_finite()
    }

    /// Validate sign conventions and bound ordering.
    pub fn validate(&self, axis: usize) -> Result<(), OtgError> {
        let fail = |what: &str| {
            Err(OtgError::InvalidInput(format!(
                "axis {axis}: {what}"
            )))
        };

        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return fail("max_velocity must be finite and > 0");
        }
        if !(self.min_velocity.is_finite() && self.min_velocity < 0.0) {
            return fail("min_velocity must be finite and < 0");
        }
        if !(self.max_acceleration.is_finite() && self.max_acceleration > 0.0) {
            return fail("max_acceleration must be finite and > 0");
        }
        if !(self.min_acceleration.is_finite() && self.min_acceleration < 0.0) {
            return fail("min_acceleration must be finite and < 0");
        }
        if self.max_jerk <= 0.0 || self.max_jerk.is_nan() {
            return fail("max_jerk must be > 0 (infinity disables jerk limiting)");
        }
        // Infinite position bounds are allowed (no bound on that side);
        // only NaN and inverted intervals are rejected.
        if let Some(lo) = self.min_position {
            if lo.is_nan() {
                return fail("min_position must not be NaN");
            }
        }
        if let Some(hi) = self.max_position {
            if hi.is_nan() {
                return fail("max_position must not be NaN");
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_position, self.max_position) {
            if lo > hi {
                return fail("min_position > max_position");
            }
        }
        Ok(())
    }

    /// Whether `position` lies inside the (optional) positional bounds,
    /// widened by `tol`.
    #[inline]
    pub fn position_in_bounds(&self, position: f64, tol: f64) -> bool {
        if let Some(lo) = self.min_position {
            if position < lo - tol {
                return false;
            }
        }
        if let Some(hi) = self.max_position {
            if position > hi + tol {
                return false;
            }
        }
        true
    }
}
