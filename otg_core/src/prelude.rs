//! Common re-exports for convenience.
//!
//! ```rust
//! use otg_core::prelude::*;
//! ```

pub use crate::config::{ConfigLoader, OtgConfig};
pub use crate::error::{OtgError, UpdateStatus};
pub use crate::generator::TrajectoryGenerator;
pub use crate::input::InputParameter;
pub use crate::kinematics::{ControlInterface, KinematicState, Synchronization, TargetState};
pub use crate::limits::Limits;
pub use crate::output::{OutputParameter, RecomputeFlags};
pub use crate::tracker::TargetTracker;
pub use crate::trajectory::{Trajectory, advance};
