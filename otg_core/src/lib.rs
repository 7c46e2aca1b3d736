//! # otg_core
//!
//! On-the-fly trajectory generation for multi-axis motion systems:
//! time-optimal, jerk-limited S-curve profiles recomputed incrementally
//! every control cycle.
//!
//! ## Architecture
//!
//! 1. **Per-axis solver** (`solver`) — closed-form minimum-time and
//!    fixed-duration profiles under velocity/acceleration/jerk caps.
//! 2. **Duration synchronization** (`sync`) — a common section duration
//!    all axes can honor, across four synchronization modes.
//! 3. **Waypoint chaining** (`waypoints`) — N intermediate positions
//!    decomposed into N+1 synchronized sections with free pass-through
//!    states.
//! 4. **Trajectory** (`trajectory`) — the immutable, queryable result.
//! 5. **Online loop** (`generator`, `tracker`) — per-cycle replanning with
//!    explicit caller-driven feedback and a cooperative calculation
//!    budget.
//!
//! ## Per-cycle contract
//!
//! ```rust
//! use otg_core::prelude::*;
//!
//! let mut otg = TrajectoryGenerator::new(3, 0.01);
//! let mut input = InputParameter::new(3);
//! let mut output = OutputParameter::new(3);
//!
//! input.target_position = vec![1.0, -2.0, 0.5];
//! input.max_velocity = vec![3.0, 1.0, 3.0];
//! input.max_acceleration = vec![3.0, 2.0, 1.0];
//! input.max_jerk = vec![4.0, 3.0, 2.0];
//!
//! while otg.update(&input, &mut output)? == UpdateStatus::Working {
//!     // Command output.new_position / new_velocity / new_acceleration,
//!     // then feed the sample back (or substitute sensor data).
//!     output.pass_to_input(&mut input);
//! }
//! # Ok::<(), OtgError>(())
//! ```
//!
//! Instances hold private mutable state (the working trajectory and its
//! bookkeeping) and are single-threaded by contract; distinct instances
//! are fully independent.

pub mod block;
pub mod config;
pub mod error;
pub mod generator;
pub mod input;
pub mod kinematics;
pub mod limits;
pub mod output;
pub mod prelude;
pub mod profile;
pub mod solver;
pub mod sync;
pub mod tracker;
pub mod trajectory;
pub mod waypoints;

pub use config::{ConfigError, ConfigLoader, OtgConfig};
pub use error::{OtgError, UpdateStatus};
pub use generator::TrajectoryGenerator;
pub use input::InputParameter;
pub use kinematics::{ControlInterface, KinematicState, Synchronization, TargetState};
pub use limits::Limits;
pub use output::{OutputParameter, RecomputeFlags};
pub use tracker::TargetTracker;
pub use trajectory::{Section, Trajectory, advance};
