#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core convergence logic for a 32-channel bimorph mirror (hardware-agnostic).
//!
//! All hardware interaction goes through `bimorph_traits::BimorphDevice`, and
//! every wait runs on an injected `bimorph_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Topology**: which channels are adjacent (`topology`)
//! - **Safety**: the adjacency predicate and invariant audit (`constraint`)
//! - **Planning**: intermediate steps when a direct move is unsafe (`planner`)
//! - **Arm / ramp**: confirmed writes and the array-wide ramp (`arm`, `ramp`)
//! - **Convergence**: the `BimorphMove` state machine (`machine`) and its
//!   blocking driver (`runner`)
//! - **Entry points**: `BimorphController` (`builder`) and the scan-step hook
//!   (`step_hook`)
//!
//! ## Safety invariant
//!
//! After every committed write and at rest, no channel's setpoint is further
//! than `max_distance` from the current or armed voltage of itself or any
//! neighbor. Halting at any point is therefore always safe.

pub mod arm;
pub mod builder;
pub mod config;
pub mod constraint;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod machine;
pub mod mocks;
pub mod planner;
pub mod ramp;
pub mod request;
pub mod runner;
pub mod status;
pub mod step_hook;
pub mod topology;
pub mod util;

pub use arm::{ArmOutcome, arm_channel};
pub use builder::{BimorphController, BimorphControllerBuilder};
pub use config::{MotionCfg, MoveSettings, SafetyCfg, Timeouts};
pub use constraint::is_safe;
pub use error::{BimorphError, BuildError, Report, Result};
pub use machine::BimorphMove;
pub use planner::plan_step;
pub use ramp::ramp_and_wait;
pub use request::{Assignment, MoveRequest};
pub use runner::arm_and_ramp;
pub use status::{MoveReport, MoveStatus, Suspension};
pub use step_hook::{PositionCache, ReadSet, one_bimorph_step, one_bimorph_step_until};
pub use topology::{Group, neighbors};
