//! Crop window control.
//!
//! Tracked face boxes are turned into a single weighted error vector
//! ([`error`]) which a PI controller with a low-pass filtered derivative
//! term integrates into the crop rectangle ([`pid`]).

/// Per-tracker desired crop and weighted error aggregation
pub mod error;

/// PID controller producing the clamped crop rectangle
pub mod pid;

pub use error::{aggregate_error, desired_crop, tracker_error, Geometry};
pub use pid::{CropController, Gains};
