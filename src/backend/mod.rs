//! Detector, tracker and frame source implementations.

/// Deterministic collaborators for tests, benches and simulation
pub mod scripted;

/// `OpenCV` Haar cascade detector, KCF tracker and capture source
#[cfg(feature = "opencv")]
pub mod cv;
