//! Error types for the face tracker library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Host frame uses a pixel layout the converter does not handle
    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    /// A job was signalled while the worker still had one in flight
    #[error("Worker {0} is busy")]
    WorkerBusy(String),

    /// The worker thread is gone (stopped or panicked)
    #[error("Worker {0} disconnected")]
    WorkerDisconnected(String),

    /// Face detection pass failed
    #[error("Detector error: {0}")]
    Detector(String),

    /// Single-object tracking pass failed
    #[error("Tracker error: {0}")]
    Tracker(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
