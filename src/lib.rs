//! Face tracking crop filter.
//!
//! Keeps a crop window of a video stream centred on a face by combining a
//! slow, periodic face detector with a pool of fast single-object trackers,
//! then smoothing the result with a PID controller:
//!
//! 1. Every few seconds a frame is handed to the detector
//! 2. The best detection seeds a new tracker, which follows the face on
//!    every frame
//! 3. Each detection pass attenuates trackers it does not corroborate and
//!    retires redundant or weak ones
//! 4. The surviving trackers' desired crops are averaged by confidence and
//!    integrated into a clamped crop rectangle
//!
//! Detector and trackers run on worker threads that the per-tick logic only
//! polls, so a slow worker never stalls a frame.
//!
//! # Examples
//!
//! ```
//! use face_tracker::{
//!     backend::scripted::{BlankSource, ScriptedDetector, ScriptedTracker},
//!     detector::inline_detector,
//!     pool::TrackerFactory,
//!     tracker::inline_tracker,
//!     Config, FaceTrackerFilter, Rect,
//! };
//!
//! # fn main() -> face_tracker::Result<()> {
//! let face = Rect::new(500, 200, 700, 500, 1.0);
//! let detector = inline_detector(Box::new(ScriptedDetector::repeating(vec![face])));
//! let factory: TrackerFactory = Box::new(|| Ok(inline_tracker(Box::new(ScriptedTracker::new(1.0)))));
//! let mut filter = FaceTrackerFilter::new(&Config::default(), detector, factory)?;
//!
//! let mut source = BlankSource::new(1280, 720);
//! for _ in 0..30 {
//!     filter.tick(1.0 / 30.0, &mut source);
//! }
//! assert!(filter.crop().width() < 1280);
//! # Ok(())
//! # }
//! ```

/// Collaborator implementations (scripted, `OpenCV`)
pub mod backend;

/// Configuration management
pub mod config;

/// Tuning constants
pub mod constants;

/// Crop error aggregation and PID control
pub mod control;

/// Per-tick coordination
pub mod coordinator;

/// Face detector trait and worker
pub mod detector;

/// Error types
pub mod error;

/// Shared pixel snapshots
pub mod frame;

/// Tracker instance pool
pub mod pool;

/// Rectangles and overlap arithmetic
pub mod rect;

/// Host frame source and render sink contracts
pub mod render;

/// Attenuation and retirement of trackers
pub mod retirement;

/// Host pixel format conversion
pub mod texture;

/// Tracker trait, worker and instance lifecycle
pub mod tracker;

/// Poll-based worker handles
pub mod worker;

pub use config::Config;
pub use coordinator::FaceTrackerFilter;
pub use error::{Error, Result};
pub use frame::Frame;
pub use rect::{Margins, Rect, F4};
pub use render::{FrameSource, RenderOutput, RenderSink};
pub use tracker::{TrackerId, TrackerState};
