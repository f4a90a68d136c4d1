//! Constants used throughout the filter

/// A tracker must cover more than this fraction of a detection to be suppressed
pub const SUPPRESS_MIN_OVERLAP: f32 = 1e-2;

/// Accumulated tracker overlap (fraction of the detection area) beyond which
/// further overlapping trackers are redundant
pub const SUPPRESS_ACCUMULATED: f32 = 1.0;

/// Lower bound of the corroboration ratio used by the decay pass
pub const DECAY_FLOOR: f32 = 0.1;

/// Exponent applied to the corroboration ratio on each detection pass
pub const DECAY_EXPONENT: f32 = 0.1;

/// Trackers weaker than this fraction of the best weighted score are retired
pub const PRUNE_RATIO: f32 = 1e-2;

/// Total aggregation weight at or below which the crop holds position
pub const WEIGHT_EPSILON: f32 = 1e-19;

/// Tracked boxes shorter than this (pixels) contribute no error
pub const MIN_TRACK_HEIGHT: i32 = 2;

/// Default wall-clock period between detection passes, in seconds
pub const DEFAULT_DETECT_INTERVAL: f32 = 2.0;

/// Default upsize margins (left, right, top, bottom)
pub const DEFAULT_UPSIZE_L: f32 = 0.2;
pub const DEFAULT_UPSIZE_R: f32 = 0.2;
pub const DEFAULT_UPSIZE_T: f32 = 0.3;
pub const DEFAULT_UPSIZE_B: f32 = 0.1;

/// Default framing of the tracked face
pub const DEFAULT_TRACK_Z: f32 = 0.70;
pub const DEFAULT_TRACK_X: f32 = 0.0;
pub const DEFAULT_TRACK_Y: f32 = 0.0;
pub const DEFAULT_SCALE_MAX: f32 = 10.0;

/// Default controller gains
pub const DEFAULT_KP: f32 = 0.5;
pub const DEFAULT_TD: f32 = 0.05;
pub const DEFAULT_TDLPF: f32 = 0.025;
