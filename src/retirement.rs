//! Overlap based attenuation and retirement of tracker instances.
//!
//! Runs once per consumed detection pass, over `Available` instances only:
//!
//! 1. Suppression: for each detection, walk trackers newest first and
//!    accumulate their overlap with it. A tracker that overlaps the detection
//!    by more than 1% of its area once the running sum already exceeds the
//!    detection's full area is redundant and retired.
//! 2. Decay: every survivor's attenuation is multiplied by
//!    `(max(0.1·a1, best overlap) / a1)^0.1`, where `a1` is its own area.
//! 3. Pruning: trackers whose weight falls below 1% of the best weight are
//!    retired.
//!
//! Retirements are collected during each pass and applied after it, so the
//! active collection is never mutated while it is being walked.

use crate::{
    constants::{DECAY_EXPONENT, DECAY_FLOOR, PRUNE_RATIO, SUPPRESS_ACCUMULATED, SUPPRESS_MIN_OVERLAP},
    pool::TrackerPool,
    rect::{common_area, Rect},
    tracker::{TrackerId, TrackerInstance},
};
use log::info;

/// Instances retired by one [`attenuate`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetirementReport {
    /// Retired as redundant with another tracker on the same detection
    pub suppressed: Vec<TrackerId>,
    /// Retired for falling behind the best weighted score
    pub pruned: Vec<TrackerId>,
}

impl RetirementReport {
    #[must_use]
    pub fn retired(&self) -> usize {
        self.suppressed.len() + self.pruned.len()
    }
}

/// Apply one detection pass to the active trackers of `pool`
pub fn attenuate(pool: &mut TrackerPool, detections: &[Rect]) -> RetirementReport {
    let suppressed = suppression_pass(pool.active(), detections);
    for id in &suppressed {
        pool.retire(*id);
    }

    decay_pass(pool.active_mut(), detections);

    let pruned = pruning_pass(pool.active());
    for id in &pruned {
        pool.retire(*id);
    }

    info!(
        "attenuate: active={} total={} suppressed={} pruned={}",
        pool.active_len(),
        pool.total(),
        suppressed.len(),
        pruned.len()
    );

    RetirementReport { suppressed, pruned }
}

/// Trackers made redundant by an earlier tracker on the same detection
#[must_use]
pub fn suppression_pass(trackers: &[TrackerInstance], detections: &[Rect]) -> Vec<TrackerId> {
    let mut retired = Vec::new();
    for r in detections {
        let a0 = r.area();
        let mut overlap_sum = 0.0;
        for t in trackers.iter().rev().filter(|t| t.is_available()) {
            if retired.contains(&t.id()) {
                continue;
            }
            let a = common_area(r, &t.rect);
            overlap_sum += a;
            if a > a0 * SUPPRESS_MIN_OVERLAP && overlap_sum > a0 * SUPPRESS_ACCUMULATED {
                retired.push(t.id());
            }
        }
    }
    retired
}

/// Factor applied to a tracker's attenuation for one detection pass
#[must_use]
pub fn decay_factor(rect: &Rect, detections: &[Rect]) -> f32 {
    let a1 = rect.area();
    if a1 <= 0.0 {
        return DECAY_FLOOR.powf(DECAY_EXPONENT);
    }
    let amax = detections
        .iter()
        .map(|r| common_area(r, rect))
        .fold(a1 * DECAY_FLOOR, f32::max);
    (amax / a1).powf(DECAY_EXPONENT)
}

/// Scale every available tracker's attenuation by its decay factor.
///
/// Attenuation never reaches zero; it bottoms out at the smallest normal
/// float.
pub fn decay_pass(trackers: &mut [TrackerInstance], detections: &[Rect]) {
    for t in trackers.iter_mut().filter(|t| t.is_available()) {
        let factor = decay_factor(&t.rect, detections);
        t.attenuation = (t.attenuation * factor).clamp(f32::MIN_POSITIVE, 1.0);
    }
}

/// Trackers whose weight is below a fraction of the best one
#[must_use]
pub fn pruning_pass(trackers: &[TrackerInstance]) -> Vec<TrackerId> {
    let score_max = trackers
        .iter()
        .filter(|t| t.is_available())
        .map(TrackerInstance::weight)
        .fold(0.0, f32::max);

    trackers
        .iter()
        .filter(|t| t.is_available() && t.weight() < PRUNE_RATIO * score_max)
        .map(TrackerInstance::id)
        .collect()
}
