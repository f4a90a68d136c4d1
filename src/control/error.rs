use crate::{
    constants::{DEFAULT_SCALE_MAX, DEFAULT_TRACK_X, DEFAULT_TRACK_Y, DEFAULT_TRACK_Z, MIN_TRACK_HEIGHT, WEIGHT_EPSILON},
    rect::{Rect, F4},
    tracker::TrackerInstance,
};

/// How a tracked face should be framed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Face height as a fraction of the crop height
    pub track_z: f32,
    /// Horizontal offset of the face in the crop, -1..1
    pub track_x: f32,
    /// Vertical offset of the face in the crop, -1..1
    pub track_y: f32,
    /// Maximum zoom
    pub scale_max: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            track_z: DEFAULT_TRACK_Z,
            track_x: DEFAULT_TRACK_X,
            track_y: DEFAULT_TRACK_Y,
            scale_max: DEFAULT_SCALE_MAX,
        }
    }
}

/// Crop window that would frame `rect` as configured.
///
/// The zoom is `frame height / box height × track_z`, limited to
/// `[1, scale_max]`. The window is shifted (not shrunk) to stay inside the
/// frame. Returns `None` for boxes too short to measure.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn desired_crop(rect: &Rect, width: u32, height: u32, geometry: &Geometry) -> Option<F4> {
    if rect.height() < MIN_TRACK_HEIGHT {
        return None;
    }
    let fw = width as f32;
    let fh = height as f32;

    let scale = (fh / rect.height() as f32 * geometry.track_z).clamp(1.0, geometry.scale_max.max(1.0));
    let (cx, cy) = rect.center();
    let w = fw / scale;
    let h = fh / scale;
    let ox = fw * geometry.track_x / 2.0;
    let oy = fh * geometry.track_y / 2.0;

    let crop = F4::new(
        cx - w / 2.0 - ox,
        cy - h / 2.0 + oy,
        cx + w / 2.0 - ox,
        cy + h / 2.0 + oy,
    );
    Some(crop.clamp_shift_into(fw, fh))
}

/// Error of one available tracker and its weight.
///
/// The error is measured against the crop that was active when the tracker
/// observed its box, so stale observations do not pull twice.
#[must_use]
pub fn tracker_error(tracker: &TrackerInstance, width: u32, height: u32, geometry: &Geometry) -> Option<(F4, f32)> {
    let desired = desired_crop(&tracker.rect, width, height, geometry)?;
    Some((desired - F4::from(tracker.crop_at_observation), tracker.weight()))
}

/// Weighted mean error over all available trackers.
///
/// `None` means nothing trustworthy is tracked and the crop should hold.
pub fn aggregate_error<'a, I>(trackers: I, width: u32, height: u32, geometry: &Geometry) -> Option<F4>
where
    I: IntoIterator<Item = &'a TrackerInstance>,
{
    let mut sum = F4::ZERO;
    let mut total = 0.0;
    for t in trackers.into_iter().filter(|t| t.is_available()) {
        if let Some((e, weight)) = tracker_error(t, width, height, geometry) {
            sum += e * weight;
            total += weight;
        }
    }

    if total > WEIGHT_EPSILON {
        Some(sum * (1.0 / total))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::ScriptedTracker;
    use crate::frame::Frame;
    use crate::tracker::{inline_tracker, TrackerId, TrackerState};

    fn available(rect: Rect, crop: Rect, attenuation: f32) -> TrackerInstance {
        let mut t = TrackerInstance::new(inline_tracker(Box::new(ScriptedTracker::new(1.0))));
        t.reset(TrackerId(1), 0, Frame::blank(4, 4), crop);
        t.rect = rect;
        t.crop_at_observation = crop;
        t.attenuation = attenuation;
        t.state = TrackerState::Available;
        t
    }

    #[test]
    fn test_desired_crop_centres_face() {
        // 300 px face in a 720 px frame: zoom 720/300*0.7 = 1.68
        let face = Rect::new(500, 200, 700, 500, 1.0);
        let crop = desired_crop(&face, 1280, 720, &Geometry::default()).unwrap();
        let w = 1280.0 / 1.68;
        let h = 720.0 / 1.68;
        assert!((crop[0] - (600.0 - w / 2.0)).abs() < 0.5);
        assert!((crop[2] - (600.0 + w / 2.0)).abs() < 0.5);
        assert!((crop[1] - (350.0 - h / 2.0)).abs() < 0.5);
        assert!((crop[3] - (350.0 + h / 2.0)).abs() < 0.5);
    }

    #[test]
    fn test_desired_crop_shifted_into_frame() {
        let face = Rect::new(0, 0, 100, 100, 1.0);
        let crop = desired_crop(&face, 1280, 720, &Geometry::default()).unwrap();
        assert_eq!(crop[0], 0.0);
        assert_eq!(crop[1], 0.0);
        assert!(crop[2] <= 1280.0 && crop[3] <= 720.0);
    }

    #[test]
    fn test_zoom_limited_to_range() {
        let geometry = Geometry::default();
        let tiny = Rect::new(600, 350, 604, 354, 1.0);
        let crop = desired_crop(&tiny, 1280, 720, &geometry).unwrap();
        assert!((crop[2] - crop[0] - 128.0).abs() < 1e-3);

        let huge = Rect::new(0, 0, 1280, 720, 1.0);
        let crop = desired_crop(&huge, 1280, 720, &geometry).unwrap();
        assert_eq!(crop, F4::new(0.0, 0.0, 1280.0, 720.0));
    }

    #[test]
    fn test_short_box_contributes_nothing() {
        let flat = Rect::new(10, 10, 200, 11, 1.0);
        assert!(desired_crop(&flat, 1280, 720, &Geometry::default()).is_none());
    }

    #[test]
    fn test_offsets_move_window() {
        let face = Rect::new(600, 300, 680, 400, 1.0);
        let centred = desired_crop(&face, 1280, 720, &Geometry::default()).unwrap();
        let geometry = Geometry {
            track_x: 0.1,
            track_y: -0.1,
            ..Geometry::default()
        };
        let shifted = desired_crop(&face, 1280, 720, &geometry).unwrap();
        assert!((centred[0] - shifted[0] - 64.0).abs() < 1e-3);
        assert!((shifted[1] - centred[1] + 36.0).abs() < 1e-3);
    }

    #[test]
    fn test_weighted_average() {
        let full = Rect::full_frame(1280, 720);
        let a = available(Rect::new(0, 0, 1280, 720, 1.0), full, 1.0);
        let b = available(Rect::new(0, 0, 1280, 720, 1.0), Rect::new(100, 0, 1280, 720, 0.0), 0.5);
        // a has zero error, b has -100 on x0 with a third of the weight
        let e = aggregate_error([&a, &b], 1280, 720, &Geometry::default()).unwrap();
        assert!((e[0] + 100.0 / 3.0).abs() < 1e-3);
        assert_eq!(e[1], 0.0);
    }

    #[test]
    fn test_no_weight_holds() {
        let full = Rect::full_frame(1280, 720);
        let zero_score = available(Rect::new(0, 0, 100, 100, 0.0), full, 1.0);
        assert!(aggregate_error([&zero_score], 1280, 720, &Geometry::default()).is_none());
        assert!(aggregate_error(std::iter::empty(), 1280, 720, &Geometry::default()).is_none());
    }

    #[test]
    fn test_unavailable_trackers_ignored() {
        let full = Rect::full_frame(1280, 720);
        let mut t = available(Rect::new(500, 200, 700, 500, 1.0), full, 1.0);
        t.state = TrackerState::FirstTrack;
        assert!(aggregate_error([&t], 1280, 720, &Geometry::default()).is_none());
    }
}
