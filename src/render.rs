//! Host-facing frame source and render sink contracts.

use crate::{frame::Frame, rect::Rect};

/// Supplies frame geometry every tick and pixels on demand
pub trait FrameSource {
    /// Current frame size, `None` while the host has no frame
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Copy of the current frame's pixels
    fn snapshot(&mut self) -> Option<Frame>;
}

/// Receives the filter output for each rendered frame
pub trait RenderSink {
    /// Draw the source with the given transform and overlays
    fn draw(&mut self, output: &RenderOutput);

    /// Pass the source through untouched
    fn skip(&mut self);
}

/// What a debug overlay box represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Raw detector output
    Detection,
    /// Detection grown by the upsize margins
    DetectionExpanded,
    /// Box reported by an available tracker
    Tracker,
    /// Current crop window
    Crop,
}

impl OverlayKind {
    /// Line colour as ARGB
    #[must_use]
    pub const fn color(self) -> u32 {
        match self {
            Self::Detection | Self::DetectionExpanded => 0xFF00_00FF,
            Self::Tracker => 0xFF00_FF00,
            Self::Crop => 0xFFFF_FF00,
        }
    }
}

/// One debug box in source frame coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub rect: Rect,
}

/// Crop transform and overlays for one frame.
///
/// A source point `p` lands at `p × scale + translate` in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    /// Crop window in source coordinates
    pub crop: Rect,
    /// Uniform magnification
    pub scale: f32,
    /// Offset applied after scaling
    pub translate: (f32, f32),
    /// Debug boxes, drawn untransformed relative to the source
    pub overlays: Vec<Overlay>,
}

impl RenderOutput {
    /// Transform that magnifies `crop` to fill a `width × height` output
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cropped(crop: Rect, width: u32, height: u32) -> Self {
        let fw = width as f32;
        let fh = height as f32;
        let area = crop.area();
        let scale = if area > 0.0 { (fw * fh / area).sqrt() } else { 1.0 };
        let (cx, cy) = crop.center();
        Self {
            crop,
            scale,
            translate: (fw * 0.5 - cx * scale, fh * 0.5 - cy * scale),
            overlays: Vec::new(),
        }
    }

    /// Transform that shows the whole source unchanged
    #[must_use]
    pub const fn identity(crop: Rect) -> Self {
        Self {
            crop,
            scale: 1.0,
            translate: (0.0, 0.0),
            overlays: Vec::new(),
        }
    }

    /// Where a source point ends up in the output
    #[must_use]
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.translate.0, y * self.scale + self.translate.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_frame_crop_is_identity() {
        let out = RenderOutput::cropped(Rect::full_frame(1280, 720), 1280, 720);
        assert_eq!(out.scale, 1.0);
        assert_eq!(out.translate, (0.0, 0.0));
    }

    #[test]
    fn test_crop_centre_maps_to_output_centre() {
        let crop = Rect::new(320, 180, 960, 540, 0.0);
        let out = RenderOutput::cropped(crop, 1280, 720);
        assert_eq!(out.scale, 2.0);
        assert_eq!(out.map_point(640.0, 360.0), (640.0, 360.0));
        assert_eq!(out.map_point(320.0, 180.0), (0.0, 0.0));
        assert_eq!(out.map_point(960.0, 540.0), (1280.0, 720.0));
    }

    #[test]
    fn test_empty_crop_does_not_divide_by_zero() {
        let out = RenderOutput::cropped(Rect::default(), 1280, 720);
        assert_eq!(out.scale, 1.0);
    }
}
