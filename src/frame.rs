//! Read-only pixel snapshot shared by the detector and every tracker of a tick.

use image::RgbImage;
use std::sync::Arc;

/// One staged video frame.
///
/// Cloning only bumps a reference count; the pixels are never mutated once
/// the frame has been published.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
}

impl Frame {
    /// Wrap an RGB image
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Black frame of the given size
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel data
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}
