//! Conversion of raw host video frames into RGB [`Frame`]s.
//!
//! Packed and planar YUV layouts are reduced to their luma channel (a grey
//! image); detection and correlation tracking only need intensity. Each
//! converter remembers which formats it has already reported so the log is
//! not flooded at frame rate. [`HostFrameSource`] feeds converted frames to
//! the filter.

use crate::{frame::Frame, render::FrameSource, Error, Result};
use image::{Rgb, RgbImage};
use log::{error, info, warn};

/// Host pixel layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luma plane
    Y800,
    /// Planar 4:2:0
    I420,
    /// Semi-planar 4:2:0
    Nv12,
    /// Packed 4:2:2, Y first
    Yvyu,
    /// Packed 4:2:2, Y first
    Yuy2,
    /// Packed 4:2:2, chroma first
    Uyvy,
    /// Packed RGB with padding byte
    Rgba,
    /// Packed BGR with alpha
    Bgra,
    /// Packed BGR with padding byte
    Bgrx,
    /// Planar 4:2:2
    I422,
    /// Planar 4:4:4
    I444,
    /// Packed 24-bit BGR
    Bgr3,
    /// Planar 4:2:0 with alpha plane
    I40a,
    /// Planar 4:2:2 with alpha plane
    I42a,
    /// Planar 4:4:4 with alpha plane
    Yuva,
    /// Anything else the host may deliver, by its numeric code
    Other(u32),
}

impl PixelFormat {
    /// Stable numeric code, used as the bit index of the seen-format mask
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::I420 => 1,
            Self::Nv12 => 2,
            Self::Yvyu => 3,
            Self::Yuy2 => 4,
            Self::Uyvy => 5,
            Self::Rgba => 6,
            Self::Bgra => 7,
            Self::Bgrx => 8,
            Self::Y800 => 9,
            Self::I444 => 10,
            Self::Bgr3 => 11,
            Self::I422 => 12,
            Self::I40a => 13,
            Self::I42a => 14,
            Self::Yuva => 15,
            Self::Other(code) => code,
        }
    }
}

/// Borrowed view of a host frame's first plane
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// Plane bytes
    pub data: &'a [u8],
    /// Bytes per row
    pub linesize: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Layout of `data`
    pub format: PixelFormat,
}

/// Bitmask of formats already reported by one converter
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatLog {
    seen: u32,
}

impl FormatLog {
    /// Empty log: every format will be reported once
    #[must_use]
    pub const fn new() -> Self {
        Self { seen: 0 }
    }

    /// True when `format` is trackable and has not been reported yet
    #[must_use]
    pub const fn is_new(&self, format: PixelFormat) -> bool {
        let code = format.code();
        code < 32 && self.seen & (1 << code) == 0
    }

    /// Mark `format` as reported
    pub fn mark(&mut self, format: PixelFormat) {
        let code = format.code();
        if code < 32 {
            self.seen |= 1 << code;
        }
    }
}

/// Converts host frames to RGB, reporting each new format once
#[derive(Debug, Default)]
pub struct TextureConverter {
    formats: FormatLog,
}

impl TextureConverter {
    /// Create a converter with a cleared format log
    #[must_use]
    pub const fn new() -> Self {
        Self {
            formats: FormatLog::new(),
        }
    }

    /// Convert `raw` to RGB, keeping every `scale`-th pixel in both axes.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero scale, a frame that scales to nothing,
    /// a buffer shorter than its declared geometry or an unsupported layout.
    pub fn convert(&mut self, raw: &RawFrame<'_>, scale: u32) -> Result<Frame> {
        let first_time = self.formats.is_new(raw.format);
        if first_time {
            info!("received frame format={:?}", raw.format);
        }
        self.formats.mark(raw.format);

        let image = match raw.format {
            PixelFormat::Bgrx | PixelFormat::Bgra => resample(raw, scale, 4, 0, 3, |p| [p[2], p[1], p[0]]),
            PixelFormat::Bgr3 => resample(raw, scale, 3, 0, 3, |p| [p[2], p[1], p[0]]),
            PixelFormat::Rgba => resample(raw, scale, 4, 0, 3, |p| [p[0], p[1], p[2]]),
            PixelFormat::Yvyu | PixelFormat::Yuy2 => resample(raw, scale, 2, 0, 1, |p| [p[0]; 3]),
            PixelFormat::Uyvy => resample(raw, scale, 2, 1, 1, |p| [p[0]; 3]),
            PixelFormat::I420
            | PixelFormat::I422
            | PixelFormat::I444
            | PixelFormat::I40a
            | PixelFormat::I42a
            | PixelFormat::Yuva
            | PixelFormat::Y800
            | PixelFormat::Nv12 => resample(raw, scale, 1, 0, 1, |p| [p[0]; 3]),
            PixelFormat::Other(code) => {
                if first_time {
                    error!("unsupported frame format {code}");
                }
                Err(Error::UnsupportedFormat(format!("format code {code}")))
            }
        }?;

        Ok(Frame::new(image))
    }
}

/// Host video frame copied out of the host's buffer
#[derive(Debug, Clone)]
struct HostFrame {
    data: Vec<u8>,
    linesize: u32,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl HostFrame {
    fn raw(&self) -> RawFrame<'_> {
        RawFrame {
            data: &self.data,
            linesize: self.linesize,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

/// [`FrameSource`] over frames pushed by the host in its own pixel layout.
///
/// Pixels are only converted when the filter asks for a snapshot, and the
/// reported dimensions are those of the converted (down-scaled) frame.
#[derive(Debug)]
pub struct HostFrameSource {
    converter: TextureConverter,
    scale: u32,
    current: Option<HostFrame>,
}

impl HostFrameSource {
    /// Source keeping every `scale`-th pixel (a scale of 0 is treated as 1)
    #[must_use]
    pub fn new(scale: u32) -> Self {
        Self {
            converter: TextureConverter::new(),
            scale: scale.max(1),
            current: None,
        }
    }

    /// Replace the current frame with a copy of `raw`
    pub fn push(&mut self, raw: &RawFrame<'_>) {
        self.current = Some(HostFrame {
            data: raw.data.to_vec(),
            linesize: raw.linesize,
            width: raw.width,
            height: raw.height,
            format: raw.format,
        });
    }

    /// The host has no frame until the next [`HostFrameSource::push`]
    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl FrameSource for HostFrameSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        let frame = self.current.as_ref()?;
        let size = (frame.width / self.scale, frame.height / self.scale);
        (size.0 > 0 && size.1 > 0).then_some(size)
    }

    fn snapshot(&mut self) -> Option<Frame> {
        let frame = self.current.as_ref()?;
        match self.converter.convert(&frame.raw(), self.scale) {
            Ok(converted) => Some(converted),
            Err(e) => {
                warn!("frame conversion failed: {}", e);
                None
            }
        }
    }
}

/// Copy every `scale`-th pixel of the first plane through `pixel`.
///
/// `bytes` is the size of one source pixel, `offset` the position of the
/// sampled bytes inside it and `read` how many bytes `pixel` looks at.
fn resample<F>(raw: &RawFrame<'_>, scale: u32, bytes: usize, offset: usize, read: usize, pixel: F) -> Result<RgbImage>
where
    F: Fn(&[u8]) -> [u8; 3],
{
    if scale == 0 {
        return Err(Error::InvalidInput("Scale must be at least 1".to_string()));
    }
    let width = raw.width / scale;
    let height = raw.height / scale;
    if width == 0 || height == 0 {
        return Err(Error::InvalidInput(format!(
            "Frame {}x{} is empty at scale {}",
            raw.width, raw.height, scale
        )));
    }

    let row_stride = raw.linesize as usize * scale as usize;
    let step = bytes * scale as usize;
    let mut image = RgbImage::new(width, height);
    for (x, y, out) in image.enumerate_pixels_mut() {
        let start = y as usize * row_stride + offset + x as usize * step;
        let src = raw.data.get(start..start + read).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Frame buffer of {} bytes too short for {}x{} with linesize {}",
                raw.data.len(),
                raw.width,
                raw.height,
                raw.linesize
            ))
        })?;
        *out = Rgb(pixel(src));
    }
    Ok(image)
}
