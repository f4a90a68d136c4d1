//! `OpenCV` backed collaborators: Haar cascade face detection, KCF
//! correlation tracking and camera/file capture. Captured BGR frames go
//! through the host frame converter like any other host video.

use crate::{
    detector::FaceDetector,
    frame::Frame,
    rect::Rect,
    render::FrameSource,
    texture::{HostFrameSource, PixelFormat, RawFrame},
    tracker::FaceTracker,
    Error, Result,
};
use log::{info, warn};
use opencv::{
    core::{self, Mat, Ptr, Scalar, Size, Vector, CV_8UC3},
    imgproc, objdetect,
    prelude::*,
    tracking::{TrackerKCF, TrackerKCF_Params},
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};
use std::path::Path;

/// Copy a frame into a new 3-channel `Mat` (RGB order)
///
/// # Errors
///
/// Returns an error if the `Mat` cannot be allocated.
#[allow(clippy::cast_possible_wrap)]
pub fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.image().as_raw());
    Ok(mat)
}

fn to_cv_rect(r: &Rect) -> core::Rect {
    core::Rect::new(r.x0, r.y0, r.width(), r.height())
}

/// Haar cascade face detector.
///
/// The cascade reports no confidence, so each face is scored by the number
/// of neighbouring raw detections merged into it.
pub struct CascadeFaceDetector {
    classifier: objdetect::CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
    min_size: i32,
}

impl CascadeFaceDetector {
    /// Load a cascade from an `OpenCV` XML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a cascade.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("Cascade path is not UTF-8: {}", path.display())))?;
        let classifier = objdetect::CascadeClassifier::new(name)?;
        if classifier.empty()? {
            return Err(Error::Detector(format!("Failed to load cascade {name}")));
        }
        info!("Loaded face cascade {}", name);
        Ok(Self {
            classifier,
            scale_factor: 1.1,
            min_neighbors: 3,
            min_size: 30,
        })
    }

    /// Override the multi-scale search parameters
    #[must_use]
    pub fn with_params(mut self, scale_factor: f64, min_neighbors: i32, min_size: i32) -> Self {
        self.scale_factor = scale_factor;
        self.min_neighbors = min_neighbors;
        self.min_size = min_size;
        self
    }
}

impl FaceDetector for CascadeFaceDetector {
    #[allow(clippy::cast_precision_loss)]
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Rect>> {
        let rgb = frame_to_mat(frame)?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY, 0)?;
        let mut equalized = Mat::default();
        imgproc::equalize_hist(&gray, &mut equalized)?;

        let mut objects = Vector::<core::Rect>::new();
        let mut neighbours = Vector::<i32>::new();
        self.classifier.detect_multi_scale2(
            &equalized,
            &mut objects,
            &mut neighbours,
            self.scale_factor,
            self.min_neighbors,
            0,
            Size::new(self.min_size, self.min_size),
            Size::default(),
        )?;

        Ok(objects
            .iter()
            .zip(neighbours.iter())
            .map(|(r, n)| Rect::new(r.x, r.y, r.x + r.width, r.y + r.height, n as f32))
            .collect())
    }

    fn name(&self) -> &str {
        "haar-cascade"
    }
}

/// KCF correlation tracker.
///
/// A fresh model is built on every `start_track` so recycled instances do
/// not carry state from their previous face.
#[derive(Default)]
pub struct KcfTracker {
    tracker: Option<Ptr<TrackerKCF>>,
    last: Rect,
}

impl KcfTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaceTracker for KcfTracker {
    #[allow(clippy::cast_possible_wrap)]
    fn start_track(&mut self, frame: &Frame, rect: &Rect) -> Result<()> {
        let bounds = Rect::full_frame(frame.width(), frame.height());
        let seed = Rect::new(
            rect.x0.max(bounds.x0),
            rect.y0.max(bounds.y0),
            rect.x1.min(bounds.x1),
            rect.y1.min(bounds.y1),
            rect.score,
        );
        if seed.is_empty() {
            self.tracker = None;
            return Err(Error::Tracker(format!("Seed {rect:?} lies outside the frame")));
        }

        let mat = frame_to_mat(frame)?;
        let mut tracker = TrackerKCF::create(TrackerKCF_Params::default()?)?;
        tracker.init(&mat, to_cv_rect(&seed))?;
        self.tracker = Some(tracker);
        self.last = seed;
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<Rect> {
        let tracker = self
            .tracker
            .as_mut()
            .ok_or_else(|| Error::Tracker("KCF tracker not started".to_string()))?;
        let mat = frame_to_mat(frame)?;
        let mut found = to_cv_rect(&self.last);
        if tracker.update(&mat, &mut found)? {
            self.last = Rect::new(found.x, found.y, found.x + found.width, found.y + found.height, 1.0);
            Ok(self.last)
        } else {
            Ok(Rect::default())
        }
    }

    fn name(&self) -> &str {
        "kcf"
    }
}

/// Where captured frames come from
#[derive(Debug, Clone)]
pub enum VideoInput {
    /// Camera device index
    Camera(i32),
    /// Video file path
    File(String),
}

/// Frame source reading from a camera or video file
pub struct VideoSource {
    capture: VideoCapture,
    host: HostFrameSource,
}

impl VideoSource {
    /// Open the capture device or file
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be opened.
    pub fn open(input: &VideoInput) -> Result<Self> {
        let capture = match input {
            VideoInput::Camera(index) => {
                info!("Opening camera {}", index);
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
                // Keep latency low on live sources
                if !cap.set(CAP_PROP_BUFFERSIZE, 1.0)? {
                    warn!("Camera {} ignores buffer size", index);
                }
                cap
            }
            VideoInput::File(path) => {
                info!("Opening video file: {}", path);
                VideoCapture::from_file(path, videoio::CAP_ANY)?
            }
        };
        if !capture.is_opened()? {
            return Err(Error::InvalidInput(format!("Failed to open video input {input:?}")));
        }
        Ok(Self {
            capture,
            host: HostFrameSource::new(1),
        })
    }

    /// Nominal frame rate reported by the input, if any
    #[must_use]
    pub fn fps(&self) -> Option<f64> {
        self.capture
            .get(videoio::CAP_PROP_FPS)
            .ok()
            .filter(|fps| *fps > 0.0)
    }

    /// Read the next frame; false at end of stream
    ///
    /// # Errors
    ///
    /// Returns an error if the capture backend fails.
    #[allow(clippy::cast_sign_loss)]
    pub fn advance(&mut self) -> Result<bool> {
        let mut bgr = Mat::default();
        if !self.capture.read(&mut bgr)? || bgr.empty() {
            self.host.clear();
            return Ok(false);
        }
        if bgr.typ() != CV_8UC3 {
            return Err(Error::InvalidInput(format!("Capture frame type {} is not 8-bit BGR", bgr.typ())));
        }
        let bgr = if bgr.is_continuous() { bgr } else { bgr.try_clone()? };
        let width = bgr.cols() as u32;
        self.host.push(&RawFrame {
            data: bgr.data_bytes()?,
            linesize: width * 3,
            width,
            height: bgr.rows() as u32,
            format: PixelFormat::Bgr3,
        });
        Ok(true)
    }
}

impl FrameSource for VideoSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.host.dimensions()
    }

    fn snapshot(&mut self) -> Option<Frame> {
        self.host.snapshot()
    }
}
