//! Per-tick coordination of the detector, the tracker pool and the crop
//! controller.
//!
//! Each [`FaceTrackerFilter::tick`] runs without blocking:
//!
//! 1. update the crop from the trackers that were available after the last
//!    tick (or reset it to the full frame when there is no valid crop yet),
//! 2. if the detector is idle, consume its finished pass: attenuate and
//!    retire trackers, then seed the instance staged with that pass,
//! 3. when a new pass is due, stage the current frame to the detector and to
//!    a new tracker instance,
//! 4. advance every active tracker whose worker is idle.
//!
//! The frame is snapshotted at most once per tick and shared by every
//! hand-off.

use crate::{
    config::Config,
    control::{aggregate_error, CropController, Gains, Geometry},
    detector::{DetectJob, DetectorWorker},
    frame::Frame,
    pool::{TrackerFactory, TrackerPool},
    rect::{Margins, Rect, F4},
    render::{FrameSource, Overlay, OverlayKind, RenderOutput, RenderSink},
    retirement::{self, RetirementReport},
    tracker::TrackerInstance,
    Result,
};
use log::{debug, info, warn};

/// Face tracking crop filter
pub struct FaceTrackerFilter {
    detector: DetectorWorker,
    pool: TrackerPool,
    controller: CropController,

    geometry: Geometry,
    margins: Margins,
    detect_interval: f32,
    debug_faces: bool,
    debug_notrack: bool,

    dimensions: Option<(u32, u32)>,
    crop: Rect,
    crop_valid: bool,
    last_error: Option<F4>,
    detections: Vec<Rect>,
    last_report: RetirementReport,

    tick: u64,
    next_detect_tick: u64,
    detect_tick: u64,
    detector_in_progress: bool,
    is_active: bool,
}

impl FaceTrackerFilter {
    /// Create a filter around a detector worker and a tracker factory
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config, detector: DetectorWorker, factory: TrackerFactory) -> Result<Self> {
        config.validate()?;
        info!("face tracker filter created with detector {}", detector.name());
        Ok(Self {
            detector,
            pool: TrackerPool::new(factory),
            controller: CropController::new(config.gains()),
            geometry: config.geometry(),
            margins: config.margins(),
            detect_interval: config.detection.interval,
            debug_faces: config.debug.faces,
            debug_notrack: config.debug.notrack,
            dimensions: None,
            crop: Rect::default(),
            crop_valid: false,
            last_error: None,
            detections: Vec::new(),
            last_report: RetirementReport::default(),
            tick: 0,
            next_detect_tick: 0,
            detect_tick: 0,
            detector_in_progress: false,
            is_active: false,
        })
    }

    /// Apply new settings without dropping trackers or the crop
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid; the old settings
    /// stay in effect.
    pub fn update_config(&mut self, config: &Config) -> Result<()> {
        config.validate()?;
        self.geometry = config.geometry();
        self.margins = config.margins();
        self.detect_interval = config.detection.interval;
        self.debug_faces = config.debug.faces;
        self.debug_notrack = config.debug.notrack;
        self.controller.set_gains(config.gains());
        debug!("filter settings updated");
        Ok(())
    }

    /// The filter output is live
    pub fn activate(&mut self) {
        self.is_active = true;
    }

    /// The filter output is only previewed
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Drop every tracker and start again from the full frame on the next tick
    pub fn reset(&mut self) {
        let ids: Vec<_> = self.pool.active().iter().map(TrackerInstance::id).collect();
        for id in ids {
            self.pool.retire(id);
        }
        self.detections.clear();
        self.crop_valid = false;
        self.last_error = None;
        debug!("filter reset");
    }

    /// Run one video tick; `second` is the time since the previous one
    pub fn tick(&mut self, second: f32, source: &mut dyn FrameSource) {
        self.tick += 1;

        let Some((width, height)) = source.dimensions().filter(|(w, h)| *w > 0 && *h > 0) else {
            self.dimensions = None;
            return;
        };
        if self.dimensions != Some((width, height)) {
            if self.dimensions.is_some() {
                info!("frame size changed to {}x{}", width, height);
            }
            self.dimensions = Some((width, height));
            self.crop_valid = false;
        }

        self.update_crop(second, width, height);

        let mut staged: Option<Frame> = None;
        self.stage_to_detector(second, source, &mut staged);
        self.stage_to_trackers(source, &mut staged);
    }

    fn update_crop(&mut self, second: f32, width: u32, height: u32) {
        if !self.crop_valid || self.crop.is_empty() {
            self.crop = self.controller.reset(width, height);
            self.crop_valid = true;
            self.last_error = None;
            return;
        }

        self.last_error = aggregate_error(self.pool.active(), width, height, &self.geometry);
        let Some(error) = self.last_error else {
            return;
        };
        if !(second.is_finite() && second > 0.0) {
            return;
        }
        self.crop = self
            .controller
            .update(error, second, width, height, self.geometry.scale_max);
    }

    fn stage_to_detector(&mut self, second: f32, source: &mut dyn FrameSource, staged: &mut Option<Frame>) {
        if !self.detector.try_lock() {
            return;
        }

        if self.detector_in_progress {
            let faces = self.detector.take_result().unwrap_or_default();
            self.consume_detections(faces);
            self.detector_in_progress = false;
        }

        if self.tick < self.next_detect_tick {
            return;
        }
        let Some(frame) = snapshot(source, staged) else {
            return;
        };

        let job = DetectJob {
            frame: frame.clone(),
            crop: self.crop,
        };
        if let Err(e) = self.detector.signal(job) {
            warn!("detector: {}", e);
            return;
        }
        self.detector_in_progress = true;
        self.detect_tick = self.tick;
        self.next_detect_tick = self.tick + detection_period(self.detect_interval, second);

        if let Err(e) = self.pool.acquire(self.tick, frame, self.crop) {
            warn!("cannot create tracker: {}", e);
        }
    }

    fn consume_detections(&mut self, faces: Vec<Rect>) {
        self.detections = faces;
        self.last_report = retirement::attenuate(&mut self.pool, &self.detections);

        let Some(id) = self.pool.find_staged(self.detect_tick) else {
            return;
        };
        match self.detections.first() {
            Some(best) => {
                let seed = best.expand(&self.margins);
                if let Some(instance) = self.pool.get_mut(id) {
                    instance.seed(seed);
                }
            }
            None => {
                self.pool.retire(id);
            }
        }
    }

    fn stage_to_trackers(&mut self, source: &mut dyn FrameSource, staged: &mut Option<Frame>) {
        if self.pool.active_len() == 0 {
            return;
        }
        let Some(frame) = snapshot(source, staged) else {
            return;
        };
        let tick = self.tick;
        let crop = self.crop;
        for instance in self.pool.active_mut() {
            instance.advance(tick, &frame, crop);
        }
    }

    /// Emit the crop transform and debug overlays for the current tick
    pub fn render(&self, sink: &mut dyn RenderSink) {
        let Some(output) = self.render_output() else {
            sink.skip();
            return;
        };
        sink.draw(&output);
    }

    /// What [`FaceTrackerFilter::render`] would draw; `None` when skipped
    #[must_use]
    pub fn render_output(&self) -> Option<RenderOutput> {
        let (width, height) = self.dimensions?;
        if !self.crop_valid {
            return None;
        }

        let preview = !self.is_active;
        let mut output = if self.debug_notrack && preview {
            RenderOutput::identity(self.crop)
        } else {
            RenderOutput::cropped(self.crop, width, height)
        };

        if self.debug_faces && preview {
            for r in self.detections.iter().filter(|r| !r.is_empty()) {
                output.overlays.push(Overlay {
                    kind: OverlayKind::Detection,
                    rect: *r,
                });
                output.overlays.push(Overlay {
                    kind: OverlayKind::DetectionExpanded,
                    rect: r.expand(&self.margins),
                });
            }
            for t in self.pool.available().filter(|t| !t.rect.is_empty()) {
                output.overlays.push(Overlay {
                    kind: OverlayKind::Tracker,
                    rect: t.rect,
                });
            }
            if self.debug_notrack {
                output.overlays.push(Overlay {
                    kind: OverlayKind::Crop,
                    rect: self.crop,
                });
            }
        }

        Some(output)
    }

    /// Current crop window
    #[must_use]
    pub const fn crop(&self) -> Rect {
        self.crop
    }

    /// True when the last tick had a usable frame
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.dimensions.is_some()
    }

    /// Faces from the most recently consumed detection pass
    #[must_use]
    pub fn detections(&self) -> &[Rect] {
        &self.detections
    }

    /// Active tracker instances, oldest first
    #[must_use]
    pub fn trackers(&self) -> &[TrackerInstance] {
        self.pool.active()
    }

    #[must_use]
    pub const fn pool(&self) -> &TrackerPool {
        &self.pool
    }

    /// Aggregated error used by the last crop update, `None` while holding
    #[must_use]
    pub const fn last_error(&self) -> Option<F4> {
        self.last_error
    }

    /// Retirements caused by the last consumed detection pass
    #[must_use]
    pub const fn last_report(&self) -> &RetirementReport {
        &self.last_report
    }

    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub const fn gains(&self) -> Gains {
        self.controller.gains()
    }

    /// Stop the detector and every tracker worker
    pub fn shutdown(&mut self) {
        self.pool.clear();
        self.detector.stop();
        self.detector_in_progress = false;
        info!("face tracker filter shut down after {} ticks", self.tick);
    }
}

/// Snapshot the source once per tick
fn snapshot(source: &mut dyn FrameSource, staged: &mut Option<Frame>) -> Option<Frame> {
    if staged.is_none() {
        *staged = source.snapshot();
    }
    staged.clone()
}

/// Ticks between detection passes for a tick length of `second`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn detection_period(interval: f32, second: f32) -> u64 {
    if second.is_finite() && second > 0.0 {
        ((interval / second) as u64).max(1)
    } else {
        1
    }
}
