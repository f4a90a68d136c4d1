//! Single-object tracker seam and the per-instance lifecycle.
//!
//! ```text
//! Init -> TextureStaged -> Constructing -> FirstTrack -> Available -> Retired
//!                                                          ^    |
//!                                                          +----+ every tick
//! ```
//!
//! Every transition out of `Constructing`, `FirstTrack` and `Available`
//! needs the instance's worker to be idle. A busy worker defers the
//! transition to a later tick.

use crate::{
    frame::Frame,
    rect::Rect,
    worker::{SuspendFlag, Worker},
    Result,
};
use log::{debug, warn};
use std::fmt;

/// Common interface for single-object trackers
pub trait FaceTracker: Send {
    /// Build the internal model of the object at `rect` in `frame`
    ///
    /// # Errors
    ///
    /// Implementations report algorithm or backend failures.
    fn start_track(&mut self, frame: &Frame, rect: &Rect) -> Result<()>;

    /// Locate the object in the next frame
    ///
    /// # Errors
    ///
    /// Implementations report algorithm or backend failures.
    fn update(&mut self, frame: &Frame) -> Result<Rect>;

    /// Tracker name for logs
    fn name(&self) -> &str;
}

/// Initial position handed to a tracker together with the frame it refers to
#[derive(Debug, Clone)]
pub struct Seed {
    /// Frame the detection was made on
    pub frame: Frame,
    /// Margin-expanded detection
    pub rect: Rect,
}

/// One tracking pass request
#[derive(Debug, Clone)]
pub struct TrackJob {
    /// Frame to track into
    pub frame: Frame,
    /// Present on the first pass only
    pub seed: Option<Seed>,
}

/// Worker running a [`FaceTracker`]
pub type TrackerWorker = Worker<TrackJob, Rect>;

/// Run one pass; failures and suspensions produce an empty box
pub fn run_tracking(tracker: &mut dyn FaceTracker, job: &TrackJob, suspend: &SuspendFlag) -> Rect {
    if let Some(seed) = &job.seed {
        if let Err(e) = tracker.start_track(&seed.frame, &seed.rect) {
            warn!("{} failed to start: {}", tracker.name(), e);
            return Rect::default();
        }
    }
    if suspend.is_set() {
        return Rect::default();
    }
    tracker.update(&job.frame).unwrap_or_else(|e| {
        warn!("{} failed to update: {}", tracker.name(), e);
        Rect::default()
    })
}

/// Start a tracker on its own thread
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_tracker(mut tracker: Box<dyn FaceTracker>) -> Result<TrackerWorker> {
    let name = format!("tracker-{}", tracker.name());
    Worker::spawn(&name, move |job: TrackJob, suspend: &SuspendFlag| {
        run_tracking(&mut *tracker, &job, suspend)
    })
}

/// Tracker that runs synchronously on the control thread
#[must_use]
pub fn inline_tracker(mut tracker: Box<dyn FaceTracker>) -> TrackerWorker {
    let name = format!("tracker-{}", tracker.name());
    Worker::inline(&name, move |job: TrackJob, suspend: &SuspendFlag| {
        run_tracking(&mut *tracker, &job, suspend)
    })
}

/// Lifecycle of a tracker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// Allocated or recycled, nothing staged
    #[default]
    Init,
    /// Frame staged, waiting for the detector to supply a position
    TextureStaged,
    /// Position set, waiting for the worker to take the first pass
    Constructing,
    /// First tracking pass running
    FirstTrack,
    /// `rect` is valid; a pass is restaged every tick
    Available,
    /// Back in the idle pool
    Retired,
}

/// Identity of an instance for one stay in the active collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackerId(pub u64);

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One tracked region and the worker that follows it
pub struct TrackerInstance {
    id: TrackerId,
    worker: TrackerWorker,
    /// Last observed box, with the tracker's confidence
    pub rect: Rect,
    /// Crop window that was active for the frame `rect` was found in
    pub crop_at_observation: Rect,
    /// Crop window of the frame most recently handed to the worker
    pub crop_at_ingest: Rect,
    /// Decaying trust weight in (0, 1]
    pub attenuation: f32,
    /// Lifecycle state
    pub state: TrackerState,
    /// Tick the instance was (re)created on
    pub creation_tick: u64,
    /// Tick `rect` was last refreshed on
    pub last_update_tick: u64,
    staged: Option<Frame>,
    seed: Option<Rect>,
}

impl TrackerInstance {
    /// Wrap a worker in a fresh `Init` instance
    #[must_use]
    pub fn new(worker: TrackerWorker) -> Self {
        Self {
            id: TrackerId(0),
            worker,
            rect: Rect::default(),
            crop_at_observation: Rect::default(),
            crop_at_ingest: Rect::default(),
            attenuation: 1.0,
            state: TrackerState::Init,
            creation_tick: 0,
            last_update_tick: 0,
            staged: None,
            seed: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TrackerId {
        self.id
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == TrackerState::Available
    }

    /// Confidence used for ranking and error weighting
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.attenuation * self.rect.score
    }

    /// Margin-expanded detection the instance was seeded with
    #[must_use]
    pub const fn seed_rect(&self) -> Option<Rect> {
        self.seed
    }

    /// Non-blocking check that the worker has nothing in flight
    pub fn worker_idle(&mut self) -> bool {
        self.worker.try_lock()
    }

    /// Restart the instance on a newly staged frame (`Init -> TextureStaged`)
    pub fn reset(&mut self, id: TrackerId, tick: u64, frame: Frame, crop: Rect) {
        self.id = id;
        self.worker.take_result();
        self.rect = Rect::default();
        self.crop_at_observation = crop;
        self.crop_at_ingest = crop;
        self.attenuation = 1.0;
        self.creation_tick = tick;
        self.last_update_tick = tick;
        self.staged = Some(frame);
        self.seed = None;
        self.state = TrackerState::TextureStaged;
    }

    /// Give the instance its initial box (`TextureStaged -> Constructing`).
    ///
    /// Returns false if the instance is not waiting for a position.
    pub fn seed(&mut self, rect: Rect) -> bool {
        if self.state != TrackerState::TextureStaged {
            return false;
        }
        self.seed = Some(rect);
        self.state = TrackerState::Constructing;
        debug!("tracker {} seeded at {:?}", self.id, rect);
        true
    }

    /// Advance the lifecycle by at most one step without blocking.
    ///
    /// `frame` and `crop` are this tick's staged frame and crop window.
    /// Returns true if the worker was idle and the instance made progress.
    pub fn advance(&mut self, tick: u64, frame: &Frame, crop: Rect) -> bool {
        match self.state {
            TrackerState::Init | TrackerState::TextureStaged | TrackerState::Retired => false,
            TrackerState::Constructing => {
                if !self.worker.try_lock() {
                    return false;
                }
                self.worker.take_result();
                let seed = self.seed.map(|rect| Seed {
                    frame: self.staged.take().unwrap_or_else(|| frame.clone()),
                    rect,
                });
                self.stage(frame, crop, seed);
                self.state = TrackerState::FirstTrack;
                debug!("tracker {} constructing -> first track", self.id);
                true
            }
            TrackerState::FirstTrack => {
                if !self.worker.try_lock() {
                    return false;
                }
                if let Some(rect) = self.worker.take_result() {
                    self.rect = rect;
                }
                self.crop_at_observation = self.crop_at_ingest;
                self.attenuation = 1.0;
                self.last_update_tick = tick;
                self.stage(frame, crop, None);
                self.state = TrackerState::Available;
                debug!("tracker {} available at {:?}", self.id, self.rect);
                true
            }
            TrackerState::Available => {
                if !self.worker.try_lock() {
                    return false;
                }
                if let Some(rect) = self.worker.take_result() {
                    self.rect = rect;
                    self.crop_at_observation = self.crop_at_ingest;
                    self.last_update_tick = tick;
                }
                self.stage(frame, crop, None);
                true
            }
        }
    }

    /// Suspend any in-flight pass and mark the instance retired
    pub fn retire(&mut self) {
        self.worker.request_suspend();
        self.staged = None;
        self.seed = None;
        self.state = TrackerState::Retired;
    }

    /// Join the worker thread
    pub fn stop(&mut self) {
        self.worker.stop();
    }

    fn stage(&mut self, frame: &Frame, crop: Rect, seed: Option<Seed>) {
        let job = TrackJob {
            frame: frame.clone(),
            seed,
        };
        match self.worker.signal(job) {
            Ok(()) => self.crop_at_ingest = crop,
            Err(e) => warn!("tracker {}: {}", self.id, e),
        }
    }
}

impl fmt::Debug for TrackerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerInstance")
            .field("id", &self.id)
            .field("worker", &self.worker.name())
            .field("state", &self.state)
            .field("rect", &self.rect)
            .field("attenuation", &self.attenuation)
            .field("crop_at_observation", &self.crop_at_observation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::ScriptedTracker;
    use crossbeam::channel::bounded;
    use std::time::Duration;

    fn staged_instance(tracker: ScriptedTracker) -> TrackerInstance {
        let mut inst = TrackerInstance::new(inline_tracker(Box::new(tracker)));
        inst.reset(TrackerId(1), 1, Frame::blank(64, 64), Rect::full_frame(64, 64));
        inst
    }

    #[test]
    fn test_lifecycle_with_idle_worker() {
        let mut inst = staged_instance(ScriptedTracker::new(0.8));
        let frame = Frame::blank(64, 64);
        let crop = Rect::new(4, 4, 60, 60, 0.0);

        assert_eq!(inst.state, TrackerState::TextureStaged);
        assert!(!inst.advance(1, &frame, crop), "no position yet");

        assert!(inst.seed(Rect::new(10, 10, 30, 30, 1.0)));
        assert_eq!(inst.state, TrackerState::Constructing);
        assert!(!inst.seed(Rect::new(0, 0, 1, 1, 1.0)), "seeding twice is rejected");

        assert!(inst.advance(2, &frame, crop));
        assert_eq!(inst.state, TrackerState::FirstTrack);

        assert!(inst.advance(3, &frame, crop));
        assert_eq!(inst.state, TrackerState::Available);
        assert_eq!(inst.rect, Rect::new(10, 10, 30, 30, 0.8));
        assert_eq!(inst.crop_at_observation, crop);
        assert_eq!(inst.attenuation, 1.0);
        assert_eq!(inst.last_update_tick, 3);
    }

    #[test]
    fn test_busy_worker_defers_promotion() {
        let (gate_tx, gate_rx) = bounded::<()>(4);
        let mut tracker = ScriptedTracker::new(1.0);
        tracker.set_gate(gate_rx);
        let mut inst = TrackerInstance::new(spawn_tracker(Box::new(tracker)).unwrap());
        inst.reset(TrackerId(7), 0, Frame::blank(32, 32), Rect::full_frame(32, 32));
        let frame = Frame::blank(32, 32);
        let crop = Rect::full_frame(32, 32);

        inst.seed(Rect::new(2, 2, 12, 12, 1.0));
        assert!(inst.advance(1, &frame, crop));
        assert_eq!(inst.state, TrackerState::FirstTrack);

        // First pass is blocked on the gate
        assert!(!inst.advance(2, &frame, crop));
        assert_eq!(inst.state, TrackerState::FirstTrack);

        gate_tx.send(()).unwrap();
        assert!(inst.worker.wait_idle(Duration::from_secs(5)));
        assert!(inst.advance(3, &frame, crop));
        assert_eq!(inst.state, TrackerState::Available);
        assert_eq!(inst.rect, Rect::new(2, 2, 12, 12, 1.0));

        inst.retire();
        gate_tx.send(()).unwrap();
        assert!(inst.worker.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn test_retire_marks_state() {
        let mut inst = staged_instance(ScriptedTracker::new(1.0));
        inst.retire();
        assert_eq!(inst.state, TrackerState::Retired);
        assert!(!inst.advance(5, &Frame::blank(8, 8), Rect::full_frame(8, 8)));
    }
}
