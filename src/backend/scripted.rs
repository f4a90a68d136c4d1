//! Scripted detector, tracker and frame source.
//!
//! They return predetermined boxes without looking at pixels, which makes
//! filter behaviour reproducible in tests and benches.

use crate::{
    detector::FaceDetector,
    frame::Frame,
    rect::Rect,
    render::FrameSource,
    tracker::FaceTracker,
    Error, Result,
};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;

/// Detector that replays a list of passes, repeating the last one
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    passes: VecDeque<Vec<Rect>>,
    last: Vec<Rect>,
    feed: Option<Receiver<Vec<Rect>>>,
    fail: bool,
}

impl ScriptedDetector {
    /// Replay `passes` in order
    #[must_use]
    pub fn new(passes: Vec<Vec<Rect>>) -> Self {
        Self {
            passes: passes.into(),
            ..Self::default()
        }
    }

    /// Report the same faces on every pass
    #[must_use]
    pub fn repeating(faces: Vec<Rect>) -> Self {
        Self::new(vec![faces])
    }

    /// Detector fed from the returned sender.
    ///
    /// Each pass uses the most recently sent faces, or the previous pass's if
    /// nothing new arrived.
    #[must_use]
    pub fn fed() -> (Self, Sender<Vec<Rect>>) {
        let (tx, rx) = unbounded();
        let detector = Self {
            feed: Some(rx),
            ..Self::default()
        };
        (detector, tx)
    }

    /// Detector whose every pass fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Rect>> {
        if self.fail {
            return Err(Error::Detector("scripted failure".to_string()));
        }
        if let Some(feed) = &self.feed {
            self.passes.extend(feed.try_iter());
        }
        if let Some(faces) = self.passes.pop_front() {
            self.last = faces;
        }
        Ok(self.last.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Tracker that follows its seed box along a fixed velocity
#[derive(Debug)]
pub struct ScriptedTracker {
    score: f32,
    rect: Option<Rect>,
    velocity: (i32, i32),
    lose_after: Option<usize>,
    updates: usize,
    gate: Option<Receiver<()>>,
}

impl ScriptedTracker {
    /// Tracker reporting its box with a fixed `score`
    #[must_use]
    pub const fn new(score: f32) -> Self {
        Self {
            score,
            rect: None,
            velocity: (0, 0),
            lose_after: None,
            updates: 0,
            gate: None,
        }
    }

    /// Move the box by `(dx, dy)` pixels on every update
    #[must_use]
    pub fn with_velocity(mut self, dx: i32, dy: i32) -> Self {
        self.velocity = (dx, dy);
        self
    }

    /// Report an empty box once `updates` updates have been made
    #[must_use]
    pub fn lose_after(mut self, updates: usize) -> Self {
        self.lose_after = Some(updates);
        self
    }

    /// Block each update until a token arrives on `gate`
    pub fn set_gate(&mut self, gate: Receiver<()>) {
        self.gate = Some(gate);
    }
}

impl FaceTracker for ScriptedTracker {
    fn start_track(&mut self, _frame: &Frame, rect: &Rect) -> Result<()> {
        self.rect = Some(*rect);
        self.updates = 0;
        Ok(())
    }

    fn update(&mut self, _frame: &Frame) -> Result<Rect> {
        if let Some(gate) = &self.gate {
            // A dropped sender releases every later update
            let _ = gate.recv();
        }
        let rect = self
            .rect
            .ok_or_else(|| Error::Tracker("update before start_track".to_string()))?;
        if self.lose_after.is_some_and(|n| self.updates >= n) {
            return Ok(Rect::default());
        }
        let current = if self.updates == 0 {
            rect
        } else {
            Rect::new(
                rect.x0 + self.velocity.0,
                rect.y0 + self.velocity.1,
                rect.x1 + self.velocity.0,
                rect.y1 + self.velocity.1,
                rect.score,
            )
        };
        self.updates += 1;
        self.rect = Some(current);
        Ok(current.with_score(self.score))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Frame source producing blank frames of a fixed size
#[derive(Debug, Clone)]
pub struct BlankSource {
    width: u32,
    height: u32,
    available: bool,
    snapshots: usize,
}

impl BlankSource {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: true,
            snapshots: 0,
        }
    }

    /// Simulate the host losing or regaining its frame
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Number of pixel snapshots taken so far
    #[must_use]
    pub const fn snapshots(&self) -> usize {
        self.snapshots
    }
}

impl FrameSource for BlankSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.available.then_some((self.width, self.height))
    }

    fn snapshot(&mut self) -> Option<Frame> {
        if !self.available {
            return None;
        }
        self.snapshots += 1;
        Some(Frame::blank(self.width, self.height))
    }
}
