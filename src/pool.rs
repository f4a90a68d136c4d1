//! Active and idle collections of tracker instances.
//!
//! Creating a tracker can be expensive, so retired instances are parked in
//! an idle queue and recycled. An instance lives in exactly one of the two
//! collections at any time, which keeps `active_len() + idle_len()` equal to
//! the number of instances ever allocated.

use crate::{
    frame::Frame,
    rect::Rect,
    tracker::{TrackerId, TrackerInstance, TrackerState, TrackerWorker},
    Result,
};
use log::debug;
use std::collections::VecDeque;

/// Builds the worker for a newly allocated instance
pub type TrackerFactory = Box<dyn FnMut() -> Result<TrackerWorker> + Send>;

/// Tracker instances owned by one filter
pub struct TrackerPool {
    active: Vec<TrackerInstance>,
    idle: VecDeque<TrackerInstance>,
    factory: TrackerFactory,
    next_id: u64,
    allocated: usize,
}

impl TrackerPool {
    #[must_use]
    pub fn new(factory: TrackerFactory) -> Self {
        Self {
            active: Vec::new(),
            idle: VecDeque::new(),
            factory,
            next_id: 1,
            allocated: 0,
        }
    }

    /// Append an instance holding `frame` in state `TextureStaged`.
    ///
    /// The oldest idle instance whose worker has acknowledged its suspension
    /// is reused; otherwise a new one is built through the factory.
    ///
    /// # Errors
    ///
    /// Returns the factory's error when a new worker cannot be created.
    pub fn acquire(&mut self, tick: u64, frame: Frame, crop: Rect) -> Result<TrackerId> {
        let reusable = self.idle.iter_mut().position(TrackerInstance::worker_idle);
        let mut instance = match reusable.and_then(|i| self.idle.remove(i)) {
            Some(instance) => instance,
            None => {
                let worker = (self.factory)()?;
                self.allocated += 1;
                debug!("allocated tracker worker {}", self.allocated);
                TrackerInstance::new(worker)
            }
        };

        let id = TrackerId(self.next_id);
        self.next_id += 1;
        instance.reset(id, tick, frame, crop);
        self.active.push(instance);
        Ok(id)
    }

    /// Move an active instance to the idle queue.
    ///
    /// Order of the remaining active instances is preserved. Retiring an id
    /// that is not active does nothing and returns false.
    pub fn retire(&mut self, id: TrackerId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let mut instance = self.active.remove(index);
        instance.retire();
        debug!("tracker {} retired", id);
        self.idle.push_back(instance);
        true
    }

    /// The instance created on `tick` that is still waiting for a position
    #[must_use]
    pub fn find_staged(&self, tick: u64) -> Option<TrackerId> {
        self.active
            .iter()
            .find(|t| t.creation_tick == tick && t.state == TrackerState::TextureStaged)
            .map(TrackerInstance::id)
    }

    #[must_use]
    pub fn get(&self, id: TrackerId) -> Option<&TrackerInstance> {
        self.active.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TrackerId) -> Option<&mut TrackerInstance> {
        self.active.iter_mut().find(|t| t.id() == id)
    }

    /// Active instances, oldest first
    #[must_use]
    pub fn active(&self) -> &[TrackerInstance] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut [TrackerInstance] {
        &mut self.active
    }

    /// Active instances in state `Available`, oldest first
    pub fn available(&self) -> impl Iterator<Item = &TrackerInstance> {
        self.active.iter().filter(|t| t.is_available())
    }

    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }

    /// Instances held in either collection
    #[must_use]
    pub fn total(&self) -> usize {
        self.active.len() + self.idle.len()
    }

    /// Instances ever built by the factory
    #[must_use]
    pub const fn allocated(&self) -> usize {
        self.allocated
    }

    /// Stop every worker and drop all instances
    pub fn clear(&mut self) {
        for instance in self.active.iter_mut().chain(self.idle.iter_mut()) {
            instance.retire();
            instance.stop();
        }
        self.active.clear();
        self.idle.clear();
        self.allocated = 0;
    }

    fn position(&self, id: TrackerId) -> Option<usize> {
        self.active.iter().position(|t| t.id() == id)
    }
}

impl Drop for TrackerPool {
    fn drop(&mut self) {
        self.clear();
    }
}
