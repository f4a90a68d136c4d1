//! Face detector seam and its worker.
//!
//! The detection algorithm itself is external; anything implementing
//! [`FaceDetector`] can be driven by the filter. The worker publishes each
//! pass's faces ordered by confidence, best first.

use crate::{
    frame::Frame,
    rect::Rect,
    worker::{SuspendFlag, Worker},
    Result,
};
use log::warn;

/// Common interface for face detectors
pub trait FaceDetector: Send {
    /// Find faces in a full frame
    ///
    /// # Errors
    ///
    /// Implementations report algorithm or backend failures.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Rect>>;

    /// Detector name for logs
    fn name(&self) -> &str;
}

/// One detection pass request
#[derive(Debug, Clone)]
pub struct DetectJob {
    /// Frame to scan
    pub frame: Frame,
    /// Crop window in effect when the frame was staged
    pub crop: Rect,
}

/// Worker running a [`FaceDetector`]
pub type DetectorWorker = Worker<DetectJob, Vec<Rect>>;

/// Run one pass and order the result, logging rather than propagating failures
pub fn run_detection(detector: &mut dyn FaceDetector, job: &DetectJob) -> Vec<Rect> {
    match detector.detect(&job.frame) {
        Ok(mut faces) => {
            sort_by_score(&mut faces);
            faces
        }
        Err(e) => {
            warn!("{} failed: {}", detector.name(), e);
            Vec::new()
        }
    }
}

/// Sort boxes by score, highest first; ties keep their order
pub fn sort_by_score(faces: &mut [Rect]) {
    faces.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

/// Start a detector on its own thread
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_detector(mut detector: Box<dyn FaceDetector>) -> Result<DetectorWorker> {
    let name = format!("detector-{}", detector.name());
    Worker::spawn(&name, move |job: DetectJob, _: &SuspendFlag| {
        run_detection(&mut *detector, &job)
    })
}

/// Detector that runs synchronously on the control thread
#[must_use]
pub fn inline_detector(mut detector: Box<dyn FaceDetector>) -> DetectorWorker {
    let name = format!("detector-{}", detector.name());
    Worker::inline(&name, move |job: DetectJob, _: &SuspendFlag| {
        run_detection(&mut *detector, &job)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Failing;

    impl FaceDetector for Failing {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Rect>> {
            Err(Error::Detector("model missing".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct Unordered;

    impl FaceDetector for Unordered {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Rect>> {
            Ok(vec![
                Rect::new(0, 0, 10, 10, 0.2),
                Rect::new(0, 0, 20, 20, 0.9),
                Rect::new(0, 0, 30, 30, 0.5),
            ])
        }

        fn name(&self) -> &str {
            "unordered"
        }
    }

    fn job() -> DetectJob {
        DetectJob {
            frame: Frame::blank(4, 4),
            crop: Rect::full_frame(4, 4),
        }
    }

    #[test]
    fn test_results_sorted_best_first() {
        let mut worker = inline_detector(Box::new(Unordered));
        worker.signal(job()).unwrap();
        let faces = worker.take_result().unwrap();
        let scores: Vec<f32> = faces.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_failure_yields_empty_pass() {
        let mut worker = inline_detector(Box::new(Failing));
        worker.signal(job()).unwrap();
        assert_eq!(worker.take_result(), Some(Vec::new()));
    }
}
