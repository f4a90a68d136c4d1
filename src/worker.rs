//! Poll-based task handles for the slow detector and tracker passes.
//!
//! A [`Worker`] owns one job function. The control thread checks it with
//! [`Worker::try_lock`], which never blocks: it succeeds only when no job is
//! in flight, and collects the result of the last completed job on the way.
//! Jobs and results travel over bounded `crossbeam` channels, one slot each,
//! so a worker can never hold more than one pending job.

use crate::{Error, Result};
use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared between a worker and its owner
#[derive(Debug, Clone, Default)]
pub struct SuspendFlag(Arc<AtomicBool>);

impl SuspendFlag {
    /// True once a suspension has been requested for the current job
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

type JobFn<J, R> = Box<dyn FnMut(J, &SuspendFlag) -> R + Send>;

enum Backend<J, R> {
    /// Jobs run on a dedicated thread
    Threaded {
        job_tx: Option<Sender<J>>,
        // `None` acknowledges a job that was skipped because of a suspension
        result_rx: Receiver<Option<R>>,
        handle: Option<thread::JoinHandle<()>>,
    },
    /// Jobs run synchronously inside `signal`
    Inline { job: JobFn<J, R> },
}

/// Handle to one detector or tracker worker
pub struct Worker<J, R> {
    name: String,
    backend: Backend<J, R>,
    in_flight: bool,
    result: Option<R>,
    suspend: SuspendFlag,
}

impl<J, R> Worker<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Start a worker thread running `job` for every signalled input
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<F>(name: &str, mut job: F) -> Result<Self>
    where
        F: FnMut(J, &SuspendFlag) -> R + Send + 'static,
    {
        let (job_tx, job_rx) = bounded::<J>(1);
        let (result_tx, result_rx) = bounded::<Option<R>>(1);
        let suspend = SuspendFlag::default();
        let flag = suspend.clone();
        let thread_name = name.to_string();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!("worker {} started", thread_name);
            while let Ok(input) = job_rx.recv() {
                let output = if flag.is_set() {
                    None
                } else {
                    Some(job(input, &flag))
                };
                if result_tx.send(output).is_err() {
                    break;
                }
            }
            debug!("worker {} stopped", thread_name);
        })?;

        Ok(Self {
            name: name.to_string(),
            backend: Backend::Threaded {
                job_tx: Some(job_tx),
                result_rx,
                handle: Some(handle),
            },
            in_flight: false,
            result: None,
            suspend,
        })
    }

    /// Worker that runs each job on the caller as soon as it is signalled.
    ///
    /// It is never observed busy, which makes tick sequences deterministic.
    pub fn inline<F>(name: &str, job: F) -> Self
    where
        F: FnMut(J, &SuspendFlag) -> R + Send + 'static,
    {
        Self {
            name: name.to_string(),
            backend: Backend::Inline { job: Box::new(job) },
            in_flight: false,
            result: None,
            suspend: SuspendFlag::default(),
        }
    }
}

impl<J, R> Worker<J, R> {
    /// Worker name used in logs and errors
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking check that no job is in flight.
    ///
    /// Completed results are moved into the handle and can be read with
    /// [`Worker::take_result`].
    pub fn try_lock(&mut self) -> bool {
        if !self.in_flight {
            return true;
        }
        let Backend::Threaded { result_rx, .. } = &self.backend else {
            self.in_flight = false;
            return true;
        };
        match result_rx.try_recv() {
            Ok(output) => {
                self.in_flight = false;
                if let Some(result) = output {
                    self.result = Some(result);
                }
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                warn!("worker {} disconnected with a job in flight", self.name);
                self.in_flight = false;
                true
            }
        }
    }

    /// Result of the most recently completed job, if not taken yet
    pub fn take_result(&mut self) -> Option<R> {
        self.result.take()
    }

    /// Start a job. Any result not yet taken is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerBusy`] if a job is still in flight and
    /// [`Error::WorkerDisconnected`] if the worker thread is gone.
    pub fn signal(&mut self, input: J) -> Result<()> {
        if !self.try_lock() {
            return Err(Error::WorkerBusy(self.name.clone()));
        }
        self.result = None;
        self.suspend.clear();

        match &mut self.backend {
            Backend::Threaded { job_tx, .. } => {
                let tx = job_tx
                    .as_ref()
                    .ok_or_else(|| Error::WorkerDisconnected(self.name.clone()))?;
                match tx.try_send(input) {
                    Ok(()) => {
                        self.in_flight = true;
                        Ok(())
                    }
                    Err(TrySendError::Full(_)) => Err(Error::WorkerBusy(self.name.clone())),
                    Err(TrySendError::Disconnected(_)) => Err(Error::WorkerDisconnected(self.name.clone())),
                }
            }
            Backend::Inline { job } => {
                self.result = Some(job(input, &self.suspend));
                Ok(())
            }
        }
    }

    /// Ask the worker to abandon its current job.
    ///
    /// A job that has not started yet is skipped; a running job function may
    /// poll its [`SuspendFlag`]. The handle stays busy until the worker
    /// acknowledges.
    pub fn request_suspend(&mut self) {
        self.suspend.set();
        self.result = None;
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspend.is_set()
    }

    /// Poll until the worker is idle or `timeout` expires.
    ///
    /// Only for teardown and tests; the tick path never waits.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_lock() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Close the job channel and join the worker thread
    pub fn stop(&mut self) {
        if let Backend::Threaded { job_tx, handle, .. } = &mut self.backend {
            self.suspend.set();
            job_tx.take();
            if let Some(handle) = handle.take() {
                if handle.join().is_err() {
                    warn!("worker {} panicked", self.name);
                }
            }
        }
        self.in_flight = false;
    }
}

impl<J, R> Drop for Worker<J, R> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_inline_worker_completes_immediately() {
        let mut worker = Worker::inline("double", |x: i32, _: &SuspendFlag| x * 2);
        assert!(worker.try_lock());
        worker.signal(21).unwrap();
        assert!(worker.try_lock());
        assert_eq!(worker.take_result(), Some(42));
        assert_eq!(worker.take_result(), None);
    }

    #[test]
    fn test_threaded_worker_result_collected_by_try_lock() {
        let mut worker = Worker::spawn("square", |x: i32, _: &SuspendFlag| x * x).unwrap();
        worker.signal(7).unwrap();
        assert!(worker.wait_idle(TIMEOUT));
        assert_eq!(worker.take_result(), Some(49));
    }

    #[test]
    fn test_busy_worker_defers() {
        let (gate_tx, gate_rx) = bounded::<()>(1);
        let mut worker = Worker::spawn("gated", move |x: i32, _: &SuspendFlag| {
            let _ = gate_rx.recv();
            x
        })
        .unwrap();

        worker.signal(1).unwrap();
        assert!(!worker.try_lock());
        assert!(matches!(worker.signal(2), Err(Error::WorkerBusy(_))));

        gate_tx.send(()).unwrap();
        assert!(worker.wait_idle(TIMEOUT));
        assert_eq!(worker.take_result(), Some(1));
    }

    #[test]
    fn test_suspend_is_cooperative() {
        let mut worker = Worker::spawn("spinner", |_: (), flag: &SuspendFlag| {
            while !flag.is_set() {
                thread::sleep(Duration::from_millis(1));
            }
            "suspended"
        })
        .unwrap();

        worker.signal(()).unwrap();
        worker.request_suspend();
        assert!(worker.is_suspended());
        assert!(worker.wait_idle(TIMEOUT));

        // A fresh job clears the request
        worker.signal(()).unwrap();
        assert!(!worker.is_suspended());
        worker.request_suspend();
        assert!(worker.wait_idle(TIMEOUT));
    }

    #[test]
    fn test_stop_joins_thread() {
        let mut worker = Worker::spawn("noop", |x: u8, _: &SuspendFlag| x).unwrap();
        worker.stop();
        assert!(matches!(worker.signal(1), Err(Error::WorkerDisconnected(_))));
    }
}
