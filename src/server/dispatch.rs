//! Connection dispatch strategies
//!
//! The accept loop hands every accepted connection to a [`Dispatcher`] as a
//! [`Job`]. Inline dispatch runs it on the loop thread, so requests are
//! served one after another; worker dispatch gives each its own thread.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Work for one accepted connection
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs connection jobs for the accept loop
pub trait Dispatcher: Send {
    /// Run or schedule `job`
    fn dispatch(&mut self, job: Job) -> io::Result<()>;

    /// Wait for all scheduled jobs to finish
    fn shutdown(&mut self);
}

/// How a server dispatches accepted connections
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Handle each connection on the accept loop thread
    #[default]
    Inline,
    /// Spawn a thread per connection
    WorkerPerConnection,
}

impl DispatchMode {
    pub fn dispatcher(self) -> Box<dyn Dispatcher> {
        match self {
            DispatchMode::Inline => Box::new(InlineDispatcher),
            DispatchMode::WorkerPerConnection => Box::new(WorkerDispatcher::new()),
        }
    }
}

/// Runs jobs on the calling thread
#[derive(Debug, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&mut self, job: Job) -> io::Result<()> {
        // A panicking job must not take the accept loop down with it
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("connection handler panicked");
        }
        Ok(())
    }

    fn shutdown(&mut self) {}
}

/// Spawns a named thread per job and joins them on shutdown
#[derive(Debug, Default)]
pub struct WorkerDispatcher {
    workers: Vec<JoinHandle<()>>,
    spawned: usize,
}

impl WorkerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers not yet joined
    pub fn pending(&self) -> usize {
        self.workers.len()
    }

    fn reap_finished(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.workers.drain(..).partition(|handle| handle.is_finished());
        self.workers = running;
        for handle in finished {
            join_worker(handle);
        }
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("connection worker panicked");
    }
}

impl Dispatcher for WorkerDispatcher {
    fn dispatch(&mut self, job: Job) -> io::Result<()> {
        self.reap_finished();

        self.spawned += 1;
        let handle = thread::Builder::new()
            .name(format!("mock-http-worker-{}", self.spawned))
            .spawn(job)?;
        self.workers.push(handle);
        Ok(())
    }

    fn shutdown(&mut self) {
        for handle in self.workers.drain(..) {
            join_worker(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = Arc::clone(counter);
        Box::new(move || {
            thread::sleep(Duration::from_millis(20));
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_inline_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = DispatchMode::Inline.dispatcher();
        dispatcher.dispatch(counting_job(&counter)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inline_survives_panic() {
        let mut dispatcher = InlineDispatcher;
        dispatcher.dispatch(Box::new(|| panic!("boom"))).unwrap();
    }

    #[test]
    fn test_worker_shutdown_joins_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = WorkerDispatcher::new();
        for _ in 0..4 {
            dispatcher.dispatch(counting_job(&counter)).unwrap();
        }
        dispatcher.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(dispatcher.pending(), 0);
    }
}
