//! # Task Management System
//!
//! A fixed pool of polling worker threads.
//!
//! There is no task queue. Each worker repeatedly calls one shared callback with
//! its own worker id, then sleeps for a fixed interval, until the pool is stopped.
//! The callback decides what to do on each call, typically by walking the chunks
//! `partition` assigns to that worker id. Because every chunk belongs to exactly
//! one worker, two workers never edit the same chunk and no work is ever handed
//! between threads.
//!
//! ## Lifecycle
//! 1. `ThreadPool::new` stores the callback; no thread is spawned yet
//! 2. `start` spawns `num_threads` workers (a no-op while already running)
//! 3. `stop(true)` clears the running flag and joins every worker;
//!    `stop(false)` clears the flag and returns immediately
//! 4. `start` may be called again after `stop`
//!
//! ## Failure Model
//! A panicking callback takes down its own worker only. The panic is logged when
//! the worker is joined; the rest of the pool keeps running.
//!
//! ## Example Usage
//! ```
//! use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};
//! use std::time::Duration;
//! use voxel_world::engine_state::task_management::ThreadPool;
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! let mut pool = ThreadPool::new(
//!     2,
//!     Arc::new(move |_worker_id| {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     }),
//!     Duration::from_millis(1),
//! );
//!
//! pool.start();
//! while calls.load(Ordering::Relaxed) < 4 {
//!     std::thread::yield_now();
//! }
//! pool.stop(true);
//! assert!(!pool.running());
//! ```

mod partition;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{error, info};

pub use partition::{partition, worker_for};

/// Work run repeatedly by every worker, given the worker's id.
pub type WorkerCallback = Arc<dyn Fn(usize) + Send + Sync + 'static>;

/// Fixed-size pool of polling worker threads.
pub struct ThreadPool {
    num_threads: usize,
    callback: WorkerCallback,
    sleep: Duration,
    /// Running flag of the current generation of workers. Replaced on every
    /// `start`, so workers detached by `stop(false)` never see a later restart.
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Creates a stopped pool.
    ///
    /// # Arguments
    /// * `num_threads` - Number of workers `start` spawns
    /// * `callback` - Called as `callback(worker_id)` in a loop by every worker
    /// * `sleep` - Pause after each callback invocation
    pub fn new(num_threads: usize, callback: WorkerCallback, sleep: Duration) -> Self {
        ThreadPool {
            num_threads,
            callback,
            sleep,
            running: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        }
    }

    /// Number of workers the pool runs.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// `true` between `start` and `stop`.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the workers if the pool is not already running.
    pub fn start(&mut self) {
        if self.running() {
            return;
        }
        // Handles left over from a `stop(false)` belong to detached workers.
        self.workers.clear();

        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();

        for worker_id in 0..self.num_threads {
            let running = running.clone();
            let callback = self.callback.clone();
            let sleep = self.sleep;
            let spawned = thread::Builder::new()
                .name(format!("chunk-worker-{worker_id}"))
                .spawn(move || {
                    while running.load(Ordering::Acquire) {
                        callback(worker_id);
                        thread::sleep(sleep);
                    }
                });
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => error!("Could not spawn worker {worker_id}: {e}"),
            }
        }
        info!(
            "Thread pool started: {} workers, {:?} poll interval",
            self.workers.len(),
            self.sleep
        );
    }

    /// Asks every worker to exit after its current callback.
    ///
    /// # Arguments
    /// * `join` - Wait for every worker to return before returning
    pub fn stop(&mut self, join: bool) {
        self.running.store(false, Ordering::Release);
        if !join {
            info!("Thread pool stopping ({} workers detached)", self.workers.len());
            return;
        }
        for (worker_id, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_err() {
                error!("Worker {worker_id} panicked");
            }
        }
        info!("Thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop(true);
    }
}
