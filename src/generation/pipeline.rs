//! Off-thread terrain generation with a single-threaded completion drain.
//!
//! Requests run on a bounded rayon pool. A worker computes its result
//! without touching shared state, then pushes a completion record onto one
//! mutex-guarded queue. Callbacks never run on workers: [`GenerationPipeline::drain`]
//! invokes them in arrival order on whichever thread owns the context `C`.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::core::types::Vec2;
use crate::core::{Error, Result};
use crate::generation::config::TerrainConfig;
use crate::generation::map::{MapData, MapGenerator};
use crate::mesh::MeshData;
use crate::terrain::HeightField;

/// What a dispatched task computes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TaskKind {
    HeightData { center: Vec2 },
    MeshData { lod: u32 },
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::HeightData { center } => write!(f, "height data at ({}, {})", center.x, center.y),
            TaskKind::MeshData { lod } => write!(f, "mesh data at LOD {}", lod),
        }
    }
}

/// Counters for dispatched and finished work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub height_requests: u64,
    pub mesh_requests: u64,
    pub completed: u64,
    pub failed: u64,
}

/// A finished task waiting for the drain
struct Completion<C> {
    task: TaskKind,
    /// `Some` when the task failed; the callback still receives the error
    error: Option<String>,
    deliver: Box<dyn FnOnce(&mut C) + Send>,
}

struct QueueState<C> {
    completions: VecDeque<Completion<C>>,
    in_flight: usize,
    stats: PipelineStats,
}

struct Shared<C> {
    state: Mutex<QueueState<C>>,
    idle: Condvar,
}

impl<C> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, QueueState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, completion: Completion<C>) {
        {
            let mut state = self.lock();
            if completion.error.is_some() {
                state.stats.failed += 1;
            } else {
                state.stats.completed += 1;
            }
            state.completions.push_back(completion);
            state.in_flight -= 1;
        }
        self.idle.notify_all();
    }
}

/// Async generation front-end, generic over the context its callbacks mutate.
///
/// Cloning is cheap and every clone feeds the same queue.
pub struct GenerationPipeline<C> {
    generator: Arc<MapGenerator>,
    pool: Arc<ThreadPool>,
    shared: Arc<Shared<C>>,
}

impl<C> Clone for GenerationPipeline<C> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            pool: Arc::clone(&self.pool),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: 'static> GenerationPipeline<C> {
    /// Create a pipeline with `worker_threads` workers, or one per hardware
    /// thread when `None`
    pub fn new(generator: MapGenerator, worker_threads: Option<usize>) -> Result<Self> {
        let threads = worker_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("terrain-gen-{}", i))
            .build()
            .map_err(|e| Error::Generation(format!("failed to start worker pool: {}", e)))?;

        log::debug!("Generation pipeline started with {} workers", threads);

        Ok(Self {
            generator: Arc::new(generator),
            pool: Arc::new(pool),
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    completions: VecDeque::new(),
                    in_flight: 0,
                    stats: PipelineStats::default(),
                }),
                idle: Condvar::new(),
            }),
        })
    }

    /// Create a pipeline from a validated configuration
    pub fn from_config(config: TerrainConfig) -> Result<Self> {
        let threads = config.streaming.worker_threads;
        Self::new(MapGenerator::new(config), threads)
    }

    pub fn generator(&self) -> &MapGenerator {
        &self.generator
    }

    /// Generate height and color maps for the chunk centered at `center`
    pub fn request_height_data<F>(&self, center: Vec2, on_complete: F)
    where
        F: FnOnce(&mut C, Result<MapData>) + Send + 'static,
    {
        self.dispatch(
            TaskKind::HeightData { center },
            move |generator| Ok(generator.generate_map_data(center)),
            on_complete,
        );
    }

    /// Build the mesh for `height_map` at `lod`
    pub fn request_mesh_data<F>(&self, height_map: Arc<HeightField>, lod: u32, on_complete: F)
    where
        F: FnOnce(&mut C, Result<MeshData>) + Send + 'static,
    {
        self.dispatch(
            TaskKind::MeshData { lod },
            move |generator| generator.generate_mesh_data(&height_map, lod),
            on_complete,
        );
    }

    /// Run `job` on a worker and queue its result for the next drain.
    ///
    /// Panics inside `job` are caught and delivered as
    /// [`Error::WorkerPanicked`].
    pub(crate) fn dispatch<T, J, F>(&self, task: TaskKind, job: J, on_complete: F)
    where
        T: Send + 'static,
        J: FnOnce(&MapGenerator) -> Result<T> + Send + 'static,
        F: FnOnce(&mut C, Result<T>) + Send + 'static,
    {
        {
            let mut state = self.shared.lock();
            state.in_flight += 1;
            match task {
                TaskKind::HeightData { .. } => state.stats.height_requests += 1,
                TaskKind::MeshData { .. } => state.stats.mesh_requests += 1,
            }
        }
        log::debug!("Dispatching {}", task);

        let generator = Arc::clone(&self.generator);
        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let result = match panic::catch_unwind(AssertUnwindSafe(|| job(&generator))) {
                Ok(result) => result,
                Err(payload) => Err(Error::WorkerPanicked(panic_message(payload.as_ref()))),
            };
            let error = result.as_ref().err().map(|e| e.to_string());
            shared.push(Completion {
                task,
                error,
                deliver: Box::new(move |ctx: &mut C| on_complete(ctx, result)),
            });
        });
    }

    /// Invoke every queued callback in arrival order. Returns how many ran.
    ///
    /// Must be called from the thread that owns `ctx`. Completions that
    /// arrive while draining wait for the next call. If a callback panics,
    /// the completions not yet run go back to the front of the queue before
    /// the panic resumes.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let mut pending = std::mem::take(&mut self.shared.lock().completions);
        let mut count = 0;

        while let Some(completion) = pending.pop_front() {
            match &completion.error {
                Some(error) => log::warn!("{} failed: {}", completion.task, error),
                None => log::trace!("Delivering {}", completion.task),
            }
            let task = completion.task;
            let deliver = completion.deliver;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| deliver(&mut *ctx))) {
                log::error!("Callback for {} panicked; requeueing {} completions", task, pending.len());
                let mut state = self.shared.lock();
                while let Some(rest) = pending.pop_back() {
                    state.completions.push_front(rest);
                }
                drop(state);
                panic::resume_unwind(payload);
            }
            count += 1;
        }
        count
    }

    /// Block until no task is running or `timeout` elapses.
    ///
    /// Returns `true` once every dispatched task has been queued.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.in_flight > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .idle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        true
    }

    /// Tasks dispatched but not yet queued
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    /// Completions waiting for a drain
    pub fn pending_completions(&self) -> usize {
        self.shared.lock().completions.len()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.lock().stats
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
