//! Chunk column sampling.
//!
//! A host generates terrain one chunk at a time and needs the biome and the
//! total height of every column in it. [`OrientedSampler::sample_chunk`]
//! fills that grid from one pinned generation; [`AsyncColumnSampler`] runs it
//! on a worker pool, supports cancellation, and delivers finished chunks via
//! a bounded channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;

use crate::cache::ChunkPosition;
use crate::definition::{BiomeClass, BiomeDef, Orientation};
use crate::sampler::{BiomeSampler, OrientedSampler};

/// Width of a chunk in columns, along both axes.
pub const CHUNK_SIZE: usize = 16;

/// Biome and height of one column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSample {
    pub biome: Arc<BiomeDef>,
    pub class: BiomeClass,
    pub height: f64,
}

/// The `CHUNK_SIZE * CHUNK_SIZE` columns of one chunk, row-major in z.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkColumns {
    /// Chunk coordinate (block coordinate divided by [`CHUNK_SIZE`]).
    pub chunk: ChunkPosition,
    /// Epoch of the generation every column was sampled from.
    pub epoch: u64,
    columns: Vec<ColumnSample>,
}

impl ChunkColumns {
    /// Column at local coordinates, `None` outside the chunk.
    pub fn get(&self, lx: usize, lz: usize) -> Option<&ColumnSample> {
        if lx >= CHUNK_SIZE || lz >= CHUNK_SIZE {
            return None;
        }
        self.columns.get(lz * CHUNK_SIZE + lx)
    }

    pub fn columns(&self) -> &[ColumnSample] {
        &self.columns
    }

    /// Block coordinate of the column at local `(0, 0)`.
    pub fn origin(&self) -> (f64, f64) {
        chunk_origin(self.chunk)
    }
}

fn chunk_origin(chunk: ChunkPosition) -> (f64, f64) {
    let size = CHUNK_SIZE as f64;
    (f64::from(chunk.x) * size, f64::from(chunk.z) * size)
}

impl OrientedSampler {
    /// Sample every column of `chunk`.
    pub fn sample_chunk(&self, chunk: ChunkPosition) -> ChunkColumns {
        let (base_x, base_z) = chunk_origin(chunk);
        let mut columns = Vec::with_capacity(CHUNK_SIZE * CHUNK_SIZE);
        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let x = base_x + lx as f64;
                let z = base_z + lz as f64;
                let result = self.biome(x, z);
                columns.push(ColumnSample {
                    class: result.class(),
                    biome: Arc::clone(result.biome()),
                    height: self.total_height(x, z),
                });
            }
        }
        ChunkColumns {
            chunk,
            epoch: self.epoch(),
            columns,
        }
    }
}

/// A request to sample one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColumnTask {
    pub chunk: ChunkPosition,
    pub orientation: Orientation,
}

/// A sampled chunk ready for terrain placement.
#[derive(Debug)]
pub struct SampledChunk {
    pub orientation: Orientation,
    pub columns: ChunkColumns,
    /// Sampling time in microseconds (for profiling).
    pub sample_time_us: u64,
    cancelled: Arc<AtomicBool>,
}

struct QueuedTask {
    task: ColumnTask,
    cancelled: Arc<AtomicBool>,
}

/// Samples chunks on a pool of worker threads.
pub struct AsyncColumnSampler {
    sampler: Arc<BiomeSampler>,
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<SampledChunk>,
    /// Cancellation flag per pending task.
    active_tasks: Arc<DashMap<ColumnTask, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicU64>,
}

impl AsyncColumnSampler {
    /// Spawn `thread_count` workers over `sampler`.
    ///
    /// At most `max_concurrent * 2` tasks queue up before `submit` rejects;
    /// `result_capacity` bounds the finished chunks awaiting `drain_results`.
    pub fn new(
        sampler: Arc<BiomeSampler>,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> std::io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<QueuedTask>(max_concurrent * 2);
        let (result_sender, result_receiver) = bounded::<SampledChunk>(result_capacity);
        let active_tasks: Arc<DashMap<ColumnTask, Arc<AtomicBool>>> = Arc::new(DashMap::new());
        let in_flight = Arc::new(AtomicU64::new(0));

        for _ in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let sampler = Arc::clone(&sampler);
            let active_tasks = Arc::clone(&active_tasks);
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name("column-sampler".into())
                .spawn(move || {
                    while let Ok(queued) = receiver.recv() {
                        if queued.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let Some(oriented) = sampler.oriented(queued.task.orientation) else {
                            active_tasks.remove_if(&queued.task, |_, flag| {
                                Arc::ptr_eq(flag, &queued.cancelled)
                            });
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        };

                        let start = std::time::Instant::now();
                        let columns = oriented.sample_chunk(queued.task.chunk);
                        let elapsed = start.elapsed().as_micros() as u64;

                        if !queued.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(SampledChunk {
                                orientation: queued.task.orientation,
                                columns,
                                sample_time_us: elapsed,
                                cancelled: queued.cancelled,
                            });
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })?;
        }

        Ok(Self {
            sampler,
            task_sender,
            result_receiver,
            active_tasks,
            in_flight,
        })
    }

    /// Create a pool sized from the CPU count, leaving two cores free.
    pub fn with_defaults(sampler: Arc<BiomeSampler>) -> std::io::Result<Self> {
        let cpus = num_cpus::get().max(2);
        Self::new(sampler, (cpus - 2).max(1), 64, 128)
    }

    /// Queue a chunk for sampling.
    ///
    /// Returns the task back if the queue is full or no dimension is
    /// configured for its orientation.
    pub fn submit(&self, task: ColumnTask) -> Result<(), ColumnTask> {
        if self.sampler.oriented(task.orientation).is_none() {
            return Err(task);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_tasks.insert(task, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.task_sender
            .try_send(QueuedTask { task, cancelled })
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                let task = e.into_inner().task;
                self.active_tasks.remove(&task);
                task
            })
    }

    /// Cancel a pending or running task. Its result, if already sampled, is
    /// dropped by the next `drain_results`. No-op once drained.
    pub fn cancel(&self, task: &ColumnTask) {
        if let Some((_, cancelled)) = self.active_tasks.remove(task) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Take every finished chunk without blocking.
    pub fn drain_results(&self) -> Vec<SampledChunk> {
        let mut results = Vec::new();
        while let Ok(chunk) = self.result_receiver.try_recv() {
            if let Some(chunk) = self.settle(chunk) {
                results.push(chunk);
            }
        }
        results
    }

    /// Retire the pending entry of a finished chunk.
    ///
    /// Results of cancelled submissions are dropped and leave a resubmission
    /// of the same task pending.
    fn settle(&self, chunk: SampledChunk) -> Option<SampledChunk> {
        let task = ColumnTask {
            chunk: chunk.columns.chunk,
            orientation: chunk.orientation,
        };
        if chunk.cancelled.load(Ordering::Relaxed) {
            return None;
        }
        self.active_tasks
            .remove_if(&task, |_, flag| Arc::ptr_eq(flag, &chunk.cancelled));
        Some(chunk)
    }

    /// Tasks queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if the task is submitted and not yet drained or cancelled.
    pub fn is_pending(&self, task: &ColumnTask) -> bool {
        self.active_tasks.contains_key(task)
    }
}
