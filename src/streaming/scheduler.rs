//! Per-frame chunk streaming scheduler

use glam::Vec3;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::chunk::{Chunk, ChunkEvent, ChunkState};
use super::config::StreamingConfig;
use super::priority::LoadQueue;
use crate::core::{Error, Result};
use crate::pipeline::{ChunkMesh, JobHandle};
use crate::terrain::ChunkCoord;

/// Something that can build chunk meshes asynchronously
pub trait ChunkSource {
    /// Start building `coord`; the handle is polled once per frame
    fn request(&mut self, coord: ChunkCoord) -> JobHandle<ChunkMesh>;
}

/// Snapshot of scheduler bookkeeping
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frame: u64,
    pub viewer_chunk: ChunkCoord,
    pub tracked: usize,
    pub loading: usize,
    pub ready: usize,
    pub pending_removal: usize,
    pub failed: usize,
    pub queued: usize,
    pub dispatched_total: u64,
    pub discarded_total: u64,
    pub removed_total: u64,
}

/// Keeps the chunks around a moving viewer loaded.
///
/// Runs on a single thread and never blocks on chunk builds: every
/// [`update`](Self::update) polls in-flight work, tears down far chunks,
/// queues missing near chunks and dispatches a bounded number of builds.
pub struct ChunkStreamingScheduler<S> {
    config: StreamingConfig,
    chunk_world_size: f32,
    source: S,
    chunks: HashMap<ChunkCoord, Chunk>,
    load_queue: LoadQueue,
    removal_queue: VecDeque<ChunkCoord>,
    viewer_chunk: ChunkCoord,
    frame: u64,
    dispatched_total: u64,
    discarded_total: u64,
    removed_total: u64,
}

impl<S: ChunkSource> ChunkStreamingScheduler<S> {
    pub fn new(config: StreamingConfig, chunk_world_size: f32, source: S) -> Result<Self> {
        config.validate()?;
        if !(chunk_world_size.is_finite() && chunk_world_size > 0.0) {
            return Err(Error::Streaming(format!(
                "chunk world size must be positive, got {chunk_world_size}"
            )));
        }

        Ok(Self {
            config,
            chunk_world_size,
            source,
            chunks: HashMap::new(),
            load_queue: LoadQueue::new(),
            removal_queue: VecDeque::new(),
            viewer_chunk: ChunkCoord::default(),
            frame: 0,
            dispatched_total: 0,
            discarded_total: 0,
            removed_total: 0,
        })
    }

    /// Advance one frame for a viewer at `viewer_pos`
    pub fn update(&mut self, viewer_pos: Vec3) -> Vec<ChunkEvent> {
        self.frame += 1;
        self.viewer_chunk = ChunkCoord::from_world_pos(viewer_pos, self.chunk_world_size);

        let mut events = Vec::new();
        self.poll_tasks(&mut events);
        self.process_removals(&mut events);
        self.stop_far_loads(&mut events);
        self.scan_chunks();
        self.queue_missing();
        self.dispatch();

        log::trace!(
            "Frame {}: viewer {:?}, {} tracked, {} queued, {} events",
            self.frame,
            self.viewer_chunk,
            self.chunks.len(),
            self.load_queue.len(),
            events.len()
        );
        events
    }

    /// Ask for a chunk to be torn down on the next frame.
    ///
    /// Returns `false` if the chunk is not tracked or already on its way out.
    pub fn request_removal(&mut self, coord: ChunkCoord) -> bool {
        match self.chunks.get_mut(&coord) {
            Some(chunk) if !chunk.removal_queued && chunk.state != ChunkState::PendingRemoval => {
                chunk.removal_queued = true;
                self.removal_queue.push_back(coord);
                true
            }
            _ => false,
        }
    }

    /// Dispose of every chunk. In-flight builds are abandoned.
    pub fn clear(&mut self) -> Vec<ChunkEvent> {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort();

        self.chunks.clear();
        self.load_queue.clear();
        self.removal_queue.clear();
        self.removed_total += coords.len() as u64;

        log::debug!("Cleared {} chunks", coords.len());
        coords.into_iter().map(|coord| ChunkEvent::Removed { coord }).collect()
    }

    fn poll_tasks(&mut self, events: &mut Vec<ChunkEvent>) {
        let mut discarded = Vec::new();

        for chunk in self.chunks.values_mut() {
            let Some(result) = chunk.task.as_mut().and_then(|task| task.try_take()) else {
                continue;
            };
            chunk.task = None;

            if chunk.state == ChunkState::PendingRemoval {
                discarded.push(chunk.coord);
                continue;
            }

            match result {
                Ok(mesh) => {
                    let mesh = Arc::new(mesh);
                    chunk.state = ChunkState::Ready;
                    chunk.failed = false;
                    chunk.mesh = Some(Arc::clone(&mesh));
                    events.push(ChunkEvent::Ready { coord: chunk.coord, mesh });
                }
                Err(e) => {
                    log::error!("Chunk {:?} rejected: {e}", chunk.coord);
                    chunk.state = ChunkState::Unloaded;
                    chunk.failed = true;
                }
            }
        }

        for coord in discarded {
            log::debug!("Discarding chunk {coord:?} finished after removal");
            self.discarded_total += 1;
            self.dispose(coord, events);
        }
    }

    fn process_removals(&mut self, events: &mut Vec<ChunkEvent>) {
        while let Some(coord) = self.removal_queue.pop_front() {
            let in_flight = match self.chunks.get_mut(&coord) {
                // Already disposed by a completed build or a stop-load
                None => continue,
                Some(chunk) => {
                    chunk.removal_queued = false;
                    if chunk.is_loading() {
                        chunk.state = ChunkState::PendingRemoval;
                        chunk.mesh = None;
                        true
                    } else {
                        false
                    }
                }
            };

            if in_flight {
                log::debug!("Chunk {coord:?} flagged for removal while loading");
            } else {
                self.dispose(coord, events);
            }
        }
    }

    /// Whether a chunk left the keep radius. The load square itself never does.
    fn out_of_range(&self, coord: ChunkCoord, distance: f32) -> bool {
        coord.chebyshev_distance(self.viewer_chunk) > self.config.near_radius
            && distance > self.config.far_radius
    }

    fn stop_far_loads(&mut self, events: &mut Vec<ChunkEvent>) {
        let viewer = self.viewer_chunk;
        let (near, far) = (self.config.near_radius, self.config.far_radius);
        let stopped = self.load_queue.reprioritize(
            |coord| coord.distance(viewer),
            |request| request.coord.chebyshev_distance(viewer) <= near || request.priority <= far,
        );

        for coord in stopped {
            log::debug!("Stopped loading chunk {coord:?}");
            self.dispose(coord, events);
        }
    }

    fn scan_chunks(&mut self) {
        let viewer = self.viewer_chunk;
        let near = self.config.near_radius;
        let mut leaving = Vec::new();

        for chunk in self.chunks.values_mut() {
            chunk.distance = chunk.coord.distance(viewer);
            chunk.visible = chunk.coord.chebyshev_distance(viewer) <= near;
        }
        for chunk in self.chunks.values() {
            if !chunk.removal_queued
                && chunk.state != ChunkState::PendingRemoval
                && self.out_of_range(chunk.coord, chunk.distance)
            {
                leaving.push(chunk.coord);
            }
        }

        leaving.sort();
        for coord in leaving {
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                chunk.removal_queued = true;
            }
            self.removal_queue.push_back(coord);
        }
    }

    fn queue_missing(&mut self) {
        let viewer = self.viewer_chunk;
        let radius = self.config.near_radius;

        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = viewer.offset(dx, dz);
                if self.chunks.contains_key(&coord) {
                    continue;
                }
                let mut chunk = Chunk::new(coord, coord.distance(viewer));
                chunk.visible = true;
                self.load_queue.push(coord, chunk.distance);
                self.chunks.insert(coord, chunk);
            }
        }
    }

    fn dispatch(&mut self) {
        let mut dispatched = 0;
        while dispatched < self.config.max_dispatch_per_frame {
            let Some(request) = self.load_queue.pop() else {
                break;
            };
            let Some(chunk) = self.chunks.get_mut(&request.coord) else {
                continue;
            };
            if chunk.state != ChunkState::Unloaded || chunk.is_loading() {
                continue;
            }

            log::debug!("Dispatching chunk {:?} at distance {:.2}", request.coord, request.priority);
            chunk.task = Some(self.source.request(request.coord));
            chunk.state = ChunkState::Loading;
            dispatched += 1;
            self.dispatched_total += 1;
        }
    }

    /// Drop a chunk and everything it owns
    fn dispose(&mut self, coord: ChunkCoord, events: &mut Vec<ChunkEvent>) {
        if self.chunks.remove(&coord).is_some() {
            self.load_queue.remove(coord);
            self.removed_total += 1;
            events.push(ChunkEvent::Removed { coord });
        }
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// State of a tracked chunk, `None` once it has been disposed
    pub fn chunk_state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        self.chunks.get(&coord).map(|c| c.state)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn viewer_chunk(&self) -> ChunkCoord {
        self.viewer_chunk
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn stats(&self) -> SchedulerStats {
        let count = |state: ChunkState| self.chunks.values().filter(|c| c.state == state).count();
        SchedulerStats {
            frame: self.frame,
            viewer_chunk: self.viewer_chunk,
            tracked: self.chunks.len(),
            loading: count(ChunkState::Loading),
            ready: count(ChunkState::Ready),
            pending_removal: count(ChunkState::PendingRemoval),
            failed: self.chunks.values().filter(|c| c.failed).count(),
            queued: self.load_queue.len(),
            dispatched_total: self.dispatched_total,
            discarded_total: self.discarded_total,
            removed_total: self.removed_total,
        }
    }
}
