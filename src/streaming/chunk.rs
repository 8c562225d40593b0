//! Per-chunk streaming state

use std::sync::Arc;

use crate::pipeline::{ChunkMesh, JobHandle};
use crate::terrain::ChunkCoord;

/// Lifecycle of a streamed chunk.
///
/// A chunk leaves the scheduler entirely once disposed, so there is no
/// variant for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Tracked but no work in flight (queued, or failed to build)
    Unloaded,
    /// Build dispatched
    Loading,
    /// Mesh applied
    Ready,
    /// Removal requested while building; the result will be discarded
    PendingRemoval,
}

/// Notification for renderers and physics
#[derive(Clone, Debug)]
pub enum ChunkEvent {
    /// Mesh is ready to upload and attach collision
    Ready { coord: ChunkCoord, mesh: Arc<ChunkMesh> },
    /// Everything attached to the chunk can be destroyed
    Removed { coord: ChunkCoord },
}

impl ChunkEvent {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Self::Ready { coord, .. } | Self::Removed { coord } => *coord,
        }
    }
}

/// A chunk tracked by the scheduler
#[derive(Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub state: ChunkState,
    /// Euclidean chunk distance to the viewer at the last scan
    pub distance: f32,
    /// Inside the load square at the last scan
    pub visible: bool,
    pub mesh: Option<Arc<ChunkMesh>>,
    /// Last build failed; not retried while the chunk stays tracked
    pub failed: bool,
    pub(crate) task: Option<JobHandle<ChunkMesh>>,
    pub(crate) removal_queued: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, distance: f32) -> Self {
        Self {
            coord,
            state: ChunkState::Unloaded,
            distance,
            visible: false,
            mesh: None,
            failed: false,
            task: None,
            removal_queued: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.task.is_some()
    }
}
