//! Load queue ordered by distance to the viewer

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::terrain::ChunkCoord;

/// A queued load, lower priority values are served first
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadRequest {
    pub coord: ChunkCoord,
    pub priority: f32,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    request: LoadRequest,
    /// Insertion order, breaks priority ties
    seq: u64,
}

impl Entry {
    fn order(&self, other: &Self) -> Ordering {
        self.request
            .priority
            .total_cmp(&other.request.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Indexed binary min-heap keyed by chunk coordinate.
///
/// Each coordinate appears at most once, and its priority can be changed or
/// the entry removed in O(log n).
#[derive(Debug, Default)]
pub struct LoadQueue {
    heap: Vec<Entry>,
    positions: HashMap<ChunkCoord, usize>,
    next_seq: u64,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.positions.contains_key(&coord)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
    }

    /// Queue a load; an already queued coordinate just gets the new priority.
    ///
    /// Returns `true` if the coordinate was not queued before.
    pub fn push(&mut self, coord: ChunkCoord, priority: f32) -> bool {
        if self.update(coord, priority) {
            return false;
        }

        let entry = Entry {
            request: LoadRequest { coord, priority },
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.heap.push(entry);
        let index = self.heap.len() - 1;
        self.positions.insert(coord, index);
        self.sift_up(index);
        true
    }

    pub fn peek(&self) -> Option<LoadRequest> {
        self.heap.first().map(|e| e.request)
    }

    /// Closest queued load
    pub fn pop(&mut self) -> Option<LoadRequest> {
        self.remove_at(0)
    }

    /// Drop a queued coordinate, `None` if it was not queued
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<LoadRequest> {
        let index = *self.positions.get(&coord)?;
        self.remove_at(index)
    }

    /// Change a queued coordinate's priority, `false` if it is not queued
    pub fn update(&mut self, coord: ChunkCoord, priority: f32) -> bool {
        let Some(&index) = self.positions.get(&coord) else {
            return false;
        };
        let old = self.heap[index].request.priority;
        self.heap[index].request.priority = priority;
        match priority.total_cmp(&old) {
            Ordering::Less => self.sift_up(index),
            Ordering::Greater => self.sift_down(index),
            Ordering::Equal => {}
        }
        true
    }

    /// Recompute every priority, removing entries `keep` rejects.
    ///
    /// Returns the removed coordinates.
    pub fn reprioritize(
        &mut self,
        mut priority_of: impl FnMut(ChunkCoord) -> f32,
        mut keep: impl FnMut(&LoadRequest) -> bool,
    ) -> Vec<ChunkCoord> {
        let mut dropped = Vec::new();
        self.heap.retain_mut(|entry| {
            entry.request.priority = priority_of(entry.request.coord);
            if !keep(&entry.request) {
                dropped.push(entry.request.coord);
                false
            } else {
                true
            }
        });

        self.positions.clear();
        for (i, entry) in self.heap.iter().enumerate() {
            self.positions.insert(entry.request.coord, i);
        }
        for i in (0..self.heap.len() / 2).rev() {
            self.sift_down(i);
        }
        dropped
    }

    /// Queued requests in no particular order
    pub fn iter(&self) -> impl Iterator<Item = LoadRequest> + '_ {
        self.heap.iter().map(|e| e.request)
    }

    fn remove_at(&mut self, index: usize) -> Option<LoadRequest> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(index, last);
        let removed = self.heap.pop()?.request;
        self.positions.remove(&removed.coord);

        if index < self.heap.len() {
            self.sift_down(index);
            self.sift_up(index);
        }
        Some(removed)
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].request.coord, a);
        self.positions.insert(self.heap[b].request.coord, b);
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.heap[a].order(&self.heap[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < self.heap.len() && self.less(left, smallest) {
                smallest = left;
            }
            if right < self.heap.len() && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }
}
