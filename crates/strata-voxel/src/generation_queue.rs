//! Deduplicated, nearest-first queue of chunks awaiting terrain generation.
//!
//! A position is accepted at most once while it is queued or being generated,
//! so repeated requests for the same chunk do not grow the queue. The queue
//! is shared between the chunk manager (producer) and the generation workers
//! (consumers) behind a single mutex.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::coords::ChunkPos;

#[derive(Debug, Default)]
struct QueueState {
    /// Min-heap: `(priority, pos)`. May contain cancelled entries.
    heap: BinaryHeap<Reverse<(i64, ChunkPos)>>,
    /// Positions waiting in the heap (dedup guard).
    queued: FxHashSet<ChunkPos>,
    /// Positions handed to a worker and not yet finished.
    in_progress: FxHashSet<ChunkPos>,
}

/// Thread-safe generation work queue.
#[derive(Debug, Default)]
pub struct GenerationQueue {
    state: Mutex<QueueState>,
}

impl GenerationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests generation of `pos`; lower `priority` is served first.
    ///
    /// Returns `false` if `pos` is already queued or in progress.
    pub fn request(&self, pos: ChunkPos, priority: i64) -> bool {
        let mut state = self.state.lock();
        if state.in_progress.contains(&pos) || !state.queued.insert(pos) {
            return false;
        }
        state.heap.push(Reverse((priority, pos)));
        true
    }

    /// Takes the highest-priority position and marks it in progress.
    pub fn pop(&self) -> Option<ChunkPos> {
        let mut state = self.state.lock();
        while let Some(Reverse((_, pos))) = state.heap.pop() {
            if state.queued.remove(&pos) {
                state.in_progress.insert(pos);
                return Some(pos);
            }
            // Cancelled while queued; skip it.
        }
        None
    }

    /// Marks an in-progress position as done (successfully or not).
    pub fn finish(&self, pos: ChunkPos) {
        self.state.lock().in_progress.remove(&pos);
    }

    /// Withdraws a queued request. In-progress work is not interrupted.
    ///
    /// Returns `true` if a queued request was removed.
    pub fn cancel(&self, pos: ChunkPos) -> bool {
        self.state.lock().queued.remove(&pos)
    }

    /// Whether `pos` is queued or being generated.
    pub fn is_pending(&self, pos: ChunkPos) -> bool {
        let state = self.state.lock();
        state.queued.contains(&pos) || state.in_progress.contains(&pos)
    }

    /// Number of queued (not yet started) requests.
    pub fn len(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of positions currently being generated.
    pub fn in_progress(&self) -> usize {
        self.state.lock().in_progress.len()
    }

    /// Drops every queued request. In-progress bookkeeping is kept so that
    /// running workers can still call [`GenerationQueue::finish`].
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.heap.clear();
        state.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32) -> ChunkPos {
        ChunkPos::new(x, 0, 0)
    }

    #[test]
    fn test_pops_nearest_first() {
        let queue = GenerationQueue::new();
        queue.request(pos(5), 25);
        queue.request(pos(2), 4);
        queue.request(pos(8), 64);
        queue.request(pos(1), 1);

        let order: Vec<i32> = std::iter::from_fn(|| queue.pop()).map(|p| p.x).collect();
        assert_eq!(order, vec![1, 2, 5, 8]);
    }

    #[test]
    fn test_duplicate_requests_ignored() {
        let queue = GenerationQueue::new();
        assert!(queue.request(pos(1), 1));
        assert!(!queue.request(pos(1), 0));
        assert_eq!(queue.len(), 1);

        let popped = queue.pop().unwrap();
        // in progress: still rejected
        assert!(!queue.request(popped, 0));
        assert!(queue.is_pending(popped));

        queue.finish(popped);
        assert!(!queue.is_pending(popped));
        assert!(queue.request(popped, 0));
    }

    #[test]
    fn test_cancel_skips_entry() {
        let queue = GenerationQueue::new();
        queue.request(pos(1), 1);
        queue.request(pos(2), 2);
        assert!(queue.cancel(pos(1)));
        assert!(!queue.cancel(pos(1)));
        assert_eq!(queue.pop(), Some(pos(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_cancel_then_request_again() {
        let queue = GenerationQueue::new();
        queue.request(pos(3), 9);
        queue.cancel(pos(3));
        assert!(queue.request(pos(3), 1));
        assert_eq!(queue.pop(), Some(pos(3)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_clear_keeps_in_progress() {
        let queue = GenerationQueue::new();
        queue.request(pos(1), 1);
        queue.request(pos(2), 2);
        let running = queue.pop().unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.in_progress(), 1);
        queue.finish(running);
        assert_eq!(queue.in_progress(), 0);
    }
}
