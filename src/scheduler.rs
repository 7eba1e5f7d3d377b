//! The update scheduler.
//!
//! Invalidated components wait in one FIFO queue per depth. A flush always takes the next
//! component from the shallowest non-empty queue and re-checks after every single update, so
//! components invalidated while flushing are still handled in the same flush and parents are
//! always updated before their children.

use crate::component::ComponentId;
use crate::document::Document;
use crate::error::Error;
use crate::runtime::Runtime;
use core::fmt;
use std::collections::{HashSet, VecDeque};

/// A one-shot callback run by the next flush.
pub type FrameTask<D> =
    Box<dyn FnOnce(&mut Runtime<D>) -> Result<(), Error<<D as Document>::Error>>>;

/// Depth-ordered queue of components waiting for an update, plus per-frame task lists.
pub struct Scheduler<D: Document> {
    /// Queues indexed by depth; grown lazily.
    queues: Vec<VecDeque<ComponentId>>,
    /// Everything currently in a queue.
    pending: HashSet<ComponentId>,
    /// No queue below this depth is non-empty.
    lowest: usize,
    flushing: bool,
    frame_requested: bool,
    before_write: Vec<FrameTask<D>>,
    after_write: Vec<FrameTask<D>>,
}

impl<D: Document> Scheduler<D> {
    pub fn new() -> Scheduler<D> {
        Scheduler {
            queues: Vec::new(),
            pending: HashSet::new(),
            lowest: 0,
            flushing: false,
            frame_requested: false,
            before_write: Vec::new(),
            after_write: Vec::new(),
        }
    }

    /// Adds a component to the queue for its depth.
    ///
    /// Returns false if it was already queued.
    pub fn enqueue(&mut self, id: ComponentId, depth: usize) -> bool {
        if !self.pending.insert(id) {
            return false;
        }
        if self.queues.len() <= depth {
            self.queues.resize_with(depth + 1, VecDeque::new);
        }
        self.queues[depth].push_back(id);
        self.lowest = self.lowest.min(depth);
        true
    }

    /// Removes a component from its queue. Returns false if it wasn’t queued.
    pub fn remove(&mut self, id: ComponentId, depth: usize) -> bool {
        if !self.pending.remove(&id) {
            return false;
        }
        if let Some(queue) = self.queues.get_mut(depth) {
            queue.retain(|i| *i != id);
        }
        true
    }

    /// Takes the first component from the shallowest non-empty queue.
    pub fn pop(&mut self) -> Option<ComponentId> {
        while self.lowest < self.queues.len() {
            if let Some(id) = self.queues[self.lowest].pop_front() {
                self.pending.remove(&id);
                return Some(id);
            }
            self.lowest += 1;
        }
        // everything is empty; start from the top again next time
        self.lowest = 0;
        None
    }

    /// Number of queued components.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_queued(&self, id: ComponentId) -> bool {
        self.pending.contains(&id)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// If true, a flush would have something to do.
    pub fn has_work(&self) -> bool {
        !self.pending.is_empty() || !self.before_write.is_empty() || !self.after_write.is_empty()
    }

    /// Marks a frame as requested.
    ///
    /// Returns true if the caller should actually request one: no frame is pending and no flush
    /// is running (a running flush picks the work up itself).
    pub(crate) fn request_frame(&mut self) -> bool {
        if self.flushing || self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    /// Returns false if a flush is already running.
    pub(crate) fn begin_flush(&mut self) -> bool {
        if self.flushing {
            return false;
        }
        self.flushing = true;
        self.frame_requested = false;
        true
    }

    pub(crate) fn end_flush(&mut self) {
        self.flushing = false;
    }

    pub(crate) fn push_before_write(&mut self, task: FrameTask<D>) {
        self.before_write.push(task);
    }

    pub(crate) fn push_after_write(&mut self, task: FrameTask<D>) {
        self.after_write.push(task);
    }

    pub(crate) fn take_before_write(&mut self) -> Vec<FrameTask<D>> {
        std::mem::replace(&mut self.before_write, Vec::new())
    }

    pub(crate) fn take_after_write(&mut self) -> Vec<FrameTask<D>> {
        std::mem::replace(&mut self.after_write, Vec::new())
    }

    /// Puts tasks back in front of any that were added since they were taken.
    pub(crate) fn restore_before_write(&mut self, mut tasks: Vec<FrameTask<D>>) {
        tasks.append(&mut self.before_write);
        self.before_write = tasks;
    }

    pub(crate) fn restore_after_write(&mut self, mut tasks: Vec<FrameTask<D>>) {
        tasks.append(&mut self.after_write);
        self.after_write = tasks;
    }

    /// Clears all queues, tasks and flags.
    pub fn reset(&mut self) {
        self.queues.clear();
        self.pending.clear();
        self.lowest = 0;
        self.flushing = false;
        self.frame_requested = false;
        self.before_write.clear();
        self.after_write.clear();
    }
}

impl<D: Document> Default for Scheduler<D> {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl<D: Document> fmt::Debug for Scheduler<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queues", &self.queues)
            .field("flushing", &self.flushing)
            .field("frame_requested", &self.frame_requested)
            .field("before_write", &self.before_write.len())
            .field("after_write", &self.after_write.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    #[test]
    fn pops_shallowest_first_then_fifo() {
        let mut scheduler = Scheduler::<MemoryDocument>::new();
        let ids: Vec<_> = (0..4).map(|_| ComponentId::new()).collect();

        assert!(scheduler.enqueue(ids[0], 2));
        assert!(scheduler.enqueue(ids[1], 1));
        assert!(scheduler.enqueue(ids[2], 2));
        assert!(scheduler.enqueue(ids[3], 0));
        assert!(!scheduler.enqueue(ids[1], 1), "second enqueue is a no-op");
        assert_eq!(scheduler.len(), 4);

        let order: Vec<_> = std::iter::from_fn(|| scheduler.pop()).collect();
        assert_eq!(order, vec![ids[3], ids[1], ids[0], ids[2]]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn enqueue_below_cursor_is_seen() {
        let mut scheduler = Scheduler::<MemoryDocument>::new();
        let deep = ComponentId::new();
        let shallow = ComponentId::new();
        let deeper = ComponentId::new();

        scheduler.enqueue(deep, 3);
        assert_eq!(scheduler.pop(), Some(deep));
        scheduler.enqueue(deeper, 4);
        scheduler.enqueue(shallow, 1);
        assert_eq!(scheduler.pop(), Some(shallow));
        assert_eq!(scheduler.pop(), Some(deeper));
        assert_eq!(scheduler.pop(), None);
    }

    #[test]
    fn remove_drops_pending_component() {
        let mut scheduler = Scheduler::<MemoryDocument>::new();
        let a = ComponentId::new();
        let b = ComponentId::new();
        scheduler.enqueue(a, 0);
        scheduler.enqueue(b, 0);
        assert!(scheduler.remove(a, 0));
        assert!(!scheduler.remove(a, 0));
        assert!(!scheduler.is_queued(a));
        assert_eq!(scheduler.pop(), Some(b));
        assert_eq!(scheduler.pop(), None);
    }

    #[test]
    fn frame_requests_coalesce() {
        let mut scheduler = Scheduler::<MemoryDocument>::new();
        assert!(scheduler.request_frame());
        assert!(!scheduler.request_frame());
        assert!(scheduler.begin_flush());
        assert!(!scheduler.begin_flush(), "flushes do not nest");
        assert!(!scheduler.request_frame(), "folded into the running flush");
        scheduler.end_flush();
        assert!(scheduler.request_frame());

        scheduler.reset();
        assert!(!scheduler.is_frame_requested());
    }
}
