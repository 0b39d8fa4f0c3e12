/// Allocates and recycles `ViewId`s.
///
/// Ids are dense so per-view arenas can be plain vectors. A freed id is
/// handed out again only after its view is fully removed, and the lowest
/// free id is always reused first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use crate::view::ViewId;

#[derive(Debug, Default)]
pub struct ViewIdAllocator {
    free_list: BinaryHeap<Reverse<u32>>,
    next_id: u32,
    len: u32,
}

impl ViewIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> ViewId {
        self.len += 1;
        match self.free_list.pop() {
            Some(Reverse(id)) => ViewId(id),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                ViewId(id)
            }
        }
    }

    /// Return an id to the pool
    pub fn free(&mut self, id: ViewId) {
        debug_assert!(id.0 < self.next_id, "freeing an unallocated view id: {}", id.0);
        self.len -= 1;
        self.free_list.push(Reverse(id.0));
    }

    /// Highest id ever allocated + 1, the length per-view arenas need
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Ids currently held by live or retiring views
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
#[path = "view_ids_tests.rs"]
mod tests;
