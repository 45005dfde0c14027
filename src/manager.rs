//! # Buffer Manager
//!
//! Ties the volatile frame pool and the on-disk page store together behind
//! a single [`BufferManager`]: allocation, swip resolution, and the
//! cooling-stage maintenance that keeps a standing supply of eviction
//! candidates once the pool fills up.
//!
//! ## Usage
//!
//! ```no_run
//! use rusty_bufferpool::manager::BufferManagerBuilder;
//!
//! # fn example() -> rusty_bufferpool::error::Result<()> {
//! let mut manager = BufferManagerBuilder::new()
//!     .frame_count(1024)
//!     .page_file("/tmp/pages.db")
//!     .page_count(1 << 20)
//!     .build()?;
//!
//! let frame = manager.allocate_page()?;
//! manager.free_page(frame);
//! # Ok(())
//! # }
//! ```

use crate::callbacks::PageGraph;
use crate::common::{
    PageId, COOLING_RNG_SEED, SHARE_COOLING_PAGES, SHARE_USED_PAGES_BEFORE_COOLING,
};
use crate::error::{BufferPoolError, Result};
use crate::eviction_queue::EvictionQueue;
use crate::frame::FrameRef;
use crate::ssd_region::SsdRegion;
use crate::swip::Swip;
use crate::volatile_region::VolatileRegion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Orchestrates frame allocation, swip resolution, and cooling-stage
/// eviction maintenance. Single-threaded: every method takes `&mut self`.
pub struct BufferManager {
    volatile_region: VolatileRegion,
    ssd_region: SsdRegion,
    eviction_queue: EvictionQueue,
    page_graph: Option<Box<dyn PageGraph>>,
    rng: StdRng,
    frame_count: usize,
    cooling_target: usize,
    used_threshold: usize,
}

impl BufferManager {
    /// Build a manager directly from its two regions, using the standard
    /// fixed RNG seed. Prefer [`BufferManagerBuilder`] unless you already
    /// hold constructed regions (e.g. in a test).
    pub fn new(volatile_region: VolatileRegion, ssd_region: SsdRegion) -> Self {
        let frame_count = volatile_region.frame_count();
        Self {
            volatile_region,
            ssd_region,
            eviction_queue: EvictionQueue::new(),
            page_graph: None,
            rng: StdRng::seed_from_u64(COOLING_RNG_SEED),
            frame_count,
            cooling_target: (frame_count as f64 * SHARE_COOLING_PAGES) as usize,
            used_threshold: (frame_count as f64 * SHARE_USED_PAGES_BEFORE_COOLING) as usize,
        }
    }

    /// Register the capability interface the owning data structure grants
    /// the manager. Leaving this unset is equivalent to a `PageGraph` whose
    /// both methods use their default (childless / parentless) behavior.
    pub fn register_page_graph(&mut self, page_graph: Box<dyn PageGraph>) {
        self.page_graph = Some(page_graph);
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn free_frame_count(&self) -> usize {
        self.volatile_region.free_frame_count()
    }

    #[inline]
    pub fn used_frame_count(&self) -> usize {
        self.volatile_region.used_frame_count()
    }

    #[inline]
    pub fn page_count(&self) -> u64 {
        self.ssd_region.page_count()
    }

    #[inline]
    pub fn free_page_count(&self) -> usize {
        self.ssd_region.free_page_count()
    }

    #[inline]
    pub fn eviction_candidate_count(&self) -> usize {
        self.eviction_queue.len()
    }

    pub fn has_eviction_candidate(&self, frame: FrameRef) -> bool {
        self.eviction_queue.contains(frame)
    }

    /// Allocate a fresh page id and frame. Evicts first if the volatile
    /// region has no free frame, then runs cooling-stage maintenance.
    ///
    /// The page id is obtained before the frame is taken off the free
    /// list: it's the fallible step (capacity exhaustion), and failing
    /// after already popping a frame would leak it back into neither
    /// pool.
    pub fn allocate_page(&mut self) -> Result<FrameRef> {
        let page_id = self.ssd_region.allocate_page_id()?;

        if self.volatile_region.free_frame_count() == 0 {
            self.evict_page()?;
        }

        let frame = self.volatile_region.allocate_frame();
        unsafe { (*frame.as_ptr()).set_page_id(page_id) };
        self.cooling_maintenance(frame);
        Ok(frame)
    }

    /// Release `frame`'s page id and the frame itself. Frees the page id
    /// first since returning the frame resets its `page_id` field.
    pub fn free_page(&mut self, frame: FrameRef) {
        let page_id = unsafe { (*frame.as_ptr()).page_id() };
        self.ssd_region.free_page_id(page_id);
        self.volatile_region.free_frame(frame);
    }

    /// Resolve `swip` to a live frame, materializing it from disk if
    /// necessary.
    pub fn get_frame(&mut self, swip: &mut Swip) -> Result<FrameRef> {
        if swip.is_swizzled() {
            return Ok(swip.buffer_frame());
        }

        if swip.is_cooling() {
            swip.swizzle();
            let frame = swip.buffer_frame();
            self.remove_eviction_candidate(frame);
            self.cooling_maintenance(frame);
            return Ok(frame);
        }

        // Evicted: fault the page back in.
        if self.volatile_region.free_frame_count() == 0 {
            self.evict_page()?;
        }

        let frame = self.volatile_region.allocate_frame();
        let page_id = swip.page_id();
        unsafe { (*frame.as_ptr()).set_page_id(page_id) };
        self.cooling_maintenance(frame);
        swip.swizzle_to(frame);
        unsafe { self.ssd_region.read_page((*frame.as_ptr()).page_mut(), page_id)? };
        Ok(frame)
    }

    /// Write `frame`'s page to disk and clear its dirty bit.
    pub fn flush(&mut self, frame: FrameRef) -> Result<()> {
        unsafe {
            let f = &mut *frame.as_ptr();
            self.ssd_region.write_page(f.page(), f.page_id())?;
            f.mark_written_back();
        }
        Ok(())
    }

    /// Evict the frame at the front of the eviction-candidate queue: flush
    /// it if dirty, tell its parent swip it's now evicted (if a
    /// [`PageGraph`] is registered), and return the frame to the free list.
    ///
    /// # Panics
    ///
    /// Panics if the eviction-candidate queue is empty - the caller must
    /// ensure candidates exist (cooling maintenance's job) before evicting.
    pub fn evict_page(&mut self) -> Result<()> {
        let frame = self
            .eviction_queue
            .pop_front()
            .expect("_evict_page called with no eviction candidates");

        if unsafe { (*frame.as_ptr()).is_dirty() } {
            self.flush(frame)?;
        }

        if let Some(graph) = self.page_graph.as_deref_mut() {
            if let Some(mut parent_swip) = graph.get_parent(frame) {
                let page_id = unsafe { (*frame.as_ptr()).page_id() };
                unsafe { parent_swip.as_mut().evict(page_id) };
            }
        }

        self.volatile_region.free_frame(frame);
        Ok(())
    }

    /// Add `frame` to the eviction-candidate queue and, if a parent swip
    /// can be found, unswizzle it into the cooling state. No-op if `frame`
    /// is already a candidate.
    pub fn add_eviction_candidate(&mut self, frame: FrameRef) {
        if self.eviction_queue.contains(frame) {
            return;
        }
        self.eviction_queue.push_back(frame);

        if let Some(graph) = self.page_graph.as_deref_mut() {
            if let Some(mut parent_swip) = graph.get_parent(frame) {
                unsafe { parent_swip.as_mut().unswizzle() };
            }
        }
    }

    pub fn remove_eviction_candidate(&mut self, frame: FrameRef) {
        self.eviction_queue.remove(frame);
    }

    pub fn pop_eviction_candidate(&mut self) -> Option<FrameRef> {
        self.eviction_queue.pop_front()
    }

    /// Maintain the cooling-stage invariant: once at least
    /// `⌊frame_count × 0.5⌋` frames are in use, keep at least
    /// `⌊frame_count × 0.1⌋` frames queued for eviction. `just_allocated`
    /// is excluded from sampling so maintenance never re-discovers the
    /// frame that triggered it.
    fn cooling_maintenance(&mut self, just_allocated: FrameRef) {
        if self.volatile_region.used_frame_count() < self.used_threshold {
            return;
        }

        while self.eviction_queue.len() < self.cooling_target {
            let idx = self.rng.random_range(0..self.frame_count);
            let mut candidate = self.volatile_region.frame_at(idx);

            if candidate == just_allocated || unsafe { (*candidate.as_ptr()).is_empty() } {
                continue;
            }

            if let Some(graph) = self.page_graph.as_deref_mut() {
                loop {
                    let mut next = None;
                    let found_swizzled_child = graph.iterate_children(candidate, &mut |swip: &mut Swip| {
                        if swip.is_swizzled() {
                            next = Some(swip.buffer_frame());
                            true
                        } else {
                            false
                        }
                    });
                    if !found_swizzled_child {
                        break;
                    }
                    candidate = next.expect("iterate_children signalled a match without selecting a child");
                }
            }

            self.add_eviction_candidate(candidate);
        }
    }
}

/// Builder for [`BufferManager`], constructing its volatile and SSD
/// regions from plain parameters.
pub struct BufferManagerBuilder {
    frame_count: Option<usize>,
    page_file: Option<PathBuf>,
    page_count: Option<u64>,
    direct_io: bool,
}

impl BufferManagerBuilder {
    pub fn new() -> Self {
        Self {
            frame_count: None,
            page_file: None,
            page_count: None,
            direct_io: true,
        }
    }

    pub fn frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = Some(frame_count);
        self
    }

    pub fn page_file(mut self, path: impl AsRef<Path>) -> Self {
        self.page_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn page_count(mut self, page_count: u64) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// Disable `O_DIRECT` on the page file. Useful in tests backed by
    /// filesystems (tmpfs, overlayfs) that reject direct I/O outright.
    pub fn direct_io(mut self, enabled: bool) -> Self {
        self.direct_io = enabled;
        self
    }

    pub fn build(self) -> Result<BufferManager> {
        let frame_count = self
            .frame_count
            .ok_or_else(|| BufferPoolError::Configuration("frame_count is required".into()))?;
        let page_file = self
            .page_file
            .ok_or_else(|| BufferPoolError::Configuration("page_file is required".into()))?;
        let page_count = self
            .page_count
            .ok_or_else(|| BufferPoolError::Configuration("page_count is required".into()))?;

        tracing::info!(frame_count, page_count, path = %page_file.display(), "opening buffer manager regions");

        let volatile_region = VolatileRegion::new(frame_count);
        let ssd_region = SsdRegion::with_direct_io(page_file, page_count, self.direct_io)?;
        Ok(BufferManager::new(volatile_region, ssd_region))
    }
}

impl Default for BufferManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ptr::NonNull;

    fn manager(frame_count: usize, page_count: u64) -> (BufferManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let m = BufferManagerBuilder::new()
            .frame_count(frame_count)
            .page_file(dir.path().join("pages.db"))
            .page_count(page_count)
            .direct_io(false)
            .build()
            .unwrap();
        (m, dir)
    }

    #[test]
    fn dirty_bit_round_trip() {
        let (mut m, _dir) = manager(4, 16);
        let frame = m.allocate_page().unwrap();
        unsafe {
            assert!(!(*frame.as_ptr()).is_dirty());
            (*frame.as_ptr()).mark_dirty();
            assert!((*frame.as_ptr()).is_dirty());
            (*frame.as_ptr()).mark_written_back();
            assert!(!(*frame.as_ptr()).is_dirty());
        }
    }

    #[test]
    fn page_ids_allocate_in_ascending_order() {
        let (mut m, _dir) = manager(8, 512);
        let f0 = m.allocate_page().unwrap();
        let f1 = m.allocate_page().unwrap();
        let f2 = m.allocate_page().unwrap();
        unsafe {
            assert_eq!((*f0.as_ptr()).page_id(), 0);
            assert_eq!((*f1.as_ptr()).page_id(), 1);
            assert_eq!((*f2.as_ptr()).page_id(), 2);
        }
    }

    #[test]
    fn freed_page_ids_reused_lifo() {
        let (mut m, _dir) = manager(8, 512);
        let f0 = m.allocate_page().unwrap();
        let _f1 = m.allocate_page().unwrap();
        let page_id0 = unsafe { (*f0.as_ptr()).page_id() };
        m.free_page(f0);
        let f2 = m.allocate_page().unwrap();
        assert_eq!(unsafe { (*f2.as_ptr()).page_id() }, page_id0);
    }

    #[test]
    fn cold_read_after_eviction_returns_flushed_contents() {
        let (mut m, _dir) = manager(4, 16);
        let frame = m.allocate_page().unwrap();
        let page_id = unsafe { (*frame.as_ptr()).page_id() };
        unsafe {
            (*frame.as_ptr()).page_mut().as_bytes_mut()[..4].copy_from_slice(&0xDEADu32.to_le_bytes());
            (*frame.as_ptr()).mark_dirty();
        }
        m.flush(frame).unwrap();
        m.add_eviction_candidate(frame);
        m.evict_page().unwrap();

        let mut swip = Swip::from_page_id(page_id);
        let resolved = m.get_frame(&mut swip).unwrap();
        unsafe {
            assert_eq!((*resolved.as_ptr()).page().as_bytes()[..4], 0xDEADu32.to_le_bytes());
        }
    }

    #[test]
    fn page_id_exhaustion_does_not_leak_a_frame() {
        let (mut m, _dir) = manager(4, 1);
        m.allocate_page().unwrap();

        assert!(matches!(
            m.allocate_page(),
            Err(BufferPoolError::PageIdsExhausted)
        ));
        // The frame must still be sitting in the free list, not popped and
        // dropped on the floor by the failed allocation.
        assert_eq!(m.free_frame_count(), m.frame_count() - 1);
    }

    /// A `PageGraph` double that only answers `get_parent`, leaving
    /// `iterate_children` at its default (no children).
    struct ParentOnlyGraph {
        parents: HashMap<FrameRef, NonNull<Swip>>,
    }

    impl PageGraph for ParentOnlyGraph {
        fn get_parent(&mut self, frame: FrameRef) -> Option<NonNull<Swip>> {
            self.parents.get(&frame).copied()
        }
    }

    #[test]
    fn eviction_without_iterate_children_still_frees_frames() {
        let (mut m, _dir) = manager(4, 16);

        let frame_a = m.allocate_page().unwrap();
        let frame_b = m.allocate_page().unwrap();

        let mut swip_a = Box::new(Swip::from_frame(frame_a));
        let mut swip_b = Box::new(Swip::from_frame(frame_b));

        let mut parents = HashMap::new();
        parents.insert(frame_a, NonNull::from(swip_a.as_mut()));
        parents.insert(frame_b, NonNull::from(swip_b.as_mut()));
        m.register_page_graph(Box::new(ParentOnlyGraph { parents }));

        m.add_eviction_candidate(frame_a);
        m.add_eviction_candidate(frame_b);
        assert!(swip_a.is_cooling());
        assert!(swip_b.is_cooling());

        m.evict_page().unwrap();
        m.evict_page().unwrap();

        assert_eq!(m.free_frame_count(), m.frame_count());
        assert_eq!(m.free_page_count() as u64, m.page_count() - 2);
        assert!(swip_a.is_evicted());
        assert!(swip_b.is_evicted());
    }

    /// `iterate_children` always reports no swizzled children, so every
    /// sampled non-empty frame is immediately eligible.
    struct NoChildrenGraph;
    impl PageGraph for NoChildrenGraph {
        fn iterate_children(&mut self, _frame: FrameRef, _visitor: &mut dyn FnMut(&mut Swip) -> bool) -> bool {
            false
        }
    }

    #[test]
    fn cooling_threshold_is_maintained_once_half_full() {
        let (mut m, _dir) = manager(256, 1024);
        m.register_page_graph(Box::new(NoChildrenGraph));

        for _ in 0..128 {
            m.allocate_page().unwrap();
        }

        assert_eq!(m.eviction_candidate_count(), 25);
    }
}
