//! The volatile region: a fixed array of frames backed by an anonymous
//! mmap, with a hugepage hint to cut TLB pressure for large pools.

use crate::frame::{Frame, FrameRef};
use std::ptr::{self, NonNull};

/// Index of a frame within a [`VolatileRegion`].
pub type FrameId = usize;

/// A fixed-size array of [`Frame`]s. Frames are handed out by address
/// through [`allocate_frame`](VolatileRegion::allocate_frame) and returned
/// through [`free_frame`](VolatileRegion::free_frame); the region never
/// resizes after construction.
pub struct VolatileRegion {
    base: NonNull<Frame>,
    mmap_len: usize,
    frame_count: usize,
    // Stack of free frame indices. Seeded in descending order so the first
    // `frame_count` allocations hand out frames 0, 1, 2, ... in order.
    free_frames: Vec<FrameId>,
}

// SAFETY: VolatileRegion owns its mmap outright and the crate's contract is
// single-threaded use; no concurrent access is permitted.
unsafe impl Send for VolatileRegion {}

impl VolatileRegion {
    pub fn new(frame_count: usize) -> Self {
        assert!(frame_count > 0, "frame_count must be positive");
        let mmap_len = frame_count * std::mem::size_of::<Frame>();
        let base = unsafe { Self::map_anonymous(mmap_len) };

        for i in 0..frame_count {
            unsafe { ptr::write(base.as_ptr().add(i), Frame::new()) };
        }

        let free_frames = (0..frame_count).rev().collect();

        Self {
            base,
            mmap_len,
            frame_count,
            free_frames,
        }
    }

    #[cfg(unix)]
    unsafe fn map_anonymous(len: usize) -> NonNull<Frame> {
        let addr = libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        );
        assert_ne!(addr, libc::MAP_FAILED, "mmap failed for volatile region");

        // Hugepage hint. Best-effort: madvise failing just means we keep
        // the standard page size, which is still correct.
        #[cfg(target_os = "linux")]
        {
            let _ = libc::madvise(addr, len, libc::MADV_HUGEPAGE);
        }

        NonNull::new_unchecked(addr as *mut Frame)
    }

    #[cfg(not(unix))]
    unsafe fn map_anonymous(len: usize) -> NonNull<Frame> {
        let layout = std::alloc::Layout::from_size_align(len, crate::common::PAGE_ALIGN)
            .expect("invalid volatile region layout");
        let ptr = std::alloc::alloc_zeroed(layout);
        assert!(!ptr.is_null(), "allocation failed for volatile region");
        NonNull::new_unchecked(ptr as *mut Frame)
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn free_frame_count(&self) -> usize {
        self.free_frames.len()
    }

    #[inline]
    pub fn used_frame_count(&self) -> usize {
        self.frame_count - self.free_frame_count()
    }

    #[inline]
    fn frame_ptr(&self, id: FrameId) -> FrameRef {
        debug_assert!(id < self.frame_count);
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(id)) }
    }

    /// Frame at a given index, for random sampling during cooling-stage
    /// maintenance.
    #[inline]
    pub fn frame_at(&self, id: FrameId) -> FrameRef {
        self.frame_ptr(id)
    }

    /// Allocate a frame from the free list.
    ///
    /// # Panics
    ///
    /// Panics if the free list is empty - the buffer manager must ensure a
    /// free frame exists (via eviction) before calling this.
    pub fn allocate_frame(&mut self) -> FrameRef {
        let id = self
            .free_frames
            .pop()
            .expect("allocate_frame called with no free frames");
        self.frame_ptr(id)
    }

    /// Return `frame` to the free list, resetting it in place.
    pub fn free_frame(&mut self, frame: FrameRef) {
        let id = self.index_of(frame);
        unsafe { (*frame.as_ptr()).reset() };
        self.free_frames.push(id);
    }

    /// Whether `ptr` falls within this region's backing memory.
    pub fn address_in_range(&self, ptr: NonNull<Frame>) -> bool {
        let start = self.base.as_ptr() as usize;
        let end = start + self.mmap_len;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr < end
    }

    fn index_of(&self, frame: FrameRef) -> FrameId {
        debug_assert!(self.address_in_range(frame));
        let offset = frame.as_ptr() as usize - self.base.as_ptr() as usize;
        offset / std::mem::size_of::<Frame>()
    }
}

impl Drop for VolatileRegion {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.mmap_len);
        }
        #[cfg(not(unix))]
        unsafe {
            let layout = std::alloc::Layout::from_size_align(self.mmap_len, crate::common::PAGE_ALIGN)
                .expect("invalid volatile region layout");
            std::alloc::dealloc(self.base.as_ptr() as *mut u8, layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_free_is_stable() {
        let mut region = VolatileRegion::new(8);
        assert_eq!(region.frame_count(), 8);
        assert_eq!(region.free_frame_count(), 8);

        let f0 = region.allocate_frame();
        assert_eq!(region.free_frame_count(), 7);
        assert!(region.address_in_range(f0));

        region.free_frame(f0);
        assert_eq!(region.free_frame_count(), 8);
    }

    #[test]
    fn frames_allocate_in_ascending_order() {
        let mut region = VolatileRegion::new(4);
        let f0 = region.allocate_frame();
        let f1 = region.allocate_frame();
        assert_eq!(f0, region.frame_at(0));
        assert_eq!(f1, region.frame_at(1));
    }

    #[test]
    #[should_panic(expected = "no free frames")]
    fn allocate_past_capacity_panics() {
        let mut region = VolatileRegion::new(1);
        let _ = region.allocate_frame();
        let _ = region.allocate_frame();
    }

    #[test]
    fn freed_frame_resets_page_id() {
        let mut region = VolatileRegion::new(2);
        let f = region.allocate_frame();
        unsafe { (*f.as_ptr()).set_page_id(99) };
        region.free_frame(f);
        assert!(unsafe { (*f.as_ptr()).is_empty() });
    }
}
