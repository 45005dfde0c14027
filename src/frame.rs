//! Page payloads and the buffer frames that hold them.

use crate::common::{PageId, INVALID_PAGE_ID, PAGE_ALIGN, PAGE_SIZE};
use std::ptr::NonNull;

/// Fixed-size, alignment-constrained page payload. Opaque to the buffer
/// pool beyond its size - the data structure that owns pages interprets
/// the bytes.
#[repr(C, align(512))]
#[derive(Clone)]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

const _: () = assert!(std::mem::align_of::<Page>() >= PAGE_ALIGN);
const _: () = assert!(std::mem::size_of::<Page>() == PAGE_SIZE);

impl Page {
    #[inline]
    pub fn zeroed() -> Self {
        Self { data: [0u8; PAGE_SIZE] }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    #[inline]
    pub fn zero(&mut self) {
        self.data.fill(0);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// An in-memory frame: a page plus the metadata the buffer manager needs
/// to track its lifecycle. Aligned the same as [`Page`] so that swips can
/// pack a tag into a frame address's low bits.
#[repr(C, align(512))]
pub struct Frame {
    page: Page,
    page_id: PageId,
    dirty: bool,
    /// Back pointer to the parent frame, maintained only by the owning
    /// data structure; the buffer manager never dereferences it.
    parent: Option<NonNull<Frame>>,
}

const _: () = assert!(std::mem::align_of::<Frame>() >= PAGE_ALIGN);

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            page: Page::zeroed(),
            page_id: INVALID_PAGE_ID,
            dirty: false,
            parent: None,
        }
    }

    /// Reinitialize to the empty state. Used when a frame returns to the
    /// volatile region's free list.
    pub(crate) fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.dirty = false;
        self.parent = None;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id == INVALID_PAGE_ID
    }

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[inline]
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub(crate) fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn mark_written_back(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn parent(&self) -> Option<NonNull<Frame>> {
        self.parent
    }

    #[inline]
    pub fn set_parent(&mut self, parent: Option<NonNull<Frame>>) {
        self.parent = parent;
    }
}

/// A stable pointer to a frame living inside the volatile region's mmap.
pub type FrameRef = NonNull<Frame>;
