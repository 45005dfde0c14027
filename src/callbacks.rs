//! The capability interface a managed data structure grants the buffer
//! manager: a way to walk a frame's child swips, and a way to find the
//! swip that points at a given frame.

use crate::frame::FrameRef;
use crate::swip::Swip;
use std::ptr::NonNull;

/// Callbacks into the data structure whose pages the manager buffers.
///
/// Both methods have a default no-op implementation, so a caller that only
/// cares about one of the two can implement just that one. Leaving both at
/// their defaults is equivalent to never calling
/// [`BufferManager::register_page_graph`](crate::manager::BufferManager::register_page_graph)
/// at all: cooling maintenance treats every candidate as childless, and
/// eviction skips the parent-swip update.
pub trait PageGraph {
    /// Visit `frame`'s child swips in turn, stopping at the first one for
    /// which `visitor` returns `true`. Returns whether any call to
    /// `visitor` returned `true`.
    ///
    /// The default implementation reports no children, matching the
    /// behavior of an unregistered callback.
    fn iterate_children(&mut self, frame: FrameRef, visitor: &mut dyn FnMut(&mut Swip) -> bool) -> bool {
        let _ = (frame, visitor);
        false
    }

    /// Find the swip, wherever it lives, that currently references
    /// `frame`. Returns `None` if the caller has no way to look this up,
    /// in which case the manager frees the frame without updating a swip.
    fn get_parent(&mut self, frame: FrameRef) -> Option<NonNull<Swip>> {
        let _ = frame;
        None
    }
}
