//! # Buffer Pool Demo
//!
//! Walks a small buffer manager through allocation, a cooling round trip,
//! and a cold read after eviction, with `tracing` wired up so the
//! manager's structured logs are visible on stderr.

use rusty_bufferpool::manager::BufferManagerBuilder;
use rusty_bufferpool::swip::Swip;
use rusty_bufferpool::Result;
use tempfile::TempDir;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let dir = TempDir::new().expect("create temp dir for demo page file");
    let mut manager = BufferManagerBuilder::new()
        .frame_count(16)
        .page_file(dir.path().join("pages.db"))
        .page_count(1 << 12)
        .direct_io(false)
        .build()?;

    let frame = manager.allocate_page()?;
    let page_id = unsafe { (*frame.as_ptr()).page_id() };
    unsafe {
        (*frame.as_ptr()).page_mut().as_bytes_mut()[..4].copy_from_slice(b"demo");
        (*frame.as_ptr()).mark_dirty();
    }
    println!("allocated page {page_id}, frame count {}", manager.frame_count());

    let mut swip = Swip::from_frame(frame);
    manager.flush(frame)?;
    manager.add_eviction_candidate(frame);
    manager.evict_page()?;
    println!("evicted page {page_id}; free frames = {}", manager.free_frame_count());

    swip.evict(page_id);
    let resolved = manager.get_frame(&mut swip)?;
    let bytes = unsafe { (*resolved.as_ptr()).page().as_bytes()[..4].to_vec() };
    println!("cold read back: {:?}", String::from_utf8_lossy(&bytes));

    Ok(())
}
