//! # Swizzling Buffer Pool
//!
//! A buffer pool manager for a page-oriented storage engine, built around
//! **swips**: 8-byte pointer-tagged references that are either a swizzled
//! in-memory frame address, a cooling frame address awaiting eviction, or
//! an evicted page id.
//!
//! ```text
//!   [free] --allocate--> [hot] --cooling maintenance-->
//!   [cooling, queued] --access--> [hot]
//!                     --reach front, evict--> [free]
//! ```
//!
//! ## Layout
//!
//! - [`swip`] - the tagged reference and its three-state machine.
//! - [`frame`] / [`common`] - page and frame layout, shared constants.
//! - [`volatile_region`] - the mmap-backed array of frames.
//! - [`ssd_region`] - the direct-I/O-backed page file.
//! - [`eviction_queue`] - the O(1) FIFO of eviction candidates.
//! - [`callbacks`] - the capability interface an owning data structure
//!   implements to let the manager walk and patch its page graph.
//! - [`manager`] - [`manager::BufferManager`], tying the above together.
//!
//! ## Usage
//!
//! ```no_run
//! use rusty_bufferpool::manager::BufferManagerBuilder;
//! use rusty_bufferpool::swip::Swip;
//!
//! # fn example() -> rusty_bufferpool::error::Result<()> {
//! let mut manager = BufferManagerBuilder::new()
//!     .frame_count(1024)
//!     .page_file("/var/lib/mydb/pages.db")
//!     .page_count(1 << 20)
//!     .build()?;
//!
//! let frame = manager.allocate_page()?;
//! let mut swip = Swip::from_frame(frame);
//!
//! // Later, after the page may have cooled or been evicted:
//! let frame = manager.get_frame(&mut swip)?;
//! # let _ = frame;
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod common;
pub mod error;
pub mod eviction_queue;
pub mod frame;
pub mod manager;
pub mod ssd_region;
pub mod swip;
pub mod volatile_region;

pub use error::{BufferPoolError, Result};
pub use manager::{BufferManager, BufferManagerBuilder};
pub use swip::Swip;
