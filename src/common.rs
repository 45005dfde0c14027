//! Shared types and compile-time constants used across the buffer pool.

/// A page identifier. The top two bits are reserved so that a page id can
/// always be shifted left by the swip tag width without overflowing.
pub type PageId = u64;

/// Page payload size, fixed for the lifetime of an [`crate::ssd_region::SsdRegion`].
pub const PAGE_SIZE: usize = 4096;

/// Required alignment of a page's backing storage, driven by direct I/O.
pub const PAGE_ALIGN: usize = 512;

/// Highest usable page id. The top two bits of a `u64` are reserved for
/// bookkeeping headroom, matching the tag width swips reserve in the other
/// direction.
pub const MAX_PAGE_ID: PageId = (1u64 << 62) - 2;

/// Sentinel meaning "no page". One past [`MAX_PAGE_ID`].
pub const INVALID_PAGE_ID: PageId = MAX_PAGE_ID + 1;

/// Target share of frames that should sit in the eviction-candidate queue
/// once [`SHARE_USED_PAGES_BEFORE_COOLING`] of the pool is in use.
pub const SHARE_COOLING_PAGES: f64 = 0.10;

/// Share of frames in use that triggers cooling-stage maintenance.
pub const SHARE_USED_PAGES_BEFORE_COOLING: f64 = 0.50;

/// Fixed seed for the cooling-stage victim sampler, so runs are reproducible.
pub const COOLING_RNG_SEED: u64 = 42;
