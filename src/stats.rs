/// Culling statistics counters
///
/// Relaxed atomic counters incremented through the `count_call!` /
/// `count_add!` macros. The macros compile to nothing unless the `profiling`
/// cargo feature is enabled, so instrumented hot paths cost nothing in normal
/// builds.
use std::sync::atomic::{AtomicU64, Ordering};

/// Global call counters for the coverage-buffer entry points and the flush
/// strategy dispatch.
pub struct CullCounters {
    pub polygon_inserts: AtomicU64,
    pub polygon_tests: AtomicU64,
    pub outline_inserts: AtomicU64,
    pub rect_tests: AtomicU64,
    pub quick_rect_tests: AtomicU64,
    pub point_tests: AtomicU64,
    pub tiles_flushed: AtomicU64,
    pub tiles_tested: AtomicU64,
    pub flush_full_fvalue: AtomicU64,
    pub flush_empty: AtomicU64,
    pub flush_full: AtomicU64,
    pub flush_no_depth: AtomicU64,
    pub flush_general: AtomicU64,
}

impl CullCounters {
    pub const fn new() -> Self {
        Self {
            polygon_inserts: AtomicU64::new(0),
            polygon_tests: AtomicU64::new(0),
            outline_inserts: AtomicU64::new(0),
            rect_tests: AtomicU64::new(0),
            quick_rect_tests: AtomicU64::new(0),
            point_tests: AtomicU64::new(0),
            tiles_flushed: AtomicU64::new(0),
            tiles_tested: AtomicU64::new(0),
            flush_full_fvalue: AtomicU64::new(0),
            flush_empty: AtomicU64::new(0),
            flush_full: AtomicU64::new(0),
            flush_no_depth: AtomicU64::new(0),
            flush_general: AtomicU64::new(0),
        }
    }

    pub fn reset(&self) {
        self.polygon_inserts.store(0, Ordering::Relaxed);
        self.polygon_tests.store(0, Ordering::Relaxed);
        self.outline_inserts.store(0, Ordering::Relaxed);
        self.rect_tests.store(0, Ordering::Relaxed);
        self.quick_rect_tests.store(0, Ordering::Relaxed);
        self.point_tests.store(0, Ordering::Relaxed);
        self.tiles_flushed.store(0, Ordering::Relaxed);
        self.tiles_tested.store(0, Ordering::Relaxed);
        self.flush_full_fvalue.store(0, Ordering::Relaxed);
        self.flush_empty.store(0, Ordering::Relaxed);
        self.flush_full.store(0, Ordering::Relaxed);
        self.flush_no_depth.store(0, Ordering::Relaxed);
        self.flush_general.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CullCounterSnapshot {
        CullCounterSnapshot {
            polygon_inserts: self.polygon_inserts.load(Ordering::Relaxed),
            polygon_tests: self.polygon_tests.load(Ordering::Relaxed),
            outline_inserts: self.outline_inserts.load(Ordering::Relaxed),
            rect_tests: self.rect_tests.load(Ordering::Relaxed),
            quick_rect_tests: self.quick_rect_tests.load(Ordering::Relaxed),
            point_tests: self.point_tests.load(Ordering::Relaxed),
            tiles_flushed: self.tiles_flushed.load(Ordering::Relaxed),
            tiles_tested: self.tiles_tested.load(Ordering::Relaxed),
            flush_full_fvalue: self.flush_full_fvalue.load(Ordering::Relaxed),
            flush_empty: self.flush_empty.load(Ordering::Relaxed),
            flush_full: self.flush_full.load(Ordering::Relaxed),
            flush_no_depth: self.flush_no_depth.load(Ordering::Relaxed),
            flush_general: self.flush_general.load(Ordering::Relaxed),
        }
    }
}

impl Default for CullCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters, for diffing across frames.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CullCounterSnapshot {
    pub polygon_inserts: u64,
    pub polygon_tests: u64,
    pub outline_inserts: u64,
    pub rect_tests: u64,
    pub quick_rect_tests: u64,
    pub point_tests: u64,
    pub tiles_flushed: u64,
    pub tiles_tested: u64,
    pub flush_full_fvalue: u64,
    pub flush_empty: u64,
    pub flush_full: u64,
    pub flush_no_depth: u64,
    pub flush_general: u64,
}

impl CullCounterSnapshot {
    pub fn print_report(&self) {
        println!("=== coverage buffer counters ===");
        println!("polygon inserts:   {}", self.polygon_inserts);
        println!("polygon tests:     {}", self.polygon_tests);
        println!("outline inserts:   {}", self.outline_inserts);
        println!("rect tests:        {}", self.rect_tests);
        println!("quick rect tests:  {}", self.quick_rect_tests);
        println!("point tests:       {}", self.point_tests);
        println!("tiles flushed:     {}", self.tiles_flushed);
        println!("tiles tested:      {}", self.tiles_tested);
        println!(
            "flush strategies:  full-fill {} / empty {} / full {} / no-depth {} / general {}",
            self.flush_full_fvalue,
            self.flush_empty,
            self.flush_full,
            self.flush_no_depth,
            self.flush_general
        );
    }
}

/// Process-wide counter instance used by the `count_call!` call sites.
pub static CULL_COUNTERS: CullCounters = CullCounters::new();

/// Increment a counter by one when the `profiling` feature is enabled.
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {{
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, ::std::sync::atomic::Ordering::Relaxed);
        }
    }};
}

/// Add an amount to a counter when the `profiling` feature is enabled.
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $amount:expr) => {{
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($amount as u64, ::std::sync::atomic::Ordering::Relaxed);
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_increments() {
        let counters = CullCounters::new();
        counters.polygon_tests.fetch_add(3, Ordering::Relaxed);
        counters.tiles_flushed.fetch_add(7, Ordering::Relaxed);

        let snap = counters.snapshot();
        assert_eq!(snap.polygon_tests, 3);
        assert_eq!(snap.tiles_flushed, 7);
        assert_eq!(snap.polygon_inserts, 0);

        counters.reset();
        assert_eq!(counters.snapshot(), CullCounterSnapshot::default());
    }
}
