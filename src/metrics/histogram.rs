//! Thread-safe histogram with fixed cumulative buckets.
//!
//! Bucket bounds are chosen per metric: oracle latencies in microseconds,
//! or the number of oracle checks a generation needed.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Oracle round-trip buckets in microseconds (100μs to 5s).
pub const LATENCY_BUCKETS_US: &[u64] = &[
    100,       // 100μs
    500,       // 500μs
    1_000,     // 1ms
    5_000,     // 5ms
    10_000,    // 10ms
    25_000,    // 25ms
    50_000,    // 50ms
    100_000,   // 100ms
    250_000,   // 250ms
    500_000,   // 500ms
    1_000_000, // 1s
    5_000_000, // 5s
];

/// Checks needed per generation. 1 is the first-choice address, 100 is a
/// full exhaustion.
pub const CHECK_COUNT_BUCKETS: &[u64] = &[1, 2, 3, 5, 10, 25, 50, 100];

/// Lock-free histogram.
///
/// # Example
///
/// ```
/// use staffmail::metrics::{Histogram, CHECK_COUNT_BUCKETS};
///
/// let histogram = Histogram::with_buckets(CHECK_COUNT_BUCKETS);
/// histogram.observe(2);
///
/// let (sum, count, buckets) = histogram.snapshot();
/// assert_eq!(count, 1);
/// assert_eq!(sum, 2);
/// assert_eq!(buckets[0], 0);
/// assert_eq!(buckets[1], 1);
/// ```
pub struct Histogram {
    bounds: &'static [u64],
    sum: AtomicU64,
    count: AtomicU64,
    /// Cumulative: each bucket includes smaller values.
    buckets: Vec<AtomicU64>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Creates a latency histogram.
    pub fn new() -> Self {
        Self::with_buckets(LATENCY_BUCKETS_US)
    }

    pub fn with_buckets(bounds: &'static [u64]) -> Self {
        Self {
            bounds,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
        }
    }

    #[inline]
    pub fn observe(&self, value: u64) {
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (bucket, &boundary) in self.buckets.iter().zip(self.bounds) {
            if value <= boundary {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Returns `(sum, count, cumulative_bucket_counts)`.
    pub fn snapshot(&self) -> (u64, u64, Vec<u64>) {
        let sum = self.sum.load(Ordering::Relaxed);
        let count = self.count.load(Ordering::Relaxed);
        let buckets = self
            .buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();
        (sum, count, buckets)
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    /// Formats the histogram as Prometheus exposition text.
    pub fn format_prometheus(&self, name: &str, help: &str) -> String {
        let (sum, count, buckets) = self.snapshot();

        let mut output = String::with_capacity(1024);
        let _ = writeln!(output, "# HELP {} {}", name, help);
        let _ = writeln!(output, "# TYPE {} histogram", name);

        for (boundary, bucket) in self.bounds.iter().zip(&buckets) {
            let _ = writeln!(
                output,
                "{}_bucket{{le=\"{}\"}} {}",
                name, boundary, bucket
            );
        }

        let _ = writeln!(output, "{}_bucket{{le=\"+Inf\"}} {}", name, count);
        let _ = writeln!(output, "{}_sum {}", name, sum);
        let _ = writeln!(output, "{}_count {}", name, count);

        output
    }
}
