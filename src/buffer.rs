//! Sliding window over accepted samples.
//!
//! Ordered, time-stamped store with O(1) append and one-pass age trimming.
//! Insertion order is kept and assumed non-decreasing by timestamp, but not
//! enforced. The buffer is exclusively owned and mutated by one engine
//! instance; see the crate-level concurrency note.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sample;

/// A window is treated as complete slightly before it spans the full
/// configured duration, so estimates come from an (almost) full window.
pub const WINDOW_TOLERANCE_SECS: i64 = 2;

/// Summary statistics over the buffered window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferStats {
    pub count: usize,
    /// Span between the first and last buffered timestamps.
    pub duration_ms: i64,
    /// Total RR intervals across all buffered samples.
    pub rr_count: usize,
    /// `[min, max]` of buffered HR values; `[0, 0]` when empty.
    pub hr_range: [f64; 2],
}

impl BufferStats {
    fn empty() -> Self {
        Self {
            count: 0,
            duration_ms: 0,
            rr_count: 0,
            hr_range: [0.0, 0.0],
        }
    }
}

/// Flattened view of the window handed to feature extraction.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    /// All RR intervals in insertion order, milliseconds.
    pub rr_intervals_ms: Vec<f64>,
    /// One HR value per sample, in insertion order.
    pub hr_series: Vec<f64>,
    /// Per-channel motion values summed across the window.
    pub motion_sums: HashMap<String, f64>,
}

/// Ordered history of accepted samples, bounded by age rather than count.
#[derive(Debug)]
pub struct SlidingWindowBuffer {
    window: Duration,
    samples: VecDeque<Sample>,
}

impl SlidingWindowBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Appends to the tail. Trimming is a separate pass so push stays O(1).
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    /// Removes the expired prefix (timestamp < now − window) in one pass.
    /// The remainder keeps its relative order.
    pub fn trim(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// True iff the buffer is non-empty and the oldest sample is at least
    /// `window − tolerance` old. Feature extraction is refused before this
    /// holds.
    pub fn is_window_complete(&self, now: DateTime<Utc>) -> bool {
        let Some(oldest) = self.samples.front() else {
            return false;
        };
        now - oldest.timestamp >= self.window - Duration::seconds(WINDOW_TOLERANCE_SECS)
    }

    pub fn stats(&self) -> BufferStats {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return BufferStats::empty();
        };

        let mut hr_min = f64::INFINITY;
        let mut hr_max = f64::NEG_INFINITY;
        let mut rr_count = 0usize;
        for sample in &self.samples {
            hr_min = hr_min.min(sample.hr);
            hr_max = hr_max.max(sample.hr);
            rr_count += sample.rr_count();
        }

        BufferStats {
            count: self.samples.len(),
            duration_ms: (last.timestamp - first.timestamp).num_milliseconds(),
            rr_count,
            hr_range: [hr_min, hr_max],
        }
    }

    /// Flattens the window for feature extraction. Motion maps are summed
    /// per channel across all samples that carry them.
    pub fn snapshot(&self) -> WindowSnapshot {
        let mut rr_intervals_ms = Vec::new();
        let mut hr_series = Vec::with_capacity(self.samples.len());
        let mut motion_sums: HashMap<String, f64> = HashMap::new();

        for sample in &self.samples {
            rr_intervals_ms.extend_from_slice(&sample.rr_intervals_ms);
            hr_series.push(sample.hr);
            if let Some(motion) = &sample.motion {
                for (channel, value) in motion {
                    *motion_sums.entry(channel.clone()).or_insert(0.0) += value;
                }
            }
        }

        WindowSnapshot {
            rr_intervals_ms,
            hr_series,
            motion_sums,
        }
    }

    pub fn rr_count(&self) -> usize {
        self.samples.iter().map(Sample::rr_count).sum()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
