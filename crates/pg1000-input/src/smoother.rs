//! Moving-average smoothing for raw ADC samples.
//!
//! # Example
//!
//! ```
//! use pg1000_input::{apply_hysteresis, ValueSmoother};
//!
//! let mut smoother = ValueSmoother::new(4);
//! let mut smoothed = 0;
//! for _ in 0..4 {
//!     smoothed = smoother.update(800);
//! }
//! assert_eq!(smoothed, 800);
//!
//! // One-LSB jitter is held back
//! assert_eq!(apply_hysteresis(801, 800, 4), 800);
//! ```

use smallvec::{smallvec, SmallVec};

/// Default averaging window, in samples.
pub const DEFAULT_WINDOW: usize = 8;

/// Largest averaging window a configuration may ask for.
pub const MAX_WINDOW: usize = 64;

/// Default hysteresis threshold, in raw LSBs.
pub const DEFAULT_HYSTERESIS: u16 = 4;

/// Fixed-window moving average over the last N samples.
///
/// Keeps a running sum so each update is O(1). The sum always equals the sum of the
/// buffer; [`update()`](ValueSmoother::update) is the only mutator besides `reset()`.
#[derive(Debug, Clone)]
pub struct ValueSmoother {
    buffer: SmallVec<[u16; DEFAULT_WINDOW]>,
    sum: u32,
    index: usize,
}

impl ValueSmoother {
    /// A window of 0 is treated as 1.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            buffer: smallvec![0; window],
            sum: 0,
            index: 0,
        }
    }

    /// Admit `raw`, evict the oldest sample, and return the truncated mean.
    #[inline]
    pub fn update(&mut self, raw: u16) -> u16 {
        self.sum -= u32::from(self.buffer[self.index]);
        self.sum += u32::from(raw);
        self.buffer[self.index] = raw;

        self.index = (self.index + 1) % self.buffer.len();

        (self.sum / self.buffer.len() as u32) as u16
    }

    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|sample| *sample = 0);
        self.sum = 0;
        self.index = 0;
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn sum(&self) -> u32 {
        self.sum
    }
}

impl Default for ValueSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// `previous` if `current` moved less than `threshold` away from it, else `current`.
#[inline]
pub fn apply_hysteresis(current: u16, previous: u16, threshold: u16) -> u16 {
    if current.abs_diff(previous) < threshold {
        previous
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_converges_after_full_window() {
        let mut smoother = ValueSmoother::new(8);
        let outputs: Vec<u16> = (0..8).map(|_| smoother.update(512)).collect();

        // Partially filled window averages in the initial zeros
        assert_eq!(outputs[0], 64);
        assert_eq!(outputs[3], 256);
        assert_eq!(outputs[7], 512);
    }

    #[test]
    fn test_evicts_oldest_sample() {
        let mut smoother = ValueSmoother::new(2);
        smoother.update(100);
        smoother.update(200);
        assert_eq!(smoother.update(300), 250);
        assert_eq!(smoother.sum(), 500);
    }

    #[test]
    fn test_truncating_division() {
        let mut smoother = ValueSmoother::new(3);
        smoother.update(1);
        smoother.update(1);
        assert_eq!(smoother.update(2), 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut smoother = ValueSmoother::new(4);
        for _ in 0..4 {
            smoother.update(1023);
        }
        smoother.reset();
        assert_eq!(smoother.sum(), 0);
        assert_eq!(smoother.update(400), 100);
    }

    #[test]
    fn test_zero_window_is_one() {
        let mut smoother = ValueSmoother::new(0);
        assert_eq!(smoother.window(), 1);
        assert_eq!(smoother.update(77), 77);
    }

    #[test]
    fn test_hysteresis_boundaries() {
        assert_eq!(apply_hysteresis(503, 500, 4), 500);
        assert_eq!(apply_hysteresis(497, 500, 4), 500);
        assert_eq!(apply_hysteresis(504, 500, 4), 504);
        assert_eq!(apply_hysteresis(496, 500, 4), 496);
        assert_eq!(apply_hysteresis(0, 1023, 4), 0);
    }

    proptest! {
        #[test]
        fn prop_repeated_input_converges(
            window in 1usize..32,
            raw in 0u16..=1023,
            history in prop::collection::vec(0u16..=1023, 0..64),
        ) {
            let mut smoother = ValueSmoother::new(window);
            for sample in history {
                smoother.update(sample);
            }
            let mut out = 0;
            for _ in 0..window {
                out = smoother.update(raw);
            }
            prop_assert_eq!(out, raw);
        }

        #[test]
        fn prop_sum_matches_buffer(
            window in 1usize..16,
            samples in prop::collection::vec(0u16..=1023, 0..64),
        ) {
            let mut smoother = ValueSmoother::new(window);
            let mut recent: Vec<u16> = Vec::new();
            for sample in samples {
                smoother.update(sample);
                recent.push(sample);
            }
            let start = recent.len().saturating_sub(window);
            let expected: u32 = recent[start..].iter().map(|&s| u32::from(s)).sum();
            prop_assert_eq!(smoother.sum(), expected);
        }

        #[test]
        fn prop_hysteresis(previous in 0u16..=1023, current in 0u16..=1023, threshold in 0u16..64) {
            let out = apply_hysteresis(current, previous, threshold);
            if current.abs_diff(previous) < threshold {
                prop_assert_eq!(out, previous);
            } else {
                prop_assert_eq!(out, current);
            }
        }
    }
}
