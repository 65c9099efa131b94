//! First-order exponential smoothing in value space.

/// Convergence tolerance at which a filter snaps onto its target.
pub const SETTLE_EPSILON: f32 = 0.01;

/// `current += alpha * (input - current)`, with an optional pending target.
///
/// The target is the last input fed through [`step`](Self::step). It stays pending until
/// the filter reaches it, so [`settle`](Self::settle) can keep moving a parameter after
/// its pot has stopped reporting changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFilter {
    current: f32,
    alpha: f32,
    target: Option<f32>,
}

impl ExponentialFilter {
    pub fn new(alpha: f32, initial: f32) -> Self {
        Self {
            current: initial,
            alpha: alpha.clamp(0.0, 1.0),
            target: None,
        }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[inline]
    pub fn target(&self) -> Option<f32> {
        self.target
    }

    /// Feed a new input and return the filtered value.
    pub fn step(&mut self, input: f32) -> f32 {
        self.target = Some(input);
        self.advance(input)
    }

    /// Advance toward the pending target, if any.
    pub fn settle(&mut self) -> Option<f32> {
        let target = self.target?;
        Some(self.advance(target))
    }

    /// Jump straight to `value` and drop any pending target.
    pub fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = None;
    }

    fn advance(&mut self, input: f32) -> f32 {
        self.current += self.alpha * (input - self.current);
        if (input - self.current).abs() < SETTLE_EPSILON {
            self.snap(input);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_step() {
        let mut filter = ExponentialFilter::new(0.3, 0.0);
        assert_relative_eq!(filter.step(100.0), 30.0, epsilon = 1e-4);
        assert_relative_eq!(filter.step(100.0), 51.0, epsilon = 1e-4);
        assert_eq!(filter.target(), Some(100.0));
    }

    #[test]
    fn test_settle_converges_and_clears_target() {
        let mut filter = ExponentialFilter::new(0.3, 0.0);
        filter.step(40.0);

        let mut steps = 0;
        while filter.settle().is_some() {
            steps += 1;
            assert!(steps < 100, "filter never settled");
        }
        assert_relative_eq!(filter.current(), 40.0);
        assert_eq!(filter.target(), None);
    }

    #[test]
    fn test_snap() {
        let mut filter = ExponentialFilter::new(0.3, 10.0);
        filter.step(90.0);
        filter.snap(64.0);
        assert_relative_eq!(filter.current(), 64.0);
        assert_eq!(filter.settle(), None);
    }

    #[test]
    fn test_unit_alpha_tracks_input() {
        let mut filter = ExponentialFilter::new(1.0, 0.0);
        assert_relative_eq!(filter.step(12.0), 12.0);
        assert_eq!(filter.target(), None);
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_relative_eq!(ExponentialFilter::new(3.0, 0.0).alpha(), 1.0);
        assert_relative_eq!(ExponentialFilter::new(-1.0, 0.0).alpha(), 0.0);
    }
}
