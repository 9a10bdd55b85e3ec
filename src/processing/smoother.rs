//! First-order exponential smoothing.

#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    alpha: f64,
    state: Option<f64>,
}

impl ExponentialSmoother {
    pub const fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    /// The first value seeds the state and is returned unchanged.
    pub fn smooth(&mut self, x: f64) -> f64 {
        let next = match self.state {
            None => x,
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
        };
        self.state = Some(next);
        next
    }

    pub fn current(&self) -> Option<f64> {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output_equals_first_input() {
        let mut s = ExponentialSmoother::new(0.1);
        assert_eq!(s.current(), None);
        assert_eq!(s.smooth(3.7), 3.7);
        assert_eq!(s.current(), Some(3.7));
    }

    #[test]
    fn test_constant_input_converges_monotonically_within_bounds() {
        for (initial, x) in [(5.0, -1.0), (-2.0, 0.5), (0.0, 0.0)] {
            let mut s = ExponentialSmoother::new(0.1);
            s.smooth(initial);
            let lo = f64::min(initial, x);
            let hi = f64::max(initial, x);
            let mut prev_gap = (initial - x).abs();
            for _ in 0..300 {
                let y = s.smooth(x);
                assert!(y >= lo - 1e-12 && y <= hi + 1e-12, "{y} outside [{lo}, {hi}]");
                let gap = (y - x).abs();
                assert!(gap <= prev_gap + 1e-15);
                prev_gap = gap;
            }
            assert!(prev_gap < 1e-9);
        }
    }

    #[test]
    fn test_update_rule() {
        let mut s = ExponentialSmoother::new(0.25);
        s.smooth(0.0);
        assert!((s.smooth(4.0) - 1.0).abs() < 1e-12);
        assert!((s.smooth(4.0) - 1.75).abs() < 1e-12);
    }
}
