#[cfg(feature = "serde")]
use serde::Serialize;

/// Running (count, sum, sum of squares) accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Averager {
    pub count: u64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl Averager {
    /// Builds new [Averager]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push new value into [Averager]
    pub fn add(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    /// Mean value, if at least one value was pushed
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    /// Sample standard deviation, if at least two values were pushed
    pub fn std_dev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        Some(var.max(0.0).sqrt())
    }

    /// Reset [Averager]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod test {
    use super::Averager;

    #[test]
    fn test_averager() {
        let mut avg = Averager::new();
        assert!(avg.mean().is_none());

        for (x_i, mean) in [(1.0, 1.0), (0.5, 0.75), (1.5, 1.0)] {
            avg.add(x_i);
            assert_eq!(avg.mean(), Some(mean));
        }

        let std = avg.std_dev().unwrap();
        assert!((std - 0.5).abs() < 1.0E-12);

        avg.reset();
        assert_eq!(avg.count, 0);
        assert!(avg.std_dev().is_none());
    }
}
