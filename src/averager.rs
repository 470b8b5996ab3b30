/// Incremental arithmetic mean
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Averager {
    /// Current mean value
    pub mean: f64,
    /// Number of accumulated samples
    pub count: u32,
}

impl Averager {
    /// Builds new (empty) [Averager]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push new value into [Averager], returns updated mean
    pub fn add(&mut self, x: f64) -> f64 {
        self.count += 1;
        self.mean += (x - self.mean) / self.count as f64;
        self.mean
    }

    /// Reset [Averager]
    pub fn reset(&mut self) {
        self.count = 0;
        self.mean = 0.0;
    }

    /// True if no sample has been accumulated since last reset
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod test {
    use super::Averager;
    use rstest::*;

    #[rstest]
    #[case(&[1.0], 1.0)]
    #[case(&[1.0, 0.5], 0.75)]
    #[case(&[2.0, 4.0, 6.0, 8.0], 5.0)]
    fn averager(#[case] samples: &[f64], #[case] expected: f64) {
        let mut avg = Averager::new();
        assert!(avg.is_empty());

        for x_i in samples {
            avg.add(*x_i);
        }

        assert_eq!(avg.count as usize, samples.len());
        assert!((avg.mean - expected).abs() < 1.0E-12);

        avg.reset();
        assert!(avg.is_empty());
        assert_eq!(avg.mean, 0.0);
    }
}
