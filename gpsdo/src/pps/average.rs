/// Moving average over a fixed window of cycle counts.
///
/// Gradual oscillator drift is smoothed; discontinuities must not be. The
/// discipline engine therefore calls [`reset`] instead of [`add_sample`]
/// when a sample deviates too far from nominal, and a freshly reset average
/// reports the supplied default until the first real sample lands. The
/// window storage is inline and fixed; reset never reallocates.
///
/// [`reset`]: MovingAverage::reset
/// [`add_sample`]: MovingAverage::add_sample
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    samples: [u64; N],
    next_idx: usize,
    fill: usize,
    running_total: u64,
    default: u64,
}

impl<const N: usize> MovingAverage<N> {
    pub fn new(default: u64) -> Self {
        Self {
            samples: [0; N],
            next_idx: 0,
            fill: 0,
            running_total: 0,
            default,
        }
    }

    /// Discards the whole window and reports `default` until the next sample.
    pub fn reset(&mut self, default: u64) {
        self.next_idx = 0;
        self.fill = 0;
        self.running_total = 0;
        self.default = default;
    }

    pub fn add_sample(&mut self, sample: u64) {
        if self.fill == N {
            self.running_total -= self.samples[self.next_idx];
        } else {
            self.fill += 1;
        }
        self.samples[self.next_idx] = sample;
        self.running_total += sample;
        self.next_idx = (self.next_idx + 1) % N;
    }

    /// Average over the stored samples, computed in floating point over the
    /// full sample count.
    pub fn mean(&self) -> f64 {
        if self.fill == 0 {
            self.default as f64
        } else {
            self.running_total as f64 / self.fill as f64
        }
    }

    /// Number of real samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.fill
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_until_first_sample() {
        let mut avg = MovingAverage::<4>::new(1000);
        assert_eq!(avg.mean(), 1000.0);
        assert_eq!(avg.sample_count(), 0);

        avg.add_sample(10);
        assert_eq!(avg.mean(), 10.0);
        assert_eq!(avg.sample_count(), 1);
    }

    #[test]
    fn averages_partial_and_full_windows() {
        let mut avg = MovingAverage::<4>::new(0);
        avg.add_sample(10);
        avg.add_sample(20);
        assert_eq!(avg.mean(), 15.0);

        avg.add_sample(30);
        avg.add_sample(40);
        assert_eq!(avg.mean(), 25.0);

        // A fifth sample evicts the oldest.
        avg.add_sample(50);
        assert_eq!(avg.mean(), 35.0);
        assert_eq!(avg.sample_count(), 4);
    }

    #[test]
    fn reset_discards_history() {
        let mut avg = MovingAverage::<4>::new(0);
        avg.add_sample(10);
        avg.add_sample(20);

        avg.reset(77);
        assert_eq!(avg.mean(), 77.0);
        assert_eq!(avg.sample_count(), 0);

        avg.add_sample(5);
        assert_eq!(avg.mean(), 5.0);
    }
}
