use super::TopOfSecond;
use crate::config::TimeScaleConfig;

/// A two-slot ring of [`TopOfSecond`]: the second whose boundary has just
/// occurred (`prev`, the authoritative current second) and the second about
/// to occur (`next`, a derived prediction).
///
/// `next` is always a full derivation of `prev` stepped forward by one
/// second, so consumers that sample it just before the hardware PPS edge see
/// the upcoming second; once the edge fires and the ring rotates, that
/// prediction becomes `prev` and a fresh one is derived.
///
/// The ring is owned by the GPS feed. Consumers get shared references and
/// must treat them as snapshots valid for one main-loop iteration.
#[derive(Debug)]
pub struct TopsOfSeconds {
    tops: [TopOfSecond; 2],
    next: usize,
}

impl TopsOfSeconds {
    pub fn new(timescale: TimeScaleConfig) -> Self {
        Self {
            tops: [TopOfSecond::new(timescale); 2],
            next: 0,
        }
    }

    /// Top of the next second.
    pub fn next(&self) -> &TopOfSecond {
        &self.tops[self.next]
    }

    pub fn next_mut(&mut self) -> &mut TopOfSecond {
        &mut self.tops[self.next]
    }

    /// Top of the current second.
    pub fn prev(&self) -> &TopOfSecond {
        &self.tops[1 - self.next]
    }

    pub fn prev_mut(&mut self) -> &mut TopOfSecond {
        &mut self.tops[1 - self.next]
    }

    /// Rotates the ring on a PPS edge: the predicted second becomes current,
    /// and a fresh prediction is derived in its place.
    pub fn top_of_second_has_passed(&mut self) {
        self.next = 1 - self.next;
        let prev = *self.prev();
        let next = self.next_mut();
        next.invalidate();
        next.set_from_prev_second(&prev);
    }

    /// Refreshes the prediction after new GPS data landed in `prev`.
    pub fn rederive_next(&mut self) {
        let prev = *self.prev();
        self.next_mut().set_from_prev_second(&prev);
    }

    /// Drops both slots back to unknown; used when PPS lock is lost.
    pub fn invalidate(&mut self) {
        for top in &mut self.tops {
            top.invalidate();
        }
    }

    /// Cumulative consistency-fault count across both slots. Diagnostics
    /// only; the clock keeps running regardless.
    pub fn error_count(&self) -> u32 {
        self.tops.iter().map(|top| top.error_count).sum()
    }
}

impl Default for TopsOfSeconds {
    fn default() -> Self {
        Self::new(TimeScaleConfig::default())
    }
}
