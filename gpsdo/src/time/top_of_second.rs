use super::Ymdhms;
use crate::config::TimeScaleConfig;

/// A scheduled leap-second event, as reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeapSecond {
    /// Signed seconds until the event. Counts down through zero as seconds
    /// pass; far-negative values mean the last event is long past.
    pub time_until: i32,
    /// Positive for an inserted second (a `:60`), negative for a deleted one.
    /// Kept as the raw signed value the receiver reports, which may be zero.
    pub direction: i8,
}

/// The full time state of one GPS-second boundary.
///
/// Each representation is `None` until enough GPS data has arrived to derive
/// it; representations only go back to `None` through [`invalidate`], which
/// the feed calls when PPS lock is lost. TAI and local time are re-derived
/// from UTC whenever UTC or the GPS−UTC offset changes; if a re-derivation
/// disagrees with a value already computed for the same instant, that is a
/// detected inconsistency and bumps `error_count`. The counter is cumulative
/// diagnostic state, never a correctness gate.
///
/// [`invalidate`]: TopOfSecond::invalidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopOfSecond {
    pub utc: Option<Ymdhms>,
    pub tai: Option<Ymdhms>,
    pub local: Option<Ymdhms>,
    /// Current GPS−UTC leap offset, in seconds.
    pub gps_minus_utc: Option<i8>,
    pub next_leap_second: Option<LeapSecond>,
    pub error_count: u32,
    timescale: TimeScaleConfig,
}

/// Half-width of the "the leap event lands on this top of minute" window, in
/// seconds. A heuristic, not an exact trigger: the countdown is only checked
/// against it when the seconds field is already at the pre-leap value.
const LEAP_WINDOW_SECONDS: i32 = 20;

impl TopOfSecond {
    pub fn new(timescale: TimeScaleConfig) -> Self {
        Self {
            utc: None,
            tai: None,
            local: None,
            gps_minus_utc: None,
            next_leap_second: None,
            error_count: 0,
            timescale,
        }
    }

    /// Drops every representation back to unknown. The error counter is
    /// deliberately preserved; it is a lifetime diagnostic.
    pub fn invalidate(&mut self) {
        self.utc = None;
        self.tai = None;
        self.local = None;
        self.gps_minus_utc = None;
        self.next_leap_second = None;
    }

    /// Sets the UTC calendar value for this boundary and derives whatever
    /// else can be derived from it. A conflicting value for an instant that
    /// was already known is counted as a fault but still accepted: the
    /// receiver is the authority.
    pub fn set_utc(&mut self, utc: Ymdhms) {
        if let Some(old) = self.utc {
            if old != utc {
                self.error_count += 1;
                log::debug!("utc for this second changed from {} to {}", old, utc);
            }
        }
        self.utc = Some(utc);
        self.try_derive_tai();
        self.try_derive_local();
    }

    /// Sets the current GPS−UTC leap offset and re-derives TAI.
    pub fn set_gps_minus_utc(&mut self, offset: i8) {
        self.gps_minus_utc = Some(offset);
        self.try_derive_tai();
    }

    /// Records the receiver-reported countdown to the next leap event.
    pub fn set_next_leap_second(&mut self, time_until: i32, direction: i8) {
        self.next_leap_second = Some(LeapSecond {
            time_until,
            direction,
        });
    }

    /// Populates this boundary as the second after `prev`.
    ///
    /// TAI advances by exactly one second, always. UTC normally does too, but
    /// when the leap countdown says the event is at this top of minute the
    /// special calendar values are produced instead: entering `:60` from
    /// `:59` and leaving it again for an insertion, or jumping from `:58`
    /// straight to the next minute for a deletion. The countdown itself is
    /// GPS-supplied truth and merely decrements here, so a stretch of lost
    /// messages re-aligns as soon as the countdown is re-acquired.
    pub fn set_from_prev_second(&mut self, prev: &TopOfSecond) {
        if let Some(prev_tai) = prev.tai {
            let mut tai = prev_tai;
            tai.add_seconds(1);
            self.tai = Some(tai);
        }

        if let Some(leap) = prev.next_leap_second {
            self.set_next_leap_second(leap.time_until - 1, leap.direction);
        }

        if let (Some(prev_utc), Some(leap)) = (prev.utc, prev.next_leap_second) {
            let event_this_minute =
                (-LEAP_WINDOW_SECONDS..=LEAP_WINDOW_SECONDS).contains(&leap.time_until);

            let mut utc = prev_utc;
            let mut stepped_specially = false;
            if event_this_minute {
                if leap.direction > 0 {
                    if prev_utc.sec == 59 {
                        // Insertion: render the :60 second.
                        utc.sec = 60;
                        stepped_specially = true;
                    } else if prev_utc.sec == 60 {
                        // Leaving the inserted second for the next minute.
                        utc.sec = 59;
                        utc.add_seconds(1);
                        stepped_specially = true;
                    }
                } else if prev_utc.sec == 58 {
                    // Deletion: :59 never happens.
                    utc.add_seconds(2);
                    stepped_specially = true;
                }
            }
            if !stepped_specially {
                utc.add_seconds(1);
            }
            self.utc = Some(utc);
        }

        self.try_derive_local();
    }

    fn try_derive_tai(&mut self) {
        let (Some(utc), Some(gps_minus_utc)) = (self.utc, self.gps_minus_utc) else {
            return;
        };

        let mut tai = utc;
        tai.add_seconds(self.timescale.tai_minus_gps as i64 + gps_minus_utc as i64);

        if let Some(old) = self.tai {
            if old != tai {
                self.error_count += 1;
                log::debug!("tai for this second changed from {} to {}", old, tai);
            }
        }
        self.tai = Some(tai);
    }

    fn try_derive_local(&mut self) {
        let Some(utc) = self.utc else {
            return;
        };

        let mut local = utc;
        local.add_seconds(self.timescale.local_minus_utc_seconds as i64);

        if let Some(old) = self.local {
            if old != local {
                self.error_count += 1;
                log::debug!("local time for this second changed from {} to {}", old, local);
            }
        }
        self.local = Some(local);
    }
}
