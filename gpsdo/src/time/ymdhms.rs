use core::fmt;

use super::{SECS_PER_DAY, SECS_PER_HOUR, SECS_PER_MIN};

/// A civil (proleptic Gregorian) calendar timestamp.
///
/// Fields are stored exactly as given; construction performs no validation
/// because the GPS decode layer range-checks upstream. `sec` may be 60 to
/// represent an inserted leap second. Out-of-range inputs produce arithmetic
/// results consistent with the linear day-count transform: deterministic, but
/// garbage in, garbage out.
///
/// The derived ordering compares year, then month, day, hour, minute, second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ymdhms {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
}

impl Ymdhms {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, min: u8, sec: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            min,
            sec,
        }
    }

    /// Add a signed number of days, carrying through months and years with
    /// full Gregorian leap-year rules (including the 100/400-year cases).
    ///
    /// Always performed in linear day-count space; `add_days(366)` from a
    /// date in a leap year lands on the same month and day one year later
    /// only if the destination year is also a leap year.
    pub fn add_days(&mut self, days: i64) {
        self.set_from_linear_days(self.to_linear_days() + days);
    }

    /// Add a signed number of seconds, wrapping whole days as needed.
    /// Correct for negative deltas spanning multiple days.
    pub fn add_seconds(&mut self, seconds: i64) {
        let seconds_in_day = self.seconds_into_day() + seconds;
        let day_wraps = seconds_in_day.div_euclid(SECS_PER_DAY);
        if day_wraps != 0 {
            self.add_days(day_wraps);
        }
        self.set_seconds_into_day(seconds_in_day.rem_euclid(SECS_PER_DAY));
    }

    pub fn is_leap_year(&self) -> bool {
        self.year % 4 == 0 && (self.year % 100 != 0 || self.year % 400 == 0)
    }

    /// Day of the year; January 1st is day 1.
    pub fn day_of_year(&self) -> u16 {
        let jan_first = Self::new(self.year, 1, 1, 0, 0, 0);
        (self.to_linear_days() - jan_first.to_linear_days() + 1) as u16
    }

    fn seconds_into_day(&self) -> i64 {
        self.hour as i64 * SECS_PER_HOUR + self.min as i64 * SECS_PER_MIN + self.sec as i64
    }

    fn set_seconds_into_day(&mut self, mut seconds: i64) {
        self.hour = (seconds / SECS_PER_HOUR) as u8;
        seconds %= SECS_PER_HOUR;
        self.min = (seconds / SECS_PER_MIN) as u8;
        self.sec = (seconds % SECS_PER_MIN) as u8;
    }

    // Linear Gregorian day count with March-based months, so the leap day
    // falls at the end of the shifted year. The zero point is arbitrary; only
    // the two transforms agreeing matters.
    fn to_linear_days(&self) -> i64 {
        let m = (self.month as i64 + 9) % 12;
        let y = self.year as i64 - m / 10;
        let d = self.day as i64;
        365 * y + y / 4 - y / 100 + y / 400 + (m * 306 + 5) / 10 + (d - 1)
    }

    fn set_from_linear_days(&mut self, days: i64) {
        let mut y = (10_000 * days + 14_780) / 3_652_425;
        let mut day_of_shifted_year = days - (365 * y + y / 4 - y / 100 + y / 400);
        if day_of_shifted_year < 0 {
            y -= 1;
            day_of_shifted_year = days - (365 * y + y / 4 - y / 100 + y / 400);
        }
        let shifted_month = (100 * day_of_shifted_year + 52) / 3060;

        self.year = (y + (shifted_month + 2) / 12) as u16;
        self.month = ((shifted_month + 2) % 12 + 1) as u8;
        self.day = (day_of_shifted_year - (shifted_month * 306 + 5) / 10 + 1) as u8;
    }
}

impl fmt::Display for Ymdhms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.min, self.sec
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: u16, month: u8, day: u8) -> Ymdhms {
        Ymdhms::new(year, month, day, 0, 0, 0)
    }

    #[test]
    fn add_days_within_month() {
        let mut t = ymd(2022, 1, 1);
        t.add_days(30);
        assert_eq!(t, ymd(2022, 1, 31));
    }

    #[test]
    fn add_days_backwards_across_year() {
        let mut t = ymd(2022, 1, 1);
        t.add_days(-1);
        assert_eq!(t, ymd(2021, 12, 31));
    }

    #[test]
    fn add_days_across_missing_leap_day() {
        let mut t = ymd(2022, 1, 1);
        t.add_days(59);
        assert_eq!(t, ymd(2022, 3, 1));
    }

    #[test]
    fn add_days_across_leap_day() {
        let mut t = ymd(2024, 1, 1);
        t.add_days(60);
        assert_eq!(t, ymd(2024, 3, 1));
    }

    #[test]
    fn add_days_full_leap_year() {
        let mut t = ymd(2024, 1, 1);
        t.add_days(366);
        assert_eq!(t, ymd(2025, 1, 1));

        let mut t = ymd(2024, 1, 1);
        t.add_days(-365);
        assert_eq!(t, ymd(2023, 1, 1));
    }

    #[test]
    fn add_days_400_year_rule() {
        // 2224 is a leap year; 2200 is not, 2000 was.
        let mut t = ymd(2224, 1, 1);
        t.add_days(366);
        assert_eq!(t, ymd(2225, 1, 1));

        let mut t = ymd(2200, 1, 1);
        t.add_days(365);
        assert_eq!(t, ymd(2201, 1, 1));

        let mut t = ymd(2000, 1, 1);
        t.add_days(366);
        assert_eq!(t, ymd(2001, 1, 1));
    }

    #[test]
    fn add_seconds_simple() {
        let mut t = ymd(1776, 7, 4);
        t.add_seconds(1);
        assert_eq!(t, Ymdhms::new(1776, 7, 4, 0, 0, 1));

        let mut t = ymd(1776, 7, 4);
        t.add_seconds(3661);
        assert_eq!(t, Ymdhms::new(1776, 7, 4, 1, 1, 1));

        let mut t = Ymdhms::new(1776, 7, 4, 3, 32, 17);
        t.add_seconds(146);
        assert_eq!(t, Ymdhms::new(1776, 7, 4, 3, 34, 43));
    }

    #[test]
    fn add_seconds_negative_across_midnight() {
        let mut t = ymd(1776, 7, 4);
        t.add_seconds(-1);
        assert_eq!(t, Ymdhms::new(1776, 7, 3, 23, 59, 59));

        let mut t = ymd(1776, 7, 4);
        t.add_seconds(-3600);
        assert_eq!(t, Ymdhms::new(1776, 7, 3, 23, 0, 0));
    }

    #[test]
    fn add_seconds_whole_days() {
        let mut t = ymd(1776, 7, 4);
        t.add_seconds(-86_400);
        assert_eq!(t, ymd(1776, 7, 3));

        let mut t = ymd(1776, 7, 4);
        t.add_seconds(86_400);
        assert_eq!(t, ymd(1776, 7, 5));
    }

    #[test]
    fn add_seconds_round_trips() {
        let original = Ymdhms::new(2015, 5, 18, 14, 3, 24);
        for delta in [1, 59, 3600, 86_399, 86_401, 10_000_000] {
            let mut t = original;
            t.add_seconds(delta);
            t.add_seconds(-delta);
            assert_eq!(t, original, "delta {delta}");
        }
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ymd(2022, 1, 2) > ymd(2022, 1, 1));
        assert!(ymd(2022, 2, 1) > ymd(2022, 1, 31));
        assert!(Ymdhms::new(2022, 1, 1, 0, 0, 1) > ymd(2022, 1, 1));
        assert!(ymd(2021, 12, 31) < ymd(2022, 1, 1));
    }

    #[test]
    fn day_of_year_counts_leap_days() {
        assert_eq!(ymd(2022, 1, 1).day_of_year(), 1);
        assert_eq!(ymd(2022, 12, 31).day_of_year(), 365);
        assert_eq!(ymd(2024, 12, 31).day_of_year(), 366);
        assert_eq!(ymd(2024, 3, 1).day_of_year(), 61);
        assert_eq!(ymd(2023, 3, 1).day_of_year(), 60);
    }

    #[test]
    fn leap_year_rules() {
        assert!(ymd(2024, 1, 1).is_leap_year());
        assert!(!ymd(2023, 1, 1).is_leap_year());
        assert!(!ymd(2100, 1, 1).is_leap_year());
        assert!(ymd(2000, 1, 1).is_leap_year());
    }
}
