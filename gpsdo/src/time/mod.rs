//! Calendar representations of GPS second boundaries.
//!
//! [`Ymdhms`] is the raw civil-calendar value type. [`TopOfSecond`] bundles
//! the UTC, TAI and local renderings of one specific second boundary together
//! with the leap-second bookkeeping needed to step it forward, and
//! [`TopsOfSeconds`] keeps the current second and a derived one-second
//! lookahead that consumers may read before the boundary actually fires.

mod top_of_second;
mod tops_of_seconds;
mod ymdhms;

pub use top_of_second::{LeapSecond, TopOfSecond};
pub use tops_of_seconds::TopsOfSeconds;
pub use ymdhms::Ymdhms;

pub const SECS_PER_MIN: i64 = 60;
pub const MINS_PER_HOUR: i64 = 60;
pub const HOURS_PER_DAY: i64 = 24;
pub const SECS_PER_HOUR: i64 = SECS_PER_MIN * MINS_PER_HOUR;
pub const SECS_PER_DAY: i64 = SECS_PER_HOUR * HOURS_PER_DAY;
