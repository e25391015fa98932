//! gpsdo is the time/frequency synchronization core of a GPS-disciplined
//! precision clock. It disciplines a free-running hardware cycle counter to
//! the GPS pulse-per-second signal, maintains a leap-second-aware calendar
//! representation of every second boundary, and answers sub-second "what time
//! is it right now" queries for the physical display outputs built on top.
//!
//! # Device interfaces
//! The crate is designed to run on embedded targets and cannot use the
//! standard library to reach the hardware. The pulse-capture peripheral, the
//! microsecond counter, and the receiver UART are abstracted behind the
//! [`PulseCapture`](pps::PulseCapture), [`MonotonicClock`](pps::MonotonicClock)
//! and [`GpsUart`](gps::GpsUart) traits; the user of the library provides
//! implementations for their platform.
//!
//! # Execution model
//! Two polling contexts share the work:
//!
//! * a fast context runs [`PpsSampler::dispatch`](pps::PpsSampler::dispatch)
//!   in a tight loop, latching pulse-counter values with minimal latency;
//! * the main context runs [`Pps::dispatch`](pps::Pps::dispatch) and
//!   [`GpsFeed::dispatch`](gps::GpsFeed::dispatch) from a cooperative loop
//!   that never blocks in steady state.
//!
//! The only state shared between the two is the snapshot hand-off cell in
//! [`pps::SnapshotCell`]; everything else is owned by the main context.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
mod float_polyfill;
pub mod gps;
pub mod pps;
pub mod time;

pub use gps::GpsFeed;
pub use pps::{Pps, PpsSampler};

#[cfg(feature = "fuzz")]
pub mod fuzz {
    pub use crate::gps::fuzz::FuzzRxBuffer;
}
