//! The PPS frequency-lock engine.
//!
//! A GPS timepulse marks every true second boundary with sub-microsecond
//! accuracy, but only once per second; the free-running oscillator gives
//! fine-grained time, but drifts. This module marries the two. The fast
//! context ([`PpsSampler`]) does nothing except latch hardware pulse-counter
//! values the instant they complete; the main context ([`Pps`]) turns the
//! latched samples into a smoothed cycles-per-GPS-second estimate, a
//! hysteretic locked/unlocked state, and the interpolation queries every
//! display output schedules against.
//!
//! Loss of the GPS signal never stops the engine: the oscillator keeps free
//! running, interpolation keeps extrapolating from the last good estimate,
//! and the lock flag tells consumers how much to trust it.

mod average;
mod snapshot;

pub use average::MovingAverage;
pub use snapshot::{PpsSnapshot, SnapshotCell};

use crate::config::DisciplineConfig;
#[allow(unused_imports)]
use crate::float_polyfill::FloatPolyfill;

/// Seconds of history in the cycles-per-second moving average.
pub const AVERAGE_WINDOW: usize = 60;

/// A completed measurement from the pulse-counting peripheral.
///
/// Detection is two-stage: the short calibration pulse completes first, then
/// the full second. Both must be seen for a second to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The calibration pulse ended; `cycles` is its measured width.
    PulseComplete { cycles: u32 },
    /// A full second elapsed between rising edges; `cycles` is its measured
    /// length.
    SecondComplete { cycles: u32 },
}

/// Interface to the pulse-capture peripheral, polled from the fast context.
pub trait PulseCapture {
    /// Returns the next pending event, or `None` when the hardware has
    /// nothing new. Must never block.
    fn try_capture(&mut self) -> Option<CaptureEvent>;
}

/// A read-only microsecond counter driven by the same oscillator the engine
/// disciplines.
pub trait MonotonicClock {
    fn now_micros(&self) -> u64;
}

/// Fast-context half of the engine.
///
/// Runs in a tight polling loop on its own core so that the latency between
/// a hardware capture and the latched snapshot stays minimal. It holds no
/// discipline state at all; everything it learns goes out through the
/// [`SnapshotCell`].
#[derive(Debug)]
pub struct PpsSampler<'a, C, M> {
    capture: C,
    clock: M,
    cell: &'a SnapshotCell,
    completed_seconds: u32,
    cycles_in_last_second: u32,
    cycles_in_last_pulse: u32,
    top_of_second_micros: u64,
    pulse_complete: bool,
}

impl<'a, C: PulseCapture, M: MonotonicClock> PpsSampler<'a, C, M> {
    pub fn new(capture: C, clock: M, cell: &'a SnapshotCell) -> Self {
        Self {
            capture,
            clock,
            cell,
            completed_seconds: 0,
            cycles_in_last_second: 0,
            cycles_in_last_pulse: 0,
            top_of_second_micros: 0,
            pulse_complete: false,
        }
    }

    /// One iteration of the fast polling loop: drain the peripheral, latch
    /// any completed boundaries, publish.
    pub fn dispatch(&mut self) {
        while let Some(event) = self.capture.try_capture() {
            match event {
                CaptureEvent::PulseComplete { cycles } => {
                    self.cycles_in_last_pulse = cycles;
                    self.pulse_complete = true;
                }
                CaptureEvent::SecondComplete { cycles } => {
                    // Ignore a bare second-complete: without the preceding
                    // pulse the measurement window never opened.
                    if self.pulse_complete {
                        self.cycles_in_last_second = cycles;
                        self.completed_seconds = self.completed_seconds.wrapping_add(1);
                        self.top_of_second_micros = self.clock.now_micros();
                        self.pulse_complete = false;
                    }
                }
            }
        }

        self.cell.publish(PpsSnapshot {
            completed_seconds: self.completed_seconds,
            cycles_in_last_second: self.cycles_in_last_second,
            cycles_in_last_pulse: self.cycles_in_last_pulse,
            top_of_second_micros: self.top_of_second_micros,
        });
    }
}

/// Emitted by [`Pps::dispatch`] when a new second boundary was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpsTick {
    pub completed_seconds: u32,
    pub locked: bool,
}

/// Main-context half of the engine: frequency discipline, the lock state
/// machine, and the interpolation queries.
#[derive(Debug)]
pub struct Pps<'a, M> {
    cell: &'a SnapshotCell,
    clock: M,
    config: DisciplineConfig,
    cycles_per_second: MovingAverage<AVERAGE_WINDOW>,
    observed_seconds: u32,
    top_of_second_micros: u64,
    lock_persistence: i32,
    locked: bool,
}

impl<'a, M: MonotonicClock> Pps<'a, M> {
    pub fn new(clock: M, cell: &'a SnapshotCell, config: DisciplineConfig) -> Self {
        Self {
            cell,
            clock,
            config,
            cycles_per_second: MovingAverage::new(config.nominal_cycles_per_second as u64),
            observed_seconds: 0,
            top_of_second_micros: 0,
            lock_persistence: config.persistence_floor,
            locked: false,
        }
    }

    /// One iteration of the main polling loop.
    ///
    /// Returns a tick exactly when a second boundary has completed since the
    /// previous call, after folding the new sample into the discipline state.
    pub fn dispatch(&mut self) -> Option<PpsTick> {
        let snapshot = self.cell.read();
        if snapshot.completed_seconds == self.observed_seconds {
            return None;
        }
        self.observed_seconds = snapshot.completed_seconds;
        self.top_of_second_micros = snapshot.top_of_second_micros;

        let pulse_deviation = snapshot
            .cycles_in_last_pulse
            .abs_diff(self.config.nominal_pulse_cycles);
        let pulse_ok = pulse_deviation <= self.config.pulse_tolerance_cycles;

        let second_deviation = snapshot
            .cycles_in_last_second
            .abs_diff(self.config.nominal_cycles_per_second);

        if second_deviation > self.config.second_tolerance_cycles {
            // Discontinuity. One wild sample must not be smoothed into the
            // average; start over from nominal.
            self.cycles_per_second
                .reset(self.config.nominal_cycles_per_second as u64);
            self.lock_persistence = self.config.persistence_floor;
            log::debug!(
                "pps discontinuity, second measured {} cycles off nominal",
                second_deviation
            );
        } else {
            self.cycles_per_second
                .add_sample(snapshot.cycles_in_last_second as u64);
            let step = if pulse_ok {
                self.config.persistence_gain
            } else {
                log::trace!(
                    "pps pulse width {} cycles off nominal",
                    pulse_deviation
                );
                self.config.persistence_decay
            };
            self.lock_persistence = (self.lock_persistence + step).clamp(
                self.config.persistence_floor,
                self.config.persistence_ceiling,
            );
        }

        // Asymmetric thresholds: a locked engine stays locked until
        // persistence drains to the low bar, an unlocked one stays unlocked
        // until it climbs to the high bar. No chatter on a noisy boundary.
        let was_locked = self.locked;
        if self.locked {
            if self.lock_persistence <= self.config.lock_threshold_low {
                self.locked = false;
            }
        } else if self.lock_persistence >= self.config.lock_threshold_high {
            self.locked = true;
        }
        if self.locked != was_locked {
            if self.locked {
                log::info!("pps locked after {} seconds", self.observed_seconds);
            } else {
                log::warn!("pps lock lost at second {}", self.observed_seconds);
            }
        }

        Some(PpsTick {
            completed_seconds: self.observed_seconds,
            locked: self.locked,
        })
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn completed_seconds(&self) -> u32 {
        self.observed_seconds
    }

    /// Smoothed oscillator cycles per GPS second. Exposed for status display.
    pub fn cycles_per_second(&self) -> f64 {
        self.cycles_per_second.mean()
    }

    /// Predicted hardware timestamp, in microseconds, of the instant
    /// `additional_micros` past the boundary of GPS second
    /// `completed_seconds`.
    ///
    /// Linear extrapolation from the last observed boundary through the
    /// smoothed cycles-per-second ratio. Monotonic in `additional_micros`
    /// and continuous across a second increment: one full second of offset
    /// equals the next second at offset zero. Every output consumer uses
    /// this one query to test and schedule its sub-second deadlines.
    pub fn time_micros_of(&self, completed_seconds: u32, additional_micros: u64) -> u64 {
        let dt_seconds = completed_seconds as i64 - self.observed_seconds as i64;
        let dt_nominal_micros = dt_seconds as f64 * 1_000_000.0 + additional_micros as f64;
        let dt_hardware_micros = dt_nominal_micros * self.hardware_micros_per_gps_second() / 1_000_000.0;
        (self.top_of_second_micros as f64 + dt_hardware_micros).round() as u64
    }

    /// Inverse query: the current GPS second count and microseconds elapsed
    /// into it, according to the hardware clock right now.
    pub fn time(&self) -> (u32, u32) {
        let elapsed = self
            .clock
            .now_micros()
            .saturating_sub(self.top_of_second_micros) as f64;
        let seconds = elapsed / self.hardware_micros_per_gps_second();
        let whole = seconds.floor();
        let additional_micros = (seconds - whole) * 1_000_000.0;
        (
            self.observed_seconds.wrapping_add(whole as u32),
            additional_micros as u32,
        )
    }

    // Before any pulse has been observed the average defaults to nominal and
    // this is exactly 1e6: interpolation degenerates to the raw hardware
    // clock instead of failing.
    fn hardware_micros_per_gps_second(&self) -> f64 {
        self.cycles_per_second.mean() * 1_000_000.0 / self.config.nominal_cycles_per_second as f64
    }
}
