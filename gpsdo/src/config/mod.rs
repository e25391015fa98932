//! Configuration of the discipline engine and the derived time scales.
//!
//! The numeric values in the defaults are empirical calibration for the
//! reference hardware (a 125 MHz core counting every other cycle, driven by a
//! u-blox timepulse with a 100 ms calibration pulse). They encode tuning that
//! cannot be re-derived from the algorithm alone; treat them as data.

/// Calibration constants for the PPS frequency-lock engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisciplineConfig {
    /// Counted oscillator cycles in one nominal second.
    pub nominal_cycles_per_second: u32,
    /// Counted cycles in the nominal calibration pulse.
    pub nominal_pulse_cycles: u32,
    /// Largest pulse-width deviation from nominal for which the pulse still
    /// counts as evidence of lock.
    pub pulse_tolerance_cycles: u32,
    /// Largest full-second deviation from nominal that is folded into the
    /// moving average; anything larger is a discontinuity.
    pub second_tolerance_cycles: u32,
    /// Persistence level at or below which a locked engine unlocks.
    pub lock_threshold_low: i32,
    /// Persistence level at or above which an unlocked engine locks.
    pub lock_threshold_high: i32,
    /// Lower saturation bound of the persistence counter.
    pub persistence_floor: i32,
    /// Upper saturation bound of the persistence counter.
    pub persistence_ceiling: i32,
    /// Persistence step when both quality checks pass.
    pub persistence_gain: i32,
    /// Persistence step when the pulse-width check fails.
    pub persistence_decay: i32,
}

impl Default for DisciplineConfig {
    fn default() -> Self {
        let nominal_cycles_per_second = 125_000_000 / 2;
        let nominal_pulse_cycles = nominal_cycles_per_second / 10;
        Self {
            nominal_cycles_per_second,
            nominal_pulse_cycles,
            // 1% on the short pulse, 0.01% on the full second.
            pulse_tolerance_cycles: nominal_pulse_cycles / 100,
            second_tolerance_cycles: nominal_cycles_per_second / 10_000,
            lock_threshold_low: 0,
            lock_threshold_high: 10,
            persistence_floor: 0,
            persistence_ceiling: 300,
            persistence_gain: 3,
            persistence_decay: -1,
        }
    }
}

/// Fixed offsets relating the time scales derived from GPS time.
///
/// Passed explicitly to [`TopsOfSeconds`](crate::time::TopsOfSeconds) rather
/// than read from process-wide constants, so a host can run clocks for
/// different zones side by side.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeScaleConfig {
    /// TAI minus GPS system time. A fixed constant of the GPS design.
    pub tai_minus_gps: i32,
    /// Fixed local-zone offset from UTC, in seconds. No DST rules; the
    /// reference clock displays standard time year round.
    pub local_minus_utc_seconds: i32,
}

impl Default for TimeScaleConfig {
    fn default() -> Self {
        Self {
            tai_minus_gps: 19,
            local_minus_utc_seconds: -8 * 3600,
        }
    }
}
