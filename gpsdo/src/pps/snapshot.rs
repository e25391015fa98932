use core::sync::atomic::{AtomicU32, Ordering};

/// One consistent publication from the fast sampling context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PpsSnapshot {
    /// GPS seconds completed since startup.
    pub completed_seconds: u32,
    /// Measured oscillator cycles in the last complete second.
    pub cycles_in_last_second: u32,
    /// Measured oscillator cycles in the last calibration pulse.
    pub cycles_in_last_pulse: u32,
    /// Hardware microsecond timestamp of the last second boundary.
    pub top_of_second_micros: u64,
}

/// Lock-free hand-off between the fast sampling context and the main context.
///
/// The fast context stores the seconds count, then the payload fields, then
/// the seconds count a second time; the main context reads in the same order
/// and retries the whole read while the two copies disagree. A torn read can
/// only happen when a write straddled it, and a straddling write always
/// changes the seconds count. The writer never blocks and never waits on the
/// reader, which a mutex could not guarantee.
///
/// The 64-bit timestamp is split into two 32-bit atomics so the cell works on
/// targets without native 64-bit atomics; the retry protocol covers tearing
/// between the halves.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    seconds_begin: AtomicU32,
    cycles_in_last_second: AtomicU32,
    cycles_in_last_pulse: AtomicU32,
    top_of_second_micros_hi: AtomicU32,
    top_of_second_micros_lo: AtomicU32,
    seconds_end: AtomicU32,
}

impl SnapshotCell {
    pub const fn new() -> Self {
        Self {
            seconds_begin: AtomicU32::new(0),
            cycles_in_last_second: AtomicU32::new(0),
            cycles_in_last_pulse: AtomicU32::new(0),
            top_of_second_micros_hi: AtomicU32::new(0),
            top_of_second_micros_lo: AtomicU32::new(0),
            seconds_end: AtomicU32::new(0),
        }
    }

    /// Fast-context side. There must be exactly one writer.
    pub fn publish(&self, snapshot: PpsSnapshot) {
        self.seconds_begin
            .store(snapshot.completed_seconds, Ordering::SeqCst);
        self.cycles_in_last_second
            .store(snapshot.cycles_in_last_second, Ordering::SeqCst);
        self.cycles_in_last_pulse
            .store(snapshot.cycles_in_last_pulse, Ordering::SeqCst);
        self.top_of_second_micros_hi
            .store((snapshot.top_of_second_micros >> 32) as u32, Ordering::SeqCst);
        self.top_of_second_micros_lo
            .store(snapshot.top_of_second_micros as u32, Ordering::SeqCst);
        self.seconds_end
            .store(snapshot.completed_seconds, Ordering::SeqCst);
    }

    /// Main-context side: retries until it observes an untorn publication.
    pub fn read(&self) -> PpsSnapshot {
        loop {
            let begin = self.seconds_begin.load(Ordering::SeqCst);
            let cycles_in_last_second = self.cycles_in_last_second.load(Ordering::SeqCst);
            let cycles_in_last_pulse = self.cycles_in_last_pulse.load(Ordering::SeqCst);
            let micros_hi = self.top_of_second_micros_hi.load(Ordering::SeqCst);
            let micros_lo = self.top_of_second_micros_lo.load(Ordering::SeqCst);
            let end = self.seconds_end.load(Ordering::SeqCst);

            if begin == end {
                return PpsSnapshot {
                    completed_seconds: begin,
                    cycles_in_last_second,
                    cycles_in_last_pulse,
                    top_of_second_micros: (micros_hi as u64) << 32 | micros_lo as u64,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_reads_zeroed() {
        let cell = SnapshotCell::new();
        assert_eq!(cell.read(), PpsSnapshot::default());
    }

    #[test]
    fn publish_read_round_trip() {
        let cell = SnapshotCell::new();
        let snapshot = PpsSnapshot {
            completed_seconds: 1234,
            cycles_in_last_second: 62_500_123,
            cycles_in_last_pulse: 6_250_017,
            top_of_second_micros: 0x1_2345_6789,
        };
        cell.publish(snapshot);
        assert_eq!(cell.read(), snapshot);

        let newer = PpsSnapshot {
            completed_seconds: 1235,
            ..snapshot
        };
        cell.publish(newer);
        assert_eq!(cell.read(), newer);
    }
}
