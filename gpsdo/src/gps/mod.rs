//! The GPS receiver feed.
//!
//! Owns the serial link to the receiver: configures it at startup (output
//! protocol, timepulse shape, periodic time messages), then reassembles and
//! decodes the message stream and folds the decoded fields into the
//! [`TopsOfSeconds`] calendar ring it owns.
//!
//! Decoded calendar fields are only applied while the PPS engine reports
//! lock; the ring's second boundaries are meaningless without a disciplined
//! pulse to anchor them to.

mod frame;
mod messages;
mod wire;

pub use messages::{NavPvt, NavTimels};
pub use wire::ParseError;

use frame::{encode, Frame, RxBuffer};

use crate::config::TimeScaleConfig;
use crate::pps::MonotonicClock;
use crate::time::TopsOfSeconds;

/// How long to wait for the receiver to acknowledge one configuration
/// frame before resending it.
const ACK_TIMEOUT_MICROS: u64 = 1_200_000;

/// Resend attempts per configuration frame before giving up on the
/// receiver entirely.
const CFG_ATTEMPTS: u32 = 10;

const CLASS_ACK: u8 = 0x05;
const ID_ACK: u8 = 0x01;
const ID_NAK: u8 = 0x00;

const CLASS_CFG: u8 = 0x06;
const ID_CFG_PRT: u8 = 0x00;
const ID_CFG_MSG: u8 = 0x01;
const ID_CFG_TP5: u8 = 0x31;

/// Byte-level interface to the receiver's UART.
pub trait GpsUart {
    /// Returns the next received byte, or `None` when the receive FIFO is
    /// empty. Must never block.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queues bytes for transmission.
    fn write_all(&mut self, bytes: &[u8]);
}

/// The receiver-facing half of the clock.
#[derive(Debug)]
pub struct GpsFeed<U, M> {
    uart: U,
    clock: M,
    rx: RxBuffer,
    tops_of_seconds: TopsOfSeconds,
    initialized: bool,
    pps_locked: bool,
    nav_pvt_count: u32,
    nav_timels_count: u32,
}

impl<U: GpsUart, M: MonotonicClock> GpsFeed<U, M> {
    pub fn new(uart: U, clock: M, timescale: TimeScaleConfig) -> Self {
        Self {
            uart,
            clock,
            rx: RxBuffer::new(),
            tops_of_seconds: TopsOfSeconds::new(timescale),
            initialized: false,
            pps_locked: false,
            nav_pvt_count: 0,
            nav_timels_count: 0,
        }
    }

    /// Configures the receiver. Returns whether every configuration frame
    /// was acknowledged; on failure the feed still runs, decoding whatever
    /// the receiver sends on its own.
    pub fn initialize(&mut self) -> bool {
        self.initialized = self.configure_port()
            && self.configure_timepulse()
            && self.enable_message(NavPvt::CLASS, NavPvt::ID)
            && self.enable_message(NavTimels::CLASS, NavTimels::ID)
            && self.enable_message(0x0d, 0x01); // TIM-TP
        if !self.initialized {
            log::error!("gps receiver configuration failed");
        }
        self.initialized
    }

    pub fn initialized_successfully(&self) -> bool {
        self.initialized
    }

    /// UART port configuration: UBX in and out, 9600 baud, 8N1.
    fn configure_port(&mut self) -> bool {
        let mut payload = [0u8; 20];
        payload[0] = 1; // UART 1
        payload[4..8].copy_from_slice(&0x0000_08c0u32.to_le_bytes()); // 8N1
        payload[8..12].copy_from_slice(&9600u32.to_le_bytes());
        payload[12..14].copy_from_slice(&0x0001u16.to_le_bytes()); // in: UBX
        payload[14..16].copy_from_slice(&0x0001u16.to_le_bytes()); // out: UBX
        payload[16..18].copy_from_slice(&0x0002u16.to_le_bytes()); // extended timeout
        self.send_cfg(ID_CFG_PRT, &payload)
    }

    /// Timepulse configuration: a 10 Hz calibration train while unlocked,
    /// one rising edge per top of second once the receiver has lock.
    fn configure_timepulse(&mut self) -> bool {
        let flags: u32 = 0x01 // active
            | 0x02 // lockGpsFreq
            | 0x04 // lockedOtherSet
            | 0x08 // isFreq
            | 0x10 // isLength
            | 0x20 // alignToTow
            | 0x40 // rising edge polarity
            | 1 << 7 // GPS timegrid
            | 1 << 11; // syncMode
        let mut payload = [0u8; 32];
        payload[1] = 0x01; // message version
        payload[8..12].copy_from_slice(&10u32.to_le_bytes()); // freqPeriod
        payload[12..16].copy_from_slice(&1u32.to_le_bytes()); // freqPeriodLock
        payload[16..20].copy_from_slice(&50_000u32.to_le_bytes()); // pulseLenRatio
        payload[20..24].copy_from_slice(&500_000u32.to_le_bytes()); // pulseLenRatioLock
        payload[28..32].copy_from_slice(&flags.to_le_bytes());
        self.send_cfg(ID_CFG_TP5, &payload)
    }

    /// Asks for one message class/id at a once-per-second rate.
    fn enable_message(&mut self, class: u8, id: u8) -> bool {
        self.send_cfg(ID_CFG_MSG, &[class, id, 1])
    }

    /// Sends one configuration frame and waits for its ACK, resending on
    /// timeout or NAK.
    fn send_cfg(&mut self, id: u8, payload: &[u8]) -> bool {
        let frame = encode(CLASS_CFG, id, payload);
        for attempt in 0..CFG_ATTEMPTS {
            if attempt > 0 {
                log::debug!("resending cfg frame {:#04x}, attempt {}", id, attempt + 1);
            }
            self.uart.write_all(&frame);

            let deadline = self.clock.now_micros() + ACK_TIMEOUT_MICROS;
            'wait: while self.clock.now_micros() < deadline {
                self.service_uart();
                while let Some(reply) = self.rx.extract_frame() {
                    if reply.class != CLASS_ACK {
                        // Periodic traffic may already be flowing; it is not
                        // interesting until configuration is done.
                        continue;
                    }
                    if reply.payload.as_slice() != [CLASS_CFG, id] {
                        continue;
                    }
                    match reply.id {
                        ID_ACK => return true,
                        ID_NAK => {
                            log::warn!("gps receiver rejected cfg frame {:#04x}", id);
                            break 'wait;
                        }
                        _ => {}
                    }
                }
            }
        }
        false
    }

    /// The calendar ring this feed maintains.
    pub fn tops_of_seconds(&self) -> &TopsOfSeconds {
        &self.tops_of_seconds
    }

    /// Called once per completed PPS second: rotates the calendar ring so
    /// the predicted second becomes current.
    pub fn pps_pulsed(&mut self) {
        self.tops_of_seconds.top_of_second_has_passed();
    }

    /// Tracks the PPS engine's lock state. Losing lock invalidates the
    /// calendar; its second boundaries are no longer anchored to anything.
    pub fn pps_lock_state(&mut self, locked: bool) {
        if self.pps_locked && !locked {
            log::warn!("pps lock lost, invalidating calendar state");
            self.tops_of_seconds.invalidate();
        }
        self.pps_locked = locked;
    }

    /// One iteration of the main polling loop: drain the UART and apply
    /// every complete message.
    pub fn dispatch(&mut self) {
        self.service_uart();
        while let Some(frame) = self.rx.extract_frame() {
            self.handle_frame(&frame);
        }
    }

    fn service_uart(&mut self) {
        while let Some(byte) = self.uart.read_byte() {
            if self.rx.push(byte).is_err() {
                log::warn!("gps receive buffer overflow, dropping input");
                break;
            }
        }
    }

    fn handle_frame(&mut self, frame: &Frame) {
        match (frame.class, frame.id) {
            (NavPvt::CLASS, NavPvt::ID) => match NavPvt::parse(&frame.payload) {
                Ok(pvt) => self.handle_nav_pvt(&pvt),
                Err(e) => log::warn!("bad nav-pvt payload: {}", e),
            },
            (NavTimels::CLASS, NavTimels::ID) => match NavTimels::parse(&frame.payload) {
                Ok(timels) => self.handle_nav_timels(&timels),
                Err(e) => log::warn!("bad nav-timels payload: {}", e),
            },
            (class, id) => {
                log::trace!("ignoring frame class {:#04x} id {:#04x}", class, id);
            }
        }
    }

    fn handle_nav_pvt(&mut self, pvt: &NavPvt) {
        self.nav_pvt_count = self.nav_pvt_count.wrapping_add(1);
        if !pvt.time_ok() || !self.pps_locked {
            return;
        }
        // The solution describes the second currently in progress.
        self.tops_of_seconds.prev_mut().set_utc(pvt.utc);
        self.tops_of_seconds.rederive_next();
        log::trace!(
            "utc {} (acc {} ns, {} sats)",
            pvt.utc,
            pvt.time_accuracy_ns,
            pvt.num_satellites
        );
    }

    fn handle_nav_timels(&mut self, timels: &NavTimels) {
        self.nav_timels_count = self.nav_timels_count.wrapping_add(1);
        if !self.pps_locked {
            return;
        }
        if let Some(offset) = timels.current_gps_minus_utc() {
            self.tops_of_seconds.prev_mut().set_gps_minus_utc(offset);
        }
        if let Some((time_until, direction)) = timels.upcoming_leap_second() {
            self.tops_of_seconds
                .prev_mut()
                .set_next_leap_second(time_until, direction);
        }
        self.tops_of_seconds.rederive_next();
    }

    /// NAV-PVT messages decoded so far. Diagnostics.
    pub fn nav_pvt_count(&self) -> u32 {
        self.nav_pvt_count
    }

    /// NAV-TIMELS messages decoded so far. Diagnostics.
    pub fn nav_timels_count(&self) -> u32 {
        self.nav_timels_count
    }
}

#[cfg(feature = "fuzz")]
pub(crate) mod fuzz {
    pub use super::frame::FuzzRxBuffer;
}

#[cfg(test)]
mod tests {
    use core::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;
    use crate::time::Ymdhms;

    /// Advances a little on every read so timeout loops always terminate.
    struct TestClock {
        now: Cell<u64>,
    }

    impl TestClock {
        fn new() -> Self {
            Self { now: Cell::new(0) }
        }
    }

    impl MonotonicClock for &TestClock {
        fn now_micros(&self) -> u64 {
            let now = self.now.get();
            self.now.set(now + 10_000);
            now
        }
    }

    /// Acknowledges every configuration frame it sees written, when asked to.
    struct MockUart {
        to_read: RefCell<VecDeque<u8>>,
        written: RefCell<Vec<u8>>,
        ack_cfg: bool,
    }

    impl MockUart {
        fn new(ack_cfg: bool) -> Self {
            Self {
                to_read: RefCell::new(VecDeque::new()),
                written: RefCell::new(Vec::new()),
                ack_cfg,
            }
        }

        fn inject(&self, bytes: &[u8]) {
            self.to_read.borrow_mut().extend(bytes.iter().copied());
        }
    }

    impl GpsUart for &MockUart {
        fn read_byte(&mut self) -> Option<u8> {
            self.to_read.borrow_mut().pop_front()
        }

        fn write_all(&mut self, bytes: &[u8]) {
            self.written.borrow_mut().extend_from_slice(bytes);
            if self.ack_cfg && bytes.len() >= 4 && bytes[2] == CLASS_CFG {
                let ack = encode(CLASS_ACK, ID_ACK, &[bytes[2], bytes[3]]);
                self.to_read.borrow_mut().extend(ack.iter().copied());
            }
        }
    }

    fn nav_pvt_frame(utc: Ymdhms) -> Vec<u8> {
        let mut payload = [0u8; 92];
        payload[4..6].copy_from_slice(&utc.year.to_le_bytes());
        payload[6] = utc.month;
        payload[7] = utc.day;
        payload[8] = utc.hour;
        payload[9] = utc.min;
        payload[10] = utc.sec;
        payload[11] = 0x07;
        payload[23] = 9;
        encode(NavPvt::CLASS, NavPvt::ID, &payload).to_vec()
    }

    fn nav_timels_frame(current_ls: i8, time_until: i32, direction: i8) -> Vec<u8> {
        let mut payload = [0u8; 24];
        payload[9] = current_ls as u8;
        payload[11] = direction as u8;
        payload[12..16].copy_from_slice(&time_until.to_le_bytes());
        payload[23] = 0x03;
        encode(NavTimels::CLASS, NavTimels::ID, &payload).to_vec()
    }

    #[test]
    fn initialize_succeeds_when_every_frame_is_acked() {
        let clock = TestClock::new();
        let uart = MockUart::new(true);
        let mut feed = GpsFeed::new(&uart, &clock, TimeScaleConfig::default());

        assert!(feed.initialize());
        assert!(feed.initialized_successfully());

        // Port, timepulse, and three message enables went out.
        let written = uart.written.borrow();
        let cfg_frames = written
            .windows(3)
            .filter(|w| w[0] == 0xb5 && w[1] == 0x62 && w[2] == CLASS_CFG)
            .count();
        assert_eq!(cfg_frames, 5);
    }

    #[test]
    fn initialize_gives_up_after_timeouts() {
        let clock = TestClock::new();
        let uart = MockUart::new(false);
        let mut feed = GpsFeed::new(&uart, &clock, TimeScaleConfig::default());

        assert!(!feed.initialize());
        assert!(!feed.initialized_successfully());
    }

    #[test]
    fn decoded_messages_drive_the_calendar() {
        let clock = TestClock::new();
        let uart = MockUart::new(true);
        let mut feed = GpsFeed::new(&uart, &clock, TimeScaleConfig::default());
        feed.pps_lock_state(true);

        uart.inject(&nav_pvt_frame(Ymdhms::new(2023, 6, 17, 12, 34, 56)));
        feed.dispatch();
        assert_eq!(feed.nav_pvt_count(), 1);
        assert_eq!(
            feed.tops_of_seconds().prev().utc,
            Some(Ymdhms::new(2023, 6, 17, 12, 34, 56))
        );
        // No leap offset yet, so no TAI.
        assert_eq!(feed.tops_of_seconds().prev().tai, None);

        uart.inject(&nav_timels_frame(18, 86_400, 0));
        feed.dispatch();
        assert_eq!(feed.nav_timels_count(), 1);
        assert_eq!(
            feed.tops_of_seconds().prev().tai,
            Some(Ymdhms::new(2023, 6, 17, 12, 35, 33))
        );
        assert_eq!(
            feed.tops_of_seconds().next().utc,
            Some(Ymdhms::new(2023, 6, 17, 12, 34, 57))
        );

        feed.pps_pulsed();
        assert_eq!(
            feed.tops_of_seconds().prev().utc,
            Some(Ymdhms::new(2023, 6, 17, 12, 34, 57))
        );
    }

    #[test]
    fn messages_are_ignored_without_pps_lock() {
        let clock = TestClock::new();
        let uart = MockUart::new(true);
        let mut feed = GpsFeed::new(&uart, &clock, TimeScaleConfig::default());

        uart.inject(&nav_pvt_frame(Ymdhms::new(2023, 6, 17, 12, 34, 56)));
        feed.dispatch();
        // Counted for diagnostics, not applied.
        assert_eq!(feed.nav_pvt_count(), 1);
        assert_eq!(feed.tops_of_seconds().prev().utc, None);
    }

    #[test]
    fn losing_lock_invalidates_the_calendar() {
        let clock = TestClock::new();
        let uart = MockUart::new(true);
        let mut feed = GpsFeed::new(&uart, &clock, TimeScaleConfig::default());
        feed.pps_lock_state(true);

        uart.inject(&nav_pvt_frame(Ymdhms::new(2023, 6, 17, 12, 34, 56)));
        uart.inject(&nav_timels_frame(18, 86_400, 0));
        feed.dispatch();
        assert!(feed.tops_of_seconds().prev().utc.is_some());

        feed.pps_lock_state(false);
        assert_eq!(feed.tops_of_seconds().prev().utc, None);
        assert_eq!(feed.tops_of_seconds().next().utc, None);
    }
}
