use arrayvec::ArrayVec;
use heapless::Deque;

pub(crate) const SYNC1: u8 = 0xb5;
pub(crate) const SYNC2: u8 = 0x62;

/// Largest payload of any message we decode (NAV-PVT, 92 bytes).
pub(crate) const MAX_PAYLOAD_LEN: usize = 92;

/// Sync (2) + class + id + length (2) + payload + checksum (2).
pub(crate) const MAX_FRAME_LEN: usize = 8 + MAX_PAYLOAD_LEN;

/// Raw receive buffer capacity. Generous relative to the frame size so a
/// slow main loop does not drop bytes mid-frame.
const RX_CAPACITY: usize = 2048;

/// Fletcher-style running checksum over class, id, length, and payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Checksum {
    pub(crate) a: u8,
    pub(crate) b: u8,
}

impl Checksum {
    pub(crate) fn over(class: u8, id: u8, payload: &[u8]) -> Self {
        let mut ck = Self::default();
        ck.push(class);
        ck.push(id);
        let len = payload.len() as u16;
        ck.push(len as u8);
        ck.push((len >> 8) as u8);
        for &byte in payload {
            ck.push(byte);
        }
        ck
    }

    fn push(&mut self, byte: u8) {
        self.a = self.a.wrapping_add(byte);
        self.b = self.b.wrapping_add(self.a);
    }
}

/// One checksum-verified frame, stripped to class, id, and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) class: u8,
    pub(crate) id: u8,
    pub(crate) payload: ArrayVec<u8, MAX_PAYLOAD_LEN>,
}

/// Serializes a frame for transmission. Panics if the payload exceeds
/// [`MAX_PAYLOAD_LEN`]; all outgoing payloads are compile-time constants
/// well under it.
pub(crate) fn encode(class: u8, id: u8, payload: &[u8]) -> ArrayVec<u8, MAX_FRAME_LEN> {
    let mut out = ArrayVec::new();
    out.push(SYNC1);
    out.push(SYNC2);
    out.push(class);
    out.push(id);
    let len = payload.len() as u16;
    out.push(len as u8);
    out.push((len >> 8) as u8);
    out.extend(payload.iter().copied());
    let ck = Checksum::over(class, id, payload);
    out.push(ck.a);
    out.push(ck.b);
    out
}

/// Byte-stream reassembler for the receive direction.
///
/// Bytes go in as they arrive from the UART; [`extract_frame`] scans for the
/// sync pattern and pops one verified frame at a time. Garbage between
/// frames, truncated frames, and checksum failures are all recovered from by
/// discarding bytes and rescanning; the stream re-synchronizes on the next
/// intact frame.
///
/// [`extract_frame`]: RxBuffer::extract_frame
#[derive(Debug, Default)]
pub(crate) struct RxBuffer {
    bytes: Deque<u8, RX_CAPACITY>,
}

impl RxBuffer {
    pub(crate) fn new() -> Self {
        Self { bytes: Deque::new() }
    }

    /// Appends one received byte. Fails when the buffer is full.
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), u8> {
        self.bytes.push_back(byte)
    }

    fn peek(&self, idx: usize) -> Option<u8> {
        self.bytes.iter().nth(idx).copied()
    }

    fn drop_front(&mut self, count: usize) {
        for _ in 0..count {
            if self.bytes.pop_front().is_none() {
                break;
            }
        }
    }

    /// Scans for and removes the next complete frame.
    ///
    /// Returns `None` when no complete frame is buffered yet; callers should
    /// push more bytes and try again.
    pub(crate) fn extract_frame(&mut self) -> Option<Frame> {
        loop {
            // Align to the sync pattern, shedding leading garbage.
            match (self.peek(0)?, self.peek(1)) {
                (SYNC1, Some(SYNC2)) => {}
                (SYNC1, None) => return None,
                (SYNC1, Some(_)) => {
                    // A lone sync1; the pair might start at the next byte.
                    self.drop_front(1);
                    continue;
                }
                _ => {
                    self.drop_front(1);
                    continue;
                }
            }

            let class = self.peek(2)?;
            let id = self.peek(3)?;
            let len = u16::from_le_bytes([self.peek(4)?, self.peek(5)?]) as usize;
            if len > MAX_PAYLOAD_LEN {
                // Longer than anything we speak; treat the sync pair as
                // garbage and rescan.
                self.drop_front(2);
                continue;
            }
            if self.bytes.len() < 8 + len {
                return None;
            }

            let mut payload = ArrayVec::new();
            for idx in 0..len {
                payload.push(self.peek(6 + idx)?);
            }
            let ck = Checksum::over(class, id, &payload);
            let (ck_a, ck_b) = (self.peek(6 + len)?, self.peek(7 + len)?);
            self.drop_front(8 + len);

            if (ck.a, ck.b) != (ck_a, ck_b) {
                log::trace!(
                    "dropped frame class {:#04x} id {:#04x} with bad checksum",
                    class,
                    id
                );
                continue;
            }

            return Some(Frame { class, id, payload });
        }
    }
}

/// Fuzzing entry point: the reassembler fed arbitrary bytes must never
/// panic and must only ever yield checksum-valid frames.
#[cfg(feature = "fuzz")]
#[derive(Debug, Default)]
pub struct FuzzRxBuffer(RxBuffer);

#[cfg(feature = "fuzz")]
impl FuzzRxBuffer {
    pub fn new() -> Self {
        Self(RxBuffer::new())
    }

    pub fn push(&mut self, byte: u8) {
        let _ = self.0.push(byte);
    }

    /// Returns the class and id of the next extracted frame, if any.
    pub fn extract_frame(&mut self) -> Option<(u8, u8)> {
        self.0.extract_frame().map(|frame| (frame.class, frame.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(rx: &mut RxBuffer, bytes: &[u8]) {
        for &byte in bytes {
            rx.push(byte).unwrap();
        }
    }

    #[test]
    fn encode_extract_round_trip_through_garbage() {
        let frame = encode(0x01, 0x07, &[0xaa, 0xbb, 0xcc]);

        let mut rx = RxBuffer::new();
        push_all(&mut rx, &[0x00, 0xb5, 0x17, 0x42]);
        push_all(&mut rx, &frame);

        let got = rx.extract_frame().unwrap();
        assert_eq!(got.class, 0x01);
        assert_eq!(got.id, 0x07);
        assert_eq!(got.payload.as_slice(), &[0xaa, 0xbb, 0xcc]);
        assert!(rx.extract_frame().is_none());
    }

    #[test]
    fn split_delivery_completes_on_the_last_byte() {
        let frame = encode(0x05, 0x01, &[0x06, 0x00]);
        let (head, tail) = frame.split_at(5);

        let mut rx = RxBuffer::new();
        push_all(&mut rx, head);
        assert!(rx.extract_frame().is_none());

        push_all(&mut rx, &tail[..tail.len() - 1]);
        assert!(rx.extract_frame().is_none());

        rx.push(tail[tail.len() - 1]).unwrap();
        let got = rx.extract_frame().unwrap();
        assert_eq!((got.class, got.id), (0x05, 0x01));
    }

    #[test]
    fn corrupt_frame_is_skipped_and_stream_recovers() {
        let mut bad = encode(0x01, 0x26, &[0x11; 24]);
        bad[10] ^= 0xff;
        let good = encode(0x01, 0x07, &[0x22; 4]);

        let mut rx = RxBuffer::new();
        push_all(&mut rx, &bad);
        push_all(&mut rx, &good);

        let got = rx.extract_frame().unwrap();
        assert_eq!((got.class, got.id), (0x01, 0x07));
        assert_eq!(got.payload.as_slice(), &[0x22; 4]);
    }

    #[test]
    fn oversize_length_field_does_not_wedge_the_stream() {
        let mut rx = RxBuffer::new();
        // Sync pair followed by an absurd length.
        push_all(&mut rx, &[SYNC1, SYNC2, 0x01, 0x07, 0xff, 0xff]);
        let good = encode(0x05, 0x00, &[]);
        push_all(&mut rx, &good);

        let got = rx.extract_frame().unwrap();
        assert_eq!((got.class, got.id), (0x05, 0x00));
    }

    #[test]
    fn empty_payload_frame() {
        let frame = encode(0x05, 0x00, &[]);
        let mut rx = RxBuffer::new();
        push_all(&mut rx, &frame);
        let got = rx.extract_frame().unwrap();
        assert_eq!((got.class, got.id), (0x05, 0x00));
        assert!(got.payload.is_empty());
    }
}
