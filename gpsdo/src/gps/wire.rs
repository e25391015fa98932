use core::fmt::{Display, Formatter};

/// Error while decoding a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer payload bytes than the message layout requires.
    BufferTooShort,
    /// The frame-level length does not match the message layout.
    InvalidLength,
    /// The receiver sent a message layout revision we do not decode.
    UnsupportedVersion,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooShort => f.write_str("payload ended before the message layout did"),
            Self::InvalidLength => f.write_str("payload length does not match the message layout"),
            Self::UnsupportedVersion => f.write_str("unsupported message layout version"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// Cursor over a message payload, consuming little-endian fields in layout
/// order.
pub(crate) struct FieldReader<'a> {
    remaining: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(payload: &'a [u8]) -> Self {
        Self { remaining: payload }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining.len() < len {
            return Err(ParseError::BufferTooShort);
        }
        let (field, rest) = self.remaining.split_at(len);
        self.remaining = rest;
        Ok(field)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        self.take(len).map(|_| ())
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8, ParseError> {
        Ok(self.u8()? as i8)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ParseError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub(crate) fn i16(&mut self) -> Result<i16, ParseError> {
        Ok(self.u16()? as i16)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, ParseError> {
        Ok(self.u32()? as i32)
    }

    /// Asserts the payload was consumed exactly.
    pub(crate) fn finish(self) -> Result<(), ParseError> {
        if self.remaining.is_empty() {
            Ok(())
        } else {
            Err(ParseError::InvalidLength)
        }
    }
}
