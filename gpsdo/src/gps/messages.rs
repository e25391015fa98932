use super::wire::{FieldReader, ParseError};
use crate::time::Ymdhms;

/// NAV-PVT: the navigation position/velocity/time solution. Only the time
/// fields matter here; position and velocity are skipped unparsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavPvt {
    pub itow_ms: u32,
    pub utc: Ymdhms,
    /// Sub-second remainder of the UTC solution. May be negative; the
    /// calendar fields are already rounded to the nearest second.
    pub nanos: i32,
    pub time_accuracy_ns: u32,
    pub num_satellites: u8,
    date_valid: bool,
    time_valid: bool,
    fully_resolved: bool,
    confirmed_available: bool,
    confirmed_date: bool,
    confirmed_time: bool,
}

impl NavPvt {
    pub(crate) const CLASS: u8 = 0x01;
    pub(crate) const ID: u8 = 0x07;
    const LEN: usize = 92;

    pub(crate) fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        if payload.len() != Self::LEN {
            return Err(ParseError::InvalidLength);
        }
        let mut reader = FieldReader::new(payload);
        let itow_ms = reader.u32()?;
        let year = reader.u16()?;
        let month = reader.u8()?;
        let day = reader.u8()?;
        let hour = reader.u8()?;
        let min = reader.u8()?;
        let sec = reader.u8()?;
        let valid = reader.u8()?;
        let time_accuracy_ns = reader.u32()?;
        let nanos = reader.i32()?;
        reader.skip(2)?; // fixType, flags
        let flags2 = reader.u8()?;
        let num_satellites = reader.u8()?;
        reader.skip(68)?;
        reader.finish()?;

        Ok(Self {
            itow_ms,
            utc: Ymdhms::new(year, month, day, hour, min, sec),
            nanos,
            time_accuracy_ns,
            num_satellites,
            date_valid: valid & 0x01 != 0,
            time_valid: valid & 0x02 != 0,
            fully_resolved: valid & 0x04 != 0,
            confirmed_available: flags2 & 0x20 != 0,
            confirmed_date: flags2 & 0x40 != 0,
            confirmed_time: flags2 & 0x80 != 0,
        })
    }

    /// Whether the UTC solution is trustworthy enough to feed the calendar.
    ///
    /// Date and time must both be valid and fully resolved. When the
    /// receiver supports confirmation it must also confirm both; a receiver
    /// without confirmation support is taken at its word.
    pub fn time_ok(&self) -> bool {
        self.date_valid
            && self.time_valid
            && self.fully_resolved
            && (!self.confirmed_available || (self.confirmed_date && self.confirmed_time))
    }
}

/// NAV-TIMELS: the leap-second report. Carries the current GPS−UTC offset
/// and the countdown to the next scheduled leap event, each with its own
/// validity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavTimels {
    pub itow_ms: u32,
    current_ls: i8,
    ls_change: i8,
    time_to_ls_event: i32,
    valid: u8,
}

impl NavTimels {
    pub(crate) const CLASS: u8 = 0x01;
    pub(crate) const ID: u8 = 0x26;
    const LEN: usize = 24;

    pub(crate) fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        if payload.len() != Self::LEN {
            return Err(ParseError::InvalidLength);
        }
        let mut reader = FieldReader::new(payload);
        let itow_ms = reader.u32()?;
        let version = reader.u8()?;
        if version != 0 {
            return Err(ParseError::UnsupportedVersion);
        }
        reader.skip(3)?;
        reader.skip(1)?; // srcOfCurrLs
        let current_ls = reader.i8()?;
        reader.skip(1)?; // srcOfLsChange
        let ls_change = reader.i8()?;
        let time_to_ls_event = reader.i32()?;
        reader.skip(2)?; // dateOfLsGpsWn
        reader.skip(2)?; // dateOfLsGpsDn
        reader.skip(3)?;
        let valid = reader.u8()?;
        reader.finish()?;

        Ok(Self {
            itow_ms,
            current_ls,
            ls_change,
            time_to_ls_event,
            valid,
        })
    }

    /// Current GPS−UTC offset in seconds, when the receiver marks it valid.
    pub fn current_gps_minus_utc(&self) -> Option<i8> {
        (self.valid & 0x01 != 0).then_some(self.current_ls)
    }

    /// Countdown to the next leap event and its signed direction, when the
    /// receiver marks the event fields valid.
    pub fn upcoming_leap_second(&self) -> Option<(i32, i8)> {
        (self.valid & 0x02 != 0).then_some((self.time_to_ls_event, self.ls_change))
    }
}
