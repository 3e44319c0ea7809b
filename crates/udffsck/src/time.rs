//! ECMA-167 1/7.3 `timestamp`: a 12-byte packed date/time with an explicit
//! timezone offset, used by the LVID recording time and every FE/EFE
//! modification/access/attribute time.

use bytemuck::{Pod, Zeroable};
use chrono::{Datelike, TimeZone, Timelike, Utc};

use crate::endian::{Le16, LittleEndian, U16};

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct Timestamp {
    /// Bits 0..12: signed minutes offset from UTC (or 0x0FFF if not
    /// specified). Bits 12..16: type (1 = local time, 2 = UTC).
    type_and_timezone: U16<LittleEndian>,
    pub year: Le16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub centiseconds: u8,
    pub hundreds_of_microseconds: u8,
    pub microseconds: u8,
}

impl Timestamp {
    pub const SIZE: usize = 12;

    pub fn timezone_minutes(&self) -> Option<i16> {
        let raw = self.type_and_timezone.get() & 0x0FFF;
        if raw == 0x0FFF {
            None
        } else {
            // sign-extend a 12-bit field
            Some(((raw << 4) as i16) >> 4)
        }
    }

    pub fn now_utc() -> Self {
        let now = Utc::now();
        Self {
            type_and_timezone: U16::new(2 << 12),
            year: Le16::new(now.year() as u16),
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            centiseconds: 0,
            hundreds_of_microseconds: 0,
            microseconds: 0,
        }
    }

    /// Convert to a UTC instant for comparison purposes, ignoring the
    /// recorded timezone offset (comparisons in this crate only ever need
    /// relative ordering, and the offset is advisory per ECMA-167).
    pub fn to_utc(&self) -> Option<chrono::DateTime<Utc>> {
        Utc.with_ymd_and_hms(
            self.year.get() as i32,
            self.month as u32,
            self.day as u32,
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
        .single()
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year.get(),
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(Timestamp, [u8; 12]);

    #[test]
    fn now_is_ordered_after_epoch() {
        let ts = Timestamp::now_utc();
        let epoch = Timestamp {
            type_and_timezone: U16::new(2 << 12),
            year: Le16::new(2000),
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            centiseconds: 0,
            hundreds_of_microseconds: 0,
            microseconds: 0,
        };
        assert!(ts.to_utc().unwrap() > epoch.to_utc().unwrap());
    }

    #[test]
    fn unspecified_timezone_decodes_to_none() {
        let mut ts = Timestamp::now_utc();
        ts.type_and_timezone.set(0x0FFF);
        assert_eq!(ts.timezone_minutes(), None);
    }
}
