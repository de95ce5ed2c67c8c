//! Tick-based time values and the timestamp encoding tag table.
//!
//! All times are measured in ticks of 100 nanoseconds. A [`Timestamp`] is a
//! tick count from the proleptic-Gregorian year 1 plus a time-zone offset in
//! minutes; [`Duration`] is a signed tick span. Wall-clock interop goes
//! through [`SystemTime`] at the edges so the codec itself never consults a
//! clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Ticks per microsecond (one tick is 100 ns).
pub const TICKS_PER_MICROSECOND: i64 = 10;

/// Ticks per millisecond.
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks per minute.
pub const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;

/// Ticks per hour.
pub const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;

/// Ticks per day.
pub const TICKS_PER_DAY: i64 = 24 * TICKS_PER_HOUR;

/// Tick value of the Unix epoch (1970-01-01T00:00:00Z).
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// A signed elapsed time in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Duration(i64);

impl Duration {
    /// Zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from raw ticks.
    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Creates a duration from whole milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * TICKS_PER_MILLISECOND)
    }

    /// Creates a duration from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * TICKS_PER_SECOND)
    }

    /// Returns the raw tick count.
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }
}

/// An absolute instant: ticks from year 1 plus a time-zone offset in minutes.
///
/// The offset is carried through serialization but does not shift the tick
/// value; `ticks` always identifies the instant in the zone it was captured
/// in, and the offset records how far that zone was from UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    ticks: i64,
    offset_minutes: i32,
}

impl Timestamp {
    /// Creates a timestamp from raw ticks and a zone offset in minutes.
    #[must_use]
    pub const fn from_ticks(ticks: i64, offset_minutes: i32) -> Self {
        Self {
            ticks,
            offset_minutes,
        }
    }

    /// Creates a UTC timestamp from raw ticks.
    #[must_use]
    pub const fn utc(ticks: i64) -> Self {
        Self::from_ticks(ticks, 0)
    }

    /// Returns the raw tick count.
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.ticks
    }

    /// Returns the time-zone offset in minutes from UTC.
    #[must_use]
    pub const fn offset_minutes(self) -> i32 {
        self.offset_minutes
    }

    /// Captures the current wall-clock time as a UTC timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a [`SystemTime`] into a UTC timestamp.
    ///
    /// Times before the Unix epoch saturate to the epoch.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        let ticks = time
            .duration_since(UNIX_EPOCH)
            .map(|d| {
                let ticks = i64::try_from(d.as_nanos() / 100).unwrap_or(i64::MAX);
                UNIX_EPOCH_TICKS.saturating_add(ticks)
            })
            .unwrap_or(UNIX_EPOCH_TICKS);
        Self::utc(ticks)
    }

    /// Converts back to a [`SystemTime`], dropping the zone offset.
    #[must_use]
    pub fn to_system_time(self) -> SystemTime {
        let from_epoch = self.ticks - UNIX_EPOCH_TICKS;
        let nanos = from_epoch.unsigned_abs().saturating_mul(100);
        if from_epoch >= 0 {
            UNIX_EPOCH + std::time::Duration::from_nanos(nanos)
        } else {
            UNIX_EPOCH - std::time::Duration::from_nanos(nanos)
        }
    }
}

/// Timestamp wire encoding tags.
///
/// `SetReference` and `SetFactor` are prefix tags: each consumes its value
/// and is followed by another tagged encoding. All other tags terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimestampTag {
    /// Absolute ticks, no reference involved.
    RawTicks = 0,
    /// Absolute ticks that also reset the shared reference time.
    NewReference = 1,
    /// Updates the reference time (truncated to whole seconds by writers).
    SetReference = 2,
    /// Updates the shared generic factor divisor.
    SetFactor = 3,
    LaterSeconds = 4,
    EarlierSeconds = 5,
    Later100Millis = 6,
    Earlier100Millis = 7,
    Later16Millis = 8,
    Earlier16Millis = 9,
    Later10Millis = 10,
    Earlier10Millis = 11,
    LaterMillis = 12,
    EarlierMillis = 13,
    Later100Micros = 14,
    Earlier100Micros = 15,
    Later10Micros = 16,
    Earlier10Micros = 17,
    LaterMicros = 18,
    EarlierMicros = 19,
    LaterFactor = 20,
    EarlierFactor = 21,
}

impl TimestampTag {
    /// Parses a tag from its wire byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::RawTicks,
            1 => Self::NewReference,
            2 => Self::SetReference,
            3 => Self::SetFactor,
            4 => Self::LaterSeconds,
            5 => Self::EarlierSeconds,
            6 => Self::Later100Millis,
            7 => Self::Earlier100Millis,
            8 => Self::Later16Millis,
            9 => Self::Earlier16Millis,
            10 => Self::Later10Millis,
            11 => Self::Earlier10Millis,
            12 => Self::LaterMillis,
            13 => Self::EarlierMillis,
            14 => Self::Later100Micros,
            15 => Self::Earlier100Micros,
            16 => Self::Later10Micros,
            17 => Self::Earlier10Micros,
            18 => Self::LaterMicros,
            19 => Self::EarlierMicros,
            20 => Self::LaterFactor,
            21 => Self::EarlierFactor,
            _ => return None,
        })
    }
}

/// Delta units from coarsest to finest, as (later tag, earlier tag, ticks).
pub(crate) const DELTA_UNITS: [(TimestampTag, TimestampTag, i64); 8] = [
    (
        TimestampTag::LaterSeconds,
        TimestampTag::EarlierSeconds,
        TICKS_PER_SECOND,
    ),
    (
        TimestampTag::Later100Millis,
        TimestampTag::Earlier100Millis,
        100 * TICKS_PER_MILLISECOND,
    ),
    (
        TimestampTag::Later16Millis,
        TimestampTag::Earlier16Millis,
        16 * TICKS_PER_MILLISECOND,
    ),
    (
        TimestampTag::Later10Millis,
        TimestampTag::Earlier10Millis,
        10 * TICKS_PER_MILLISECOND,
    ),
    (
        TimestampTag::LaterMillis,
        TimestampTag::EarlierMillis,
        TICKS_PER_MILLISECOND,
    ),
    (
        TimestampTag::Later100Micros,
        TimestampTag::Earlier100Micros,
        100 * TICKS_PER_MICROSECOND,
    ),
    (
        TimestampTag::Later10Micros,
        TimestampTag::Earlier10Micros,
        10 * TICKS_PER_MICROSECOND,
    ),
    (
        TimestampTag::LaterMicros,
        TimestampTag::EarlierMicros,
        TICKS_PER_MICROSECOND,
    ),
];

/// Resolves a delta tag to its tick unit and direction, if it is one.
pub(crate) const fn delta_unit(tag: TimestampTag) -> Option<(i64, bool)> {
    let mut i = 0;
    while i < DELTA_UNITS.len() {
        let (later, earlier, unit) = DELTA_UNITS[i];
        if tag as u8 == later as u8 {
            return Some((unit, true));
        }
        if tag as u8 == earlier as u8 {
            return Some((unit, false));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_constructors() {
        assert_eq!(Duration::from_secs(2).ticks(), 2 * TICKS_PER_SECOND);
        assert_eq!(Duration::from_millis(-5).ticks(), -5 * TICKS_PER_MILLISECOND);
        assert_eq!(Duration::ZERO.ticks(), 0);
    }

    #[test]
    fn system_time_roundtrip() {
        let ts = Timestamp::utc(UNIX_EPOCH_TICKS + 123 * TICKS_PER_SECOND);
        let back = Timestamp::from_system_time(ts.to_system_time());
        assert_eq!(back, ts);
    }

    #[test]
    fn pre_epoch_saturates() {
        let before = UNIX_EPOCH - std::time::Duration::from_secs(1);
        let ts = Timestamp::from_system_time(before);
        assert_eq!(ts.ticks(), UNIX_EPOCH_TICKS);
    }

    #[test]
    fn tag_roundtrip() {
        for raw in 0..=21u8 {
            let tag = TimestampTag::from_raw(raw).unwrap();
            assert_eq!(tag as u8, raw);
        }
        assert!(TimestampTag::from_raw(22).is_none());
        assert!(TimestampTag::from_raw(255).is_none());
    }

    #[test]
    fn delta_units_are_strictly_decreasing() {
        for pair in DELTA_UNITS.windows(2) {
            assert!(pair[0].2 > pair[1].2);
        }
    }

    #[test]
    fn delta_unit_resolution() {
        assert_eq!(
            delta_unit(TimestampTag::LaterSeconds),
            Some((TICKS_PER_SECOND, true))
        );
        assert_eq!(
            delta_unit(TimestampTag::EarlierMicros),
            Some((TICKS_PER_MICROSECOND, false))
        );
        assert_eq!(delta_unit(TimestampTag::RawTicks), None);
        assert_eq!(delta_unit(TimestampTag::SetFactor), None);
    }
}
