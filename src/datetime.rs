//! Date and time facilities.
//!
//! Everything works on Unix timestamps in milliseconds. Broken-down dates
//! use the shifted-epoch civil calendar algorithm (epoch moved to March 1,
//! year 0, so the leap day lands at the end of the cycle), cf.
//! <https://howardhinnant.github.io/date_algorithms.html>.

use std::time::{SystemTime, UNIX_EPOCH};

const MSECS_DAY: u64 = 86_400_000;
const MSECS_HOUR: u64 = 3_600_000;
const MSECS_MIN: u64 = 60_000;

/// A timestamp broken down into its UTC calendar components.
///
/// The originating timestamp is kept in `timestamp`; partial milliseconds
/// are not preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datetime {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Year (0 and up).
    pub year: u16,
    /// Month (1-12).
    pub mon: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Day of year (1-366).
    pub doy: u16,
    /// Day of week (0-6, Sunday-Saturday).
    pub dow: u8,
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub min: u8,
    /// Second (0-59).
    pub sec: u8,
    /// Millisecond (0-999).
    pub msec: u16,
}

/// Read the wall clock as milliseconds since the Unix epoch.
///
/// Returns `None` if the system clock cannot be read (or sits before the
/// epoch, which no supported time station can represent anyway).
pub fn now() -> Option<i64> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    Some(elapsed.as_millis() as i64)
}

/// Break a millisecond timestamp down into its UTC calendar components.
pub fn parse_timestamp(timestamp: i64) -> Datetime {
    let mut msec = timestamp as u64;

    let day = msec / MSECS_DAY;
    let dse = day + 719_468;
    let era = dse / 146_097;
    let doe = dse - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let m = (5 * doy + 2) / 153;

    let year = (y + u64::from(m >= 10)) as u16;
    let mon = (if m < 10 { m + 3 } else { m - 9 }) as u8;

    msec %= MSECS_DAY;
    let hour = (msec / MSECS_HOUR) as u8;
    msec %= MSECS_HOUR;
    let min = (msec / MSECS_MIN) as u8;
    msec %= MSECS_MIN;

    Datetime {
        timestamp,
        year,
        mon,
        day: (doy - (153 * m + 2) / 5 + 1) as u8,
        doy: (if m < 10 {
            doy + 60 + u64::from(is_leap(year))
        } else {
            doy - 305
        }) as u16,
        dow: ((day + 4) % 7) as u8,
        hour,
        min,
        sec: (msec / 1000) as u8,
        msec: (msec % 1000) as u16,
    }
}

/// Compose a millisecond timestamp from calendar components.
///
/// `tz_mins` is the timezone offset in minutes ahead of UTC and is
/// subtracted out. Instants before the epoch saturate to 0.
#[allow(clippy::too_many_arguments)]
pub fn make_timestamp(
    year: u16,
    mon: u8,
    day: u8,
    hour: u8,
    min: u8,
    sec: u8,
    msec: u16,
    tz_mins: i16,
) -> i64 {
    let y = i64::from(year) - i64::from(mon <= 2);
    let m = i64::from(mon);
    let era = y / 400;
    let yoe = y - era * 400;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;

    let ms = days * MSECS_DAY as i64
        + i64::from(hour) * MSECS_HOUR as i64
        + i64::from(min) * MSECS_MIN as i64
        + i64::from(sec) * 1000
        + i64::from(msec)
        - i64::from(tz_mins) * MSECS_MIN as i64;

    ms.max(0)
}

/// Whether a Gregorian year is a leap year.
pub fn is_leap(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in a month.
pub fn days_in_month(year: u16, mon: u8) -> u8 {
    match mon {
        2 => 28 + u8::from(is_leap(year)),
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Check whether European Summer Time (CEST/BST) is in effect.
///
/// Germany, the UK, and most of Europe switch at 01:00 UTC on the last
/// Sunday of March and October.
///
/// The second value is the count of minutes remaining until the next
/// changeover as of the start of the minute in `datetime` (1 means the
/// changeover happens within 60 seconds), or −1 when the changeover is
/// more than 25 hours away.
pub fn is_eu_dst(datetime: &Datetime) -> (bool, i32) {
    let mon = datetime.mon;
    let mut in_mins = -1;
    let mut is_est = false;

    if (4..10).contains(&mon) {
        is_est = true;
    } else if mon == 3 || mon == 10 {
        let hour = datetime.hour;
        let min = datetime.min;
        let day = datetime.day;
        let dow = datetime.dow;

        let days_to_sunday = if dow != 0 { 7 - dow } else { 0 };
        let fsom = (day - 1 + days_to_sunday) % 7 + 1;
        let lsom = fsom + (31 - fsom) / 7 * 7;
        let is_changed = (day == lsom && hour >= 1) || day > lsom;

        is_est = (mon == 3) == is_changed;

        if day == lsom - 1 {
            in_mins = 60 * (24 - i32::from(hour)) + 60 - i32::from(min);
        } else if day == lsom && hour < 1 {
            in_mins = 60 - i32::from(min);
        }
    }

    (is_est, in_mins)
}

/// Check whether United States Daylight Saving Time is in effect.
///
/// DST runs from 02:00 local time on the second Sunday of March to 02:00
/// local time on the first Sunday of November. Both results are evaluated
/// against the provided UTC day: the first holds at its start, the second
/// at its end.
pub fn is_us_dst(datetime: &Datetime) -> (bool, bool) {
    let mon = datetime.mon;
    let mut is_dst_end = false;
    let mut is_dst = false;

    if (4..11).contains(&mon) {
        is_dst_end = true;
        is_dst = true;
    } else if mon == 3 || mon == 11 {
        let sunday = if mon == 3 { 8 } else { 1 };
        let day = datetime.day;
        let dow = datetime.dow;

        let days_to_sunday = if dow != 0 { 7 - dow } else { 0 };
        let change_day = (day - 1 + days_to_sunday) % 7 + sunday;
        is_dst_end = if mon == 3 {
            day >= change_day
        } else {
            day < change_day
        };
        is_dst = if mon == 3 {
            day > change_day
        } else {
            day <= change_day
        };
    }

    (is_dst, is_dst_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_past_epoch() {
        assert!(now().unwrap() > 0);
    }

    #[test]
    fn parse_breaks_down_a_late_century_instant() {
        let timestamp = 4_102_403_696_789;
        let datetime = parse_timestamp(timestamp);
        assert_eq!(datetime.timestamp, timestamp);
        assert_eq!(datetime.year, 2099);
        assert_eq!(datetime.mon, 12);
        assert_eq!(datetime.day, 31);
        assert_eq!(datetime.doy, 365);
        assert_eq!(datetime.dow, 4);
        assert_eq!(datetime.hour, 12);
        assert_eq!(datetime.min, 34);
        assert_eq!(datetime.sec, 56);
        assert_eq!(datetime.msec, 789);
    }

    #[test]
    fn make_timestamp_inverts_parse() {
        assert_eq!(make_timestamp(1969, 12, 31, 23, 59, 59, 999, 0), 0);
        assert_eq!(make_timestamp(1970, 1, 1, 0, 0, 0, 0, 0), 0);
        assert_eq!(make_timestamp(1970, 1, 1, 0, 0, 0, 0, -480), 28_800_000);
        assert_eq!(
            make_timestamp(2099, 12, 31, 12, 34, 56, 789, 0),
            4_102_403_696_789
        );
    }

    #[test]
    fn round_trips_are_exact_to_the_millisecond() {
        for &timestamp in &[
            0,
            1,
            951_868_800_000,
            1_234_567_890_123,
            4_102_403_696_789,
            7_258_118_399_999,
        ] {
            let dt = parse_timestamp(timestamp);
            assert_eq!(
                make_timestamp(dt.year, dt.mon, dt.day, dt.hour, dt.min, dt.sec, dt.msec, 0),
                timestamp
            );
        }
    }

    #[test]
    fn leap_years() {
        assert!(is_leap(1996));
        assert!(!is_leap(1997));
        assert!(!is_leap(1998));
        assert!(!is_leap(1999));
        assert!(is_leap(2000));
        assert!(is_leap(2004));
        assert!(is_leap(2020));
        assert!(is_leap(2024));
        assert!(!is_leap(2025));
        assert!(!is_leap(2100));
        assert!(!is_leap(2200));
        assert!(!is_leap(2300));
        assert!(is_leap(2400));
    }

    #[test]
    fn month_lengths() {
        let common = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (i, &len) in common.iter().enumerate() {
            assert_eq!(days_in_month(1999, i as u8 + 1), len);
        }
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2100, 2), 28);
    }

    #[test]
    fn eu_dst_changeovers() {
        // Deep winter: no changeover in sight.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_070_908_800_000));
        assert!(!dst);
        assert_eq!(in_mins, -1);

        // 2099-03-28 00:00 UTC, the day before the last Sunday of March:
        // changeover countdown begins at 25 hours.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_078_339_199_999));
        assert!(!dst);
        assert_eq!(in_mins, -1);
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_078_339_200_000));
        assert!(!dst);
        assert_eq!(in_mins, 1500);

        // 2099-03-29 00:58 / 00:59 / 01:00 UTC.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_078_429_139_999));
        assert!(!dst);
        assert_eq!(in_mins, 2);
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_078_429_199_999));
        assert!(!dst);
        assert_eq!(in_mins, 1);
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_078_429_200_000));
        assert!(dst);
        assert_eq!(in_mins, -1);

        // High summer.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_094_496_000_000));
        assert!(dst);
        assert_eq!(in_mins, -1);

        // 2099-10-24 00:00 UTC, the day before the last Sunday of October.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_096_483_199_999));
        assert!(dst);
        assert_eq!(in_mins, -1);
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_096_483_200_000));
        assert!(dst);
        assert_eq!(in_mins, 1500);

        // 2099-10-25 00:59 / 01:00 UTC.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_096_573_199_999));
        assert!(dst);
        assert_eq!(in_mins, 1);
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_096_573_200_000));
        assert!(!dst);
        assert_eq!(in_mins, -1);

        // Back to winter time for good.
        let (dst, in_mins) = is_eu_dst(&parse_timestamp(4_097_174_400_000));
        assert!(!dst);
        assert_eq!(in_mins, -1);
    }

    #[test]
    fn us_dst_changeovers() {
        // 2100-01-01: winter.
        let (dst, _) = is_us_dst(&parse_timestamp(4_102_444_800_000));
        assert!(!dst);

        // 2100-03-13, the day before the second Sunday of March.
        let (dst, end) = is_us_dst(&parse_timestamp(4_108_665_599_999));
        assert!(!dst);
        assert!(!end);
        let (dst, end) = is_us_dst(&parse_timestamp(4_108_665_600_000));
        assert!(!dst);
        assert!(end);

        // 2100-03-15, the day after.
        let (dst, end) = is_us_dst(&parse_timestamp(4_108_752_000_000));
        assert!(dst);
        assert!(end);

        // 2100-11-06, the day before the first Sunday of November.
        let (dst, end) = is_us_dst(&parse_timestamp(4_129_228_799_999));
        assert!(dst);
        assert!(end);
        let (dst, end) = is_us_dst(&parse_timestamp(4_129_228_800_000));
        assert!(dst);
        assert!(!end);

        // 2100-11-08, the day after.
        let (dst, end) = is_us_dst(&parse_timestamp(4_129_315_200_000));
        assert!(!dst);
        assert!(!end);

        // Deep winter again.
        let (dst, end) = is_us_dst(&parse_timestamp(4_131_302_400_000));
        assert!(!dst);
        assert!(!end);
    }
}
