//! WWVB frame encoding.
//!
//! WWVB transmits UTC directly along with DST indicators for the US
//! observed zones. Slot durations: 0 drops the carrier for 200 ms, 1 for
//! 500 ms, frame/position markers for 800 ms.

use super::{Minute, DAY_NAMES, MSECS_TICK, SYNC_MARKER, TICKS_SEC};
use crate::datetime;

pub(super) fn update(minute: &mut Minute, utc_timestamp: i64, dut1: i16) {
    let datetime = datetime::parse_timestamp(utc_timestamp);
    let mut bits = [0u8; 60];
    for marker in [0, 9, 19, 29, 39, 49, 59] {
        bits[marker] = SYNC_MARKER;
    }

    let min_10 = datetime.min / 10;
    bits[1] = u8::from(min_10 & 4 != 0);
    bits[2] = u8::from(min_10 & 2 != 0);
    bits[3] = min_10 & 1;

    let min = datetime.min % 10;
    bits[5] = u8::from(min & 8 != 0);
    bits[6] = u8::from(min & 4 != 0);
    bits[7] = u8::from(min & 2 != 0);
    bits[8] = min & 1;

    let hour_10 = datetime.hour / 10;
    bits[12] = u8::from(hour_10 & 2 != 0);
    bits[13] = hour_10 & 1;

    let hour = datetime.hour % 10;
    bits[15] = u8::from(hour & 8 != 0);
    bits[16] = u8::from(hour & 4 != 0);
    bits[17] = u8::from(hour & 2 != 0);
    bits[18] = hour & 1;

    let doy_100 = (datetime.doy / 100) as u8;
    bits[22] = u8::from(doy_100 & 2 != 0);
    bits[23] = doy_100 & 1;

    let doy_10 = ((datetime.doy % 100) / 10) as u8;
    bits[25] = u8::from(doy_10 & 8 != 0);
    bits[26] = u8::from(doy_10 & 4 != 0);
    bits[27] = u8::from(doy_10 & 2 != 0);
    bits[28] = doy_10 & 1;

    let doy = (datetime.doy % 10) as u8;
    bits[30] = u8::from(doy & 8 != 0);
    bits[31] = u8::from(doy & 4 != 0);
    bits[32] = u8::from(doy & 2 != 0);
    bits[33] = doy & 1;

    // DUT1 sign as a 3-slot pattern, magnitude in BCD at 100 ms steps.
    let mut dut1 = dut1 / 100;
    bits[36] = u8::from(dut1 >= 0);
    bits[37] = u8::from(dut1 < 0);
    bits[38] = u8::from(dut1 >= 0);
    if dut1 < 0 {
        dut1 = -dut1;
    }
    bits[40] = u8::from(dut1 & 8 != 0);
    bits[41] = u8::from(dut1 & 4 != 0);
    bits[42] = u8::from(dut1 & 2 != 0);
    bits[43] = u8::from(dut1 & 1 != 0);

    let year_10 = ((datetime.year % 100) / 10) as u8;
    bits[45] = u8::from(year_10 & 8 != 0);
    bits[46] = u8::from(year_10 & 4 != 0);
    bits[47] = u8::from(year_10 & 2 != 0);
    bits[48] = year_10 & 1;

    let year = (datetime.year % 10) as u8;
    bits[50] = u8::from(year & 8 != 0);
    bits[51] = u8::from(year & 4 != 0);
    bits[52] = u8::from(year & 2 != 0);
    bits[53] = year & 1;

    bits[55] = u8::from(datetime::is_leap(datetime.year));

    let (is_dst, is_dst_end) = datetime::is_us_dst(&datetime);
    bits[57] = u8::from(is_dst_end);
    bits[58] = u8::from(is_dst);

    minute.slots.copy_from_slice(&bits);
    minute.slot_count = 60;

    // Marker: low for 800 ms, 0: 200 ms, 1: 500 ms.
    let mut j = 0;
    for &bit in bits.iter() {
        let lo_dsec = if bit == SYNC_MARKER {
            8
        } else if bit != 0 {
            5
        } else {
            2
        };
        let lo = 100 * lo_dsec / MSECS_TICK;
        minute.levels.set_run(j, lo, false);
        minute.levels.set_run(j + lo, TICKS_SEC - lo, true);
        j += TICKS_SEC;
    }
}

pub(super) fn describe(utc_timestamp: i64, dut1: i16) -> String {
    let dt = datetime::parse_timestamp(utc_timestamp);
    let (is_dst, is_dst_end) = datetime::is_us_dst(&dt);
    let dst = match (is_dst, is_dst_end) {
        (true, true) => "on",
        (false, false) => "off",
        (false, true) => "starting",
        (true, false) => "ending",
    };
    format!(
        "{:04}-{:02}-{:02} {} {:02}:{:02} UTC, day {}, dut1 {:+} ms, DST {}",
        dt.year,
        dt.mon,
        dt.day,
        DAY_NAMES[usize::from(dt.dow)],
        dt.hour,
        dt.min,
        dt.doy,
        dut1,
        dst,
    )
}
