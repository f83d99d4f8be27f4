//! MSF frame encoding.
//!
//! MSF carries two data bits per second ("A" and "B"); here that shows up
//! as slot durations of 100-300 ms low. Like DCF77 it transmits the time
//! of the next UTC minute, as UTC or BST. DUT1 is sent unary: positive
//! values set slots 1-8, negative values slots 9-16, one slot per 100 ms.
//! Slots 53-58 add 100 ms each, realizing the fixed 01111110 secondary
//! minute marker.

use super::{odd_parity, Minute, Station, DAY_NAMES, MSECS_HOUR, MSECS_MIN, MSECS_TICK,
            SYNC_MARKER, TICKS_SEC};
use crate::datetime;

pub(super) fn update(minute: &mut Minute, utc_timestamp: i64, dut1: i16) {
    let utc_datetime = datetime::parse_timestamp(utc_timestamp);
    let mut bits = [0u8; 60];
    bits[0] = SYNC_MARKER;

    let mut dut1 = dut1 / 100;
    let negative = if dut1 < 0 { 8usize } else { 0 };
    if negative != 0 {
        dut1 = -dut1;
    }
    for n in 1..=8 {
        bits[n + negative] = u8::from(dut1 >= n as i16);
    }

    let (is_bst, in_mins) = datetime::is_eu_dst(&utc_datetime);

    // Transmitted time is the UTC/BST time at the next UTC minute.
    let is_xmit_bst = is_bst ^ (in_mins == 1);
    let bst_offset = if is_xmit_bst { MSECS_HOUR } else { 0 };
    let xmit_timestamp = utc_timestamp + bst_offset + MSECS_MIN;
    let xmit = datetime::parse_timestamp(xmit_timestamp);

    let year_10 = ((xmit.year % 100) / 10) as u8;
    bits[17] = u8::from(year_10 & 8 != 0);
    bits[18] = u8::from(year_10 & 4 != 0);
    bits[19] = u8::from(year_10 & 2 != 0);
    bits[20] = year_10 & 1;

    let year = (xmit.year % 10) as u8;
    bits[21] = u8::from(year & 8 != 0);
    bits[22] = u8::from(year & 4 != 0);
    bits[23] = u8::from(year & 2 != 0);
    bits[24] = year & 1;

    let mon_10 = xmit.mon / 10;
    bits[25] = mon_10 & 1;

    let mon = xmit.mon % 10;
    bits[26] = u8::from(mon & 8 != 0);
    bits[27] = u8::from(mon & 4 != 0);
    bits[28] = u8::from(mon & 2 != 0);
    bits[29] = mon & 1;

    let day_10 = xmit.day / 10;
    bits[30] = u8::from(day_10 & 2 != 0);
    bits[31] = day_10 & 1;

    let day = xmit.day % 10;
    bits[32] = u8::from(day & 8 != 0);
    bits[33] = u8::from(day & 4 != 0);
    bits[34] = u8::from(day & 2 != 0);
    bits[35] = day & 1;

    let dow = xmit.dow;
    bits[36] = u8::from(dow & 4 != 0);
    bits[37] = u8::from(dow & 2 != 0);
    bits[38] = dow & 1;

    let hour_10 = xmit.hour / 10;
    bits[39] = u8::from(hour_10 & 2 != 0);
    bits[40] = hour_10 & 1;

    let hour = xmit.hour % 10;
    bits[41] = u8::from(hour & 8 != 0);
    bits[42] = u8::from(hour & 4 != 0);
    bits[43] = u8::from(hour & 2 != 0);
    bits[44] = hour & 1;

    let min_10 = xmit.min / 10;
    bits[45] = u8::from(min_10 & 4 != 0);
    bits[46] = u8::from(min_10 & 2 != 0);
    bits[47] = min_10 & 1;

    let min = xmit.min % 10;
    bits[48] = u8::from(min & 8 != 0);
    bits[49] = u8::from(min & 4 != 0);
    bits[50] = u8::from(min & 2 != 0);
    bits[51] = min & 1;

    // Changeover announcement during the preceding hour.
    bits[53] = u8::from((1..=61).contains(&in_mins));
    bits[54] = odd_parity(&bits, 17, 25);
    bits[55] = odd_parity(&bits, 25, 36);
    bits[56] = odd_parity(&bits, 36, 39);
    bits[57] = odd_parity(&bits, 39, 52);
    bits[58] = u8::from(is_xmit_bst);

    minute.slots.copy_from_slice(&bits);
    minute.slot_count = 60;

    // Marker: low for 500 ms, 00: 100 ms, 01: 200 ms, 11: 300 ms.
    // 11 can only occur during the secondary minute marker.
    let mut j = 0;
    for (i, &bit) in bits.iter().enumerate() {
        let mut lo_dsec = if bit == SYNC_MARKER {
            5
        } else {
            u32::from(bit != 0) + 1
        };
        // Secondary 01111110 minute marker.
        lo_dsec += u32::from((53..=58).contains(&i));
        let lo = 100 * lo_dsec / MSECS_TICK;
        minute.levels.set_run(j, lo, false);
        minute.levels.set_run(j + lo, TICKS_SEC - lo, true);
        j += TICKS_SEC;
    }
}

pub(super) fn describe(utc_timestamp: i64, dut1: i16) -> String {
    let info = Station::Msf.info();
    let utc_datetime = datetime::parse_timestamp(utc_timestamp);
    let (is_bst, in_mins) = datetime::is_eu_dst(&utc_datetime);
    let is_xmit_bst = is_bst ^ (in_mins == 1);

    let offset = if is_xmit_bst { info.dst_offset } else { 0 };
    let xmit = datetime::parse_timestamp(utc_timestamp + offset + MSECS_MIN);

    let mut out = format!(
        "{:04}-{:02}-{:02} {} {:02}:{:02} {}, dut1 {:+} ms",
        xmit.year,
        xmit.mon,
        xmit.day,
        DAY_NAMES[usize::from(xmit.dow)],
        xmit.hour,
        xmit.min,
        if is_xmit_bst { "BST" } else { "GMT" },
        dut1,
    );
    if (1..=61).contains(&in_mins) {
        out.push_str(", changeover announced");
    }
    out
}
