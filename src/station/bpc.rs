//! BPC frame encoding.
//!
//! BPC packs two bits into every second. A 20-second frame repeats three
//! times per minute; the second and third repetitions identify themselves
//! in slot 1. Slot durations: sync marker carries no low period, values
//! 0-3 drop the carrier for 100-400 ms at the start of the second.

use super::{even_parity, Minute, Station, DAY_NAMES, MSECS_TICK, SYNC_MARKER, TICKS_SEC};
use crate::datetime;

pub(super) fn update(minute: &mut Minute, utc_timestamp: i64, _dut1: i16) {
    let info = Station::Bpc.info();
    let datetime = datetime::parse_timestamp(utc_timestamp + info.utc_offset);
    let mut bits = [0u8; 20];
    bits[0] = SYNC_MARKER;

    let hour_12h = datetime.hour % 12;
    bits[3] = (hour_12h >> 2) & 0x3;
    bits[4] = hour_12h & 0x3;

    let min = datetime.min;
    bits[5] = (min >> 4) & 0x3;
    bits[6] = (min >> 2) & 0x3;
    bits[7] = min & 0x3;

    // ISO day of week, Sunday is 7.
    let dow = if datetime.dow != 0 { datetime.dow } else { 7 };
    bits[8] = (dow >> 2) & 0x1;
    bits[9] = dow & 0x3;

    let is_pm = u8::from(datetime.hour >= 12);
    bits[10] = (is_pm << 1) | even_parity(&bits, 1, 10);

    let day = datetime.day;
    bits[11] = (day >> 4) & 0x1;
    bits[12] = (day >> 2) & 0x3;
    bits[13] = day & 0x3;

    let mon = datetime.mon;
    bits[14] = (mon >> 2) & 0x3;
    bits[15] = mon & 0x3;

    let year = (datetime.year % 100) as u8;
    bits[16] = (year >> 4) & 0x3;
    bits[17] = (year >> 2) & 0x3;
    bits[18] = year & 0x3;
    bits[19] = ((year >> 5) & 0x2) | even_parity(&bits, 11, 19);

    minute.slots[..20].copy_from_slice(&bits);
    minute.slot_count = 20;

    let mut j = 0;
    for p in 0..3u8 {
        if p > 0 {
            bits[1] = 1 << p;
        }
        // Repetition 1 flips the slot 1..10 parity; repetition 2 carries a
        // slot 1 value with the same bit count, so the flip sticks.
        if p == 1 {
            bits[10] ^= 1;
        }

        // Marker: low for 0 ms, 00: 100 ms, 01: 200 ms, 10: 300 ms, 11: 400 ms.
        for &bit in bits.iter() {
            let lo_dsec = if bit == SYNC_MARKER {
                0
            } else {
                u32::from(bit) + 1
            };
            let lo = 100 * lo_dsec / MSECS_TICK;
            minute.levels.set_run(j, lo, false);
            minute.levels.set_run(j + lo, TICKS_SEC - lo, true);
            j += TICKS_SEC;
        }
    }
}

pub(super) fn describe(utc_timestamp: i64, _dut1: i16) -> String {
    let info = Station::Bpc.info();
    let dt = datetime::parse_timestamp(utc_timestamp + info.utc_offset);
    format!(
        "{:04}-{:02}-{:02} {} {:02}:{:02} CST",
        dt.year,
        dt.mon,
        dt.day,
        DAY_NAMES[usize::from(dt.dow)],
        dt.hour,
        dt.min,
    )
}

/// The 20-second frame repeats three times per minute.
pub(super) fn status(minute: &Minute, sec: u8) -> u8 {
    minute.slots[usize::from(sec % 20)]
}
