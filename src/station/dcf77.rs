//! DCF77 frame encoding.
//!
//! DCF77 transmits the CET/CEST time of the *next* UTC minute: receivers
//! lock onto the missing 59th second and apply the frame at the following
//! minute mark. Slot durations: 0 drops the carrier for 100 ms, 1 for
//! 200 ms, the sync slot not at all.

use super::{even_parity, Minute, Station, DAY_NAMES, MSECS_HOUR, MSECS_MIN, MSECS_TICK,
            SYNC_MARKER, TICKS_SEC};
use crate::datetime;

pub(super) fn update(minute: &mut Minute, utc_timestamp: i64, _dut1: i16) {
    let info = Station::Dcf77.info();
    let utc_datetime = datetime::parse_timestamp(utc_timestamp);
    let datetime = datetime::parse_timestamp(utc_timestamp + info.utc_offset);
    let mut bits = [0u8; 60];
    bits[59] = SYNC_MARKER;

    let (is_cest, in_mins) = datetime::is_eu_dst(&utc_datetime);
    let is_xmit_cest = is_cest ^ (in_mins == 1);

    // Changeover announcement during the preceding hour.
    bits[16] = u8::from((1..=60).contains(&in_mins));
    bits[17] = u8::from(is_xmit_cest);
    bits[18] = u8::from(!is_xmit_cest);

    let cest_offset = if is_xmit_cest { MSECS_HOUR } else { 0 };
    let xmit_timestamp = datetime.timestamp + cest_offset + MSECS_MIN;
    let xmit = datetime::parse_timestamp(xmit_timestamp);

    // Start-of-time marker.
    bits[20] = 1;

    let min = xmit.min % 10;
    bits[21] = min & 1;
    bits[22] = u8::from(min & 2 != 0);
    bits[23] = u8::from(min & 4 != 0);
    bits[24] = u8::from(min & 8 != 0);

    let min_10 = xmit.min / 10;
    bits[25] = min_10 & 1;
    bits[26] = u8::from(min_10 & 2 != 0);
    bits[27] = u8::from(min_10 & 4 != 0);

    bits[28] = even_parity(&bits, 21, 28);

    let hour = xmit.hour % 10;
    bits[29] = hour & 1;
    bits[30] = u8::from(hour & 2 != 0);
    bits[31] = u8::from(hour & 4 != 0);
    bits[32] = u8::from(hour & 8 != 0);

    let hour_10 = xmit.hour / 10;
    bits[33] = hour_10 & 1;
    bits[34] = u8::from(hour_10 & 2 != 0);

    bits[35] = even_parity(&bits, 29, 35);

    let day = xmit.day % 10;
    bits[36] = day & 1;
    bits[37] = u8::from(day & 2 != 0);
    bits[38] = u8::from(day & 4 != 0);
    bits[39] = u8::from(day & 8 != 0);

    let day_10 = xmit.day / 10;
    bits[40] = day_10 & 1;
    bits[41] = u8::from(day_10 & 2 != 0);

    // ISO day of week, Sunday is 7.
    let dow = if xmit.dow != 0 { xmit.dow } else { 7 };
    bits[42] = dow & 1;
    bits[43] = u8::from(dow & 2 != 0);
    bits[44] = u8::from(dow & 4 != 0);

    let mon = xmit.mon % 10;
    bits[45] = mon & 1;
    bits[46] = u8::from(mon & 2 != 0);
    bits[47] = u8::from(mon & 4 != 0);
    bits[48] = u8::from(mon & 8 != 0);

    let mon_10 = xmit.mon / 10;
    bits[49] = mon_10 & 1;

    let year = (xmit.year % 10) as u8;
    bits[50] = year & 1;
    bits[51] = u8::from(year & 2 != 0);
    bits[52] = u8::from(year & 4 != 0);
    bits[53] = u8::from(year & 8 != 0);

    let year_10 = ((xmit.year % 100) / 10) as u8;
    bits[54] = year_10 & 1;
    bits[55] = u8::from(year_10 & 2 != 0);
    bits[56] = u8::from(year_10 & 4 != 0);
    bits[57] = u8::from(year_10 & 8 != 0);

    bits[58] = even_parity(&bits, 36, 58);

    minute.slots.copy_from_slice(&bits);
    minute.slot_count = 60;

    // Marker: low for 0 ms, 0: 100 ms, 1: 200 ms.
    let mut j = 0;
    for &bit in bits.iter() {
        let lo_dsec = if bit == SYNC_MARKER {
            0
        } else {
            u32::from(bit != 0) + 1
        };
        let lo = 100 * lo_dsec / MSECS_TICK;
        minute.levels.set_run(j, lo, false);
        minute.levels.set_run(j + lo, TICKS_SEC - lo, true);
        j += TICKS_SEC;
    }
}

pub(super) fn describe(utc_timestamp: i64, _dut1: i16) -> String {
    let info = Station::Dcf77.info();
    let utc_datetime = datetime::parse_timestamp(utc_timestamp);
    let (is_cest, in_mins) = datetime::is_eu_dst(&utc_datetime);
    let is_xmit_cest = is_cest ^ (in_mins == 1);

    let offset = if is_xmit_cest {
        info.dst_offset
    } else {
        info.utc_offset
    };
    let xmit = datetime::parse_timestamp(utc_timestamp + offset + MSECS_MIN);

    let mut out = format!(
        "{:04}-{:02}-{:02} {} {:02}:{:02} {}",
        xmit.year,
        xmit.mon,
        xmit.day,
        DAY_NAMES[usize::from(xmit.dow)],
        xmit.hour,
        xmit.min,
        if is_xmit_cest { "CEST" } else { "CET" },
    );
    if (1..=60).contains(&in_mins) {
        out.push_str(", changeover announced");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::tests::{encoded, high_ticks, DEC_31_2099};
    use super::super::{Station, SYNC_MARKER, TICKS_SEC};

    #[test]
    fn frame_carries_the_next_minute_in_cet() {
        // 2099-12-31 12:34 UTC is 13:34 CET; the frame carries 13:35.
        let minute = encoded(Station::Dcf77, DEC_31_2099, 0);
        let slots = &minute.slots;

        assert_eq!(slots[59], SYNC_MARKER);
        assert_eq!(slots[16], 0);
        // CET, not CEST, on December 31.
        assert_eq!(slots[17], 0);
        assert_eq!(slots[18], 1);
        assert_eq!(slots[20], 1);

        // Minute 35: ones 5 = 1010 LSB-first, tens 3 = 11.
        assert_eq!(&slots[21..25], &[1, 0, 1, 0]);
        assert_eq!(&slots[25..28], &[1, 1, 0]);
        // Even parity over minute slots: four ones.
        assert_eq!(slots[28], 0);

        // Hour 13: ones 3, tens 1.
        assert_eq!(&slots[29..33], &[1, 1, 0, 0]);
        assert_eq!(&slots[33..35], &[1, 0]);
        assert_eq!(slots[35], 1);

        // Day 31, Thursday (ISO 4), month 12, year 99.
        assert_eq!(&slots[36..40], &[1, 0, 0, 0]);
        assert_eq!(&slots[40..42], &[1, 1]);
        assert_eq!(&slots[42..45], &[0, 0, 1]);
        assert_eq!(&slots[45..49], &[0, 1, 0, 0]);
        assert_eq!(slots[49], 1);
        assert_eq!(&slots[50..54], &[1, 0, 0, 1]);
        assert_eq!(&slots[54..58], &[1, 0, 0, 1]);
        // Even parity over date slots: ten ones.
        assert_eq!(slots[58], 0);

        assert_eq!(minute.meaning(), "2099-12-31 Thu 13:35 CET");
    }

    #[test]
    fn slot_durations() {
        let minute = encoded(Station::Dcf77, DEC_31_2099, 0);
        let levels = minute.levels();

        // Slot 0 is a 0 bit: 100 ms low.
        assert_eq!(high_ticks(levels, 0), TICKS_SEC - 2);
        // Slot 20 is always 1: 200 ms low.
        assert_eq!(high_ticks(levels, 20), TICKS_SEC - 4);
        // Slot 59 is the sync marker: the whole second stays high.
        assert_eq!(high_ticks(levels, 59), TICKS_SEC);
    }

    #[test]
    fn summer_frame_flags_cest() {
        // 2099-07-01 12:00 UTC: CEST in force.
        let minute = encoded(Station::Dcf77, 4_086_590_400_000, 0);
        assert_eq!(minute.slots[17], 1);
        assert_eq!(minute.slots[18], 0);
        assert!(minute.meaning().contains("CEST"));
    }

    #[test]
    fn final_minute_before_changeover_carries_cest() {
        // 2099-03-29 00:59 UTC: changeover at 01:00, frame carries the
        // next minute which is already CEST (03:00).
        let minute = encoded(Station::Dcf77, 4_078_429_140_000, 0);
        assert_eq!(minute.slots[16], 1);
        assert_eq!(minute.slots[17], 1);
        // Transmitted hour is 3 in CEST.
        assert_eq!(&minute.slots[29..33], &[1, 1, 0, 0]);
        assert_eq!(&minute.slots[33..35], &[0, 0]);
    }
}
