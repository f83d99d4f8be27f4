//! JJY frame encoding, shared by the 40 kHz and 60 kHz transmitters.
//!
//! JJY keys the carrier high-first: position markers carry 200 ms high,
//! a 1 bit 500 ms, a 0 bit 800 ms, with the rest of the second low.
//! During minutes 15 and 45 the station announces its callsign in Morse
//! code; the year, and day-of-week slots of those frames stay empty and
//! seconds 40-48 are replaced by the announcement.

use super::{even_parity, Minute, Station, DAY_NAMES, MSECS_TICK, SYNC_MARKER, TICKS_SEC};
use crate::datetime;

/// Announcement minutes within each station-local hour.
const MORSE_MIN: u8 = 15;
const MORSE_MIN2: u8 = 45;

/// The callsign is keyed from 40.550 s to about 48.250 s.
const MORSE_SEC: u32 = 40;
const MORSE_END_SEC: u32 = 49;
pub(crate) const JJY_MORSE_TICK: u32 = MORSE_SEC * TICKS_SEC + 550 / MSECS_TICK;
pub(crate) const JJY_MORSE_END_TICK: u32 = MORSE_END_SEC * TICKS_SEC;

/// Morse symbol durations as ticks.
const TICKS_DIT: u32 = 2;
const TICKS_DAH: u32 = 5;
const TICKS_IEG: u32 = 1; // Inter-element gap.
const TICKS_ICG: u32 = 6; // Inter-character gap.
const TICKS_IWG: u32 = 10; // Inter-word gap.

pub(crate) fn is_announce_minute(min: u8) -> bool {
    min == MORSE_MIN || min == MORSE_MIN2
}

pub(super) fn update(minute: &mut Minute, utc_timestamp: i64, _dut1: i16) {
    let info = Station::Jjy.info();
    let datetime = datetime::parse_timestamp(utc_timestamp + info.utc_offset);
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

    bits[36] = even_parity(&bits, 12, 19);
    bits[37] = even_parity(&bits, 1, 9);

    let is_announce = is_announce_minute(datetime.min);
    if !is_announce {
        let year_10 = ((datetime.year % 100) / 10) as u8;
        bits[41] = u8::from(year_10 & 8 != 0);
        bits[42] = u8::from(year_10 & 4 != 0);
        bits[43] = u8::from(year_10 & 2 != 0);
        bits[44] = year_10 & 1;

        let year = (datetime.year % 10) as u8;
        bits[45] = u8::from(year & 8 != 0);
        bits[46] = u8::from(year & 4 != 0);
        bits[47] = u8::from(year & 2 != 0);
        bits[48] = year & 1;

        let dow = datetime.dow;
        bits[50] = u8::from(dow & 4 != 0);
        bits[51] = u8::from(dow & 2 != 0);
        bits[52] = dow & 1;
    }

    minute.slots.copy_from_slice(&bits);
    minute.slot_count = 60;

    // Marker: high for 200 ms, 0: 800 ms, 1: 500 ms.
    let mut i = 0;
    let mut j = 0;
    while i < 60 {
        if is_announce && i as u32 == MORSE_SEC {
            insert_morse(minute);
            i = MORSE_END_SEC as usize;
            j = JJY_MORSE_END_TICK;
        }

        let hi_dsec = if bits[i] == SYNC_MARKER {
            2
        } else if bits[i] != 0 {
            5
        } else {
            8
        };
        let hi = 100 * hi_dsec / MSECS_TICK;
        minute.levels.set_run(j, hi, true);
        minute.levels.set_run(j + hi, TICKS_SEC - hi, false);
        j += TICKS_SEC;
        i += 1;
    }
}

fn pulse(minute: &mut Minute, k: &mut u32, ticks: u32) {
    minute.levels.set_run(*k, ticks, true);
    *k += ticks;
}

/// Key the callsign "JJY JJY" over seconds 40-48 of the minute.
fn insert_morse(minute: &mut Minute) {
    minute.levels.set_run(
        MORSE_SEC * TICKS_SEC,
        (MORSE_END_SEC - MORSE_SEC) * TICKS_SEC,
        false,
    );

    let mut k = JJY_MORSE_TICK;
    for _ in 0..2 {
        // JJ, i.e. .--- .---
        for _ in 0..2 {
            pulse(minute, &mut k, TICKS_DIT);
            k += TICKS_IEG;
            pulse(minute, &mut k, TICKS_DAH);
            k += TICKS_IEG;
            pulse(minute, &mut k, TICKS_DAH);
            k += TICKS_IEG;
            pulse(minute, &mut k, TICKS_DAH);
            k += TICKS_ICG;
        }
        // Y, i.e. -.--
        pulse(minute, &mut k, TICKS_DAH);
        k += TICKS_IEG;
        pulse(minute, &mut k, TICKS_DIT);
        k += TICKS_IEG;
        pulse(minute, &mut k, TICKS_DAH);
        k += TICKS_IEG;
        pulse(minute, &mut k, TICKS_DAH);
        k += TICKS_IWG;
    }
}

pub(super) fn describe(utc_timestamp: i64, _dut1: i16) -> String {
    let info = Station::Jjy.info();
    let dt = datetime::parse_timestamp(utc_timestamp + info.utc_offset);
    let mut out = format!(
        "{:04}-{:02}-{:02} {} {:02}:{:02} JST, day {}",
        dt.year,
        dt.mon,
        dt.day,
        DAY_NAMES[usize::from(dt.dow)],
        dt.hour,
        dt.min,
        dt.doy,
    );
    if is_announce_minute(dt.min) {
        out.push_str(", callsign announcement");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::tests::{encoded, high_ticks, DEC_31_2099};
    use super::super::{Station, SYNC_MARKER, TICKS_SEC};
    use super::{JJY_MORSE_END_TICK, JJY_MORSE_TICK};

    #[test]
    fn frame_for_a_known_minute() {
        // 2099-12-31 12:34 UTC is 21:34 JST, day of year 365.
        let minute = encoded(Station::Jjy, DEC_31_2099, 0);
        let slots = &minute.slots;

        for marker in [0, 9, 19, 29, 39, 49, 59] {
            assert_eq!(slots[marker], SYNC_MARKER, "marker at {marker}");
        }

        // Minute 34: tens 3, ones 4.
        assert_eq!(&slots[1..4], &[0, 1, 1]);
        assert_eq!(&slots[5..9], &[0, 1, 0, 0]);
        // Hour 21: tens 2, ones 1.
        assert_eq!(&slots[12..14], &[1, 0]);
        assert_eq!(&slots[15..19], &[0, 0, 0, 1]);
        // Day of year 365.
        assert_eq!(&slots[22..24], &[1, 1]);
        assert_eq!(&slots[25..29], &[0, 1, 1, 0]);
        assert_eq!(&slots[30..34], &[0, 1, 0, 1]);
        // Parity: hour slots carry two ones, minute slots three.
        assert_eq!(slots[36], 0);
        assert_eq!(slots[37], 1);
        // Year 99, Thursday.
        assert_eq!(&slots[41..45], &[1, 0, 0, 1]);
        assert_eq!(&slots[45..49], &[1, 0, 0, 1]);
        assert_eq!(&slots[50..53], &[1, 0, 0]);

        assert_eq!(minute.meaning(), "2099-12-31 Thu 21:34 JST, day 365");
    }

    #[test]
    fn slot_durations_are_keyed_high_first() {
        let minute = encoded(Station::Jjy, DEC_31_2099, 0);
        let levels = minute.levels();

        // Marker: 200 ms high. 1 bit: 500 ms. 0 bit: 800 ms.
        assert_eq!(high_ticks(levels, 0), 4);
        assert_eq!(high_ticks(levels, 2), 10);
        assert_eq!(high_ticks(levels, 1), 16);
        // The marker second starts high and ends low.
        assert!(levels.is_high(0));
        assert!(!levels.is_high(5));
    }

    #[test]
    fn announcement_minute_blanks_year_and_dow() {
        // 2099-12-31 12:45 UTC is minute 45 JST.
        let minute = encoded(Station::Jjy, DEC_31_2099 + 11 * 60_000, 0);
        assert_eq!(&minute.slots[41..49], &[0; 8]);
        assert_eq!(&minute.slots[50..53], &[0; 3]);
        assert!(minute.meaning().ends_with("callsign announcement"));
    }

    #[test]
    fn announcement_minute_keys_the_callsign() {
        let minute = encoded(Station::Jjy, DEC_31_2099 + 11 * 60_000, 0);
        let levels = minute.levels();

        // Ticks between second 40 and the first keyed element are low.
        for tick in 40 * TICKS_SEC..JJY_MORSE_TICK {
            assert!(!levels.is_high(tick), "tick {tick}");
        }
        // First J: dit at 40.550, followed by three dahs.
        assert!(levels.is_high(JJY_MORSE_TICK));
        assert!(levels.is_high(JJY_MORSE_TICK + 1));
        assert!(!levels.is_high(JJY_MORSE_TICK + 2));
        assert!(levels.is_high(JJY_MORSE_TICK + 3));

        // The keying ends at 48.250; everything to second 49 stays low.
        for tick in 965..JJY_MORSE_END_TICK {
            assert!(!levels.is_high(tick), "tick {tick}");
        }

        // Second 49 is a normal position marker again.
        assert_eq!(high_ticks(levels, 49), 4);
    }

    #[test]
    fn non_announcement_minute_runs_the_full_frame() {
        let minute = encoded(Station::Jjy, DEC_31_2099, 0);
        let levels = minute.levels();
        // Second 40 carries its ordinary 0/1 keying, not silence.
        assert!(high_ticks(levels, 40) >= 10);
    }

    #[test]
    fn jjy60_differs_only_in_carrier() {
        let a = encoded(Station::Jjy, DEC_31_2099, 0);
        let b = encoded(Station::Jjy60, DEC_31_2099, 0);
        assert_eq!(a.slots, b.slots);
        for tick in 0..super::super::TICKS_MIN {
            assert_eq!(a.levels().is_high(tick), b.levels().is_high(tick));
        }
        assert_eq!(Station::Jjy.carrier_hz(), 40_000);
        assert_eq!(Station::Jjy60.carrier_hz(), 60_000);
    }
}
