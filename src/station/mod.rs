//! Time stations and their per-minute signal encoders.
//!
//! Each station module turns the UTC timestamp of a minute's start into a
//! 60-slot frame and, from that, the packed per-tick transmit level bitmap
//! that drives amplitude modulation for the whole minute. Slot-to-duration
//! rules differ per station and live next to the frame layout in each
//! station's module.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

mod bpc;
mod dcf77;
mod jjy;
mod msf;
mod wwvb;

pub(crate) use jjy::{JJY_MORSE_END_TICK, JJY_MORSE_TICK};

/// Duration of the internal time quantum in milliseconds.
pub const MSECS_TICK: u32 = 50;
/// Ticks per second.
pub const TICKS_SEC: u32 = 1000 / MSECS_TICK;
/// Ticks per station minute.
pub const TICKS_MIN: u32 = 60 * TICKS_SEC;

/// Slot value marking a sync/position marker second.
pub(crate) const SYNC_MARKER: u8 = 0xff;

const MSECS_HOUR: i64 = 3_600_000;
const MSECS_MIN: i64 = 60_000;

static DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A longwave time station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Station {
    /// BPC Shangqiu, China, 68.5 kHz.
    Bpc,
    /// DCF77 Mainflingen, Germany, 77.5 kHz.
    Dcf77,
    /// JJY Mount Otakadoya, Japan, 40 kHz.
    Jjy,
    /// JJY Mount Hagane, Japan, 60 kHz. Same encoding as [`Station::Jjy`].
    Jjy60,
    /// MSF Anthorn, United Kingdom, 60 kHz.
    Msf,
    /// WWVB Fort Collins, United States, 60 kHz.
    Wwvb,
}

impl Station {
    pub(crate) fn info(self) -> &'static StationInfo {
        &STATION_INFO[self as usize]
    }

    /// Nominal carrier frequency in Hz.
    pub fn carrier_hz(self) -> u32 {
        self.info().freq
    }

    /// Whether this station interrupts its time code for the JJY callsign
    /// announcement during the given station-local minute.
    pub(crate) fn is_announce_minute(self, min: u8) -> bool {
        matches!(self, Station::Jjy | Station::Jjy60) && jjy::is_announce_minute(min)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Station::Bpc => "BPC",
            Station::Dcf77 => "DCF77",
            Station::Jjy => "JJY",
            Station::Jjy60 => "JJY60",
            Station::Msf => "MSF",
            Station::Wwvb => "WWVB",
        };
        f.write_str(name)
    }
}

impl FromStr for Station {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // JJY40 is an accepted alias for the 40 kHz JJY transmitter.
        if s.eq_ignore_ascii_case("BPC") {
            Ok(Station::Bpc)
        } else if s.eq_ignore_ascii_case("DCF77") {
            Ok(Station::Dcf77)
        } else if s.eq_ignore_ascii_case("JJY") || s.eq_ignore_ascii_case("JJY40") {
            Ok(Station::Jjy)
        } else if s.eq_ignore_ascii_case("JJY60") {
            Ok(Station::Jjy60)
        } else if s.eq_ignore_ascii_case("MSF") {
            Ok(Station::Msf)
        } else if s.eq_ignore_ascii_case("WWVB") {
            Ok(Station::Wwvb)
        } else {
            Err(ConfigError::UnknownStation(s.to_string()))
        }
    }
}

/// Static signal characteristics of a real time station.
pub(crate) struct StationInfo {
    /// Fills the minute's slot frame and transmit level bitmap.
    pub update: fn(&mut Minute, i64, i16),
    /// Renders the human-readable meaning of the minute's frame.
    pub describe: fn(i64, i16) -> String,
    /// Slot value being transmitted during a given second.
    pub status: fn(&Minute, u8) -> u8,
    /// Usual (not summer time) UTC offset in milliseconds.
    pub utc_offset: i64,
    /// Summer time UTC offset in milliseconds.
    pub dst_offset: i64,
    /// Actual broadcast frequency in Hz.
    pub freq: u32,
    /// Low gain in [0.0, 1.0].
    pub xmit_low: f64,
    /// Slots per section of the bit readout.
    pub sections: &'static [usize],
}

static STATION_INFO: [StationInfo; 6] = [
    // Station::Bpc
    StationInfo {
        update: bpc::update,
        describe: bpc::describe,
        status: bpc::status,
        utc_offset: 28_800_000, // CST is UTC+0800
        dst_offset: 28_800_000,
        freq: 68_500,
        xmit_low: 3.162277660168379411765e-01, // -10 dB
        sections: &[3, 2, 3, 2, 1, 3, 2, 4],
    },
    // Station::Dcf77
    StationInfo {
        update: dcf77::update,
        describe: dcf77::describe,
        status: slot_status,
        utc_offset: 3_600_000, // CET is UTC+0100
        dst_offset: 7_200_000,
        freq: 77_500,
        xmit_low: 1.496235656094433430496e-01, // -16.5 dB
        sections: &[1, 14, 5, 1, 7, 1, 6, 1, 6, 3, 5, 8, 1, 1],
    },
    // Station::Jjy
    StationInfo {
        update: jjy::update,
        describe: jjy::describe,
        status: slot_status,
        utc_offset: 32_400_000, // JST is UTC+0900
        dst_offset: 32_400_000,
        freq: 40_000,
        xmit_low: 3.162277660168379411765e-01, // -10 dB
        sections: &[10, 10, 10, 10, 10, 10],
    },
    // Station::Jjy60
    StationInfo {
        update: jjy::update,
        describe: jjy::describe,
        status: slot_status,
        utc_offset: 32_400_000, // JST is UTC+0900
        dst_offset: 32_400_000,
        freq: 60_000,
        xmit_low: 3.162277660168379411765e-01, // -10 dB
        sections: &[10, 10, 10, 10, 10, 10],
    },
    // Station::Msf
    StationInfo {
        update: msf::update,
        describe: msf::describe,
        status: slot_status,
        utc_offset: 0, // UTC
        dst_offset: 3_600_000,
        freq: 60_000,
        xmit_low: 0.0, // On-off keying
        sections: &[1, 16, 8, 5, 6, 3, 6, 7, 1, 6, 1],
    },
    // Station::Wwvb
    StationInfo {
        update: wwvb::update,
        describe: wwvb::describe,
        status: slot_status,
        utc_offset: 0, // UTC
        dst_offset: 0,
        freq: 60_000,
        xmit_low: 1.412537544622754492885e-01, // -17 dB
        sections: &[10, 10, 10, 10, 10, 10],
    },
];

/// Slot transmitted during `sec` for stations with one slot per second.
fn slot_status(minute: &Minute, sec: u8) -> u8 {
    minute.slots[usize::from(sec)]
}

/// Packed per-tick transmit level flags for one station minute.
///
/// Bit `k` set means the modulator is high during tick `k`.
#[derive(Clone)]
pub struct XmitLevels {
    bits: [u8; TICKS_MIN as usize / 8],
}

impl XmitLevels {
    pub(crate) fn new() -> Self {
        Self {
            bits: [0; TICKS_MIN as usize / 8],
        }
    }

    /// Transmit level during tick `tick`.
    pub fn is_high(&self, tick: u32) -> bool {
        let tick = tick as usize;
        self.bits[tick / 8] & (1 << (tick % 8)) != 0
    }

    /// Set `len` consecutive ticks starting at `start`.
    pub(crate) fn set_run(&mut self, start: u32, len: u32, high: bool) {
        for tick in start..start + len {
            let tick = tick as usize;
            if high {
                self.bits[tick / 8] |= 1 << (tick % 8);
            } else {
                self.bits[tick / 8] &= !(1 << (tick % 8));
            }
        }
    }
}

impl fmt::Debug for XmitLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sec in 0..60 {
            if sec > 0 {
                f.write_str(" ")?;
            }
            for tick in sec * TICKS_SEC..(sec + 1) * TICKS_SEC {
                f.write_str(if self.is_high(tick) { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

/// One station minute: the slot frame, the tick bitmap derived from it,
/// and the readout strings shown by a status UI.
#[derive(Clone)]
pub struct Minute {
    pub(crate) levels: XmitLevels,
    pub(crate) slots: [u8; 60],
    pub(crate) slot_count: usize,
    readout: String,
    meaning: String,
}

impl Minute {
    pub(crate) fn new() -> Self {
        Self {
            levels: XmitLevels::new(),
            slots: [0; 60],
            slot_count: 0,
            readout: String::new(),
            meaning: String::new(),
        }
    }

    /// Regenerate the frame, bitmap, and readout for the minute starting
    /// at `utc_timestamp`.
    pub(crate) fn update(&mut self, station: Station, utc_timestamp: i64, dut1: i16) {
        let info = station.info();
        (info.update)(self, utc_timestamp, dut1);
        self.readout = render_readout(&self.slots[..self.slot_count], info.sections);
        self.meaning = (info.describe)(utc_timestamp, dut1);
        log::trace!("{station} minute frame: {}", self.readout);
    }

    /// Transmit level bitmap for the minute.
    pub fn levels(&self) -> &XmitLevels {
        &self.levels
    }

    /// Bit readout: one character per slot, sectioned per station layout.
    pub fn readout(&self) -> &str {
        &self.readout
    }

    /// Human-readable meaning of the transmitted frame.
    pub fn meaning(&self) -> &str {
        &self.meaning
    }

    /// Slot value transmitted during second `sec` of the minute.
    pub(crate) fn slot_at(&self, station: Station, sec: u8) -> u8 {
        (station.info().status)(self, sec)
    }
}

/// Render the slot frame as text, one character per slot: `M` for sync
/// markers, the slot value otherwise, a space between layout sections.
fn render_readout(slots: &[u8], sections: &[usize]) -> String {
    let mut out = String::with_capacity(slots.len() + sections.len());
    let mut idx = 0;
    for (i, &len) in sections.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        for _ in 0..len {
            if idx == slots.len() {
                break;
            }
            let slot = slots[idx];
            out.push(match slot {
                SYNC_MARKER => 'M',
                0..=9 => (b'0' + slot) as char,
                _ => '?',
            });
            idx += 1;
        }
    }
    out
}

/// Compute even parity over a slot range.
pub(crate) fn even_parity(slots: &[u8], lo: usize, hi: usize) -> u8 {
    let ones: u32 = slots[lo..hi].iter().map(|slot| slot.count_ones()).sum();
    (ones % 2) as u8
}

/// Compute odd parity over a slot range.
pub(crate) fn odd_parity(slots: &[u8], lo: usize, hi: usize) -> u8 {
    1 - even_parity(slots, lo, hi)
}
