//! The station waveform generator.
//!
//! [`SignalGenerator`] is the pull-mode core behind the sink callback: it
//! keeps the tick/sample bookkeeping for the current station minute,
//! resynchronizes to the wall clock when drift exceeds the threshold, and
//! turns the per-minute transmit bitmap into amplitude-modulated carrier
//! samples.

use crossbeam_channel::{Receiver, Sender};

use crate::config::{Config, ConfigError, TimeBase};
use crate::datetime;
use crate::oscillator::Oscillator;
use crate::station::{
    Minute, Station, JJY_MORSE_END_TICK, JJY_MORSE_TICK, MSECS_TICK, TICKS_MIN, TICKS_SEC,
};

/// Maximum tolerated clock drift in milliseconds before a resync.
const DRIFT_THRESHOLD: u64 = 500;

/// Gain smoothing: exponential approach rate per sample and the delta
/// below which the gain snaps to its target.
const LERP_RATE: f64 = 0.015;
const LERP_MIN_DELTA: f64 = 0.005;

/// Carrier ceiling without the ultrasound opt-in.
const ULTRASOUND_THRESHOLD: u32 = 20_000;

/// Carrier ceiling for the audible monitoring tone.
const AUDIBLE_THRESHOLD: u32 = 1_000;

const MSECS_MIN: u32 = 60_000;

/// Status notifications posted from inside the sink callback.
///
/// Sent with a non-blocking `try_send`; a slow or absent consumer drops
/// events rather than stalling audio.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    /// A fresh minute frame was encoded (also posted on every resync).
    Minute {
        /// Timestamp of the minute's start on the broadcast clock.
        timestamp: i64,
        /// Bit readout, one character per slot.
        readout: String,
        /// Human-readable meaning of the frame.
        meaning: String,
    },
    /// A second boundary passed.
    Second {
        /// Second within the station minute (0-59).
        second: u8,
        /// Slot value being transmitted (0xff for sync markers).
        value: u8,
    },
}

/// Sample-accurate waveform generator for one time station.
///
/// The generator is constructed once, reconfigured via
/// [`set_rate`](SignalGenerator::set_rate) when the sink settles on a
/// different sample rate, and pulled from the sink callback through
/// [`fill`](SignalGenerator::fill). It is deliberately single-threaded:
/// the callback is the only place its state changes.
pub struct SignalGenerator {
    station: Station,
    base: TimeBase,
    offset: i64,
    dut1: i16,
    smooth: bool,
    ultrasound: bool,
    audible: bool,
    sample_rate: u32,

    minute: Minute,

    /// Added to every wall clock read; folds in the user offset and any
    /// fixed time base.
    base_offset: i64,
    has_base_offset: bool,
    has_synced: bool,

    /// Broadcast-clock timestamp at which `samples` was zero.
    timestamp: i64,
    /// Expected broadcast-clock timestamp at the next callback.
    next_timestamp: i64,
    /// Samples generated since `timestamp`.
    samples: u64,
    /// Sample index of the next tick boundary.
    next_tick: u64,
    /// Samples per tick at the current rate.
    samples_tick: u64,
    /// Tick index within the current station minute.
    tick: u32,
    /// Whether JJY is keying its callsign right now.
    is_morse: bool,

    osc: Oscillator,
    /// Emitted (subharmonic) carrier frequency.
    freq: u32,
    gain: f64,

    status: Option<Sender<StatusEvent>>,
}

impl SignalGenerator {
    /// Build a generator from a validated configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let sample_rate = config.rate.hz();
        let freq = emit_freq(
            config.station.carrier_hz(),
            carrier_limit(config, sample_rate),
        );

        Ok(Self {
            station: config.station,
            base: config.base,
            offset: config.offset,
            dut1: config.dut1,
            smooth: config.smooth,
            ultrasound: config.ultrasound,
            audible: config.audible,
            sample_rate,
            minute: Minute::new(),
            base_offset: 0,
            has_base_offset: false,
            has_synced: false,
            timestamp: 0,
            next_timestamp: 0,
            samples: 0,
            next_tick: 0,
            samples_tick: samples_per_tick(sample_rate),
            tick: 0,
            is_morse: false,
            osc: Oscillator::new(freq, sample_rate, 0),
            freq,
            gain: 0.0,
            status: None,
        })
    }

    /// The station this generator emulates.
    pub fn station(&self) -> Station {
        self.station
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Emitted carrier frequency in Hz (a subharmonic of the nominal
    /// station frequency).
    pub fn emit_freq(&self) -> u32 {
        self.freq
    }

    /// The current minute's frame and readout.
    pub fn minute(&self) -> &Minute {
        &self.minute
    }

    /// Subscribe to status notifications. Replaces any earlier receiver.
    pub fn status_events(&mut self) -> Receiver<StatusEvent> {
        let (tx, rx) = crossbeam_channel::bounded(128);
        self.status = Some(tx);
        rx
    }

    /// Adopt the sample rate the sink actually settled on. Forces a
    /// resync at the next callback.
    pub fn set_rate(&mut self, rate: u32) {
        if rate != self.sample_rate {
            log::warn!(
                "sink runs at {rate} Hz instead of {} Hz",
                self.sample_rate
            );
        }
        self.sample_rate = rate;
        self.samples_tick = samples_per_tick(rate);
        self.freq = emit_freq(self.station.carrier_hz(), self.rate_limit(rate));
        self.next_timestamp = 0;
    }

    fn rate_limit(&self, rate: u32) -> u32 {
        if self.audible {
            AUDIBLE_THRESHOLD
        } else if self.ultrasound {
            rate / 2
        } else {
            ULTRASOUND_THRESHOLD
        }
    }

    /// Fill `buf` with the next `buf.len()` samples.
    ///
    /// This is the sink callback body. It must not be invoked
    /// concurrently; the sink owns exactly one render thread.
    pub fn fill(&mut self, buf: &mut [f64]) {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
        no_denormals::no_denormals(|| self.render(buf));
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
        self.render(buf);
    }

    fn render(&mut self, buf: &mut [f64]) {
        // Resync on the first run or on unexpected clock drift (NTP
        // steps, suspend/resume, a sink rate change).
        match self.now() {
            Some(now) => {
                let delta = now - self.next_timestamp;
                if delta.unsigned_abs() > DRIFT_THRESHOLD {
                    self.resync(now, delta);
                }
            }
            None => {
                // Clock read failed: skip this callback's drift check.
                // Without a prior sync there is no timeline to continue,
                // so emit silence.
                if !self.has_synced {
                    buf.fill(0.0);
                    return;
                }
            }
        }

        self.generate(buf);

        self.next_timestamp =
            self.timestamp + (self.samples * 1000 / u64::from(self.sample_rate)) as i64;
    }

    /// Read the broadcast clock: wall clock plus the base offset.
    fn now(&mut self) -> Option<i64> {
        let system = datetime::now()?;
        if !self.has_base_offset {
            self.base_offset = match self.base {
                TimeBase::Fixed(base) => base - system + self.offset,
                TimeBase::System => self.offset,
            };
            self.has_base_offset = true;
        }
        Some(system + self.base_offset)
    }

    /// Realign every timing register to `now` and regenerate the minute.
    fn resync(&mut self, now: i64, delta: i64) {
        let datetime = datetime::parse_timestamp(now);

        let msecs_since_tick = u32::from(datetime.msec) % MSECS_TICK;
        let msecs_to_tick = MSECS_TICK - msecs_since_tick;
        let msecs_since_min = 1000 * u32::from(datetime.sec) + u32::from(datetime.msec);
        let msecs_to_min = MSECS_MIN - msecs_since_min;
        let to_min = (u64::from(msecs_to_min) * u64::from(self.sample_rate) / 1000) as i64;

        self.minute.update(self.station, now, self.dut1);

        self.timestamp = now;
        self.samples = 0;
        self.next_tick = u64::from(msecs_to_tick) * u64::from(self.sample_rate) / 1000;
        self.tick = msecs_since_min / MSECS_TICK;
        self.is_morse = self.station.is_announce_minute(datetime.min)
            && (JJY_MORSE_TICK..JJY_MORSE_END_TICK).contains(&self.tick);

        // Per DCF77's signal format, each minute starts at a rising zero
        // crossing of the carrier. Receivers almost certainly cannot tell
        // through a leaked subharmonic, but aligning the phase costs
        // nothing: start the oscillator so the next minute boundary lands
        // on phase zero.
        self.osc = Oscillator::new(self.freq, self.sample_rate, -to_min);

        if self.has_synced {
            log::info!("{} resynced, delta {delta:+} ms", self.station);
        } else {
            log::info!("{} synced", self.station);
            self.has_synced = true;
        }

        self.post_minute(now);
    }

    /// Produce samples, advancing ticks in strict order.
    fn generate(&mut self, buf: &mut [f64]) {
        let xmit_low = self.station.info().xmit_low;

        for out in buf.iter_mut() {
            if self.samples == self.next_tick {
                self.advance_tick();
            }

            let target = if self.minute.levels().is_high(self.tick) {
                1.0
            } else if self.is_morse {
                0.0
            } else {
                xmit_low
            };

            self.gain = if self.smooth {
                lerp(target, self.gain)
            } else {
                target
            };

            *out = self.osc.next() * self.gain;
            self.samples += 1;
        }
    }

    /// Cross one tick boundary; wraps the minute and re-encodes the frame
    /// exactly once per minute.
    fn advance_tick(&mut self) {
        let tick_timestamp =
            self.timestamp + (self.samples * 1000 / u64::from(self.sample_rate)) as i64;

        self.next_tick += self.samples_tick;

        if self.tick == TICKS_MIN - 1 {
            self.minute.update(self.station, tick_timestamp, self.dut1);
            self.tick = 0;
            self.post_minute(tick_timestamp);
        } else {
            self.tick += 1;
        }

        // JJY keys its callsign on-off from 40.550 s to the 49 s marker
        // of announcement minutes; the low gain stays at zero through the
        // whole overwritten window.
        if matches!(self.station, Station::Jjy | Station::Jjy60) {
            let tick_datetime = datetime::parse_timestamp(tick_timestamp);
            if self.station.is_announce_minute(tick_datetime.min) {
                if self.tick == JJY_MORSE_TICK {
                    self.is_morse = true;
                } else if self.tick == JJY_MORSE_END_TICK {
                    self.is_morse = false;
                }
            }
        }

        if self.tick % TICKS_SEC == 0 {
            let second = (self.tick / TICKS_SEC) as u8;
            self.post(StatusEvent::Second {
                second,
                value: self.minute.slot_at(self.station, second),
            });
        }
    }

    fn post_minute(&self, timestamp: i64) {
        self.post(StatusEvent::Minute {
            timestamp,
            readout: self.minute.readout().to_string(),
            meaning: self.minute.meaning().to_string(),
        });
    }

    fn post(&self, event: StatusEvent) {
        if let Some(tx) = &self.status {
            let _ = tx.try_send(event);
        }
    }
}

/// Interpolate the gain towards its target.
fn lerp(target: f64, gain: f64) -> f64 {
    let diff = (target - gain).abs();
    if diff > LERP_MIN_DELTA {
        (1.0 - LERP_RATE) * gain + LERP_RATE * target
    } else {
        target
    }
}

fn samples_per_tick(rate: u32) -> u64 {
    u64::from(rate) * u64::from(MSECS_TICK) / 1000
}

/// Largest odd subharmonic of `nominal` that fits under `limit`.
///
/// The first odd subharmonic of each station frequency within the Nyquist
/// frequency for the supported output rates:
///
/// ```text
///                              Output sample rate
///            44100  48000  88200  96000 176400 192000 352800 384000
///
///     40000  13333  13333  40000  40000  40000  40000  40000  40000
///     60000  20000  20000  20000  20000  60000  60000  60000  60000
///     68500  13700  22833  22833  22833  68500  68500  68500  68500
///     77500  15500  15500  25833  25833  77500  77500  77500  77500
/// ```
fn emit_freq(nominal: u32, limit: u32) -> u32 {
    let mut subharmonic = 1;
    while nominal / subharmonic > limit {
        subharmonic += 2;
    }
    nominal / subharmonic
}

fn carrier_limit(config: &Config, rate: u32) -> u32 {
    if config.audible {
        AUDIBLE_THRESHOLD
    } else if config.ultrasound {
        rate / 2
    } else {
        ULTRASOUND_THRESHOLD
    }
}
