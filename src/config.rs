//! Generator and sink configuration.

use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::audio::SampleFormat;
use crate::station::Station;

/// User offset limits in milliseconds (exclusive).
const OFFSET_MIN: i64 = -86_400_000;
const OFFSET_MAX: i64 = 86_400_000;

/// DUT1 limits in milliseconds (exclusive).
const DUT1_MIN: i16 = -1000;
const DUT1_MAX: i16 = 1000;

/// Channel count limits (exclusive).
const CHANNELS_MIN: u16 = 0;
const CHANNELS_MAX: u16 = 1024;

const MSECS_HOUR: i64 = 3_600_000;
const MSECS_MIN: i64 = 60_000;
const MSECS_SEC: i64 = 1000;

/// Where the emulated broadcast takes its notion of "now" from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBase {
    /// Follow the system clock.
    System,
    /// Pretend the first sample was generated at this timestamp
    /// (milliseconds since the Unix epoch).
    Fixed(i64),
}

/// Recognized output sample rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz88200,
    Hz96000,
    Hz176400,
    Hz192000,
    Hz352800,
    Hz384000,
}

impl SampleRate {
    /// Every recognized rate, ascending.
    pub const ALL: [SampleRate; 8] = [
        SampleRate::Hz44100,
        SampleRate::Hz48000,
        SampleRate::Hz88200,
        SampleRate::Hz96000,
        SampleRate::Hz176400,
        SampleRate::Hz192000,
        SampleRate::Hz352800,
        SampleRate::Hz384000,
    ];

    /// The rate in Hz.
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz48000 => 48_000,
            SampleRate::Hz88200 => 88_200,
            SampleRate::Hz96000 => 96_000,
            SampleRate::Hz176400 => 176_400,
            SampleRate::Hz192000 => 192_000,
            SampleRate::Hz352800 => 352_800,
            SampleRate::Hz384000 => 384_000,
        }
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hz())
    }
}

impl FromStr for SampleRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SampleRate::ALL
            .iter()
            .find(|rate| s == rate.hz().to_string())
            .copied()
            .ok_or_else(|| ConfigError::UnknownRate(s.to_string()))
    }
}

/// Errors refused at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownStation(String),
    UnknownFormat(String),
    UnknownRate(String),
    BadOffset(String),
    OffsetOutOfRange(i64),
    Dut1OutOfRange(i16),
    ChannelsOutOfRange(u16),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownStation(s) => write!(f, "invalid station \"{s}\""),
            ConfigError::UnknownFormat(s) => write!(f, "invalid format \"{s}\""),
            ConfigError::UnknownRate(s) => write!(f, "invalid rate \"{s}\""),
            ConfigError::BadOffset(s) => write!(f, "invalid offset \"{s}\""),
            ConfigError::OffsetOutOfRange(ms) => write!(
                f,
                "offset {ms} ms must be between -23:59:59.999 and 23:59:59.999"
            ),
            ConfigError::Dut1OutOfRange(ms) => write!(
                f,
                "dut1 {ms} must be between {} and {}",
                DUT1_MIN + 1,
                DUT1_MAX - 1
            ),
            ConfigError::ChannelsOutOfRange(n) => write!(
                f,
                "channels {n} must be between {} and {}",
                CHANNELS_MIN + 1,
                CHANNELS_MAX - 1
            ),
        }
    }
}

impl Error for ConfigError {}

/// Full configuration for a generator plus its sink.
///
/// Construct with [`Config::new`] and adjust the public fields; range
/// validation happens when the configuration is handed to
/// [`SignalGenerator::new`](crate::SignalGenerator::new).
#[derive(Debug, Clone)]
pub struct Config {
    /// Time station to emulate.
    pub station: Station,
    /// Where the broadcast clock starts.
    pub base: TimeBase,
    /// User offset added to the broadcast clock, in milliseconds.
    pub offset: i64,
    /// DUT1 value in milliseconds (carried by MSF and WWVB).
    pub dut1: i16,
    /// Stop the sink loop after this long.
    pub timeout: Option<Duration>,
    /// Output sample format.
    pub format: SampleFormat,
    /// Output sample rate.
    pub rate: SampleRate,
    /// Output channel count.
    pub channels: u16,
    /// Interpolate rapid gain changes.
    pub smooth: bool,
    /// Allow carrier frequencies above 20 kHz, up to Nyquist.
    /// Some hardware misbehaves when fed ultrasound; off by default.
    pub ultrasound: bool,
    /// Emit a low-frequency monitoring tone instead of the carrier.
    pub audible: bool,
}

impl Config {
    /// Configuration with the default sound settings for a station.
    pub fn new(station: Station) -> Self {
        Self {
            station,
            base: TimeBase::System,
            offset: 0,
            dut1: 0,
            timeout: None,
            format: SampleFormat::S16,
            rate: SampleRate::Hz48000,
            channels: 1,
            smooth: false,
            ultrasound: false,
            audible: false,
        }
    }

    /// Check every range constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(OFFSET_MIN < self.offset && self.offset < OFFSET_MAX) {
            return Err(ConfigError::OffsetOutOfRange(self.offset));
        }
        if !(DUT1_MIN < self.dut1 && self.dut1 < DUT1_MAX) {
            return Err(ConfigError::Dut1OutOfRange(self.dut1));
        }
        if !(CHANNELS_MIN < self.channels && self.channels < CHANNELS_MAX) {
            return Err(ConfigError::ChannelsOutOfRange(self.channels));
        }
        Ok(())
    }

    /// Parse a user offset in `[[[+-]HH:]mm:]ss[.SSS]` format into
    /// milliseconds.
    pub fn parse_offset(s: &str) -> Result<i64, ConfigError> {
        let err = || ConfigError::BadOffset(s.to_string());
        let bytes = s.as_bytes();

        // Trimmed bounds and the position of the decimal point.
        let mut left = None;
        let mut right = 0;
        let mut point = None;
        for (i, &b) in bytes.iter().enumerate() {
            if !b.is_ascii_whitespace() {
                if left.is_none() {
                    left = Some(i);
                }
                right = i + 1;
            }
            if b == b'.' {
                if point.is_some() {
                    return Err(err());
                }
                point = Some(i);
            }
        }
        let left = left.ok_or_else(err)?;

        let mut msecs: i64 = 0;

        // Up to three digits to the right of the decimal point.
        if let Some(p) = point {
            let digit_before = p > left && bytes[p - 1].is_ascii_digit();
            let digit_after = p + 1 < right && bytes[p + 1].is_ascii_digit();
            if !digit_before && !digit_after {
                return Err(err());
            }
            let mut mul = 100;
            for &b in &bytes[p + 1..right] {
                if !b.is_ascii_digit() {
                    return Err(err());
                }
                if mul > 0 {
                    msecs += mul * i64::from(b - b'0');
                    mul /= 10;
                }
            }
        }

        // The rest, right to left: seconds, then minutes, then hours.
        let mut mul = MSECS_SEC;
        let mut colons = 0;
        let whole_end = point.unwrap_or(right);
        for i in (left..whole_end).rev() {
            let b = bytes[i];
            if b == b'+' || b == b'-' {
                if i != left {
                    return Err(err());
                }
                if b == b'-' {
                    msecs = -msecs;
                }
            } else if b == b':' {
                if i > left && bytes[i - 1].is_ascii_digit() && colons < 2 {
                    mul = if colons == 0 { MSECS_MIN } else { MSECS_HOUR };
                    colons += 1;
                } else {
                    return Err(err());
                }
            } else if b.is_ascii_digit() {
                msecs += mul * i64::from(b - b'0');
                mul *= 10;
                if mul > i64::from(i32::MAX) {
                    return Err(err());
                }
            } else {
                return Err(err());
            }

            if msecs < i64::from(i32::MIN) || msecs > i64::from(i32::MAX) {
                return Err(err());
            }
        }

        Ok(msecs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::new(Station::Wwvb);
        assert!(config.validate().is_ok());
        assert_eq!(config.format, SampleFormat::S16);
        assert_eq!(config.rate, SampleRate::Hz48000);
        assert_eq!(config.channels, 1);
        assert!(!config.smooth);
        assert!(!config.ultrasound);
        assert!(!config.audible);
    }

    #[test]
    fn range_checks_are_exclusive() {
        let mut config = Config::new(Station::Msf);

        config.offset = 86_400_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::OffsetOutOfRange(86_400_000))
        );
        config.offset = 86_399_999;
        assert!(config.validate().is_ok());
        config.offset = -86_399_999;
        assert!(config.validate().is_ok());

        config.offset = 0;
        config.dut1 = 1000;
        assert_eq!(config.validate(), Err(ConfigError::Dut1OutOfRange(1000)));
        config.dut1 = -999;
        assert!(config.validate().is_ok());

        config.dut1 = 0;
        config.channels = 0;
        assert_eq!(config.validate(), Err(ConfigError::ChannelsOutOfRange(0)));
        config.channels = 1023;
        assert!(config.validate().is_ok());
        config.channels = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sample_rates_parse_and_print() {
        for rate in SampleRate::ALL {
            assert_eq!(rate.to_string().parse::<SampleRate>().unwrap(), rate);
        }
        assert_eq!("48000".parse::<SampleRate>().unwrap(), SampleRate::Hz48000);
        assert!("22050".parse::<SampleRate>().is_err());
        assert!("asdf".parse::<SampleRate>().is_err());
        assert!("".parse::<SampleRate>().is_err());
    }

    #[test]
    fn offset_grammar() {
        assert_eq!(Config::parse_offset("0").unwrap(), 0);
        assert_eq!(Config::parse_offset("12").unwrap(), 12_000);
        assert_eq!(Config::parse_offset("90").unwrap(), 90_000);
        assert_eq!(Config::parse_offset("1:30").unwrap(), 90_000);
        assert_eq!(Config::parse_offset("10:00:00").unwrap(), 36_000_000);
        assert_eq!(Config::parse_offset("+00:00:01").unwrap(), 1000);
        assert_eq!(Config::parse_offset("-00:00:01").unwrap(), -1000);
        assert_eq!(Config::parse_offset("1.5").unwrap(), 1500);
        assert_eq!(Config::parse_offset(".5").unwrap(), 500);
        assert_eq!(Config::parse_offset("-1.25").unwrap(), -1250);
        assert_eq!(Config::parse_offset("0.1234").unwrap(), 123);
        assert_eq!(Config::parse_offset(" 23:59:59.999 ").unwrap(), 86_399_999);
        assert_eq!(Config::parse_offset("-23:59:59.999").unwrap(), -86_399_999);

        assert!(Config::parse_offset("").is_err());
        assert!(Config::parse_offset(".").is_err());
        assert!(Config::parse_offset("1..2").is_err());
        assert!(Config::parse_offset("1:2:3:4").is_err());
        assert!(Config::parse_offset(":30").is_err());
        assert!(Config::parse_offset("12-34").is_err());
        assert!(Config::parse_offset("1:+30").is_err());
        assert!(Config::parse_offset("99999999999").is_err());
    }
}
