//! The audio sink contract and the driver glue behind it.
//!
//! A sink owns one output loop and calls back whenever its buffer has
//! drained enough to accept more samples. The [`Driver`] is that
//! callback's body: it pulls `f64` samples from the generator into a
//! scratch buffer and hands them to the codec to fill the sink's byte
//! buffer.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::audio::{self, SampleFormat};
use crate::config::{Config, ConfigError};
use crate::generator::{SignalGenerator, StatusEvent};

/// Errors raised by an audio sink.
#[derive(Debug)]
pub enum BackendError {
    /// The configuration was rejected before any device was touched.
    Config(ConfigError),
    /// No usable output device.
    NoDevice,
    /// The sink cannot express this sample format.
    UnsupportedFormat(SampleFormat),
    /// The sink failed to open or run its stream.
    Stream(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Config(err) => err.fmt(f),
            BackendError::NoDevice => write!(f, "no usable output device"),
            BackendError::UnsupportedFormat(format) => {
                write!(f, "sink does not support sample format {format}")
            }
            BackendError::Stream(msg) => write!(f, "output stream failed: {msg}"),
        }
    }
}

impl Error for BackendError {}

impl From<ConfigError> for BackendError {
    fn from(err: ConfigError) -> Self {
        BackendError::Config(err)
    }
}

/// The contract an audio sink implements for the core.
///
/// `init` negotiates a device configuration and takes ownership of the
/// driver for the lifetime of the stream; `run` blocks in the output loop
/// until the optional timeout elapses or the host tears the sink down.
/// Dropping the sink is `deinit`.
pub trait Backend: Sized {
    /// Open the sink and wire the driver into its output loop.
    fn init(config: &Config, driver: Driver) -> Result<Self, BackendError>;

    /// The sample rate the sink actually settled on.
    fn rate(&self) -> u32;

    /// Run the output loop.
    fn run(&self, timeout: Option<Duration>) -> Result<(), BackendError>;
}

/// Glue between a sink callback and the generator/codec pair.
pub struct Driver {
    generator: SignalGenerator,
    scratch: Vec<f64>,
    format: SampleFormat,
    channels: u16,
}

impl Driver {
    /// Build the generator and conversion state for a configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            generator: SignalGenerator::new(config)?,
            scratch: Vec::new(),
            format: config.format,
            channels: config.channels,
        })
    }

    /// Subscribe to the generator's status notifications.
    pub fn status_events(&mut self) -> crossbeam_channel::Receiver<StatusEvent> {
        self.generator.status_events()
    }

    /// Adopt the sample rate the sink settled on.
    pub fn set_rate(&mut self, rate: u32) {
        self.generator.set_rate(rate);
    }

    /// Output format the codec produces.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes per interleaved output frame.
    pub fn frame_bytes(&self) -> usize {
        self.format.phys_width() * usize::from(self.channels)
    }

    /// Sink callback for byte-oriented sinks: fill `out` with as many
    /// whole frames as it holds.
    pub fn render(&mut self, out: &mut [u8]) {
        let frames = out.len() / self.frame_bytes();
        if self.scratch.len() < frames {
            self.scratch.resize(frames, 0.0);
        }
        let scratch = &mut self.scratch[..frames];
        self.generator.fill(scratch);
        audio::fill_buffer(self.format, self.channels, scratch, out);
    }

    /// Sink callback for sinks that consume 1-channel `f64` directly.
    pub fn render_f64(&mut self, out: &mut [f64]) {
        self.generator.fill(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::Station;

    #[test]
    fn driver_fills_whole_frames() {
        let _ = env_logger::try_init();
        let mut config = Config::new(Station::Wwvb);
        config.format = SampleFormat::S16Le;
        config.channels = 2;
        let mut driver = Driver::new(&config).unwrap();
        assert_eq!(driver.frame_bytes(), 4);

        let mut out = vec![0u8; 4 * 480];
        driver.render(&mut out);
        // Interleaved stereo: both channels carry identical bytes.
        for frame in out.chunks_exact(4) {
            assert_eq!(frame[..2], frame[2..]);
        }
    }

    #[test]
    fn driver_refuses_bad_config() {
        let mut config = Config::new(Station::Wwvb);
        config.channels = 0;
        assert!(Driver::new(&config).is_err());
    }
}
