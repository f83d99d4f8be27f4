//! cpal-backed audio sink.
//!
//! The stream is built in raw mode so the crate's own codec produces the
//! bytes the device consumes; cpal only ever sees native-endian formats,
//! so the explicit `_LE`/`_BE` and 24-bit formats are refused here even
//! though the codec itself supports them.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::SampleFormat;
use crate::backend::{Backend, BackendError, Driver};
use crate::config::Config;

/// An output stream on the system's default audio device.
pub struct CpalSink {
    stream: cpal::Stream,
    rate: u32,
}

impl Backend for CpalSink {
    fn init(config: &Config, mut driver: Driver) -> Result<Self, BackendError> {
        let sample_format = cpal_sample_format(config.format)
            .ok_or(BackendError::UnsupportedFormat(config.format))?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(BackendError::NoDevice)?;

        let ranges: Vec<_> = device
            .supported_output_configs()
            .map_err(|err| BackendError::Stream(err.to_string()))?
            .filter(|range| {
                range.sample_format() == sample_format && range.channels() == config.channels
            })
            .collect();
        if ranges.is_empty() {
            return Err(BackendError::UnsupportedFormat(config.format));
        }

        // The device may not do the requested rate; fall back to the
        // nearest supported one, like an ALSA "set rate near".
        let requested = config.rate.hz();
        let rate = if ranges
            .iter()
            .any(|r| (r.min_sample_rate().0..=r.max_sample_rate().0).contains(&requested))
        {
            requested
        } else {
            let nearest = ranges[0]
                .min_sample_rate()
                .0
                .max(requested.min(ranges[0].max_sample_rate().0));
            log::warn!("failed to set rate {requested}, fallback to {nearest}");
            nearest
        };

        driver.set_rate(rate);

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream_raw(
                &stream_config,
                sample_format,
                move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                    driver.render(data.bytes_mut());
                },
                |err| log::error!("output stream error: {err}"),
                None,
            )
            .map_err(|err| BackendError::Stream(err.to_string()))?;

        Ok(Self { stream, rate })
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn run(&self, timeout: Option<Duration>) -> Result<(), BackendError> {
        self.stream
            .play()
            .map_err(|err| BackendError::Stream(err.to_string()))?;

        // The stream renders on its own thread; this thread only waits
        // out the timeout. Without one, termination is the host's job
        // (a signal ends the process and with it the stream).
        match timeout {
            Some(timeout) => {
                let _ = crossbeam_channel::after(timeout).recv();
            }
            None => {
                let _ = crossbeam_channel::never::<()>().recv();
            }
        }

        Ok(())
    }
}

/// Emulate a station on the default output device.
///
/// Blocks until the configured timeout elapses, if one is set.
pub fn play(config: &Config) -> Result<(), BackendError> {
    let driver = Driver::new(config)?;
    let sink = CpalSink::init(config, driver)?;
    log::info!(
        "{} on {} Hz {} x{}",
        config.station,
        sink.rate(),
        config.format,
        config.channels
    );
    sink.run(config.timeout)
}

/// Formats cpal can express: native endianness, no 24-bit packings.
fn cpal_sample_format(format: SampleFormat) -> Option<cpal::SampleFormat> {
    match format {
        SampleFormat::S16 => Some(cpal::SampleFormat::I16),
        SampleFormat::S32 => Some(cpal::SampleFormat::I32),
        SampleFormat::U16 => Some(cpal::SampleFormat::U16),
        SampleFormat::U32 => Some(cpal::SampleFormat::U32),
        SampleFormat::Float => Some(cpal::SampleFormat::F32),
        SampleFormat::Float64 => Some(cpal::SampleFormat::F64),
        _ => None,
    }
}
