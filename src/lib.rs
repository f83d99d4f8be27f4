//! Emulate longwave time station broadcasts through consumer audio
//! hardware.
//!
//! Radio-controlled ("atomic") clocks set themselves from one of a
//! handful of government longwave transmitters: BPC (68.5 kHz), DCF77
//! (77.5 kHz), JJY (40/60 kHz), MSF (60 kHz), and WWVB (60 kHz). Those
//! frequencies sit far above what a sound card can reproduce, but an odd
//! subharmonic does not: consumer audio hardware leaks enough RF at
//! multiples of the played frequency that a clock held close to a speaker
//! will lock onto the synthesized signal and set itself.
//!
//! This crate generates that waveform: a sample-accurate, pull-mode
//! amplitude-modulated carrier whose per-minute bit frame encodes the
//! wall clock the way the real station would. The pieces compose as
//!
//! - [`SignalGenerator`], the core: encodes each minute, tracks ticks
//!   and clock drift, and fills `f64` sample buffers on demand;
//! - [`audio::fill_buffer`], the codec that converts those samples into
//!   any of 24 interleaved PCM formats;
//! - [`Driver`] and the [`Backend`] contract gluing both into an audio
//!   sink callback, with a [cpal](https://crates.io/crates/cpal)-backed
//!   sink behind the `cpal` feature (on by default).
//!
//! # Example
//!
//! ```no_run
//! use longwave::{Config, Station};
//!
//! let mut config = Config::new(Station::Wwvb);
//! config.smooth = true;
//! longwave::play(&config).expect("audio output failed");
//! ```
//!
//! Hold the clock near the speaker and have it search for a signal; a
//! sync typically takes two to five minutes of clean reception.

pub mod audio;
pub mod backend;
pub mod config;
pub mod datetime;
pub mod generator;
#[cfg(feature = "cpal")]
pub mod io;
mod math;
pub mod oscillator;
pub mod station;

pub use crate::audio::SampleFormat;
pub use crate::backend::{Backend, BackendError, Driver};
pub use crate::config::{Config, ConfigError, SampleRate, TimeBase};
pub use crate::generator::{SignalGenerator, StatusEvent};
#[cfg(feature = "cpal")]
pub use crate::io::play;
pub use crate::oscillator::Oscillator;
pub use crate::station::Station;
