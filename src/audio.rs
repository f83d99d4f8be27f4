//! Sample formats and output buffer conversion.
//!
//! The generator produces 1-channel `f64` samples in [-1.0, 1.0]; sinks
//! consume interleaved PCM in one of 24 formats. Conversion always passes
//! through a 16-bit quantization step, deliberately: the quantization
//! error adds a little wideband energy around the subharmonic, which only
//! helps the receivers this crate exists for.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// PCM sample formats, named after their ALSA equivalents.
///
/// Variants without an endianness suffix use the CPU byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    S16,
    S16Le,
    S16Be,
    S24,
    S24Le,
    S24Be,
    S32,
    S32Le,
    S32Be,
    U16,
    U16Le,
    U16Be,
    U24,
    U24Le,
    U24Be,
    U32,
    U32Le,
    U32Be,
    Float,
    FloatLe,
    FloatBe,
    Float64,
    Float64Le,
    Float64Be,
}

impl SampleFormat {
    /// Every recognized format, in display order.
    pub const ALL: [SampleFormat; 24] = [
        SampleFormat::S16,
        SampleFormat::S16Le,
        SampleFormat::S16Be,
        SampleFormat::S24,
        SampleFormat::S24Le,
        SampleFormat::S24Be,
        SampleFormat::S32,
        SampleFormat::S32Le,
        SampleFormat::S32Be,
        SampleFormat::U16,
        SampleFormat::U16Le,
        SampleFormat::U16Be,
        SampleFormat::U24,
        SampleFormat::U24Le,
        SampleFormat::U24Be,
        SampleFormat::U32,
        SampleFormat::U32Le,
        SampleFormat::U32Be,
        SampleFormat::Float,
        SampleFormat::FloatLe,
        SampleFormat::FloatBe,
        SampleFormat::Float64,
        SampleFormat::Float64Le,
        SampleFormat::Float64Be,
    ];

    /// Whether the format stores floating-point samples.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            SampleFormat::Float
                | SampleFormat::FloatLe
                | SampleFormat::FloatBe
                | SampleFormat::Float64
                | SampleFormat::Float64Le
                | SampleFormat::Float64Be
        )
    }

    /// Whether the format stores signed integer samples.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            SampleFormat::S16
                | SampleFormat::S16Le
                | SampleFormat::S16Be
                | SampleFormat::S24
                | SampleFormat::S24Le
                | SampleFormat::S24Be
                | SampleFormat::S32
                | SampleFormat::S32Le
                | SampleFormat::S32Be
        )
    }

    /// Whether samples are stored little-endian. Formats without an
    /// explicit endianness resolve to the CPU byte order.
    pub fn is_little_endian(self) -> bool {
        match self {
            SampleFormat::S16Le
            | SampleFormat::S24Le
            | SampleFormat::S32Le
            | SampleFormat::U16Le
            | SampleFormat::U24Le
            | SampleFormat::U32Le
            | SampleFormat::FloatLe
            | SampleFormat::Float64Le => true,
            SampleFormat::S16Be
            | SampleFormat::S24Be
            | SampleFormat::S32Be
            | SampleFormat::U16Be
            | SampleFormat::U24Be
            | SampleFormat::U32Be
            | SampleFormat::FloatBe
            | SampleFormat::Float64Be => false,
            _ => cfg!(target_endian = "little"),
        }
    }

    /// Significant sample width in bytes.
    pub fn width(self) -> usize {
        match self {
            SampleFormat::S16
            | SampleFormat::S16Le
            | SampleFormat::S16Be
            | SampleFormat::U16
            | SampleFormat::U16Le
            | SampleFormat::U16Be => 2,
            SampleFormat::S24
            | SampleFormat::S24Le
            | SampleFormat::S24Be
            | SampleFormat::U24
            | SampleFormat::U24Le
            | SampleFormat::U24Be => 3,
            SampleFormat::Float64 | SampleFormat::Float64Le | SampleFormat::Float64Be => 8,
            _ => 4,
        }
    }

    /// Stored sample width in bytes. 24-bit formats occupy four bytes.
    pub fn phys_width(self) -> usize {
        match self {
            SampleFormat::S16
            | SampleFormat::S16Le
            | SampleFormat::S16Be
            | SampleFormat::U16
            | SampleFormat::U16Le
            | SampleFormat::U16Be => 2,
            SampleFormat::Float64 | SampleFormat::Float64Le | SampleFormat::Float64Be => 8,
            _ => 4,
        }
    }

    fn name(self) -> &'static str {
        match self {
            SampleFormat::S16 => "S16",
            SampleFormat::S16Le => "S16_LE",
            SampleFormat::S16Be => "S16_BE",
            SampleFormat::S24 => "S24",
            SampleFormat::S24Le => "S24_LE",
            SampleFormat::S24Be => "S24_BE",
            SampleFormat::S32 => "S32",
            SampleFormat::S32Le => "S32_LE",
            SampleFormat::S32Be => "S32_BE",
            SampleFormat::U16 => "U16",
            SampleFormat::U16Le => "U16_LE",
            SampleFormat::U16Be => "U16_BE",
            SampleFormat::U24 => "U24",
            SampleFormat::U24Le => "U24_LE",
            SampleFormat::U24Be => "U24_BE",
            SampleFormat::U32 => "U32",
            SampleFormat::U32Le => "U32_LE",
            SampleFormat::U32Be => "U32_BE",
            SampleFormat::Float => "FLOAT",
            SampleFormat::FloatLe => "FLOAT_LE",
            SampleFormat::FloatBe => "FLOAT_BE",
            SampleFormat::Float64 => "FLOAT64",
            SampleFormat::Float64Le => "FLOAT64_LE",
            SampleFormat::Float64Be => "FLOAT64_BE",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SampleFormat::ALL
            .iter()
            .find(|format| s.eq_ignore_ascii_case(format.name()))
            .copied()
            .ok_or_else(|| ConfigError::UnknownFormat(s.to_string()))
    }
}

/// Fill an interleaved output buffer from generated samples.
///
/// Every channel of a frame receives the same sample (the broadcast is
/// mono). `out` must hold at least `samples.len()` frames; any excess is
/// left untouched.
pub fn fill_buffer(format: SampleFormat, channels: u16, samples: &[f64], out: &mut [u8]) {
    let is_float = format.is_float();
    let is_signed = format.is_signed();
    let is_le = format.is_little_endian();
    let width = format.width();
    let phys_width = format.phys_width();
    let frame_bytes = phys_width * usize::from(channels);
    if channels == 0 {
        return;
    }

    for (frame, &sample) in out.chunks_exact_mut(frame_bytes).zip(samples) {
        // Quantize to 16 bits first; see the module docs.
        let quant: i64 = if is_float {
            (sample * 32768.0) as i64 // [-32768, 32768]
        } else {
            let wide = ((1.0 + sample) * 65535.0 * 0.5) as i64; // [0, 65535]
            if is_signed {
                wide - 32768 // [-32768, 32767]
            } else {
                wide
            }
        };

        // Re-widen into the physical container for the target format.
        let mut bytes = [0u8; 8];
        match phys_width {
            2 => {
                let word = quant as u16;
                bytes[..2].copy_from_slice(&if is_le {
                    word.to_le_bytes()
                } else {
                    word.to_be_bytes()
                });
            }
            4 => {
                let word = if is_float {
                    (quant as f32 / 32768.0).to_bits()
                } else if width == 4 {
                    (quant as u32) << 16
                } else {
                    // 24 significant bits in a 4-byte container.
                    (quant as u32) << 8
                };
                bytes[..4].copy_from_slice(&if is_le {
                    word.to_le_bytes()
                } else {
                    word.to_be_bytes()
                });
            }
            _ => {
                let word = (quant as f64 / 32768.0).to_bits();
                bytes.copy_from_slice(&if is_le {
                    word.to_le_bytes()
                } else {
                    word.to_be_bytes()
                });
            }
        }

        for slot in frame.chunks_exact_mut(phys_width) {
            slot.copy_from_slice(&bytes[..phys_width]);
        }
    }
}
