//! Mix format reported by the output device.

use std::fmt;

/// Sample representation of the device mix format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleFormat {
    F32,
    I16,
    U16,
    Other(String),
}

impl SampleFormat {
    pub fn as_str(&self) -> &str {
        match self {
            SampleFormat::F32 => "f32",
            SampleFormat::I16 => "i16",
            SampleFormat::U16 => "u16",
            SampleFormat::Other(name) => name,
        }
    }
}

impl From<cpal::SampleFormat> for SampleFormat {
    fn from(format: cpal::SampleFormat) -> Self {
        match format {
            cpal::SampleFormat::F32 => SampleFormat::F32,
            cpal::SampleFormat::I16 => SampleFormat::I16,
            cpal::SampleFormat::U16 => SampleFormat::U16,
            other => SampleFormat::Other(other.to_string()),
        }
    }
}

/// Negotiated once per session and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /// Only 32-bit float mix formats can be written by the engine.
    pub fn is_supported(&self) -> bool {
        self.sample_format == SampleFormat::F32 && self.sample_rate > 0 && self.channels > 0
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}",
            self.sample_rate,
            self.channels,
            self.sample_format.as_str()
        )
    }
}
