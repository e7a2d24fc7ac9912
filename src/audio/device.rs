//! Output device boundary.
//!
//! The engine talks to the device only through [`AudioOutputDevice`]. A device
//! hands out one writable [`BufferRegion`] at a time; releasing it consumes the
//! region, so nothing can keep writing into device memory afterwards.

use thiserror::Error;

use super::format::AudioFormat;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("Device format has not been negotiated")]
    NotNegotiated,

    #[error("Requested {requested} frames but only {free} are free")]
    RegionTooLarge { requested: u32, free: u32 },

    #[error("A buffer region is already acquired")]
    RegionOutstanding,

    #[error("Released region does not match the acquired one")]
    RegionMismatch,

    #[error("Device sample queue is poisoned")]
    QueuePoisoned,
}

impl DeviceError {
    pub fn backend(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation,
            message: err.to_string(),
        }
    }
}

/// A writable span of `frames` interleaved frames.
///
/// Starts zeroed, so any slot the source does not write is silence.
#[derive(Debug)]
pub struct BufferRegion {
    frames: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl BufferRegion {
    pub fn new(frames: u32, channels: u16) -> Self {
        Self {
            frames,
            channels,
            samples: vec![0.0; frames as usize * channels as usize],
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Zero everything past the first `frames` frames.
    pub fn silence_from(&mut self, frames: usize) {
        let start = (frames * self.channels as usize).min(self.samples.len());
        self.samples[start..].fill(0.0);
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Shared-mode render endpoint.
pub trait AudioOutputDevice {
    /// Returns the device mix format. Repeated calls return the same value.
    fn negotiate_format(&mut self) -> Result<AudioFormat, DeviceError>;

    /// Total buffer size in frames.
    fn buffer_capacity_frames(&mut self) -> Result<u32, DeviceError>;

    /// Frames queued and not yet played.
    fn current_occupancy_frames(&mut self) -> Result<u32, DeviceError>;

    fn acquire_region(&mut self, frames: u32) -> Result<BufferRegion, DeviceError>;

    /// Submits the region. With `silent` set the contents are ignored and
    /// silence of the same length is queued instead.
    fn release_region(&mut self, region: BufferRegion, silent: bool) -> Result<(), DeviceError>;

    fn start(&mut self) -> Result<(), DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_starts_silent() {
        let region = BufferRegion::new(4, 2);
        assert_eq!(region.samples().len(), 8);
        assert!(region.samples().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_silence_from_clears_tail() {
        let mut region = BufferRegion::new(4, 2);
        region.samples_mut().fill(0.5);
        region.silence_from(3);
        assert_eq!(&region.samples()[..6], &[0.5; 6]);
        assert_eq!(&region.samples()[6..], &[0.0, 0.0]);
    }

    #[test]
    fn test_silence_from_past_end_is_noop() {
        let mut region = BufferRegion::new(2, 1);
        region.samples_mut().fill(0.25);
        region.silence_from(10);
        assert_eq!(region.samples(), &[0.25, 0.25]);
    }

    #[test]
    fn test_backend_error_message() {
        let err = DeviceError::backend("Start", "device busy");
        assert_eq!(err.to_string(), "Start failed: device busy");
    }
}
