//! Shared-mode output on top of cpal.
//!
//! cpal is callback driven, so the buffer contract is emulated: released
//! regions are appended to a sample queue that the stream callback drains.
//! Occupancy is simply the queue length in frames.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

use super::device::{AudioOutputDevice, BufferRegion, DeviceError};
use super::format::AudioFormat;

type SharedQueue = Arc<Mutex<VecDeque<f32>>>;

pub struct CpalOutputDevice {
    device: cpal::Device,
    requested_buffer: Duration,
    format: Option<AudioFormat>,
    capacity_frames: u32,
    queue: SharedQueue,
    stream: Option<cpal::Stream>,
    outstanding: Option<u32>,
}

impl CpalOutputDevice {
    /// Open the default output device of the default host.
    ///
    /// # Arguments
    /// * `requested_buffer` - Desired length of the device buffer
    pub fn open_default(requested_buffer: Duration) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoOutputDevice)?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        Ok(Self {
            device,
            requested_buffer,
            format: None,
            capacity_frames: 0,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            stream: None,
            outstanding: None,
        })
    }

    fn format(&self) -> Result<&AudioFormat, DeviceError> {
        self.format.as_ref().ok_or(DeviceError::NotNegotiated)
    }

    fn stream(&self) -> Result<&cpal::Stream, DeviceError> {
        self.stream.as_ref().ok_or(DeviceError::NotNegotiated)
    }

    fn queued_frames(&self) -> Result<u32, DeviceError> {
        let channels = self.format()?.channels as usize;
        let queue = self.queue.lock().map_err(|_| DeviceError::QueuePoisoned)?;
        Ok((queue.len() / channels) as u32)
    }

    fn open_stream(
        &self,
        config: &cpal::StreamConfig,
        sample_format: cpal::SampleFormat,
    ) -> Result<cpal::Stream, DeviceError> {
        let device = &self.device;
        let queue = self.queue.clone();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(device, config, queue),
            cpal::SampleFormat::F64 => build_stream::<f64>(device, config, queue),
            cpal::SampleFormat::I8 => build_stream::<i8>(device, config, queue),
            cpal::SampleFormat::I16 => build_stream::<i16>(device, config, queue),
            cpal::SampleFormat::I32 => build_stream::<i32>(device, config, queue),
            cpal::SampleFormat::I64 => build_stream::<i64>(device, config, queue),
            cpal::SampleFormat::U8 => build_stream::<u8>(device, config, queue),
            cpal::SampleFormat::U16 => build_stream::<u16>(device, config, queue),
            cpal::SampleFormat::U32 => build_stream::<u32>(device, config, queue),
            cpal::SampleFormat::U64 => build_stream::<u64>(device, config, queue),
            other => {
                return Err(DeviceError::backend(
                    "Initialize",
                    format!("no stream support for {other}"),
                ))
            }
        }
        .map_err(|e| DeviceError::backend("Initialize", e))?;

        // Some hosts start streams on creation; keep it idle until start().
        if let Err(e) = stream.pause() {
            debug!("Stream could not be paused after creation: {}", e);
        }

        Ok(stream)
    }
}

/// Output stream that drains `queue`, writing equilibrium on underrun.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: SharedQueue,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let err_fn = |err| error!("Output stream error: {}", err);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| match queue.lock() {
            Ok(mut queue) => {
                for slot in data.iter_mut() {
                    *slot = match queue.pop_front() {
                        Some(sample) => T::from_sample(sample),
                        None => T::EQUILIBRIUM,
                    };
                }
            }
            Err(_) => data.fill(T::EQUILIBRIUM),
        },
        err_fn,
        None,
    )
}

impl AudioOutputDevice for CpalOutputDevice {
    fn negotiate_format(&mut self) -> Result<AudioFormat, DeviceError> {
        if let Some(format) = &self.format {
            return Ok(format.clone());
        }

        let supported = self
            .device
            .default_output_config()
            .map_err(|e| DeviceError::backend("GetMixFormat", e))?;

        let sample_format = supported.sample_format();
        let config = supported.config();
        let format = AudioFormat::new(
            config.sample_rate.0,
            config.channels,
            sample_format.into(),
        );
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(DeviceError::backend(
                "GetMixFormat",
                format!("degenerate mix format {format}"),
            ));
        }

        let stream = self.open_stream(&config, sample_format)?;

        let frames = self.requested_buffer.as_secs_f64() * format.sample_rate as f64;
        self.capacity_frames = (frames.round() as u32).max(1);
        self.stream = Some(stream);

        info!(
            "Mix format {} with {} frame buffer",
            format, self.capacity_frames
        );
        self.format = Some(format.clone());
        Ok(format)
    }

    fn buffer_capacity_frames(&mut self) -> Result<u32, DeviceError> {
        self.format()?;
        Ok(self.capacity_frames)
    }

    fn current_occupancy_frames(&mut self) -> Result<u32, DeviceError> {
        self.queued_frames()
    }

    fn acquire_region(&mut self, frames: u32) -> Result<BufferRegion, DeviceError> {
        if self.outstanding.is_some() {
            return Err(DeviceError::RegionOutstanding);
        }

        let channels = self.format()?.channels;
        let free = self.capacity_frames.saturating_sub(self.queued_frames()?);
        if frames > free {
            return Err(DeviceError::RegionTooLarge {
                requested: frames,
                free,
            });
        }

        self.outstanding = Some(frames);
        Ok(BufferRegion::new(frames, channels))
    }

    fn release_region(&mut self, region: BufferRegion, silent: bool) -> Result<(), DeviceError> {
        let channels = self.format()?.channels;
        if self.outstanding != Some(region.frames()) || region.channels() != channels {
            return Err(DeviceError::RegionMismatch);
        }
        self.outstanding = None;

        let mut queue = self.queue.lock().map_err(|_| DeviceError::QueuePoisoned)?;
        if silent {
            let len = region.samples().len();
            queue.extend(std::iter::repeat(0.0f32).take(len));
        } else {
            queue.extend(region.into_samples());
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream()?
            .play()
            .map_err(|e| DeviceError::backend("Start", e))?;
        debug!("Output stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.stream()?
            .pause()
            .map_err(|e| DeviceError::backend("Stop", e))?;
        debug!("Output stream stopped");
        Ok(())
    }
}

impl Drop for CpalOutputDevice {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("Releasing output stream");
            drop(stream);
        }
    }
}
