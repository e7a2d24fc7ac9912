//! Sequential playback of pre-loaded interleaved PCM.

use tracing::{debug, warn};

use super::sample_source::{FillOutcome, SampleSource};

/// A PCM sample type that can be normalized to `f32` in [-1, 1].
pub trait PcmSample: Copy {
    fn to_f32(self) -> f32;
}

impl PcmSample for f32 {
    fn to_f32(self) -> f32 {
        self
    }
}

impl PcmSample for i16 {
    fn to_f32(self) -> f32 {
        self as f32 / 32768.0
    }
}

/// Source backed by a float buffer read straight from disk.
pub type RawMemorySource = MemorySource<f32>;

/// Source backed by 16-bit PCM produced by a decoder.
pub type DecodedMemorySource = MemorySource<i16>;

/// Reads frames from an in-memory buffer from start to end, once.
#[derive(Debug, Clone)]
pub struct MemorySource<T: PcmSample> {
    samples: Vec<T>,
    channels: u16,
    sample_rate: Option<u32>,
    cursor: usize,
    total_frames: usize,
    label: &'static str,
}

impl<T: PcmSample> MemorySource<T> {
    /// `samples` must be interleaved with `channels` channels. A trailing
    /// partial frame is never played.
    pub fn new(samples: Vec<T>, channels: u16) -> Self {
        let channels = channels.max(1);
        let total_frames = samples.len() / channels as usize;
        if samples.len() % channels as usize != 0 {
            warn!(
                "Dropping {} trailing samples that do not form a full frame",
                samples.len() % channels as usize
            );
        }

        Self {
            samples,
            channels,
            sample_rate: None,
            cursor: 0,
            total_frames,
            label: "memory",
        }
    }

    /// Records the rate the data was produced at. Playback never resamples.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn remaining_frames(&self) -> usize {
        self.total_frames - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.total_frames
    }
}

impl RawMemorySource {
    pub fn raw(samples: Vec<f32>, channels: u16) -> Self {
        Self::new(samples, channels).with_label("raw")
    }
}

impl DecodedMemorySource {
    pub fn decoded(samples: Vec<i16>, channels: u16, sample_rate: u32) -> Self {
        Self::new(samples, channels)
            .with_sample_rate(sample_rate)
            .with_label("decoded")
    }
}

impl<T: PcmSample> SampleSource for MemorySource<T> {
    fn fill(
        &mut self,
        dest: &mut [f32],
        frames: usize,
        channels: u16,
        sample_rate: u32,
    ) -> FillOutcome {
        if self.is_exhausted() || channels == 0 {
            return FillOutcome::silent();
        }

        if self.cursor == 0 {
            if let Some(rate) = self.sample_rate.filter(|rate| *rate != sample_rate) {
                warn!(
                    "Source is {} Hz but device runs at {} Hz; playing without resampling",
                    rate, sample_rate
                );
            }
        }

        let src_channels = self.channels as usize;
        let dest_channels = channels as usize;
        let count = frames
            .min(self.remaining_frames())
            .min(dest.len() / dest_channels);

        let start = self.cursor * src_channels;
        let end = start + count * src_channels;
        let src = &self.samples[start..end];

        for (src_frame, dest_frame) in src
            .chunks_exact(src_channels)
            .zip(dest.chunks_exact_mut(dest_channels))
        {
            map_frame(src_frame, dest_frame);
        }

        self.cursor += count;

        if self.is_exhausted() {
            debug!(
                "{} source reached end after {} frames",
                self.label, self.total_frames
            );
            FillOutcome::last(count)
        } else {
            FillOutcome::more(count)
        }
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Map one source frame onto one destination frame.
///
/// Matching layouts copy straight through. A mono source is duplicated to
/// every destination channel and a mono destination gets the average of the
/// source channels. Any other mismatch wraps: destination channel `d` takes
/// source channel `d % source_channels`.
pub fn map_frame<T: PcmSample>(src: &[T], dest: &mut [f32]) {
    if src.is_empty() || dest.is_empty() {
        return;
    }

    if src.len() == dest.len() {
        for (d, s) in dest.iter_mut().zip(src.iter()) {
            *d = s.to_f32();
        }
    } else if src.len() == 1 {
        dest.fill(src[0].to_f32());
    } else if dest.len() == 1 {
        let sum: f32 = src.iter().map(|s| s.to_f32()).sum();
        dest[0] = sum / src.len() as f32;
    } else {
        for (d, out) in dest.iter_mut().enumerate() {
            *out = src[d % src.len()].to_f32();
        }
    }
}
