//! Sample source abstraction for the streaming engine.

/// Result of a single fill request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Frames written from the start of the destination.
    pub frames_written: usize,
    /// The source has nothing more to give after this call.
    pub exhausted: bool,
}

impl FillOutcome {
    pub fn more(frames_written: usize) -> Self {
        Self {
            frames_written,
            exhausted: false,
        }
    }

    pub fn last(frames_written: usize) -> Self {
        Self {
            frames_written,
            exhausted: true,
        }
    }

    pub fn silent() -> Self {
        Self::last(0)
    }

    /// No audible data at all: the region should be submitted as silence.
    pub fn is_silent(&self) -> bool {
        self.exhausted && self.frames_written == 0
    }
}

/// Something that produces interleaved `f32` samples on demand.
///
/// A source either writes all `frames` frames, or writes none and reports
/// exhaustion. Sequential memory sources may also write the frames they have
/// left and report exhaustion in the same call.
pub trait SampleSource {
    /// Fill `dest` with `frames` frames of `channels` interleaved samples.
    fn fill(
        &mut self,
        dest: &mut [f32],
        frames: usize,
        channels: u16,
        sample_rate: u32,
    ) -> FillOutcome;

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn fill(
        &mut self,
        dest: &mut [f32],
        frames: usize,
        channels: u16,
        sample_rate: u32,
    ) -> FillOutcome {
        (**self).fill(dest, frames, channels, sample_rate)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
