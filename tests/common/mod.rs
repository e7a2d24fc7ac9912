//! Scripted output device and sleeper shared by the integration tests.

#![allow(dead_code)]

use pullstream::audio::{
    AudioFormat, AudioOutputDevice, BufferRegion, DeviceError, FillOutcome, SampleFormat,
    SampleSource,
};
use pullstream::engine::Sleeper;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Negotiate,
    Capacity,
    Occupancy,
    Acquire,
    Release,
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Negotiate,
    Capacity,
    Occupancy(u32),
    Acquire { frames: u32, free: u32 },
    Release { frames: u32, silent: bool },
    Start,
    Stop,
}

/// In-memory device that "plays" a fixed number of frames per occupancy query.
pub struct MockDevice {
    pub format: AudioFormat,
    pub capacity: u32,
    pub queued: u32,
    pub drain_per_query: u32,
    /// Per-query drain amounts used before falling back to `drain_per_query`.
    pub drain_script: VecDeque<u32>,
    pub calls: Vec<Call>,
    /// Everything handed to the device, silence included.
    pub played: Vec<f32>,
    fail_on: Option<(Op, usize)>,
    counts: HashMap<Op, usize>,
    outstanding: Option<u32>,
}

impl MockDevice {
    pub fn new(sample_rate: u32, channels: u16, capacity: u32) -> Self {
        Self {
            format: AudioFormat::new(sample_rate, channels, SampleFormat::F32),
            capacity,
            queued: 0,
            drain_per_query: capacity / 2,
            drain_script: VecDeque::new(),
            calls: Vec::new(),
            played: Vec::new(),
            fail_on: None,
            counts: HashMap::new(),
            outstanding: None,
        }
    }

    pub fn with_sample_format(mut self, sample_format: SampleFormat) -> Self {
        self.format.sample_format = sample_format;
        self
    }

    pub fn with_drain(mut self, frames: u32) -> Self {
        self.drain_per_query = frames;
        self
    }

    pub fn with_drain_script(mut self, script: &[u32]) -> Self {
        self.drain_script = script.iter().copied().collect();
        self
    }

    /// Fail the `nth` (1-based) call of `op`.
    pub fn failing_on(mut self, op: Op, nth: usize) -> Self {
        self.fail_on = Some((op, nth));
        self
    }

    pub fn count(&self, op: Op) -> usize {
        self.counts.get(&op).copied().unwrap_or(0)
    }

    pub fn releases(&self) -> Vec<(u32, bool)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Release { frames, silent } => Some((*frames, *silent)),
                _ => None,
            })
            .collect()
    }

    pub fn acquires(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Acquire { frames, free } => Some((*frames, *free)),
                _ => None,
            })
            .collect()
    }

    fn enter(&mut self, op: Op) -> Result<(), DeviceError> {
        let count = self.counts.entry(op).or_insert(0);
        *count += 1;
        match self.fail_on {
            Some((fail_op, nth)) if fail_op == op && nth == *count => Err(DeviceError::backend(
                "mock",
                format!("injected {op:?} failure"),
            )),
            _ => Ok(()),
        }
    }
}

impl AudioOutputDevice for MockDevice {
    fn negotiate_format(&mut self) -> Result<AudioFormat, DeviceError> {
        self.enter(Op::Negotiate)?;
        self.calls.push(Call::Negotiate);
        Ok(self.format.clone())
    }

    fn buffer_capacity_frames(&mut self) -> Result<u32, DeviceError> {
        self.enter(Op::Capacity)?;
        self.calls.push(Call::Capacity);
        Ok(self.capacity)
    }

    fn current_occupancy_frames(&mut self) -> Result<u32, DeviceError> {
        self.enter(Op::Occupancy)?;
        let drained = self.drain_script.pop_front().unwrap_or(self.drain_per_query);
        self.queued = self.queued.saturating_sub(drained);
        self.calls.push(Call::Occupancy(self.queued));
        Ok(self.queued)
    }

    fn acquire_region(&mut self, frames: u32) -> Result<BufferRegion, DeviceError> {
        self.enter(Op::Acquire)?;
        let free = self.capacity - self.queued;
        self.calls.push(Call::Acquire { frames, free });
        if self.outstanding.is_some() {
            return Err(DeviceError::RegionOutstanding);
        }
        if frames > free {
            return Err(DeviceError::RegionTooLarge {
                requested: frames,
                free,
            });
        }
        self.outstanding = Some(frames);
        Ok(BufferRegion::new(frames, self.format.channels))
    }

    fn release_region(&mut self, region: BufferRegion, silent: bool) -> Result<(), DeviceError> {
        self.enter(Op::Release)?;
        if self.outstanding.take() != Some(region.frames()) {
            return Err(DeviceError::RegionMismatch);
        }
        self.calls.push(Call::Release {
            frames: region.frames(),
            silent,
        });
        self.queued += region.frames();
        if silent {
            self.played
                .extend(std::iter::repeat(0.0).take(region.samples().len()));
        } else {
            self.played.extend(region.into_samples());
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        self.enter(Op::Start)?;
        self.calls.push(Call::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.enter(Op::Stop)?;
        self.calls.push(Call::Stop);
        Ok(())
    }
}

/// Records requested sleeps instead of blocking.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub sleeps: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }
}

/// Counts fill calls on the wrapped source.
pub struct CountingSource<S> {
    pub inner: S,
    pub fills: usize,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, fills: 0 }
    }
}

impl<S: SampleSource> SampleSource for CountingSource<S> {
    fn fill(
        &mut self,
        dest: &mut [f32],
        frames: usize,
        channels: u16,
        sample_rate: u32,
    ) -> FillOutcome {
        self.fills += 1;
        self.inner.fill(dest, frames, channels, sample_rate)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Playback clock shared by a [`ClockedDevice`] and its [`ClockedSleeper`].
///
/// Queued frames are played only while the engine sleeps, at the device rate.
pub struct Timeline {
    pub sample_rate: u32,
    /// One entry per queued frame: true when the frame carries audio.
    pub queue: VecDeque<bool>,
    pub audible_played: usize,
    /// Audible frames still queued when `stop()` was called.
    pub audible_at_stop: Option<usize>,
}

impl Timeline {
    pub fn shared(sample_rate: u32) -> Rc<RefCell<Timeline>> {
        Rc::new(RefCell::new(Timeline {
            sample_rate,
            queue: VecDeque::new(),
            audible_played: 0,
            audible_at_stop: None,
        }))
    }

    fn advance(&mut self, duration: Duration) {
        let frames = (duration.as_secs_f64() * self.sample_rate as f64).round() as usize;
        for _ in 0..frames {
            match self.queue.pop_front() {
                Some(true) => self.audible_played += 1,
                Some(false) => {}
                None => break,
            }
        }
    }
}

/// Device whose buffer empties in real (simulated) time.
pub struct ClockedDevice {
    timeline: Rc<RefCell<Timeline>>,
    format: AudioFormat,
    capacity: u32,
}

impl ClockedDevice {
    pub fn new(timeline: Rc<RefCell<Timeline>>, channels: u16, capacity: u32) -> Self {
        let sample_rate = timeline.borrow().sample_rate;
        Self {
            timeline,
            format: AudioFormat::new(sample_rate, channels, SampleFormat::F32),
            capacity,
        }
    }

    fn queued(&self) -> u32 {
        self.timeline.borrow().queue.len() as u32
    }
}

impl AudioOutputDevice for ClockedDevice {
    fn negotiate_format(&mut self) -> Result<AudioFormat, DeviceError> {
        Ok(self.format.clone())
    }

    fn buffer_capacity_frames(&mut self) -> Result<u32, DeviceError> {
        Ok(self.capacity)
    }

    fn current_occupancy_frames(&mut self) -> Result<u32, DeviceError> {
        Ok(self.queued())
    }

    fn acquire_region(&mut self, frames: u32) -> Result<BufferRegion, DeviceError> {
        let free = self.capacity - self.queued();
        if frames > free {
            return Err(DeviceError::RegionTooLarge {
                requested: frames,
                free,
            });
        }
        Ok(BufferRegion::new(frames, self.format.channels))
    }

    fn release_region(&mut self, region: BufferRegion, silent: bool) -> Result<(), DeviceError> {
        let channels = region.channels() as usize;
        let mut timeline = self.timeline.borrow_mut();
        for frame in region.samples().chunks_exact(channels) {
            timeline
                .queue
                .push_back(!silent && frame.iter().any(|s| *s != 0.0));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        let mut timeline = self.timeline.borrow_mut();
        let audible = timeline.queue.iter().filter(|audible| **audible).count();
        timeline.audible_at_stop = Some(audible);
        Ok(())
    }
}

/// Advances the shared timeline instead of blocking.
pub struct ClockedSleeper {
    timeline: Rc<RefCell<Timeline>>,
}

impl ClockedSleeper {
    pub fn new(timeline: Rc<RefCell<Timeline>>) -> Self {
        Self { timeline }
    }
}

impl Sleeper for ClockedSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.timeline.borrow_mut().advance(duration);
    }
}
