//! Pull-model streaming engine.
//!
//! One session runs Negotiating -> Priming -> Running -> Draining -> Stopped.
//! Any device failure jumps to Failed and ends the session.

mod error;

pub use error::EngineError;

use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::audio::{AudioFormat, AudioOutputDevice, DeviceError, FillOutcome, SampleSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Negotiating,
    Priming,
    Running,
    Draining,
    Stopped,
    Failed,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Negotiating => "negotiating",
            EngineState::Priming => "priming",
            EngineState::Running => "running",
            EngineState::Draining => "draining",
            EngineState::Stopped => "stopped",
            EngineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Stopped | EngineState::Failed)
    }
}

/// Why a session finished normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    SourceExhausted,
    UnsupportedFormat,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub format: AudioFormat,
    pub capacity_frames: u32,
    /// Running ticks, including skipped ones.
    pub ticks: u64,
    /// Ticks where the buffer was full and nothing was submitted.
    pub skipped_ticks: u64,
    /// Audible frames handed to the device.
    pub frames_submitted: u64,
    pub silent_submissions: u64,
    pub ended_by: EndReason,
}

impl SessionReport {
    fn new(format: AudioFormat, capacity_frames: u32) -> Self {
        let ended_by = if format.is_supported() {
            EndReason::SourceExhausted
        } else {
            EndReason::UnsupportedFormat
        };
        Self {
            format,
            capacity_frames,
            ticks: 0,
            skipped_ticks: 0,
            frames_submitted: 0,
            silent_submissions: 0,
            ended_by,
        }
    }
}

/// The engine's only suspension point.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Half the nominal duration of a `capacity_frames` buffer at `sample_rate`.
pub fn poll_interval(capacity_frames: u32, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(capacity_frames as f64 / sample_rate as f64 / 2.0)
}

pub struct StreamingEngine<D: AudioOutputDevice, P: Sleeper = ThreadSleeper> {
    device: D,
    sleeper: P,
    state: EngineState,
    started: bool,
}

impl<D: AudioOutputDevice> StreamingEngine<D, ThreadSleeper> {
    pub fn new(device: D) -> Self {
        Self::with_sleeper(device, ThreadSleeper)
    }
}

impl<D: AudioOutputDevice, P: Sleeper> StreamingEngine<D, P> {
    pub fn with_sleeper(device: D, sleeper: P) -> Self {
        Self {
            device,
            sleeper,
            state: EngineState::Idle,
            started: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn sleeper(&self) -> &P {
        &self.sleeper
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Play `source` until it reports silence, then drain and stop.
    pub fn run<S>(&mut self, source: &mut S) -> Result<SessionReport, EngineError>
    where
        S: SampleSource + ?Sized,
    {
        self.started = false;
        self.transition(EngineState::Negotiating);

        let (format, capacity) = match self.negotiate() {
            Ok(negotiated) => negotiated,
            Err(e) => {
                self.transition(EngineState::Failed);
                return Err(EngineError::Negotiation(e));
            }
        };

        let mut report = SessionReport::new(format, capacity);
        if report.ended_by == EndReason::UnsupportedFormat {
            warn!(
                "Mix format {} is not 32-bit float, playing silence",
                report.format
            );
        }

        match self.stream(source, &mut report) {
            Ok(()) => {
                info!(
                    "Playback of {} source finished: {} frames in {} ticks ({} skipped)",
                    source.name(),
                    report.frames_submitted,
                    report.ticks,
                    report.skipped_ticks
                );
                Ok(report)
            }
            Err(e) => {
                self.fail();
                Err(EngineError::Transport(e))
            }
        }
    }

    fn negotiate(&mut self) -> Result<(AudioFormat, u32), DeviceError> {
        let format = self.device.negotiate_format()?;
        let capacity = self.device.buffer_capacity_frames()?;

        if capacity == 0 || format.sample_rate == 0 || format.channels == 0 {
            return Err(DeviceError::backend(
                "GetBufferSize",
                format!("unusable buffer of {capacity} frames at {format}"),
            ));
        }

        debug!("Negotiated {} with {} frame buffer", format, capacity);
        Ok((format, capacity))
    }

    fn stream<S>(&mut self, source: &mut S, report: &mut SessionReport) -> Result<(), DeviceError>
    where
        S: SampleSource + ?Sized,
    {
        let capacity = report.capacity_frames;
        let interval = poll_interval(capacity, report.format.sample_rate);

        self.transition(EngineState::Priming);
        let mut finished = self.submit(source, capacity, report)?;

        self.device.start()?;
        self.started = true;

        if !finished {
            self.transition(EngineState::Running);
        }
        while !finished {
            self.sleeper.sleep(interval);
            report.ticks += 1;

            let occupancy = self.device.current_occupancy_frames()?;
            let free = capacity.saturating_sub(occupancy);
            if free == 0 {
                report.skipped_ticks += 1;
                trace!("Buffer full, skipping tick {}", report.ticks);
                continue;
            }

            trace!("Tick {}: {} frames free", report.ticks, free);
            finished = self.submit(source, free, report)?;
        }

        self.transition(EngineState::Draining);
        self.sleeper.sleep(interval);

        self.started = false;
        self.device.stop()?;
        self.transition(EngineState::Stopped);
        Ok(())
    }

    /// Acquire, fill and release one region. Returns true once a silent region
    /// has been submitted.
    ///
    /// A final write that still carries audio does not end the session: the
    /// next tick submits silence behind it, so the drain interval only has to
    /// cover what that tick left queued.
    fn submit<S>(
        &mut self,
        source: &mut S,
        frames: u32,
        report: &mut SessionReport,
    ) -> Result<bool, DeviceError>
    where
        S: SampleSource + ?Sized,
    {
        let format = &report.format;
        let mut region = self.device.acquire_region(frames)?;

        let outcome = if format.is_supported() {
            source.fill(
                region.samples_mut(),
                frames as usize,
                format.channels,
                format.sample_rate,
            )
        } else {
            FillOutcome::silent()
        };

        let written = outcome.frames_written.min(frames as usize);
        if written < frames as usize {
            if !outcome.exhausted {
                warn!(
                    "{} source wrote {} of {} frames without finishing",
                    source.name(),
                    written,
                    frames
                );
            }
            region.silence_from(written);
        }

        let silent = outcome.exhausted && written == 0;
        self.device.release_region(region, silent)?;

        if silent {
            report.silent_submissions += 1;
        } else {
            report.frames_submitted += written as u64;
        }

        if outcome.exhausted && !silent {
            debug!(
                "{} source ended after a {} frame write, playing it out",
                source.name(),
                written
            );
        }

        Ok(silent)
    }

    fn fail(&mut self) {
        self.transition(EngineState::Failed);
        if self.started {
            self.started = false;
            if let Err(e) = self.device.stop() {
                warn!("Failed to stop output after error: {}", e);
            }
        }
    }

    fn transition(&mut self, next: EngineState) {
        debug!("Engine {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
    }
}
