//! Sine tone synthesis.

use std::f64::consts::TAU;

use tracing::debug;

use super::sample_source::{FillOutcome, SampleSource};

pub const MIN_FREQUENCY_HZ: f64 = 10.0;
pub const MAX_FREQUENCY_HZ: f64 = 8000.0;
pub const DEFAULT_FREQUENCY_HZ: f64 = 4000.0;
pub const DEFAULT_STEP_HZ: f64 = 100.0;
pub const DEFAULT_AMPLITUDE: f64 = 0.1;

/// Sine generator with continuous phase across fills.
///
/// The same sample is written to every output channel. The generator never
/// runs dry by itself; it goes silent only after [`ToneGenerator::request_stop`].
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    frequency: f64,
    step: f64,
    amplitude: f64,
    phase: f64,
    stopped: bool,
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_HZ)
    }
}

impl ToneGenerator {
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency: clamp_frequency(frequency),
            step: DEFAULT_STEP_HZ,
            amplitude: DEFAULT_AMPLITUDE,
            phase: 0.0,
            stopped: false,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step.abs();
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = clamp_frequency(frequency);
        debug!("Tone frequency set to {} Hz", self.frequency);
    }

    pub fn increase_frequency(&mut self) {
        self.set_frequency(self.frequency + self.step);
    }

    pub fn decrease_frequency(&mut self) {
        self.set_frequency(self.frequency - self.step);
    }

    /// Every fill after this reports silence.
    pub fn request_stop(&mut self) {
        if !self.stopped {
            debug!("Tone stop requested");
        }
        self.stopped = true;
    }
}

fn clamp_frequency(frequency: f64) -> f64 {
    if frequency.is_nan() {
        return MIN_FREQUENCY_HZ;
    }
    frequency.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
}

impl SampleSource for ToneGenerator {
    fn fill(
        &mut self,
        dest: &mut [f32],
        frames: usize,
        channels: u16,
        sample_rate: u32,
    ) -> FillOutcome {
        if self.stopped || channels == 0 || sample_rate == 0 {
            return FillOutcome::silent();
        }

        let channels = channels as usize;
        let frames = frames.min(dest.len() / channels);
        let phase_inc = TAU * self.frequency / sample_rate as f64;

        for frame in dest.chunks_exact_mut(channels).take(frames) {
            let x = (self.amplitude * self.phase.sin()) as f32;
            frame.fill(x);
            self.phase += phase_inc;
        }

        // Keep phase in [0, 2pi) so it never loses precision.
        self.phase = self.phase.rem_euclid(TAU);
        if self.phase >= TAU {
            self.phase = 0.0;
        }

        FillOutcome::more(frames)
    }

    fn name(&self) -> &'static str {
        "tone"
    }
}
