use crate::audio::{
    CpalOutputDevice, DecodedMemorySource, KeyboardTone, RawMemorySource, SampleSource,
    TerminalControl, ToneGenerator,
};
use crate::audio::keyboard::TONE_HELP;
use crate::config::Config;
use crate::engine::{EndReason, EngineError, SessionReport, StreamingEngine};
use crate::loader;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

/// Exit status for a load or config failure.
pub const EXIT_SETUP_FAILURE: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackRequest {
    Tone {
        frequency: f64,
        step: f64,
        amplitude: f64,
    },
    Raw {
        path: PathBuf,
        channels: u16,
        sample_rate: u32,
    },
    Decoded {
        path: PathBuf,
    },
}

/// Play one source on the default output device until it finishes.
pub fn run_playback(request: PlaybackRequest, config: &Config) -> Result<SessionReport> {
    let mut source = build_source(request)?;

    let device = CpalOutputDevice::open_default(config.playback.requested_buffer())
        .map_err(EngineError::Negotiation)?;
    let mut engine = StreamingEngine::new(device);

    let report = engine.run(source.as_mut())?;
    if report.ended_by == EndReason::UnsupportedFormat {
        warn!("Output device does not accept float samples; nothing was played");
    }
    Ok(report)
}

/// Loads everything up front so no I/O happens once playback starts.
pub fn build_source(request: PlaybackRequest) -> Result<Box<dyn SampleSource>> {
    match request {
        PlaybackRequest::Tone {
            frequency,
            step,
            amplitude,
        } => {
            let tone = ToneGenerator::new(frequency)
                .with_step(step)
                .with_amplitude(amplitude);
            info!("Starting tone at {} Hz", tone.frequency());

            match TerminalControl::new() {
                Ok(control) => {
                    control.print_line(TONE_HELP);
                    Ok(Box::new(KeyboardTone::new(tone, control)))
                }
                Err(e) => {
                    warn!("Keyboard control unavailable ({e:#}), tone plays until interrupted");
                    Ok(Box::new(tone))
                }
            }
        }
        PlaybackRequest::Raw {
            path,
            channels,
            sample_rate,
        } => {
            let samples = loader::load_raw_f32(&path)?;
            Ok(Box::new(
                RawMemorySource::raw(samples, channels).with_sample_rate(sample_rate),
            ))
        }
        PlaybackRequest::Decoded { path } => {
            let audio = loader::decode_file(&path)?;
            Ok(Box::new(DecodedMemorySource::decoded(
                audio.samples,
                audio.channels,
                audio.sample_rate,
            )))
        }
    }
}

/// Map a failed run to the process exit status.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<EngineError>()
        .map(EngineError::exit_code)
        .unwrap_or(EXIT_SETUP_FAILURE)
}
