use crate::app::PlaybackRequest;
use crate::config::Config;
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pullstream")]
#[command(about = "Stream tones and PCM files to the default output device", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Device buffer length in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub buffer_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Play a sine tone (UP/DOWN change frequency, ESC quits)
    Tone(ToneCliArgs),
    /// Play a headerless f32 little-endian file
    Raw(RawCliArgs),
    /// Decode a file (ogg, wav, flac, mp3) and play it
    Decoded(DecodedCliArgs),
    /// Print the effective configuration
    Config,
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct ToneCliArgs {
    /// Start frequency in Hz, clamped to 10..=8000
    #[arg(short, long)]
    pub frequency: Option<f64>,
}

#[derive(ClapArgs, Debug)]
pub struct RawCliArgs {
    /// Path to the raw sample file
    pub path: PathBuf,
    /// Interleaved channel count of the file
    #[arg(short, long)]
    pub channels: Option<u16>,
    /// Sample rate the file was recorded at
    #[arg(long)]
    pub sample_rate: Option<u32>,
}

#[derive(ClapArgs, Debug)]
pub struct DecodedCliArgs {
    /// Path to the encoded audio file
    pub path: PathBuf,
}

impl Cli {
    /// Apply command line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ms) = self.buffer_ms {
            config.playback.requested_buffer_ms = ms;
        }
    }
}

impl CliCommand {
    /// The playback this command asks for, if any.
    pub fn playback_request(&self, config: &Config) -> Option<PlaybackRequest> {
        match self {
            CliCommand::Tone(args) => Some(tone_request(args, config)),
            CliCommand::Raw(args) => Some(PlaybackRequest::Raw {
                path: args.path.clone(),
                channels: args.channels.unwrap_or(config.raw.channels),
                sample_rate: args.sample_rate.unwrap_or(config.raw.sample_rate),
            }),
            CliCommand::Decoded(args) => Some(PlaybackRequest::Decoded {
                path: args.path.clone(),
            }),
            CliCommand::Config | CliCommand::Version => None,
        }
    }
}

/// Playing a tone is what happens when no command is given.
pub fn tone_request(args: &ToneCliArgs, config: &Config) -> PlaybackRequest {
    PlaybackRequest::Tone {
        frequency: args.frequency.unwrap_or(config.tone.start_frequency_hz),
        step: config.tone.step_hz,
        amplitude: config.tone.amplitude,
    }
}

pub fn handle_config_command(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
