//! Loading PCM into memory before playback.
//!
//! Raw files are headerless little-endian `f32`. Everything else goes through
//! a decoder: WAV via hound, all other containers via symphonia.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Interleaved 16-bit PCM produced by a decoder.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Read a headerless `f32le` file.
pub fn load_raw_f32(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read raw audio file {:?}", path))?;
    let samples = raw_f32_from_bytes(&bytes);
    info!("Loaded {} raw samples from {:?}", samples.len(), path);
    Ok(samples)
}

/// Little-endian `f32` samples in `bytes`. A trailing partial sample is dropped.
pub fn raw_f32_from_bytes(bytes: &[u8]) -> Vec<f32> {
    let chunks = bytes.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        warn!(
            "Ignoring {} trailing bytes that do not form a sample",
            chunks.remainder().len()
        );
    }
    chunks
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Decode a whole file into memory.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let decoded = if is_wav {
        decode_wav(path)?
    } else {
        decode_with_symphonia(path)?
    };

    if decoded.samples.is_empty() {
        bail!("{:?} decoded to no audio", path);
    }

    info!(
        "Decoded {:?}: {} frames, {} ch, {} Hz",
        path,
        decoded.frames(),
        decoded.channels,
        decoded.sample_rate
    );
    Ok(decoded)
}

fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {:?}", path))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample as i32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| int_to_i16(s, bits)))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read WAV samples")?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(float_to_i16))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read WAV samples")?,
    };

    Ok(DecodedAudio {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        samples,
    })
}

fn int_to_i16(sample: i32, bits: i32) -> i16 {
    if bits > 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}

fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn decode_with_symphonia(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unsupported audio format: {:?}", path))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("No audio track found in {:?}", path))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .with_context(|| format!("Unsupported codec in {:?}", path))?;

    let mut channels = codec_params.channels.map(|c| c.count() as u16);
    let mut sample_rate = codec_params.sample_rate;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e).context("Failed to decode packet"),
        };

        let spec = *decoded.spec();
        channels.get_or_insert(spec.channels.count() as u16);
        sample_rate.get_or_insert(spec.rate);

        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    Ok(DecodedAudio {
        channels: channels.ok_or_else(|| anyhow!("Unknown channel count in {:?}", path))?,
        sample_rate: sample_rate.ok_or_else(|| anyhow!("Unknown sample rate in {:?}", path))?,
        samples,
    })
}
