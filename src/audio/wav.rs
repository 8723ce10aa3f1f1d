use anyhow::{bail, Context, Result};
use std::io::Cursor;

use super::convert::i16_to_f32;

/// A decoded speech clip, downmixed to mono
#[derive(Debug, Clone)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an in-memory WAV file (as carried by EVI `audio_output` events)
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedClip> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("Invalid WAV header")?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(i16_to_f32))
            .collect::<Result<_, _>>()
            .context("Corrupt WAV data")?,
        (hound::SampleFormat::Int, bits) if bits <= 32 => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Corrupt WAV data")?
        }
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Corrupt WAV data")?,
        (format, bits) => bail!("Unsupported WAV format: {:?} {} bit", format, bits),
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(DecodedClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}
