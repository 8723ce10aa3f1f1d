//! Sample format helpers between capture devices, EVI and the speaker

use super::backend::AudioFrame;

/// Bring a captured frame to the rate and channel count EVI was told about
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.channels != target_channels {
        processed = remix_channels(processed, target_channels);
    }

    if processed.sample_rate != target_sample_rate {
        processed = resample_frame(processed, target_sample_rate);
    }

    processed
}

/// Average interleaved channels into one
pub fn downmix_to_mono(frame: AudioFrame) -> AudioFrame {
    remix_channels(frame, 1)
}

/// Map interleaved audio onto `target_channels`.
///
/// Downmixing averages every source channel `i` into output `i % target`;
/// upmixing copies source channel `c % source` into output `c`, so mono is
/// duplicated to every output.
pub fn remix_channels(frame: AudioFrame, target_channels: u16) -> AudioFrame {
    if frame.channels == target_channels || frame.channels == 0 || target_channels == 0 {
        return frame;
    }

    let in_ch = frame.channels as usize;
    let out_ch = target_channels as usize;
    let mut samples = Vec::with_capacity(frame.samples.len() / in_ch * out_ch);

    for chunk in frame.samples.chunks_exact(in_ch) {
        if in_ch > out_ch {
            for c in 0..out_ch {
                let (sum, count) = chunk
                    .iter()
                    .skip(c)
                    .step_by(out_ch)
                    .fold((0i32, 0i32), |(sum, count), &s| (sum + s as i32, count + 1));
                samples.push((sum / count.max(1)) as i16);
            }
        } else {
            samples.extend((0..out_ch).map(|c| chunk[c % in_ch]));
        }
    }

    AudioFrame {
        samples,
        sample_rate: frame.sample_rate,
        channels: target_channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Linear-interpolation resample of an interleaved frame
pub fn resample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if frame.sample_rate == target_rate || frame.sample_rate == 0 || target_rate == 0 {
        return frame;
    }

    let channels = frame.channels.max(1) as usize;
    let in_frames = frame.samples.len() / channels;
    if in_frames == 0 {
        return AudioFrame {
            sample_rate: target_rate,
            ..frame
        };
    }

    let out_frames = (in_frames as u64 * target_rate as u64 / frame.sample_rate as u64) as usize;
    let step = frame.sample_rate as f64 / target_rate as f64;
    let mut samples = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let pos = i as f64 * step;
        let idx = pos.floor() as usize;
        let next = (idx + 1).min(in_frames - 1);
        let frac = pos - idx as f64;

        for c in 0..channels {
            let a = frame.samples[idx * channels + c] as f64;
            let b = frame.samples[next * channels + c] as f64;
            samples.push((a + (b - a) * frac).round() as i16);
        }
    }

    AudioFrame {
        samples,
        sample_rate: target_rate,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Little-endian PCM bytes as EVI's `linear16` encoding expects
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// Linear-interpolation resample of mono f32 samples (used for playback)
pub fn resample_mono_f32(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_downmix_averages_channels() {
        let mono = downmix_to_mono(frame(vec![100, 300, -200, -400], 16000, 2));
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples, vec![200, -300]);
    }

    #[test]
    fn test_downmix_does_not_clip() {
        let mono = downmix_to_mono(frame(vec![i16::MAX, i16::MAX], 16000, 2));
        assert_eq!(mono.samples, vec![i16::MAX]);
    }

    #[test]
    fn test_upmix_mono_duplicates() {
        let stereo = remix_channels(frame(vec![10, -20, 30], 16000, 1), 2);
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.samples, vec![10, 10, -20, -20, 30, 30]);
    }

    #[test]
    fn test_downmix_six_to_two() {
        // outputs average channels {0, 2, 4} and {1, 3, 5}
        let stereo = remix_channels(frame(vec![1, 10, 3, 20, 5, 30], 16000, 6), 2);
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.samples, vec![3, 20]);
    }

    #[test]
    fn test_resample_halves_length() {
        let out = resample_frame(frame(vec![0; 3200], 32000, 1), 16000);
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples.len(), 1600);
    }

    #[test]
    fn test_resample_non_integer_ratio() {
        // 100ms at 44.1kHz -> 100ms at 16kHz
        let out = resample_frame(frame(vec![1000; 4410], 44100, 1), 16000);
        assert_eq!(out.samples.len(), 1600);
        assert!(out.samples.iter().all(|&s| s == 1000));
    }

    #[test]
    fn test_process_frame_stereo_48k() {
        let out = process_frame(frame(vec![500; 9600], 48000, 2), 16000, 1);
        assert_eq!(out.channels, 1);
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples.len(), 1600);
    }

    #[test]
    fn test_pcm_bytes_little_endian() {
        assert_eq!(pcm_bytes(&[1, -2]), vec![0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn test_f32_conversion_clamps() {
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), -i16::MAX);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn test_resample_mono_f32_upsamples() {
        let out = resample_mono_f32(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }
}
