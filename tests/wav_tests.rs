use anyhow::Result;
use hume_voice_chat::audio::wav::decode_wav;
use std::io::Cursor;

fn wav_bytes(spec: hound::WavSpec, write: impl FnOnce(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        write(&mut writer);
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn test_decode_mono_i16() -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let bytes = wav_bytes(spec, |w| {
        for s in [0i16, 16384, -16384, i16::MAX] {
            w.write_sample(s).unwrap();
        }
    });

    let clip = decode_wav(&bytes)?;
    assert_eq!(clip.sample_rate, 24000);
    assert_eq!(clip.samples.len(), 4);
    assert_eq!(clip.samples[0], 0.0);
    assert!((clip.samples[1] - 0.5).abs() < 1e-3);
    assert!((clip.samples[2] + 0.5).abs() < 1e-3);
    assert!(clip.samples[3] > 0.99);

    Ok(())
}

#[test]
fn test_decode_stereo_is_downmixed() -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let bytes = wav_bytes(spec, |w| {
        // left loud, right silent
        for _ in 0..480 {
            w.write_sample(16384i16).unwrap();
            w.write_sample(0i16).unwrap();
        }
    });

    let clip = decode_wav(&bytes)?;
    assert_eq!(clip.samples.len(), 480);
    assert!((clip.samples[0] - 0.25).abs() < 1e-3);
    assert!((clip.duration_secs() - 0.01).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_decode_float() -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let bytes = wav_bytes(spec, |w| {
        w.write_sample(0.75f32).unwrap();
        w.write_sample(-0.25f32).unwrap();
    });

    let clip = decode_wav(&bytes)?;
    assert_eq!(clip.samples, vec![0.75, -0.25]);

    Ok(())
}

#[test]
fn test_invalid_bytes_are_rejected() {
    assert!(decode_wav(b"definitely not a wav file").is_err());
    assert!(decode_wav(&[]).is_err());
}
