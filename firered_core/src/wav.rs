use std::io::Cursor;
use std::path::Path;

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Encodes float samples as a 16-bit PCM mono WAV file in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        WavWriter::new(&mut cursor, spec).context("failed to create WAV writer")?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize().context("failed to finalize WAV data")?;

    Ok(cursor.into_inner())
}

/// Reads a WAV file into normalized float samples plus its sample rate.
/// Integer PCM is scaled into `[-1.0, 1.0]` and multi-channel audio is
/// downmixed to mono by averaging the channels.
pub fn read_wav(path: impl AsRef<Path>) -> anyhow::Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let mut reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = if spec.channels > 1 {
        let channels = spec.channels as usize;
        raw.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        raw
    };

    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_wav_produces_riff_with_expected_spec() {
        let samples = vec![0.0f32, 0.5, -0.5, 1.0, -1.0, 2.0];
        let wav = encode_wav(&samples, 24_000).unwrap();
        assert!(wav.starts_with(b"RIFF"));

        let reader = WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 6);
    }

    #[test]
    fn read_wav_round_trips_encoded_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..480).map(|i| (i as f32 / 480.0).sin() * 0.8).collect();
        std::fs::write(&path, encode_wav(&samples, 16_000).unwrap()).unwrap();

        let (decoded, rate) = read_wav(&path).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in decoded.iter().zip(&samples) {
            assert!((a - b).abs() < 1.0 / 8_192.0);
        }
    }

    #[test]
    fn read_wav_downmixes_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let (decoded, rate) = read_wav(&path).unwrap();
        assert_eq!(rate, 48_000);
        assert_eq!(decoded.len(), 10);
        for sample in decoded {
            assert!((sample - 0.5).abs() < 0.01);
        }
    }

    #[test]
    fn read_wav_fails_for_missing_file() {
        assert!(read_wav("/nonexistent/audio.wav").is_err());
    }
}
