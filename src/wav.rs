//! WAV file helpers
//!
//! The engine works on 16 kHz mono audio and nothing here converts
//! formats: files at any other rate or with more than one channel are
//! rejected rather than resampled or downmixed.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::SAMPLE_RATE;
use crate::error::{DtlnError, Result};

/// Read a 16 kHz mono WAV file as `f32` samples in `[-1.0, 1.0]`
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a readable WAV file
/// * `UnsupportedFormat` - If the file is not 16 kHz mono
pub fn read_wav(path: &Path) -> Result<Vec<f32>> {
    if !path.exists() {
        return Err(DtlnError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| DtlnError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(DtlnError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono supported)", spec.channels),
        });
    }
    if spec.sample_rate != SAMPLE_RATE {
        return Err(DtlnError::UnsupportedFormat {
            format: format!(
                "{} Hz audio (only {} Hz supported)",
                spec.sample_rate, SAMPLE_RATE
            ),
        });
    }

    read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)
}

/// Write `samples` as a 16 kHz mono 32-bit float WAV file
pub fn write_wav(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(hound_io_error)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(hound_io_error)?;
    }
    writer.finalize().map_err(hound_io_error)?;

    Ok(())
}

fn hound_io_error(e: hound::Error) -> DtlnError {
    match e {
        hound::Error::IoError(io) => DtlnError::Io(io),
        other => DtlnError::Io(std::io::Error::other(other.to_string())),
    }
}

fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |e: hound::Error| DtlnError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        // 24-bit stored as i32 in hound
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, bits) => Err(DtlnError::UnsupportedFormat {
            format: format!("{}-bit integer audio", bits),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        let samples: Vec<f32> = (0..1600).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();

        write_wav(&path, &samples).unwrap();
        let read = read_wav(&path).unwrap();

        assert_eq!(read.len(), samples.len());
        assert_relative_eq!(read[123], samples[123]);
    }

    #[test]
    fn test_reads_16_bit_int() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("int16.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-32768i16).unwrap();
        writer.finalize().unwrap();

        let read = read_wav(&path).unwrap();
        assert_relative_eq!(read[0], 0.5);
        assert_relative_eq!(read[1], -1.0);
    }

    #[test]
    fn test_rejects_stereo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let err = read_wav(&path).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_rejects_other_sample_rates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("48k.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.0f32).unwrap();
        writer.finalize().unwrap();

        let err = read_wav(&path).unwrap_err();
        assert!(err.to_string().contains("48000 Hz"));
    }

    #[test]
    fn test_missing_file() {
        let err = read_wav(Path::new("/nonexistent/input.wav")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }
}
