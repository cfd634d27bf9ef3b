//! Audio ingest.
//!
//! Decodes any container/codec symphonia recognizes (WAV, MP3, M4A, FLAC,
//! OGG) into a mono f32 [`Waveform`], averaging channels when the source is
//! multi-channel.

use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ExtractError;
use crate::toolkit::Waveform;

/// Decode an audio file to a mono waveform.
pub fn decode(path: &Path) -> Result<Waveform, ExtractError> {
    let fail = |reason: String| ExtractError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| fail(format!("open failed: {e}")))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| fail(format!("probe failed: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| fail("no audio track".into()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| fail("sample rate unknown".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| fail(format!("unsupported codec: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(fail(format!("packet read failed: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| fail(format!("decode failed: {e}")))?;
        mix_to_mono(&decoded, &mut samples);
    }

    if samples.is_empty() {
        return Err(fail("no audio samples decoded".into()));
    }

    tracing::debug!(
        path = %path.display(),
        sample_rate,
        samples = samples.len(),
        "decoded audio"
    );

    Ok(Waveform {
        samples,
        sample_rate,
    })
}

/// Average all channels of one decoded buffer into `out`.
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    macro_rules! mix {
        ($buf:expr) => {{
            let buf = $buf;
            let channels = buf.spec().channels.count();
            let frames = buf.frames();
            out.reserve(frames);
            for frame in 0..frames {
                let mut sum = 0.0f32;
                for ch in 0..channels {
                    sum += f32::from_sample(buf.chan(ch)[frame]);
                }
                out.push(sum / channels as f32);
            }
        }};
    }

    match decoded {
        AudioBufferRef::U8(buf) => mix!(buf),
        AudioBufferRef::U16(buf) => mix!(buf),
        AudioBufferRef::U24(buf) => mix!(buf),
        AudioBufferRef::U32(buf) => mix!(buf),
        AudioBufferRef::S8(buf) => mix!(buf),
        AudioBufferRef::S16(buf) => mix!(buf),
        AudioBufferRef::S24(buf) => mix!(buf),
        AudioBufferRef::S32(buf) => mix!(buf),
        AudioBufferRef::F32(buf) => mix!(buf),
        AudioBufferRef::F64(buf) => mix!(buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, samples_per_channel: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..samples_per_channel {
            let t = i as f32 / 16_000.0;
            let value = (0.5 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 1, 16_000);

        let wave = decode(&path).unwrap();
        assert_eq!(wave.sample_rate, 16_000);
        assert_eq!(wave.samples.len(), 16_000);
        assert!((wave.duration() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stereo_mixes_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 8_000);

        let wave = decode(&path).unwrap();
        // Identical channels average back to the original tone.
        assert_eq!(wave.samples.len(), 8_000);
        let peak = wave.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.4 && peak < 0.6, "peak {peak}");
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode(Path::new("/nonexistent/voice.wav")).unwrap_err();
        assert!(matches!(err, ExtractError::Decode { .. }));
    }

    #[test]
    fn test_decode_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"not an audio file at all").unwrap();

        assert!(decode(&path).is_err());
    }
}
