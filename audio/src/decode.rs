use crate::error::{AudioError, Result};
use crate::types::ContainerFormat;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;

/// Interleaved f32 samples decoded from a synthesized clip.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedClip {
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Average interleaved channels down to one.
    pub fn into_mono(self) -> DecodedClip {
        if self.channels <= 1 {
            return self;
        }
        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        DecodedClip {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }

    /// Linear-interpolation resample of a mono clip.
    pub fn resample(self, target_rate: u32) -> DecodedClip {
        if self.sample_rate == target_rate || self.samples.is_empty() || target_rate == 0 {
            return self;
        }
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = ((self.samples.len() as f64) / ratio).round().max(1.0) as usize;
        let last = self.samples.len() - 1;
        let samples = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos.floor() as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = (pos - idx as f64) as f32;
                self.samples[idx] * (1.0 - frac) + self.samples[next] * frac
            })
            .collect();
        DecodedClip {
            samples,
            sample_rate: target_rate,
            channels: self.channels,
        }
    }
}

pub fn decode_clip(bytes: &[u8], format: ContainerFormat) -> Result<DecodedClip> {
    match format {
        ContainerFormat::Wav => decode_wav(bytes),
        ContainerFormat::Mp3 => decode_mp3(bytes),
    }
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedClip> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(AudioError::Decode(format!(
                "Unsupported WAV sample format: {:?} {} bit",
                format, bits
            )));
        }
    };

    Ok(DecodedClip {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn decode_mp3(bytes: &[u8]) -> Result<DecodedClip> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0u16;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if channels == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(AudioError::Decode(format!("MP3: {}", e))),
        }
    }

    if channels == 0 {
        return Err(AudioError::Decode("MP3: no audio frames".to_string()));
    }

    Ok(DecodedClip {
        samples,
        sample_rate,
        channels,
    })
}
