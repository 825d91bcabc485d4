use crate::batcher::ChunkBatcher;
use crate::buffer::AudioBuffer;
use crate::device::find_input_device;
use crate::error::{AudioError, Result};
use crate::types::{frames_per_chunk, AudioChunk, DEFAULT_SAMPLE_RATE};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};

#[derive(Debug, Clone)]
pub struct MicrophoneConfig {
    /// Input device name (None = default device)
    pub device_name: Option<String>,
    pub sample_rate: u32,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// An open microphone feeding 100ms mono s16le chunks into an [`AudioBuffer`].
///
/// The device is released and the end-of-stream sentinel pushed when the
/// microphone is closed or dropped, including on early returns and panics,
/// so a consumer blocked on the buffer always wakes up.
pub struct Microphone {
    stream: Option<Stream>,
    buffer: AudioBuffer,
}

impl Microphone {
    pub fn open(config: MicrophoneConfig, buffer: AudioBuffer) -> Result<Self> {
        let device = find_input_device(config.device_name.as_deref())?;
        let supported = Self::find_config(&device, config.sample_rate)?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.config();

        log::info!(
            "🎤 Opening microphone '{}' ({:?}, {} ch, {} Hz)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_format,
            stream_config.channels,
            stream_config.sample_rate.0
        );

        let stream = match sample_format {
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, &buffer)?,
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, &buffer)?,
            format => {
                return Err(AudioError::UnsupportedConfig(format!(
                    "Unsupported input sample format: {:?}",
                    format
                )));
            }
        };
        stream.play()?;

        Ok(Self {
            stream: Some(stream),
            buffer,
        })
    }

    /// A fresh lazy chunk sequence over this microphone's buffer.
    pub fn chunks(&self) -> ChunkBatcher {
        ChunkBatcher::new(self.buffer.clone())
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop capture, release the device and signal end-of-stream.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream.pause();
        drop(stream);
        self.buffer.close();
        log::info!("🔇 Microphone closed");
        paused.map_err(AudioError::from)
    }

    /// Pick a device config that can run at `sample_rate`, preferring i16
    /// over f32 and fewer channels over more.
    fn find_config(device: &Device, sample_rate: u32) -> Result<SupportedStreamConfig> {
        let rate = SampleRate(sample_rate);
        let mut candidates: Vec<_> = device
            .supported_input_configs()?
            .filter(|range| range.min_sample_rate() <= rate && range.max_sample_rate() >= rate)
            .filter(|range| {
                matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32)
            })
            .collect();

        candidates.sort_by_key(|range| {
            let format_rank = match range.sample_format() {
                SampleFormat::I16 => 0,
                _ => 1,
            };
            (format_rank, range.channels())
        });

        candidates
            .into_iter()
            .next()
            .map(|range| range.with_sample_rate(rate))
            .ok_or_else(|| {
                AudioError::UnsupportedConfig(format!(
                    "No input config supports {} Hz with i16 or f32 samples",
                    sample_rate
                ))
            })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        buffer: &AudioBuffer,
    ) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let channels = config.channels as usize;
        let frames = frames_per_chunk(config.sample_rate.0);
        let mut accumulator = ChunkAccumulator::new(frames);
        let buffer = buffer.clone();

        let stream = device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let mono = frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>()
                        / frame.len() as f32;
                    if let Some(chunk) = accumulator.push(mono.to_sample::<i16>()) {
                        buffer.push(Some(chunk));
                    }
                }
            },
            |err| log::error!("❌ Capture stream error: {}", err),
            None,
        )?;
        Ok(stream)
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("⚠️ Error while closing microphone: {}", e);
        }
    }
}

/// Collects mono samples into fixed-size chunks.
struct ChunkAccumulator {
    pending: Vec<i16>,
    frames: usize,
}

impl ChunkAccumulator {
    fn new(frames: usize) -> Self {
        Self {
            pending: Vec::with_capacity(frames),
            frames: frames.max(1),
        }
    }

    fn push(&mut self, sample: i16) -> Option<AudioChunk> {
        self.pending.push(sample);
        if self.pending.len() < self.frames {
            return None;
        }
        let chunk = AudioChunk::from_samples(&self.pending);
        self.pending.clear();
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_emits_fixed_chunks() {
        let mut acc = ChunkAccumulator::new(4);
        let mut emitted = Vec::new();
        for s in 0..10i16 {
            if let Some(chunk) = acc.push(s) {
                emitted.push(chunk);
            }
        }
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].sample_count(), 4);
        assert_eq!(emitted[1].data, AudioChunk::from_samples(&[4, 5, 6, 7]).data);
        // Remaining two samples stay pending
        assert_eq!(acc.pending, vec![8, 9]);
    }

    #[test]
    fn test_default_config() {
        let config = MicrophoneConfig::default();
        assert_eq!(config.sample_rate, 16_000);
        assert!(config.device_name.is_none());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_open_and_close_default_microphone() {
        let buffer = AudioBuffer::new();
        let mic = Microphone::open(MicrophoneConfig::default(), buffer.clone()).unwrap();
        assert!(mic.is_open());
        let mut chunks = mic.chunks();
        let first = chunks.next().expect("expected audio from microphone");
        assert!(!first.is_empty());
        mic.close().unwrap();
        assert!(chunks.all(|b| !b.is_empty()));
        assert!(buffer.pop_blocking().is_none());
    }
}
