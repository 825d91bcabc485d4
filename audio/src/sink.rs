use crate::decode::{decode_clip, DecodedClip};
use crate::device::default_output_device;
use crate::error::{AudioError, Result};
use crate::types::ContainerFormat;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use std::time::Duration;

/// Core trait for audio output. `play` blocks until the clip has finished.
pub trait AudioSink {
    fn play(&self, clip: &[u8], format: ContainerFormat) -> Result<()>;
}

/// Plays clips on the default output device.
pub struct CpalSink {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl CpalSink {
    pub fn new() -> Result<Self> {
        let device = default_output_device()?;
        log::debug!("AudioSink: Using output device: {:?}", device.name());

        let supported = device.default_output_config()?;
        log::debug!("AudioSink: Using output config: {:?}", supported);

        Ok(Self {
            device,
            sample_format: supported.sample_format(),
            config: supported.config(),
        })
    }

    fn play_samples(&self, samples: Vec<f32>) -> Result<()> {
        match self.sample_format {
            SampleFormat::F32 => self.play_as::<f32>(samples),
            SampleFormat::I16 => self.play_as::<i16>(samples),
            format => Err(AudioError::UnsupportedConfig(format!(
                "Unsupported output sample format: {:?}",
                format
            ))),
        }
    }

    fn play_as<T>(&self, samples: Vec<f32>) -> Result<()>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        let duration =
            Duration::from_millis(samples.len() as u64 * 1000 / self.config.sample_rate.0 as u64);
        let (done_tx, done_rx) = bounded::<()>(1);
        let mut playback = Playback::new(samples, done_tx);

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = playback.next_sample().to_sample::<T>();
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }
            },
            |err| log::error!("❌ Playback stream error: {}", err),
            None,
        )?;
        stream.play()?;

        if done_rx.recv_timeout(duration + Duration::from_secs(1)).is_err() {
            log::warn!("⚠️ Playback did not signal completion in time");
        }
        // Let the device drain its last period
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);
        Ok(())
    }
}

impl AudioSink for CpalSink {
    fn play(&self, clip: &[u8], format: ContainerFormat) -> Result<()> {
        let decoded: DecodedClip = decode_clip(clip, format)?;
        let clip = decoded.into_mono().resample(self.config.sample_rate.0);
        if clip.samples.is_empty() {
            return Ok(());
        }
        log::info!(
            "🔊 Playing {} clip ({} samples at {} Hz)",
            format,
            clip.samples.len(),
            clip.sample_rate
        );
        self.play_samples(clip.samples)
    }
}

/// Callback-side cursor over the samples being played.
struct Playback {
    samples: Vec<f32>,
    position: usize,
    done: Option<Sender<()>>,
}

impl Playback {
    fn new(samples: Vec<f32>, done: Sender<()>) -> Self {
        Self {
            samples,
            position: 0,
            done: Some(done),
        }
    }

    /// Next sample, or silence once exhausted. Signals completion once.
    fn next_sample(&mut self) -> f32 {
        if let Some(&sample) = self.samples.get(self.position) {
            self.position += 1;
            return sample;
        }
        if let Some(done) = self.done.take() {
            let _ = done.try_send(());
        }
        0.0
    }
}
