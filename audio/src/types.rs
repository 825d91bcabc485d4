use std::fmt;
use std::time::Instant;

/// Default capture rate expected by the speech recognizer.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Nominal duration of one captured chunk.
pub const CHUNK_MILLIS: u32 = 100;

/// Bytes per captured sample (s16le).
pub const BYTES_PER_SAMPLE: usize = 2;

/// One chunk of captured microphone audio: mono s16le PCM.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub data: Vec<u8>,
    pub captured_at: Instant,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Instant::now(),
        }
    }

    /// Build a chunk from i16 samples, little-endian encoded.
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self::new(data)
    }

    pub fn sample_count(&self) -> usize {
        self.data.len() / BYTES_PER_SAMPLE
    }
}

/// Number of mono frames in one chunk at `sample_rate`.
pub fn frames_per_chunk(sample_rate: u32) -> usize {
    (u64::from(sample_rate) * u64::from(CHUNK_MILLIS) / 1000) as usize
}

/// Container of a synthesized clip handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Wav,
    Mp3,
}

impl ContainerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Wav => "wav",
            ContainerFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
