//! Audio input/output for voice-chat.
//!
//! Capture side: a cpal input callback fills an [`AudioBuffer`] with fixed
//! 100ms chunks, and a [`ChunkBatcher`] drains it into coalesced buffers for
//! network transmission. Playback side: [`CpalSink`] decodes a WAV or MP3
//! clip and plays it to the default output device, blocking until done.

pub mod batcher;
pub mod buffer;
pub mod capture;
pub mod decode;
pub mod device;
pub mod error;
pub mod sink;
pub mod types;

pub use batcher::ChunkBatcher;
pub use buffer::{AudioBuffer, TryPop};
pub use capture::{Microphone, MicrophoneConfig};
pub use decode::{decode_clip, DecodedClip};
pub use device::{list_devices, DeviceInfo};
pub use error::{AudioError, Result};
pub use sink::{AudioSink, CpalSink};
pub use types::{AudioChunk, ContainerFormat, CHUNK_MILLIS, DEFAULT_SAMPLE_RATE};
