use cpal::{
    BuildStreamError, DefaultStreamConfigError, DeviceNameError, DevicesError, PauseStreamError,
    PlayStreamError, SupportedStreamConfigsError,
};
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AudioError>;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Unsupported stream configuration: {0}")]
    UnsupportedConfig(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Failed to decode audio clip: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<DevicesError> for AudioError {
    fn from(err: DevicesError) -> Self {
        AudioError::Device(err.to_string())
    }
}

impl From<DeviceNameError> for AudioError {
    fn from(err: DeviceNameError) -> Self {
        AudioError::Device(err.to_string())
    }
}

impl From<SupportedStreamConfigsError> for AudioError {
    fn from(err: SupportedStreamConfigsError) -> Self {
        AudioError::UnsupportedConfig(err.to_string())
    }
}

impl From<DefaultStreamConfigError> for AudioError {
    fn from(err: DefaultStreamConfigError) -> Self {
        AudioError::UnsupportedConfig(err.to_string())
    }
}

impl From<BuildStreamError> for AudioError {
    fn from(err: BuildStreamError) -> Self {
        AudioError::Stream(format!("Failed to build stream: {}", err))
    }
}

impl From<PlayStreamError> for AudioError {
    fn from(err: PlayStreamError) -> Self {
        AudioError::Stream(format!("Failed to start stream: {}", err))
    }
}

impl From<PauseStreamError> for AudioError {
    fn from(err: PauseStreamError) -> Self {
        AudioError::Stream(format!("Failed to pause stream: {}", err))
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::Decode(format!("WAV: {}", err))
    }
}
