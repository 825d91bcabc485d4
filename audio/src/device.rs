use crate::error::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Summary of an audio device and its default configuration.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub direction: Direction,
    pub is_default: bool,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_format: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_default { " (default)" } else { "" };
        write!(
            f,
            "{}{}: {} ch, {} Hz, {}",
            self.name, marker, self.channels, self.sample_rate, self.sample_format
        )
    }
}

/// Enumerate input and output devices on the default host.
///
/// Devices that cannot report a name or a default config are skipped.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    log::debug!("Using audio host: {:?}", host.id());

    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.devices()? {
        let Ok(name) = device.name() else {
            continue;
        };
        if let Ok(config) = device.default_input_config() {
            devices.push(DeviceInfo {
                is_default: default_input.as_deref() == Some(name.as_str()),
                name: name.clone(),
                direction: Direction::Input,
                channels: config.channels(),
                sample_rate: config.sample_rate().0,
                sample_format: format!("{:?}", config.sample_format()),
            });
        }
        if let Ok(config) = device.default_output_config() {
            devices.push(DeviceInfo {
                is_default: default_output.as_deref() == Some(name.as_str()),
                name,
                direction: Direction::Output,
                channels: config.channels(),
                sample_rate: config.sample_rate().0,
                sample_format: format!("{:?}", config.sample_format()),
            });
        }
    }
    Ok(devices)
}

/// Find an input device by exact name, or the host default when `name` is None.
pub fn find_input_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::Device("No input device found".to_string())),
        Some(wanted) => {
            for device in host.input_devices()? {
                if device.name().map(|n| n == wanted).unwrap_or(false) {
                    return Ok(device);
                }
            }
            Err(AudioError::Device(format!("Input device not found: {}", wanted)))
        }
    }
}

pub fn default_output_device() -> Result<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::Device("No output device found".to_string()))
}
