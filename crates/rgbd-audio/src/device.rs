//! Audio device discovery and selection: thin wrappers over `cpal`'s
//! default input/output device lookup, surfaced through `AudioError`.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok()).unwrap_or_default();

    let mut devices = Vec::new();
    for device in host.input_devices().map_err(|e| AudioError::Device(e.to_string()))? {
        if let Ok(name) = device.name() {
            devices.push(AudioDeviceInfo { is_default: name == default_name, name });
        }
    }
    Ok(devices)
}

pub fn list_output_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok()).unwrap_or_default();

    let mut devices = Vec::new();
    for device in host.output_devices().map_err(|e| AudioError::Device(e.to_string()))? {
        if let Ok(name) = device.name() {
            devices.push(AudioDeviceInfo { is_default: name == default_name, name });
        }
    }
    Ok(devices)
}

pub fn get_input_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for device in host.input_devices().map_err(|e| AudioError::Device(e.to_string()))? {
            if device.name().ok().as_deref() == Some(name) {
                return Ok(device);
            }
        }
    }
    host.default_input_device().ok_or_else(|| AudioError::Device("no input device available".into()))
}

pub fn get_output_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for device in host.output_devices().map_err(|e| AudioError::Device(e.to_string()))? {
            if device.name().ok().as_deref() == Some(name) {
                return Ok(device);
            }
        }
    }
    host.default_output_device().ok_or_else(|| AudioError::Device("no output device available".into()))
}
