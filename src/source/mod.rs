//! Audio device abstraction over CPAL.
//!
//! This module is the interface between CPAL's low-level streams and the
//! capture/playback sessions: device enumeration with channel metadata,
//! plus wrappers that open a concrete input or output device.

mod device;

pub use device::{CaptureStream, InputDevice, OutputDevice};

use cpal::traits::{DeviceTrait, HostTrait};

use crate::BoothError;

/// Metadata for one enumerable audio device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device name as reported by the OS.
    pub name: String,
    /// Channel count of the device's default configuration.
    pub channels: u16,
}

/// Lists all available input devices with their channel counts.
///
/// Devices without a usable default configuration are skipped.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_input_devices() -> Result<Vec<DeviceInfo>, BoothError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| BoothError::BackendError(e.to_string()))?;

    Ok(devices
        .filter_map(|d| {
            let name = d.name().ok()?;
            let channels = d.default_input_config().ok()?.channels();
            Some(DeviceInfo { name, channels })
        })
        .collect())
}

/// Lists all available output devices with their channel counts.
///
/// Devices without a usable default configuration are skipped.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_output_devices() -> Result<Vec<DeviceInfo>, BoothError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| BoothError::BackendError(e.to_string()))?;

    Ok(devices
        .filter_map(|d| {
            let name = d.name().ok()?;
            let channels = d.default_output_config().ok()?.channels();
            Some(DeviceInfo { name, channels })
        })
        .collect())
}

/// Gets the name of the default input device, if any.
pub fn default_input_device_name() -> Option<String> {
    cpal::default_host()
        .default_input_device()
        .and_then(|d| d.name().ok())
}

/// Gets the name of the default output device, if any.
pub fn default_output_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}
