//! CPAL device wrappers for capture and playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;

use crate::config::DeviceSelection;
use crate::BoothError;

/// Scale for converting 16-bit device samples to `f32` in `[-1, 1)`.
const I16_SCALE: f32 = 32768.0;

/// Wrapper around a CPAL audio input device.
///
/// Handles device selection and stream construction, and hands the audio
/// callback a ring-buffer producer so the callback itself never blocks.
#[must_use]
pub struct InputDevice {
    device: Device,
}

impl InputDevice {
    /// Opens the default input device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultInputDevice` if none is configured.
    pub fn open_default() -> Result<Self, BoothError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(BoothError::NoDefaultInputDevice)?;
        Ok(Self { device })
    }

    /// Opens a specific input device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, BoothError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| BoothError::BackendError(e.to_string()))?;

        for device in devices {
            if device.name().is_ok_and(|n| n == name) {
                return Ok(Self { device });
            }
        }

        Err(BoothError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Opens the device described by a [`DeviceSelection`].
    pub fn open(selection: &DeviceSelection) -> Result<Self, BoothError> {
        match selection {
            DeviceSelection::SystemDefault => Self::open_default(),
            DeviceSelection::ByName(name) => Self::open_by_name(name),
        }
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Returns the device's native format (sample rate, channels).
    pub fn native_config(&self) -> Result<(u32, u16), BoothError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|e| BoothError::BackendError(e.to_string()))?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// Starts capturing at the requested format and returns a running stream.
    ///
    /// The returned [`CaptureStream`] must be kept alive for capture to
    /// continue. Samples land in the returned ring-buffer consumer as `f32`;
    /// 16-bit devices are converted inline in the callback. `on_error`
    /// receives runtime stream errors (called from the audio thread).
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if the stream cannot be built at the
    /// requested format, or `UnsupportedFormat` for exotic device formats.
    pub fn start_capture<F>(
        &self,
        sample_rate: u32,
        channels: u16,
        buffer_capacity: usize,
        on_error: F,
    ) -> Result<(CaptureStream, ringbuf::HeapCons<f32>), BoothError>
    where
        F: FnMut(String) + Send + 'static,
    {
        let ring = HeapRb::<f32>::new(buffer_capacity);
        let (producer, consumer) = ring.split();

        let supported = self
            .device
            .default_input_config()
            .map_err(|e| BoothError::BackendError(e.to_string()))?;

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => self.build_f32_stream(&config, producer, on_error)?,
            SampleFormat::I16 => self.build_i16_stream(&config, producer, on_error)?,
            format => {
                return Err(BoothError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream.play().map_err(|e| BoothError::DeviceUnavailable {
            name: self.name(),
            reason: e.to_string(),
        })?;

        Ok((CaptureStream { _stream: stream }, consumer))
    }

    fn build_f32_stream<F>(
        &self,
        config: &StreamConfig,
        mut producer: ringbuf::HeapProd<f32>,
        mut on_error: F,
    ) -> Result<Stream, BoothError>
    where
        F: FnMut(String) + Send + 'static,
    {
        self.device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Non-blocking push - drops samples if the ring is full
                    let _ = producer.push_slice(data);
                },
                move |err| on_error(err.to_string()),
                None,
            )
            .map_err(|e| BoothError::DeviceUnavailable {
                name: self.name(),
                reason: e.to_string(),
            })
    }

    fn build_i16_stream<F>(
        &self,
        config: &StreamConfig,
        mut producer: ringbuf::HeapProd<f32>,
        mut on_error: F,
    ) -> Result<Stream, BoothError>
    where
        F: FnMut(String) + Send + 'static,
    {
        self.device
            .build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    // Inline conversion to avoid a second pass in the audio callback
                    for &sample in data {
                        let _ = producer.try_push(f32::from(sample) / I16_SCALE);
                    }
                },
                move |err| on_error(err.to_string()),
                None,
            )
            .map_err(|e| BoothError::DeviceUnavailable {
                name: self.name(),
                reason: e.to_string(),
            })
    }
}

/// A running audio capture stream.
///
/// Audio capture continues while this struct is held. When dropped, the CPAL
/// stream is stopped and resources are released.
pub struct CaptureStream {
    /// The underlying CPAL stream. Dropping this stops capture.
    _stream: Stream,
}

/// Wrapper around a CPAL audio output device.
///
/// The playback stream itself is built by
/// [`PlaybackSession`](crate::PlaybackSession), which owns the shared state
/// the output callback closes over; this wrapper only resolves the device.
#[must_use]
pub struct OutputDevice {
    device: Device,
}

impl OutputDevice {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultOutputDevice` if none is configured.
    pub fn open_default() -> Result<Self, BoothError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(BoothError::NoDefaultOutputDevice)?;
        Ok(Self { device })
    }

    /// Opens a specific output device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, BoothError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| BoothError::BackendError(e.to_string()))?;

        for device in devices {
            if device.name().is_ok_and(|n| n == name) {
                return Ok(Self { device });
            }
        }

        Err(BoothError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Opens the device described by a [`DeviceSelection`].
    pub fn open(selection: &DeviceSelection) -> Result<Self, BoothError> {
        match selection {
            DeviceSelection::SystemDefault => Self::open_default(),
            DeviceSelection::ByName(name) => Self::open_by_name(name),
        }
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Returns the device's native format (sample rate, channels).
    pub fn native_config(&self) -> Result<(u32, u16), BoothError> {
        let config = self
            .device
            .default_output_config()
            .map_err(|e| BoothError::BackendError(e.to_string()))?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// The raw CPAL device, for stream construction.
    pub(crate) fn inner(&self) -> &Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: Device tests require actual audio hardware and are skipped in CI
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_input_device() {
        let device = InputDevice::open_default().unwrap();
        println!("Default input device: {}", device.name());
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_output_device() {
        let device = OutputDevice::open_default().unwrap();
        println!("Default output device: {}", device.name());
    }

    #[test]
    fn test_open_by_name_missing() {
        let result = InputDevice::open_by_name("definitely-not-a-real-device");
        // Either the host has no devices (BackendError) or the name is absent
        assert!(result.is_err());
    }
}
