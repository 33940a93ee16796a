//! Error types for omotiv-audio.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`BoothError`]): returned from synchronous operations
//!   (`load`, `trim`, `stop`-with-persist, `export_mix`) and from session
//!   start-up.
//! - **Recoverable conditions**: runtime issues inside a live stream
//!   (overflow, callback errors) surfaced via
//!   [`EventCallback`](crate::EventCallback), since the OS audio layer does
//!   not allow unwinding through its callbacks.

use std::path::PathBuf;

/// Errors returned by capture, playback, and export operations.
#[derive(Debug, thiserror::Error)]
pub enum BoothError {
    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// The requested device exists but could not be opened.
    #[error("device unavailable: {name} - {reason}")]
    DeviceUnavailable {
        /// Name of the unavailable device.
        name: String,
        /// Reason the device is unavailable.
        reason: String,
    },

    /// No default input device is configured on this system.
    #[error("no default input device configured")]
    NoDefaultInputDevice,

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultOutputDevice,

    /// The device's sample format is not supported.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// A source file could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    DecodeError {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Why decoding failed.
        reason: String,
    },

    /// An output file could not be written.
    #[error("failed to write {path}: {reason}")]
    WriteError {
        /// Path of the file that failed to write.
        path: PathBuf,
        /// Why the write failed.
        reason: String,
    },

    /// A trim range was out of bounds or inverted.
    #[error("invalid trim range: start={start}s end={end:?}s")]
    InvalidTrim {
        /// Requested window start in seconds.
        start: f64,
        /// Requested window end in seconds (`None` = to end).
        end: Option<f64>,
    },

    /// A playback operation was requested before any track was loaded.
    #[error("no track loaded")]
    NoTrackLoaded,

    /// The two mix inputs have incompatible channel layouts.
    #[error("channel mismatch: backing has {backing} channels, take has {take}")]
    ChannelMismatch {
        /// Channel count of the backing track.
        backing: u16,
        /// Channel count of the recorded take.
        take: u16,
    },

    /// The two mix inputs were recorded at different sample rates.
    #[error("sample rate mismatch: backing is {backing}Hz, take is {take}Hz")]
    SampleRateMismatch {
        /// Sample rate of the backing track.
        backing: u32,
        /// Sample rate of the recorded take.
        take: u32,
    },

    /// Session configuration was rejected before start.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// The capture task did not acknowledge shutdown within the bounded wait.
    #[error("capture task did not shut down within the stop timeout")]
    ShutdownTimeout,

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),
}

impl BoothError {
    /// Creates a decode error for the given path.
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write error for the given path.
    pub fn write(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::WriteError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_display() {
        let err = BoothError::DeviceNotFound {
            name: "USB Mic".to_string(),
        };
        assert_eq!(err.to_string(), "device not found: USB Mic");
    }

    #[test]
    fn test_decode_error_display() {
        let err = BoothError::decode("/tmp/broken.wav", "not a RIFF file");
        assert!(err.to_string().contains("/tmp/broken.wav"));
        assert!(err.to_string().contains("not a RIFF file"));
    }

    #[test]
    fn test_invalid_trim_display() {
        let err = BoothError::InvalidTrim {
            start: 5.0,
            end: Some(2.0),
        };
        assert!(err.to_string().contains("start=5"));
    }

    #[test]
    fn test_channel_mismatch_display() {
        let err = BoothError::ChannelMismatch {
            backing: 2,
            take: 4,
        };
        assert_eq!(
            err.to_string(),
            "channel mismatch: backing has 2 channels, take has 4"
        );
    }
}
