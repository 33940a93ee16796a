//! Configuration types for capture sessions.

use std::path::PathBuf;
use std::time::Duration;

/// Specifies which audio device to use.
#[derive(Debug, Clone, Default)]
pub enum DeviceSelection {
    /// Use the system's default device.
    #[default]
    SystemDefault,
    /// Use a specific device by name.
    ByName(String),
}

/// Configuration for a capture session.
///
/// Use [`CaptureOptions::default()`] for the booth's standard settings
/// (44.1kHz stereo, 1024-frame chunks), or customize as needed.
///
/// # Example
///
/// ```
/// use omotiv_audio::CaptureOptions;
/// use std::time::Duration;
///
/// let options = CaptureOptions {
///     channels: 1,
///     ..Default::default()
/// };
/// assert_eq!(options.sample_rate, 44100);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Sample rate to capture at, in Hz.
    ///
    /// Default: 44100
    pub sample_rate: u32,

    /// Number of channels to capture (1 = mono, 2 = stereo).
    ///
    /// Default: 2
    pub channels: u16,

    /// Frames per hardware chunk.
    ///
    /// Smaller values reduce metering latency but increase overhead.
    /// Default: 1024
    pub chunk_frames: u32,

    /// Hard ceiling on capture duration.
    ///
    /// When the deadline expires the session stops itself and persists
    /// whatever was buffered ("auto-stop"). This also bounds the take
    /// buffer's memory. Default: 600 seconds
    pub max_duration: Duration,

    /// Bounded wait for the capture task to acknowledge shutdown.
    ///
    /// `stop()` fails with [`ShutdownTimeout`] rather than hanging the
    /// caller past this. Default: 3 seconds
    ///
    /// [`ShutdownTimeout`]: crate::BoothError::ShutdownTimeout
    pub stop_timeout: Duration,

    /// Directory where persisted takes are written.
    ///
    /// Default: the OS temp directory
    pub output_dir: PathBuf,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            chunk_frames: 1024,
            max_duration: Duration::from_secs(600),
            stop_timeout: Duration::from_secs(3),
            output_dir: std::env::temp_dir(),
        }
    }
}

impl CaptureOptions {
    /// Duration of one chunk at these settings.
    pub fn chunk_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.chunk_frames) / f64::from(self.sample_rate))
    }
}
