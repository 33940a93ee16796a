//! Audio data chunk with metadata.

use std::sync::Arc;
use std::time::Duration;

/// A discrete buffer of audio samples with associated metadata.
///
/// `AudioChunk` is the fundamental unit of audio data flowing out of a live
/// capture. Each chunk contains interleaved PCM samples along with timing and
/// format information.
///
/// Samples are `f32` nominally in `[-1.0, 1.0]` and are stored in an
/// `Arc<Vec<f32>>` so chunks can be shared cheaply between the capture task
/// and the take buffer. A chunk is immutable once captured.
///
/// # Example
///
/// ```
/// use omotiv_audio::AudioChunk;
/// use std::time::Duration;
///
/// let chunk = AudioChunk::new(vec![0.0f32; 4410], Duration::ZERO, 44100, 1);
/// assert_eq!(chunk.duration(), Duration::from_millis(100));
///
/// let chunk2 = chunk.clone(); // Cheap clone - shares sample data
/// ```
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples, nominally in `[-1.0, 1.0]`.
    ///
    /// Wrapped in `Arc` for zero-copy sharing.
    pub samples: Arc<Vec<f32>>,

    /// Timestamp from the start of the capture session.
    pub timestamp: Duration,

    /// Sample rate in Hz (e.g., 16000, 44100, 48000).
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl AudioChunk {
    /// Creates a new `AudioChunk` with the given parameters.
    pub fn new(samples: Vec<f32>, timestamp: Duration, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Arc::new(samples),
            timestamp,
            sample_rate,
            channels,
        }
    }

    /// Returns the duration of this audio chunk.
    ///
    /// Calculated from the number of samples, sample rate, and channel count.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    /// Returns the number of audio frames in this chunk.
    ///
    /// A frame contains one sample per channel.
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Returns `true` if this chunk contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
