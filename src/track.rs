//! Decoded audio tracks and trim windows.

use std::path::Path;
use std::time::Duration;

use crate::BoothError;

/// A fully materialized audio file: interleaved `f32` samples plus format.
///
/// A `Track` is immutable after load. Playback and export operate on it
/// through a cursor or a [`TrimRange`] without mutating the sample data.
#[derive(Debug, Clone)]
pub struct Track {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Track {
    /// Creates a track from raw interleaved samples.
    ///
    /// Trailing samples that do not form a complete frame are truncated.
    pub fn from_samples(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        if channels > 0 {
            let whole = samples.len() - samples.len() % channels as usize;
            samples.truncate(whole);
        }
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Decodes an entire WAV file into memory.
    ///
    /// Accepts 16/24/32-bit integer and 32-bit float PCM. The channel count
    /// is preserved as-is; no implicit downmixing.
    ///
    /// # Errors
    ///
    /// Returns [`BoothError::DecodeError`] on unreadable or corrupt input.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BoothError> {
        let path = path.as_ref();
        let mut reader =
            hound::WavReader::open(path).map_err(|e| BoothError::decode(path, e.to_string()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| BoothError::decode(path, e.to_string()))?,
            (hound::SampleFormat::Int, bits @ (16 | 24 | 32)) => {
                let scale = (1u64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| BoothError::decode(path, e.to_string()))?
            }
            (format, bits) => {
                return Err(BoothError::decode(
                    path,
                    format!("unsupported sample format: {bits}-bit {format:?}"),
                ));
            }
        };

        tracing::debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            frames = samples.len() / spec.channels.max(1) as usize,
            "track loaded"
        );

        Ok(Self::from_samples(samples, spec.sample_rate, spec.channels))
    }

    /// Encodes the track to a 32-bit float WAV file.
    ///
    /// # Errors
    ///
    /// Returns [`BoothError::WriteError`] on I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BoothError> {
        let path = path.as_ref();
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut writer =
            hound::WavWriter::create(path, spec).map_err(|e| BoothError::write(path, e.to_string()))?;
        for &sample in &self.samples {
            writer
                .write_sample(sample)
                .map_err(|e| BoothError::write(path, e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| BoothError::write(path, e.to_string()))?;

        Ok(())
    }

    /// The interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Total duration.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Returns a copy of the track restricted to the given trim range.
    ///
    /// # Errors
    ///
    /// Returns [`BoothError::InvalidTrim`] if the range does not fit this
    /// track.
    pub fn trimmed(&self, range: TrimRange) -> Result<Track, BoothError> {
        let window = range.resolve(self)?;
        let channels = self.channels as usize;
        let samples = self.samples[window.start * channels..window.end * channels].to_vec();
        Ok(Track::from_samples(samples, self.sample_rate, self.channels))
    }

    /// The frame window covering the whole track.
    pub(crate) fn full_window(&self) -> FrameWindow {
        FrameWindow {
            start: 0,
            end: self.frames(),
        }
    }
}

/// A `[start, end)` time sub-range of a track, in seconds.
///
/// `end = None` means "to the end of the track". Used to scope playback and
/// export to a sub-region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRange {
    /// Window start in seconds.
    pub start: f64,
    /// Window end in seconds, or `None` for "to end".
    pub end: Option<f64>,
}

impl TrimRange {
    /// Creates a trim range, rejecting negative or inverted bounds.
    ///
    /// Bounds against a concrete track duration are checked later, by
    /// [`resolve`](Self::resolve).
    pub fn new(start: f64, end: Option<f64>) -> Result<Self, BoothError> {
        let valid = start >= 0.0 && start.is_finite() && end.map_or(true, |e| e.is_finite() && e > start);
        if !valid {
            return Err(BoothError::InvalidTrim { start, end });
        }
        Ok(Self { start, end })
    }

    /// Resolves the range to a frame window against a track.
    ///
    /// # Errors
    ///
    /// Returns [`BoothError::InvalidTrim`] if `start` lies at or past the
    /// end of the track, or `end` exceeds its duration.
    pub(crate) fn resolve(&self, track: &Track) -> Result<FrameWindow, BoothError> {
        let duration = track.duration().as_secs_f64();
        let end = self.end.unwrap_or(duration);
        if (self.start >= duration && duration > 0.0) || end > duration {
            return Err(BoothError::InvalidTrim {
                start: self.start,
                end: self.end,
            });
        }

        let rate = f64::from(track.sample_rate());
        let start_frame = (self.start * rate) as usize;
        let end_frame = ((end * rate) as usize).min(track.frames());
        Ok(FrameWindow {
            start: start_frame.min(end_frame),
            end: end_frame,
        })
    }
}

/// A resolved `[start, end)` frame window into a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameWindow {
    pub start: usize,
    pub end: usize,
}

impl FrameWindow {
    /// Number of frames in the window.
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn track_secs(secs: f64, sample_rate: u32, channels: u16) -> Track {
        let frames = (secs * f64::from(sample_rate)) as usize;
        Track::from_samples(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    #[test]
    fn test_from_samples_truncates_partial_frame() {
        let track = Track::from_samples(vec![0.0; 5], 44100, 2);
        assert_eq!(track.frames(), 2);
        assert_eq!(track.samples().len(), 4);
    }

    #[test]
    fn test_duration() {
        let track = track_secs(2.0, 44100, 2);
        assert_eq!(track.duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.wav");

        let original = Track::from_samples(vec![0.0, 0.25, -0.5, 1.0], 44100, 2);
        original.save(&path).unwrap();

        let loaded = Track::load(&path).unwrap();
        assert_eq!(loaded.sample_rate(), 44100);
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.samples(), original.samples());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Track::load("/nonexistent/missing.wav").unwrap_err();
        assert!(matches!(err, BoothError::DecodeError { .. }));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not a wav file").unwrap();

        let err = Track::load(&path).unwrap_err();
        assert!(matches!(err, BoothError::DecodeError { .. }));
    }

    #[test]
    fn test_save_bad_directory() {
        let track = Track::from_samples(vec![0.0; 4], 44100, 1);
        let err = track.save("/nonexistent/dir/out.wav").unwrap_err();
        assert!(matches!(err, BoothError::WriteError { .. }));
    }

    #[test]
    fn test_trim_range_rejects_inverted() {
        assert!(TrimRange::new(5.0, Some(2.0)).is_err());
        assert!(TrimRange::new(-1.0, None).is_err());
        assert!(TrimRange::new(0.0, Some(0.0)).is_err());
    }

    #[test]
    fn test_trim_range_accepts_open_end() {
        let range = TrimRange::new(1.5, None).unwrap();
        assert_eq!(range.start, 1.5);
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_resolve_full_track() {
        let track = track_secs(10.0, 1000, 1);
        let window = TrimRange::new(0.0, None).unwrap().resolve(&track).unwrap();
        assert_eq!(window.start, 0);
        assert_eq!(window.end, 10_000);
    }

    #[test]
    fn test_resolve_sub_window() {
        let track = track_secs(10.0, 1000, 1);
        let window = TrimRange::new(2.0, Some(4.5)).unwrap().resolve(&track).unwrap();
        assert_eq!(window.start, 2000);
        assert_eq!(window.end, 4500);
        assert_eq!(window.len(), 2500);
    }

    #[test]
    fn test_resolve_rejects_past_end() {
        let track = track_secs(10.0, 1000, 1);
        let err = TrimRange::new(2.0, Some(11.0)).unwrap().resolve(&track).unwrap_err();
        assert!(matches!(err, BoothError::InvalidTrim { .. }));

        let err = TrimRange::new(12.0, None).unwrap().resolve(&track).unwrap_err();
        assert!(matches!(err, BoothError::InvalidTrim { .. }));
    }

    #[test]
    fn test_trimmed_copies_window() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let track = Track::from_samples(samples, 5, 1);
        // 2 second track at 5 Hz; window [0.2s, 1.0s) = frames [1, 5)
        let trimmed = track.trimmed(TrimRange::new(0.2, Some(1.0)).unwrap()).unwrap();
        assert_eq!(trimmed.samples(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(trimmed.sample_rate(), 5);
    }
}
