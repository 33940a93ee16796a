//! Playback session: stream a loaded track to an output device.
//!
//! The output callback runs on an OS real-time thread. The only state it
//! shares with the control/poll thread is held in [`PlaybackShared`]: the
//! cursor, the gain, and the last emitted level, each behind its own
//! short-held lock. The callback performs no I/O and no allocation - it
//! reads straight out of the immutable [`Track`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig};
use parking_lot::Mutex;

use crate::config::DeviceSelection;
use crate::level::level;
use crate::source::OutputDevice;
use crate::track::{FrameWindow, Track, TrimRange};
use crate::BoothError;

/// State shared between the output callback and the control thread.
struct PlaybackShared {
    /// Current frame offset into the track. Invariant:
    /// `window.start <= cursor <= window.end`.
    cursor: Mutex<usize>,
    /// Per-session gain in `[0.0, 1.0]`; read once per callback, so changes
    /// take effect on the next emitted chunk.
    gain: Mutex<f32>,
    /// Level of the most recently emitted chunk, overwrite-only.
    last_level: Mutex<f32>,
    playing: AtomicBool,
}

impl PlaybackShared {
    fn new() -> Self {
        Self {
            cursor: Mutex::new(0),
            gain: Mutex::new(1.0),
            last_level: Mutex::new(0.0),
            playing: AtomicBool::new(false),
        }
    }
}

/// Fills one output buffer from the track.
///
/// Reads up to the requested frames starting at the cursor (never past the
/// window end), applies the current gain, advances the cursor, and
/// zero-pads the tail. When the window is exhausted the playing flag is
/// cleared and the cursor rewinds to the window start.
///
/// Runs on the audio thread: the cursor lock is held only for the
/// read-modify-write, and nothing here blocks or allocates.
fn fill_frames(track: &Track, window: FrameWindow, shared: &PlaybackShared, out: &mut [f32]) {
    if !shared.playing.load(Ordering::SeqCst) {
        out.fill(0.0);
        return;
    }

    let channels = track.channels().max(1) as usize;
    let frames_requested = out.len() / channels;
    let gain = *shared.gain.lock();

    let (start, end) = {
        let mut cursor = shared.cursor.lock();
        let start = (*cursor).clamp(window.start, window.end);
        let end = (start + frames_requested).min(window.end);
        *cursor = end;
        (start, end)
    };

    let emitted = (end - start) * channels;
    let src = &track.samples()[start * channels..end * channels];
    for (dst, &sample) in out.iter_mut().zip(src.iter()) {
        *dst = sample * gain;
    }
    out[emitted..].fill(0.0);

    *shared.last_level.lock() = level(out);

    if end >= window.end {
        // Natural end of stream: rewind for the next play()
        shared.playing.store(false, Ordering::SeqCst);
        *shared.cursor.lock() = window.start;
    }
}

/// Streams a loaded [`Track`] to an output device, honoring gain and an
/// optional trim window, while exposing position and an output level to a
/// poller.
///
/// # Example
///
/// ```ignore
/// let mut session = PlaybackSession::new();
/// session.load("backing.wav")?;
/// session.trim(12.0, Some(45.0))?;
/// session.set_volume(0.8);
/// session.play()?;
///
/// // ... UI polls session.position() / session.output_level() ...
///
/// session.pause()?;   // cursor preserved
/// session.play()?;    // resumes from the same point
/// session.stop();     // cursor back to the window start
/// ```
pub struct PlaybackSession {
    output: DeviceSelection,
    shared: Arc<PlaybackShared>,
    track: Option<Arc<Track>>,
    trim: Option<TrimRange>,
    window: FrameWindow,
    stream: Option<Stream>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    /// Creates a session that plays to the system default output device.
    pub fn new() -> Self {
        Self {
            output: DeviceSelection::SystemDefault,
            shared: Arc::new(PlaybackShared::new()),
            track: None,
            trim: None,
            window: FrameWindow { start: 0, end: 0 },
            stream: None,
        }
    }

    /// Creates a session that plays to a specific output device by name.
    pub fn with_output_device(name: impl Into<String>) -> Self {
        Self {
            output: DeviceSelection::ByName(name.into()),
            ..Self::new()
        }
    }

    /// Decodes an entire file into memory as the session's track.
    ///
    /// Stops any active stream, clears the trim window, and resets the
    /// cursor. A failed load leaves the previous track in place.
    ///
    /// # Errors
    ///
    /// Returns [`BoothError::DecodeError`] on unreadable or corrupt input.
    pub fn load(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), BoothError> {
        let track = Track::load(path)?;

        self.stop_stream();
        self.window = track.full_window();
        self.trim = None;
        self.track = Some(Arc::new(track));
        *self.shared.cursor.lock() = 0;
        *self.shared.last_level.lock() = 0.0;
        Ok(())
    }

    /// The currently loaded track, if any.
    pub fn track(&self) -> Option<&Track> {
        self.track.as_deref()
    }

    /// Duration of the loaded track, or zero when none is loaded.
    pub fn duration(&self) -> Duration {
        self.track.as_deref().map(Track::duration).unwrap_or_default()
    }

    /// Restricts playback to `[start, end)` seconds; `end = None` means "to
    /// the end of the track".
    ///
    /// Stops any active stream and resets the cursor to the window start.
    ///
    /// # Errors
    ///
    /// [`BoothError::NoTrackLoaded`] without a track,
    /// [`BoothError::InvalidTrim`] for an out-of-bounds or inverted range.
    pub fn trim(&mut self, start: f64, end: Option<f64>) -> Result<(), BoothError> {
        let track = self.track.as_deref().ok_or(BoothError::NoTrackLoaded)?;
        let range = TrimRange::new(start, end)?;
        let window = range.resolve(track)?;

        self.stop_stream();
        self.trim = Some(range);
        self.window = window;
        *self.shared.cursor.lock() = window.start;
        Ok(())
    }

    /// Removes the trim window, restoring full-track playback.
    pub fn clear_trim(&mut self) {
        if let Some(window) = self.track.as_deref().map(Track::full_window) {
            self.stop_stream();
            self.window = window;
            *self.shared.cursor.lock() = 0;
        }
        self.trim = None;
    }

    /// The active trim range, if one is set.
    pub fn trim_range(&self) -> Option<TrimRange> {
        self.trim
    }

    /// Opens an output stream and starts (or resumes) playback from the
    /// current cursor.
    ///
    /// # Errors
    ///
    /// [`BoothError::NoTrackLoaded`] without a track, or a device error if
    /// the output stream cannot be opened.
    pub fn play(&mut self) -> Result<(), BoothError> {
        let track = self.track.clone().ok_or(BoothError::NoTrackLoaded)?;

        // Replace any previous stream; the cursor is left untouched so a
        // paused session resumes in place.
        self.stream = None;
        self.shared.playing.store(false, Ordering::SeqCst);

        let device = OutputDevice::open(&self.output)?;
        let config = StreamConfig {
            channels: track.channels(),
            sample_rate: SampleRate(track.sample_rate()),
            buffer_size: BufferSize::Default,
        };

        let window = self.window;
        let data_shared = Arc::clone(&self.shared);
        let err_shared = Arc::clone(&self.shared);
        let stream = device
            .inner()
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_frames(&track, window, &data_shared, out);
                },
                move |err| {
                    tracing::error!(%err, "playback stream error");
                    err_shared.playing.store(false, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| BoothError::DeviceUnavailable {
                name: device.name(),
                reason: e.to_string(),
            })?;

        self.shared.playing.store(true, Ordering::SeqCst);
        if let Err(e) = stream.play() {
            self.shared.playing.store(false, Ordering::SeqCst);
            return Err(BoothError::BackendError(e.to_string()));
        }

        tracing::info!(
            start_frame = *self.shared.cursor.lock(),
            window_frames = self.window.len(),
            "playback started"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Pauses the output stream without resetting the cursor.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the device refuses to pause.
    pub fn pause(&mut self) -> Result<(), BoothError> {
        if let Some(ref stream) = self.stream {
            stream
                .pause()
                .map_err(|e| BoothError::BackendError(e.to_string()))?;
        }
        self.shared.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Stops playback and resets the cursor to the window start.
    ///
    /// Distinct from [`pause()`](Self::pause), which preserves the cursor.
    pub fn stop(&mut self) {
        self.stop_stream();
        *self.shared.cursor.lock() = self.window.start;
        *self.shared.last_level.lock() = 0.0;
    }

    /// Seeks to a position in seconds, clamped into the active window.
    ///
    /// Safe to call while playing or paused.
    ///
    /// # Errors
    ///
    /// [`BoothError::NoTrackLoaded`] without a track.
    pub fn seek(&mut self, seconds: f64) -> Result<(), BoothError> {
        let track = self.track.as_deref().ok_or(BoothError::NoTrackLoaded)?;
        let frame = (seconds.max(0.0) * f64::from(track.sample_rate())) as usize;
        *self.shared.cursor.lock() = frame.clamp(self.window.start, self.window.end);
        Ok(())
    }

    /// Sets the playback gain, clamped to `[0.0, 1.0]`.
    ///
    /// Takes effect on the next emitted chunk - no ramp across the
    /// boundary.
    pub fn set_volume(&mut self, gain: f32) {
        *self.shared.gain.lock() = gain.clamp(0.0, 1.0);
    }

    /// The current playback gain.
    pub fn volume(&self) -> f32 {
        *self.shared.gain.lock()
    }

    /// Current position in seconds (cursor / sample rate).
    pub fn position(&self) -> f64 {
        match self.track.as_deref() {
            Some(track) => *self.shared.cursor.lock() as f64 / f64::from(track.sample_rate()),
            None => 0.0,
        }
    }

    /// Level of the most recently emitted chunk; `0.0` when not playing.
    pub fn output_level(&self) -> f32 {
        if self.is_playing() {
            *self.shared.last_level.lock()
        } else {
            0.0
        }
    }

    /// Returns `true` while the output stream is emitting the track.
    ///
    /// Becomes `false` on pause, stop, natural end-of-stream, or a stream
    /// error.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    /// A copy of the loaded track restricted to the active trim window,
    /// ready for mixdown export.
    ///
    /// # Errors
    ///
    /// [`BoothError::NoTrackLoaded`] without a track.
    pub fn trimmed_track(&self) -> Result<Track, BoothError> {
        let track = self.track.as_deref().ok_or(BoothError::NoTrackLoaded)?;
        match self.trim {
            Some(range) => track.trimmed(range),
            None => Ok(track.clone()),
        }
    }

    fn stop_stream(&mut self) {
        self.stream = None;
        self.shared.playing.store(false, Ordering::SeqCst);
    }
}
