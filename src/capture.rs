//! Live capture session: device input, level metering, take persistence.
//!
//! The capture path keeps a strict thread boundary:
//!
//! ```text
//! CPAL thread → ring buffer → capture bridge task → SampleBuffer
//! ```
//!
//! The device callback only pushes samples into a lock-free ring; a tokio
//! task (the bridge) drains the ring into chunks, updates the input meter,
//! and appends to the bounded take buffer. On stop - manual or deadline -
//! the buffered chunks are concatenated once and written out as a WAV take.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::buffer::{ChunkReader, PushOutcome, SampleBuffer};
use crate::config::{CaptureOptions, DeviceSelection};
use crate::event::{event_callback, EventCallback};
use crate::level::chunk_level;
use crate::naming;
use crate::source::{CaptureStream, InputDevice};
use crate::track::Track;
use crate::{AudioChunk, BoothError, BoothEvent};

/// Seconds of audio the capture ring can absorb before the callback's
/// pushes start failing. The bridge polls far faster than this drains.
const RING_SECONDS: usize = 8;

/// Log a debug progress line every this many chunks.
const PROGRESS_LOG_INTERVAL: u64 = 50;

/// Statistics about a capture session.
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    /// Total chunks accepted into the take buffer or dropped at capacity.
    pub chunks_captured: u64,
    /// Total samples seen by the bridge.
    pub samples_captured: u64,
    /// Chunks dropped because the take buffer was full.
    pub chunks_dropped: u64,
}

/// Internal state shared between the session handle, the bridge task, and
/// the device error callback.
pub(crate) struct CaptureState {
    running: AtomicBool,
    chunks_captured: AtomicU64,
    samples_captured: AtomicU64,
    chunks_dropped: AtomicU64,
    overflow_reported: AtomicBool,
    error_reported: AtomicBool,
    /// Last computed input level, overwrite-only - a meter needs only the
    /// most recent value.
    input_level: Mutex<f32>,
    /// Path written by the deadline auto-stop, if it fired.
    auto_saved: Mutex<Option<PathBuf>>,
}

impl CaptureState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            chunks_captured: AtomicU64::new(0),
            samples_captured: AtomicU64::new(0),
            chunks_dropped: AtomicU64::new(0),
            overflow_reported: AtomicBool::new(false),
            error_reported: AtomicBool::new(false),
            input_level: Mutex::new(0.0),
            auto_saved: Mutex::new(None),
        }
    }
}

/// Builder for configuring and starting a [`CaptureSession`].
///
/// Created via [`CaptureSession::builder()`].
#[must_use]
pub struct CaptureBuilder {
    device: DeviceSelection,
    options: CaptureOptions,
    event_callback: Option<EventCallback>,
}

impl Default for CaptureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBuilder {
    /// Creates a builder with default options (default input device,
    /// 44.1kHz stereo, 600s ceiling).
    pub fn new() -> Self {
        Self {
            device: DeviceSelection::SystemDefault,
            options: CaptureOptions::default(),
            event_callback: None,
        }
    }

    /// Capture from a specific input device by name.
    pub fn input_device(mut self, name: impl Into<String>) -> Self {
        self.device = DeviceSelection::ByName(name.into());
        self
    }

    /// Replace the full option set.
    pub fn options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    /// Directory where the persisted take is written.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_dir = dir.into();
        self
    }

    /// Override the auto-stop ceiling.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.options.max_duration = max_duration;
        self
    }

    /// Set a callback to receive runtime events (overflow, stream errors,
    /// auto-stop).
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(BoothEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    fn validate(&self) -> Result<(), BoothError> {
        if self.options.sample_rate == 0 {
            return Err(BoothError::InvalidConfig {
                reason: "sample_rate must be non-zero".to_string(),
            });
        }
        if self.options.channels == 0 {
            return Err(BoothError::InvalidConfig {
                reason: "channels must be non-zero".to_string(),
            });
        }
        if self.options.chunk_frames == 0 {
            return Err(BoothError::InvalidConfig {
                reason: "chunk_frames must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Opens the input device and starts capturing.
    ///
    /// Returns immediately; capture runs in a background task until
    /// [`stop()`](CaptureSession::stop) or the auto-stop deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the device
    /// cannot be opened at the requested format.
    pub async fn start(self) -> Result<CaptureSession, BoothError> {
        self.validate()?;

        let options = self.options;
        let device = InputDevice::open(&self.device)?;
        let state = Arc::new(CaptureState::new());

        tracing::info!(
            device = %device.name(),
            sample_rate = options.sample_rate,
            channels = options.channels,
            max_secs = options.max_duration.as_secs(),
            "starting capture"
        );

        // Runtime stream errors cannot unwind through the audio callback;
        // convert to a one-shot event and stop the session.
        let err_state = Arc::clone(&state);
        let err_callback = self.event_callback.clone();
        let on_error = move |reason: String| {
            tracing::error!(%reason, "capture stream error");
            err_state.running.store(false, Ordering::SeqCst);
            if !err_state.error_reported.swap(true, Ordering::SeqCst) {
                if let Some(ref callback) = err_callback {
                    callback(BoothEvent::StreamError { reason });
                }
            }
        };

        let ring_capacity =
            options.sample_rate as usize * options.channels as usize * RING_SECONDS;
        let (stream, consumer) = device.start_capture(
            options.sample_rate,
            options.channels,
            ring_capacity,
            on_error,
        )?;

        let reader = ChunkReader::new(
            consumer,
            options.sample_rate,
            options.channels,
            options.chunk_frames,
        );
        let buffer = SampleBuffer::for_duration(options.max_duration, options.chunk_duration());
        // Poll at half the chunk duration for responsiveness
        let poll_interval = (options.chunk_duration() / 2).max(Duration::from_millis(1));

        let bridge = CaptureBridge {
            reader,
            buffer,
            state: Arc::clone(&state),
            event_callback: self.event_callback,
            options: options.clone(),
            deadline: Instant::now() + options.max_duration,
            poll_interval,
        };
        let bridge_handle = tokio::spawn(bridge.run());

        Ok(CaptureSession {
            state,
            options,
            bridge: Some(bridge_handle),
            stream: Some(stream),
            started_at: Instant::now(),
        })
    }
}

/// Handle to a running capture session.
///
/// Returned by [`CaptureBuilder::start()`]. Capture runs in the background
/// until [`stop()`](Self::stop) is called or the auto-stop deadline fires;
/// meanwhile the UI poller reads [`input_level()`](Self::input_level) and
/// [`elapsed()`](Self::elapsed).
///
/// # Example
///
/// ```ignore
/// let session = CaptureSession::builder()
///     .output_dir("/tmp/takes")
///     .on_event(|e| tracing::warn!(?e, "capture event"))
///     .start()
///     .await?;
///
/// // ... meter polls session.input_level() ...
///
/// match session.stop(true).await? {
///     Some(path) => println!("take saved to {}", path.display()),
///     None => println!("nothing recorded"),
/// }
/// ```
pub struct CaptureSession {
    state: Arc<CaptureState>,
    options: CaptureOptions,
    bridge: Option<JoinHandle<Option<SampleBuffer>>>,
    // Keep the capture stream alive - dropping it stops CPAL
    stream: Option<CaptureStream>,
    started_at: Instant,
}

impl CaptureSession {
    /// Creates a builder for configuring a capture session.
    pub fn builder() -> CaptureBuilder {
        CaptureBuilder::new()
    }

    /// Returns `true` while the session is capturing.
    ///
    /// Becomes `false` after `stop()`, the auto-stop deadline, or a stream
    /// error.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Most recent input meter level in `[0.0, 1.0]`, last-write-wins.
    pub fn input_level(&self) -> f32 {
        *self.state.input_level.lock()
    }

    /// Wall-clock time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current session statistics.
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            chunks_captured: self.state.chunks_captured.load(Ordering::SeqCst),
            samples_captured: self.state.samples_captured.load(Ordering::SeqCst),
            chunks_dropped: self.state.chunks_dropped.load(Ordering::SeqCst),
        }
    }

    /// Stops the session, optionally persisting the take.
    ///
    /// Halts the device stream, then awaits the bridge task with a bounded
    /// timeout so the caller cannot hang. With `persist = true` the buffered
    /// chunks are concatenated and written to
    /// `<output_dir>/vocal_take_<timestamp>_omotiv.wav`; `Ok(Some(path))` is
    /// the written file. `Ok(None)` means nothing was recorded (no empty
    /// file is written) or the take was deliberately discarded.
    ///
    /// If the auto-stop deadline fired first, the take was already persisted
    /// by the background task and its path is returned without writing a
    /// second file.
    ///
    /// # Errors
    ///
    /// [`ShutdownTimeout`](BoothError::ShutdownTimeout) if the bridge does
    /// not acknowledge shutdown in time, or a
    /// [`WriteError`](BoothError::WriteError) from persisting.
    pub async fn stop(mut self, persist: bool) -> Result<Option<PathBuf>, BoothError> {
        self.state.running.store(false, Ordering::SeqCst);
        // Dropping the CPAL stream stops the device callback
        self.stream.take();

        let Some(handle) = self.bridge.take() else {
            return Ok(None);
        };
        let outcome = tokio::time::timeout(self.options.stop_timeout, handle)
            .await
            .map_err(|_| BoothError::ShutdownTimeout)?
            .map_err(|e| BoothError::BackendError(format!("capture task failed: {e}")))?;

        let Some(buffer) = outcome else {
            // Deadline fired first; the bridge already persisted the take.
            return Ok(self.state.auto_saved.lock().clone());
        };

        if !persist {
            tracing::info!(
                discarded_chunks = buffer.len(),
                "capture stopped, take discarded"
            );
            return Ok(None);
        }

        if buffer.is_empty() {
            tracing::info!("capture stopped, nothing recorded");
            return Ok(None);
        }

        let path = persist_take(
            buffer,
            self.options.sample_rate,
            self.options.channels,
            &self.options.output_dir,
        )
        .await?;
        Ok(Some(path))
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Session dropped without explicit stop() - the bridge exits on its
        // next poll and the stream stops when the handle is freed.
        self.state.running.store(false, Ordering::SeqCst);
    }
}

/// The capture bridge drains the device ring into the bounded take buffer.
struct CaptureBridge {
    reader: ChunkReader,
    buffer: SampleBuffer,
    state: Arc<CaptureState>,
    event_callback: Option<EventCallback>,
    options: CaptureOptions,
    deadline: Instant,
    poll_interval: Duration,
}

impl CaptureBridge {
    /// Runs until stopped or the deadline expires.
    ///
    /// Returns the take buffer for the caller to persist, or `None` when
    /// the deadline path already persisted it.
    async fn run(mut self) -> Option<SampleBuffer> {
        let mut interval = tokio::time::interval(self.poll_interval);

        while self.state.running.load(Ordering::SeqCst) {
            interval.tick().await;

            while let Some(chunk) = self.reader.try_read_chunk() {
                self.absorb(chunk);
            }

            if Instant::now() >= self.deadline {
                return self.finish_deadline().await;
            }
        }

        // Drain whatever the callback pushed before the stream stopped
        for chunk in self.reader.drain() {
            self.absorb(chunk);
        }
        Some(self.buffer)
    }

    /// Meters a chunk and appends it to the take buffer.
    fn absorb(&mut self, chunk: AudioChunk) {
        *self.state.input_level.lock() = chunk_level(&chunk);

        self.state
            .samples_captured
            .fetch_add(chunk.samples.len() as u64, Ordering::SeqCst);
        let chunks = self.state.chunks_captured.fetch_add(1, Ordering::SeqCst);
        if chunks % PROGRESS_LOG_INTERVAL == 0 {
            tracing::debug!(
                chunk = chunks,
                samples = chunk.samples.len(),
                ts = ?chunk.timestamp,
                "capture progress"
            );
        }

        match self.buffer.push(chunk) {
            PushOutcome::Stored => {}
            PushOutcome::Dropped => {
                self.state.chunks_dropped.fetch_add(1, Ordering::SeqCst);
                // Report the overflow once per session, not once per chunk
                if !self.state.overflow_reported.swap(true, Ordering::SeqCst) {
                    let capacity_secs = self.options.max_duration.as_secs();
                    tracing::warn!(capacity_secs, "take buffer full, dropping further audio");
                    self.emit(BoothEvent::CaptureOverflow { capacity_secs });
                }
            }
        }
    }

    /// Deadline path: stop, drain, persist, report. Fires at most once.
    async fn finish_deadline(mut self) -> Option<SampleBuffer> {
        self.state.running.store(false, Ordering::SeqCst);
        for chunk in self.reader.drain() {
            self.absorb(chunk);
        }

        tracing::warn!(
            max_secs = self.options.max_duration.as_secs(),
            "capture deadline reached, auto-stopping"
        );

        let CaptureBridge {
            buffer,
            state,
            event_callback,
            options,
            ..
        } = self;

        let path = if buffer.is_empty() {
            None
        } else {
            match persist_take(buffer, options.sample_rate, options.channels, &options.output_dir)
                .await
            {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist auto-stopped take");
                    None
                }
            }
        };

        *state.auto_saved.lock() = path.clone();
        if let Some(ref callback) = event_callback {
            callback(BoothEvent::CaptureAutoStopped { path });
        }
        None
    }

    fn emit(&self, event: BoothEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

/// Concatenates a take buffer and writes it as a timestamped WAV file.
///
/// The write runs on the blocking thread pool.
async fn persist_take(
    buffer: SampleBuffer,
    sample_rate: u32,
    channels: u16,
    output_dir: &Path,
) -> Result<PathBuf, BoothError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let path = output_dir.join(naming::take_file_name(timestamp));

    let track = Track::from_samples(buffer.concat(), sample_rate, channels);
    let write_path = path.clone();
    tokio::task::spawn_blocking(move || track.save(&write_path))
        .await
        .map_err(|e| BoothError::BackendError(format!("persist task panicked: {e}")))??;

    tracing::info!(path = %path.display(), "take persisted");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Producer, Split};
    use ringbuf::HeapRb;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    fn test_options(output_dir: &Path) -> CaptureOptions {
        CaptureOptions {
            sample_rate: 1000,
            channels: 1,
            chunk_frames: 100,
            max_duration: Duration::from_secs(600),
            stop_timeout: Duration::from_secs(3),
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn bridge_with_ring(
        options: CaptureOptions,
        max_chunks: usize,
        deadline: Instant,
        event_callback: Option<EventCallback>,
    ) -> (ringbuf::HeapProd<f32>, CaptureBridge, Arc<CaptureState>) {
        let ring = HeapRb::<f32>::new(100_000);
        let (producer, consumer) = ring.split();
        let reader = ChunkReader::new(
            consumer,
            options.sample_rate,
            options.channels,
            options.chunk_frames,
        );
        let state = Arc::new(CaptureState::new());
        let bridge = CaptureBridge {
            reader,
            buffer: SampleBuffer::with_max_chunks(max_chunks),
            state: Arc::clone(&state),
            event_callback,
            options,
            deadline,
            poll_interval: Duration::from_millis(1),
        };
        (producer, bridge, state)
    }

    #[test]
    fn test_capture_state_new() {
        let state = CaptureState::new();
        assert!(state.running.load(Ordering::SeqCst));
        assert_eq!(state.chunks_captured.load(Ordering::SeqCst), 0);
        assert_eq!(*state.input_level.lock(), 0.0);
        assert!(state.auto_saved.lock().is_none());
    }

    #[test]
    fn test_builder_rejects_zero_rate() {
        let builder = CaptureSession::builder().options(CaptureOptions {
            sample_rate: 0,
            ..Default::default()
        });
        assert!(matches!(
            builder.validate(),
            Err(BoothError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_zero_chunk_frames() {
        let builder = CaptureSession::builder().options(CaptureOptions {
            chunk_frames: 0,
            ..Default::default()
        });
        assert!(matches!(
            builder.validate(),
            Err(BoothError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_persist_take_writes_wav() {
        let dir = tempdir().unwrap();
        let mut buffer = SampleBuffer::with_max_chunks(4);
        buffer.push(AudioChunk::new(vec![0.5; 200], Duration::ZERO, 1000, 1));

        let path = persist_take(buffer, 1000, 1, dir.path()).await.unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("vocal_take_"));
        assert!(name.ends_with("_omotiv.wav"));

        let track = Track::load(&path).unwrap();
        assert_eq!(track.sample_rate(), 1000);
        assert_eq!(track.frames(), 200);
    }

    #[tokio::test]
    async fn test_bridge_drains_on_stop() {
        let dir = tempdir().unwrap();
        let options = test_options(dir.path());
        let far_deadline = Instant::now() + Duration::from_secs(600);
        let (mut producer, bridge, state) = bridge_with_ring(options, 100, far_deadline, None);

        // 2.5 chunks of audio
        for _ in 0..250 {
            let _ = producer.try_push(0.25);
        }

        let handle = tokio::spawn(bridge.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        state.running.store(false, Ordering::SeqCst);

        let buffer = handle.await.unwrap().expect("manual stop returns buffer");
        assert_eq!(buffer.frames(), 250);
        assert!(*state.input_level.lock() > 0.0);
    }

    #[tokio::test]
    async fn test_bridge_overflow_reported_once() {
        let dir = tempdir().unwrap();
        let options = test_options(dir.path());
        let far_deadline = Instant::now() + Duration::from_secs(600);

        let overflow_events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&overflow_events);
        let callback = event_callback(move |event| {
            if matches!(event, BoothEvent::CaptureOverflow { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Capacity of 2 chunks, push 4 chunks worth
        let (mut producer, bridge, state) =
            bridge_with_ring(options, 2, far_deadline, Some(callback));
        for _ in 0..400 {
            let _ = producer.try_push(0.1);
        }

        let handle = tokio::spawn(bridge.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        state.running.store(false, Ordering::SeqCst);

        let buffer = handle.await.unwrap().unwrap();
        // Only the first 2 chunks are retained
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.frames(), 200);
        assert_eq!(overflow_events.load(Ordering::SeqCst), 1);
        assert_eq!(state.chunks_dropped.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bridge_deadline_persists_take() {
        let dir = tempdir().unwrap();
        let options = test_options(dir.path());
        // Deadline already expired: first poll takes the auto-stop path
        let deadline = Instant::now();

        let auto_stop_paths = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&auto_stop_paths);
        let callback = event_callback(move |event| {
            if let BoothEvent::CaptureAutoStopped { path } = event {
                sink.lock().push(path);
            }
        });

        let (mut producer, bridge, state) = bridge_with_ring(options, 100, deadline, Some(callback));
        for _ in 0..100 {
            let _ = producer.try_push(0.3);
        }

        let outcome = bridge.run().await;
        assert!(outcome.is_none(), "deadline path consumes the buffer");
        assert!(!state.running.load(Ordering::SeqCst));

        let saved = state.auto_saved.lock().clone().expect("take persisted");
        assert!(saved.exists());

        let events = auto_stop_paths.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_deref(), Some(saved.as_path()));
    }

    #[tokio::test]
    async fn test_bridge_deadline_with_nothing_recorded() {
        let dir = tempdir().unwrap();
        let options = test_options(dir.path());
        let (_producer, bridge, state) = bridge_with_ring(options, 100, Instant::now(), None);

        let outcome = bridge.run().await;
        assert!(outcome.is_none());
        assert!(state.auto_saved.lock().is_none());
    }
}
