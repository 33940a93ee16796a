//! # omotiv-audio
//!
//! Audio engine for the Omotiv recording booth: live capture with level
//! metering, trim-bounded playback, and gain-weighted mixdown export.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use omotiv_audio::{export_mix, CaptureSession, PlaybackSession, Track};
//!
//! // Record a take (auto-stops and persists after the 600s ceiling)
//! let capture = CaptureSession::builder()
//!     .output_dir("/tmp/takes")
//!     .on_event(|e| tracing::warn!(?e, "capture event"))
//!     .start()
//!     .await?;
//! // ... meter polls capture.input_level() ...
//! let take_path = capture.stop(true).await?.expect("nothing recorded");
//!
//! // Audition the backing track against a trim window
//! let mut playback = PlaybackSession::new();
//! playback.load("backing.wav")?;
//! playback.trim(12.0, Some(45.0))?;
//! playback.play()?;
//!
//! // Export the mixdown of the trimmed backing and the recorded take
//! let take = Track::load(&take_path)?;
//! export_mix(&playback.trimmed_track()?, &take, 0.8, 1.0, "mix.wav")?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary around the OS audio layer:
//!
//! - **CPAL threads**: real-time callbacks that never block - capture pushes
//!   into a lock-free ring, playback reads straight out of the immutable
//!   track under a short-held cursor lock
//! - **Capture bridge**: a tokio task drains the ring into chunks, meters
//!   them, and fills the bounded take buffer
//! - **Control thread**: starts/stops sessions and polls position/level on
//!   its own schedule; every accessor is a short critical section
//!
//! Persisted files follow the booth's naming conventions (see [`naming`]).

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod buffer;
mod capture;
mod chunk;
mod config;
mod error;
mod event;
mod level;
mod mix;
pub mod naming;
mod playback;
mod track;

pub mod source;

pub use buffer::{PushOutcome, SampleBuffer};
pub use capture::{CaptureBuilder, CaptureSession, CaptureStats};
pub use chunk::AudioChunk;
pub use config::{CaptureOptions, DeviceSelection};
pub use error::BoothError;
pub use event::{event_callback, BoothEvent, EventCallback};
pub use level::{chunk_level, level, METER_GAIN};
pub use mix::{export_mix, mix_tracks, CLIP_THRESHOLD, HEADROOM_PEAK};
pub use playback::PlaybackSession;
pub use source::{
    default_input_device_name, default_output_device_name, list_input_devices,
    list_output_devices, CaptureStream, DeviceInfo, InputDevice, OutputDevice,
};
pub use track::{Track, TrimRange};
