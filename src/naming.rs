//! Output file naming conventions.
//!
//! The booth's persisted files follow fixed patterns that downstream tooling
//! matches on, so they are kept here in one place:
//!
//! - recorded takes: `vocal_take_<timestamp>_omotiv.wav`
//! - stem-removal exports: `<basename>-no_<instrument>-omotiv<ext>`

use std::path::Path;

/// File name for a recorded vocal take.
///
/// `timestamp` is a Unix timestamp in seconds, making concurrent takes from
/// the same session sortable and unique.
///
/// # Example
///
/// ```
/// use omotiv_audio::naming::take_file_name;
///
/// assert_eq!(take_file_name(1700000000), "vocal_take_1700000000_omotiv.wav");
/// ```
pub fn take_file_name(timestamp: u64) -> String {
    format!("vocal_take_{timestamp}_omotiv.wav")
}

/// File name for a stem-removal export derived from `source`.
///
/// The removed instrument is embedded in the name; the source extension is
/// preserved, defaulting to `.wav` when the source has none.
///
/// # Example
///
/// ```
/// use omotiv_audio::naming::stem_file_name;
/// use std::path::Path;
///
/// assert_eq!(
///     stem_file_name(Path::new("song.mp3"), "vocals"),
///     "song-no_vocals-omotiv.mp3"
/// );
/// ```
pub fn stem_file_name(source: &Path, instrument: &str) -> String {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".wav".to_string());
    format!("{base}-no_{instrument}-omotiv{ext}")
}
