//! Mixdown of a backing track and a recorded take.
//!
//! A stateless, single-shot operation: weight the two inputs by their gain
//! scalars, sum sample-wise, normalize away clipping risk, and write the
//! result at the backing track's sample rate.

use std::path::{Path, PathBuf};

use crate::track::Track;
use crate::BoothError;

/// Peak threshold above which the mix is normalized down.
///
/// Mixes quieter than this pass through untouched.
pub const CLIP_THRESHOLD: f32 = 0.5;

/// Peak value the mix is scaled to when normalization kicks in.
///
/// Leaves safety headroom below full scale.
pub const HEADROOM_PEAK: f32 = 0.95;

/// Mixes a recorded take over a backing track.
///
/// The backing defines the output length and sample rate: a shorter take is
/// zero-padded at the end, a longer one truncated. A mono take over a
/// multi-channel backing is upmixed by duplication; any other channel
/// mismatch is rejected. Gains are clamped to `[0.0, 1.0]`.
///
/// If the mixed peak exceeds [`CLIP_THRESHOLD`], the entire mix is scaled so
/// the new peak is [`HEADROOM_PEAK`] - every sample by the identical factor.
///
/// # Errors
///
/// [`BoothError::SampleRateMismatch`] or [`BoothError::ChannelMismatch`]
/// when the inputs are not time-aligned on the same grid.
pub fn mix_tracks(
    backing: &Track,
    take: &Track,
    backing_gain: f32,
    take_gain: f32,
) -> Result<Track, BoothError> {
    if backing.sample_rate() != take.sample_rate() {
        return Err(BoothError::SampleRateMismatch {
            backing: backing.sample_rate(),
            take: take.sample_rate(),
        });
    }
    let channels = backing.channels();
    let mono_take = take.channels() == 1 && channels > 1;
    if take.channels() != channels && !mono_take {
        return Err(BoothError::ChannelMismatch {
            backing: channels,
            take: take.channels(),
        });
    }

    let backing_gain = backing_gain.clamp(0.0, 1.0);
    let take_gain = take_gain.clamp(0.0, 1.0);

    let ch = channels.max(1) as usize;
    let frames = backing.frames();
    let take_frames = take.frames();

    let mut samples = Vec::with_capacity(frames * ch);
    for frame in 0..frames {
        for c in 0..ch {
            let b = backing.samples()[frame * ch + c];
            let t = if frame < take_frames {
                if mono_take {
                    take.samples()[frame]
                } else {
                    take.samples()[frame * ch + c]
                }
            } else {
                0.0
            };
            samples.push(b * backing_gain + t * take_gain);
        }
    }

    normalize(&mut samples);
    Ok(Track::from_samples(samples, backing.sample_rate(), channels))
}

/// Mixes and writes the result to `path` as a WAV file.
///
/// # Errors
///
/// Mix errors as in [`mix_tracks`], plus [`BoothError::WriteError`] on I/O
/// failure. Failure leaves prior state (the input tracks) intact.
pub fn export_mix(
    backing: &Track,
    take: &Track,
    backing_gain: f32,
    take_gain: f32,
    path: impl AsRef<Path>,
) -> Result<PathBuf, BoothError> {
    let path = path.as_ref();
    let mix = mix_tracks(backing, take, backing_gain, take_gain)?;
    mix.save(path)?;
    tracing::info!(
        path = %path.display(),
        frames = mix.frames(),
        sample_rate = mix.sample_rate(),
        "mix exported"
    );
    Ok(path.to_path_buf())
}

/// Scales the mix down when its peak exceeds the clip threshold.
fn normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |max, &s| max.max(s.abs()));
    if peak > CLIP_THRESHOLD {
        let scale = HEADROOM_PEAK / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
        tracing::debug!(peak, scale, "mix normalized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mono(samples: Vec<f32>) -> Track {
        Track::from_samples(samples, 44100, 1)
    }

    #[test]
    fn test_silent_inputs_give_silent_mix() {
        let backing = mono(vec![0.0; 8]);
        let take = mono(vec![0.0; 8]);
        let mix = mix_tracks(&backing, &take, 1.0, 1.0).unwrap();
        assert_eq!(mix.frames(), 8);
        assert_eq!(mix.sample_rate(), 44100);
        assert!(mix.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_short_take_zero_padded() {
        // Backing [0.2;4] at gain 0.5, take [0.4;2] at gain 1.0:
        // mix = [0.5, 0.5, 0.1, 0.1], peak 0.5 <= threshold, unchanged
        let backing = mono(vec![0.2; 4]);
        let take = mono(vec![0.4; 2]);
        let mix = mix_tracks(&backing, &take, 0.5, 1.0).unwrap();
        let expected = [0.5, 0.5, 0.1, 0.1];
        for (&got, &want) in mix.samples().iter().zip(expected.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_long_take_truncated() {
        let backing = mono(vec![0.1; 2]);
        let take = mono(vec![0.2; 6]);
        let mix = mix_tracks(&backing, &take, 1.0, 1.0).unwrap();
        assert_eq!(mix.frames(), 2);
    }

    #[test]
    fn test_normalization_scales_to_headroom() {
        // Peak 0.8 > 0.5 threshold: every sample scaled by 0.95/0.8
        let backing = mono(vec![0.8, 0.4, -0.8, 0.2]);
        let take = mono(vec![0.0; 4]);
        let mix = mix_tracks(&backing, &take, 1.0, 1.0).unwrap();

        let scale = HEADROOM_PEAK / 0.8;
        let peak = mix.samples().iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert_relative_eq!(peak, HEADROOM_PEAK, epsilon = 1e-6);
        assert_relative_eq!(mix.samples()[1], 0.4 * scale, epsilon = 1e-6);
        assert_relative_eq!(mix.samples()[3], 0.2 * scale, epsilon = 1e-6);
    }

    #[test]
    fn test_quiet_mix_untouched() {
        let backing = mono(vec![0.3, -0.2, 0.1, 0.0]);
        let take = mono(vec![0.0; 4]);
        let mix = mix_tracks(&backing, &take, 1.0, 1.0).unwrap();
        assert_eq!(mix.samples(), backing.samples());
    }

    #[test]
    fn test_peak_exactly_at_threshold_untouched() {
        let backing = mono(vec![CLIP_THRESHOLD; 4]);
        let take = mono(vec![0.0; 4]);
        let mix = mix_tracks(&backing, &take, 1.0, 1.0).unwrap();
        assert_eq!(mix.samples(), backing.samples());
    }

    #[test]
    fn test_gains_clamped() {
        let backing = mono(vec![0.1; 2]);
        let take = mono(vec![0.1; 2]);
        // Gains beyond [0,1] are clamped, not amplified
        let mix = mix_tracks(&backing, &take, 5.0, -1.0).unwrap();
        for &s in mix.samples() {
            assert_relative_eq!(s, 0.1, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mono_take_over_stereo_backing() {
        let backing = Track::from_samples(vec![0.1, 0.2, 0.1, 0.2], 44100, 2);
        let take = mono(vec![0.1, 0.3]);
        let mix = mix_tracks(&backing, &take, 1.0, 1.0).unwrap();
        let expected = [0.2, 0.3, 0.4, 0.5];
        for (&got, &want) in mix.samples().iter().zip(expected.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let backing = mono(vec![0.1; 4]);
        let take = Track::from_samples(vec![0.1; 8], 44100, 2);
        assert!(matches!(
            mix_tracks(&backing, &take, 1.0, 1.0),
            Err(BoothError::ChannelMismatch { backing: 1, take: 2 })
        ));
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let backing = mono(vec![0.1; 4]);
        let take = Track::from_samples(vec![0.1; 4], 48000, 1);
        assert!(matches!(
            mix_tracks(&backing, &take, 1.0, 1.0),
            Err(BoothError::SampleRateMismatch { .. })
        ));
    }

    #[test]
    fn test_export_mix_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mix.wav");

        let backing = mono(vec![0.2; 4]);
        let take = mono(vec![0.1; 4]);
        let written = export_mix(&backing, &take, 1.0, 1.0, &path).unwrap();
        assert_eq!(written, path);

        let loaded = Track::load(&path).unwrap();
        assert_eq!(loaded.frames(), 4);
        for &s in loaded.samples() {
            assert_relative_eq!(s, 0.3, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_export_mix_bad_path() {
        let backing = mono(vec![0.1; 2]);
        let take = mono(vec![0.1; 2]);
        let err = export_mix(&backing, &take, 1.0, 1.0, "/nonexistent/dir/mix.wav").unwrap_err();
        assert!(matches!(err, BoothError::WriteError { .. }));
    }
}
