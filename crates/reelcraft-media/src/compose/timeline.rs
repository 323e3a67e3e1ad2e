//! Timeline arithmetic: retiming and audio duration reconciliation.

use crate::clip::AudioTrack;
use crate::command::FfmpegInput;
use crate::error::{MediaError, MediaResult};

/// Range a single `atempo` instance accepts without artifacts.
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Upper bound on loop repetitions for one audio bind.
pub const MAX_AUDIO_REPEATS: u32 = 10_000;

/// Video retiming filter for `speed`.
pub fn setpts_filter(speed: f64) -> String {
    if speed == 1.0 {
        "setpts=PTS-STARTPTS".to_string()
    } else {
        format!("setpts=(PTS-STARTPTS)/{}", speed)
    }
}

/// Split `speed` into factors each within the `atempo` range.
pub fn atempo_factors(speed: f64) -> Vec<f64> {
    let mut factors = Vec::new();
    let mut remaining = speed;

    while remaining > ATEMPO_MAX {
        factors.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        factors.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    if (remaining - 1.0).abs() > 1e-9 {
        factors.push(remaining);
    }

    factors
}

/// Audio retiming filters matching `setpts_filter(speed)`.
pub fn atempo_filters(speed: f64) -> Vec<String> {
    atempo_factors(speed)
        .into_iter()
        .map(|f| format!("atempo={}", f))
        .collect()
}

/// How an audio track is conformed to a target duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFit {
    /// Composition duration the track is conformed to
    pub target: f64,
    /// Playable length of one pass of the track
    pub pass_length: f64,
    /// Passes played back to back before truncation
    pub repeats: u32,
}

impl AudioFit {
    /// Loop or truncate a track of `track_duration` to exactly `target`.
    ///
    /// Passes are concatenated with a hard cut at each seam.
    pub fn reconcile(track_duration: f64, target: f64) -> MediaResult<Self> {
        if !track_duration.is_finite() || track_duration <= 0.0 {
            return Err(MediaError::invalid_parameter(format!(
                "audio duration must be > 0, got {track_duration}"
            )));
        }
        if !target.is_finite() || target <= 0.0 {
            return Err(MediaError::invalid_parameter(format!(
                "target duration must be > 0, got {target}"
            )));
        }

        let repeats = if track_duration >= target {
            1.0
        } else {
            (target / track_duration).ceil()
        };

        if repeats > MAX_AUDIO_REPEATS as f64 {
            return Err(MediaError::invalid_parameter(format!(
                "{track_duration}s audio would need {repeats} loops to cover {target}s"
            )));
        }

        Ok(Self {
            target,
            pass_length: track_duration,
            repeats: repeats as u32,
        })
    }

    /// Duration after reconciliation; always the target.
    pub fn duration(&self) -> f64 {
        self.target
    }

    /// Length of the concatenation before truncation.
    pub fn concatenated_length(&self) -> f64 {
        self.pass_length * self.repeats as f64
    }

    pub fn is_looped(&self) -> bool {
        self.repeats > 1
    }

    pub fn is_truncated(&self) -> bool {
        self.concatenated_length() > self.target
    }
}

/// An audio track bound to a composition.
#[derive(Debug, Clone)]
pub struct BoundAudio {
    pub track: AudioTrack,
    pub fit: AudioFit,
}

impl BoundAudio {
    pub fn bind(track: AudioTrack, target: f64) -> MediaResult<Self> {
        let fit = AudioFit::reconcile(track.duration(), target)?;
        Ok(Self { track, fit })
    }

    pub fn duration(&self) -> f64 {
        self.fit.duration()
    }

    /// FFmpeg inputs producing the passes.
    ///
    /// Without an offset a single input is looped with `-stream_loop`. With
    /// one, `-stream_loop` would restart at the file start, so each pass
    /// gets its own seeked input.
    pub fn inputs(&self) -> Vec<FfmpegInput> {
        let path = self.track.path();
        let offset = self.track.offset();

        if offset == 0.0 {
            let input = FfmpegInput::new(path);
            if self.fit.is_looped() {
                vec![input.stream_loop(self.fit.repeats - 1)]
            } else {
                vec![input]
            }
        } else {
            (0..self.fit.repeats)
                .map(|_| FfmpegInput::new(path).seek(offset))
                .collect()
        }
    }

    /// Filter chain reading inputs from `first_input` and writing `[out]`.
    pub fn filter(&self, first_input: usize, out: &str) -> String {
        let input_count = self.inputs().len();
        let head = if input_count == 1 {
            format!("[{}:a]", first_input)
        } else {
            let labels: String = (first_input..first_input + input_count)
                .map(|i| format!("[{}:a]", i))
                .collect();
            format!("{}concat=n={}:v=0:a=1,", labels, input_count)
        };

        format!(
            "{}atrim=end={},asetpts=PTS-STARTPTS,volume={}[{}]",
            head,
            self.fit.target,
            self.track.volume(),
            out
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_truncates_long_track() {
        let fit = AudioFit::reconcile(12.0, 5.0).unwrap();
        assert_eq!(fit.repeats, 1);
        assert!(fit.is_truncated());
        assert!(!fit.is_looped());
        assert_eq!(fit.duration(), 5.0);
    }

    #[test]
    fn test_reconcile_loops_short_track() {
        let fit = AudioFit::reconcile(3.0, 5.0).unwrap();
        assert_eq!(fit.repeats, 2);
        assert_eq!(fit.concatenated_length(), 6.0);
        assert!(fit.is_truncated());
        assert_eq!(fit.duration(), 5.0);
    }

    #[test]
    fn test_reconcile_exact_length() {
        let fit = AudioFit::reconcile(5.0, 5.0).unwrap();
        assert_eq!(fit.repeats, 1);
        assert!(!fit.is_truncated());
    }

    #[test]
    fn test_reconcile_duration_always_target() {
        for (a, v) in [(0.7, 10.0), (2.5, 7.5), (30.0, 1.25), (1.0, 1.0), (0.4, 9.9)] {
            let fit = AudioFit::reconcile(a, v).unwrap();
            assert_eq!(fit.duration(), v);
            assert!(fit.concatenated_length() >= v);
            assert!(fit.concatenated_length() - a < v || fit.repeats == 1);
        }
    }

    #[test]
    fn test_reconcile_rejects_bad_input() {
        assert!(AudioFit::reconcile(0.0, 5.0).is_err());
        assert!(AudioFit::reconcile(3.0, 0.0).is_err());
        assert!(AudioFit::reconcile(1e-6, 3600.0).is_err());
    }

    #[test]
    fn test_atempo_factors_within_range() {
        assert!(atempo_factors(1.0).is_empty());
        assert_eq!(atempo_factors(2.0), vec![2.0]);
        assert_eq!(atempo_factors(4.0), vec![2.0, 2.0]);
        assert_eq!(atempo_factors(0.25), vec![0.5, 0.5]);

        for speed in [0.1, 0.3, 0.75, 1.5, 3.0, 5.0, 10.0] {
            let factors = atempo_factors(speed);
            let product: f64 = factors.iter().product();
            assert!((product - speed).abs() < 1e-9);
            assert!(factors.iter().all(|f| (ATEMPO_MIN..=ATEMPO_MAX).contains(f)));
        }
    }

    #[test]
    fn test_setpts_filter() {
        assert_eq!(setpts_filter(1.0), "setpts=PTS-STARTPTS");
        assert_eq!(setpts_filter(2.0), "setpts=(PTS-STARTPTS)/2");
    }
}
