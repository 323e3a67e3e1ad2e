//! Remote stream catalogs and variant choice.
//!
//! Choice is a pure function of the catalog so it can be checked against
//! synthetic catalogs without touching the network.

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// Minimum acceptable height for an adaptive video stream.
pub const DEFAULT_MIN_HEIGHT: u32 = 360;
/// Container required for adaptive video-only streams.
pub const DEFAULT_VIDEO_CONTAINER: &str = "mp4";
/// Container required for adaptive audio-only streams.
pub const DEFAULT_AUDIO_CONTAINER: &str = "webm";

/// What a variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Audio and video in one file
    Progressive,
    VideoOnly,
    AudioOnly,
}

/// One encoded variant offered by a remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Identifier understood by the stream source
    pub id: String,
    pub kind: StreamKind,
    /// Container extension (`mp4`, `webm`, ...)
    pub container: String,
    /// Frame height in pixels, when known
    pub height: Option<u32>,
}

impl StreamVariant {
    pub fn new(id: impl Into<String>, kind: StreamKind, container: impl Into<String>, height: Option<u32>) -> Self {
        Self {
            id: id.into(),
            kind,
            container: container.into(),
            height,
        }
    }
}

/// Every variant of one remote video.
///
/// Variants of each kind are listed best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCatalog {
    /// Stable identifier of the video (used for file naming)
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub variants: Vec<StreamVariant>,
}

/// Rules applied when choosing variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRules {
    pub min_height: u32,
    pub video_container: String,
    pub audio_container: String,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            min_height: DEFAULT_MIN_HEIGHT,
            video_container: DEFAULT_VIDEO_CONTAINER.to_string(),
            audio_container: DEFAULT_AUDIO_CONTAINER.to_string(),
        }
    }
}

/// The variants to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChoice {
    Progressive(StreamVariant),
    Adaptive {
        video: StreamVariant,
        audio: StreamVariant,
    },
}

impl StreamChoice {
    /// Metric label for the selection path.
    pub fn path_label(&self) -> &'static str {
        match self {
            Self::Progressive(_) => "progressive",
            Self::Adaptive { .. } => "adaptive",
        }
    }
}

/// Pick the variants to download from `catalog`.
///
/// 1. The tallest progressive variant with a known height, else the first
///    progressive variant.
/// 2. Otherwise the first video-only and first audio-only variants in the
///    required containers, provided the video reaches `min_height`.
pub fn choose_streams(catalog: &StreamCatalog, rules: &SelectionRules) -> MediaResult<StreamChoice> {
    let progressive = catalog
        .variants
        .iter()
        .filter(|v| v.kind == StreamKind::Progressive);

    let tallest = progressive
        .clone()
        .filter(|v| v.height.is_some())
        .max_by_key(|v| v.height);

    if let Some(variant) = tallest.or_else(|| progressive.clone().next()) {
        return Ok(StreamChoice::Progressive(variant.clone()));
    }

    let video = catalog.variants.iter().find(|v| {
        v.kind == StreamKind::VideoOnly && v.container.eq_ignore_ascii_case(&rules.video_container)
    });
    let audio = catalog.variants.iter().find(|v| {
        v.kind == StreamKind::AudioOnly && v.container.eq_ignore_ascii_case(&rules.audio_container)
    });

    match (video, audio) {
        (Some(video), Some(audio)) => {
            let height = video.height.unwrap_or(0);
            if height < rules.min_height {
                return Err(MediaError::QualityTooLow {
                    height,
                    min_height: rules.min_height,
                });
            }
            Ok(StreamChoice::Adaptive {
                video: video.clone(),
                audio: audio.clone(),
            })
        }
        _ => Err(MediaError::NoPlayableStream(catalog.id.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(variants: Vec<StreamVariant>) -> StreamCatalog {
        StreamCatalog {
            id: "abc123".to_string(),
            title: None,
            variants,
        }
    }

    #[test]
    fn test_prefers_tallest_progressive() {
        let catalog = catalog(vec![
            StreamVariant::new("18", StreamKind::Progressive, "mp4", Some(480)),
            StreamVariant::new("22", StreamKind::Progressive, "mp4", Some(720)),
            StreamVariant::new("137", StreamKind::VideoOnly, "mp4", Some(1080)),
        ]);

        let choice = choose_streams(&catalog, &SelectionRules::default()).unwrap();
        match choice {
            StreamChoice::Progressive(v) => assert_eq!(v.height, Some(720)),
            other => panic!("expected progressive, got {other:?}"),
        }
    }

    #[test]
    fn test_progressive_without_height() {
        let catalog = catalog(vec![
            StreamVariant::new("sd", StreamKind::Progressive, "mp4", None),
            StreamVariant::new("hd", StreamKind::Progressive, "mp4", None),
        ]);

        let choice = choose_streams(&catalog, &SelectionRules::default()).unwrap();
        assert_eq!(choice, StreamChoice::Progressive(catalog.variants[0].clone()));
    }

    #[test]
    fn test_adaptive_pair_respects_containers() {
        let catalog = catalog(vec![
            StreamVariant::new("248", StreamKind::VideoOnly, "webm", Some(1080)),
            StreamVariant::new("136", StreamKind::VideoOnly, "mp4", Some(720)),
            StreamVariant::new("140", StreamKind::AudioOnly, "m4a", None),
            StreamVariant::new("251", StreamKind::AudioOnly, "webm", None),
        ]);

        let choice = choose_streams(&catalog, &SelectionRules::default()).unwrap();
        assert_eq!(choice.path_label(), "adaptive");
        match choice {
            StreamChoice::Adaptive { video, audio } => {
                assert_eq!(video.id, "136");
                assert_eq!(audio.id, "251");
            }
            other => panic!("expected adaptive, got {other:?}"),
        }
    }

    #[test]
    fn test_low_adaptive_quality_rejected() {
        let catalog = catalog(vec![
            StreamVariant::new("133", StreamKind::VideoOnly, "mp4", Some(240)),
            StreamVariant::new("251", StreamKind::AudioOnly, "webm", None),
        ]);

        let err = choose_streams(&catalog, &SelectionRules::default()).unwrap_err();
        assert!(matches!(
            err,
            MediaError::QualityTooLow {
                height: 240,
                min_height: 360
            }
        ));
    }

    #[test]
    fn test_no_playable_stream() {
        let video_only = catalog(vec![StreamVariant::new(
            "136",
            StreamKind::VideoOnly,
            "mp4",
            Some(720),
        )]);

        assert!(matches!(
            choose_streams(&video_only, &SelectionRules::default()),
            Err(MediaError::NoPlayableStream(_))
        ));
        assert!(matches!(
            choose_streams(&catalog(vec![]), &SelectionRules::default()),
            Err(MediaError::NoPlayableStream(_))
        ));
    }
}
