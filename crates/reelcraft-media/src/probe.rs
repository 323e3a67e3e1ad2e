//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Fallback frame rate when a stream reports none.
const DEFAULT_FPS: f64 = 30.0;

/// Media file information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds (0 for still images)
    pub duration: f64,
    /// Width in pixels (0 without a video stream)
    pub width: u32,
    /// Height in pixels (0 without a video stream)
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec, if any
    pub video_codec: Option<String>,
    /// Audio codec, if any
    pub audio_codec: Option<String>,
    /// File size in bytes
    pub size: u64,
    /// Bitrate in bits/second
    pub bitrate: u64,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file for information.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Turn FFprobe JSON into [`MediaInfo`].
fn parse_probe_output(json: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

    if video_stream.is_none() && audio_stream.is_none() {
        return Err(MediaError::FfprobeFailed {
            message: "No audio or video stream found".to_string(),
            stderr: None,
        });
    }

    // Container duration first, then the longest stream duration
    let duration = parse_f64(probe.format.duration.as_deref())
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| parse_f64(s.duration.as_deref()))
                .reduce(f64::max)
        })
        .unwrap_or(0.0);

    let fps = video_stream
        .and_then(|v| v.avg_frame_rate.as_deref().and_then(parse_frame_rate))
        .or_else(|| video_stream.and_then(|v| v.r_frame_rate.as_deref().and_then(parse_frame_rate)))
        .unwrap_or(DEFAULT_FPS);

    Ok(MediaInfo {
        duration,
        width: video_stream.and_then(|v| v.width).unwrap_or(0),
        height: video_stream.and_then(|v| v.height).unwrap_or(0),
        fps,
        video_codec: video_stream.map(|v| v.codec_name.clone().unwrap_or_default()),
        audio_codec: audio_stream.map(|a| a.codec_name.clone().unwrap_or_default()),
        size: probe.format.size.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0),
        bitrate: probe.format.bit_rate.as_deref().and_then(|b| b.parse().ok()).unwrap_or(0),
    })
}

fn parse_f64(s: Option<&str>) -> Option<f64> {
    s.and_then(|s| s.parse::<f64>().ok()).filter(|d| d.is_finite() && *d >= 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_video_with_audio() {
        let json = br#"{
            "format": {"duration": "10.000000", "size": "1048576", "bit_rate": "838860"},
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
                 "r_frame_rate": "30/1", "avg_frame_rate": "30/1"},
                {"codec_type": "audio", "codec_name": "aac"}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 10.0).abs() < 1e-9);
        assert_eq!((info.width, info.height), (1280, 720));
        assert!(info.has_video());
        assert!(info.has_audio());
        assert_eq!(info.size, 1_048_576);
    }

    #[test]
    fn test_parse_audio_only_uses_stream_duration() {
        let json = br#"{
            "format": {},
            "streams": [{"codec_type": "audio", "codec_name": "mp3", "duration": "3.5"}]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_video());
        assert!((info.duration - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_streamless_file() {
        let json = br#"{"format": {}, "streams": []}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::FfprobeFailed { .. })
        ));
    }
}
