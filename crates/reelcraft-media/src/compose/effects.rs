//! Visual effect filters.

use reelcraft_models::{Axis, EffectSpec};
use tracing::warn;

use crate::clip::{MediaClip, VisualOp};
use crate::filters::canvas_filter;

/// Parse effect tokens, warning about and dropping the ones that fail.
pub fn parse_effects<S: AsRef<str>>(tokens: &[S]) -> Vec<EffectSpec> {
    let (effects, rejected) = EffectSpec::parse_tokens(tokens);
    for err in &rejected {
        warn!(error = %err, "Skipping effect");
    }
    effects
}

/// FFmpeg filter for one effect on a clip lasting `duration` seconds.
pub fn effect_filter(effect: &EffectSpec, duration: f64) -> String {
    match effect {
        EffectSpec::Mirror { axis: Axis::X } => "hflip".to_string(),
        EffectSpec::Mirror { axis: Axis::Y } => "vflip".to_string(),
        EffectSpec::Brightness { factor } => {
            format!("colorchannelmixer=rr={f}:gg={f}:bb={f}", f = factor)
        }
        EffectSpec::Contrast { factor } => format!("eq=contrast={}", factor),
        EffectSpec::Blur { radius } => format!("gblur=sigma={}", radius),
        EffectSpec::Grayscale => "hue=s=0".to_string(),
        EffectSpec::Invert => "negate".to_string(),
        EffectSpec::FadeIn { seconds } => {
            format!("fade=t=in:st=0:d={}", seconds.min(duration))
        }
        EffectSpec::FadeOut { seconds } => {
            let d = seconds.min(duration);
            format!("fade=t=out:st={}:d={}", duration - d, d)
        }
    }
}

/// Every visual filter baked into `clip`, in application order.
pub fn visual_filters(clip: &MediaClip) -> Vec<String> {
    let duration = clip.duration();
    clip.visuals()
        .iter()
        .map(|op| match op {
            VisualOp::Effect(effect) => effect_filter(effect, duration),
            VisualOp::Canvas(canvas) => canvas_filter(canvas),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_filters() {
        assert_eq!(effect_filter(&EffectSpec::Mirror { axis: Axis::X }, 5.0), "hflip");
        assert_eq!(effect_filter(&EffectSpec::Mirror { axis: Axis::Y }, 5.0), "vflip");
        assert_eq!(
            effect_filter(&EffectSpec::Brightness { factor: 1.5 }, 5.0),
            "colorchannelmixer=rr=1.5:gg=1.5:bb=1.5"
        );
        assert_eq!(effect_filter(&EffectSpec::Contrast { factor: 1.2 }, 5.0), "eq=contrast=1.2");
        assert_eq!(effect_filter(&EffectSpec::Blur { radius: 3.0 }, 5.0), "gblur=sigma=3");
    }

    #[test]
    fn test_fade_out_clamped_to_duration() {
        assert_eq!(
            effect_filter(&EffectSpec::FadeOut { seconds: 1.0 }, 5.0),
            "fade=t=out:st=4:d=1"
        );
        assert_eq!(
            effect_filter(&EffectSpec::FadeOut { seconds: 8.0 }, 5.0),
            "fade=t=out:st=0:d=5"
        );
    }

    #[test]
    fn test_parse_effects_skips_unknown() {
        let effects = parse_effects(&["brightness-1.5", "sparkle", "contrast-1.2", "blur"]);
        assert_eq!(
            effects,
            vec![
                EffectSpec::Brightness { factor: 1.5 },
                EffectSpec::Contrast { factor: 1.2 }
            ]
        );
    }
}
