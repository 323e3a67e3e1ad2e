//! Visual effect definitions.
//!
//! Effects arrive from callers as `name` or `name-value` tokens
//! (`mirror_x`, `brightness-1.5`, `blur-3`). They are parsed once into the
//! closed [`EffectSpec`] enum so the composition engine never dispatches on
//! strings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Flip left/right
    X,
    /// Flip top/bottom
    Y,
}

/// A single visual effect with its parameters.
///
/// Order matters when several effects are applied: the sequence is
/// preserved exactly as requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectSpec {
    Mirror { axis: Axis },
    /// Multiply every color channel by `factor`.
    Brightness { factor: f64 },
    /// Scale contrast around mid-gray by `factor`.
    Contrast { factor: f64 },
    /// Gaussian blur with the given radius in pixels.
    Blur { radius: f64 },
    Grayscale,
    Invert,
    /// Fade in from black over the first `seconds`.
    FadeIn { seconds: f64 },
    /// Fade out to black over the last `seconds`.
    FadeOut { seconds: f64 },
}

impl EffectSpec {
    /// Effect name as used in tokens.
    pub fn name(&self) -> &'static str {
        match self {
            EffectSpec::Mirror { axis: Axis::X } => "mirror_x",
            EffectSpec::Mirror { axis: Axis::Y } => "mirror_y",
            EffectSpec::Brightness { .. } => "brightness",
            EffectSpec::Contrast { .. } => "contrast",
            EffectSpec::Blur { .. } => "blur",
            EffectSpec::Grayscale => "grayscale",
            EffectSpec::Invert => "invert",
            EffectSpec::FadeIn { .. } => "fadein",
            EffectSpec::FadeOut { .. } => "fadeout",
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), EffectParseError> {
        let (value, ok) = match *self {
            EffectSpec::Brightness { factor } => (factor, factor.is_finite() && factor >= 0.0),
            EffectSpec::Contrast { factor } => {
                (factor, factor.is_finite() && (-1000.0..=1000.0).contains(&factor))
            }
            EffectSpec::Blur { radius } => (radius, radius.is_finite() && radius > 0.0),
            EffectSpec::FadeIn { seconds } | EffectSpec::FadeOut { seconds } => {
                (seconds, seconds.is_finite() && seconds > 0.0)
            }
            EffectSpec::Mirror { .. } | EffectSpec::Grayscale | EffectSpec::Invert => return Ok(()),
        };

        if ok {
            Ok(())
        } else {
            Err(EffectParseError::InvalidValue {
                name: self.name().to_string(),
                value: value.to_string(),
            })
        }
    }

    /// Parse a list of tokens, separating accepted effects from rejected tokens.
    ///
    /// Rejected tokens never abort the batch; the caller decides how to report them.
    pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> (Vec<EffectSpec>, Vec<EffectParseError>) {
        let mut effects = Vec::with_capacity(tokens.len());
        let mut rejected = Vec::new();

        for token in tokens {
            match token.as_ref().parse::<EffectSpec>() {
                Ok(effect) => effects.push(effect),
                Err(e) => rejected.push(e),
            }
        }

        (effects, rejected)
    }
}

impl fmt::Display for EffectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectSpec::Brightness { factor } | EffectSpec::Contrast { factor } => {
                write!(f, "{}-{}", self.name(), factor)
            }
            EffectSpec::Blur { radius } => write!(f, "{}-{}", self.name(), radius),
            EffectSpec::FadeIn { seconds } | EffectSpec::FadeOut { seconds } => {
                write!(f, "{}-{}", self.name(), seconds)
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

impl FromStr for EffectSpec {
    type Err = EffectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        let (name, value) = match token.split_once('-') {
            Some((name, value)) => (name, Some(value)),
            None => (token.as_str(), None),
        };

        let number = |value: Option<&str>| -> Result<f64, EffectParseError> {
            let raw = value.ok_or_else(|| EffectParseError::MissingValue(name.to_string()))?;
            raw.parse::<f64>().map_err(|_| EffectParseError::InvalidValue {
                name: name.to_string(),
                value: raw.to_string(),
            })
        };
        let flag = |effect: EffectSpec| -> Result<EffectSpec, EffectParseError> {
            match value {
                None => Ok(effect),
                Some(v) => Err(EffectParseError::UnexpectedValue {
                    name: name.to_string(),
                    value: v.to_string(),
                }),
            }
        };

        let effect = match name {
            "mirror_x" | "mirrorx" => flag(EffectSpec::Mirror { axis: Axis::X })?,
            "mirror_y" | "mirrory" => flag(EffectSpec::Mirror { axis: Axis::Y })?,
            "grayscale" | "greyscale" => flag(EffectSpec::Grayscale)?,
            "invert" => flag(EffectSpec::Invert)?,
            "brightness" => EffectSpec::Brightness { factor: number(value)? },
            "contrast" => EffectSpec::Contrast { factor: number(value)? },
            "blur" => EffectSpec::Blur { radius: number(value)? },
            "fadein" => EffectSpec::FadeIn { seconds: number(value)? },
            "fadeout" => EffectSpec::FadeOut { seconds: number(value)? },
            _ => return Err(EffectParseError::UnknownEffect(s.to_string())),
        };

        effect.validate()?;
        Ok(effect)
    }
}

/// Reasons an effect token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectParseError {
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    #[error("Effect {0} requires a value (e.g. {0}-1.5)")]
    MissingValue(String),

    #[error("Invalid value for effect {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Effect {name} takes no value, got {value}")]
    UnexpectedValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_effects() {
        assert_eq!("mirror_x".parse::<EffectSpec>(), Ok(EffectSpec::Mirror { axis: Axis::X }));
        assert_eq!("MIRROR_Y".parse::<EffectSpec>(), Ok(EffectSpec::Mirror { axis: Axis::Y }));
        assert_eq!("grayscale".parse::<EffectSpec>(), Ok(EffectSpec::Grayscale));
    }

    #[test]
    fn test_parse_valued_effects() {
        assert_eq!(
            "brightness-1.5".parse::<EffectSpec>(),
            Ok(EffectSpec::Brightness { factor: 1.5 })
        );
        assert_eq!("blur-3".parse::<EffectSpec>(), Ok(EffectSpec::Blur { radius: 3.0 }));
        assert_eq!("fadeout-0.5".parse::<EffectSpec>(), Ok(EffectSpec::FadeOut { seconds: 0.5 }));
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(
            "sparkle".parse::<EffectSpec>(),
            Err(EffectParseError::UnknownEffect("sparkle".to_string()))
        );
        assert_eq!(
            "blur".parse::<EffectSpec>(),
            Err(EffectParseError::MissingValue("blur".to_string()))
        );
        assert!(matches!(
            "contrast-abc".parse::<EffectSpec>(),
            Err(EffectParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "blur-0".parse::<EffectSpec>(),
            Err(EffectParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "invert-2".parse::<EffectSpec>(),
            Err(EffectParseError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn test_parse_tokens_keeps_order_and_skips_unknown() {
        let tokens = ["contrast-1.2", "wobble", "brightness-1.5", "mirror_x"];
        let (effects, rejected) = EffectSpec::parse_tokens(&tokens);

        assert_eq!(
            effects,
            vec![
                EffectSpec::Contrast { factor: 1.2 },
                EffectSpec::Brightness { factor: 1.5 },
                EffectSpec::Mirror { axis: Axis::X },
            ]
        );
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_display_matches_token_syntax() {
        assert_eq!(EffectSpec::Brightness { factor: 1.5 }.to_string(), "brightness-1.5");
        assert_eq!(EffectSpec::Mirror { axis: Axis::Y }.to_string(), "mirror_y");
    }

    #[test]
    fn test_serde_tagged_form() {
        let json = serde_json::to_string(&EffectSpec::Blur { radius: 2.0 }).unwrap();
        assert_eq!(json, r#"{"type":"blur","radius":2.0}"#);
    }
}
