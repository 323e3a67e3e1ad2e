//! Shared data models for the Reelcraft composition pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Encoding configuration
//! - Visual effects and their token syntax
//! - Image/video overlays and caption text
//! - Render job manifests and publish requests

pub mod effect;
pub mod encoding;
pub mod job;
pub mod overlay;
pub mod text;

// Re-export common types
pub use effect::{Axis, EffectParseError, EffectSpec};
pub use encoding::EncodingConfig;
pub use job::{AudioChoice, AudioRequest, InteractionFlags, OverlayRequest, PublishSpec, RenderJob, TrimWindow, Visibility};
pub use overlay::{CanvasSpec, OverlayPlacement, Position};
pub use text::TextOverlaySpec;
