//! FFmpeg filter fragments and escaping.

use reelcraft_models::CanvasSpec;

/// Escape a value for an option inside a filter (`key=value:key=value`).
pub fn escape_option_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Escape a filter description for embedding in a filter graph.
pub fn escape_graph(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Fully escape a value that ends up inside `-filter_complex`.
pub fn escape_filter_value(value: &str) -> String {
    escape_graph(&escape_option_value(value))
}

/// Escape caption text for `drawtext`, which also expands `%{...}`.
pub fn escape_drawtext(text: &str) -> String {
    escape_graph(&escape_option_value(text).replace('%', "\\%"))
}

/// Scale into the canvas keeping aspect ratio, then pad to the exact size.
pub fn canvas_filter(canvas: &CanvasSpec) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease:force_divisible_by=2,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={bg},setsar=1",
        w = canvas.width,
        h = canvas.height,
        bg = escape_filter_value(&canvas.background),
    )
}
