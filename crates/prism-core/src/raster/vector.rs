//! SVG-backed surfaces: text layers and gradient canvases.
//!
//! Both are expressed as a tiny SVG document, laid out by `usvg` against the
//! shared font database and rasterized by `resvg` into a transparent pixmap
//! of the target size.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};

use crate::error::RasterError;
use crate::fonts::FontRegistry;
use crate::pipeline::{Color, TextAlign, TextBaseline, TextSpec};

/// Characters an XML 1.0 document may carry.
fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r') || (ch >= ' ' && ch != '\u{FFFE}' && ch != '\u{FFFF}')
}

/// Escape markup and drop characters XML cannot represent.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars().filter(|c| is_xml_char(*c)) {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn paint(color: Color) -> String {
    format!("rgb({},{},{})", color.r, color.g, color.b)
}

fn opacity(color: Color) -> f32 {
    color.a as f32 / 255.0
}

fn svg_open(width: u32, height: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )
}

/// SVG document holding a single text run.
pub(crate) fn text_document(width: u32, height: u32, spec: &TextSpec, fonts: &FontRegistry) -> String {
    let face = fonts.resolve(&spec.font_family);
    let anchor = match spec.align {
        TextAlign::Left => "start",
        TextAlign::Center => "middle",
        TextAlign::Right => "end",
    };
    let baseline = match spec.baseline {
        TextBaseline::Top => "text-before-edge",
        TextBaseline::Middle => "central",
    };
    let family = face.family.replace('\'', "");

    let mut svg = svg_open(width, height);
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" font-family="'{}'" font-size="{}" font-weight="{}" fill="{}" fill-opacity="{}" text-anchor="{}" dominant-baseline="{}" xml:space="preserve">{}</text></svg>"#,
        spec.x,
        spec.y,
        escape_xml(&family),
        spec.font_size,
        face.weight,
        paint(spec.color),
        opacity(spec.color),
        anchor,
        baseline,
        escape_xml(&spec.text),
    ));
    svg
}

/// SVG document holding a full-canvas diagonal gradient.
pub(crate) fn gradient_document(width: u32, height: u32, colors: &[Color]) -> String {
    let mut svg = svg_open(width, height);
    svg.push_str(&format!(
        r#"<defs><linearGradient id="bg" gradientUnits="userSpaceOnUse" x1="0" y1="0" x2="{width}" y2="{height}">"#
    ));
    let last = colors.len().saturating_sub(1).max(1) as f32;
    for (i, color) in colors.iter().enumerate() {
        svg.push_str(&format!(
            r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
            i as f32 / last,
            paint(*color),
            opacity(*color)
        ));
    }
    svg.push_str(&format!(
        r#"</linearGradient></defs><rect x="0" y="0" width="{width}" height="{height}" fill="url(#bg)"/></svg>"#
    ));
    svg
}

/// Lay out and rasterize an SVG document into straight-alpha RGBA.
pub(crate) fn rasterize(
    svg: &str,
    width: u32,
    height: u32,
    fonts: &FontRegistry,
) -> Result<RgbaImage, RasterError> {
    let options = usvg::Options {
        fontdb: fonts.database(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| RasterError::Text(format!("invalid layer document: {e}")))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| RasterError::Text(format!("cannot allocate {width}x{height} surface")))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    let mut out = RgbaImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(out)
}
