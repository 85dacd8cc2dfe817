//! Color math for faking erase previews against arbitrary backgrounds.
//!
//! Colors here are `[r, g, b, a]` with channels in `0..=255` and alpha in
//! `0.0..=1.0`, matching CSS `rgba()` notation.

use crate::shapes::SerializableColor;

/// A CSS-style color: 8-bit range channels and unit alpha, as floats.
pub type RgbaF = [f64; 4];

/// Composite `top` over `bottom` with the over operator.
///
/// Returns transparent black when both inputs are fully transparent.
pub fn composite_colors(bottom: RgbaF, top: RgbaF) -> RgbaF {
    let (a1, a2) = (bottom[3], top[3]);
    let alpha = a2 + a1 * (1.0 - a2);
    if alpha <= 0.0 {
        return [0.0; 4];
    }

    let mut out = [0.0, 0.0, 0.0, alpha];
    for i in 0..3 {
        out[i] = (top[i] * a2 + bottom[i] * a1 * (1.0 - a2)) / alpha;
    }
    out
}

/// Split `rgba(r, g, b, a)` into its components.
///
/// `rgb(r, g, b)` is accepted with alpha 1. Returns `None` on malformed input.
pub fn rgba_to_array(css: &str) -> Option<RgbaF> {
    let css = css.trim();
    let (body, has_alpha) = if let Some(rest) = css.strip_prefix("rgba(") {
        (rest, true)
    } else {
        (css.strip_prefix("rgb(")?, false)
    };
    let body = body.strip_suffix(')')?;

    let parts = body
        .split(',')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match (parts.as_slice(), has_alpha) {
        ([r, g, b, a], true) => Some([*r, *g, *b, *a]),
        ([r, g, b], false) => Some([*r, *g, *b, 1.0]),
        _ => None,
    }
}

/// Format components as `rgba(r, g, b, a)`, rounding channels to integers and
/// alpha to three decimals.
pub fn array_to_rgba(color: RgbaF) -> String {
    format!(
        "rgba({:.0}, {:.0}, {:.0}, {:.3})",
        color[0], color[1], color[2], color[3]
    )
}

/// Convert to float components.
pub fn to_rgba_f(color: SerializableColor) -> RgbaF {
    [
        color.r as f64,
        color.g as f64,
        color.b as f64,
        color.a as f64 / 255.0,
    ]
}

/// Convert float components back to 8-bit, clamping.
pub fn from_rgba_f(color: RgbaF) -> SerializableColor {
    let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    SerializableColor::new(
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        channel(color[3] * 255.0),
    )
}

/// Parse a CSS color in hex or `rgb()`/`rgba()` notation.
pub fn parse_css_color(css: &str) -> Option<SerializableColor> {
    SerializableColor::from_hex(css).or_else(|| rgba_to_array(css).map(from_rgba_f))
}

/// The color seen through a transparent layer: `background` over opaque white.
pub fn precomposite_over_white(background: SerializableColor) -> SerializableColor {
    from_rgba_f(composite_colors([255.0, 255.0, 255.0, 1.0], to_rgba_f(background)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: RgbaF, b: RgbaF) {
        for i in 0..4 {
            assert!((a[i] - b[i]).abs() < 0.001, "{a:?} is not close to {b:?} (at index {i})");
        }
    }

    #[test]
    fn test_rgba_to_array() {
        assert_close(rgba_to_array("rgba(1, 2, 3, 0.1)").unwrap(), [1.0, 2.0, 3.0, 0.1]);
        assert_close(rgba_to_array("rgb(10,20,30)").unwrap(), [10.0, 20.0, 30.0, 1.0]);
        assert_eq!(rgba_to_array("rgba(1, 2, 3)"), None);
        assert_eq!(rgba_to_array("hsl(1, 2%, 3%)"), None);
    }

    #[test]
    fn test_array_to_rgba() {
        assert_eq!(array_to_rgba([1.0, 2.0, 3.0, 0.1]), "rgba(1, 2, 3, 0.100)");
        assert_eq!(array_to_rgba([1.2, 6.7, 2.9, 0.123567]), "rgba(1, 7, 3, 0.124)");
    }

    #[test]
    fn test_composite_colors() {
        let result = composite_colors([1.0, 1.0, 200.0, 0.7], [2.0, 255.0, 100.0, 0.5]);
        assert_close(result, [1.588, 150.412, 141.176, 0.85]);
    }

    #[test]
    fn test_composite_fully_transparent() {
        assert_eq!(composite_colors([9.0, 9.0, 9.0, 0.0], [1.0, 1.0, 1.0, 0.0]), [0.0; 4]);
    }

    #[test]
    fn test_precomposite_over_white() {
        let half_black = SerializableColor::new(0, 0, 0, 128);
        let seen = precomposite_over_white(half_black);
        assert_eq!(seen.a, 255);
        assert!((126..=128).contains(&seen.r));
        assert_eq!(precomposite_over_white(SerializableColor::transparent()), SerializableColor::white());
    }

    #[test]
    fn test_parse_css_color() {
        assert_eq!(parse_css_color("#fff"), Some(SerializableColor::white()));
        assert_eq!(
            parse_css_color("rgba(255, 0, 0, 0.5)"),
            Some(SerializableColor::new(255, 0, 0, 128))
        );
        assert_eq!(parse_css_color("tomato"), None);
    }
}
