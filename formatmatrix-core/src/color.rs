//! Coverage color mapping
//!
//! Red below 50%, blending through yellow to green at 100%.

/// Map a coverage fraction to a `#RRGGBBAA` color.
///
/// Fractions above 1 clamp to 1; negative or NaN fractions clamp to 0.
/// Opacity is clamped to [0, 1] and written as the alpha byte.
pub fn fraction_to_color(fraction: f64, opacity: f64) -> String {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let pct = fraction * 100.0;

    let (r, g) = if pct < 50.0 {
        (255.0, (5.1 * pct).round())
    } else {
        ((510.0 - 5.1 * pct).round(), 255.0)
    };
    let b = 0u8;

    let opacity = if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    };
    let alpha = (255.0 * opacity).round();

    format!(
        "#{:02x}{:02x}{:02x}{:02x}",
        channel(r),
        channel(g),
        b,
        channel(alpha)
    )
}

fn channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(fraction_to_color(0.0, 1.0), "#ff0000ff");
        assert_eq!(fraction_to_color(1.0, 1.0), "#00ff00ff");
    }

    #[test]
    fn test_midpoint_is_yellow() {
        assert_eq!(fraction_to_color(0.5, 1.0), "#ffff00ff");
    }

    #[test]
    fn test_intermediate_fractions() {
        // 5.1 * 30 = 153
        assert_eq!(fraction_to_color(0.3, 1.0), "#ff9900ff");
        // 510 - 5.1 * 80 = 102
        assert_eq!(fraction_to_color(0.8, 1.0), "#66ff00ff");
    }

    #[test]
    fn test_clamps_above_one() {
        assert_eq!(fraction_to_color(3.7, 1.0), fraction_to_color(1.0, 1.0));
        assert_eq!(fraction_to_color(f64::INFINITY, 1.0), "#00ff00ff");
    }

    #[test]
    fn test_clamps_below_zero_and_nan() {
        assert_eq!(fraction_to_color(-0.2, 1.0), "#ff0000ff");
        assert_eq!(fraction_to_color(f64::NAN, 1.0), "#ff0000ff");
    }

    #[test]
    fn test_alpha_channel() {
        assert!(fraction_to_color(1.0, 0.5).ends_with("80"));
        assert!(fraction_to_color(1.0, 0.4).ends_with("66"));
        assert!(fraction_to_color(1.0, 0.0).ends_with("00"));
    }
}
