//! RGB ↔ HSL conversion.
//!
//! The color channel of the fixture speaks RGB on the wire while the host
//! exposes hue and saturation. Outbound colors are always produced at
//! [`OUTBOUND_LIGHTNESS`]; inbound RGB is converted back and its lightness
//! dropped. The round trip therefore keeps hue and saturation but not the
//! absolute channel values: `(128, 0, 0)` is read as hue 0 / saturation 100
//! and written back as `(255, 0, 0)`.

use serde::{Deserialize, Serialize};

/// Lightness used for every outbound color (lightness is not exposed).
pub const OUTBOUND_LIGHTNESS: u8 = 50;

/// An 8-bit-per-channel RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color in HSL space: hue in degrees `0..=360`, saturation and lightness
/// in percent `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Hsl {
    #[must_use]
    pub const fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }
}

/// Convert an HSL color to RGB.
///
/// Inputs are expected to be in range; callers validate host values first.
#[must_use]
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let h = f64::from(hsl.hue) / 360.0;
    let s = f64::from(hsl.saturation) / 100.0;
    let l = f64::from(hsl.lightness) / 100.0;

    if s == 0.0 {
        let v = to_byte(l);
        return Rgb::new(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    Rgb::new(
        to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_to_channel(p, q, h)),
        to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
    )
}

/// Convert an RGB color to HSL.
#[must_use]
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if rgb.r == rgb.g && rgb.g == rgb.b {
        return Hsl::new(0, 0, to_percent(l));
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if rgb.r >= rgb.g && rgb.r >= rgb.b {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if rgb.g >= rgb.b {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } / 6.0;

    Hsl::new(to_degrees(h), to_percent(s), to_percent(l))
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(unit: f64) -> u8 {
    (unit * 100.0).round().clamp(0.0, 100.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_degrees(unit: f64) -> u16 {
    (unit * 360.0).round().clamp(0.0, 360.0) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbound(hue: u16, saturation: u8) -> Rgb {
        hsl_to_rgb(Hsl::new(hue, saturation, OUTBOUND_LIGHTNESS))
    }

    #[test]
    fn should_convert_primary_red_to_hsl() {
        assert_eq!(rgb_to_hsl(Rgb::new(255, 0, 0)), Hsl::new(0, 100, 50));
    }

    #[test]
    fn should_convert_primary_green_to_hsl() {
        assert_eq!(rgb_to_hsl(Rgb::new(0, 255, 0)), Hsl::new(120, 100, 50));
    }

    #[test]
    fn should_convert_primary_blue_to_hsl() {
        assert_eq!(rgb_to_hsl(Rgb::new(0, 0, 255)), Hsl::new(240, 100, 50));
    }

    #[test]
    fn should_convert_grey_to_zero_saturation() {
        let hsl = rgb_to_hsl(Rgb::new(128, 128, 128));
        assert_eq!(hsl.hue, 0);
        assert_eq!(hsl.saturation, 0);
        assert_eq!(hsl.lightness, 50);
    }

    #[test]
    fn should_convert_primaries_to_rgb_at_half_lightness() {
        assert_eq!(outbound(0, 100), Rgb::new(255, 0, 0));
        assert_eq!(outbound(120, 100), Rgb::new(0, 255, 0));
        assert_eq!(outbound(240, 100), Rgb::new(0, 0, 255));
        assert_eq!(outbound(360, 100), Rgb::new(255, 0, 0));
    }

    #[test]
    fn should_produce_grey_when_saturation_is_zero() {
        assert_eq!(outbound(200, 0), Rgb::new(128, 128, 128));
    }

    #[test]
    fn should_convert_secondary_colors_to_rgb() {
        assert_eq!(outbound(60, 100), Rgb::new(255, 255, 0));
        assert_eq!(outbound(180, 100), Rgb::new(0, 255, 255));
        assert_eq!(outbound(300, 100), Rgb::new(255, 0, 255));
    }

    #[test]
    fn should_keep_channel_ratios_when_round_tripping_dim_color() {
        // Lightness is dropped on the way in and forced to 50 on the way out.
        let hsl = rgb_to_hsl(Rgb::new(128, 0, 0));
        assert_eq!((hsl.hue, hsl.saturation), (0, 100));
        assert_eq!(outbound(hsl.hue, hsl.saturation), Rgb::new(255, 0, 0));

        let hsl = rgb_to_hsl(Rgb::new(0, 64, 64));
        assert_eq!((hsl.hue, hsl.saturation), (180, 100));
        assert_eq!(outbound(hsl.hue, hsl.saturation), Rgb::new(0, 255, 255));
    }

    #[test]
    fn should_round_trip_hue_and_saturation_within_one_step() {
        for hue in (0..360).step_by(15) {
            for saturation in [20_u8, 50, 80, 100] {
                let rgb = outbound(hue, saturation);
                let back = rgb_to_hsl(rgb);
                assert!(
                    back.hue.abs_diff(hue) <= 1 || back.hue.abs_diff(hue) >= 359,
                    "hue {hue} came back as {}",
                    back.hue
                );
                assert!(
                    back.saturation.abs_diff(saturation) <= 1,
                    "saturation {saturation} came back as {}",
                    back.saturation
                );
                assert!(back.lightness.abs_diff(OUTBOUND_LIGHTNESS) <= 1);
            }
        }
    }
}
