//! Conversions between 8-bit sRGB and the HSB / Lab / linear models used by
//! curve and temperature layers.

use palette::{FromColor, Hsv, Lab, LinSrgb, Srgb};

use super::temperature::{planckian_xy, xy_to_xyz};

/// Linear sRGB (D65) → XYZ.
pub const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// XYZ → linear sRGB (D65).
pub const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// 8-bit sRGB → (hue degrees in `[0, 360)`, saturation, brightness).
pub fn rgb8_to_hsb(px: [u8; 4]) -> [f32; 3] {
    let rgb = Srgb::new(px[0], px[1], px[2]).into_format::<f32>();
    let hsv: Hsv = Hsv::from_color(rgb);
    [hsv.hue.into_positive_degrees(), hsv.saturation, hsv.value]
}

/// Inverse of [`rgb8_to_hsb`], clamped and rounded to 8 bits.
pub fn hsb_to_rgb8(hsb: [f32; 3]) -> [u8; 3] {
    let hsv: Hsv = Hsv::new(hsb[0], hsb[1].clamp(0.0, 1.0), hsb[2].clamp(0.0, 1.0));
    let rgb: Srgb = Srgb::from_color(hsv);
    to_rgb8(rgb)
}

/// 8-bit sRGB → CIE L*a*b* (D65).
pub fn rgb8_to_lab(px: [u8; 4]) -> [f32; 3] {
    let lin: LinSrgb = Srgb::new(px[0], px[1], px[2]).into_format::<f32>().into_linear();
    let lab: Lab = Lab::from_color(lin);
    [lab.l, lab.a, lab.b]
}

/// Inverse of [`rgb8_to_lab`], clamped and rounded to 8 bits.
pub fn lab_to_rgb8(lab: [f32; 3]) -> [u8; 3] {
    let lab: Lab = Lab::new(lab[0], lab[1], lab[2]);
    let linear: LinSrgb = LinSrgb::from_color(lab);
    to_rgb8(Srgb::from_linear(linear))
}

/// 8-bit sRGB → linear sRGB.
pub fn rgb8_to_linear(px: [u8; 4]) -> [f32; 3] {
    let lin: LinSrgb = Srgb::new(px[0], px[1], px[2]).into_format::<f32>().into_linear();
    [lin.red, lin.green, lin.blue]
}

/// Linear sRGB → 8-bit sRGB, clamped.
pub fn linear_to_rgb8(rgb: [f32; 3]) -> [u8; 3] {
    let lin = LinSrgb::new(
        rgb[0].clamp(0.0, 1.0),
        rgb[1].clamp(0.0, 1.0),
        rgb[2].clamp(0.0, 1.0),
    );
    to_rgb8(Srgb::from_linear(lin))
}

fn to_rgb8(rgb: Srgb) -> [u8; 3] {
    let out: Srgb<u8> = rgb.into_format();
    [out.red, out.green, out.blue]
}

/// Normalized linear sRGB color of a blackbody at `kelvin`.
///
/// The brightest channel is 1.0; negative components (out of gamut at very
/// low temperatures) are clipped to zero.
pub fn blackbody_linear_srgb(kelvin: f64) -> [f32; 3] {
    let (x, y) = planckian_xy(kelvin);
    let xyz = xy_to_xyz(x, y);
    let mut rgb = [0.0f64; 3];
    for (i, row) in XYZ_TO_SRGB.iter().enumerate() {
        rgb[i] = (row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2]).max(0.0);
    }
    let peak = rgb[0].max(rgb[1]).max(rgb[2]).max(1e-12);
    [
        (rgb[0] / peak) as f32,
        (rgb[1] / peak) as f32,
        (rgb[2] / peak) as f32,
    ]
}
