//! Per-document raw development state.

use serde::{Deserialize, Serialize};

use super::multipliers::{RawMetadata, check_positive, derive_multipliers, normalize};
use crate::color::sliders::{self, TEMPERATURE, TINT};
use crate::color::space::{hsb_to_rgb8, rgb8_to_hsb};
use crate::color::{
    Matrix3, invert_matrix, rgb_multipliers_to_temperature_and_tint,
    temperature_and_tint_to_rgb_multipliers,
};
use crate::config::AutoCurveConfig;
use crate::error::{Error, Result};
use crate::histogram;
use crate::image::PixelBuffer;
use crate::lut1d::{ChannelCurves, Lut1D, brightness_curve, build_auto_contrast_curve};

/// Default contrast correction of a freshly opened raw file.
const DEFAULT_CONTRAST: f64 = 5.0;
/// Exposure correction bounds in EV.
const EXPOSURE_RANGE: (f64, f64) = (-2.0, 3.0);

/// Source of the white balance used by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalance {
    /// Decoder-estimated from image statistics.
    Auto,
    /// As-shot camera gains.
    #[default]
    Camera,
    /// Gains derived from the user temperature and tint.
    User,
}

/// Parameters handed to the raw decoder for one development pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessParams {
    pub white_balance: WhiteBalance,
    /// Gains to use when `white_balance` is [`WhiteBalance::User`].
    pub user_multipliers: Option<[f64; 4]>,
    /// Linear exposure gain, `2^EV`.
    pub exposure_shift: f64,
    pub preserve_highlights: bool,
    /// Decoder highlight recovery mode, 0 (clip) to 9.
    pub highlight_mode: u8,
    /// Let the decoder choose the exposure from the histogram.
    pub auto_brightness: bool,
}

/// External raw decoding library.
pub trait RawDecoder {
    fn metadata(&self) -> Result<RawMetadata>;

    /// Demosaics and white-balances the raw data into an 8-bit buffer.
    fn postprocess(&mut self, params: &PostProcessParams) -> Result<PixelBuffer>;
}

/// Development parameters of one raw document.
///
/// Setters validate their argument and compute every derived value before
/// committing, so a failed call leaves the state untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDevelopment {
    meta: RawMetadata,
    inverse_sensor: Matrix3,
    camera_white: [f64; 3],
    as_shot: [f64; 4],
    camera_temperature: f64,
    camera_tint: f64,
    base_tint: f64,
    temperature: f64,
    tint: f64,
    exposure: f64,
    highlight_mode: u8,
    contrast: f64,
    saturation: f64,
    brightness: f64,
    white_balance: WhiteBalance,
    auto_brightness: bool,
    preserve_highlights: bool,
    multipliers: [f64; 4],
    sampled: bool,
}

impl RawDevelopment {
    /// Reads the as-shot temperature and tint from the camera gains.
    ///
    /// Fails with [`Error::SingularMatrix`] if the sensor matrix cannot be
    /// inverted.
    pub fn new(meta: RawMetadata) -> Result<Self> {
        let inverse_sensor = invert_matrix(&meta.xyz_to_camera)?;
        let camera_white = meta.camera_white()?;
        let multipliers = meta.normalized_camera_multipliers()?;
        let (camera_temperature, camera_tint) = rgb_multipliers_to_temperature_and_tint(
            camera_white[0],
            camera_white[1],
            camera_white[2],
            &inverse_sensor,
        )?;
        tracing::debug!(
            "As-shot white balance: {camera_temperature:.0} K, tint {camera_tint:.4}"
        );

        let mut dev = Self {
            meta,
            inverse_sensor,
            camera_white,
            as_shot: multipliers,
            camera_temperature,
            camera_tint,
            base_tint: camera_tint,
            temperature: camera_temperature,
            tint: 1.0,
            exposure: 0.0,
            highlight_mode: 0,
            contrast: DEFAULT_CONTRAST,
            saturation: 0.0,
            brightness: 1.0,
            white_balance: WhiteBalance::Camera,
            auto_brightness: true,
            preserve_highlights: true,
            multipliers,
            sampled: false,
        };
        dev.set_defaults();
        Ok(dev)
    }

    /// Resets every correction to the as-shot state.
    pub fn set_defaults(&mut self) {
        self.base_tint = self.camera_tint;
        self.temperature = self.camera_temperature;
        self.tint = 1.0;
        self.exposure = 0.0;
        self.highlight_mode = 0;
        self.contrast = DEFAULT_CONTRAST;
        self.saturation = 0.0;
        self.brightness = 1.0;
        self.white_balance = WhiteBalance::Camera;
        self.auto_brightness = true;
        self.preserve_highlights = true;
        self.sampled = false;
        self.multipliers = self.as_shot;
    }

    pub fn metadata(&self) -> &RawMetadata {
        &self.meta
    }

    /// Camera RGB → XYZ matrix.
    pub fn inverse_sensor(&self) -> &Matrix3 {
        &self.inverse_sensor
    }

    pub fn camera_temperature(&self) -> f64 {
        self.camera_temperature
    }

    pub fn camera_tint(&self) -> f64 {
        self.camera_tint
    }

    pub fn base_tint(&self) -> f64 {
        self.base_tint
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Tint correction factor relative to the base tint.
    pub fn tint(&self) -> f64 {
        self.tint
    }

    pub fn exposure(&self) -> f64 {
        self.exposure
    }

    pub fn highlight_mode(&self) -> u8 {
        self.highlight_mode
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn white_balance(&self) -> WhiteBalance {
        self.white_balance
    }

    pub fn auto_brightness(&self) -> bool {
        self.auto_brightness
    }

    pub fn preserve_highlights(&self) -> bool {
        self.preserve_highlights
    }

    /// Current raw gains (R, G, B, G2), minimum primary gain 1.
    pub fn multipliers(&self) -> [f64; 4] {
        self.multipliers
    }

    /// True when the current gains were sampled from the image.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    pub fn set_white_balance(&mut self, mode: WhiteBalance) {
        self.white_balance = mode;
    }

    pub fn set_auto_brightness(&mut self, on: bool) {
        self.auto_brightness = on;
    }

    pub fn set_preserve_highlights(&mut self, on: bool) {
        self.preserve_highlights = on;
    }

    /// Sets the user temperature and switches to user white balance.
    ///
    /// The base tint is recomputed so the green/red ratio of the as-shot
    /// white point is kept at the new temperature.
    pub fn set_temperature(&mut self, kelvin: f64) -> Result<()> {
        let max = 2000.0 + f64::from(TEMPERATURE.max * TEMPERATURE.max);
        Error::check_range("temperature", kelvin, 2000.0, max)?;

        let white = temperature_and_tint_to_rgb_multipliers(kelvin, 1.0, &self.inverse_sensor)?;
        let base_tint = self.camera_white[1] / self.camera_white[0] * white[0] / white[1];
        let multipliers = derive_multipliers(
            kelvin,
            self.tint,
            base_tint,
            &self.inverse_sensor,
            &self.meta.daylight_multipliers,
        )?;

        self.temperature = kelvin;
        self.base_tint = base_tint;
        self.commit_user_multipliers(multipliers);
        Ok(())
    }

    /// Sets the tint correction and switches to user white balance.
    pub fn set_tint(&mut self, tint: f64) -> Result<()> {
        let max = 0.1 + 0.0125 * f64::from(TINT.max);
        Error::check_range("tint", tint, 0.1, max)?;
        let multipliers = derive_multipliers(
            self.temperature,
            tint,
            self.base_tint,
            &self.inverse_sensor,
            &self.meta.daylight_multipliers,
        )?;
        self.tint = tint;
        self.commit_user_multipliers(multipliers);
        Ok(())
    }

    /// Installs gains sampled from a neutral image region.
    ///
    /// The temperature and base tint are recomputed from the gains and the
    /// tint correction returns to 1.
    pub fn set_raw_multipliers(&mut self, r: f64, g: f64, b: f64) -> Result<()> {
        check_positive("raw multiplier", &[r, g, b])?;
        let m = normalize([r, g, b, g])?;
        let daylight = &self.meta.daylight_multipliers;
        let (temperature, base_tint) = rgb_multipliers_to_temperature_and_tint(
            daylight[0] / m[0],
            daylight[1] / m[1],
            daylight[2] / m[2],
            &self.inverse_sensor,
        )?;

        self.temperature = temperature;
        self.base_tint = base_tint;
        self.tint = 1.0;
        self.commit_user_multipliers(m);
        self.sampled = true;
        Ok(())
    }

    fn commit_user_multipliers(&mut self, multipliers: [f64; 4]) {
        tracing::debug!(
            "White balance {:.0} K, tint {:.4}: multipliers {multipliers:?}",
            self.temperature,
            self.base_tint * self.tint
        );
        self.multipliers = multipliers;
        self.white_balance = WhiteBalance::User;
        self.sampled = false;
    }

    pub fn set_exposure(&mut self, ev: f64) -> Result<()> {
        let (lo, hi) = EXPOSURE_RANGE;
        Error::check_range("exposure", ev, lo, hi)?;
        self.exposure = ev;
        Ok(())
    }

    pub fn set_highlight_mode(&mut self, mode: u8) -> Result<()> {
        sliders::highlight_to_slider(mode)?;
        self.highlight_mode = mode;
        Ok(())
    }

    pub fn set_contrast(&mut self, contrast: f64) -> Result<()> {
        Error::check_range("contrast", contrast, 0.0, f64::from(sliders::CONTRAST.max))?;
        self.contrast = contrast;
        Ok(())
    }

    pub fn set_saturation(&mut self, saturation: f64) -> Result<()> {
        Error::check_range("saturation", saturation, -50.0, 50.0)?;
        self.saturation = saturation;
        Ok(())
    }

    pub fn set_brightness(&mut self, brightness: f64) -> Result<()> {
        let lo = sliders::slider_to_brightness(sliders::BRIGHTNESS.min)?;
        let hi = sliders::slider_to_brightness(sliders::BRIGHTNESS.max)?;
        Error::check_range("brightness", brightness, lo, hi)?;
        self.brightness = brightness;
        Ok(())
    }

    pub fn set_temperature_slider(&mut self, v: i32) -> Result<()> {
        self.set_temperature(sliders::slider_to_temperature(v)?)
    }

    pub fn set_tint_slider(&mut self, v: i32) -> Result<()> {
        self.set_tint(sliders::slider_to_tint(v)?)
    }

    pub fn set_exposure_slider(&mut self, v: i32) -> Result<()> {
        self.set_exposure(sliders::slider_to_exposure(v)?)
    }

    pub fn set_highlight_slider(&mut self, v: i32) -> Result<()> {
        self.set_highlight_mode(sliders::slider_to_highlight(v)?)
    }

    pub fn set_contrast_slider(&mut self, v: i32) -> Result<()> {
        self.set_contrast(sliders::slider_to_contrast(v)?)
    }

    pub fn set_saturation_slider(&mut self, v: i32) -> Result<()> {
        self.set_saturation(sliders::slider_to_saturation(v)?)
    }

    pub fn set_brightness_slider(&mut self, v: i32) -> Result<()> {
        self.set_brightness(sliders::slider_to_brightness(v)?)
    }

    /// Decoder parameters for the current state.
    ///
    /// Exposure and highlight recovery are left to the decoder while auto
    /// brightness is on.
    pub fn postprocess_params(&self) -> PostProcessParams {
        let manual_exposure = !self.auto_brightness;
        PostProcessParams {
            white_balance: self.white_balance,
            user_multipliers: (self.white_balance == WhiteBalance::User)
                .then_some(self.multipliers),
            exposure_shift: if manual_exposure {
                self.exposure.exp2()
            } else {
                1.0
            },
            preserve_highlights: self.preserve_highlights,
            highlight_mode: if manual_exposure { self.highlight_mode } else { 0 },
            auto_brightness: self.auto_brightness,
        }
    }

    /// Tone curve combining the automatic contrast curve and brightness.
    ///
    /// `histogram` is the 256-bin luma histogram of the decoded image. The
    /// contrast correction sets the strength of the automatic curve
    /// (`contrast / 20`); brightness is applied after it as a power curve.
    pub fn tone_curve(&self, histogram: &[u32], cfg: &AutoCurveConfig) -> Result<Lut1D> {
        let strength = self.contrast / f64::from(sliders::CONTRAST.max);
        let contrast = build_auto_contrast_curve(histogram, strength, cfg)?;
        Ok(contrast.then(&brightness_curve(self.brightness)?))
    }

    /// Applies the tone curve and saturation correction to a decoded image.
    pub fn finish(&self, decoded: &PixelBuffer, cfg: &AutoCurveConfig) -> Result<PixelBuffer> {
        let hist = histogram::compute(decoded);
        let curve = self.tone_curve(hist.luma(), cfg)?;
        let mut out = ChannelCurves::master(curve).apply(decoded);

        if self.saturation != 0.0 {
            let gain = 1.0 + (self.saturation / 50.0) as f32;
            for px in out.pixels.iter_mut() {
                let [h, s, v] = rgb8_to_hsb(*px);
                let rgb = hsb_to_rgb8([h, (s * gain).clamp(0.0, 1.0), v]);
                *px = [rgb[0], rgb[1], rgb[2], px[3]];
            }
        }
        Ok(out)
    }

    /// Runs the decoder with the current parameters and finishes the result.
    pub fn develop<D: RawDecoder + ?Sized>(
        &self,
        decoder: &mut D,
        cfg: &AutoCurveConfig,
    ) -> Result<PixelBuffer> {
        let params = self.postprocess_params();
        let decoded = decoder.postprocess(&params)?;
        tracing::debug!(
            "Raw postprocess produced {}x{} image",
            decoded.width,
            decoded.height
        );
        self.finish(&decoded, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::space::XYZ_TO_SRGB;

    const EPSILON: f64 = 1e-6;

    /// Metadata of a camera whose sensor is exactly linear sRGB, shot at
    /// 5000 K.
    fn meta() -> RawMetadata {
        let inverse = invert_matrix(&XYZ_TO_SRGB).expect("invertible");
        let white = temperature_and_tint_to_rgb_multipliers(5000.0, 1.0, &inverse).expect("valid");
        let daylight = [2.0, 1.0, 1.5, 1.0];
        RawMetadata {
            camera_multipliers: [
                daylight[0] / white[0],
                daylight[1] / white[1],
                daylight[2] / white[2],
                daylight[1] / white[1],
            ],
            daylight_multipliers: daylight,
            xyz_to_camera: XYZ_TO_SRGB,
        }
    }

    fn assert_normalized(m: [f64; 4]) {
        let min = m[0].min(m[1]).min(m[2]);
        assert!((min - 1.0).abs() < 1e-12, "minimum primary of {m:?} is 1");
    }

    #[test]
    fn test_new_reads_as_shot_values() {
        let dev = RawDevelopment::new(meta()).expect("valid metadata");
        assert!((dev.camera_temperature() - 5000.0).abs() < 1e-3 * 5000.0);
        assert!((dev.camera_tint() - 1.0).abs() < 1e-3);
        assert_eq!(dev.white_balance(), WhiteBalance::Camera);
        assert_eq!(dev.contrast(), DEFAULT_CONTRAST);
        assert!(dev.auto_brightness() && dev.preserve_highlights());
        assert_normalized(dev.multipliers());
    }

    #[test]
    fn test_singular_sensor_matrix_propagates() {
        let mut m = meta();
        m.xyz_to_camera = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]];
        assert!(matches!(RawDevelopment::new(m), Err(Error::SingularMatrix(_))));
    }

    #[test]
    fn test_camera_temperature_reproduces_as_shot_gains() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        let as_shot = dev.multipliers();
        dev.set_temperature(dev.camera_temperature()).expect("in range");
        for (a, b) in dev.multipliers().iter().zip(as_shot) {
            assert!((a - b).abs() < EPSILON, "{:?} vs {as_shot:?}", dev.multipliers());
        }
        assert_eq!(dev.white_balance(), WhiteBalance::User);
    }

    #[test]
    fn test_warmer_temperature_lowers_red_gain() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        dev.set_temperature(3000.0).expect("in range");
        let warm = dev.multipliers();
        dev.set_temperature(9000.0).expect("in range");
        let cool = dev.multipliers();
        assert!(warm[2] / warm[0] > cool[2] / cool[0], "warm {warm:?} cool {cool:?}");
        assert_normalized(warm);
        assert_normalized(cool);
    }

    #[test]
    fn test_failed_setters_do_not_mutate() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        let before = dev.clone();
        assert!(matches!(dev.set_temperature_slider(131), Err(Error::Range { .. })));
        assert!(matches!(dev.set_temperature(1000.0), Err(Error::Range { .. })));
        assert!(matches!(dev.set_tint(2.5), Err(Error::Range { .. })));
        assert!(matches!(dev.set_exposure_slider(-1), Err(Error::Range { .. })));
        assert!(matches!(dev.set_highlight_slider(10), Err(Error::Range { .. })));
        assert!(matches!(dev.set_contrast(21.0), Err(Error::Range { .. })));
        assert!(matches!(dev.set_saturation_slider(101), Err(Error::Range { .. })));
        assert!(matches!(dev.set_brightness_slider(0), Err(Error::Range { .. })));
        assert!(matches!(dev.set_raw_multipliers(1.0, -1.0, 1.0), Err(Error::Range { .. })));
        assert_eq!(dev, before);
    }

    #[test]
    fn test_slider_setters() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        dev.set_exposure_slider(60).expect("valid");
        dev.set_contrast_slider(10).expect("valid");
        dev.set_saturation_slider(75).expect("valid");
        dev.set_brightness_slider(50).expect("valid");
        dev.set_tint_slider(72).expect("valid");
        assert!((dev.exposure() - 1.0).abs() < EPSILON);
        assert_eq!(dev.contrast(), 10.0);
        assert_eq!(dev.saturation(), 25.0);
        assert!((dev.brightness() - 1.0).abs() < EPSILON);
        assert!((dev.tint() - 1.0).abs() < EPSILON);
        assert_normalized(dev.multipliers());
    }

    #[test]
    fn test_sampled_multipliers_recover_temperature() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        dev.set_temperature(7000.0).expect("in range");
        let target = dev.multipliers();
        dev.set_defaults();

        dev.set_raw_multipliers(target[0] * 3.0, target[1] * 3.0, target[2] * 3.0)
            .expect("positive gains");
        assert!(dev.is_sampled());
        assert_eq!(dev.tint(), 1.0);
        assert!((dev.temperature() - 7000.0).abs() < 1e-3 * 7000.0);
        for (a, b) in dev.multipliers().iter().zip(target) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_postprocess_params() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        dev.set_exposure(1.0).expect("valid");
        dev.set_highlight_mode(2).expect("valid");
        let auto = dev.postprocess_params();
        assert_eq!(auto.exposure_shift, 1.0);
        assert_eq!(auto.highlight_mode, 0);
        assert_eq!(auto.user_multipliers, None);

        dev.set_auto_brightness(false);
        dev.set_tint(1.1).expect("valid");
        let manual = dev.postprocess_params();
        assert_eq!(manual.exposure_shift, 2.0);
        assert_eq!(manual.highlight_mode, 2);
        assert_eq!(manual.white_balance, WhiteBalance::User);
        assert_eq!(manual.user_multipliers, Some(dev.multipliers()));
    }

    #[test]
    fn test_tone_curve_is_monotone() {
        let mut dev = RawDevelopment::new(meta()).expect("valid metadata");
        let mut hist = vec![0u32; 256];
        for (i, h) in hist.iter_mut().enumerate() {
            *h = if (40..90).contains(&i) || (160..220).contains(&i) { 100 } else { 1 };
        }
        let cfg = AutoCurveConfig::default();
        for contrast in [0.0, 5.0, 20.0] {
            dev.set_contrast(contrast).expect("valid");
            let curve = dev.tone_curve(&hist, &cfg).expect("valid histogram");
            assert!(curve.is_monotone(), "contrast {contrast}");
        }
        dev.set_contrast(0.0).expect("valid");
        dev.set_brightness(1.0).expect("valid");
        assert!(dev.tone_curve(&hist, &cfg).expect("valid").is_identity());
    }

    struct FlatDecoder {
        meta: RawMetadata,
        seen: Option<PostProcessParams>,
    }

    impl RawDecoder for FlatDecoder {
        fn metadata(&self) -> Result<RawMetadata> {
            Ok(self.meta)
        }

        fn postprocess(&mut self, params: &PostProcessParams) -> Result<PixelBuffer> {
            self.seen = Some(*params);
            Ok(PixelBuffer::filled(4, 4, [200, 100, 50, 255]))
        }
    }

    #[test]
    fn test_develop_runs_decoder_and_saturation() {
        let mut decoder = FlatDecoder {
            meta: meta(),
            seen: None,
        };
        let mut dev = RawDevelopment::new(decoder.metadata().expect("metadata")).expect("valid");
        dev.set_contrast(0.0).expect("valid");
        dev.set_saturation(-50.0).expect("valid");
        let out = dev
            .develop(&mut decoder, &AutoCurveConfig::default())
            .expect("develops");
        assert!(decoder.seen.is_some());
        let px = out.get(2, 2);
        assert_eq!(px[0], px[1], "fully desaturated: {px:?}");
        assert_eq!(px[1], px[2], "fully desaturated: {px:?}");
        assert_eq!(px[3], 255);
    }
}
