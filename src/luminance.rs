use image::Rgb;

/// One grid cell's color, by semantic channel. Values are normally in
/// `[0, 255]`; nothing breaks if they are not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ColorSample {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }
}

/// Frames are decoded as `rgb24`, so an `Rgb<u8>` is stored red, green, blue.
impl From<Rgb<u8>> for ColorSample {
    fn from(px: Rgb<u8>) -> Self {
        Self {
            red: f64::from(px[0]),
            green: f64::from(px[1]),
            blue: f64::from(px[2]),
        }
    }
}

/// A brightness in `[0, 1]`. Construction clamps; NaN becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Brightness(f64);

impl Brightness {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Brightness(0.0)
        } else {
            Brightness(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Weighted-sum luminance over semantic red, green and blue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceModel {
    pub red_weight: f64,
    pub green_weight: f64,
    pub blue_weight: f64,
}

impl LuminanceModel {
    /// ITU-R BT.601 luma weights.
    pub const REC601: LuminanceModel = LuminanceModel {
        red_weight: 0.299,
        green_weight: 0.587,
        blue_weight: 0.114,
    };

    pub fn brightness_of(&self, sample: ColorSample) -> Brightness {
        let weighted = self.red_weight * sample.red + self.green_weight * sample.green + self.blue_weight * sample.blue;
        Brightness::new(weighted / 255.0)
    }
}

impl Default for LuminanceModel {
    fn default() -> Self {
        Self::REC601
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: LuminanceModel = LuminanceModel::REC601;

    #[test]
    fn black_and_white_hit_the_bounds() {
        assert_eq!(MODEL.brightness_of(Rgb([0, 0, 0]).into()).value(), 0.0);
        let white = MODEL.brightness_of(Rgb([255, 255, 255]).into()).value();
        assert!((white - 1.0).abs() < 1e-9, "white was {}", white);
    }

    #[test]
    fn weights_follow_semantic_channels() {
        let red = MODEL.brightness_of(Rgb([255, 0, 0]).into()).value();
        let green = MODEL.brightness_of(Rgb([0, 255, 0]).into()).value();
        let blue = MODEL.brightness_of(Rgb([0, 0, 255]).into()).value();
        assert!((red - 0.299).abs() < 1e-9);
        assert!((green - 0.587).abs() < 1e-9);
        assert!((blue - 0.114).abs() < 1e-9);
        // A swapped storage order would make blue brighter than red.
        assert!(green > red && red > blue);
    }

    #[test]
    fn adversarial_inputs_are_clamped() {
        assert_eq!(MODEL.brightness_of(ColorSample::new(1000.0, 1000.0, 1000.0)).value(), 1.0);
        assert_eq!(MODEL.brightness_of(ColorSample::new(-50.0, -1.0, 0.0)).value(), 0.0);
        assert_eq!(MODEL.brightness_of(ColorSample::new(f64::NAN, 0.0, 0.0)).value(), 0.0);
        assert_eq!(MODEL.brightness_of(ColorSample::new(f64::INFINITY, 0.0, 0.0)).value(), 1.0);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let sample = ColorSample::new(12.0, 200.0, 77.0);
        assert_eq!(MODEL.brightness_of(sample), MODEL.brightness_of(sample));
    }
}
