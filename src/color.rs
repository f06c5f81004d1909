use serde::{Deserialize, Serialize};

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }

    /// Relative luminance-ish lightness (OKLab L), used for palette sorting
    pub fn lightness(&self) -> f32 {
        to_oklab(*self)[0]
    }

    /// Hue in degrees (0-360)
    pub fn hue(&self) -> f32 {
        to_hsl(*self)[0]
    }
}

/// Color space used to interpolate between palette entries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MixSpace {
    Rgb,
    Hsl,
    #[default]
    Oklab,
}

impl MixSpace {
    pub fn name(&self) -> &str {
        match self {
            MixSpace::Rgb => "RGB",
            MixSpace::Hsl => "HSL",
            MixSpace::Oklab => "OKLab",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            MixSpace::Rgb => MixSpace::Hsl,
            MixSpace::Hsl => MixSpace::Oklab,
            MixSpace::Oklab => MixSpace::Rgb,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            MixSpace::Rgb => MixSpace::Oklab,
            MixSpace::Hsl => MixSpace::Rgb,
            MixSpace::Oklab => MixSpace::Hsl,
        }
    }
}

/// Ordering applied to the palette before use
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaletteSort {
    #[default]
    None,
    Lightness,
    LightnessReverse,
    Hue,
}

impl PaletteSort {
    pub fn name(&self) -> &str {
        match self {
            PaletteSort::None => "None",
            PaletteSort::Lightness => "Light",
            PaletteSort::LightnessReverse => "Dark",
            PaletteSort::Hue => "Hue",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PaletteSort::None => PaletteSort::Lightness,
            PaletteSort::Lightness => PaletteSort::LightnessReverse,
            PaletteSort::LightnessReverse => PaletteSort::Hue,
            PaletteSort::Hue => PaletteSort::None,
        }
    }

    /// Sorted copy of `palette`
    pub fn apply(&self, palette: &[Rgba]) -> Vec<Rgba> {
        let mut sorted = palette.to_vec();
        match self {
            PaletteSort::None => {}
            PaletteSort::Lightness => {
                sorted.sort_by(|a, b| a.lightness().total_cmp(&b.lightness()));
            }
            PaletteSort::LightnessReverse => {
                sorted.sort_by(|a, b| b.lightness().total_cmp(&a.lightness()));
            }
            PaletteSort::Hue => sorted.sort_by(|a, b| a.hue().total_cmp(&b.hue())),
        }
        sorted
    }
}

/// Named built-in palettes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    #[default]
    Ink,
    Ember,
    Ocean,
    Forest,
    Neon,
    Mono,
}

impl ColorScheme {
    pub fn name(&self) -> &str {
        match self {
            ColorScheme::Ink => "Ink",
            ColorScheme::Ember => "Ember",
            ColorScheme::Ocean => "Ocean",
            ColorScheme::Forest => "Forest",
            ColorScheme::Neon => "Neon",
            ColorScheme::Mono => "Mono",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ColorScheme::Ink => ColorScheme::Ember,
            ColorScheme::Ember => ColorScheme::Ocean,
            ColorScheme::Ocean => ColorScheme::Forest,
            ColorScheme::Forest => ColorScheme::Neon,
            ColorScheme::Neon => ColorScheme::Mono,
            ColorScheme::Mono => ColorScheme::Ink,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            ColorScheme::Ink => ColorScheme::Mono,
            ColorScheme::Ember => ColorScheme::Ink,
            ColorScheme::Ocean => ColorScheme::Ember,
            ColorScheme::Forest => ColorScheme::Ocean,
            ColorScheme::Neon => ColorScheme::Forest,
            ColorScheme::Mono => ColorScheme::Neon,
        }
    }

    pub fn palette(&self) -> Vec<Rgba> {
        let hex: &[&str] = match self {
            ColorScheme::Ink => &["#1b1f3b", "#3d3b8e", "#6a6fd1", "#b1b5f2", "#f2e9e4"],
            ColorScheme::Ember => &["#3d0c02", "#9c2a00", "#e25822", "#f5a142", "#ffe29a"],
            ColorScheme::Ocean => &["#03045e", "#0077b6", "#00b4d8", "#90e0ef", "#caf0f8"],
            ColorScheme::Forest => &["#1b4332", "#2d6a4f", "#52b788", "#95d5b2", "#d8f3dc"],
            ColorScheme::Neon => &["#ff00a0", "#ffe600", "#00ffd0", "#7b2fff"],
            ColorScheme::Mono => &["#202020", "#808080", "#e0e0e0"],
        };
        hex.iter().filter_map(|h| Rgba::from_hex(h)).collect()
    }
}

/// Ease-out quadratic: fast start, slow finish
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Interpolate `a` -> `b` by `t` (0-1) in the given color space
pub fn mix(a: Rgba, b: Rgba, t: f32, space: MixSpace) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let alpha = lerp(a.a as f32, b.a as f32, t).round() as u8;
    let mixed = match space {
        MixSpace::Rgb => Rgba::rgb(
            lerp(a.r as f32, b.r as f32, t).round() as u8,
            lerp(a.g as f32, b.g as f32, t).round() as u8,
            lerp(a.b as f32, b.b as f32, t).round() as u8,
        ),
        MixSpace::Hsl => {
            let [h1, s1, l1] = to_hsl(a);
            let [h2, s2, l2] = to_hsl(b);
            // shortest way around the hue circle
            let mut dh = h2 - h1;
            if dh > 180.0 {
                dh -= 360.0;
            } else if dh < -180.0 {
                dh += 360.0;
            }
            from_hsl([(h1 + dh * t).rem_euclid(360.0), lerp(s1, s2, t), lerp(l1, l2, t)])
        }
        MixSpace::Oklab => {
            let la = to_oklab(a);
            let lb = to_oklab(b);
            from_oklab([
                lerp(la[0], lb[0], t),
                lerp(la[1], lb[1], t),
                lerp(la[2], lb[2], t),
            ])
        }
    };
    mixed.with_alpha(alpha)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn to_hsl(c: Rgba) -> [f32; 3] {
    let r = c.r as f32 / 255.0;
    let g = c.g as f32 / 255.0;
    let b = c.b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d <= f32::EPSILON {
        return [0.0, 0.0, l];
    }
    let s = d / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == r {
        60.0 * ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / d + 2.0)
    } else {
        60.0 * ((r - g) / d + 4.0)
    };
    [h, s, l]
}

fn from_hsl([h, s, l]: [f32; 3]) -> Rgba {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba::rgb(to_u8(r), to_u8(g), to_u8(b))
}

fn srgb_to_linear(v: u8) -> f32 {
    let v = v as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> u8 {
    let v = v.clamp(0.0, 1.0);
    let s = if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (s * 255.0).round().clamp(0.0, 255.0) as u8
}

fn to_oklab(c: Rgba) -> [f32; 3] {
    let r = srgb_to_linear(c.r);
    let g = srgb_to_linear(c.g);
    let b = srgb_to_linear(c.b);

    let l = (0.412_221_47 * r + 0.536_332_55 * g + 0.051_445_995 * b).cbrt();
    let m = (0.211_903_5 * r + 0.680_699_5 * g + 0.107_396_96 * b).cbrt();
    let s = (0.088_302_46 * r + 0.281_718_85 * g + 0.629_978_7 * b).cbrt();

    [
        0.210_454_26 * l + 0.793_617_8 * m - 0.004_072_047 * s,
        1.977_998_5 * l - 2.428_592_2 * m + 0.450_593_7 * s,
        0.025_904_037 * l + 0.782_771_77 * m - 0.808_675_77 * s,
    ]
}

fn from_oklab([l, a, b]: [f32; 3]) -> Rgba {
    let l_ = l + 0.396_337_78 * a + 0.215_803_76 * b;
    let m_ = l - 0.105_561_346 * a - 0.063_854_17 * b;
    let s_ = l - 0.089_484_18 * a - 1.291_485_5 * b;

    let l3 = l_ * l_ * l_;
    let m3 = m_ * m_ * m_;
    let s3 = s_ * s_ * s_;

    Rgba::rgb(
        linear_to_srgb(4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3),
        linear_to_srgb(-1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_38 * s3),
        linear_to_srgb(-0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgba, b: Rgba, tol: i16) -> bool {
        (a.r as i16 - b.r as i16).abs() <= tol
            && (a.g as i16 - b.g as i16).abs() <= tol
            && (a.b as i16 - b.b as i16).abs() <= tol
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgba::from_hex("#ff8000"), Some(Rgba::rgb(255, 128, 0)));
        assert_eq!(
            Rgba::from_hex("10203040"),
            Some(Rgba { r: 0x10, g: 0x20, b: 0x30, a: 0x40 })
        );
        assert_eq!(Rgba::from_hex("#fff"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_rgb_mix_is_linear() {
        let black = Rgba::rgb(0, 0, 0);
        let white = Rgba::rgb(200, 100, 40);
        assert_eq!(mix(black, white, 0.0, MixSpace::Rgb), black);
        assert_eq!(mix(black, white, 1.0, MixSpace::Rgb), white);
        assert_eq!(mix(black, white, 0.5, MixSpace::Rgb), Rgba::rgb(100, 50, 20));
        assert_eq!(mix(black, white, 0.25, MixSpace::Rgb), Rgba::rgb(50, 25, 10));
    }

    #[test]
    fn test_mix_endpoints_in_every_space() {
        let a = Rgba::rgb(200, 30, 60);
        let b = Rgba::rgb(20, 180, 240);
        for space in [MixSpace::Rgb, MixSpace::Hsl, MixSpace::Oklab] {
            assert!(close(mix(a, b, 0.0, space), a, 1), "{:?}", space);
            assert!(close(mix(a, b, 1.0, space), b, 1), "{:?}", space);
        }
    }

    #[test]
    fn test_hsl_mix_takes_short_hue_path() {
        // red (0) to magenta (300): the midpoint sits at 330, not 150 (green-cyan)
        let red = Rgba::rgb(255, 0, 0);
        let magenta = Rgba::rgb(255, 0, 255);
        let mid = mix(red, magenta, 0.5, MixSpace::Hsl);
        assert!(mid.r > 200);
        assert!(mid.g < 10);
    }

    #[test]
    fn test_oklab_roundtrip_is_stable() {
        for c in ColorScheme::Ocean.palette() {
            assert!(close(from_oklab(to_oklab(c)), c, 1));
        }
    }

    #[test]
    fn test_palette_sort() {
        let palette = vec![Rgba::rgb(255, 255, 255), Rgba::rgb(0, 0, 0), Rgba::rgb(128, 128, 128)];
        let light = PaletteSort::Lightness.apply(&palette);
        assert_eq!(light[0], Rgba::rgb(0, 0, 0));
        assert_eq!(light[2], Rgba::rgb(255, 255, 255));
        let dark = PaletteSort::LightnessReverse.apply(&palette);
        assert_eq!(dark[0], Rgba::rgb(255, 255, 255));
        assert_eq!(PaletteSort::None.apply(&palette), palette);
    }

    #[test]
    fn test_ease_out_curve() {
        assert_eq!(ease_out(0.0), 0.0);
        assert_eq!(ease_out(1.0), 1.0);
        assert_eq!(ease_out(0.5), 0.75);
        assert_eq!(ease_out(2.0), 1.0);
    }

    #[test]
    fn test_every_scheme_has_colors() {
        let mut scheme = ColorScheme::default();
        for _ in 0..6 {
            assert!(scheme.palette().len() >= 2, "{}", scheme.name());
            assert_eq!(scheme.next().prev(), scheme);
            scheme = scheme.next();
        }
    }
}
