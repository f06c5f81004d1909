use crate::color::{MixSpace, PaletteSort};
use serde::{Deserialize, Serialize};

/// How a lane samples seed candidates around its anchor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum NewPixelMethod {
    /// Anywhere in the domain (anchor ignored)
    Anywhere,
    /// Inside a circle of `new_pixel_radius` around the anchor
    #[default]
    Circle,
    /// Inside an axis-aligned square of half-size `new_pixel_radius`
    Square,
}

impl NewPixelMethod {
    pub fn name(&self) -> &str {
        match self {
            NewPixelMethod::Anywhere => "Anywhere",
            NewPixelMethod::Circle => "Circle",
            NewPixelMethod::Square => "Square",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            NewPixelMethod::Anywhere => NewPixelMethod::Circle,
            NewPixelMethod::Circle => NewPixelMethod::Square,
            NewPixelMethod::Square => NewPixelMethod::Anywhere,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            NewPixelMethod::Anywhere => NewPixelMethod::Square,
            NewPixelMethod::Circle => NewPixelMethod::Anywhere,
            NewPixelMethod::Square => NewPixelMethod::Circle,
        }
    }
}

/// What drives a segment's stroke color
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ColorPattern {
    /// Walk the palette a little on every segment
    #[default]
    Step,
    /// Pick a palette entry from the line's total length
    Length,
}

impl ColorPattern {
    pub fn name(&self) -> &str {
        match self {
            ColorPattern::Step => "Step",
            ColorPattern::Length => "Length",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ColorPattern::Step => ColorPattern::Length,
            ColorPattern::Length => ColorPattern::Step,
        }
    }
}

/// Rotation direction of the base angle between lines
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WiggleDir {
    #[default]
    Random,
    Clockwise,
    CounterClockwise,
}

impl WiggleDir {
    pub fn name(&self) -> &str {
        match self {
            WiggleDir::Random => "Random",
            WiggleDir::Clockwise => "CW",
            WiggleDir::CounterClockwise => "CCW",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            WiggleDir::Random => WiggleDir::Clockwise,
            WiggleDir::Clockwise => WiggleDir::CounterClockwise,
            WiggleDir::CounterClockwise => WiggleDir::Random,
        }
    }
}

/// Angular jitter, within a line and between lines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WiggleSettings {
    /// Max heading jitter per walk step (radians)
    pub within_line: f32,
    /// Cap on cumulative deviation from the base angle within a line
    pub max: Option<f32>,
    /// Max base-angle rotation applied every `n_lines` lines (radians)
    pub between_line: f32,
    /// Lines drawn between base-angle rotations (0 = never rotate)
    pub n_lines: usize,
    pub dir: WiggleDir,
}

/// Line length limits, in walk points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthSettings {
    pub max: usize,
    /// Minimum accepted length at the start of a session
    pub min_start: usize,
    /// Floor the minimum decays to under sustained failure
    pub min_end: usize,
    pub min_reduce_by: usize,
    /// Upper end of the length-to-color mapping
    pub max_for_color: usize,
}

/// Consecutive failure counts at which each backoff stage kicks in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailThresholds {
    pub move_look: u32,
    pub force_move_look: u32,
    pub reduce_min_len: u32,
    pub stop: u32,
}

/// Retry budgets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrySettings {
    /// Seed candidates probed per new-line attempt
    pub pixel: usize,
    /// Consecutive rejected steps before a walk gives up
    pub line_point: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSettings {
    pub pattern: ColorPattern,
    /// Palette cursor advance per segment (step pattern)
    pub step_move: f32,
    pub mix_space: MixSpace,
    pub sort: PaletteSort,
}

/// Re-emit saved long lines for visual reinforcement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedrawSettings {
    /// Redraw on every `rate`-th finished line
    pub rate: usize,
    /// Total redraws allowed, as a multiple of the saved long lines
    pub max_mult: f32,
    /// Lines that must be drawn before redraws start
    pub after: usize,
}

impl Default for RedrawSettings {
    fn default() -> Self {
        Self {
            rate: 10,
            max_mult: 1.0,
            after: 50,
        }
    }
}

/// Translucent offset copy drawn under every segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    pub offset: f32,
    pub alpha: u8,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            offset: 1.0,
            alpha: 60,
        }
    }
}

/// All growth settings consolidated into one struct.
///
/// The field reads these on every step, so a host may change any of them
/// between updates. `look_point_share` is only consulted at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSettings {
    // === Timing ===
    /// Logical steps per second of elapsed time
    pub step_rate: f32,
    /// Walk distance per accepted point (pixels)
    pub step_size: f32,

    // === Growth ===
    pub wiggle: WiggleSettings,
    pub len: LengthSettings,
    pub fails_until: FailThresholds,
    pub tries: TrySettings,

    // === Seeding ===
    pub new_pixel_method: NewPixelMethod,
    /// Sampling radius around the anchor (pixels)
    pub new_pixel_radius: f32,
    /// Pixels with alpha below this count as blank
    pub alpha_threshold: u8,
    /// All lanes share one anchor instead of one each
    pub look_point_share: bool,
    /// Lines whose ends are further apart than `width * ratio` are kept as long lines
    pub long_line_ratio: f32,

    // === Drawing ===
    pub colors: ColorSettings,
    pub stroke_weight: f32,
    pub shadow: Option<ShadowSettings>,
    pub redraw: Option<RedrawSettings>,
}

impl Default for GrowthSettings {
    fn default() -> Self {
        Self {
            step_rate: 600.0,
            step_size: 1.0,

            wiggle: WiggleSettings {
                within_line: 0.12,
                max: None,
                between_line: 0.4,
                n_lines: 20,
                dir: WiggleDir::Random,
            },
            len: LengthSettings {
                max: 400,
                min_start: 60,
                min_end: 8,
                min_reduce_by: 4,
                max_for_color: 300,
            },
            fails_until: FailThresholds {
                move_look: 30,
                force_move_look: 60,
                reduce_min_len: 100,
                stop: 400,
            },
            tries: TrySettings {
                pixel: 40,
                line_point: 12,
            },

            new_pixel_method: NewPixelMethod::default(),
            new_pixel_radius: 40.0,
            alpha_threshold: 10,
            look_point_share: false,
            long_line_ratio: 0.25,

            colors: ColorSettings {
                pattern: ColorPattern::default(),
                step_move: 0.02,
                mix_space: MixSpace::default(),
                sort: PaletteSort::default(),
            },
            stroke_weight: 1.0,
            shadow: None,
            redraw: None,
        }
    }
}

impl GrowthSettings {
    /// Adjust step rate within bounds
    pub fn adjust_step_rate(&mut self, delta: f32) {
        self.step_rate = (self.step_rate + delta).clamp(10.0, 20000.0);
    }

    /// Adjust walk step size within bounds
    pub fn adjust_step_size(&mut self, delta: f32) {
        self.step_size = (self.step_size + delta).clamp(0.5, 5.0);
    }

    /// Adjust within-line wiggle within bounds
    pub fn adjust_wiggle_within(&mut self, delta: f32) {
        self.wiggle.within_line = (self.wiggle.within_line + delta).clamp(0.0, 1.5);
    }

    /// Adjust between-line wiggle within bounds
    pub fn adjust_wiggle_between(&mut self, delta: f32) {
        self.wiggle.between_line = (self.wiggle.between_line + delta).clamp(0.0, std::f32::consts::PI);
    }

    /// Adjust the cumulative wiggle cap; dropping to zero removes the cap
    pub fn adjust_wiggle_max(&mut self, delta: f32) {
        let current = self.wiggle.max.unwrap_or(0.0);
        let next = (current + delta).clamp(0.0, std::f32::consts::PI);
        self.wiggle.max = if next <= f32::EPSILON { None } else { Some(next) };
    }

    /// Adjust lines per base-angle rotation within bounds
    pub fn adjust_wiggle_n_lines(&mut self, delta: i32) {
        self.wiggle.n_lines = (self.wiggle.n_lines as i32 + delta).clamp(0, 500) as usize;
    }

    /// Adjust max line length within bounds
    pub fn adjust_len_max(&mut self, delta: i32) {
        self.len.max = (self.len.max as i32 + delta).clamp(2, 5000) as usize;
    }

    /// Adjust starting minimum length, kept at or above the floor
    pub fn adjust_len_min_start(&mut self, delta: i32) {
        let floor = self.len.min_end as i32;
        self.len.min_start = (self.len.min_start as i32 + delta).clamp(floor, 2000) as usize;
    }

    /// Adjust minimum length floor, kept at or below the start value
    pub fn adjust_len_min_end(&mut self, delta: i32) {
        let ceiling = self.len.min_start as i32;
        self.len.min_end = (self.len.min_end as i32 + delta).clamp(0, ceiling) as usize;
    }

    /// Adjust pixel-try budget within bounds
    pub fn adjust_tries_pixel(&mut self, delta: i32) {
        self.tries.pixel = (self.tries.pixel as i32 + delta).clamp(1, 1000) as usize;
    }

    /// Adjust walk retry budget within bounds
    pub fn adjust_tries_line_point(&mut self, delta: i32) {
        self.tries.line_point = (self.tries.line_point as i32 + delta).clamp(0, 200) as usize;
    }

    /// Adjust the stop threshold within bounds
    pub fn adjust_fails_stop(&mut self, delta: i32) {
        self.fails_until.stop = (self.fails_until.stop as i64 + delta as i64).clamp(1, 100_000) as u32;
    }

    /// Adjust seed sampling radius within bounds
    pub fn adjust_new_pixel_radius(&mut self, delta: f32) {
        self.new_pixel_radius = (self.new_pixel_radius + delta).clamp(1.0, 1000.0);
    }

    /// Adjust alpha threshold within bounds
    pub fn adjust_alpha_threshold(&mut self, delta: i32) {
        self.alpha_threshold = (self.alpha_threshold as i32 + delta).clamp(1, 255) as u8;
    }

    /// Adjust long-line ratio within bounds
    pub fn adjust_long_line_ratio(&mut self, delta: f32) {
        self.long_line_ratio = (self.long_line_ratio + delta).clamp(0.0, 2.0);
    }

    /// Adjust palette step within bounds
    pub fn adjust_color_move(&mut self, delta: f32) {
        self.colors.step_move = (self.colors.step_move + delta).clamp(0.0, 1.0);
    }

    /// Adjust stroke weight within bounds
    pub fn adjust_stroke_weight(&mut self, delta: f32) {
        self.stroke_weight = (self.stroke_weight + delta).clamp(0.5, 8.0);
    }

    /// Toggle redraw on/off
    pub fn toggle_redraw(&mut self) {
        self.redraw = match self.redraw {
            Some(_) => None,
            None => Some(RedrawSettings::default()),
        };
    }

    /// Toggle shadow on/off
    pub fn toggle_shadow(&mut self) {
        self.shadow = match self.shadow {
            Some(_) => None,
            None => Some(ShadowSettings::default()),
        };
    }
}
