use anyhow::Result;
use line_growth::braille;
use line_growth::canvas::PixelCanvas;
use line_growth::color::ColorScheme;
use line_growth::config::AppConfig;
use line_growth::export::{self, GifRecorder};
use line_growth::field::GrowthField;
use line_growth::presets::{Preset, PresetManager};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Record one GIF frame per this many ticks
const GIF_FRAME_EVERY: usize = 6;

/// Popup menu state for Shift+letter parameter selection
#[derive(Debug, Clone)]
pub struct ParamPopup {
    pub letter: char,
    pub options: Vec<(Focus, &'static str)>, // (Focus variant, display name)
    pub selected_idx: usize,
}

/// Focus state for parameter editing in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    AlphaThreshold,
    BetweenWiggle,
    ColorMove,
    ColorScheme,
    Direction,
    LenMax,
    LongRatio,
    MinEnd,
    MinStart,
    Mix,
    NLines,
    Parallel,
    Pattern,
    PixelMethod,
    Radius,
    Redraw,
    Shadow,
    Share,
    Sort,
    Speed,
    StepRate,
    StepSize,
    Stop,
    TriesLine,
    TriesPixel,
    Weight,
    Wiggle,
    WiggleMax,
    // Controls box (not a param)
    Controls,
}

/// Parameters in sidebar order, with popup letter and display name
pub const PARAMS: &[(Focus, char, &str)] = &[
    (Focus::AlphaThreshold, 'a', "Alpha Threshold"),
    (Focus::BetweenWiggle, 'b', "Between-line Wiggle"),
    (Focus::ColorMove, 'c', "Color Move"),
    (Focus::ColorScheme, 'c', "Color Scheme"),
    (Focus::Direction, 'd', "Direction (Wiggle)"),
    (Focus::LenMax, 'l', "Length Max"),
    (Focus::LongRatio, 'l', "Long Line Ratio"),
    (Focus::MinEnd, 'm', "Min Length End"),
    (Focus::MinStart, 'm', "Min Length Start"),
    (Focus::Mix, 'm', "Mix Space"),
    (Focus::NLines, 'n', "N Lines per Turn"),
    (Focus::Parallel, 'p', "Parallel Lanes"),
    (Focus::Pattern, 'p', "Pattern (Color)"),
    (Focus::PixelMethod, 'p', "Pixel Method"),
    (Focus::Radius, 'r', "Radius (Seeding)"),
    (Focus::Redraw, 'r', "Redraw"),
    (Focus::Shadow, 's', "Shadow"),
    (Focus::Share, 's', "Share Anchor"),
    (Focus::Sort, 's', "Sort (Palette)"),
    (Focus::Speed, 's', "Speed"),
    (Focus::StepRate, 's', "Step Rate"),
    (Focus::StepSize, 's', "Step Size"),
    (Focus::Stop, 's', "Stop After Fails"),
    (Focus::TriesLine, 't', "Tries per Point"),
    (Focus::TriesPixel, 't', "Tries per Seed"),
    (Focus::Weight, 'w', "Weight (Stroke)"),
    (Focus::Wiggle, 'w', "Wiggle"),
    (Focus::WiggleMax, 'w', "Wiggle Max"),
];

impl Focus {
    fn param_index(&self) -> Option<usize> {
        PARAMS.iter().position(|(f, _, _)| f == self)
    }

    /// Tab cycles through parameters in sidebar order
    pub fn next(&self) -> Focus {
        match self.param_index() {
            Some(i) => PARAMS[(i + 1) % PARAMS.len()].0,
            None => PARAMS[0].0,
        }
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev(&self) -> Focus {
        match self.param_index() {
            Some(0) | None => PARAMS[PARAMS.len() - 1].0,
            Some(i) => PARAMS[i - 1].0,
        }
    }

    /// Line index in the parameters box
    pub fn line_index(&self) -> u16 {
        self.param_index().unwrap_or(0) as u16
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::None | Focus::Controls)
    }
}

/// Main application state
pub struct App {
    pub field: GrowthField<PixelCanvas>,
    pub color_scheme: ColorScheme,
    pub seed: u64,
    pub focus: Focus,
    pub paused: bool,
    pub fullscreen_mode: bool,
    /// Multiplier on elapsed time fed to the field
    pub speed: f32,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    pub param_popup: Option<ParamPopup>,
    pub presets: PresetManager,
    /// Last one-line outcome of a save/record/dump action
    pub status_message: Option<String>,
    pub output_dir: PathBuf,
    recorder: Option<GifRecorder<BufWriter<File>>>,
    canvas_width: usize,
    canvas_height: usize,
}

impl App {
    pub fn new(canvas_width: u16, canvas_height: u16, config: AppConfig, presets: PresetManager) -> Self {
        let (width, height) = braille::calculate_canvas_size(canvas_width, canvas_height);
        let seed = config.seed.unwrap_or_else(rand::random);
        let field = GrowthField::new(
            PixelCanvas::new(width, height, 1),
            config.settings,
            config.parallel,
            config.color_scheme.palette(),
            seed,
        );
        Self {
            field,
            color_scheme: config.color_scheme,
            seed,
            focus: Focus::Controls,
            paused: false,
            fullscreen_mode: false,
            speed: 1.0,
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            param_popup: None,
            presets,
            status_message: None,
            output_dir: PathBuf::from("."),
            recorder: None,
            canvas_width: width,
            canvas_height: height,
        }
    }

    /// Advance the field by `elapsed_ms` of wall-clock time
    pub fn tick(&mut self, elapsed_ms: f32) {
        if self.paused {
            return;
        }
        let was_done = self.field.is_done();
        self.field.update(elapsed_ms * self.speed);

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.capture(self.field.surface()) {
                tracing::warn!("gif capture failed: {:#}", err);
                self.status_message = Some(format!("GIF error: {}", err));
                self.recorder = None;
            } else if self.field.is_done() && !was_done {
                self.stop_recording();
            }
        }
    }

    /// Current configuration, for saving
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            version: 1,
            settings: self.field.settings.clone(),
            color_scheme: self.color_scheme,
            parallel: self.field.parallel(),
            seed: Some(self.seed),
        }
    }

    /// Recreate the field, keeping settings; needed when lane count,
    /// anchor sharing or canvas size change
    fn rebuild(&mut self, parallel: usize) {
        self.stop_recording();
        self.field = GrowthField::new(
            PixelCanvas::new(self.canvas_width, self.canvas_height, 1),
            self.field.settings.clone(),
            parallel,
            self.color_scheme.palette(),
            self.seed,
        );
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_up(&mut self) {
        self.adjust_focused(1);
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_down(&mut self) {
        self.adjust_focused(-1);
    }

    fn adjust_focused(&mut self, dir: i32) {
        let d = dir as f32;
        let up = dir > 0;
        let s = &mut self.field.settings;
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::AlphaThreshold => s.adjust_alpha_threshold(5 * dir),
            Focus::BetweenWiggle => s.adjust_wiggle_between(0.05 * d),
            Focus::ColorMove => s.adjust_color_move(0.005 * d),
            Focus::ColorScheme => {
                let scheme = if up { self.color_scheme.next() } else { self.color_scheme.prev() };
                self.set_color_scheme(scheme);
            }
            Focus::Direction => s.wiggle.dir = s.wiggle.dir.next(),
            Focus::LenMax => s.adjust_len_max(20 * dir),
            Focus::LongRatio => s.adjust_long_line_ratio(0.05 * d),
            Focus::MinEnd => s.adjust_len_min_end(dir),
            Focus::MinStart => s.adjust_len_min_start(5 * dir),
            Focus::Mix => s.colors.mix_space = if up { s.colors.mix_space.next() } else { s.colors.mix_space.prev() },
            Focus::NLines => s.adjust_wiggle_n_lines(dir),
            Focus::Parallel => {
                let parallel = (self.field.parallel() as i32 + dir).clamp(1, 16) as usize;
                if parallel != self.field.parallel() {
                    self.rebuild(parallel);
                }
            }
            Focus::Pattern => s.colors.pattern = s.colors.pattern.next(),
            Focus::PixelMethod => {
                s.new_pixel_method = if up { s.new_pixel_method.next() } else { s.new_pixel_method.prev() }
            }
            Focus::Radius => s.adjust_new_pixel_radius(5.0 * d),
            Focus::Redraw => s.toggle_redraw(),
            Focus::Shadow => s.toggle_shadow(),
            Focus::Share => {
                s.look_point_share = !s.look_point_share;
                self.rebuild(self.field.parallel());
            }
            Focus::Sort => s.colors.sort = s.colors.sort.next(),
            Focus::Speed => self.adjust_speed(up),
            Focus::StepRate => s.adjust_step_rate(100.0 * d),
            Focus::StepSize => s.adjust_step_size(0.5 * d),
            Focus::Stop => s.adjust_fails_stop(50 * dir),
            Focus::TriesLine => s.adjust_tries_line_point(dir),
            Focus::TriesPixel => s.adjust_tries_pixel(5 * dir),
            Focus::Weight => s.adjust_stroke_weight(0.5 * d),
            Focus::Wiggle => s.adjust_wiggle_within(0.02 * d),
            Focus::WiggleMax => s.adjust_wiggle_max(0.05 * d),
        }
    }

    /// Display value of a parameter
    pub fn param_value(&self, focus: Focus) -> String {
        let s = &self.field.settings;
        let on_off = |b: bool| if b { "on" } else { "off" }.to_string();
        match focus {
            Focus::None | Focus::Controls => String::new(),
            Focus::AlphaThreshold => s.alpha_threshold.to_string(),
            Focus::BetweenWiggle => format!("{:.2}", s.wiggle.between_line),
            Focus::ColorMove => format!("{:.3}", s.colors.step_move),
            Focus::ColorScheme => self.color_scheme.name().to_string(),
            Focus::Direction => s.wiggle.dir.name().to_string(),
            Focus::LenMax => s.len.max.to_string(),
            Focus::LongRatio => format!("{:.2}", s.long_line_ratio),
            Focus::MinEnd => s.len.min_end.to_string(),
            Focus::MinStart => s.len.min_start.to_string(),
            Focus::Mix => s.colors.mix_space.name().to_string(),
            Focus::NLines => s.wiggle.n_lines.to_string(),
            Focus::Parallel => self.field.parallel().to_string(),
            Focus::Pattern => s.colors.pattern.name().to_string(),
            Focus::PixelMethod => s.new_pixel_method.name().to_string(),
            Focus::Radius => format!("{:.0}", s.new_pixel_radius),
            Focus::Redraw => on_off(s.redraw.is_some()),
            Focus::Shadow => on_off(s.shadow.is_some()),
            Focus::Share => on_off(s.look_point_share),
            Focus::Sort => s.colors.sort.name().to_string(),
            Focus::Speed => format!("{:.2}x", self.speed),
            Focus::StepRate => format!("{:.0}", s.step_rate),
            Focus::StepSize => format!("{:.1}", s.step_size),
            Focus::Stop => s.fails_until.stop.to_string(),
            Focus::TriesLine => s.tries.line_point.to_string(),
            Focus::TriesPixel => s.tries.pixel.to_string(),
            Focus::Weight => format!("{:.1}", s.stroke_weight),
            Focus::Wiggle => format!("{:.2}", s.wiggle.within_line),
            Focus::WiggleMax => s.wiggle.max.map_or("off".to_string(), |m| format!("{:.2}", m)),
        }
    }

    /// Cycle to next focus
    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Restart growth with the same seed
    pub fn reset(&mut self) {
        self.stop_recording();
        self.field.reseed(self.seed);
        self.field.reset();
    }

    /// Restart growth with a fresh seed
    pub fn reset_new_seed(&mut self) {
        self.seed = rand::random();
        self.reset();
    }

    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        self.color_scheme = scheme;
        self.field.set_palette(scheme.palette());
    }

    /// Cycle color scheme
    pub fn cycle_color_scheme(&mut self) {
        self.set_color_scheme(self.color_scheme.next());
    }

    pub fn cycle_mix_space(&mut self) {
        let colors = &mut self.field.settings.colors;
        colors.mix_space = colors.mix_space.next();
    }

    pub fn cycle_pattern(&mut self) {
        let colors = &mut self.field.settings.colors;
        colors.pattern = colors.pattern.next();
    }

    pub fn cycle_sort(&mut self) {
        let colors = &mut self.field.settings.colors;
        colors.sort = colors.sort.next();
    }

    pub fn toggle_shadow(&mut self) {
        self.field.settings.toggle_shadow();
    }

    pub fn toggle_redraw(&mut self) {
        self.field.settings.toggle_redraw();
    }

    pub fn cycle_pixel_method(&mut self) {
        let s = &mut self.field.settings;
        s.new_pixel_method = s.new_pixel_method.next();
    }

    /// Load a preset and restart
    pub fn apply_preset(&mut self, preset: &Preset) {
        self.field.settings = preset.settings.clone();
        self.color_scheme = preset.color_scheme;
        self.rebuild(preset.parallel);
        self.status_message = Some(format!("Preset: {}", preset.name));
    }

    /// Load the n-th preset (builtin first, then user)
    pub fn apply_preset_index(&mut self, index: usize) {
        let preset = self.presets.all_presets().nth(index).cloned();
        if let Some(preset) = preset {
            self.apply_preset(&preset);
        }
    }

    /// Save current settings as a user preset
    pub fn save_user_preset(&mut self) {
        let name = format!("user-{}", self.seed);
        let preset = Preset::new(
            name.clone(),
            "Saved from the terminal",
            self.field.settings.clone(),
            self.color_scheme,
            self.field.parallel(),
        );
        self.status_message = Some(match self.presets.save_preset(preset) {
            Ok(_) => format!("Saved preset {}", name),
            Err(err) => format!("Preset error: {}", err),
        });
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    /// Scroll help content up
    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    /// Scroll help content down
    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    /// Scroll controls box up
    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    /// Scroll controls box down
    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }

    /// Resize the canvas to match the terminal; this restarts growth
    pub fn resize(&mut self, canvas_width: u16, canvas_height: u16) {
        let (width, height) = braille::calculate_canvas_size(canvas_width, canvas_height);
        if (width, height) != (self.canvas_width, self.canvas_height) {
            self.canvas_width = width;
            self.canvas_height = height;
            self.rebuild(self.field.parallel());
        }
    }

    fn adjust_speed(&mut self, up: bool) {
        self.speed = if up { self.speed * 2.0 } else { self.speed / 2.0 }.clamp(0.125, 16.0);
    }

    /// Double the growth speed
    pub fn increase_speed(&mut self) {
        self.adjust_speed(true);
    }

    /// Halve the growth speed
    pub fn decrease_speed(&mut self) {
        self.adjust_speed(false);
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Save a PNG of the canvas
    pub fn save_png(&mut self) {
        let path = export::timestamped_path(&self.output_dir, "line-growth", "png");
        self.report(export::save_png(self.field.surface(), &path).map(|_| path.display().to_string()), "PNG");
    }

    /// Export the current configuration as JSON
    pub fn save_config(&mut self) {
        let path = export::timestamped_path(&self.output_dir, "line-growth-config", "json");
        self.report(self.to_config().save_to_file(&path).map(|_| path.display().to_string()), "Config");
    }

    /// Dump the field state as JSON
    pub fn dump_state(&mut self) {
        let path = export::timestamped_path(&self.output_dir, "line-growth-state", "json");
        self.report(export::dump_state(&self.field.snapshot(), &path).map(|_| path.display().to_string()), "State");
    }

    /// Start or stop GIF recording
    pub fn toggle_recording(&mut self) {
        if self.recorder.is_some() {
            self.stop_recording();
            return;
        }
        let path = export::timestamped_path(&self.output_dir, "line-growth", "gif");
        match GifRecorder::create(&path, self.field.surface(), GIF_FRAME_EVERY) {
            Ok(recorder) => {
                self.recorder = Some(recorder);
                self.status_message = Some(format!("Recording {}", path.display()));
            }
            Err(err) => self.report::<String>(Err(err), "GIF"),
        }
    }

    fn stop_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let frames = recorder.frames();
            let result = recorder.finish().map(|_| format!("{} frames", frames));
            self.report(result, "GIF");
        }
    }

    fn report<T: std::fmt::Display>(&mut self, result: Result<T>, what: &str) {
        self.status_message = Some(match result {
            Ok(done) => format!("{} saved: {}", what, done),
            Err(err) => {
                tracing::warn!("{} failed: {:#}", what, err);
                format!("{} error: {}", what, err)
            }
        });
    }

    // === Popup methods ===

    /// Open parameter popup for a given letter
    pub fn open_param_popup(&mut self, letter: char) {
        let letter = letter.to_ascii_lowercase();
        let options: Vec<_> = PARAMS
            .iter()
            .filter(|(_, c, _)| *c == letter)
            .map(|(focus, _, name)| (*focus, *name))
            .collect();
        if !options.is_empty() {
            self.param_popup = Some(ParamPopup {
                letter: letter.to_ascii_uppercase(),
                options,
                selected_idx: 0,
            });
        }
    }

    /// Open popup with all parameters (Shift+?)
    pub fn open_all_params_popup(&mut self) {
        self.param_popup = Some(ParamPopup {
            letter: '?',
            options: PARAMS.iter().map(|(focus, _, name)| (*focus, *name)).collect(),
            selected_idx: 0,
        });
    }

    /// Close the parameter popup without selecting
    pub fn close_param_popup(&mut self) {
        self.param_popup = None;
    }

    /// Confirm selection and close popup
    pub fn confirm_param_popup(&mut self) {
        if let Some(popup) = &self.param_popup {
            if let Some((focus, _)) = popup.options.get(popup.selected_idx) {
                self.focus = *focus;
            }
        }
        self.param_popup = None;
    }

    /// Navigate up in popup
    pub fn popup_nav_up(&mut self) {
        if let Some(popup) = &mut self.param_popup {
            if popup.selected_idx > 0 {
                popup.selected_idx -= 1;
            } else {
                popup.selected_idx = popup.options.len().saturating_sub(1);
            }
        }
    }

    /// Navigate down in popup
    pub fn popup_nav_down(&mut self) {
        if let Some(popup) = &mut self.param_popup {
            if popup.selected_idx < popup.options.len().saturating_sub(1) {
                popup.selected_idx += 1;
            } else {
                popup.selected_idx = 0;
            }
        }
    }
}
