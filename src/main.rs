mod app;
mod ui;

use anyhow::{anyhow, bail, Context, Result};
use app::{App, Focus};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use line_growth::color::{ColorScheme, MixSpace};
use line_growth::config::AppConfig;
use line_growth::presets::PresetManager;
use line_growth::settings::{ColorPattern, NewPixelMethod, RedrawSettings};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "line-growth")]
#[command(about = "Random-walk line growth that fills the terminal")]
struct Args {
    /// Start from a named preset (see the help overlay for names)
    #[arg(long)]
    preset: Option<String>,

    /// Load a JSON config exported with E
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Concurrent lanes (1-16)
    #[arg(long)]
    parallel: Option<usize>,

    /// Logical steps per second
    #[arg(long = "step-rate")]
    step_rate: Option<f32>,

    /// Max heading jitter per walk step, in radians
    #[arg(long)]
    wiggle: Option<f32>,

    /// Max points per line
    #[arg(long = "len-max")]
    len_max: Option<usize>,

    /// Color pattern (step, length)
    #[arg(long)]
    pattern: Option<String>,

    /// Color mix space (rgb, hsl, oklab)
    #[arg(long)]
    mix: Option<String>,

    /// Color scheme (ink, ember, ocean, forest, neon, mono)
    #[arg(long)]
    scheme: Option<String>,

    /// Seed pixel method (anywhere, circle, square)
    #[arg(long = "pixel-method")]
    pixel_method: Option<String>,

    /// All lanes share one search anchor
    #[arg(long = "share-anchor")]
    share_anchor: bool,

    /// Re-stroke saved long lines while growing
    #[arg(long)]
    redraw: bool,

    /// Write logs to this file (filter with RUST_LOG)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn parse_pattern(s: &str) -> ColorPattern {
    match s.to_lowercase().as_str() {
        "length" | "len" => ColorPattern::Length,
        _ => ColorPattern::Step,
    }
}

fn parse_mix(s: &str) -> MixSpace {
    match s.to_lowercase().as_str() {
        "rgb" => MixSpace::Rgb,
        "hsl" => MixSpace::Hsl,
        _ => MixSpace::Oklab,
    }
}

fn parse_scheme(s: &str) -> ColorScheme {
    match s.to_lowercase().as_str() {
        "ember" | "fire" => ColorScheme::Ember,
        "ocean" => ColorScheme::Ocean,
        "forest" => ColorScheme::Forest,
        "neon" => ColorScheme::Neon,
        "mono" | "grey" | "gray" => ColorScheme::Mono,
        _ => ColorScheme::Ink,
    }
}

fn parse_pixel_method(s: &str) -> NewPixelMethod {
    match s.to_lowercase().as_str() {
        "anywhere" | "any" => NewPixelMethod::Anywhere,
        "square" => NewPixelMethod::Square,
        _ => NewPixelMethod::Circle,
    }
}

/// Install a file logger; the terminal belongs to the UI
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("line_growth=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// Config file, then preset, then individual flags
fn resolve_config(args: &Args, presets: &PresetManager) -> Result<AppConfig> {
    let mut config = match (&args.config, &args.preset) {
        (Some(path), _) => AppConfig::load_from_file(path)?,
        (None, Some(name)) => match presets.find(name) {
            Some(preset) => preset.to_config(None),
            None => bail!("Unknown preset '{}'. Available: {}", name, presets.preset_names().join(", ")),
        },
        (None, None) => AppConfig::default(),
    };

    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(parallel) = args.parallel {
        config.parallel = parallel.clamp(1, 16);
    }
    let settings = &mut config.settings;
    if let Some(rate) = args.step_rate {
        settings.step_rate = rate.clamp(10.0, 20_000.0);
    }
    if let Some(wiggle) = args.wiggle {
        settings.wiggle.within_line = wiggle.clamp(0.0, 3.0);
    }
    if let Some(len_max) = args.len_max {
        settings.len.max = len_max.clamp(2, 5000);
    }
    if let Some(pattern) = &args.pattern {
        settings.colors.pattern = parse_pattern(pattern);
    }
    if let Some(mix) = &args.mix {
        settings.colors.mix_space = parse_mix(mix);
    }
    if let Some(method) = &args.pixel_method {
        settings.new_pixel_method = parse_pixel_method(method);
    }
    if args.share_anchor {
        settings.look_point_share = true;
    }
    if args.redraw && settings.redraw.is_none() {
        settings.redraw = Some(RedrawSettings::default());
    }
    if let Some(scheme) = &args.scheme {
        config.color_scheme = parse_scheme(scheme);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let presets = PresetManager::new();
    let config = resolve_config(&args, &presets)?;
    tracing::info!(seed = ?config.seed, parallel = config.parallel, "starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Get initial terminal size and create app
    let size = terminal.size()?;
    let frame_rect = ratatui::layout::Rect {
        x: 0,
        y: 0,
        width: size.width,
        height: size.height,
    };
    let (canvas_width, canvas_height) = ui::get_canvas_size(frame_rect, false);
    let mut app = App::new(canvas_width, canvas_height, config, presets);

    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!("{:#}", err);
    }
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);
    // Long stalls (suspend, resize) should not dump a burst of steps
    const MAX_FRAME_MS: f32 = 100.0;

    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(FRAME_DURATION)? {
            match event::read()? {
                Event::Key(key) => {
                    // Only process Press events
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    // === Handle popup keys first (if popup is open) ===
                    if app.param_popup.is_some() {
                        match key.code {
                            KeyCode::Up => app.popup_nav_up(),
                            KeyCode::Down => app.popup_nav_down(),
                            KeyCode::Enter => app.confirm_param_popup(),
                            KeyCode::Esc => app.close_param_popup(),
                            _ => {}
                        }
                        continue;
                    }

                    // === Handle Shift+letter to open popup ===
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        if let KeyCode::Char(c) = key.code {
                            if c == '?' {
                                app.open_all_params_popup();
                                continue;
                            }
                            if c.is_ascii_alphabetic() {
                                app.open_param_popup(c);
                                continue;
                            }
                        }
                    }

                    match key.code {
                        // System controls
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char(' ') => app.toggle_pause(),
                        KeyCode::Char('r') => app.reset(),
                        KeyCode::Char('n') => app.reset_new_seed(),
                        KeyCode::Char('v') => app.toggle_fullscreen(),
                        KeyCode::Char('h') => app.toggle_help(),
                        KeyCode::Char(c @ '1'..='9') => app.apply_preset_index(c as usize - '1' as usize),
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            app.increase_speed();
                            app.focus = Focus::Speed;
                        }
                        KeyCode::Char('-') | KeyCode::Char('_') => {
                            app.decrease_speed();
                            app.focus = Focus::Speed;
                        }

                        // Cycling keys
                        KeyCode::Char('c') => {
                            app.cycle_color_scheme();
                            app.focus = Focus::ColorScheme;
                        }
                        KeyCode::Char('m') => {
                            app.cycle_mix_space();
                            app.focus = Focus::Mix;
                        }
                        KeyCode::Char('t') => {
                            app.cycle_pattern();
                            app.focus = Focus::Pattern;
                        }
                        KeyCode::Char('o') => {
                            app.cycle_sort();
                            app.focus = Focus::Sort;
                        }
                        KeyCode::Char('s') => {
                            app.cycle_pixel_method();
                            app.focus = Focus::PixelMethod;
                        }
                        KeyCode::Char('x') => {
                            app.toggle_shadow();
                            app.focus = Focus::Shadow;
                        }
                        KeyCode::Char('w') => {
                            app.toggle_redraw();
                            app.focus = Focus::Redraw;
                        }

                        // Output
                        KeyCode::Char('p') => app.save_png(),
                        KeyCode::Char('g') => app.toggle_recording(),
                        KeyCode::Char('d') => app.dump_state(),
                        KeyCode::Char('e') => app.save_config(),
                        KeyCode::Char('u') => app.save_user_preset(),

                        // Navigation
                        KeyCode::Tab => app.next_focus(),
                        KeyCode::BackTab => app.prev_focus(),
                        KeyCode::Up => {
                            if !app.show_help {
                                if app.focus.is_param() {
                                    app.adjust_focused_up();
                                } else {
                                    app.scroll_controls_up();
                                }
                            }
                        }
                        KeyCode::Down => {
                            if !app.show_help {
                                if app.focus.is_param() {
                                    app.adjust_focused_down();
                                } else {
                                    let term_size = terminal.size()?;
                                    let visible = ui::get_controls_visible_lines(term_size.height);
                                    app.scroll_controls_down(ui::CONTROLS_CONTENT_LINES.saturating_sub(visible));
                                }
                            }
                        }
                        KeyCode::Esc => {
                            if app.show_help {
                                app.toggle_help();
                            } else if app.focus.is_param() {
                                app.focus = Focus::Controls;
                            }
                        }
                        KeyCode::Char('j') => {
                            if app.show_help {
                                app.scroll_help_down(ui::HELP_CONTENT_LINES);
                            }
                        }
                        KeyCode::Char('k') => {
                            if app.show_help {
                                app.scroll_help_up();
                            }
                        }
                        _ => {}
                    }
                }
                Event::Resize(width, height) => {
                    let (canvas_width, canvas_height) = ui::get_canvas_size(
                        ratatui::layout::Rect {
                            x: 0,
                            y: 0,
                            width,
                            height,
                        },
                        app.fullscreen_mode,
                    );
                    app.resize(canvas_width, canvas_height);
                }
                _ => {}
            }
        }

        let now = Instant::now();
        let elapsed_ms = (now - last_tick).as_secs_f32() * 1000.0;
        last_tick = now;
        app.tick(elapsed_ms.min(MAX_FRAME_MS));
    }
}
