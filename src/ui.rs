use crate::app::{App, PARAMS};
use line_growth::braille;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 26;
const STATUS_HEIGHT: u16 = 9;
const PARAMS_HEIGHT: u16 = 12;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 60;

/// Number of lines in controls content
pub const CONTROLS_CONTENT_LINES: u16 = 22;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.param_popup.is_some() {
        render_param_popup(frame, area, app);
    }
    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Calculate the canvas size (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    if fullscreen {
        (frame_area.width.saturating_sub(2), frame_area.height.saturating_sub(2))
    } else {
        let canvas_width = frame_area.width.saturating_sub(SIDEBAR_WIDTH + 2);
        let canvas_height = frame_area.height.saturating_sub(2);
        (canvas_width, canvas_height)
    }
}

/// Controls lines visible in a terminal of the given height
pub fn get_controls_visible_lines(terminal_height: u16) -> u16 {
    terminal_height
        .saturating_sub(STATUS_HEIGHT + PARAMS_HEIGHT)
        .saturating_sub(2)
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(PARAMS_HEIGHT),
            Constraint::Min(5),
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Line Growth ");
    let view = app.field.snapshot();

    let progress = app.field.progress();
    let progress_width = (area.width.saturating_sub(4)) as usize;
    let filled = (progress * progress_width as f32) as usize;
    let empty = progress_width.saturating_sub(filled);

    let (status_text, status_color) = if app.paused {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else if view.done {
        ("DONE", Color::Green)
    } else if view.redrawing {
        ("REDRAWING", Color::Magenta)
    } else {
        ("GROWING", BORDER_COLOR)
    };
    let recording = if app.is_recording() { " ● REC" } else { "" };

    let text = |s: String| Line::from(Span::styled(s, Style::default().fg(TEXT_COLOR)));
    let dim = |s: String| Line::from(Span::styled(s, Style::default().fg(DIM_TEXT_COLOR)));

    let content = vec![
        text(format!("Lines: {}", view.lines_drawn)),
        text(format!("Fails: {} / {}", view.fails_count, app.field.settings.fails_until.stop)),
        text(format!("Min len: {}", view.current_min_len)),
        dim(format!("Angle: {:.0}°  Long: {}", view.angle.to_degrees(), view.long_lines_saved.len())),
        Line::from(vec![
            Span::styled("█".repeat(filled), Style::default().fg(Color::Green)),
            Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled(status_text, Style::default().fg(status_color)),
            Span::styled(recording, Style::default().fg(Color::Red)),
        ]),
        dim(app.status_message.clone().unwrap_or_default()),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let content: Vec<Line> = PARAMS
        .iter()
        .map(|(focus, _, label)| {
            let focused = app.focus == *focus;
            let prefix = if focused { "> " } else { "  " };
            let style = if focused {
                Style::default().fg(HIGHLIGHT_COLOR)
            } else {
                Style::default().fg(TEXT_COLOR)
            };
            Line::from(Span::styled(
                format!("{}{}: {}", prefix, label, app.param_value(*focus)),
                style,
            ))
        })
        .collect();

    // Keep the focused line visible
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2); // minus borders
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height || !app.focus.is_param() {
        0
    } else if focus_line >= visible_height {
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0
    };

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let settings = &app.field.settings;

    let make_control = |key: &str, desc: String| -> Line<'_> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Space", "pause/resume".to_string()),
        make_control("H", "help".to_string()),
        make_control("R", "restart (same seed)".to_string()),
        make_control("N", "new seed".to_string()),
        make_control("1-9", "presets".to_string()),
        make_control("C", format!("colors: {}", app.color_scheme.name())),
        make_control("M", format!("mix: {}", settings.colors.mix_space.name())),
        make_control("T", format!("pattern: {}", settings.colors.pattern.name())),
        make_control("O", format!("sort: {}", settings.colors.sort.name())),
        make_control("S", format!("seed: {}", settings.new_pixel_method.name())),
        make_control("X", "shadow".to_string()),
        make_control("W", "redraw".to_string()),
        make_control("V", "fullscreen".to_string()),
        make_control("+/-", format!("speed: {:.2}x", app.speed)),
        make_control("P", "save PNG".to_string()),
        make_control("G", if app.is_recording() { "stop GIF" } else { "record GIF" }.to_string()),
        make_control("D", "dump state".to_string()),
        make_control("E", "export config".to_string()),
        make_control("U", "save preset".to_string()),
        make_control("Tab", "select param".to_string()),
        make_control("↑↓", "adjust param".to_string()),
        make_control("Q", "quit".to_string()),
    ];

    let content_height = content.len() as u16;
    let visible_height = area.height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);

    let title = if max_scroll > 0 {
        " Controls (↑↓) "
    } else {
        " Controls "
    };

    let paragraph = Paragraph::new(content)
        .block(styled_block(title))
        .scroll((app.controls_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cells = braille::render_to_braille(
        app.field.surface(),
        inner.width,
        inner.height,
        app.field.settings.alpha_threshold,
    );

    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            let cell_rect = Rect {
                x,
                y,
                width: 1,
                height: 1,
            };
            let span = Span::styled(cell.char.to_string(), Style::default().fg(cell.color));
            frame.render_widget(Paragraph::new(Line::from(span)), cell_rect);
        }
    }
}

fn render_param_popup(frame: &mut Frame, area: Rect, app: &App) {
    let Some(popup) = &app.param_popup else {
        return;
    };

    let width = 30.min(area.width);
    let height = (popup.options.len() as u16 + 2).min(area.height);
    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup_area);

    let content: Vec<Line> = popup
        .options
        .iter()
        .enumerate()
        .map(|(i, (_, name))| {
            let style = if i == popup.selected_idx {
                Style::default().fg(Color::Black).bg(HIGHLIGHT_COLOR)
            } else {
                Style::default().fg(TEXT_COLOR)
            };
            Line::from(Span::styled(format!(" {} ", name), style))
        })
        .collect();

    let visible = height.saturating_sub(2);
    let scroll = (popup.selected_idx as u16).saturating_sub(visible.saturating_sub(1));
    let title = format!(" {} ", popup.letter);
    let paragraph = Paragraph::new(content)
        .block(styled_block(&title))
        .scroll((scroll, 0));
    frame.render_widget(paragraph, popup_area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    // Calculate the canvas area (exclude sidebar unless fullscreen)
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(40);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    frame.render_widget(Clear, help_area);

    let heading = |s: &'static str| Line::from(Span::styled(s, Style::default().fg(HIGHLIGHT_COLOR)));
    let item = |s: &'static str| Line::from(Span::styled(s, Style::default().fg(TEXT_COLOR)));

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("LINE GROWTH", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Lines random-walk from blank seed pixels, turning away from anything already drawn. When seeds keep failing, the search moves near long lines, then anywhere, then accepts shorter lines until the canvas is full."),
        Line::from(""),
        heading("SEEDING:"),
        item("S - Pixel Method"),
        Line::from("Anywhere, Circle or Square around the lane's anchor"),
        item("Share Anchor"),
        Line::from("All lanes search around one anchor"),
        Line::from(""),
        heading("COLOR:"),
        item("T - Pattern"),
        Line::from("Step walks the palette per segment; Length picks by line length"),
        item("M - Mix Space"),
        Line::from("RGB, HSL (short hue path) or OKLab blending between entries"),
        item("O - Sort"),
        Line::from("Reorder the palette by lightness or hue"),
        Line::from(""),
        heading("EXTRAS:"),
        item("W - Redraw"),
        Line::from("Re-stroke saved long lines every few lines"),
        item("X - Shadow"),
        Line::from("Offset translucent copy under each segment"),
        Line::from(""),
        heading("OUTPUT:"),
        Line::from("P=PNG, G=GIF start/stop, D=state JSON, E=config JSON, U=save preset"),
        Line::from(""),
        heading("BASIC CONTROLS:"),
        Line::from("Space=Pause, R=Restart, N=New seed, 1-9=Presets, C=Colors, V=Fullscreen, Tab/Arrows=Adjust, Shift+letter=Jump, +/-=Speed, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);

    let title = if max_scroll > 0 {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
