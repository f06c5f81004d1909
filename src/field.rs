use crate::canvas::{is_blank, Surface};
use crate::color::{ease_out, mix, PaletteSort, Rgba};
use crate::geometry::{random_in_circle, random_in_square, Domain, Point};
use crate::settings::{ColorPattern, GrowthSettings, NewPixelMethod, WiggleDir};
use crate::walk::{grow_line, PointCheck, WalkConfig};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use std::collections::VecDeque;
use std::f32::consts::TAU;
use tracing::{debug, info};

/// Color used when the palette is empty
const FALLBACK_COLOR: Rgba = Rgba::rgb(255, 255, 255);

/// Which anchor each lane searches around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnchorPolicy {
    /// One anchor per lane
    PerLane,
    /// Every lane uses the same anchor
    Shared,
}

/// One concurrently growing line slot
#[derive(Debug, Clone, Default)]
struct LaneState {
    /// Points still to draw; the front pair is the next segment
    points: VecDeque<Point>,
    /// Point count of the line when it was committed
    line_length: usize,
    /// Fractional palette cursor for the step pattern
    color_index: f32,
}

impl LaneState {
    fn is_active(&self) -> bool {
        self.points.len() >= 2
    }
}

/// Read-only view of a lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneView {
    pub anchor: Point,
    pub remaining: Vec<Point>,
    pub line_length: usize,
    pub color_index: f32,
}

/// Read-only copy of the field's mutable state, for polling hosts.
/// The settings are not copied; they stay public on the field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateView {
    pub width: usize,
    pub height: usize,
    pub pixel_density: usize,
    pub anchor_policy: AnchorPolicy,
    pub angle: f32,
    pub current_min_len: usize,
    pub fails_count: u32,
    pub lines_drawn: usize,
    /// Long lines still waiting to serve as relocation targets, oldest first
    pub long_lines_queued: Vec<Vec<Point>>,
    pub long_lines_saved: Vec<Vec<Point>>,
    /// Palette after the active sort
    pub current_palette: Vec<Rgba>,
    pub redrawn_count: usize,
    pub redrawing: bool,
    pub done_adding: bool,
    pub done: bool,
    pub steps_taken: u64,
    pub lanes: Vec<LaneView>,
}

/// Grows random-walk lines across a surface until it runs out of room
pub struct GrowthField<S: Surface> {
    surface: S,
    width: usize,
    height: usize,
    pixel_density: usize,
    domain: Domain,
    palette: Vec<Rgba>,
    current_palette: Vec<Rgba>,
    /// Sort that `current_palette` was built with
    palette_sort: PaletteSort,
    anchor_policy: AnchorPolicy,
    anchors: Vec<Point>,
    lanes: Vec<LaneState>,
    angle: f32,
    current_min_len: usize,
    fails_count: u32,
    lines_drawn: usize,
    long_lines: VecDeque<Vec<Point>>,
    long_lines_saved: Vec<Vec<Point>>,
    redrawn_count: usize,
    redrawing: bool,
    done_adding: bool,
    done: bool,
    steps_taken: u64,
    /// Live settings, re-read on every step
    pub settings: GrowthSettings,
    rng: Pcg64,
}

impl<S: Surface> GrowthField<S> {
    /// Create a field with `parallel` lanes drawing on `surface`
    pub fn new(surface: S, settings: GrowthSettings, parallel: usize, palette: Vec<Rgba>, seed: u64) -> Self {
        let width = surface.width();
        let height = surface.height();
        let pixel_density = surface.pixel_density();
        let anchor_policy = if settings.look_point_share {
            AnchorPolicy::Shared
        } else {
            AnchorPolicy::PerLane
        };
        let parallel = parallel.max(1);

        let mut field = Self {
            surface,
            width,
            height,
            pixel_density,
            domain: Domain::new(width as f32, height as f32),
            current_palette: settings.colors.sort.apply(&palette),
            palette_sort: settings.colors.sort,
            palette,
            anchor_policy,
            anchors: Vec::new(),
            lanes: vec![LaneState::default(); parallel],
            angle: 0.0,
            current_min_len: settings.len.min_start,
            fails_count: 0,
            lines_drawn: 0,
            long_lines: VecDeque::new(),
            long_lines_saved: Vec::new(),
            redrawn_count: 0,
            redrawing: false,
            done_adding: false,
            done: false,
            steps_taken: 0,
            settings,
            rng: Pcg64::seed_from_u64(seed),
        };
        field.reset();
        field
    }

    /// Reinitialise all mutable state and clear the surface.
    /// Geometry, palette and lane count are kept.
    pub fn reset(&mut self) {
        self.surface.clear();
        self.surface.load_pixels();

        self.angle = self.rng.gen_range(0.0..TAU);
        let anchor_count = match self.anchor_policy {
            AnchorPolicy::PerLane => self.lanes.len(),
            AnchorPolicy::Shared => 1,
        };
        let domain = self.domain;
        self.anchors = (0..anchor_count).map(|_| domain.random_point(&mut self.rng)).collect();
        self.lanes.iter_mut().for_each(|lane| *lane = LaneState::default());

        self.current_min_len = self.settings.len.min_start;
        self.fails_count = 0;
        self.lines_drawn = 0;
        self.long_lines.clear();
        self.long_lines_saved.clear();
        self.redrawn_count = 0;
        self.redrawing = false;
        self.done_adding = false;
        self.done = false;
        self.steps_taken = 0;
        self.sync_palette();
    }

    /// Replace the random stream; takes effect from the next draw
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg64::seed_from_u64(seed);
    }

    /// Advance by `delta_ms` of wall-clock time. Returns true once done.
    pub fn update(&mut self, delta_ms: f32) -> bool {
        if self.done {
            return true;
        }
        self.sync_palette();
        self.clamp_min_len();

        let steps = (delta_ms / 1000.0 * self.settings.step_rate).round().max(0.0) as u64;
        'steps: for _ in 0..steps {
            self.steps_taken += 1;
            for lane in 0..self.lanes.len() {
                if self.lanes[lane].is_active() {
                    self.line_step(lane);
                } else if !self.done_adding {
                    self.maybe_get_new_line(lane);
                }
                if self.done {
                    break 'steps;
                }
            }
        }
        self.done
    }

    /// One bounded attempt to start a line in an idle lane
    pub fn maybe_get_new_line(&mut self, lane: usize) -> bool {
        self.clamp_min_len();
        let Some(seed) = self.maybe_get_new_pixel(lane) else {
            self.add_fail(lane);
            return false;
        };

        let config = WalkConfig {
            wiggle: self.settings.wiggle.within_line,
            wiggle_max: self.settings.wiggle.max,
            max_tries: self.settings.tries.line_point,
            len_max: self.settings.len.max,
            len_min: self.current_min_len,
            step: self.settings.step_size,
        };
        let domain = self.domain;
        let (width, density) = (self.width, self.pixel_density);
        let threshold = self.settings.alpha_threshold;
        let pixels = self.surface.pixels();
        let check = |p: Point| {
            if !domain.contains(p) {
                PointCheck::Stop
            } else if is_blank(pixels, width, density, p.x, p.y, threshold) {
                PointCheck::Valid
            } else {
                PointCheck::Invalid
            }
        };

        match grow_line(&mut self.rng, seed, self.angle, &config, check) {
            Some(points) => {
                self.set_line(lane, points, false);
                true
            }
            None => {
                self.add_fail(lane);
                false
            }
        }
    }

    /// Sample up to `tries.pixel` candidates around the lane's anchor and
    /// return the first blank one
    pub fn maybe_get_new_pixel(&mut self, lane: usize) -> Option<Point> {
        let anchor = self.anchors[self.anchor_slot(lane)];
        let method = self.settings.new_pixel_method;
        let radius = self.settings.new_pixel_radius;
        let threshold = self.settings.alpha_threshold;

        for _ in 0..self.settings.tries.pixel {
            let candidate = match method {
                NewPixelMethod::Anywhere => self.domain.random_point(&mut self.rng),
                NewPixelMethod::Circle => random_in_circle(&mut self.rng, anchor, radius),
                NewPixelMethod::Square => random_in_square(&mut self.rng, anchor, radius),
            };
            if self.domain.contains(candidate)
                && is_blank(
                    self.surface.pixels(),
                    self.width,
                    self.pixel_density,
                    candidate.x,
                    candidate.y,
                    threshold,
                )
            {
                return Some(candidate);
            }
        }
        None
    }

    /// Make `points` the lane's active line. Non-redraw lines whose ends are
    /// far enough apart are queued as long lines.
    pub fn set_line(&mut self, lane: usize, points: Vec<Point>, from_redraw: bool) {
        if !from_redraw {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                let threshold = self.width as f32 * self.settings.long_line_ratio;
                if first.distance(*last) > threshold {
                    debug!(lane, points = points.len(), "long line captured");
                    self.long_lines.push_back(points.clone());
                    self.long_lines_saved.push(points.clone());
                }
            }
        }
        if !points.is_empty() {
            debug!(lane, points = points.len(), from_redraw, "line committed");
            self.fails_count = 0;
        }

        let state = &mut self.lanes[lane];
        state.line_length = points.len();
        state.points = points.into();
    }

    /// Record a failed start and escalate the backoff.
    ///
    /// The relocation stages are exclusive, the length reduction and the
    /// stop check are independent of them.
    pub fn add_fail(&mut self, lane: usize) {
        self.clamp_min_len();
        self.fails_count += 1;
        let until = self.settings.fails_until;
        let slot = self.anchor_slot(lane);

        if self.fails_count >= until.move_look && !self.long_lines.is_empty() {
            if let Some(line) = self.long_lines.pop_front() {
                let anchor = line[line.len() / 2];
                debug!(lane, x = anchor.x, y = anchor.y, "anchor moved to long line");
                self.anchors[slot] = anchor;
            }
        } else if self.fails_count >= until.force_move_look {
            let anchor = self.domain.random_point(&mut self.rng);
            debug!(lane, x = anchor.x, y = anchor.y, "anchor forced to random point");
            self.anchors[slot] = anchor;
        }

        if self.fails_count >= until.reduce_min_len {
            let len = self.settings.len;
            let reduced = self.current_min_len.saturating_sub(len.min_reduce_by).max(len.min_end);
            if reduced < self.current_min_len {
                debug!(from = self.current_min_len, to = reduced, "min length reduced");
                self.current_min_len = reduced;
            }
        }

        if self.fails_count >= until.stop && self.current_min_len <= self.settings.len.min_end {
            self.finish_growth();
        }
    }

    /// Pull `current_min_len` back inside the live length bounds. The floor
    /// wins when the bounds are crossed.
    fn clamp_min_len(&mut self) {
        let len = self.settings.len;
        let clamped = self.current_min_len.min(len.min_start).max(len.min_end);
        if clamped != self.current_min_len {
            debug!(from = self.current_min_len, to = clamped, "min length clamped to new bounds");
            self.current_min_len = clamped;
        }
    }

    fn finish_growth(&mut self) {
        self.done_adding = true;
        self.done = true;
        self.long_lines_saved.sort_by(|a, b| b.len().cmp(&a.len()));
        self.redrawn_count = 0;
        info!(
            lines_drawn = self.lines_drawn,
            long_lines = self.long_lines_saved.len(),
            "growth field exhausted"
        );
    }

    /// Draw the next segment of the lane's line
    pub fn line_step(&mut self, lane: usize) {
        if !self.lanes[lane].is_active() {
            return;
        }
        let color = self.set_color(lane);
        let (a, b) = {
            let points = &self.lanes[lane].points;
            (points[0], points[1])
        };

        self.surface.stroke_weight(self.settings.stroke_weight);
        if let Some(shadow) = self.settings.shadow {
            let off = shadow.offset;
            self.surface.stroke(Rgba::rgb(0, 0, 0).with_alpha(shadow.alpha));
            self.surface.line(a.x + off, a.y + off, b.x + off, b.y + off);
        }
        self.surface.stroke(color);
        self.surface.line(a.x, a.y, b.x, b.y);

        self.lanes[lane].points.pop_front();
        if !self.lanes[lane].is_active() {
            self.finish_line(lane);
        }
    }

    /// Stroke color for the lane's next segment
    pub fn set_color(&mut self, lane: usize) -> Rgba {
        let palette = &self.current_palette;
        if palette.is_empty() {
            return FALLBACK_COLOR;
        }
        let n = palette.len();
        let colors = self.settings.colors;

        match colors.pattern {
            ColorPattern::Step => {
                let state = &mut self.lanes[lane];
                let pos = state.color_index.rem_euclid(n as f32);
                let lo = (pos.floor() as usize).min(n - 1);
                let hi = (lo + 1) % n;
                let color = mix(palette[lo], palette[hi], pos - pos.floor(), colors.mix_space);
                state.color_index = (pos + colors.step_move).rem_euclid(n as f32);
                color
            }
            ColorPattern::Length => {
                let len = self.settings.len;
                let lo = len.min_end as f32;
                let hi = len.max_for_color.min(len.max) as f32;
                let length = self.lanes[lane].line_length as f32;
                let t = if hi > lo {
                    (length.clamp(lo, hi) - lo) / (hi - lo)
                } else {
                    1.0
                };
                let idx = (ease_out(t) * (n - 1) as f32).round() as usize;
                palette[idx.min(n - 1)]
            }
        }
    }

    /// Wrap up a finished line: publish pixels, rotate the angle, maybe redraw
    pub fn finish_line(&mut self, lane: usize) {
        self.lines_drawn += 1;
        self.surface.load_pixels();
        self.set_line(lane, Vec::new(), false);
        self.redrawing = false;

        let wiggle = self.settings.wiggle;
        if wiggle.n_lines > 0 && self.lines_drawn % wiggle.n_lines == 0 {
            let amount = if wiggle.between_line > 0.0 {
                self.rng.gen_range(0.0..=wiggle.between_line)
            } else {
                0.0
            };
            let sign = match wiggle.dir {
                WiggleDir::Random => {
                    if self.rng.gen_bool(0.5) {
                        1.0
                    } else {
                        -1.0
                    }
                }
                WiggleDir::Clockwise => 1.0,
                WiggleDir::CounterClockwise => -1.0,
            };
            self.angle = (self.angle + sign * amount).rem_euclid(TAU);
        }

        if let Some(redraw) = self.settings.redraw {
            let quota = (self.long_lines_saved.len() as f32 * redraw.max_mult).floor() as usize;
            let on_cadence = redraw.rate > 0 && self.lines_drawn % redraw.rate == 0;
            if on_cadence && self.lines_drawn >= redraw.after && self.redrawn_count < quota {
                self.do_redraw(lane);
            }
        }
    }

    /// Put the next saved long line back into the lane
    pub fn do_redraw(&mut self, lane: usize) -> bool {
        if self.long_lines_saved.is_empty() {
            return false;
        }
        self.redrawing = true;
        self.redrawn_count += 1;
        let idx = self.redrawn_count % self.long_lines_saved.len();
        let line = self.long_lines_saved[idx].clone();
        debug!(lane, idx, redrawn = self.redrawn_count, "redrawing long line");
        self.set_line(lane, line, true);
        true
    }

    /// Swap in a new palette; the configured sort is applied immediately
    pub fn set_palette(&mut self, palette: Vec<Rgba>) {
        self.palette = palette;
        self.current_palette = self.settings.colors.sort.apply(&self.palette);
        self.palette_sort = self.settings.colors.sort;
    }

    /// Rebuild the sorted palette if the sort setting changed
    fn sync_palette(&mut self) {
        if self.palette_sort != self.settings.colors.sort {
            self.current_palette = self.settings.colors.sort.apply(&self.palette);
            self.palette_sort = self.settings.colors.sort;
        }
    }

    fn anchor_slot(&self, lane: usize) -> usize {
        match self.anchor_policy {
            AnchorPolicy::PerLane => lane,
            AnchorPolicy::Shared => 0,
        }
    }

    /// Snapshot of all mutable state
    pub fn snapshot(&self) -> StateView {
        StateView {
            width: self.width,
            height: self.height,
            pixel_density: self.pixel_density,
            anchor_policy: self.anchor_policy,
            angle: self.angle,
            current_min_len: self.current_min_len,
            fails_count: self.fails_count,
            lines_drawn: self.lines_drawn,
            long_lines_queued: self.long_lines.iter().cloned().collect(),
            long_lines_saved: self.long_lines_saved.clone(),
            current_palette: self.current_palette.clone(),
            redrawn_count: self.redrawn_count,
            redrawing: self.redrawing,
            done_adding: self.done_adding,
            done: self.done,
            steps_taken: self.steps_taken,
            lanes: self
                .lanes
                .iter()
                .enumerate()
                .map(|(i, lane)| LaneView {
                    anchor: self.anchors[self.anchor_slot(i)],
                    remaining: lane.points.iter().copied().collect(),
                    line_length: lane.line_length,
                    color_index: lane.color_index,
                })
                .collect(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn palette(&self) -> &[Rgba] {
        &self.palette
    }

    pub fn current_palette(&self) -> &[Rgba] {
        &self.current_palette
    }

    /// Saved long lines; longest first once the field is done
    pub fn long_lines_saved(&self) -> &[Vec<Point>] {
        &self.long_lines_saved
    }

    pub fn parallel(&self) -> usize {
        self.lanes.len()
    }

    pub fn current_min_len(&self) -> usize {
        self.current_min_len
    }

    pub fn fails_count(&self) -> u32 {
        self.fails_count
    }

    pub fn lines_drawn(&self) -> usize {
        self.lines_drawn
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Progress estimate (0.0 to 1.0) from the fail counter and the min length decay
    pub fn progress(&self) -> f32 {
        if self.done {
            return 1.0;
        }
        let len = self.settings.len;
        let span = len.min_start.saturating_sub(len.min_end).max(1) as f32;
        let decayed = len.min_start.saturating_sub(self.current_min_len) as f32 / span;
        let fails = self.fails_count as f32 / self.settings.fails_until.stop.max(1) as f32;
        (decayed * 0.8 + fails.min(1.0) * 0.2).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelCanvas;
    use crate::color::MixSpace;
    use crate::settings::{FailThresholds, RedrawSettings};
    use proptest::prelude::*;

    fn two_colors() -> Vec<Rgba> {
        vec![Rgba::rgb(0, 0, 0), Rgba::rgb(200, 100, 40)]
    }

    fn field_with(settings: GrowthSettings, size: usize, parallel: usize) -> GrowthField<PixelCanvas> {
        GrowthField::new(PixelCanvas::new(size, size, 1), settings, parallel, two_colors(), 7)
    }

    fn line(from: Point, to: Point, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
            })
            .collect()
    }

    fn exhaustion_settings() -> GrowthSettings {
        let mut settings = GrowthSettings::default();
        settings.alpha_threshold = 0; // nothing is ever blank
        settings.fails_until = FailThresholds {
            stop: 5,
            move_look: 2,
            force_move_look: 3,
            reduce_min_len: 4,
        };
        settings.len.min_start = 20;
        settings.len.min_end = 10;
        settings.len.min_reduce_by = 5;
        settings
    }

    #[test]
    fn test_step_budget_follows_elapsed_time() {
        let mut settings = GrowthSettings::default();
        settings.step_rate = 100.0;
        let mut field = field_with(settings, 400, 1);

        let mut expected = 0;
        for k in 1..6u64 {
            field.update(1000.0 * k as f32 / 100.0);
            expected += k;
            assert_eq!(field.snapshot().steps_taken, expected);
        }
        field.update(0.0);
        assert_eq!(field.snapshot().steps_taken, expected);
    }

    #[test]
    fn test_exhaustion_after_five_failures() {
        let mut field = field_with(exhaustion_settings(), 50, 1);
        for _ in 0..4 {
            assert!(!field.maybe_get_new_line(0));
            assert!(!field.is_done());
        }
        assert!(!field.maybe_get_new_line(0));
        assert!(field.is_done());
        assert_eq!(field.current_min_len(), 10);
        assert_eq!(field.fails_count(), 5);
    }

    #[test]
    fn test_exhaustion_stops_update_mid_budget() {
        let mut settings = exhaustion_settings();
        settings.step_rate = 1000.0;
        let mut field = field_with(settings, 50, 1);
        assert!(field.update(1000.0));
        let view = field.snapshot();
        assert!(view.done && view.done_adding);
        assert_eq!(view.steps_taken, 5);
        assert_eq!(view.current_min_len, 10);
    }

    #[test]
    fn test_successful_line_resets_fail_counter() {
        let mut field = field_with(GrowthSettings::default(), 200, 1);
        field.add_fail(0);
        field.add_fail(0);
        assert_eq!(field.fails_count(), 2);

        let mut started = false;
        for _ in 0..50 {
            if field.maybe_get_new_line(0) {
                started = true;
                break;
            }
        }
        assert!(started);
        assert_eq!(field.fails_count(), 0);
    }

    #[test]
    fn test_committed_lines_meet_min_len() {
        let mut settings = GrowthSettings::default();
        settings.len.min_start = 30;
        settings.len.min_end = 4;
        settings.fails_until.reduce_min_len = 5;
        settings.fails_until.stop = 60;
        let mut field = field_with(settings, 60, 1);

        for _ in 0..20_000 {
            if field.is_done() {
                break;
            }
            if field.snapshot().lanes[0].remaining.len() >= 2 {
                field.line_step(0);
            } else {
                let min_len = field.current_min_len();
                if field.maybe_get_new_line(0) {
                    assert!(field.snapshot().lanes[0].line_length >= min_len);
                }
            }
        }
        assert!(field.lines_drawn() > 0);
    }

    #[test]
    fn test_long_line_capture_threshold() {
        let mut settings = GrowthSettings::default();
        settings.long_line_ratio = 0.25; // 25px on a 100px canvas
        let mut field = field_with(settings, 100, 1);

        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(20.0, 0.0), 21), false);
        assert_eq!(field.snapshot().long_lines_saved.len(), 0);

        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(25.0, 0.0), 26), false);
        assert_eq!(field.snapshot().long_lines_saved.len(), 0);

        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(30.0, 0.0), 31), false);
        let view = field.snapshot();
        assert_eq!(view.long_lines_saved.len(), 1);
        assert_eq!(view.long_lines_queued.len(), 1);
        assert_eq!(view.long_lines_saved[0].last(), Some(&Point::new(30.0, 0.0)));
        assert_eq!(view.long_lines_queued[0], view.long_lines_saved[0]);

        // Redraws never re-queue
        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(60.0, 0.0), 61), true);
        assert_eq!(field.snapshot().long_lines_saved.len(), 1);
    }

    #[test]
    fn test_step_colors_walk_the_palette() {
        let mut settings = GrowthSettings::default();
        settings.colors.pattern = ColorPattern::Step;
        settings.colors.step_move = 0.25;
        settings.colors.mix_space = MixSpace::Rgb;
        let mut field = field_with(settings, 20, 1);
        let [a, b] = [two_colors()[0], two_colors()[1]];

        assert_eq!(field.set_color(0), a);
        assert_eq!(field.set_color(0), Rgba::rgb(50, 25, 10));
        assert_eq!(field.set_color(0), Rgba::rgb(100, 50, 20));
        assert_eq!(field.set_color(0), Rgba::rgb(150, 75, 30));
        assert_eq!(field.snapshot().lanes[0].color_index, 1.0);

        // Past the last entry the mix runs back toward the first
        assert_eq!(field.set_color(0), b);
        assert_eq!(field.set_color(0), mix(b, a, 0.25, MixSpace::Rgb));
    }

    #[test]
    fn test_step_colors_in_oklab() {
        let mut settings = GrowthSettings::default();
        settings.colors.step_move = 0.25;
        settings.colors.mix_space = MixSpace::Oklab;
        let mut field = field_with(settings, 20, 1);
        let (a, b) = (two_colors()[0], two_colors()[1]);

        for pos in [0.0, 0.25, 0.5, 0.75] {
            assert_eq!(field.set_color(0), mix(a, b, pos, MixSpace::Oklab));
        }
    }

    #[test]
    fn test_color_index_wraps() {
        let mut settings = GrowthSettings::default();
        settings.colors.step_move = 0.7;
        let mut field = field_with(settings, 20, 1);
        for _ in 0..50 {
            field.set_color(0);
            let idx = field.snapshot().lanes[0].color_index;
            assert!((0.0..2.0).contains(&idx), "index {}", idx);
        }
    }

    #[test]
    fn test_length_colors_use_ease_out() {
        let mut settings = GrowthSettings::default();
        settings.colors.pattern = ColorPattern::Length;
        settings.len.min_end = 10;
        settings.len.max_for_color = 110;
        let palette: Vec<Rgba> = (0..5).map(|i| Rgba::rgb(i * 50, 0, 0)).collect();
        let mut field = GrowthField::new(PixelCanvas::new(200, 200, 1), settings, 1, palette.clone(), 1);

        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(5.0, 0.0), 6), false);
        assert_eq!(field.set_color(0), palette[0]);

        // t = 0.5 -> eased 0.75 -> index 3
        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(59.0, 0.0), 60), false);
        assert_eq!(field.set_color(0), palette[3]);

        field.set_line(0, line(Point::new(0.0, 0.0), Point::new(150.0, 0.0), 151), false);
        assert_eq!(field.set_color(0), palette[4]);
    }

    #[test]
    fn test_move_look_uses_oldest_long_line() {
        let mut settings = GrowthSettings::default();
        settings.alpha_threshold = 0;
        settings.fails_until = FailThresholds {
            move_look: 2,
            force_move_look: 100,
            reduce_min_len: 100,
            stop: 100,
        };
        let mut field = field_with(settings, 100, 1);
        let first = line(Point::new(10.0, 10.0), Point::new(90.0, 10.0), 81);
        let second = line(Point::new(10.0, 50.0), Point::new(90.0, 50.0), 81);
        field.set_line(0, first.clone(), false);
        field.set_line(0, second, false);
        field.set_line(0, Vec::new(), false);

        field.add_fail(0);
        assert_eq!(field.snapshot().long_lines_queued.len(), 2);
        field.add_fail(0);
        let view = field.snapshot();
        assert_eq!(view.long_lines_queued.len(), 1);
        assert_eq!(view.lanes[0].anchor, first[40]);
        assert_eq!(view.long_lines_saved.len(), 2);
    }

    #[test]
    fn test_backoff_stages_can_fire_together() {
        // Misordered thresholds: relocation and reduction land on the same call
        let mut settings = GrowthSettings::default();
        settings.fails_until = FailThresholds {
            move_look: 1,
            force_move_look: 1,
            reduce_min_len: 1,
            stop: 1000,
        };
        settings.len.min_start = 20;
        settings.len.min_end = 5;
        settings.len.min_reduce_by = 3;
        let mut field = field_with(settings, 100, 1);
        let before = field.snapshot().lanes[0].anchor;

        field.add_fail(0);
        let view = field.snapshot();
        assert_ne!(view.lanes[0].anchor, before);
        assert_eq!(view.current_min_len, 17);
    }

    #[test]
    fn test_shared_anchor_policy() {
        let mut settings = GrowthSettings::default();
        settings.look_point_share = true;
        settings.fails_until.force_move_look = 1;
        let mut field = field_with(settings, 100, 3);

        let view = field.snapshot();
        assert_eq!(view.anchor_policy, AnchorPolicy::Shared);
        assert!(view.lanes.iter().all(|l| l.anchor == view.lanes[0].anchor));

        field.add_fail(2);
        let moved = field.snapshot();
        assert_ne!(moved.lanes[0].anchor, view.lanes[0].anchor);
        assert!(moved.lanes.iter().all(|l| l.anchor == moved.lanes[0].anchor));
    }

    #[test]
    fn test_per_lane_anchors_move_independently() {
        let mut settings = GrowthSettings::default();
        settings.fails_until.force_move_look = 1;
        let mut field = field_with(settings, 100, 2);
        let before = field.snapshot();
        field.add_fail(1);
        let after = field.snapshot();
        assert_eq!(after.lanes[0].anchor, before.lanes[0].anchor);
        assert_ne!(after.lanes[1].anchor, before.lanes[1].anchor);
    }

    #[test]
    fn test_line_step_draws_and_finishes() {
        let mut field = field_with(GrowthSettings::default(), 50, 1);
        field.set_line(0, line(Point::new(5.0, 5.0), Point::new(5.0, 15.0), 11), false);

        for _ in 0..9 {
            field.line_step(0);
        }
        assert_eq!(field.lines_drawn(), 0);
        // Not published until the line finishes
        assert!(is_blank(field.surface().pixels(), 50, 1, 5.0, 8.0, 10));

        field.line_step(0);
        assert_eq!(field.lines_drawn(), 1);
        assert!(field.snapshot().lanes[0].remaining.is_empty());
        assert!(!is_blank(field.surface().pixels(), 50, 1, 5.0, 8.0, 10));
    }

    #[test]
    fn test_angle_rotates_every_n_lines() {
        let mut settings = GrowthSettings::default();
        settings.wiggle.n_lines = 2;
        settings.wiggle.between_line = 0.5;
        settings.wiggle.dir = WiggleDir::Clockwise;
        let mut field = field_with(settings, 50, 1);
        let start = field.angle();

        field.finish_line(0);
        assert_eq!(field.angle(), start);

        field.finish_line(0);
        let delta = (field.angle() - start).rem_euclid(TAU);
        assert!(delta <= 0.5 + 1e-5, "delta {}", delta);
    }

    #[test]
    fn test_redraw_reuses_saved_long_lines() {
        let mut settings = GrowthSettings::default();
        settings.redraw = Some(RedrawSettings {
            rate: 1,
            max_mult: 1.0,
            after: 0,
        });
        let mut field = field_with(settings, 100, 1);
        let long = line(Point::new(10.0, 10.0), Point::new(80.0, 10.0), 8);
        field.set_line(0, long.clone(), false);

        for _ in 0..7 {
            field.line_step(0);
        }
        let view = field.snapshot();
        assert_eq!(view.lines_drawn, 1);
        assert!(view.redrawing);
        assert_eq!(view.redrawn_count, 1);
        assert_eq!(view.lanes[0].remaining, long);
        assert_eq!(view.long_lines_saved.len(), 1);

        // Quota of one redraw is spent
        for _ in 0..7 {
            field.line_step(0);
        }
        let view = field.snapshot();
        assert_eq!(view.lines_drawn, 2);
        assert!(!view.redrawing);
        assert_eq!(view.redrawn_count, 1);
        assert!(view.lanes[0].remaining.is_empty());
    }

    #[test]
    fn test_done_field_is_frozen() {
        let mut settings = GrowthSettings::default();
        settings.fails_until = FailThresholds {
            move_look: 5,
            force_move_look: 10,
            reduce_min_len: 10,
            stop: 30,
        };
        let mut field = field_with(settings, 80, 2);
        for _ in 0..200 {
            field.update(50.0);
        }
        assert!(field.lines_drawn() > 0);

        // Nothing is blank any more: the field must run down to done
        field.settings.alpha_threshold = 0;
        let mut rounds = 0;
        while !field.update(50.0) {
            rounds += 1;
            assert!(rounds < 10_000, "field never finished");
        }

        let view = field.snapshot();
        let saved = field.long_lines_saved().to_vec();
        assert!(saved.windows(2).all(|w| w[0].len() >= w[1].len()));

        assert!(field.update(1000.0));
        assert!(field.update(5000.0));
        assert_eq!(field.snapshot(), view);
        assert_eq!(field.long_lines_saved(), saved.as_slice());
    }

    #[test]
    fn test_hot_reconfiguration() {
        let mut settings = GrowthSettings::default();
        settings.step_rate = 100.0;
        let mut field = field_with(settings, 200, 1);

        field.update(100.0);
        assert_eq!(field.snapshot().steps_taken, 10);

        field.settings.step_rate = 500.0;
        field.update(100.0);
        assert_eq!(field.snapshot().steps_taken, 60);

        field.settings.colors.sort = PaletteSort::LightnessReverse;
        field.update(0.0);
        assert_eq!(field.current_palette()[0], Rgba::rgb(200, 100, 40));
        assert_eq!(field.palette()[0], Rgba::rgb(0, 0, 0));
        assert_eq!(field.snapshot().current_palette, field.current_palette());
    }

    #[test]
    fn test_min_len_follows_length_bounds_mid_run() {
        let mut settings = exhaustion_settings();
        settings.fails_until = FailThresholds {
            stop: 1000,
            move_look: 1000,
            force_move_look: 1000,
            reduce_min_len: 1,
        };
        let mut field = field_with(settings, 50, 1);
        field.add_fail(0);
        field.add_fail(0);
        assert_eq!(field.current_min_len(), 10);

        // Raised floor pulls the live minimum up before the next attempt
        field.settings.adjust_len_min_end(8);
        assert_eq!(field.settings.len.min_end, 18);
        field.add_fail(0);
        assert_eq!(field.current_min_len(), 18);
        field.update(100.0);
        let now = field.current_min_len();
        assert!((18..=20).contains(&now), "current_min_len {now} outside 18..=20");

        // Lowered start pulls it down
        let mut field = field_with(GrowthSettings::default(), 100, 1);
        assert_eq!(field.current_min_len(), 60);
        field.settings.adjust_len_min_start(-40);
        assert_eq!(field.settings.len.min_start, 20);
        field.update(0.0);
        assert_eq!(field.current_min_len(), 20);
        assert_eq!(field.snapshot().current_min_len, 20);
    }

    #[test]
    fn test_raised_floor_applies_to_new_lines() {
        let mut settings = GrowthSettings::default();
        settings.len.min_start = 4;
        settings.len.min_end = 2;
        settings.new_pixel_method = NewPixelMethod::Anywhere;
        let mut field = field_with(settings, 200, 1);

        field.settings.len.min_end = 30;
        field.settings.len.min_start = 30;
        for _ in 0..20 {
            if field.maybe_get_new_line(0) {
                assert!(field.snapshot().lanes[0].line_length >= 30);
                return;
            }
        }
        panic!("no line committed on a blank canvas");
    }

    #[test]
    fn test_fail_thresholds_follow_settings_mid_run() {
        let mut settings = exhaustion_settings();
        settings.len.min_start = 10;
        settings.fails_until.stop = 1000;
        settings.step_rate = 100.0;
        let mut field = field_with(settings, 50, 1);

        assert!(!field.update(100.0));
        assert_eq!(field.fails_count(), 10);

        field.settings.fails_until.stop = 12;
        assert!(!field.update(10.0));
        assert_eq!(field.fails_count(), 11);
        assert!(field.update(10.0));
        assert_eq!(field.fails_count(), 12);
        assert!(field.snapshot().done_adding);
    }

    #[test]
    fn test_reduce_step_follows_settings_mid_run() {
        let mut settings = exhaustion_settings();
        settings.len.min_start = 40;
        settings.len.min_end = 4;
        settings.fails_until.reduce_min_len = 1;
        settings.fails_until.stop = 1000;
        let mut field = field_with(settings, 50, 1);

        field.add_fail(0);
        assert_eq!(field.current_min_len(), 35);
        field.settings.len.min_reduce_by = 10;
        field.add_fail(0);
        assert_eq!(field.current_min_len(), 25);
    }

    #[test]
    fn test_growth_draws_on_blank_canvas() {
        let mut field = field_with(GrowthSettings::default(), 120, 3);
        for _ in 0..60 {
            field.update(100.0);
        }
        assert!(field.lines_drawn() > 0);
        let canvas = field.surface();
        let filled = (0..120 * 120)
            .filter(|i| !is_blank(canvas.pixels(), 120, 1, (i % 120) as f32, (i / 120) as f32, 10))
            .count();
        assert!(filled > 0);
    }

    #[test]
    fn test_same_seed_same_growth() {
        let run = || {
            let mut field = field_with(GrowthSettings::default(), 100, 2);
            for _ in 0..30 {
                field.update(40.0);
            }
            field.snapshot()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut field = field_with(GrowthSettings::default(), 100, 2);
        for _ in 0..40 {
            field.update(100.0);
        }
        field.add_fail(0);
        field.reset();

        let view = field.snapshot();
        assert_eq!(view.lines_drawn, 0);
        assert_eq!(view.fails_count, 0);
        assert_eq!(view.steps_taken, 0);
        assert_eq!(view.current_min_len, field.settings.len.min_start);
        assert_eq!(view.long_lines_saved.len(), 0);
        assert!(view.lanes.iter().all(|l| l.remaining.is_empty()));
        assert!(field.surface().pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_palette_falls_back() {
        let mut field = GrowthField::new(PixelCanvas::new(10, 10, 1), GrowthSettings::default(), 1, Vec::new(), 0);
        assert_eq!(field.set_color(0), FALLBACK_COLOR);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_min_len_never_increases(seed in any::<u64>(), parallel in 1usize..4) {
            let mut settings = GrowthSettings::default();
            settings.len.min_start = 40;
            settings.len.min_end = 6;
            settings.fails_until.reduce_min_len = 3;
            settings.fails_until.stop = 40;
            let mut field = GrowthField::new(PixelCanvas::new(48, 48, 1), settings, parallel, two_colors(), seed);

            let mut last = field.current_min_len();
            for _ in 0..300 {
                let done = field.update(20.0);
                let now = field.current_min_len();
                prop_assert!(now <= last);
                prop_assert!((6..=40).contains(&now));
                last = now;
                if done {
                    break;
                }
            }
        }
    }
}
