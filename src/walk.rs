//! Constrained random walk that produces the points of a single line.

use crate::geometry::{jitter_angle, Point};
use rand::Rng;

/// Verdict on a candidate point during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCheck {
    /// Free to move into
    Valid,
    /// Occupied: turn and retry from the current position
    Invalid,
    /// End the walk here (e.g. left the domain)
    Stop,
}

/// Parameters for one walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkConfig {
    /// Max angular jitter per step (radians)
    pub wiggle: f32,
    /// Optional cap on cumulative deviation from the base angle (radians)
    pub wiggle_max: Option<f32>,
    /// Consecutive rejections allowed before the walk gives up
    pub max_tries: usize,
    /// Stop once this many points are collected
    pub len_max: usize,
    /// Walks shorter than this are discarded
    pub len_min: usize,
    /// Distance moved per accepted step
    pub step: f32,
}

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    MaxLength,
    Blocked,
    Stopped,
}

/// Raw walk result, before the minimum length is applied
#[derive(Debug, Clone)]
pub struct Walk {
    pub points: Vec<Point>,
    pub iterations: usize,
    pub end: WalkEnd,
}

/// Walk from `seed` along `base_angle`, asking `check` about every candidate.
///
/// The seed is the first point. Accepted steps reset the rejection counter, so
/// the loop runs at most `len_max * (max_tries + 1) + 1` times.
pub fn walk<R, F>(rng: &mut R, seed: Point, base_angle: f32, config: &WalkConfig, mut check: F) -> Walk
where
    R: Rng + ?Sized,
    F: FnMut(Point) -> PointCheck,
{
    let mut points = vec![seed];
    let mut pos = seed;
    let mut heading = base_angle;
    let mut rejections = 0;
    let mut iterations = 0;

    let end = loop {
        if points.len() >= config.len_max {
            break WalkEnd::MaxLength;
        }
        iterations += 1;

        let candidate = pos.step(heading, config.step);
        match check(candidate) {
            PointCheck::Stop => break WalkEnd::Stopped,
            PointCheck::Invalid => {
                rejections += 1;
                if rejections >= config.max_tries {
                    break WalkEnd::Blocked;
                }
                heading = jitter_angle(rng, heading, config.wiggle);
            }
            PointCheck::Valid => {
                pos = candidate;
                points.push(candidate);
                rejections = 0;
                heading = next_heading(rng, heading, base_angle, config);
            }
        }
    };

    Walk {
        points,
        iterations,
        end,
    }
}

/// Heading after an accepted step
fn next_heading<R: Rng + ?Sized>(rng: &mut R, heading: f32, base_angle: f32, config: &WalkConfig) -> f32 {
    match config.wiggle_max {
        // Uncapped: every step re-centres on the base heading
        None => jitter_angle(rng, base_angle, config.wiggle),
        // Capped: drift cumulatively, pull back once past the cap
        Some(cap) => {
            let proposed = jitter_angle(rng, heading, config.wiggle);
            let deviation = proposed - base_angle;
            if deviation.abs() <= cap {
                proposed
            } else {
                let current = heading - base_angle;
                let pull = if cap > 0.0 { rng.gen_range(0.0..=cap) } else { 0.0 };
                let nudged = current - current.signum() * pull.min(current.abs());
                base_angle + nudged.clamp(-cap, cap)
            }
        }
    }
}

/// Grow a line of points, or `None` when fewer than `len_min` were collected
pub fn grow_line<R, F>(rng: &mut R, seed: Point, base_angle: f32, config: &WalkConfig, check: F) -> Option<Vec<Point>>
where
    R: Rng + ?Sized,
    F: FnMut(Point) -> PointCheck,
{
    let result = walk(rng, seed, base_angle, config, check);
    tracing::trace!(
        points = result.points.len(),
        iterations = result.iterations,
        end = ?result.end,
        "walk finished"
    );
    if result.points.len() < config.len_min {
        None
    } else {
        Some(result.points)
    }
}
