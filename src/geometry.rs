use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// A position on the canvas, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Step `dist` pixels along `angle` (radians)
    pub fn step(&self, angle: f32, dist: f32) -> Point {
        Point::new(self.x + dist * angle.cos(), self.y + dist * angle.sin())
    }
}

/// Rectangular domain of valid coordinates: `[x, x + width) x [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Domain {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Uniform random point anywhere in the domain
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            self.x + rng.gen::<f32>() * self.width,
            self.y + rng.gen::<f32>() * self.height,
        )
    }
}

/// Uniform random point inside a circle of `radius` around `center`
pub fn random_in_circle<R: Rng + ?Sized>(rng: &mut R, center: Point, radius: f32) -> Point {
    // sqrt keeps the density uniform over the disc area
    let r = radius * rng.gen::<f32>().sqrt();
    let angle = rng.gen_range(0.0..TAU);
    center.step(angle, r)
}

/// Uniform random point inside the axis-aligned square of half-size `radius` around `center`
pub fn random_in_square<R: Rng + ?Sized>(rng: &mut R, center: Point, radius: f32) -> Point {
    Point::new(
        center.x + (rng.gen::<f32>() * 2.0 - 1.0) * radius,
        center.y + (rng.gen::<f32>() * 2.0 - 1.0) * radius,
    )
}

/// Random angle within `max_deviation` radians of `base`
pub fn jitter_angle<R: Rng + ?Sized>(rng: &mut R, base: f32, max_deviation: f32) -> f32 {
    if max_deviation <= 0.0 {
        return base;
    }
    base + rng.gen_range(-max_deviation..=max_deviation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn test_domain_contains_half_open() {
        let domain = Domain::new(10.0, 5.0);
        assert!(domain.contains(Point::new(0.0, 0.0)));
        assert!(domain.contains(Point::new(9.99, 4.99)));
        assert!(!domain.contains(Point::new(10.0, 2.0)));
        assert!(!domain.contains(Point::new(2.0, 5.0)));
        assert!(!domain.contains(Point::new(-0.01, 2.0)));
    }

    #[test]
    fn test_random_point_stays_in_domain() {
        let mut rng = Pcg64::seed_from_u64(7);
        let domain = Domain::new(40.0, 25.0);
        for _ in 0..1000 {
            assert!(domain.contains(domain.random_point(&mut rng)));
        }
    }

    #[test]
    fn test_circle_and_square_samplers_respect_radius() {
        let mut rng = Pcg64::seed_from_u64(3);
        let center = Point::new(50.0, 50.0);
        for _ in 0..1000 {
            let p = random_in_circle(&mut rng, center, 8.0);
            assert!(p.distance(center) <= 8.0 + 1e-4);

            let q = random_in_square(&mut rng, center, 8.0);
            assert!((q.x - center.x).abs() <= 8.0);
            assert!((q.y - center.y).abs() <= 8.0);
        }
    }

    #[test]
    fn test_jitter_angle_bounds() {
        let mut rng = Pcg64::seed_from_u64(11);
        for _ in 0..1000 {
            let a = jitter_angle(&mut rng, 1.0, 0.2);
            assert!((a - 1.0).abs() <= 0.2 + f32::EPSILON);
        }
        assert_eq!(jitter_angle(&mut rng, 1.0, 0.0), 1.0);
    }

    #[test]
    fn test_point_step_and_distance() {
        let p = Point::new(1.0, 1.0).step(0.0, 3.0);
        assert!((p.x - 4.0).abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
        assert!((Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)) - 5.0).abs() < 1e-6);
    }
}
