use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_angle(angle: f32, magnitude: f32) -> Self {
        Self {
            x: angle.cos() * magnitude,
            y: angle.sin() * magnitude,
        }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Angle of the vector pointing from `self` towards `other`.
    pub fn angle_to(self, other: Vec2) -> f32 {
        let delta = other - self;
        delta.y.atan2(delta.x)
    }

    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Wraps an angle into `[0, TAU)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute difference between two angles, in `[0, PI]`.
pub fn angle_smallest_diff(a1: f32, a2: f32) -> f32 {
    PI - ((normalize_angle(a1) - normalize_angle(a2)).abs() - PI).abs()
}

/// Rectangle given by its center, full dimensions and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    pub center: Vec2,
    pub dims: Vec2,
    pub angle: f32,
}

impl OrientedRect {
    pub fn half_dims(&self) -> Vec2 {
        self.dims * 0.5
    }

    pub fn to_local(&self, point: Vec2) -> Vec2 {
        (point - self.center).rotated(-self.angle)
    }

    pub fn corners(&self) -> [Vec2; 4] {
        let half = self.half_dims();
        [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ]
        .map(|corner| corner.rotated(self.angle) + self.center)
    }

    /// Closest point of the rectangle to `point`, and whether `point` was inside.
    pub fn closest_point(&self, point: Vec2) -> (Vec2, bool) {
        let half = self.half_dims();
        let local = self.to_local(point);
        let clamped = Vec2::new(
            local.x.clamp(-half.x, half.x),
            local.y.clamp(-half.y, half.y),
        );
        let inside = clamped == local;
        (clamped.rotated(self.angle) + self.center, inside)
    }
}

/// Penetration of one shape into another. `angle` is the direction the
/// first shape has to move in to get out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub depth: f32,
    pub angle: f32,
}

pub fn circles_overlap(p1: Vec2, r1: f32, p2: Vec2, r2: f32) -> Option<Overlap> {
    let distance = p1.distance(p2);
    if distance > r1 + r2 {
        return None;
    }
    Some(Overlap {
        depth: (distance - r1 - r2).abs(),
        angle: p2.angle_to(p1),
    })
}

/// Circle against rotated rectangle. The returned angle pushes the circle
/// out through the nearest rectangle side.
pub fn circle_rect_overlap(circle: Vec2, radius: f32, rect: &OrientedRect) -> Option<Overlap> {
    let half = rect.half_dims();
    let local = rect.to_local(circle);
    let clamped = Vec2::new(
        local.x.clamp(-half.x, half.x),
        local.y.clamp(-half.y, half.y),
    );

    if clamped != local {
        let delta = local - clamped;
        let distance = delta.length();
        if distance >= radius {
            return None;
        }
        return Some(Overlap {
            depth: radius - distance,
            angle: delta.y.atan2(delta.x) + rect.angle,
        });
    }

    // Center is inside: leave through whichever side is nearest.
    let sides = [
        (half.x - local.x, 0.0),
        (local.x + half.x, PI),
        (half.y - local.y, PI / 2.0),
        (local.y + half.y, -PI / 2.0),
    ];
    let (distance, side_angle) = sides
        .into_iter()
        .fold((f32::INFINITY, 0.0), |best, side| {
            if side.0 < best.0 {
                side
            } else {
                best
            }
        });
    Some(Overlap {
        depth: distance + radius,
        angle: side_angle + rect.angle,
    })
}

/// Separating axis test between two rotated rectangles. The returned angle
/// pushes `first` away from `second`.
pub fn rects_overlap(first: &OrientedRect, second: &OrientedRect) -> Option<Overlap> {
    let axes = [
        Vec2::from_angle(first.angle, 1.0),
        Vec2::from_angle(first.angle + PI / 2.0, 1.0),
        Vec2::from_angle(second.angle, 1.0),
        Vec2::from_angle(second.angle + PI / 2.0, 1.0),
    ];
    let first_corners = first.corners();
    let second_corners = second.corners();
    let center_delta = first.center - second.center;

    let mut best: Option<(f32, Vec2)> = None;
    for axis in axes {
        let (min1, max1) = project(&first_corners, axis);
        let (min2, max2) = project(&second_corners, axis);
        let overlap = max1.min(max2) - min1.max(min2);
        if overlap <= 0.0 {
            return None;
        }
        if best.map_or(true, |(depth, _)| overlap < depth) {
            let facing = center_delta.x * axis.x + center_delta.y * axis.y;
            let direction = if facing < 0.0 { -axis } else { axis };
            best = Some((overlap, direction));
        }
    }

    best.map(|(depth, direction)| Overlap {
        depth,
        angle: direction.y.atan2(direction.x),
    })
}

fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    corners
        .iter()
        .map(|corner| corner.x * axis.x + corner.y * axis.y)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        })
}

/// Two vertical bands `[z1, z1 + h1]` and `[z2, z2 + h2]` overlap. A zero
/// height on either side means the test is 2D-only and always passes.
pub fn height_bands_touch(z1: f32, h1: f32, z2: f32, h2: f32) -> bool {
    if h1 == 0.0 || h2 == 0.0 {
        return true;
    }
    z2 <= z1 + h1 && z2 + h2 >= z1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn smallest_diff_wraps_around() {
        assert!(approx(angle_smallest_diff(0.1, TAU - 0.1), 0.2));
        assert!(approx(angle_smallest_diff(PI, 0.0), PI));
        assert!(approx(angle_smallest_diff(-PI / 2.0, PI / 2.0), PI));
    }

    #[test]
    fn circles_overlap_reports_depth_and_away_angle() {
        let overlap = circles_overlap(Vec2::new(0.0, 0.0), 10.0, Vec2::new(15.0, 0.0), 10.0)
            .expect("overlap");
        assert!(approx(overlap.depth, 5.0));
        assert!(approx(normalize_angle(overlap.angle), PI));
        assert!(circles_overlap(Vec2::ZERO, 1.0, Vec2::new(5.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn circle_outside_rect_side_is_pushed_outward() {
        let rect = OrientedRect {
            center: Vec2::ZERO,
            dims: Vec2::new(20.0, 10.0),
            angle: 0.0,
        };
        let overlap = circle_rect_overlap(Vec2::new(12.0, 0.0), 4.0, &rect).expect("overlap");
        assert!(approx(overlap.depth, 2.0));
        assert!(approx(overlap.angle, 0.0));
        assert!(circle_rect_overlap(Vec2::new(20.0, 0.0), 4.0, &rect).is_none());
    }

    #[test]
    fn circle_inside_rect_leaves_through_nearest_side() {
        let rect = OrientedRect {
            center: Vec2::ZERO,
            dims: Vec2::new(20.0, 10.0),
            angle: 0.0,
        };
        let overlap = circle_rect_overlap(Vec2::new(0.0, 4.0), 1.0, &rect).expect("overlap");
        assert!(approx(overlap.depth, 2.0));
        assert!(approx(overlap.angle, PI / 2.0));
    }

    #[test]
    fn rects_overlap_uses_shallowest_axis() {
        let first = OrientedRect {
            center: Vec2::new(9.0, 0.0),
            dims: Vec2::new(10.0, 10.0),
            angle: 0.0,
        };
        let second = OrientedRect {
            center: Vec2::ZERO,
            dims: Vec2::new(10.0, 10.0),
            angle: 0.0,
        };
        let overlap = rects_overlap(&first, &second).expect("overlap");
        assert!(approx(overlap.depth, 1.0));
        assert!(approx(overlap.angle, 0.0));

        let apart = OrientedRect {
            center: Vec2::new(30.0, 0.0),
            ..first
        };
        assert!(rects_overlap(&apart, &second).is_none());
    }

    #[test]
    fn closest_point_is_inside_flag() {
        let rect = OrientedRect {
            center: Vec2::new(5.0, 5.0),
            dims: Vec2::new(2.0, 2.0),
            angle: PI / 4.0,
        };
        let (_, inside) = rect.closest_point(Vec2::new(5.0, 5.0));
        assert!(inside);
        let (point, inside) = rect.closest_point(Vec2::new(50.0, 5.0));
        assert!(!inside);
        assert!(point.x < 6.5);
    }

    #[test]
    fn zero_height_bands_always_touch() {
        assert!(height_bands_touch(0.0, 0.0, 100.0, 10.0));
        assert!(height_bands_touch(0.0, 10.0, 5.0, 10.0));
        assert!(!height_bands_touch(0.0, 10.0, 11.0, 10.0));
    }
}
