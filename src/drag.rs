//! Drag path generation.

use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathPoint {
    pub x: i32,
    pub y: i32,
}

impl PathPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Ordered points from source to target. Always holds at least two points,
/// starts at the source and ends at the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPath(Vec<PathPoint>);

impl DragPath {
    pub fn points(&self) -> &[PathPoint] {
        &self.0
    }

    pub fn first(&self) -> PathPoint {
        self.0[0]
    }

    pub fn last(&self) -> PathPoint {
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathPoint> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a DragPath {
    type Item = &'a PathPoint;
    type IntoIter = std::slice::Iter<'a, PathPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Evenly spaced intermediate points along the straight line from `source`
/// to `target`.
///
/// The step count is the larger of `|dx| / step` and `|dy| / step` (integer
/// division). With zero steps the path is just the two endpoints. Otherwise
/// point `i` for `i` in `0..steps` is `source + d * i / steps`, truncated
/// toward zero, and the exact target is appended.
pub fn generate_path(source: PathPoint, target: PathPoint, step: NonZeroU32) -> DragPath {
    let step = i64::from(step.get());
    let dx = i64::from(target.x) - i64::from(source.x);
    let dy = i64::from(target.y) - i64::from(source.y);
    let steps = (dx / step).abs().max((dy / step).abs());

    if steps == 0 {
        return DragPath(vec![source, target]);
    }

    let mut points = Vec::with_capacity(steps as usize + 1);
    for i in 0..steps {
        points.push(PathPoint {
            x: interpolate(source.x, dx, i, steps),
            y: interpolate(source.y, dy, i, steps),
        });
    }
    points.push(target);
    DragPath(points)
}

// i < steps keeps the result between the two i32 endpoints.
fn interpolate(origin: i32, delta: i64, i: i64, steps: i64) -> i32 {
    (i64::from(origin) + delta * i / steps) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn evenly_spaced_points() {
        let path = generate_path(PathPoint::new(0, 0), PathPoint::new(100, 40), step(30));
        assert_eq!(
            path.points(),
            &[
                PathPoint::new(0, 0),
                PathPoint::new(33, 13),
                PathPoint::new(66, 26),
                PathPoint::new(100, 40),
            ]
        );
    }

    #[test]
    fn short_drag_has_only_endpoints() {
        let path = generate_path(PathPoint::new(10, 10), PathPoint::new(20, 15), step(30));
        assert_eq!(path.points(), &[PathPoint::new(10, 10), PathPoint::new(20, 15)]);
    }

    #[test]
    fn zero_length_drag_is_degenerate_pair() {
        let p = PathPoint::new(5, 5);
        let path = generate_path(p, p, step(30));
        assert_eq!(path.points(), &[p, p]);
    }

    #[test]
    fn path_invariants_hold_in_every_direction() {
        let cases = [
            (PathPoint::new(0, 0), PathPoint::new(100, 40)),
            (PathPoint::new(500, 300), PathPoint::new(-20, 10)),
            (PathPoint::new(0, 0), PathPoint::new(0, -333)),
            (PathPoint::new(-7, 900), PathPoint::new(1920, 1080)),
        ];
        for (source, target) in cases {
            for s in [1, 7, 30, 250] {
                let path = generate_path(source, target, step(s));
                assert!(path.len() >= 2);
                assert_eq!(path.first(), source);
                assert_eq!(path.last(), target);

                let dx = i64::from(target.x - source.x);
                let dy = i64::from(target.y - source.y);
                let expected = (dx / i64::from(s)).abs().max((dy / i64::from(s)).abs());
                assert_eq!(path.len() as i64, expected.max(1) + 1);

                // Every point lies on the segment up to truncation.
                for p in &path {
                    let px = i64::from(p.x - source.x);
                    let py = i64::from(p.y - source.y);
                    let cross = (px * dy - py * dx).abs();
                    assert!(cross <= dx.abs() + dy.abs(), "{p:?} off line {source:?}->{target:?}");
                    assert!(p.x >= source.x.min(target.x) && p.x <= source.x.max(target.x));
                    assert!(p.y >= source.y.min(target.y) && p.y <= source.y.max(target.y));
                }
            }
        }
    }

    #[test]
    fn progress_is_monotonic_without_repeats() {
        let cases = [
            (PathPoint::new(0, 0), PathPoint::new(100, 40)),
            (PathPoint::new(500, 300), PathPoint::new(-20, 10)),
            (PathPoint::new(0, 0), PathPoint::new(0, -333)),
            (PathPoint::new(-7, 900), PathPoint::new(1920, 1080)),
            (PathPoint::new(3, 3), PathPoint::new(4, 2)),
        ];
        for (source, target) in cases {
            let sx = (target.x - source.x).signum();
            let sy = (target.y - source.y).signum();
            for s in [1, 2, 7, 30, 250] {
                let path = generate_path(source, target, step(s));
                for pair in path.points().windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    assert!((b.x - a.x) * sx >= 0, "x went backwards {a:?}->{b:?}");
                    assert!((b.y - a.y) * sy >= 0, "y went backwards {a:?}->{b:?}");
                    assert_ne!(a, b, "repeated point in {source:?}->{target:?} step {s}");
                }
            }
        }
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let path = generate_path(PathPoint::new(i32::MIN, 0), PathPoint::new(i32::MAX, 0), step(1 << 30));
        assert_eq!(path.first().x, i32::MIN);
        assert_eq!(path.last().x, i32::MAX);
    }
}
