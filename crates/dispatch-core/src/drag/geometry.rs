// ── Screen geometry ──
//
// Terminal cell coordinates: origin top-left, `u16` like crossterm.

use serde::{Deserialize, Serialize};

/// A point on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance: the larger of the two axis deltas.
    pub fn distance(self, other: Self) -> u16 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// An axis-aligned bounding box. `contains` is half-open on the far edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && u32::from(point.x) < u32::from(self.x) + u32::from(self.width)
            && u32::from(point.y) < u32::from(self.y) + u32::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(10, 5, 4, 2);
        assert!(rect.contains(Point::new(10, 5)));
        assert!(rect.contains(Point::new(13, 6)));
        assert!(!rect.contains(Point::new(14, 6)));
        assert!(!rect.contains(Point::new(13, 7)));
        assert!(!rect.contains(Point::new(9, 5)));
    }

    #[test]
    fn empty_rect_contains_nothing() {
        let rect = Rect::new(3, 3, 0, 10);
        assert!(rect.is_empty());
        assert!(!rect.contains(Point::new(3, 3)));
    }

    #[test]
    fn rect_at_the_far_edge_does_not_overflow() {
        let rect = Rect::new(u16::MAX - 1, 0, 5, 1);
        assert!(rect.contains(Point::new(u16::MAX, 0)));
    }

    #[test]
    fn distance_is_chebyshev() {
        assert_eq!(Point::new(0, 0).distance(Point::new(3, 1)), 3);
        assert_eq!(Point::new(5, 9).distance(Point::new(5, 2)), 7);
    }
}
