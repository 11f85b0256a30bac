//! Screen-space rectangles and Cohen-Sutherland line clipping

use std::ops::BitOr;

use glam::Vec2;

/// Which sides of a rectangle a point lies beyond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutCode(u8);

impl OutCode {
    pub const INSIDE: OutCode = OutCode(0);
    pub const LEFT: OutCode = OutCode(1);
    pub const RIGHT: OutCode = OutCode(2);
    /// Above the rectangle (smaller y)
    pub const TOP: OutCode = OutCode(4);
    /// Below the rectangle (larger y)
    pub const BOTTOM: OutCode = OutCode(8);
    /// Points on every side of the rectangle
    pub const SURROUNDED: OutCode = OutCode(15);

    pub fn is_inside(self) -> bool {
        self.0 == 0
    }

    fn intersects(self, other: OutCode) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for OutCode {
    type Output = OutCode;

    fn bitor(self, rhs: OutCode) -> OutCode {
        OutCode(self.0 | rhs.0)
    }
}

/// Axis-aligned rectangle in pixels, `min` top-left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ScreenRect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Rectangle spanned by two opposite corners in any order
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Inclusive containment
    pub fn contains(&self, point: Vec2) -> bool {
        self.outcode(point).is_inside()
    }

    /// The nearest point inside the rectangle
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    pub fn outcode(&self, point: Vec2) -> OutCode {
        let mut code = OutCode::INSIDE;
        if point.x < self.min.x {
            code = code | OutCode::LEFT;
        } else if point.x > self.max.x {
            code = code | OutCode::RIGHT;
        }
        if point.y < self.min.y {
            code = code | OutCode::TOP;
        } else if point.y > self.max.y {
            code = code | OutCode::BOTTOM;
        }
        code
    }

    /// True if any part of the segment `a`-`b` lies inside the rectangle
    pub fn clip_line(&self, mut a: Vec2, mut b: Vec2) -> bool {
        let mut code_a = self.outcode(a);
        let mut code_b = self.outcode(b);
        loop {
            if (code_a | code_b).is_inside() {
                return true;
            }
            if code_a.intersects(code_b) {
                return false;
            }
            // Move the outside end onto the boundary it crosses
            let outside = if code_a.is_inside() { code_b } else { code_a };
            let d = b - a;
            let point = if outside.intersects(OutCode::BOTTOM) {
                Vec2::new(a.x + d.x * (self.max.y - a.y) / d.y, self.max.y)
            } else if outside.intersects(OutCode::TOP) {
                Vec2::new(a.x + d.x * (self.min.y - a.y) / d.y, self.min.y)
            } else if outside.intersects(OutCode::RIGHT) {
                Vec2::new(self.max.x, a.y + d.y * (self.max.x - a.x) / d.x)
            } else {
                Vec2::new(self.min.x, a.y + d.y * (self.min.x - a.x) / d.x)
            };
            if outside == code_a {
                a = point;
                code_a = self.outcode(a);
            } else {
                b = point;
                code_b = self.outcode(b);
            }
        }
    }
}

/// True if `point` lies inside or on the triangle `tri`
pub fn triangle_contains(tri: &[Vec2; 3], point: Vec2) -> bool {
    let cross = |o: Vec2, a: Vec2, b: Vec2| (a - o).perp_dot(b - o);
    let d0 = cross(tri[0], tri[1], point);
    let d1 = cross(tri[1], tri[2], point);
    let d2 = cross(tri[2], tri[0], point);
    let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
    let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
    !(has_neg && has_pos)
}
