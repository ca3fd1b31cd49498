//! Plane geometry in page space.
//!
//! Coordinates follow the usual page convention of extraction tools: origin at
//! the top-left corner of the page, y growing downwards, units in points.
//! Matrices use PDF's row-vector convention: `p' = p * M`.

use std::ops::{BitOr, Mul};

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing matrix coefficients against zero.
const EPSILON: f32 = 1e-5;

/// A point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Apply a transformation matrix.
    pub fn transform(self, m: &Matrix) -> Self {
        Self {
            x: self.x * m.a + self.y * m.c + m.e,
            y: self.x * m.b + self.y * m.d + m.f,
        }
    }
}

impl Mul<Matrix> for Point {
    type Output = Point;

    fn mul(self, rhs: Matrix) -> Point {
        self.transform(&rhs)
    }
}

/// A 2D affine transformation `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity transformation.
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Create a matrix from its six coefficients.
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Create from a slice of exactly six numbers (as found in `cm` / `Tm`).
    pub fn from_slice(v: &[f32]) -> Option<Self> {
        match v {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// A pure translation.
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// A pure scaling.
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Inverse transformation, if the matrix is not degenerate.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(self.e * a + self.f * c),
            f: -(self.e * b + self.f * d),
        })
    }

    /// Whether axis-aligned rectangles stay axis-aligned under this matrix.
    pub fn is_rectilinear(&self) -> bool {
        (self.b.abs() < EPSILON && self.c.abs() < EPSILON)
            || (self.a.abs() < EPSILON && self.d.abs() < EPSILON)
    }

    /// Length of the transformed unit vertical vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Length of the transformed unit horizontal vector.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// The coefficients as an array, in PDF order.
    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        self.concat(&rhs)
    }
}

/// An axis-aligned rectangle `(x0, y0)`-`(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// The smallest rectangle containing both points.
    pub fn from_points(p: Point, q: Point) -> Self {
        Self::new(p.x.min(q.x), p.y.min(q.y), p.x.max(q.x), p.y.max(q.y))
    }

    /// The smallest rectangle containing all points, `None` for no points.
    pub fn bounding<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut r = Rect::from_points(first, first);
        for p in iter {
            r.include_point(p);
        }
        Some(r)
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Top-left corner.
    pub fn top_left(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    /// An empty rectangle has no interior (lines and points are empty).
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// A valid rectangle has `x0 <= x1` and `y0 <= y1`.
    pub fn is_valid(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }

    /// Swap coordinates where needed so that the rectangle is valid.
    pub fn normalize(&self) -> Rect {
        Rect::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    /// Smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Grow to contain a point.
    pub fn include_point(&mut self, p: Point) {
        self.x0 = self.x0.min(p.x);
        self.y0 = self.y0.min(p.y);
        self.x1 = self.x1.max(p.x);
        self.y1 = self.y1.max(p.y);
    }

    /// Overlapping area of two rectangles, `None` if they do not share interior.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    /// Whether the interiors of the rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Whether `other` lies completely inside (borders included).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Whether the point lies inside (borders included).
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Minimum distance between the closed rectangles (0 if they touch or overlap).
    pub fn distance(&self, other: &Rect) -> f32 {
        let dx = (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0);
        let dy = (other.y0 - self.y1).max(self.y0 - other.y1).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    /// Move every side outwards by `delta` (inwards for negative values).
    pub fn expand(&self, delta: f32) -> Rect {
        Rect::new(
            self.x0 - delta,
            self.y0 - delta,
            self.x1 + delta,
            self.y1 + delta,
        )
    }

    /// Round outwards to integer coordinates.
    pub fn round_out(&self) -> Rect {
        Rect::new(
            self.x0.floor(),
            self.y0.floor(),
            self.x1.ceil(),
            self.y1.ceil(),
        )
    }

    /// The four corners as a quad.
    pub fn quad(&self) -> Quad {
        Quad {
            ul: Point::new(self.x0, self.y0),
            ur: Point::new(self.x1, self.y0),
            ll: Point::new(self.x0, self.y1),
            lr: Point::new(self.x1, self.y1),
        }
    }

    /// Bounding rectangle of the transformed corners.
    pub fn transform(&self, m: &Matrix) -> Rect {
        self.quad().transform(m).rect()
    }

    /// Sort key used by region and word ordering: bottom, then left.
    pub(crate) fn reading_key(&self) -> (f32, f32) {
        (self.y1, self.x0)
    }
}

impl BitOr for Rect {
    type Output = Rect;

    fn bitor(self, rhs: Rect) -> Rect {
        self.union(&rhs)
    }
}

/// A quadrilateral, typically a rectangle under a rotating transformation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quad {
    pub ul: Point,
    pub ur: Point,
    pub ll: Point,
    pub lr: Point,
}

impl Quad {
    /// Apply a transformation matrix to all corners.
    pub fn transform(&self, m: &Matrix) -> Quad {
        Quad {
            ul: self.ul.transform(m),
            ur: self.ur.transform(m),
            ll: self.ll.transform(m),
            lr: self.lr.transform(m),
        }
    }

    /// Bounding rectangle.
    pub fn rect(&self) -> Rect {
        let mut r = Rect::from_points(self.ul, self.lr);
        r.include_point(self.ur);
        r.include_point(self.ll);
        r
    }
}
