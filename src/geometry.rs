//! Points, rectangles and the small amount of plane geometry the pipeline needs.
//!
//! Integer [`Point`] and [`Rect`] describe pixel locations in an image, while
//! [`Point2f`] carries sub-pixel positions through rotations and scalings.
//! Rounding from float to integer follows the half-to-even convention used by
//! the image filters (see [`cv_round`]).

use std::ops::{Add, Mul, Sub};

/// Round to the nearest integer, ties to even.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Pixel coordinates are far inside i32 range
pub fn cv_round(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Integer pixel position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Point {
    /// Historical "not found" marker. Prefer `Option<Point>`.
    pub const NOT_FOUND: Point = Point { x: -1, y: -1 };

    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn to_f(self) -> Point2f {
        Point2f::new(f64::from(self.x), f64::from(self.y))
    }

    #[must_use]
    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

/// Sub-pixel position or 2D vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2f {
    pub x: f64,
    pub y: f64,
}

impl Point2f {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Nearest integer point
    #[must_use]
    pub fn round(self) -> Point {
        Point::new(cv_round(self.x), cv_round(self.y))
    }

    /// Rotate about the origin by `degrees` (counter-clockwise in a y-up frame).
    #[must_use]
    pub fn rotate(self, degrees: f64) -> Point2f {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point2f::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rotate about `pivot` by `degrees`.
    #[must_use]
    pub fn rotate_around(self, pivot: Point2f, degrees: f64) -> Point2f {
        (self - pivot).rotate(degrees) + pivot
    }

    /// Scale the distance to `pivot` by `factor`.
    #[must_use]
    pub fn scale_around(self, pivot: Point2f, factor: f64) -> Point2f {
        (self - pivot) * factor + pivot
    }

    /// Euclidean distance between two points
    #[must_use]
    pub fn distance(self, other: Point2f) -> f64 {
        (other - self).length()
    }

    /// Length of the vector from the origin
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Direction of the line from `self` to `other`, in degrees.
    #[must_use]
    pub fn angle_to(self, other: Point2f) -> f64 {
        let d = other - self;
        d.y.atan2(d.x).to_degrees()
    }

    /// Point halfway between `self` and `other`
    #[must_use]
    pub fn midpoint(self, other: Point2f) -> Point2f {
        Point2f::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

impl Add for Point2f {
    type Output = Point2f;
    fn add(self, rhs: Point2f) -> Point2f {
        Point2f::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2f {
    type Output = Point2f;
    fn sub(self, rhs: Point2f) -> Point2f {
        Point2f::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2f {
    type Output = Point2f;
    fn mul(self, rhs: f64) -> Point2f {
        Point2f::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned integer rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Historical "not found" marker. Prefer `Option<Rect>`.
    pub const NOT_FOUND: Rect = Rect { x: -1, y: -1, width: -1, height: -1 };

    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether this rect describes a real detection rather than [`Rect::NOT_FOUND`]
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    /// Centre using integer halving of the size
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// Translate by a point
    #[must_use]
    pub fn offset(&self, by: Point) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// Translate by the origin of another rect (sub-region to parent coordinates)
    #[must_use]
    pub fn offset_by_rect(&self, parent: &Rect) -> Rect {
        self.offset(parent.origin())
    }

    /// Multiply position and size by `factor`, rounding each component.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Rect {
        Rect::new(
            cv_round(f64::from(self.x) * factor),
            cv_round(f64::from(self.y) * factor),
            cv_round(f64::from(self.width) * factor),
            cv_round(f64::from(self.height) * factor),
        )
    }

    /// Scale and clamp the result to a `max_width x max_height` image.
    #[must_use]
    pub fn scale_within(&self, factor: f64, max_width: i32, max_height: i32) -> Option<Rect> {
        self.scale(factor).crop_to_bounds(max_width, max_height)
    }

    /// Intersection with the image `[0, width) x [0, height)`; `None` when empty.
    #[must_use]
    pub fn crop_to_bounds(&self, width: i32, height: i32) -> Option<Rect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width).min(width);
        let y1 = (self.y + self.height).min(height);
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Push the rect back inside a `width x height` image.
    ///
    /// The origin is shifted first so the size is kept where possible; a rect
    /// larger than the image is then shrunk to fit.
    #[must_use]
    pub fn clamp_within(&self, width: i32, height: i32) -> Rect {
        let mut r = *self;
        if r.x < 0 {
            r.x = 0;
        }
        if r.y < 0 {
            r.y = 0;
        }
        if r.x + r.width > width {
            r.x = width - r.width;
        }
        if r.y + r.height > height {
            r.y = height - r.height;
        }
        r.crop_to_bounds(width, height).unwrap_or(Rect::new(0, 0, 0, 0))
    }
}
