use std::f64::consts::{PI, TAU};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// 2D vector that keeps a cartesian view (x, y) and a polar view
/// (angle, length) in sync.
///
/// Mutating either view recomputes the other. When the vector collapses to
/// zero length the angle is kept as it was, so a stopped ball still remembers
/// where it was heading and later polar edits do not jump.
///
/// Angles are radians, wrapped into (-PI, PI].
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Vec2 {
    x: f64,
    y: f64,
    angle: f64,
    length: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 {
        x: 0.0,
        y: 0.0,
        angle: 0.0,
        length: 0.0,
    };

    pub fn from_cartesian(x: f64, y: f64) -> Self {
        let mut v = Self::ZERO;
        v.set_xy(x, y);
        v
    }

    pub fn from_polar(angle: f64, length: f64) -> Self {
        let mut v = Self::ZERO;
        v.set_polar(angle, length);
        v
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
        self.sync_polar();
    }

    pub fn set_y(&mut self, y: f64) {
        self.y = y;
        self.sync_polar();
    }

    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.sync_polar();
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = normalize_angle(angle);
        self.sync_cartesian();
    }

    /// Set the length. A negative length flips the direction so that the
    /// stored length stays non-negative.
    pub fn set_length(&mut self, length: f64) {
        let angle = self.angle;
        self.set_polar(angle, length);
    }

    pub fn set_polar(&mut self, angle: f64, length: f64) {
        let (angle, length) = if length < 0.0 {
            (angle + PI, -length)
        } else {
            (angle, length)
        };
        self.angle = normalize_angle(angle);
        self.length = length;
        self.sync_cartesian();
    }

    pub fn is_zero(&self) -> bool {
        self.length == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Set length to 1, keeping the angle.
    pub fn normalize(&mut self) -> &mut Self {
        self.set_length(1.0);
        self
    }

    pub fn normalized(&self) -> Self {
        Self::from_polar(self.angle, 1.0)
    }

    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: &Vec2) -> f64 {
        (*self - *other).length
    }

    /// Copy rotated by `delta` radians.
    pub fn rotated(&self, delta: f64) -> Self {
        Self::from_polar(self.angle + delta, self.length)
    }

    /// Decompose into (component along `direction`, component perpendicular
    /// to it). The perpendicular part points along `direction.angle - PI/2`.
    /// The two parts always sum back to `self`.
    pub fn split_vector(&self, direction: &Vec2) -> (Vec2, Vec2) {
        let delta = direction.angle - self.angle;
        let facing = Vec2::from_polar(direction.angle, self.length * delta.cos());
        let other = Vec2::from_polar(direction.angle - PI / 2.0, self.length * delta.sin());
        (facing, other)
    }

    /// Specular reflection about the axis `reflect_by`: the component along
    /// the axis is kept and the perpendicular component is negated.
    pub fn reflect(&mut self, reflect_by: &Vec2) -> &mut Self {
        let (facing, other) = self.split_vector(reflect_by);
        let reflected = facing - other;
        self.set_xy(reflected.x, reflected.y);
        self
    }

    /// Angle-only reflection: `angle = m + 2 * (m - angle)` with `m` the
    /// angle of `mirror_by`. Length is unchanged.
    pub fn mirror(&mut self, mirror_by: &Vec2) -> &mut Self {
        let m = mirror_by.angle;
        let delta = m - self.angle;
        self.set_angle(m + 2.0 * delta);
        self
    }

    fn sync_polar(&mut self) {
        self.length = (self.x * self.x + self.y * self.y).sqrt();
        if !(self.x == 0.0 && self.y == 0.0) {
            self.angle = self.y.atan2(self.x);
        }
    }

    fn sync_cartesian(&mut self) {
        self.x = self.angle.cos() * self.length;
        self.y = self.angle.sin() * self.length;
    }
}

/// Wrap an angle into (-PI, PI]. Non-finite input is returned as is.
pub fn normalize_angle(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let wrapped = value % TAU;
    if wrapped > PI {
        wrapped - TAU
    } else if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from(v: [f64; 2]) -> Self {
        Vec2::from_cartesian(v[0], v[1])
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::from_cartesian(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::from_cartesian(self.x - other.x, self.y - other.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::from_polar(self.angle + PI, self.length)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, scalar: f64) -> Vec2 {
        Vec2::from_polar(self.angle, self.length * scalar)
    }
}

/// Complex-style product: lengths multiply, angles add.
impl Mul<Vec2> for Vec2 {
    type Output = Vec2;

    fn mul(self, other: Vec2) -> Vec2 {
        Vec2::from_polar(self.angle + other.angle, self.length * other.length)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;

    fn div(self, scalar: f64) -> Vec2 {
        Vec2::from_polar(self.angle, self.length / scalar)
    }
}
