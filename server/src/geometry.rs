//! Static course geometry: segment walls, ellipse walls and targets.
//!
//! Every obstacle answers two questions: does a circle of a given radius
//! touch it (and where), and about which axis should a velocity be reflected
//! at that point. The reflection axis is a unit vector along the surface, so
//! `Vec2::reflect` keeps the tangential component and flips the normal one.

use minigolf_shared::vec2::Vec2;

/// Slack added around every bounding box before the exact test.
pub const BOX_MARGIN: f64 = 0.005;

/// Axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        Self {
            min_x: a.x().min(b.x()),
            min_y: a.y().min(b.y()),
            max_x: a.x().max(b.x()),
            max_y: a.y().max(b.y()),
        }
    }

    pub fn expanded(&self, by: f64) -> Self {
        Self {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }

    /// Conservative: true if the circle's bounding square overlaps.
    pub fn touches_circle(&self, center: Vec2, radius: f64) -> bool {
        center.x() + radius >= self.min_x
            && center.x() - radius <= self.max_x
            && center.y() + radius >= self.min_y
            && center.y() - radius <= self.max_y
    }
}

/// Straight wall between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    p0: Vec2,
    p1: Vec2,
    thickness: f64,
    collision_vector: Vec2,
    bounds: Rect,
}

impl Wall {
    pub fn new(p0: Vec2, p1: Vec2, thickness: f64) -> Self {
        let delta = p0 - p1;
        let collision_vector = if delta.is_zero() {
            Vec2::ZERO
        } else {
            delta.normalized()
        };
        Self {
            p0,
            p1,
            thickness,
            collision_vector,
            bounds: Rect::from_points(p0, p1).expanded(BOX_MARGIN + thickness / 2.0),
        }
    }

    pub fn endpoints(&self) -> (Vec2, Vec2) {
        (self.p0, self.p1)
    }

    pub fn bounding_box(&self) -> Rect {
        self.bounds
    }

    /// Zero-length walls never collide.
    pub fn is_degenerate(&self) -> bool {
        self.collision_vector.is_zero()
    }

    /// Point on the segment closest to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let seg = self.p1 - self.p0;
        let len_sq = seg.dot(&seg);
        if len_sq == 0.0 {
            return self.p0;
        }
        let t = ((point - self.p0).dot(&seg) / len_sq).clamp(0.0, 1.0);
        self.p0 + seg * t
    }

    /// Impact point if a circle at `center` touches the wall.
    pub fn collide(&self, center: Vec2, radius: f64) -> Option<Vec2> {
        if self.is_degenerate() || !self.bounds.touches_circle(center, radius) {
            return None;
        }
        let impact = self.closest_point(center);
        (impact.distance(&center) <= radius + self.thickness / 2.0).then_some(impact)
    }

    /// Same axis everywhere along the wall.
    pub fn collision_vector(&self, _impact: Vec2) -> Vec2 {
        self.collision_vector
    }
}

/// Axis-aligned ellipse wall given by its bounding box (top-left `x`, `y`).
#[derive(Debug, Clone, PartialEq)]
pub struct EllipseWall {
    center: Vec2,
    semi_x: f64,
    semi_y: f64,
    foci: (Vec2, Vec2),
    thickness: f64,
    bounds: Rect,
}

impl EllipseWall {
    pub fn new(x: f64, y: f64, width: f64, height: f64, thickness: f64) -> Self {
        let semi_x = width.abs() / 2.0;
        let semi_y = height.abs() / 2.0;
        let center = Vec2::from_cartesian(x + width / 2.0, y + height / 2.0);

        // Foci sit on the major axis; guard the sqrt against rounding below zero.
        let foci = if semi_x >= semi_y {
            let c = (semi_x * semi_x - semi_y * semi_y).max(0.0).sqrt();
            (
                center - Vec2::from_cartesian(c, 0.0),
                center + Vec2::from_cartesian(c, 0.0),
            )
        } else {
            let c = (semi_y * semi_y - semi_x * semi_x).max(0.0).sqrt();
            (
                center - Vec2::from_cartesian(0.0, c),
                center + Vec2::from_cartesian(0.0, c),
            )
        };

        let corner = Vec2::from_cartesian(x, y);
        let opposite = Vec2::from_cartesian(x + width, y + height);
        Self {
            center,
            semi_x,
            semi_y,
            foci,
            thickness,
            bounds: Rect::from_points(corner, opposite).expanded(BOX_MARGIN + thickness / 2.0),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn foci(&self) -> (Vec2, Vec2) {
        self.foci
    }

    pub fn bounding_box(&self) -> Rect {
        self.bounds
    }

    /// Impact point if a circle at `center` touches the outline.
    ///
    /// The impact point is the outline point on the ray from the ellipse
    /// centre through `center`, which is exact for circles and close enough
    /// for mildly eccentric ellipses.
    pub fn collide(&self, center: Vec2, radius: f64) -> Option<Vec2> {
        if self.semi_x <= 0.0 || self.semi_y <= 0.0 {
            return None;
        }
        if !self.bounds.touches_circle(center, radius) {
            return None;
        }
        let offset = center - self.center;
        let k = ((offset.x() / self.semi_x).powi(2) + (offset.y() / self.semi_y).powi(2)).sqrt();
        if k == 0.0 || !k.is_finite() {
            return None;
        }
        let impact = self.center + offset / k;
        (impact.distance(&center) <= radius + self.thickness / 2.0).then_some(impact)
    }

    /// Tangent at `impact`: the bisector of the two focal directions turned
    /// by 90 degrees. `None` when the impact sits on a focus.
    pub fn collision_vector(&self, impact: Vec2) -> Option<Vec2> {
        let to_first = impact - self.foci.0;
        let to_second = impact - self.foci.1;
        if to_first.is_zero() || to_second.is_zero() {
            return None;
        }
        let bisector = to_first.normalized() + to_second.normalized();
        if bisector.length() < 1e-12 {
            return None;
        }
        Some(bisector.rotated(std::f64::consts::FRAC_PI_2).normalized())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Obstacle {
    Segment(Wall),
    Ellipse(EllipseWall),
}

impl Obstacle {
    pub fn bounding_box(&self) -> Rect {
        match self {
            Obstacle::Segment(wall) => wall.bounding_box(),
            Obstacle::Ellipse(ellipse) => ellipse.bounding_box(),
        }
    }

    pub fn collide(&self, center: Vec2, radius: f64) -> Option<Vec2> {
        match self {
            Obstacle::Segment(wall) => wall.collide(center, radius),
            Obstacle::Ellipse(ellipse) => ellipse.collide(center, radius),
        }
    }

    pub fn collision_vector(&self, impact: Vec2) -> Option<Vec2> {
        match self {
            Obstacle::Segment(wall) => Some(wall.collision_vector(impact)),
            Obstacle::Ellipse(ellipse) => ellipse.collision_vector(impact),
        }
    }
}

/// A wall contact found during a ball step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into the course's obstacle list.
    pub index: usize,
    pub impact: Vec2,
    pub axis: Vec2,
}

/// Circular sensor. Never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: Vec2,
    pub radius: f64,
}

impl Target {
    pub fn new(position: Vec2, radius: f64) -> Self {
        Self { position, radius }
    }

    /// True if a circle at `center` overlaps the target.
    pub fn overlaps(&self, center: Vec2, radius: f64) -> bool {
        self.position.distance(&center) <= self.radius + radius
    }
}
