use glam::Vec3;

/// Plane `normal · p = distance`. Points with positive signed distance lie in front of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfSpace {
    pub normal: Vec3,
    pub distance: f32,
}

impl HalfSpace {
    #[inline]
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane with the given unit normal passing through `point`.
    #[inline]
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            distance: normal.dot(point),
        }
    }

    /// Plane through three points wound counter-clockwise when viewed from the front.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize();
        Self::from_normal_and_point(normal, a)
    }

    /// Point on the plane closest to the origin.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.normal * self.distance
    }

    /// Signed distance from the plane to `point`.
    #[inline]
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }

    /// Projects `point` onto the plane.
    #[inline]
    pub fn projected(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.distance(point)
    }
}
