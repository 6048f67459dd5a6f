use glam::Vec3;

/// Ray cast input and result.
///
/// The cast covers the segment from `start` to `start + dir * t`. A successful cast writes the time
/// of impact along `dir` into `toi` and the surface normal at the impact into `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastData {
    pub start: Vec3,
    /// Normalized direction of the ray.
    pub dir: Vec3,
    /// Length of the cast segment.
    pub t: f32,
    /// Time of impact, written on hit.
    pub toi: f32,
    /// Surface normal at the impact, written on hit.
    pub normal: Vec3,
}

impl Default for RaycastData {
    fn default() -> Self {
        Self {
            start: Vec3::ZERO,
            dir: Vec3::Z,
            t: 0.0,
            toi: 0.0,
            normal: Vec3::ZERO,
        }
    }
}

impl RaycastData {
    /// Creates a cast from `start` along the normalized `dir` covering `end_point_time` units.
    pub fn new(start: Vec3, dir: Vec3, end_point_time: f32) -> Self {
        Self {
            start,
            dir: dir.normalize(),
            t: end_point_time,
            toi: end_point_time,
            normal: Vec3::ZERO,
        }
    }

    /// End of the cast segment.
    #[inline(always)]
    pub fn end_point(&self) -> Vec3 {
        self.start + self.dir * self.t
    }

    /// Point where the ray hit, valid after a successful cast.
    #[inline(always)]
    pub fn impact_point(&self) -> Vec3 {
        self.start + self.dir * self.toi
    }
}
