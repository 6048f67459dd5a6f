use glam::{Mat3, Vec3};

use crate::physics::collision_detection::contact_manifold::{FeaturePair, Manifold, MAX_CONTACTS};
use crate::utilities::half_space::HalfSpace;
use crate::utilities::math_helper::binary_sign;
use crate::utilities::rigid_transform::RigidTransform;

/// Entries of `|C|` this close to 1 mark the boxes as having parallel axes.
const COS_TOLERANCE: f32 = 1.0e-6;
/// Relative advantage an edge or B-face axis needs before it replaces the preferred face axis.
const RELATIVE_TOLERANCE: f32 = 0.95;
const ABSOLUTE_TOLERANCE: f32 = 0.01;
/// Clip distances within this band of a side plane count as lying on it.
const ON_PLANE_TOLERANCE: f32 = 0.005;
/// Edge cross products shorter than this have no usable direction.
const DEGENERATE_AXIS_LENGTH: f32 = 1.0e-6;
/// Relative size of the closest-point denominator below which supporting edges are treated as parallel.
const DEGENERATE_EDGE_DENOMINATOR: f32 = 1.0e-6;

/// Axis on which the boxes were found to overlap least.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatingAxis {
    /// Face normal of box A, indexed by local axis.
    FaceA(u8),
    /// Face normal of box B, indexed by local axis.
    FaceB(u8),
    /// Cross product of A's axis `i / 3` and B's axis `i % 3`.
    Edge(u8),
}

impl SeparatingAxis {
    /// Flat index in 0..15: A faces, then B faces, then the nine edge pairs.
    #[inline(always)]
    pub fn index(self) -> u8 {
        match self {
            SeparatingAxis::FaceA(i) => i,
            SeparatingAxis::FaceB(i) => 3 + i,
            SeparatingAxis::Edge(i) => 6 + i,
        }
    }
}

/// Vertex of the incident polygon while it is being clipped.
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    v: Vec3,
    f: FeaturePair,
}

impl Default for ClipVertex {
    fn default() -> Self {
        Self {
            v: Vec3::ZERO,
            f: FeaturePair::from_key(u32::MAX),
        }
    }
}

impl ClipVertex {
    #[inline(always)]
    fn new(v: Vec3, in_i: u8, out_i: u8) -> Self {
        Self {
            v,
            f: FeaturePair::new(u8::MAX, u8::MAX, in_i, out_i),
        }
    }
}

/// Best axis seen so far within one axis category.
struct AxisTracker {
    separation: f32,
    axis: Option<SeparatingAxis>,
    normal: Vec3,
}

impl AxisTracker {
    fn new() -> Self {
        Self {
            separation: -f32::MAX,
            axis: None,
            normal: Vec3::ZERO,
        }
    }

    /// Records a face axis. Returns true if it separates the boxes.
    #[inline(always)]
    fn track_face(&mut self, axis: SeparatingAxis, s: f32, normal: Vec3) -> bool {
        if s > 0.0 {
            return true;
        }
        if s > self.separation {
            self.separation = s;
            self.axis = Some(axis);
            self.normal = normal;
        }
        false
    }

    /// Records an edge axis given its unnormalized direction. Returns true if it separates the boxes.
    #[inline(always)]
    fn track_edge(&mut self, axis: SeparatingAxis, s: f32, normal: Vec3) -> bool {
        let length = normal.length();
        if length < DEGENERATE_AXIS_LENGTH {
            return false;
        }
        if s > 0.0 {
            return true;
        }
        let inverse_length = 1.0 / length;
        let s = s * inverse_length;
        if s > self.separation {
            self.separation = s;
            self.axis = Some(axis);
            self.normal = normal * inverse_length;
        }
        false
    }
}

/// Narrow phase test between two oriented boxes.
pub struct BoxPairTester;

impl BoxPairTester {
    /// Fills `manifold` with the contacts between box A and box B.
    ///
    /// Transforms are the boxes' world transforms and extents their half-sizes. On return
    /// `manifold.contact_count` is zero if the boxes are separated, otherwise the manifold holds
    /// a unit normal pointing from A to B and up to eight contacts with non-positive penetration.
    pub fn test(
        manifold: &mut Manifold,
        atx: &RigidTransform,
        e_a: Vec3,
        btx: &RigidTransform,
        e_b: Vec3,
    ) {
        manifold.clear();

        // B's frame expressed in A's space. Column i is B's axis i.
        let c = atx.rotation.transpose() * btx.rotation;
        let abs_c = c.abs();
        let parallel = [abs_c.x_axis, abs_c.y_axis, abs_c.z_axis]
            .iter()
            .any(|column| column.max_element() + COS_TOLERANCE >= 1.0);

        // Vector from center A to center B in A's space.
        let t = atx.inverse_transform_vector(btx.position - atx.position);

        let mut face_a = AxisTracker::new();
        for i in 0..3 {
            let s = t[i].abs() - (e_a[i] + abs_c.row(i).dot(e_b));
            if face_a.track_face(SeparatingAxis::FaceA(i as u8), s, atx.rotation.col(i)) {
                return;
            }
        }

        let mut face_b = AxisTracker::new();
        for i in 0..3 {
            let s = t.dot(c.col(i)).abs() - (e_b[i] + abs_c.col(i).dot(e_a));
            if face_b.track_face(SeparatingAxis::FaceB(i as u8), s, btx.rotation.col(i)) {
                return;
            }
        }

        let mut edge = AxisTracker::new();
        if !parallel && Self::track_edge_axes(&mut edge, &c, &abs_c, t, e_a, e_b) {
            return;
        }

        let delta = btx.position - atx.position;
        let face = Self::select_face(&face_a, &face_b);
        let face_max = face_a.separation.max(face_b.separation);

        if let Some(edge_axis) = edge.axis {
            if RELATIVE_TOLERANCE * edge.separation > face_max + ABSOLUTE_TOLERANCE {
                let mut n = atx.transform_vector(edge.normal);
                if n.dot(delta) < 0.0 {
                    n = -n;
                }
                if Self::edge_contact(manifold, atx, e_a, btx, e_b, n, edge.separation, edge_axis) {
                    return;
                }
                // Supporting edges were too close to parallel for a stable closest point.
            }
        }

        let (axis, mut n) = match face.axis {
            Some(axis) => (axis, face.normal),
            None => return,
        };
        if n.dot(delta) < 0.0 {
            n = -n;
        }
        Self::face_contacts(manifold, atx, e_a, btx, e_b, axis, n);
    }

    /// Prefers A's faces unless B's best face is clearly better.
    #[inline(always)]
    fn select_face<'a>(face_a: &'a AxisTracker, face_b: &'a AxisTracker) -> &'a AxisTracker {
        if RELATIVE_TOLERANCE * face_b.separation > face_a.separation + ABSOLUTE_TOLERANCE {
            face_b
        } else {
            face_a
        }
    }

    /// Tests the nine edge cross axes in A's space. Returns true if one separates the boxes.
    fn track_edge_axes(
        edge: &mut AxisTracker,
        c: &Mat3,
        abs_c: &Mat3,
        t: Vec3,
        e_a: Vec3,
        e_b: Vec3,
    ) -> bool {
        let c = |i: usize, j: usize| c.col(i)[j];
        let a = |i: usize, j: usize| abs_c.col(i)[j];

        // (rA, rB, unsigned separation along the axis, axis direction) for A's axis × B's axis.
        let axes: [(f32, f32, f32, Vec3); 9] = [
            // A.x × B.x
            (
                e_a.y * a(0, 2) + e_a.z * a(0, 1),
                e_b.y * a(2, 0) + e_b.z * a(1, 0),
                t.z * c(0, 1) - t.y * c(0, 2),
                Vec3::new(0.0, -c(0, 2), c(0, 1)),
            ),
            // A.x × B.y
            (
                e_a.y * a(1, 2) + e_a.z * a(1, 1),
                e_b.x * a(2, 0) + e_b.z * a(0, 0),
                t.z * c(1, 1) - t.y * c(1, 2),
                Vec3::new(0.0, -c(1, 2), c(1, 1)),
            ),
            // A.x × B.z
            (
                e_a.y * a(2, 2) + e_a.z * a(2, 1),
                e_b.x * a(1, 0) + e_b.y * a(0, 0),
                t.z * c(2, 1) - t.y * c(2, 2),
                Vec3::new(0.0, -c(2, 2), c(2, 1)),
            ),
            // A.y × B.x
            (
                e_a.x * a(0, 2) + e_a.z * a(0, 0),
                e_b.y * a(2, 1) + e_b.z * a(1, 1),
                t.x * c(0, 2) - t.z * c(0, 0),
                Vec3::new(c(0, 2), 0.0, -c(0, 0)),
            ),
            // A.y × B.y
            (
                e_a.x * a(1, 2) + e_a.z * a(1, 0),
                e_b.x * a(2, 1) + e_b.z * a(0, 1),
                t.x * c(1, 2) - t.z * c(1, 0),
                Vec3::new(c(1, 2), 0.0, -c(1, 0)),
            ),
            // A.y × B.z
            (
                e_a.x * a(2, 2) + e_a.z * a(2, 0),
                e_b.x * a(1, 1) + e_b.y * a(0, 1),
                t.x * c(2, 2) - t.z * c(2, 0),
                Vec3::new(c(2, 2), 0.0, -c(2, 0)),
            ),
            // A.z × B.x
            (
                e_a.x * a(0, 1) + e_a.y * a(0, 0),
                e_b.y * a(2, 2) + e_b.z * a(1, 2),
                t.y * c(0, 0) - t.x * c(0, 1),
                Vec3::new(-c(0, 1), c(0, 0), 0.0),
            ),
            // A.z × B.y
            (
                e_a.x * a(1, 1) + e_a.y * a(1, 0),
                e_b.x * a(2, 2) + e_b.z * a(0, 2),
                t.y * c(1, 0) - t.x * c(1, 1),
                Vec3::new(-c(1, 1), c(1, 0), 0.0),
            ),
            // A.z × B.z
            (
                e_a.x * a(2, 1) + e_a.y * a(2, 0),
                e_b.x * a(1, 2) + e_b.y * a(0, 2),
                t.y * c(2, 0) - t.x * c(2, 1),
                Vec3::new(-c(2, 1), c(2, 0), 0.0),
            ),
        ];

        for (i, (r_a, r_b, distance, normal)) in axes.into_iter().enumerate() {
            let s = distance.abs() - (r_a + r_b);
            if edge.track_edge(SeparatingAxis::Edge(i as u8), s, normal) {
                return true;
            }
        }
        false
    }

    /// Clips the incident face against the reference face and writes the surviving points.
    fn face_contacts(
        manifold: &mut Manifold,
        atx: &RigidTransform,
        e_a: Vec3,
        btx: &RigidTransform,
        e_b: Vec3,
        axis: SeparatingAxis,
        n: Vec3,
    ) {
        let (rtx, itx, e_r, e_i, flip, face) = match axis {
            SeparatingAxis::FaceA(i) => (atx, btx, e_a, e_b, false, i),
            SeparatingAxis::FaceB(i) => (btx, atx, e_b, e_a, true, i),
            SeparatingAxis::Edge(_) => return,
        };
        // The clip normal points from the reference box towards the incident box.
        let n = if flip { -n } else { n };

        let incident = compute_incident_face(itx, e_i, n);
        let (clip_edges, basis, e) = compute_reference_edges_and_basis(e_r, rtx, n, face);

        let mut out = [ClipVertex::default(); MAX_CONTACTS];
        let mut depths = [0.0f32; MAX_CONTACTS];
        let count = clip(rtx.position, e, &clip_edges, &basis, &incident, &mut out, &mut depths);
        if count == 0 {
            return;
        }

        manifold.normal = if flip { -n } else { n };
        for (vertex, depth) in out[..count].iter().zip(&depths[..count]) {
            let feature = if flip { vertex.f.swapped() } else { vertex.f };
            manifold.push(vertex.v, *depth, feature);
        }
    }

    /// Produces the single contact between the two supporting edges.
    /// Returns false when the edges are too close to parallel to yield a closest point.
    #[allow(clippy::too_many_arguments)]
    fn edge_contact(
        manifold: &mut Manifold,
        atx: &RigidTransform,
        e_a: Vec3,
        btx: &RigidTransform,
        e_b: Vec3,
        n: Vec3,
        separation: f32,
        axis: SeparatingAxis,
    ) -> bool {
        let (pa, qa) = support_edge(atx, e_a, n);
        let (pb, qb) = support_edge(btx, e_b, -n);
        let (ca, cb) = match edges_contact(pa, qa, pb, qb) {
            Some(points) => points,
            None => return false,
        };
        manifold.normal = n;
        manifold.push(
            (ca + cb) * 0.5,
            separation,
            FeaturePair::from_key(axis.index() as u32),
        );
        true
    }
}

/// Finds the face of the incident box most anti-parallel to `n` and returns its corners in world
/// space, each tagged with the two incident edges meeting at it.
fn compute_incident_face(itx: &RigidTransform, e: Vec3, n: Vec3) -> [ClipVertex; 4] {
    let n = -itx.inverse_transform_vector(n);
    let abs_n = n.abs();

    let face = if abs_n.x > abs_n.y && abs_n.x > abs_n.z {
        if n.x > 0.0 {
            [
                ClipVertex::new(Vec3::new(e.x, e.y, -e.z), 9, 1),
                ClipVertex::new(Vec3::new(e.x, e.y, e.z), 1, 8),
                ClipVertex::new(Vec3::new(e.x, -e.y, e.z), 8, 7),
                ClipVertex::new(Vec3::new(e.x, -e.y, -e.z), 7, 9),
            ]
        } else {
            [
                ClipVertex::new(Vec3::new(-e.x, -e.y, e.z), 5, 11),
                ClipVertex::new(Vec3::new(-e.x, e.y, e.z), 11, 3),
                ClipVertex::new(Vec3::new(-e.x, e.y, -e.z), 3, 10),
                ClipVertex::new(Vec3::new(-e.x, -e.y, -e.z), 10, 5),
            ]
        }
    } else if abs_n.y > abs_n.x && abs_n.y > abs_n.z {
        if n.y > 0.0 {
            [
                ClipVertex::new(Vec3::new(-e.x, e.y, e.z), 3, 0),
                ClipVertex::new(Vec3::new(e.x, e.y, e.z), 0, 1),
                ClipVertex::new(Vec3::new(e.x, e.y, -e.z), 1, 2),
                ClipVertex::new(Vec3::new(-e.x, e.y, -e.z), 2, 3),
            ]
        } else {
            [
                ClipVertex::new(Vec3::new(e.x, -e.y, e.z), 7, 4),
                ClipVertex::new(Vec3::new(-e.x, -e.y, e.z), 4, 5),
                ClipVertex::new(Vec3::new(-e.x, -e.y, -e.z), 5, 6),
                ClipVertex::new(Vec3::new(e.x, -e.y, -e.z), 6, 7),
            ]
        }
    } else if n.z > 0.0 {
        [
            ClipVertex::new(Vec3::new(-e.x, e.y, e.z), 0, 11),
            ClipVertex::new(Vec3::new(-e.x, -e.y, e.z), 11, 4),
            ClipVertex::new(Vec3::new(e.x, -e.y, e.z), 4, 8),
            ClipVertex::new(Vec3::new(e.x, e.y, e.z), 8, 0),
        ]
    } else {
        [
            ClipVertex::new(Vec3::new(e.x, -e.y, -e.z), 9, 6),
            ClipVertex::new(Vec3::new(-e.x, -e.y, -e.z), 6, 10),
            ClipVertex::new(Vec3::new(-e.x, e.y, -e.z), 10, 2),
            ClipVertex::new(Vec3::new(e.x, e.y, -e.z), 2, 9),
        ]
    };

    face.map(|vertex| ClipVertex {
        v: itx.transform_point(vertex.v),
        f: vertex.f,
    })
}

/// Returns the side edge ids of the reference face, a basis whose z axis is the face normal, and
/// the reference extents permuted into that basis.
fn compute_reference_edges_and_basis(
    e_r: Vec3,
    rtx: &RigidTransform,
    n: Vec3,
    face: u8,
) -> ([u8; 4], Mat3, Vec3) {
    let n = rtx.inverse_transform_vector(n);
    let r = &rtx.rotation;
    let (ex, ey, ez) = (r.x_axis, r.y_axis, r.z_axis);

    match face {
        0 => {
            if n.x > 0.0 {
                ([1, 8, 7, 9], Mat3::from_cols(ey, ez, ex), Vec3::new(e_r.y, e_r.z, e_r.x))
            } else {
                ([11, 3, 10, 5], Mat3::from_cols(ez, ey, -ex), Vec3::new(e_r.z, e_r.y, e_r.x))
            }
        }
        1 => {
            if n.y > 0.0 {
                ([0, 1, 2, 3], Mat3::from_cols(ez, ex, ey), Vec3::new(e_r.z, e_r.x, e_r.y))
            } else {
                ([4, 5, 6, 7], Mat3::from_cols(ez, -ex, -ey), Vec3::new(e_r.z, e_r.x, e_r.y))
            }
        }
        _ => {
            if n.z > 0.0 {
                ([11, 4, 8, 0], Mat3::from_cols(-ey, ex, ez), Vec3::new(e_r.y, e_r.x, e_r.z))
            } else {
                ([6, 10, 2, 9], Mat3::from_cols(-ey, -ex, -ez), Vec3::new(e_r.y, e_r.x, e_r.z))
            }
        }
    }
}

#[inline(always)]
fn in_front(d: f32) -> bool {
    d < 0.0
}

#[inline(always)]
fn behind(d: f32) -> bool {
    d > 0.0
}

#[inline(always)]
fn on(d: f32) -> bool {
    d < ON_PLANE_TOLERANCE && d > -ON_PLANE_TOLERANCE
}

/// Clips a polygon against the side plane `sign * v[axis] = e` (Sutherland-Hodgman), tagging
/// vertices created on the plane with `clip_edge`.
fn orthographic(
    sign: f32,
    e: f32,
    axis: usize,
    clip_edge: u8,
    input: &[ClipVertex],
    output: &mut [ClipVertex; MAX_CONTACTS],
) -> usize {
    let mut count = 0usize;
    let mut emit = |vertex: ClipVertex, count: &mut usize| {
        assert!(*count < MAX_CONTACTS, "Clip polygon overflow.");
        output[*count] = vertex;
        *count += 1;
    };

    let Some(&last) = input.last() else {
        return 0;
    };
    let mut a = last;
    for &b in input {
        let da = sign * a.v[axis] - e;
        let db = sign * b.v[axis] - e;

        if (in_front(da) && in_front(db)) || on(da) || on(db) {
            emit(b, &mut count);
        } else if in_front(da) && behind(db) {
            let mut cv = ClipVertex {
                v: a.v + (b.v - a.v) * (da / (da - db)),
                f: b.f,
            };
            cv.f.out_r = clip_edge;
            cv.f.out_i = 0;
            emit(cv, &mut count);
        } else if behind(da) && in_front(db) {
            let mut cv = ClipVertex {
                v: a.v + (b.v - a.v) * (da / (da - db)),
                f: a.f,
            };
            cv.f.in_r = clip_edge;
            cv.f.in_i = 0;
            emit(cv, &mut count);
            emit(b, &mut count);
        }
        a = b;
    }
    count
}

/// Clips the incident face against the four side planes of the reference face and keeps the
/// points lying behind it. Returns the number of points written.
fn clip(
    r_pos: Vec3,
    e: Vec3,
    clip_edges: &[u8; 4],
    basis: &Mat3,
    incident: &[ClipVertex; 4],
    out_verts: &mut [ClipVertex; MAX_CONTACTS],
    out_depths: &mut [f32; MAX_CONTACTS],
) -> usize {
    let to_basis = basis.transpose();
    let mut input = [ClipVertex::default(); MAX_CONTACTS];
    for (slot, vertex) in input.iter_mut().zip(incident) {
        *slot = ClipVertex {
            v: to_basis * (vertex.v - r_pos),
            f: vertex.f,
        };
    }
    let mut output = [ClipVertex::default(); MAX_CONTACTS];

    let count = orthographic(1.0, e.x, 0, clip_edges[0], &input[..4], &mut output);
    if count == 0 {
        return 0;
    }
    let count = orthographic(1.0, e.y, 1, clip_edges[1], &output[..count], &mut input);
    if count == 0 {
        return 0;
    }
    let count = orthographic(-1.0, e.x, 0, clip_edges[2], &input[..count], &mut output);
    if count == 0 {
        return 0;
    }
    let count = orthographic(-1.0, e.y, 1, clip_edges[3], &output[..count], &mut input);

    let reference_face = HalfSpace::new(Vec3::Z, e.z);
    let mut kept = 0usize;
    for vertex in &input[..count] {
        let d = reference_face.distance(vertex.v);
        if d <= 0.0 {
            out_verts[kept] = ClipVertex {
                v: *basis * vertex.v + r_pos,
                f: vertex.f,
            };
            out_depths[kept] = d;
            kept += 1;
        }
    }
    kept
}

/// Closest points between the lines through `pa..qa` and `pb..qb`, or `None` if they are parallel.
fn edges_contact(pa: Vec3, qa: Vec3, pb: Vec3, qb: Vec3) -> Option<(Vec3, Vec3)> {
    let da = qa - pa;
    let db = qb - pb;
    let r = pa - pb;
    let a = da.dot(da);
    let e = db.dot(db);
    let f = db.dot(r);
    let c = da.dot(r);
    let b = da.dot(db);
    let denom = a * e - b * b;
    if denom <= DEGENERATE_EDGE_DENOMINATOR * a * e || e == 0.0 {
        return None;
    }

    let ta = (b * f - c * e) / denom;
    let tb = (b * ta + f) / e;
    Some((pa + da * ta, pb + db * tb))
}

/// Returns the world endpoints of the box edge furthest along `n` and running along the local
/// axis least aligned with it.
fn support_edge(tx: &RigidTransform, e: Vec3, n: Vec3) -> (Vec3, Vec3) {
    let n = tx.inverse_transform_vector(n);
    let abs_n = n.abs();
    let a = e;
    let b = if abs_n.x > abs_n.y {
        if abs_n.y > abs_n.z {
            Vec3::new(e.x, e.y, -e.z)
        } else {
            Vec3::new(e.x, -e.y, e.z)
        }
    } else if abs_n.x > abs_n.z {
        Vec3::new(e.x, e.y, -e.z)
    } else {
        Vec3::new(-e.x, e.y, e.z)
    };

    let sign = Vec3::new(binary_sign(n.x), binary_sign(n.y), binary_sign(n.z));
    (tx.transform_point(a * sign), tx.transform_point(b * sign))
}
