use glam::{Mat3, Vec3};

use crate::physics::bodies::Bodies;
use crate::physics::body_properties::BodyVelocity;
use crate::physics::collision_detection::contact_manager::ContactManager;
use crate::physics::collision_detection::contact_manifold::MAX_CONTACTS;
use crate::physics::handles::ContactHandle;
use crate::physics::simulation_settings::SimulationSettings;
use crate::utilities::math_helper::{clamp, invert_or_zero};

/// Solver view of a single contact point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactState {
    /// Offset from body A's center of mass to the contact.
    pub ra: Vec3,
    /// Offset from body B's center of mass to the contact.
    pub rb: Vec3,
    pub penetration: f32,
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
    pub bias: f32,
    pub normal_mass: f32,
    pub tangent_mass: [f32; 2],
}

/// Solver view of one contact constraint, with its bodies' mass properties captured at the start of
/// the step.
#[derive(Debug, Clone, Copy)]
pub struct ContactConstraintState {
    pub contacts: [ContactState; MAX_CONTACTS],
    pub contact_count: usize,
    pub tangent_vectors: [Vec3; 2],
    pub normal: Vec3,
    pub center_a: Vec3,
    pub center_b: Vec3,
    pub inv_inertia_a: Mat3,
    pub inv_inertia_b: Mat3,
    pub inv_mass_a: f32,
    pub inv_mass_b: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Index of body A within the island's velocity list.
    pub index_a: usize,
    pub index_b: usize,
    /// Constraint the state was read from and is written back to.
    pub constraint: ContactHandle,
}

impl ContactConstraintState {
    #[inline(always)]
    pub fn contacts(&self) -> &[ContactState] {
        &self.contacts[..self.contact_count]
    }
}

/// Reads two velocity entries mutably. The indices must differ.
#[inline(always)]
fn velocity_pair(velocities: &mut [BodyVelocity], a: usize, b: usize) -> (&mut BodyVelocity, &mut BodyVelocity) {
    assert!(a != b, "A contact constraint cannot act on a single body.");
    if a < b {
        let (low, high) = velocities.split_at_mut(b);
        (&mut low[a], &mut high[0])
    } else {
        let (low, high) = velocities.split_at_mut(a);
        (&mut high[0], &mut low[b])
    }
}

/// Sequential impulse solver for the contacts of one island.
///
/// Each contact applies its impulses immediately, so later contacts in the same pass see the
/// updated velocities. Solve order follows the order constraints were added to the island.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    states: Vec<ContactConstraintState>,
    enable_friction: bool,
    baumgarte: f32,
    penetration_slop: f32,
}

impl ContactSolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn states(&self) -> &[ContactConstraintState] {
        &self.states
    }

    /// Captures the island's constraints. Both bodies of every constraint must already carry
    /// their island index.
    pub fn initialize(
        &mut self,
        constraints: &[ContactHandle],
        contacts: &ContactManager,
        bodies: &Bodies,
        settings: &SimulationSettings,
    ) {
        self.enable_friction = settings.enable_friction;
        self.baumgarte = settings.baumgarte;
        self.penetration_slop = settings.penetration_slop;
        self.states.clear();

        for &handle in constraints {
            let Some(constraint) = contacts.get(handle) else {
                continue;
            };
            let (Some(body_a), Some(body_b)) =
                (bodies.get(constraint.body_a), bodies.get(constraint.body_b))
            else {
                continue;
            };
            let manifold = &constraint.manifold;
            let mut state = ContactConstraintState {
                contacts: [ContactState::default(); MAX_CONTACTS],
                contact_count: manifold.contact_count,
                tangent_vectors: manifold.tangent_vectors,
                normal: manifold.normal,
                center_a: body_a.world_center,
                center_b: body_b.world_center,
                inv_inertia_a: body_a.inv_inertia_world,
                inv_inertia_b: body_b.inv_inertia_world,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                restitution: constraint.restitution,
                friction: constraint.friction,
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                constraint: handle,
            };
            for (target, contact) in state.contacts.iter_mut().zip(manifold.contacts()) {
                *target = ContactState {
                    ra: contact.position - state.center_a,
                    rb: contact.position - state.center_b,
                    penetration: contact.penetration,
                    normal_impulse: contact.normal_impulse,
                    tangent_impulse: contact.tangent_impulse,
                    bias: 0.0,
                    normal_mass: 0.0,
                    tangent_mass: [0.0; 2],
                };
            }
            self.states.push(state);
        }
    }

    /// Computes effective masses and velocity biases, then applies last step's impulses.
    pub fn pre_solve(&mut self, velocities: &mut [BodyVelocity], dt: f32) {
        let bias_factor = -self.baumgarte / dt;
        for cs in &mut self.states {
            let (a, b) = velocity_pair(velocities, cs.index_a, cs.index_b);
            let linear_mass = cs.inv_mass_a + cs.inv_mass_b;

            for c in cs.contacts[..cs.contact_count].iter_mut() {
                let ra_cn = c.ra.cross(cs.normal);
                let rb_cn = c.rb.cross(cs.normal);
                let normal_mass = linear_mass
                    + ra_cn.dot(cs.inv_inertia_a * ra_cn)
                    + rb_cn.dot(cs.inv_inertia_b * rb_cn);
                c.normal_mass = invert_or_zero(normal_mass);

                for i in 0..2 {
                    let ra_ct = cs.tangent_vectors[i].cross(c.ra);
                    let rb_ct = cs.tangent_vectors[i].cross(c.rb);
                    let tangent_mass = linear_mass
                        + ra_ct.dot(cs.inv_inertia_a * ra_ct)
                        + rb_ct.dot(cs.inv_inertia_b * rb_ct);
                    c.tangent_mass[i] = invert_or_zero(tangent_mass);
                }

                c.bias = bias_factor * (c.penetration + self.penetration_slop).min(0.0);

                let mut impulse = cs.normal * c.normal_impulse;
                if self.enable_friction {
                    impulse += cs.tangent_vectors[0] * c.tangent_impulse[0];
                    impulse += cs.tangent_vectors[1] * c.tangent_impulse[1];
                }
                a.linear -= impulse * cs.inv_mass_a;
                a.angular -= cs.inv_inertia_a * c.ra.cross(impulse);
                b.linear += impulse * cs.inv_mass_b;
                b.angular += cs.inv_inertia_b * c.rb.cross(impulse);

                // Restitution only kicks in for impacts faster than one unit per second.
                let dv = b.linear + b.angular.cross(c.rb) - a.linear - a.angular.cross(c.ra);
                let approach = dv.dot(cs.normal);
                if approach < -1.0 {
                    c.bias += -cs.restitution * approach;
                }
            }
        }
    }

    /// Runs one Gauss-Seidel pass over every contact.
    pub fn solve(&mut self, velocities: &mut [BodyVelocity]) {
        for cs in &mut self.states {
            let (a, b) = velocity_pair(velocities, cs.index_a, cs.index_b);

            for c in cs.contacts[..cs.contact_count].iter_mut() {
                if self.enable_friction {
                    let dv = b.linear + b.angular.cross(c.rb) - a.linear - a.angular.cross(c.ra);
                    let max_lambda = cs.friction * c.normal_impulse;
                    for i in 0..2 {
                        let tangent = cs.tangent_vectors[i];
                        let lambda = -dv.dot(tangent) * c.tangent_mass[i];
                        let old = c.tangent_impulse[i];
                        c.tangent_impulse[i] = clamp(old + lambda, -max_lambda, max_lambda);
                        let impulse = tangent * (c.tangent_impulse[i] - old);

                        a.linear -= impulse * cs.inv_mass_a;
                        a.angular -= cs.inv_inertia_a * c.ra.cross(impulse);
                        b.linear += impulse * cs.inv_mass_b;
                        b.angular += cs.inv_inertia_b * c.rb.cross(impulse);
                    }
                }

                let dv = b.linear + b.angular.cross(c.rb) - a.linear - a.angular.cross(c.ra);
                let vn = dv.dot(cs.normal);
                let lambda = c.normal_mass * (-vn + c.bias);
                let old = c.normal_impulse;
                c.normal_impulse = (old + lambda).max(0.0);
                let impulse = cs.normal * (c.normal_impulse - old);

                a.linear -= impulse * cs.inv_mass_a;
                a.angular -= cs.inv_inertia_a * c.ra.cross(impulse);
                b.linear += impulse * cs.inv_mass_b;
                b.angular += cs.inv_inertia_b * c.rb.cross(impulse);
            }
        }
    }

    /// Stores the accumulated impulses on the persistent contacts for next step's warm start.
    pub fn shutdown(&mut self, contacts: &mut ContactManager) {
        for cs in &self.states {
            let Some(constraint) = contacts.get_mut(cs.constraint) else {
                continue;
            };
            for (target, c) in constraint.manifold.contacts_mut().iter_mut().zip(cs.contacts()) {
                target.normal_impulse = c.normal_impulse;
                target.tangent_impulse = c.tangent_impulse;
                target.bias = c.bias;
                target.normal_mass = c.normal_mass;
                target.tangent_mass = c.tangent_mass;
            }
        }
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::handles::ContactHandle;
    use approx::assert_abs_diff_eq;

    /// Unit-mass body B resting on a static body A, one contact straight below B's center.
    fn single_contact(penetration: f32, restitution: f32) -> ContactSolver {
        let mut contacts = [ContactState::default(); MAX_CONTACTS];
        contacts[0] = ContactState {
            ra: Vec3::new(0.0, 0.5, 0.0),
            rb: Vec3::new(0.0, -0.5, 0.0),
            penetration,
            ..ContactState::default()
        };
        ContactSolver {
            states: vec![ContactConstraintState {
                contacts,
                contact_count: 1,
                tangent_vectors: [Vec3::X, Vec3::Z],
                normal: Vec3::Y,
                center_a: Vec3::ZERO,
                center_b: Vec3::Y,
                inv_inertia_a: Mat3::ZERO,
                inv_inertia_b: Mat3::ZERO,
                inv_mass_a: 0.0,
                inv_mass_b: 1.0,
                restitution,
                friction: 0.5,
                index_a: 0,
                index_b: 1,
                constraint: ContactHandle(0),
            }],
            enable_friction: true,
            baumgarte: 0.2,
            penetration_slop: 0.05,
        }
    }

    #[test]
    fn test_normal_impulse_stops_approach() {
        let mut solver = single_contact(0.0, 0.0);
        let mut velocities = [
            BodyVelocity::default(),
            BodyVelocity::new(Vec3::new(0.0, -0.5, 0.0), Vec3::ZERO),
        ];
        solver.pre_solve(&mut velocities, 1.0 / 60.0);
        solver.solve(&mut velocities);
        assert_abs_diff_eq!(velocities[1].linear.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solver.states()[0].contacts()[0].normal_impulse, 0.5, epsilon = 1e-6);
        assert_eq!(velocities[0].linear, Vec3::ZERO);
    }

    #[test]
    fn test_separating_contact_never_pulls() {
        let mut solver = single_contact(0.0, 0.0);
        let mut velocities = [
            BodyVelocity::default(),
            BodyVelocity::new(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO),
        ];
        solver.pre_solve(&mut velocities, 1.0 / 60.0);
        for _ in 0..10 {
            solver.solve(&mut velocities);
        }
        assert_eq!(solver.states()[0].contacts()[0].normal_impulse, 0.0);
        assert_eq!(velocities[1].linear.y, 2.0);
    }

    #[test]
    fn test_penetration_beyond_slop_pushes_out() {
        let dt = 1.0 / 60.0;
        let mut solver = single_contact(-0.25, 0.0);
        let mut velocities = [BodyVelocity::default(); 2];
        solver.pre_solve(&mut velocities, dt);
        let contact = solver.states()[0].contacts()[0];
        assert_abs_diff_eq!(contact.bias, 0.2 / dt * 0.2, epsilon = 1e-4);
        solver.solve(&mut velocities);
        assert_abs_diff_eq!(velocities[1].linear.y, contact.bias, epsilon = 1e-4);

        // Within the slop nothing is corrected.
        let mut solver = single_contact(-0.04, 0.0);
        let mut velocities = [BodyVelocity::default(); 2];
        solver.pre_solve(&mut velocities, dt);
        assert_eq!(solver.states()[0].contacts()[0].bias, 0.0);
    }

    #[test]
    fn test_restitution_reflects_fast_impacts() {
        let mut solver = single_contact(0.0, 0.5);
        let mut velocities = [
            BodyVelocity::default(),
            BodyVelocity::new(Vec3::new(0.0, -4.0, 0.0), Vec3::ZERO),
        ];
        solver.pre_solve(&mut velocities, 1.0 / 60.0);
        for _ in 0..4 {
            solver.solve(&mut velocities);
        }
        assert_abs_diff_eq!(velocities[1].linear.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_friction_stays_inside_cone() {
        let mut solver = single_contact(0.0, 0.0);
        let mut velocities = [
            BodyVelocity::default(),
            BodyVelocity::new(Vec3::new(3.0, -1.0, 0.5), Vec3::ZERO),
        ];
        solver.pre_solve(&mut velocities, 1.0 / 60.0);
        for _ in 0..20 {
            solver.solve(&mut velocities);
        }
        let cs = &solver.states()[0];
        let c = cs.contacts()[0];
        assert!(c.normal_impulse >= 0.0);
        for impulse in c.tangent_impulse {
            assert!(impulse.abs() <= cs.friction * c.normal_impulse + 1e-6);
        }
        // Normal impulse 1 caps friction at 0.5 per tangent.
        assert_abs_diff_eq!(velocities[1].linear.x, 2.5, epsilon = 1e-5);
        assert_abs_diff_eq!(velocities[1].linear.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_warm_start_applies_stored_impulse() {
        let mut solver = single_contact(0.0, 0.0);
        solver.states[0].contacts[0].normal_impulse = 0.25;
        let mut velocities = [BodyVelocity::default(); 2];
        solver.pre_solve(&mut velocities, 1.0 / 60.0);
        assert_abs_diff_eq!(velocities[1].linear.y, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_velocity_pair_order() {
        let mut velocities = [
            BodyVelocity::new(Vec3::X, Vec3::ZERO),
            BodyVelocity::new(Vec3::Y, Vec3::ZERO),
        ];
        let (a, b) = velocity_pair(&mut velocities, 1, 0);
        assert_eq!(a.linear, Vec3::Y);
        assert_eq!(b.linear, Vec3::X);
    }
}
