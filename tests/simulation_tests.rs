//! End to end stepping of small scenes through the public `Simulation` API.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use glam::Vec3;
use rust_boxphysics::{
    BodyDescription, BodyHandle, BoxDescription, BoxHandle, ContactConstraint, IContactListener, Simulation,
    SimulationSettings,
};

const FLOOR_TOP: f32 = 0.5;

fn simulation() -> Simulation {
    Simulation::new(SimulationSettings::default()).unwrap()
}

fn add_floor(simulation: &mut Simulation) -> (BodyHandle, BoxHandle) {
    let floor = simulation.create_body(&BodyDescription::fixed(Vec3::ZERO)).unwrap();
    let shape = simulation
        .add_box(
            floor,
            &BoxDescription::new(Vec3::new(10.0, FLOOR_TOP, 10.0)).with_restitution(0.0),
        )
        .unwrap();
    (floor, shape)
}

fn add_cube(simulation: &mut Simulation, description: BodyDescription, restitution: f32) -> (BodyHandle, BoxHandle) {
    let body = simulation.create_body(&description).unwrap();
    let shape = simulation
        .add_box(body, &BoxDescription::new(Vec3::splat(0.5)).with_restitution(restitution))
        .unwrap();
    (body, shape)
}

fn deepest_penetration(simulation: &Simulation) -> f32 {
    simulation
        .contacts()
        .flat_map(|(_, constraint)| constraint.manifold.contacts().iter().map(|c| c.penetration))
        .fold(0.0, f32::min)
}

#[test]
fn resting_box_penetration_stays_within_slop() {
    let mut simulation = simulation();
    add_floor(&mut simulation);
    let (cube, _) = add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, 1.1, 0.0)), 0.0);
    let slop = simulation.settings().penetration_slop;

    for _ in 0..240 {
        simulation.step();
    }
    let settled = deepest_penetration(&simulation);
    assert!(settled >= -(slop + 0.01), "settled penetration {settled}");

    for _ in 0..60 {
        simulation.step();
        assert!(deepest_penetration(&simulation) >= settled - 1e-4);
    }
    let y = simulation.body(cube).unwrap().position().y;
    assert_abs_diff_eq!(y, FLOOR_TOP + 0.5, epsilon = slop + 0.01);
}

#[test]
fn stack_of_three_stays_upright() {
    let mut simulation = simulation();
    add_floor(&mut simulation);
    let cubes: Vec<BodyHandle> = (0..3)
        .map(|level| {
            let y = FLOOR_TOP + 0.5 + level as f32;
            add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, y, 0.0)), 0.0).0
        })
        .collect();

    for _ in 0..300 {
        simulation.step();
    }
    for (level, &cube) in cubes.iter().enumerate() {
        let position = simulation.body(cube).unwrap().position();
        let expected = FLOOR_TOP + 0.5 + level as f32;
        assert!((position.y - expected).abs() < 0.15, "level {level} at {position}");
        assert!(position.x.abs() < 0.05 && position.z.abs() < 0.05, "level {level} drifted to {position}");
    }
}

#[test]
fn resting_box_falls_asleep_and_wakes_on_impulse() {
    let mut simulation = simulation();
    let (floor, _) = add_floor(&mut simulation);
    let (cube, _) = add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, 1.05, 0.0)), 0.0);

    let slept = (0..600).any(|_| {
        simulation.step();
        !simulation.body(cube).unwrap().is_awake()
    });
    assert!(slept);
    let body = simulation.body(cube).unwrap();
    assert_eq!(body.linear_velocity(), Vec3::ZERO);
    assert_eq!(body.angular_velocity(), Vec3::ZERO);
    assert!(!simulation.body(floor).unwrap().is_awake());

    let resting = body.position();
    simulation.step();
    assert_eq!(simulation.body(cube).unwrap().position(), resting);

    simulation
        .body_mut(cube)
        .unwrap()
        .apply_linear_impulse(Vec3::new(0.0, 5.0, 0.0));
    assert!(simulation.body(cube).unwrap().is_awake());
    simulation.step();
    assert!(simulation.body(cube).unwrap().position().y > resting.y);
}

#[test]
fn disabling_sleep_wakes_everything() {
    let mut simulation = simulation();
    add_floor(&mut simulation);
    let (cube, _) = add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, 1.0, 0.0)), 0.0);
    for _ in 0..120 {
        simulation.step();
    }
    assert!(!simulation.body(cube).unwrap().is_awake());

    simulation.set_allow_sleep(false);
    assert!(simulation.body(cube).unwrap().is_awake());
    for _ in 0..120 {
        simulation.step();
    }
    assert!(simulation.body(cube).unwrap().is_awake());
}

#[test]
fn resting_impulses_carry_across_steps() {
    let mut simulation = Simulation::new(SimulationSettings::default().with_allow_sleep(false)).unwrap();
    add_floor(&mut simulation);
    let (cube, _) = add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, 1.0, 0.0)), 0.0);
    for _ in 0..120 {
        simulation.step();
    }

    let settings = *simulation.settings();
    let weight_per_step = simulation.body(cube).unwrap().mass() * -settings.gravity.y * settings.dt;
    let (_, constraint) = simulation.contacts().next().unwrap();
    assert!(constraint.is_colliding());
    assert_eq!(constraint.manifold.contacts().len(), 4);
    let mut total = 0.0;
    for contact in constraint.manifold.contacts() {
        assert!(contact.warm_started > 0, "contact {:?} was never matched", contact.feature);
        total += contact.normal_impulse;
    }
    assert_abs_diff_eq!(total, weight_per_step, epsilon = weight_per_step * 0.1);
}

#[test]
fn sliding_box_respects_the_friction_cone() {
    let mut simulation = Simulation::new(SimulationSettings::default().with_allow_sleep(false)).unwrap();
    add_floor(&mut simulation);
    let start = Vec3::new(-3.0, 1.0, 0.0);
    let (cube, _) = add_cube(
        &mut simulation,
        BodyDescription::dynamic(start).with_linear_velocity(Vec3::new(3.0, 0.0, 0.0)),
        0.0,
    );

    for _ in 0..180 {
        simulation.step();
        for (_, constraint) in simulation.contacts() {
            for contact in constraint.manifold.contacts() {
                assert!(contact.normal_impulse >= 0.0);
                let limit = constraint.friction * contact.normal_impulse * 1.05 + 1e-3;
                assert!(contact.tangent_impulse[0].abs() <= limit);
                assert!(contact.tangent_impulse[1].abs() <= limit);
            }
        }
    }

    let body = simulation.body(cube).unwrap();
    assert!(body.linear_velocity().length() < 0.05);
    let travelled = body.position().x - start.x;
    assert!(travelled > 0.5 && travelled < 2.0, "travelled {travelled}");
}

#[test]
fn frictionless_box_keeps_sliding() {
    let mut simulation = Simulation::new(SimulationSettings::default().with_enable_friction(false)).unwrap();
    add_floor(&mut simulation);
    let (cube, _) = add_cube(
        &mut simulation,
        BodyDescription::dynamic(Vec3::new(-3.0, 1.0, 0.0)).with_linear_velocity(Vec3::new(3.0, 0.0, 0.0)),
        0.0,
    );
    for _ in 0..60 {
        simulation.step();
    }
    assert_abs_diff_eq!(simulation.body(cube).unwrap().linear_velocity().x, 3.0, epsilon = 0.05);
}

#[derive(Default)]
struct Events {
    begun: Vec<(BoxHandle, BoxHandle)>,
    ended: Vec<(BoxHandle, BoxHandle)>,
}

struct Recorder(Rc<RefCell<Events>>);

impl IContactListener for Recorder {
    fn begin_contact(&mut self, contact: &ContactConstraint) {
        self.0.borrow_mut().begun.push((contact.box_a, contact.box_b));
    }

    fn end_contact(&mut self, contact: &ContactConstraint) {
        self.0.borrow_mut().ended.push((contact.box_a, contact.box_b));
    }
}

fn touches(pair: (BoxHandle, BoxHandle), a: BoxHandle, b: BoxHandle) -> bool {
    pair == (a, b) || pair == (b, a)
}

#[test]
fn listener_sees_landing_and_lift_off() {
    let mut simulation = simulation();
    let events = Rc::new(RefCell::new(Events::default()));
    simulation.set_contact_listener(Some(Box::new(Recorder(events.clone()))));
    let (_, floor_box) = add_floor(&mut simulation);
    let (cube, cube_box) = add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, 1.05, 0.0)), 0.0);

    for _ in 0..120 {
        simulation.step();
    }
    {
        let events = events.borrow();
        assert_eq!(events.begun.len(), 1);
        assert!(touches(events.begun[0], floor_box, cube_box));
        assert!(events.ended.is_empty());
    }

    simulation
        .set_body_transform(cube, Vec3::new(0.0, 10.0, 0.0), Vec3::Y, 0.0)
        .unwrap();
    simulation.step();
    let events = events.borrow();
    assert_eq!(events.ended.len(), 1);
    assert!(touches(events.ended[0], floor_box, cube_box));
}

#[test]
fn removing_a_touching_body_ends_and_drops_its_contacts() {
    let mut simulation = simulation();
    let events = Rc::new(RefCell::new(Events::default()));
    simulation.set_contact_listener(Some(Box::new(Recorder(events.clone()))));
    let (floor, _) = add_floor(&mut simulation);
    let (cube, _) = add_cube(&mut simulation, BodyDescription::dynamic(Vec3::new(0.0, 1.0, 0.0)), 0.0);
    for _ in 0..10 {
        simulation.step();
    }
    assert_eq!(simulation.contact_count(), 1);
    assert_eq!(simulation.body(floor).unwrap().contact_edges().len(), 1);

    simulation.remove_body(cube).unwrap();
    assert_eq!(simulation.contact_count(), 0);
    assert!(simulation.body(floor).unwrap().contact_edges().is_empty());
    assert_eq!(events.borrow().ended.len(), 1);
    assert!(simulation.remove_body(cube).is_err());

    for _ in 0..10 {
        simulation.step();
    }
    assert_eq!(simulation.body_count(), 1);
    assert_eq!(simulation.contact_count(), 0);
}

#[test]
fn static_and_asleep_bodies_do_not_move() {
    let mut simulation = simulation();
    let (floor, _) = add_floor(&mut simulation);
    let (parked, _) = add_cube(
        &mut simulation,
        BodyDescription::dynamic(Vec3::new(5.0, 4.0, 0.0)).with_awake(false),
        0.0,
    );
    for _ in 0..60 {
        simulation.step();
    }
    assert_eq!(simulation.body(floor).unwrap().position(), Vec3::ZERO);
    assert_eq!(simulation.body(parked).unwrap().position(), Vec3::new(5.0, 4.0, 0.0));
    assert_eq!(simulation.step_index(), 60);
}
