//! Scene queries: rays, boxes and points against the broad phase and the exact box shapes.

use approx::assert_abs_diff_eq;
use glam::Vec3;
use rust_boxphysics::{
    BodyDescription, BodyHandle, BoundingBox, BoxDescription, BoxHandle, RaycastData, Simulation, SimulationSettings,
};

fn simulation() -> Simulation {
    Simulation::new(SimulationSettings::default()).unwrap()
}

fn add_fixed_box(simulation: &mut Simulation, position: Vec3, extents: Vec3) -> (BodyHandle, BoxHandle) {
    let body = simulation.create_body(&BodyDescription::fixed(position)).unwrap();
    let shape = simulation.add_box(body, &BoxDescription::new(extents)).unwrap();
    (body, shape)
}

/// Three unit cubes spaced five units apart along x.
fn row_of_cubes(simulation: &mut Simulation) -> [BoxHandle; 3] {
    [0.0, 5.0, 10.0].map(|x| add_fixed_box(simulation, Vec3::new(x, 0.0, 0.0), Vec3::splat(0.5)).1)
}

/// Casts `ray` and recasts it against each reported box to recover the per-box hit.
fn collect_ray_hits(simulation: &Simulation, ray: &mut RaycastData) -> Vec<(BoxHandle, f32, Vec3)> {
    let mut reported = Vec::new();
    simulation.ray_cast(ray, &mut |shape: BoxHandle| {
        reported.push(shape);
        true
    });
    reported
        .into_iter()
        .map(|shape| {
            let mut single = *ray;
            let box_shape = simulation.box_shape(shape).unwrap();
            let body = simulation.body(box_shape.body).unwrap();
            assert!(box_shape.raycast(body.transform(), &mut single));
            (shape, single.toi, single.normal)
        })
        .collect()
}

#[test]
fn ray_reports_every_box_along_its_path() {
    let mut simulation = simulation();
    let (_, floor) = add_fixed_box(&mut simulation, Vec3::ZERO, Vec3::new(5.0, 0.5, 5.0));
    let (_, cube) = add_fixed_box(&mut simulation, Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5));

    let mut ray = RaycastData::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -2.0, 0.0), 10.0);
    assert_eq!(ray.dir, Vec3::NEG_Y);
    let mut hits = collect_ray_hits(&simulation, &mut ray);
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].0, cube);
    assert_abs_diff_eq!(hits[0].1, 2.5, epsilon = 1e-5);
    assert_eq!(hits[1].0, floor);
    assert_abs_diff_eq!(hits[1].1, 4.5, epsilon = 1e-5);
    for (_, _, normal) in &hits {
        assert_abs_diff_eq!(normal.y, 1.0, epsilon = 1e-5);
    }
}

#[test]
fn ray_leaves_toi_and_normal_of_the_reported_box() {
    let mut simulation = simulation();
    let (_, wall) = add_fixed_box(&mut simulation, Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.5, 3.0, 3.0));

    let mut ray = RaycastData::new(Vec3::ZERO, Vec3::X, 20.0);
    let mut reported = Vec::new();
    simulation.ray_cast(&mut ray, &mut |shape: BoxHandle| {
        reported.push(shape);
        true
    });
    assert_eq!(reported, vec![wall]);
    assert_abs_diff_eq!(ray.toi, 3.5, epsilon = 1e-5);
    assert_abs_diff_eq!(ray.normal.x, -1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(ray.impact_point().x, 3.5, epsilon = 1e-5);
}

#[test]
fn ray_misses_boxes_it_starts_in_or_cannot_reach() {
    let mut simulation = simulation();
    add_fixed_box(&mut simulation, Vec3::ZERO, Vec3::new(5.0, 0.5, 5.0));

    let mut count = 0;
    let mut inside = RaycastData::new(Vec3::ZERO, Vec3::NEG_Y, 10.0);
    simulation.ray_cast(&mut inside, &mut |_: BoxHandle| {
        count += 1;
        true
    });
    let mut beside = RaycastData::new(Vec3::new(20.0, 5.0, 0.0), Vec3::NEG_Y, 10.0);
    simulation.ray_cast(&mut beside, &mut |_: BoxHandle| {
        count += 1;
        true
    });
    let mut short = RaycastData::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 4.0);
    simulation.ray_cast(&mut short, &mut |_: BoxHandle| {
        count += 1;
        true
    });
    assert_eq!(count, 0);
}

#[test]
fn ray_follows_moving_bodies() {
    let mut simulation = simulation();
    let body = simulation
        .create_body(&BodyDescription::dynamic(Vec3::new(0.0, 10.0, 0.0)))
        .unwrap();
    let shape = simulation.add_box(body, &BoxDescription::new(Vec3::splat(0.5))).unwrap();
    for _ in 0..30 {
        simulation.step();
    }
    let top = simulation.body(body).unwrap().position().y + 0.5;
    assert!(top < 10.0);

    let mut ray = RaycastData::new(Vec3::new(0.0, 20.0, 0.0), Vec3::NEG_Y, 40.0);
    let mut reported = Vec::new();
    simulation.ray_cast(&mut ray, &mut |hit: BoxHandle| {
        reported.push(hit);
        true
    });
    assert_eq!(reported, vec![shape]);
    assert_abs_diff_eq!(ray.toi, 20.0 - top, epsilon = 1e-4);
}

#[test]
fn aabb_query_uses_exact_bounds() {
    let mut simulation = simulation();
    let [_, middle, _] = row_of_cubes(&mut simulation);

    let mut found = Vec::new();
    let around_middle = BoundingBox::new(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
    simulation.query_aabb(&around_middle, &mut |shape: BoxHandle| {
        found.push(shape);
        true
    });
    assert_eq!(found, vec![middle]);

    // Overlaps the fattened proxy of the middle cube but not the cube itself.
    found.clear();
    let near_miss = BoundingBox::new(Vec3::new(3.0, -1.0, -1.0), Vec3::new(4.3, 1.0, 1.0));
    simulation.query_aabb(&near_miss, &mut |shape: BoxHandle| {
        found.push(shape);
        true
    });
    assert!(found.is_empty());

    let everything = BoundingBox::new(Vec3::splat(-20.0), Vec3::splat(20.0));
    let mut count = 0;
    simulation.query_aabb(&everything, &mut |_: BoxHandle| {
        count += 1;
        true
    });
    assert_eq!(count, 3);
}

#[test]
fn queries_stop_when_the_callback_declines() {
    let mut simulation = simulation();
    row_of_cubes(&mut simulation);
    add_fixed_box(&mut simulation, Vec3::new(5.0, 0.0, 0.0), Vec3::splat(1.0));

    let everything = BoundingBox::new(Vec3::splat(-20.0), Vec3::splat(20.0));
    let mut count = 0;
    simulation.query_aabb(&everything, &mut |_: BoxHandle| {
        count += 1;
        false
    });
    assert_eq!(count, 1);

    count = 0;
    simulation.query_point(Vec3::new(5.0, 0.0, 0.0), &mut |_: BoxHandle| {
        count += 1;
        false
    });
    assert_eq!(count, 1);

    count = 0;
    simulation.query_point(Vec3::new(5.0, 0.0, 0.0), &mut |_: BoxHandle| {
        count += 1;
        true
    });
    assert_eq!(count, 2);
}

#[test]
fn point_query_tests_the_rotated_box() {
    let mut simulation = simulation();
    let [_, middle, _] = row_of_cubes(&mut simulation);
    let spun = simulation
        .create_body(&BodyDescription::fixed(Vec3::new(0.0, 0.0, 10.0)).with_rotation(Vec3::Y, std::f32::consts::FRAC_PI_4))
        .unwrap();
    let diamond = simulation.add_box(spun, &BoxDescription::new(Vec3::splat(0.5))).unwrap();

    let query = |point: Vec3| {
        let mut found = Vec::new();
        simulation.query_point(point, &mut |shape: BoxHandle| {
            found.push(shape);
            true
        });
        found
    };

    assert_eq!(query(Vec3::new(5.0, 0.2, -0.2)), vec![middle]);
    assert!(query(Vec3::new(5.7, 0.0, 0.0)).is_empty());
    // Past the face of an axis aligned cube but inside the corner of the rotated one.
    assert_eq!(query(Vec3::new(0.65, 0.0, 10.0)), vec![diamond]);
    assert!(query(Vec3::new(0.5, 0.0, 10.5)).is_empty());
}
