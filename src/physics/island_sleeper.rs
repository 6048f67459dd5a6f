use tracing::info;

use crate::physics::bodies::Bodies;
use crate::physics::body_properties::BodyFlags;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_settings::SimulationSettings;

/// Decides when a solved island has been still long enough to be put to sleep.
pub struct IslandSleeper;

impl IslandSleeper {
    /// Updates the sleep timers of an island's non-static members and puts every member to sleep
    /// once the shortest timer exceeds `settings.sleep_time`.
    ///
    /// A member moving faster than the thresholds, or one that does not allow sleeping, resets its
    /// own timer and keeps the whole island awake. Returns true if the island was put to sleep.
    pub fn evaluate(bodies: &mut Bodies, members: &[BodyHandle], settings: &SimulationSettings) -> bool {
        let mut min_sleep_time = f32::MAX;
        for &handle in members {
            let Some(body) = bodies.get_mut(handle) else {
                continue;
            };
            if body.is_static() {
                continue;
            }
            let linear = body.linear_velocity.length_squared();
            let angular = body.angular_velocity.length_squared();
            if linear > settings.sleep_linear
                || angular > settings.sleep_angular
                || !body.flags.contains(BodyFlags::ALLOW_SLEEP)
            {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                body.sleep_time += settings.dt;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }
        }

        if min_sleep_time <= settings.sleep_time {
            return false;
        }
        for &handle in members {
            if let Some(body) = bodies.get_mut(handle) {
                body.set_to_sleep();
            }
        }
        info!(bodies = members.len(), "island fell asleep");
        true
    }

    /// Wakes every body. Used when sleeping is switched off.
    pub fn wake_all(bodies: &mut Bodies) {
        for (_, body) in bodies.iter_mut() {
            body.set_to_awake();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::bodies::Body;
    use crate::physics::body_description::BodyDescription;
    use glam::Vec3;

    fn settings() -> SimulationSettings {
        SimulationSettings::default()
    }

    #[test]
    fn test_still_island_sleeps_after_sleep_time() {
        let settings = settings();
        let mut bodies = Bodies::new();
        let floor = bodies.add(Body::new(&BodyDescription::fixed(Vec3::ZERO)));
        let resting = bodies.add(Body::new(&BodyDescription::dynamic(Vec3::Y)));
        let members = [floor, resting];

        let slept_after = (1..=40)
            .find(|_| IslandSleeper::evaluate(&mut bodies, &members, &settings))
            .expect("island never slept");
        assert!(slept_after as f32 * settings.dt > settings.sleep_time - 1e-4);
        assert!(slept_after <= 32);
        assert!(!bodies.get(resting).unwrap().is_awake());
        assert!(!bodies.get(floor).unwrap().is_awake());
    }

    #[test]
    fn test_one_moving_member_keeps_island_awake() {
        let settings = settings();
        let mut bodies = Bodies::new();
        let still = bodies.add(Body::new(&BodyDescription::dynamic(Vec3::ZERO)));
        let moving = bodies.add(Body::new(
            &BodyDescription::dynamic(Vec3::X).with_linear_velocity(Vec3::new(0.5, 0.0, 0.0)),
        ));
        for _ in 0..120 {
            assert!(!IslandSleeper::evaluate(&mut bodies, &[still, moving], &settings));
        }
        assert!(bodies.get(still).unwrap().sleep_time() > settings.sleep_time);
        assert_eq!(bodies.get(moving).unwrap().sleep_time(), 0.0);
    }

    #[test]
    fn test_bodies_that_refuse_sleep() {
        let settings = settings();
        let mut bodies = Bodies::new();
        let insomniac = bodies.add(Body::new(
            &BodyDescription::dynamic(Vec3::ZERO).with_allow_sleep(false),
        ));
        for _ in 0..120 {
            assert!(!IslandSleeper::evaluate(&mut bodies, &[insomniac], &settings));
        }
        bodies.get_mut(insomniac).unwrap().set_to_sleep();
        IslandSleeper::wake_all(&mut bodies);
        assert!(bodies.get(insomniac).unwrap().is_awake());
    }
}
