//! Per-agent flocking update step.

use glam::{Quat, Vec3};
use rand::Rng;
use shoal_core::{falloff, look_rotation, Transform};

use crate::grid::SpatialHashGrid;
use crate::school::SchoolState;

/// Distance at or below which a sampled neighbor counts as coincident.
pub const COINCIDENT_EPS: f32 = 1e-3;

/// Additive guard applied to the to-center vector before normalizing, so a
/// degenerate agent-on-center case never normalizes a zero vector.
const NORMALIZE_EPS: f32 = 1e-3;

/// Index window `[start, end)` of the flat agent store sampled for one agent
/// this tick.
///
/// Deliberately index-adjacency, not cell-adjacency: the grid is rebuilt
/// every tick but the update step samples a bounded random window of the
/// store itself, which may include the agent's own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub start: usize,
    pub end: usize,
}

impl SampleWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Draw this tick's neighbor window: a random start, extended by a random
/// offset of at most `sample_count` and clamped to the population bounds.
/// With fewer than two agents there is nothing to sample and the window is
/// empty.
pub fn sample_window(
    population: usize,
    sample_count: usize,
    rng: &mut impl Rng,
) -> SampleWindow {
    if population < 2 {
        return SampleWindow { start: 0, end: 0 };
    }
    let start = rng.gen_range(0..population);
    if sample_count == 0 {
        return SampleWindow { start, end: start };
    }
    let end = rng.gen_range(start + 1..start + 1 + sample_count).min(population);
    SampleWindow { start, end }
}

/// Transition function for one agent over one tick.
///
/// Pure: reads the previous tick's store, grid and school state, and
/// produces the agent's next transform without touching anything else.
/// The grid rides along for future spatial queries; neighbor sampling below
/// is index-window based.
pub fn steer_agent(
    index: usize,
    agents: &[Transform],
    _grid: &SpatialHashGrid,
    school: &SchoolState,
    delta_time: f32,
    rng: &mut impl Rng,
) -> Transform {
    let current = agents[index];

    // Advance along the local forward axis.
    let position = current.position + current.forward() * school.move_speed * delta_time;

    let to_center = school.center - position;
    let distance_from_center = to_center.length();
    let to_center_dir = (to_center + Vec3::splat(NORMALIZE_EPS)).normalize();
    let go_home_t = (distance_from_center / school.radius).clamp(0.0, 1.0);

    let mut repel_dir = Vec3::ZERO;
    let mut rot_away_x = 0.0f32;
    let mut rot_away_y = 0.0f32;

    let window = sample_window(agents.len(), school.neighbor_sample_count, rng);
    for neighbor in &agents[window.start..window.end] {
        let away = position - neighbor.position;
        let distance = away.length();
        if distance <= COINCIDENT_EPS {
            // Coincident: randomized angular shove on two independent axes.
            rot_away_x += school.repel_angle.x * rng.gen_range(-2.0..2.0);
            rot_away_y += school.repel_angle.y * rng.gen_range(-2.0..2.0);
        } else {
            repel_dir += (away / distance) * falloff(distance);
        }
    }

    // Farther from home: care less about local repulsion, more about return.
    let repel_scale = falloff(1.0 - go_home_t);
    rot_away_x *= repel_scale;
    rot_away_y *= repel_scale;

    let target = look_rotation(to_center_dir + repel_dir, school.up)
        * Quat::from_axis_angle(current.up(), rot_away_x)
        * Quat::from_axis_angle(current.right(), rot_away_y);

    // Homing overrides local avoidance as distance grows, up to 95%.
    let homing = look_rotation(to_center_dir, current.up());
    let target = target.lerp(homing, 0.95 * go_home_t);

    Transform {
        position,
        rotation: current.rotation.lerp(target, school.agility_damping),
        scale: current.scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_config::SchoolConfig;
    use shoal_core::RandomStreams;

    fn school_from(config: &SchoolConfig) -> SchoolState {
        SchoolState::from_config(config)
    }

    fn empty_grid() -> SpatialHashGrid {
        SpatialHashGrid::new(1.0)
    }

    fn angle_between(a: Quat, b: Quat) -> f32 {
        2.0 * a.dot(b).abs().clamp(-1.0, 1.0).acos()
    }

    #[test]
    fn window_stays_in_bounds() {
        let streams = RandomStreams::new(99);
        for agent in 0..200 {
            let mut rng = streams.agent_rng(0, agent);
            let window = sample_window(50, 8, &mut rng);
            assert!(window.start < 50);
            assert!(window.end <= 50);
            assert!(window.end > window.start);
            assert!(window.len() <= 8);
        }
    }

    #[test]
    fn window_degenerates_without_population_or_samples() {
        let mut rng = RandomStreams::new(1).agent_rng(0, 0);
        assert!(sample_window(0, 8, &mut rng).is_empty());
        assert!(sample_window(1, 8, &mut rng).is_empty());
        assert!(sample_window(10, 0, &mut rng).is_empty());
    }

    #[test]
    fn window_draws_are_reproducible() {
        let streams = RandomStreams::new(123);
        for tick in 0..5 {
            for agent in 0..20 {
                let a = sample_window(100, 8, &mut streams.agent_rng(tick, agent));
                let b = sample_window(100, 8, &mut streams.agent_rng(tick, agent));
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn lone_agent_turns_to_center_with_full_agility() {
        let config = SchoolConfig {
            population: 1,
            agility_damping: 1.0,
            school_radius: 10.0,
            move_speed: 0.0,
            ..SchoolConfig::default()
        };
        let mut school = school_from(&config);
        school.advance(0.0);

        let agents = [Transform::from_position(Vec3::new(5.0, 0.0, 0.0))];
        let mut rng = RandomStreams::new(config.random_seed).agent_rng(0, 0);
        let next = steer_agent(0, &agents, &empty_grid(), &school, 0.1, &mut rng);

        // No repulsion is possible with a single agent at a distinct
        // position, so the blend collapses to the pure look-at-center.
        let to_center_dir = (school.center - next.position + Vec3::splat(1e-3)).normalize();
        assert!((next.rotation.length() - 1.0).abs() < 1e-4);
        assert!(next.forward().dot(to_center_dir) > 1.0 - 1e-5);
    }

    #[test]
    fn coincident_neighbors_trigger_angular_repulsion() {
        let base = SchoolConfig {
            population: 2,
            agility_damping: 1.0,
            neighbor_sample_count: 2,
            move_speed: 0.0,
            ..SchoolConfig::default()
        };
        // Both agents on the same spot: every sampled neighbor (self
        // included) sits at distance zero, so the coincident branch fires.
        let position = Vec3::new(2.0, 0.0, 0.0);
        let agents = [
            Transform::from_position(position),
            Transform::from_position(position),
        ];
        let streams = RandomStreams::new(base.random_seed);

        let with_repel = school_from(&SchoolConfig {
            repel_angle: (0.5, 0.5),
            ..base.clone()
        });
        let without_repel = school_from(&SchoolConfig {
            repel_angle: (0.0, 0.0),
            ..base
        });

        for index in 0..2 {
            let grid = empty_grid();
            let shoved = steer_agent(
                index,
                &agents,
                &grid,
                &with_repel,
                0.1,
                &mut streams.agent_rng(0, index),
            );
            let plain = steer_agent(
                index,
                &agents,
                &grid,
                &without_repel,
                0.1,
                &mut streams.agent_rng(0, index),
            );
            // Same draws, same window; the only difference is the angular
            // repulsion derived from the seeded stream.
            assert!(
                angle_between(shoved.rotation, plain.rotation) > 1e-4,
                "agent {index}: coincident branch produced no rotation"
            );
        }
    }

    #[test]
    fn boundary_distance_counts_as_coincident() {
        // A neighbor at exactly the epsilon distance takes the coincident
        // branch, not the falloff branch.
        let base = SchoolConfig {
            population: 2,
            agility_damping: 1.0,
            neighbor_sample_count: 2,
            move_speed: 0.0,
            ..SchoolConfig::default()
        };
        let agents = [
            Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
            Transform::from_position(Vec3::new(2.0 + COINCIDENT_EPS, 0.0, 0.0)),
        ];
        let streams = RandomStreams::new(7);

        // Find a stream whose window for agent 0 includes its neighbor.
        let tick = (0..64)
            .find(|&t| {
                let window = sample_window(2, 2, &mut streams.agent_rng(t, 0));
                window.start == 0 && window.end == 2
            })
            .expect("no window covering both agents in 64 ticks");

        let with_repel = school_from(&SchoolConfig {
            repel_angle: (0.5, 0.5),
            ..base.clone()
        });
        let without_repel = school_from(&SchoolConfig {
            repel_angle: (0.0, 0.0),
            ..base
        });
        let grid = empty_grid();
        let shoved = steer_agent(
            0,
            &agents,
            &grid,
            &with_repel,
            0.1,
            &mut streams.agent_rng(tick, 0),
        );
        let plain = steer_agent(
            0,
            &agents,
            &grid,
            &without_repel,
            0.1,
            &mut streams.agent_rng(tick, 0),
        );
        assert!(angle_between(shoved.rotation, plain.rotation) > 1e-4);
    }

    #[test]
    fn homing_dominates_but_keeps_residual_repulsion() {
        let config = SchoolConfig {
            population: 2,
            agility_damping: 1.0,
            neighbor_sample_count: 2,
            move_speed: 0.0,
            repel_angle: (0.0, 0.0),
            school_radius: 10.0,
            ..SchoolConfig::default()
        };
        let school = school_from(&config);

        // Agent 0 far beyond the home radius (go_home_t saturates at 1)
        // with a perpendicular neighbor providing directional repulsion.
        let agents = [
            Transform::from_position(Vec3::new(100.0, 0.0, 0.0)),
            Transform::from_position(Vec3::new(100.0, 0.5, 0.0)),
        ];
        let streams = RandomStreams::new(11);
        let tick = (0..64)
            .find(|&t| {
                let window = sample_window(2, 2, &mut streams.agent_rng(t, 0));
                window.start == 0 && window.end == 2
            })
            .expect("no window covering both agents in 64 ticks");

        let grid = empty_grid();
        let next = steer_agent(
            0,
            &agents,
            &grid,
            &school,
            0.1,
            &mut streams.agent_rng(tick, 0),
        );
        let to_center_dir =
            (school.center - next.position + Vec3::splat(1e-3)).normalize();
        let homing = look_rotation(to_center_dir, agents[0].up());

        let residual = angle_between(next.rotation, homing);
        // The blend factor is 0.95 of full homing, never 1.0: a small
        // repulsion residual must survive.
        assert!(residual > 5e-3, "residual rounded away: {residual}");
        assert!(residual < 0.15, "homing no longer dominates: {residual}");
    }

    #[test]
    fn position_advances_along_forward() {
        let config = SchoolConfig {
            population: 1,
            neighbor_sample_count: 0,
            move_speed: 3.0,
            agility_damping: 0.0,
            ..SchoolConfig::default()
        };
        let school = school_from(&config);
        let agents = [Transform::from_position(Vec3::new(0.0, 0.0, 1.0))];
        let mut rng = RandomStreams::new(1).agent_rng(0, 0);

        let next = steer_agent(0, &agents, &empty_grid(), &school, 0.5, &mut rng);
        // Identity orientation: forward is +Z, speed 3 for half a second.
        assert!((next.position - Vec3::new(0.0, 0.0, 2.5)).length() < 1e-5);
        // Zero agility keeps the previous orientation.
        assert_eq!(next.rotation, agents[0].rotation);
        assert_eq!(next.scale, agents[0].scale);
    }
}
