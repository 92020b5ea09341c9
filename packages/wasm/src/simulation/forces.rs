//! Force phases of a single simulation step.
//!
//! A step applies, in this order:
//! 1. Springs along every resolved link
//! 2. Pairwise repulsion, plus a collision push for overlapping radii
//! 3. Centering toward the viewport midpoint (the only dt-scaled phase)
//! 4. Damping and position integration
//!
//! The phases write into velocities as they go, so the order changes the
//! outcome of any single step. It is fixed here and nowhere else.

use crate::graph::Spring;

use super::config::SimulationConfig;

/// Golden angle in radians, used to spread coincident pairs.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Node physics state in Structure of Arrays layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bodies {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub radius: Vec<f64>,
}

impl Bodies {
    /// Create empty buffers with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            vx: Vec::with_capacity(capacity),
            vy: Vec::with_capacity(capacity),
            radius: Vec::with_capacity(capacity),
        }
    }

    /// Append a body.
    pub fn push(&mut self, (x, y): (f64, f64), (vx, vy): (f64, f64), radius: f64) {
        self.x.push(x);
        self.y.push(y);
        self.vx.push(vx);
        self.vy.push(vy);
        self.radius.push(radius);
    }

    /// Number of bodies.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether there are no bodies.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Advance every body by one step of `dt` seconds.
pub fn step(
    bodies: &mut Bodies,
    springs: &[Spring],
    center: (f64, f64),
    dt: f64,
    config: &SimulationConfig,
) {
    apply_springs(bodies, springs, config);
    apply_repulsion(bodies, config);
    apply_centering(bodies, center, dt, config);
    integrate(bodies, dt, config);
}

/// Pull or push each linked pair toward its rest length.
///
/// Not scaled by dt.
pub fn apply_springs(bodies: &mut Bodies, springs: &[Spring], config: &SimulationConfig) {
    for spring in springs {
        let (s, t) = (spring.source, spring.target);
        let dx = bodies.x[t] - bodies.x[s];
        let dy = bodies.y[t] - bodies.y[s];
        let mut dist = (dx * dx + dy * dy).sqrt();
        if dist == 0.0 {
            dist = config.epsilon;
        }

        let deviation = dist - spring.rest_length;
        let force = config.spring_constant * deviation * spring.strength;
        let fx = dx / dist * force;
        let fy = dy / dist * force;

        bodies.vx[s] += fx;
        bodies.vy[s] += fy;
        bodies.vx[t] -= fx;
        bodies.vy[t] -= fy;
    }
}

/// Inverse-square repulsion between every unordered pair, with an extra
/// push for pairs closer than their summed radii plus the margin.
///
/// O(n²); not scaled by dt.
pub fn apply_repulsion(bodies: &mut Bodies, config: &SimulationConfig) {
    let n = bodies.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = bodies.x[j] - bodies.x[i];
            let dy = bodies.y[j] - bodies.y[i];
            let dist_sq = dx * dx + dy * dy + config.epsilon;
            let dist = dist_sq.sqrt();

            let (ux, uy) = if dx == 0.0 && dy == 0.0 {
                coincident_direction(i, j)
            } else {
                (dx / dist, dy / dist)
            };

            let force = config.repulsion / dist_sq;
            bodies.vx[i] -= ux * force;
            bodies.vy[i] -= uy * force;
            bodies.vx[j] += ux * force;
            bodies.vy[j] += uy * force;

            let min_dist = bodies.radius[i] + bodies.radius[j] + config.collision_margin;
            if dist < min_dist {
                let push = (min_dist - dist) * 0.5;
                bodies.vx[i] -= ux * push;
                bodies.vy[i] -= uy * push;
                bodies.vx[j] += ux * push;
                bodies.vy[j] += uy * push;
            }
        }
    }
}

/// Nudge every body toward `center`, proportionally to dt.
pub fn apply_centering(bodies: &mut Bodies, center: (f64, f64), dt: f64, config: &SimulationConfig) {
    let k = config.centering * dt;
    for i in 0..bodies.len() {
        bodies.vx[i] += (center.0 - bodies.x[i]) * k;
        bodies.vy[i] += (center.1 - bodies.y[i]) * k;
    }
}

/// Damp velocities, then move positions.
///
/// Velocities are tuned for `frame_rate` steps per second, hence the
/// `dt * frame_rate` factor.
pub fn integrate(bodies: &mut Bodies, dt: f64, config: &SimulationConfig) {
    let scale = dt * config.frame_rate;
    for i in 0..bodies.len() {
        bodies.vx[i] *= config.damping;
        bodies.vy[i] *= config.damping;
        bodies.x[i] += bodies.vx[i] * scale;
        bodies.y[i] += bodies.vy[i] * scale;
    }
}

/// Unit direction for a pair at exactly the same point.
///
/// Derived from the indices alone so a step stays deterministic.
fn coincident_direction(i: usize, j: usize) -> (f64, f64) {
    let angle = (i as f64 + 1.0) * GOLDEN_ANGLE + j as f64;
    (angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bodies(a: (f64, f64), b: (f64, f64), radius: f64) -> Bodies {
        let mut bodies = Bodies::with_capacity(2);
        bodies.push(a, (0.0, 0.0), radius);
        bodies.push(b, (0.0, 0.0), radius);
        bodies
    }

    fn spring(rest_length: f64, strength: f64) -> Spring {
        Spring {
            source: 0,
            target: 1,
            rest_length,
            strength,
            weight: 1.0,
        }
    }

    #[test]
    fn test_stretched_spring_pulls_together() {
        let config = SimulationConfig::default();
        let mut bodies = two_bodies((0.0, 0.0), (200.0, 0.0), 5.0);
        apply_springs(&mut bodies, &[spring(100.0, 1.0)], &config);

        // 0.05 * (200 - 100) * 1.0
        assert!((bodies.vx[0] - 5.0).abs() < 1e-12);
        assert!((bodies.vx[1] + 5.0).abs() < 1e-12);
        assert_eq!(bodies.vy[0], 0.0);
    }

    #[test]
    fn test_compressed_spring_pushes_apart() {
        let config = SimulationConfig::default();
        let mut bodies = two_bodies((0.0, 0.0), (0.0, 40.0), 5.0);
        apply_springs(&mut bodies, &[spring(100.0, 0.5)], &config);

        assert!(bodies.vy[0] < 0.0);
        assert!(bodies.vy[1] > 0.0);
        assert_eq!(bodies.vy[0], -bodies.vy[1]);
    }

    #[test]
    fn test_spring_on_coincident_nodes_is_finite() {
        let config = SimulationConfig::default();
        let mut bodies = two_bodies((5.0, 5.0), (5.0, 5.0), 5.0);
        apply_springs(&mut bodies, &[spring(100.0, 1.0)], &config);
        assert!(bodies.vx.iter().chain(&bodies.vy).all(|v| v.is_finite()));
        // no direction to pull along; the pair phase separates them
        assert!(bodies.vx.iter().chain(&bodies.vy).all(|&v| v == 0.0));
    }

    #[test]
    fn test_repulsion_is_symmetric() {
        let config = SimulationConfig::default();
        let mut bodies = two_bodies((0.0, 0.0), (300.0, 0.0), 5.0);
        apply_repulsion(&mut bodies, &config);

        assert!(bodies.vx[0] < 0.0);
        assert_eq!(bodies.vx[0], -bodies.vx[1]);
        let expected = 2000.0 / (300.0 * 300.0 + 0.01);
        assert!((bodies.vx[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_collision_adds_to_repulsion() {
        let config = SimulationConfig::default();
        let far_radius = two_bodies((0.0, 0.0), (10.0, 0.0), 1.0);
        let mut without = far_radius.clone();
        apply_repulsion(&mut without, &config);

        let mut with = two_bodies((0.0, 0.0), (10.0, 0.0), 10.0);
        apply_repulsion(&mut with, &config);

        // min distance 22, actual ~10: extra push of ~6 on each side
        let extra = with.vx[1] - without.vx[1];
        assert!((extra - 6.0).abs() < 0.01, "extra push was {extra}");
    }

    #[test]
    fn test_coincident_pair_gets_a_direction() {
        let config = SimulationConfig::default();
        let mut bodies = two_bodies((50.0, 50.0), (50.0, 50.0), 5.0);
        apply_repulsion(&mut bodies, &config);

        assert!(bodies.vx.iter().chain(&bodies.vy).all(|v| v.is_finite()));
        assert!(bodies.vx[0] != bodies.vx[1] || bodies.vy[0] != bodies.vy[1]);
    }

    #[test]
    fn test_centering_scales_with_dt() {
        let config = SimulationConfig::default();
        let mut slow = two_bodies((0.0, 0.0), (100.0, 100.0), 5.0);
        let mut fast = slow.clone();
        apply_centering(&mut slow, (100.0, 100.0), 1.0 / 60.0, &config);
        apply_centering(&mut fast, (100.0, 100.0), 1.0 / 30.0, &config);

        assert!(slow.vx[0] > 0.0);
        assert!((fast.vx[0] - 2.0 * slow.vx[0]).abs() < 1e-12);
        // already centered
        assert_eq!(slow.vx[1], 0.0);
    }

    #[test]
    fn test_integrate_damps_then_moves() {
        let config = SimulationConfig::default();
        let mut bodies = Bodies::default();
        bodies.push((0.0, 0.0), (10.0, -4.0), 5.0);
        integrate(&mut bodies, 1.0 / 60.0, &config);

        assert!((bodies.vx[0] - 8.5).abs() < 1e-12);
        assert!((bodies.x[0] - 8.5).abs() < 1e-9);
        assert!((bodies.y[0] + 3.4).abs() < 1e-9);
    }
}
