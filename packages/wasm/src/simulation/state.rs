//! Simulation - owner of all physics state.
//!
//! The Simulation resolves a driver dataset into SoA body buffers and a
//! list of springs, then advances them one step at a time. Link topology
//! is also kept in a petgraph StableGraph for neighbor queries, and an
//! R-tree over the latest positions answers hit tests.

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::config::{SimulationConfig, non_negative, positive};
use super::forces::{self, Bodies};
use super::snapshot::{NodePosition, Snapshot};
use crate::graph::{GraphData, NodeId, Spring};
use crate::spatial::SpatialIndex;

/// A running (or runnable) force-directed layout.
///
/// This struct manages:
/// - Body buffers (positions, velocities, radii)
/// - Springs resolved from the current links
/// - The id→slot map, rebuilt on every dataset load
/// - Link topology for neighbor lookups
/// - A lazily rebuilt spatial index for hit testing
pub struct Simulation {
    config: SimulationConfig,

    /// Driver ids, one per slot
    ids: Vec<NodeId>,

    /// Display labels, passed through untouched
    labels: Vec<Option<String>>,

    bodies: Bodies,

    springs: Vec<Spring>,

    /// Map from driver id to slot (last occurrence wins on duplicates)
    slots: HashMap<NodeId, usize>,

    /// Link topology; node weight is the slot, edge weight the link weight
    topology: StableGraph<usize, f64, Directed>,

    width: f64,
    height: f64,

    /// Steps taken since the last load
    steps: u64,

    /// Links dropped at the last load because an endpoint did not resolve
    dropped_links: usize,

    rng: ChaCha8Rng,

    spatial: SpatialIndex,

    /// Whether positions moved since the spatial index was built
    spatial_dirty: bool,
}

impl Simulation {
    /// Create an empty simulation with the given tuning.
    pub fn new(config: SimulationConfig) -> Self {
        let config = config.sanitized();
        let rng = ChaCha8Rng::seed_from_u64(config.seed.unwrap_or_else(entropy_seed));
        let (width, height) = (config.default_width, config.default_height);
        Self {
            config,
            ids: Vec::new(),
            labels: Vec::new(),
            bodies: Bodies::default(),
            springs: Vec::new(),
            slots: HashMap::new(),
            topology: StableGraph::new(),
            width,
            height,
            steps: 0,
            dropped_links: 0,
            rng,
            spatial: SpatialIndex::new(),
            spatial_dirty: false,
        }
    }

    /// Build a simulation and load `data` into it.
    pub fn with_data(
        config: SimulationConfig,
        data: &GraphData,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Self {
        let mut sim = Self::new(config);
        sim.initialize(data, width, height);
        sim
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Rebuild all state from `data`.
    ///
    /// Finite input coordinates are kept, anything else is placed
    /// uniformly at random inside the viewport. Velocities start at zero.
    /// Links with an endpoint missing from `data.nodes` are dropped.
    pub fn initialize(&mut self, data: &GraphData, width: Option<f64>, height: Option<f64>) {
        self.load(data, width, height, false);
    }

    /// Replace the dataset.
    ///
    /// Behaves like [`initialize`](Self::initialize) unless the config
    /// enables warm starts, in which case ids present before and after
    /// keep their position and velocity when the new input gives no
    /// finite position for them.
    pub fn replace_dataset(&mut self, data: &GraphData, width: Option<f64>, height: Option<f64>) {
        let warm = self.config.warm_start;
        self.load(data, width, height, warm);
    }

    /// Swap the tuning. Takes effect from the next load or step.
    pub fn set_config(&mut self, config: SimulationConfig) {
        self.config = config.sanitized();
    }

    /// The active tuning.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn load(&mut self, data: &GraphData, width: Option<f64>, height: Option<f64>, warm: bool) {
        let previous = if warm { self.carried_state() } else { HashMap::new() };

        if let Some(seed) = self.config.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        (self.width, self.height) = self.config.viewport(width, height);

        let count = data.nodes.len();
        let mut ids = Vec::with_capacity(count);
        let mut labels = Vec::with_capacity(count);
        let mut bodies = Bodies::with_capacity(count);
        let mut slots = HashMap::with_capacity(count);
        let mut topology = StableGraph::with_capacity(count, data.links.len());

        for node in &data.nodes {
            let Some(id) = node.id.clone() else {
                tracing::trace!("skipping node without a usable id");
                continue;
            };

            let carried = previous.get(&id);
            let position = node
                .finite_position()
                .or_else(|| carried.map(|&(position, _)| position))
                .unwrap_or_else(|| self.random_position());
            let velocity = match (node.finite_position(), carried) {
                (None, Some(&(_, velocity))) => velocity,
                _ => (0.0, 0.0),
            };
            let radius = node
                .r
                .map_or(self.config.default_radius, |r| positive(r, self.config.default_radius));

            let slot = ids.len();
            if slots.insert(id.clone(), slot).is_some() {
                tracing::debug!(%id, "duplicate node id; links resolve to the last occurrence");
            }
            topology.add_node(slot);
            ids.push(id);
            labels.push(node.label.clone());
            bodies.push(position, velocity, radius);
        }

        let mut springs = Vec::with_capacity(data.links.len());
        let mut dropped = 0;
        for link in &data.links {
            let source = link.source.as_ref().and_then(|end| slots.get(end.id()));
            let target = link.target.as_ref().and_then(|end| slots.get(end.id()));
            let (Some(&source), Some(&target)) = (source, target) else {
                tracing::trace!(
                    source = ?link.source,
                    target = ?link.target,
                    "dropping link with unresolved endpoint"
                );
                dropped += 1;
                continue;
            };

            let spring = Spring {
                source,
                target,
                rest_length: link
                    .distance
                    .map_or(self.config.default_distance, |d| positive(d, self.config.default_distance)),
                strength: link
                    .strength
                    .map_or(self.config.default_strength, |s| non_negative(s, self.config.default_strength)),
                weight: link
                    .weight
                    .filter(|w| w.is_finite())
                    .unwrap_or(self.config.default_weight),
            };
            topology.add_edge(NodeIndex::new(source), NodeIndex::new(target), spring.weight);
            springs.push(spring);
        }

        tracing::debug!(
            nodes = ids.len(),
            links = springs.len(),
            dropped_links = dropped,
            warm,
            width = self.width,
            height = self.height,
            "simulation loaded"
        );

        self.ids = ids;
        self.labels = labels;
        self.bodies = bodies;
        self.springs = springs;
        self.slots = slots;
        self.topology = topology;
        self.dropped_links = dropped;
        self.steps = 0;
        self.spatial_dirty = true;
    }

    /// Position and velocity per id, for warm starts.
    fn carried_state(&self) -> HashMap<NodeId, ((f64, f64), (f64, f64))> {
        self.slots
            .iter()
            .map(|(id, &i)| {
                let b = &self.bodies;
                (id.clone(), ((b.x[i], b.y[i]), (b.vx[i], b.vy[i])))
            })
            .collect()
    }

    fn random_position(&mut self) -> (f64, f64) {
        let x = self.rng.random::<f64>() * self.width;
        let y = self.rng.random::<f64>() * self.height;
        (x, y)
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Advance by one step of `dt` seconds.
    ///
    /// No randomness is involved: identical state and `dt` give identical
    /// results.
    pub fn step(&mut self, dt: f64) {
        let center = (self.width / 2.0, self.height / 2.0);
        forces::step(&mut self.bodies, &self.springs, center, dt, &self.config);
        self.steps += 1;
        self.spatial_dirty = true;
    }

    /// Advance by the configured time step.
    pub fn tick(&mut self) {
        self.step(self.config.time_step);
    }

    /// Current position of every node.
    pub fn snapshot(&self) -> Snapshot {
        let nodes = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| NodePosition {
                id: id.clone(),
                x: self.bodies.x[i],
                y: self.bodies.y[i],
            })
            .collect();
        Snapshot { nodes }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of simulated nodes.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of links that resolved at the last load.
    pub fn link_count(&self) -> usize {
        self.springs.len()
    }

    /// Number of links dropped at the last load.
    pub fn dropped_link_count(&self) -> usize {
        self.dropped_links
    }

    /// Steps taken since the last load.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Viewport as (width, height).
    pub fn viewport(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Resolved springs.
    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Driver ids in slot order.
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// Label passed through for `id`.
    pub fn label(&self, id: &NodeId) -> Option<&str> {
        self.slots.get(id).and_then(|&i| self.labels[i].as_deref())
    }

    /// Radius used for `id` in collisions.
    pub fn radius(&self, id: &NodeId) -> Option<f64> {
        self.slots.get(id).map(|&i| self.bodies.radius[i])
    }

    /// Position of `id`.
    pub fn position(&self, id: &NodeId) -> Option<(f64, f64)> {
        self.slots.get(id).map(|&i| (self.bodies.x[i], self.bodies.y[i]))
    }

    /// Velocity of `id`.
    pub fn velocity(&self, id: &NodeId) -> Option<(f64, f64)> {
        self.slots.get(id).map(|&i| (self.bodies.vx[i], self.bodies.vy[i]))
    }

    /// Give `id` a velocity, e.g. to nudge a node after a drag.
    ///
    /// Returns false if the id is unknown.
    pub fn set_velocity(&mut self, id: &NodeId, vx: f64, vy: f64) -> bool {
        match self.slots.get(id) {
            Some(&i) => {
                self.bodies.vx[i] = vx;
                self.bodies.vy[i] = vy;
                true
            }
            None => false,
        }
    }

    /// X positions in slot order.
    pub fn positions_x(&self) -> &[f64] {
        &self.bodies.x
    }

    /// Y positions in slot order.
    pub fn positions_y(&self) -> &[f64] {
        &self.bodies.y
    }

    /// Ids linked to `id` in either direction.
    pub fn neighbors(&self, id: &NodeId) -> Vec<NodeId> {
        self.slots
            .get(id)
            .map(|&slot| {
                self.topology
                    .neighbors_undirected(NodeIndex::new(slot))
                    .filter_map(|n| self.topology.node_weight(n))
                    .map(|&slot| self.ids[slot].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Nearest node to a point, within `max_distance`.
    pub fn node_at(&mut self, x: f64, y: f64, max_distance: f64) -> Option<NodeId> {
        self.ensure_spatial_index();
        self.spatial
            .nearest_within(x, y, max_distance)
            .map(|slot| self.ids[slot].clone())
    }

    /// All nodes inside a rectangle.
    pub fn nodes_in_rect(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<NodeId> {
        self.ensure_spatial_index();
        self.spatial
            .in_rect(min_x, min_y, max_x, max_y)
            .into_iter()
            .map(|slot| self.ids[slot].clone())
            .collect()
    }

    /// All nodes within `radius` of a point.
    pub fn nodes_in_radius(&mut self, x: f64, y: f64, radius: f64) -> Vec<NodeId> {
        self.ensure_spatial_index();
        self.spatial
            .in_radius(x, y, radius)
            .into_iter()
            .map(|slot| self.ids[slot].clone())
            .collect()
    }

    fn ensure_spatial_index(&mut self) {
        if self.spatial_dirty {
            self.spatial.rebuild(&self.bodies.x, &self.bodies.y);
            self.spatial_dirty = false;
        }
    }

    /// Drop every node and link, keeping the config and viewport.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.labels.clear();
        self.bodies = Bodies::default();
        self.springs.clear();
        self.slots.clear();
        self.topology.clear();
        self.dropped_links = 0;
        self.steps = 0;
        self.spatial.clear();
        self.spatial_dirty = false;
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// Seed for runs without a configured one.
#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    let high = (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
    let low = (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
    (high << 32) | low
}

/// Seed for runs without a configured one.
#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    rand::rng().random()
}
