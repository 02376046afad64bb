// tag_arena/server/src/world/waypoints.rs
//! Navigation graph: waypoints per radius class, all-pairs shortest distances and
//! cached shortest paths, plus the `find_route` query used by bots.

use metrics::histogram;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::config::{NavConfig, VisionConfig};
use crate::core::constants::{MAX_CORNER_MITER, MIN_WAYPOINT_SPACING};
use crate::core::error::{SimError, SimResult};
use crate::core::geometry::{outward_normal, Aabb};
use crate::core::types::{RadiusClass, Vec2, WaypointId};
use crate::world::obstacle::{Obstacle, Shape};
use crate::world::obstacle_index::{ObstacleIndex, ObstacleSet};

/// Relaxation improvements smaller than this are float noise.
const RELAX_EPSILON: f64 = 1e-9;
/// Extra clearance so offset corners do not sit exactly on the rejection boundary.
const PLACEMENT_SLACK: f64 = 1.0;
const CIRCLE_WAYPOINTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,
    pub position: Vec2,
}

pub struct NavGraph {
    radius_class: RadiusClass,
    waypoints: Vec<Waypoint>,
    neighbors: Vec<Vec<(WaypointId, f64)>>,
    distances: Vec<Vec<f64>>,
    paths: Vec<Vec<Vec<Vec2>>>,
}

impl NavGraph {
    /// Generates candidate waypoints for `radius_class` over `bounds` and builds the graph
    /// against the static walls.
    pub fn build(
        radius_class: RadiusClass,
        bounds: Aabb,
        walls: &ObstacleIndex,
        nav: &NavConfig,
        vision: &VisionConfig,
    ) -> SimResult<NavGraph> {
        let clearance = radius_class.radius() + nav.margin;
        let candidates = generate_candidates(walls, bounds, clearance, vision);
        let candidate_count = candidates.len();
        let positions = filter_candidates(candidates, walls, bounds, clearance);
        debug!(
            "[NavGraph {}]: {} of {} candidates survive clearance {:.1}",
            radius_class,
            positions.len(),
            candidate_count,
            clearance
        );
        Self::from_positions(radius_class, positions, walls)
    }

    /// Builds the graph over explicit waypoint positions.
    pub fn from_positions(radius_class: RadiusClass, positions: Vec<Vec2>, walls: &ObstacleIndex) -> SimResult<NavGraph> {
        let started = Instant::now();
        let radius = radius_class.radius();
        let waypoints: Vec<Waypoint> = positions
            .into_iter()
            .enumerate()
            .map(|(id, position)| Waypoint { id, position })
            .collect();
        let n = waypoints.len();

        let neighbors = connect(&waypoints, walls, radius);
        let edge_count: usize = neighbors.iter().map(Vec::len).sum::<usize>() / 2;

        let (distances, passes) = relax(&neighbors, n);

        let mut graph = NavGraph {
            radius_class,
            waypoints,
            neighbors,
            distances,
            paths: Vec::new(),
        };
        graph.paths = graph.reconstruct_paths()?;

        let elapsed = started.elapsed();
        histogram!("arena_navgraph_build_seconds").record(elapsed.as_secs_f64());
        info!(
            "[NavGraph {}]: {} waypoints, {} edges, converged after {} passes in {:?}",
            radius_class, n, edge_count, passes, elapsed
        );
        Ok(graph)
    }

    pub fn radius_class(&self) -> RadiusClass {
        self.radius_class
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn position(&self, id: WaypointId) -> Vec2 {
        self.waypoints[id].position
    }

    pub fn neighbors(&self, id: WaypointId) -> &[(WaypointId, f64)] {
        &self.neighbors[id]
    }

    pub fn are_neighbors(&self, a: WaypointId, b: WaypointId) -> bool {
        self.neighbors[a].iter().any(|(k, _)| *k == b)
    }

    pub fn distance(&self, from: WaypointId, to: WaypointId) -> f64 {
        self.distances[from][to]
    }

    pub fn distances(&self) -> &[Vec<f64>] {
        &self.distances
    }

    /// Cached shortest path, starting at `from` and ending at `to`. Empty when disconnected.
    pub fn path(&self, from: WaypointId, to: WaypointId) -> &[Vec2] {
        &self.paths[from][to]
    }

    pub fn waypoints_within(&self, area: Aabb) -> impl Iterator<Item = &Waypoint> + '_ {
        self.waypoints.iter().filter(move |w| area.contains(w.position))
    }

    /// Shortest known route from `agent_pos` to `goal` for an agent of `agent_radius`.
    /// The returned points exclude `agent_pos` and always end with `goal`.
    pub fn find_route(
        &self,
        agent_pos: Vec2,
        agent_radius: f64,
        goal: Vec2,
        obstacles: &ObstacleSet<'_>,
    ) -> Option<Vec<Vec2>> {
        if obstacles.corridor_clear(agent_pos, goal, agent_radius) {
            return Some(vec![goal]);
        }

        let reachable_from = |p: Vec2| -> Vec<(WaypointId, f64)> {
            self.waypoints
                .iter()
                .filter(|w| obstacles.corridor_clear(p, w.position, agent_radius))
                .map(|w| (w.id, p.distance(w.position)))
                .collect()
        };
        let starts = reachable_from(agent_pos);
        if starts.is_empty() {
            return None;
        }
        let ends = reachable_from(goal);
        if ends.is_empty() {
            return None;
        }

        let mut best: Option<(f64, WaypointId, WaypointId)> = None;
        for &(s, to_start) in &starts {
            for &(e, from_end) in &ends {
                let through = self.distances[s][e];
                if !through.is_finite() {
                    continue;
                }
                let cost = to_start + through + from_end;
                if best.map_or(true, |(c, _, _)| cost < c) {
                    best = Some((cost, s, e));
                }
            }
        }
        let (_, start, end) = best?;

        let mut route = Vec::with_capacity(self.paths[end][start].len() + 1);
        route.push(goal);
        route.extend_from_slice(&self.paths[end][start]);
        route.reverse();
        Some(route)
    }

    fn reconstruct_paths(&self) -> SimResult<Vec<Vec<Vec<Vec2>>>> {
        let n = self.waypoints.len();
        (0..n)
            .into_par_iter()
            .map(|from| (0..n).map(|to| self.reconstruct(from, to)).collect::<SimResult<Vec<_>>>())
            .collect()
    }

    /// Greedy walk down the distance gradient until `to` is a direct neighbour.
    fn reconstruct(&self, from: WaypointId, to: WaypointId) -> SimResult<Vec<Vec2>> {
        if from == to {
            return Ok(vec![self.waypoints[from].position]);
        }
        if !self.distances[from][to].is_finite() {
            return Ok(Vec::new());
        }

        let limit = self.waypoints.len();
        let mut path = vec![self.waypoints[from].position];
        let mut current = from;
        loop {
            if self.are_neighbors(current, to) {
                path.push(self.waypoints[to].position);
                return Ok(path);
            }
            if path.len() > limit {
                return Err(SimError::PathOverrun {
                    radius_class: self.radius_class,
                    from,
                    to,
                    limit,
                });
            }
            let next = self.neighbors[current]
                .iter()
                .filter(|(k, _)| self.distances[*k][to].is_finite())
                .min_by(|(a, wa), (b, wb)| {
                    (self.distances[*a][to] + wa).total_cmp(&(self.distances[*b][to] + wb))
                })
                .map(|(k, _)| *k);
            match next {
                Some(k) => {
                    path.push(self.waypoints[k].position);
                    current = k;
                }
                None => {
                    return Err(SimError::EmptyPath {
                        radius_class: self.radius_class,
                        from,
                        to,
                    })
                }
            }
        }
    }
}

/// Corner, edge and grid candidates. Positions may still collide with walls.
fn generate_candidates(walls: &ObstacleIndex, bounds: Aabb, clearance: f64, vision: &VisionConfig) -> Vec<Vec2> {
    let reach = clearance + PLACEMENT_SLACK;
    let inner = vision.half_width.min(vision.half_height);
    let mut out = Vec::new();

    for wall in walls.all() {
        match wall.shape() {
            Shape::Polygon { vertices } => {
                let n = vertices.len();
                for i in 0..n {
                    let prev = vertices[(i + n - 1) % n];
                    let v = vertices[i];
                    let next = vertices[(i + 1) % n];
                    let n_in = outward_normal(prev, v);
                    let n_out = outward_normal(v, next);
                    let bisector = (n_in + n_out).normalize();
                    let cos = bisector.dot(n_in);
                    let miter = if cos > f64::EPSILON {
                        (reach / cos).min(MAX_CORNER_MITER * reach)
                    } else {
                        MAX_CORNER_MITER * reach
                    };
                    out.push(v + bisector * miter);

                    let length = v.distance(next);
                    if length > inner {
                        let pieces = (length / inner).ceil() as usize;
                        for k in 1..pieces {
                            let along = v.lerp(next, k as f64 / pieces as f64);
                            out.push(along + n_out * reach);
                        }
                    }
                }
            }
            Shape::Circle { center, radius } => {
                for i in 0..CIRCLE_WAYPOINTS {
                    let dir = Vec2::from_angle(std::f64::consts::TAU * i as f64 / CIRCLE_WAYPOINTS as f64);
                    out.push(*center + dir * (radius + reach));
                }
            }
        }
    }

    let cols = (bounds.width() / vision.half_width).ceil().max(1.0) as usize;
    let rows = (bounds.height() / vision.half_height).ceil().max(1.0) as usize;
    let cell_w = bounds.width() / cols as f64;
    let cell_h = bounds.height() / rows as f64;
    for row in 0..rows {
        for col in 0..cols {
            out.push(Vec2::new(
                bounds.min.x + (col as f64 + 0.5) * cell_w,
                bounds.min.y + (row as f64 + 0.5) * cell_h,
            ));
        }
    }
    out
}

fn filter_candidates(candidates: Vec<Vec2>, walls: &ObstacleIndex, bounds: Aabb, clearance: f64) -> Vec<Vec2> {
    let playable = bounds.shrink(clearance);
    let mut kept: Vec<Vec2> = Vec::with_capacity(candidates.len());
    for p in candidates {
        if !p.is_finite() || !playable.contains(p) {
            continue;
        }
        let covered = walls
            .within(Aabb::from_center(p, clearance, clearance))
            .iter()
            .any(|w: &&Obstacle| w.distance_to(p) < clearance);
        if covered {
            continue;
        }
        if kept.iter().any(|k| k.distance(p) < MIN_WAYPOINT_SPACING) {
            continue;
        }
        kept.push(p);
    }
    kept
}

/// Neighbour pass. Each unordered pair is cast once, in parallel.
fn connect(waypoints: &[Waypoint], walls: &ObstacleIndex, radius: f64) -> Vec<Vec<(WaypointId, f64)>> {
    let n = waypoints.len();
    let set = ObstacleSet::walls_only(walls);
    let edges: Vec<(WaypointId, WaypointId, f64)> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let a = waypoints[i].position;
            (i + 1..n).filter_map(move |j| {
                let b = waypoints[j].position;
                set.corridor_clear(a, b, radius).then(|| (i, j, a.distance(b)))
            })
        })
        .collect();

    let mut neighbors = vec![Vec::new(); n];
    for (i, j, w) in edges {
        neighbors[i].push((j, w));
        neighbors[j].push((i, w));
    }
    neighbors
}

/// Bellman-Ford style fixed point over all goals, at most `n` passes.
/// Returns the symmetrised matrix and the number of passes run.
fn relax(neighbors: &[Vec<(WaypointId, f64)>], n: usize) -> (Vec<Vec<f64>>, usize) {
    let mut d = vec![vec![f64::INFINITY; n]; n];
    for i in 0..n {
        d[i][i] = 0.0;
        for &(j, w) in &neighbors[i] {
            d[i][j] = w;
        }
    }

    let mut passes = 0;
    for _ in 0..n {
        passes += 1;
        let mut changed = false;
        for i in 0..n {
            for &(k, w) in &neighbors[i] {
                let (row_i, row_k) = two_rows(&mut d, i, k);
                for goal in 0..n {
                    let via = row_k[goal] + w;
                    if via + RELAX_EPSILON < row_i[goal] {
                        row_i[goal] = via;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    for i in 0..n {
        for j in i + 1..n {
            let m = d[i][j].min(d[j][i]);
            d[i][j] = m;
            d[j][i] = m;
        }
    }
    (d, passes)
}

fn two_rows(d: &mut [Vec<f64>], i: usize, k: usize) -> (&mut Vec<f64>, &Vec<f64>) {
    debug_assert_ne!(i, k);
    if i < k {
        let (head, tail) = d.split_at_mut(k);
        (&mut head[i], &tail[0])
    } else {
        let (head, tail) = d.split_at_mut(i);
        (&mut tail[0], &head[k])
    }
}
