/*
planner.rs

Copyright 2025 Hervé Quatremain

This file is part of Lightpath.

Lightpath is free software: you can redistribute it and/or modify it under the
terms of the GNU General Public License as published by the Free Software
Foundation, either version 3 of the License, or (at your option) any later
version.

Lightpath is distributed in the hope that it will be useful, but WITHOUT ANY
WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
A PARTICULAR PURPOSE. See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License along with
Lightpath. If not, see <https://www.gnu.org/licenses/>.

SPDX-License-Identifier: GPL-3.0-or-later
*/

//! Plan the solution path backward from the chosen entry and exit.
//!
//! The planner builds a route made of straight runs joined by 90° turns. Each turn is a mirror
//! at 45° or 135°. The route never puts a mirror on a cell that the beam crosses elsewhere, and
//! never crosses a mirror it does not turn on, so the beam follows the route exactly once the
//! mirrors are placed and the other route cells are left empty.
//!
//! The search is a randomized depth-first search. Like any backtracking search on a large grid it
//! can take long, so it gives up after [`MAX_ITERATIONS`] steps or [`MAX_TIME_MS`] milliseconds.

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::grid::{Direction, Edge, GridPosition};
use super::materials::MaterialType;
use super::physics::mirror_angle_for;
use super::placement::EntryExitPair;
use super::puzzles::Difficulty;
use crate::config::ComplexityConfig;

/// Max number of search steps for one plan.
pub const MAX_ITERATIONS: usize = 20_000;

/// Max duration of the search for one plan.
pub const MAX_TIME_MS: u64 = 250;

/// Type of errors.
#[derive(Debug, PartialEq)]
pub enum RoutePlanError {
    /// No route with an acceptable number of reflections.
    NoRoute,

    /// No route found before the search budget ran out.
    BudgetExceeded,
}

/// Importance of a material requirement.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    /// The solution does not exist without it.
    Critical,

    /// Cells that must stay as planned, such as the endpoints.
    Supporting,

    /// Everything else.
    Decorative,
}

/// Material the plan needs in a given cell.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequirement {
    pub position: GridPosition,
    pub material_type: MaterialType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<u16>,

    pub priority: RequirementPriority,

    /// Order of the reflection along the route, for mirrors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_index: Option<usize>,
}

/// Planned solution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathPlan {
    pub entry: GridPosition,
    pub exit: GridPosition,

    /// Direction of the beam when it enters the grid.
    pub initial_direction: Direction,

    pub required_reflections: usize,

    /// Mirror positions, in route order.
    pub key_reflection_points: Vec<GridPosition>,

    pub material_requirements: Vec<MaterialRequirement>,

    pub complexity_score: f64,
    pub estimated_difficulty: Difficulty,

    /// Every cell the beam crosses, in route order, without duplicates.
    pub route: Vec<GridPosition>,
}

impl PathPlan {
    /// Requirements with the [`RequirementPriority::Critical`] priority.
    pub fn critical_requirements(&self) -> impl Iterator<Item = &MaterialRequirement> {
        self.material_requirements
            .iter()
            .filter(|r| r.priority == RequirementPriority::Critical)
    }
}

/// Direction that leaves the grid through the given edge.
fn outward(edge: Edge) -> Direction {
    match edge {
        Edge::Left => Direction::West,
        Edge::Right => Direction::East,
        Edge::Top => Direction::North,
        Edge::Bottom => Direction::South,
    }
}

fn is_horizontal(direction: Direction) -> bool {
    matches!(direction, Direction::East | Direction::West)
}

/// Complexity score of a route, from 0 to 100.
pub fn complexity_score(reflections: usize, grid_size: usize, route_length: usize) -> f64 {
    (reflections as f64 * 10.0 + grid_size as f64 * 2.0 + route_length as f64 * 0.5).min(100.0)
}

/// Difficulty a complexity score corresponds to.
pub fn estimate_difficulty(score: f64) -> Difficulty {
    if score < 40.0 {
        Difficulty::Easy
    } else if score < 60.0 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// [`PathPlanner`] object.
pub struct PathPlanner {
    /// Number of cells per side.
    grid_size: usize,

    entry: GridPosition,
    exit: GridPosition,

    /// Planned mirrors: position, incoming direction, outgoing direction.
    mirrors: Vec<(GridPosition, Direction, Direction)>,

    /// Positions of the planned mirrors, for fast lookups.
    mirror_cells: HashSet<GridPosition>,

    /// Cells crossed by the route built so far.
    covered: HashSet<GridPosition>,

    /// Number of iterations it took to find the last plan.
    pub iteration: usize,

    /// Duration in seconds it took to find the last plan.
    pub duration: f32,

    /// Time when the search started.
    start: Instant,
}

impl PathPlanner {
    /// Create the object.
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            entry: GridPosition::new(0, 0),
            exit: GridPosition::new(0, 0),
            mirrors: Vec::new(),
            mirror_cells: HashSet::new(),
            covered: HashSet::new(),
            iteration: 0,
            duration: 0.0,
            start: Instant::now(),
        }
    }

    /// Reflection counts to try, best first.
    ///
    /// `simplify` lowers the whole range. Counts that cannot bring the beam out through the
    /// exit edge are skipped: every turn swaps between horizontal and vertical travel.
    pub fn reflection_counts(
        &self,
        pair: &EntryExitPair,
        complexity: &ComplexityConfig,
        simplify: usize,
    ) -> Vec<usize> {
        let low: usize = complexity.min_reflections.saturating_sub(simplify);
        let high: usize = complexity.max_reflections.saturating_sub(simplify).max(low);
        let preferred: usize = complexity
            .preferred_reflections
            .saturating_sub(simplify)
            .clamp(low, high);

        let start_horizontal: bool = is_horizontal(pair.entry.inward_direction(self.grid_size));
        let exit_axes: Vec<bool> = pair
            .exit
            .edges(self.grid_size)
            .into_iter()
            .map(|e| is_horizontal(outward(e)))
            .collect();

        let mut counts: Vec<usize> = (low..=high)
            .filter(|k| exit_axes.contains(&(start_horizontal == (k % 2 == 0))))
            .collect();
        counts.sort_by_key(|k| (k.abs_diff(preferred), *k));
        counts
    }

    /// Plan a route between the pair's entry and exit.
    ///
    /// # Errors
    ///
    /// [`RoutePlanError::NoRoute`] when no route exists for any acceptable reflection count, and
    /// [`RoutePlanError::BudgetExceeded`] when the search takes too long. In that later case, the
    /// method can be retried.
    pub fn plan<R: Rng>(
        &mut self,
        pair: &EntryExitPair,
        complexity: &ComplexityConfig,
        simplify: usize,
        rng: &mut R,
    ) -> Result<PathPlan, RoutePlanError> {
        self.iteration = 0;
        self.duration = 0.0;
        self.start = Instant::now();
        self.entry = pair.entry;
        self.exit = pair.exit;

        let initial_direction: Direction = pair.entry.inward_direction(self.grid_size);
        let counts: Vec<usize> = self.reflection_counts(pair, complexity, simplify);
        debug!(
            "Planning {} -> {} (reflections to try: {counts:?})",
            pair.entry, pair.exit
        );

        for reflections in counts {
            self.mirrors.clear();
            self.mirror_cells.clear();
            self.covered.clear();
            self.covered.insert(self.entry);

            match self.find_route(self.entry, initial_direction, reflections, rng) {
                Ok(()) => {
                    self.duration = self.start.elapsed().as_secs_f32();
                    debug!(
                        "Route with {reflections} reflections: iterations = {}  duration = {}",
                        self.iteration, self.duration
                    );
                    return Ok(self.build_plan(initial_direction));
                }
                Err(RoutePlanError::NoRoute) => {
                    debug!("    No route with {reflections} reflections");
                }
                Err(e) => {
                    self.duration = self.start.elapsed().as_secs_f32();
                    return Err(e);
                }
            }
        }
        self.duration = self.start.elapsed().as_secs_f32();
        Err(RoutePlanError::NoRoute)
    }

    /// Recursively extend the route from `position`, travelling in `direction`, with
    /// `remaining` reflections left to place.
    fn find_route<R: Rng>(
        &mut self,
        position: GridPosition,
        direction: Direction,
        remaining: usize,
        rng: &mut R,
    ) -> Result<(), RoutePlanError> {
        self.iteration += 1;
        if self.iteration > MAX_ITERATIONS
            || self.start.elapsed() >= Duration::from_millis(MAX_TIME_MS)
        {
            return Err(RoutePlanError::BudgetExceeded);
        }

        if remaining == 0 {
            return match self.final_leg(position, direction) {
                Some(_) => Ok(()),
                None => Err(RoutePlanError::NoRoute),
            };
        }

        // Candidate mirror cells ahead, each with both possible turns
        let mut options: Vec<(GridPosition, Direction)> = Vec::new();
        let mut p: GridPosition = position;
        while let Some(q) = p.step(direction, self.grid_size) {
            p = q;
            // The beam cannot go past a mirror without turning
            if self.mirror_cells.contains(&q) {
                break;
            }
            // A mirror on a crossed cell would deflect an earlier run
            if self.covered.contains(&q) {
                continue;
            }
            // The exit cell only hosts the last mirror
            if q == self.exit && remaining > 1 {
                continue;
            }
            options.push((q, direction.rotate(2)));
            options.push((q, direction.rotate(-2)));
        }
        options.shuffle(rng);

        for (q, new_direction) in options {
            let added: Vec<GridPosition> = self.cover(position, q, direction);
            self.mirror_cells.insert(q);
            self.mirrors.push((q, direction, new_direction));

            match self.find_route(q, new_direction, remaining - 1, rng) {
                Ok(()) => return Ok(()),
                Err(RoutePlanError::BudgetExceeded) => return Err(RoutePlanError::BudgetExceeded),
                Err(RoutePlanError::NoRoute) => {
                    self.mirrors.pop();
                    self.mirror_cells.remove(&q);
                    for c in added {
                        self.covered.remove(&c);
                    }
                }
            }
        }
        Err(RoutePlanError::NoRoute)
    }

    /// Mark the cells after `from` up to `to` as crossed. Return the newly marked cells.
    fn cover(
        &mut self,
        from: GridPosition,
        to: GridPosition,
        direction: Direction,
    ) -> Vec<GridPosition> {
        let mut added: Vec<GridPosition> = Vec::new();
        let mut p: GridPosition = from;
        while p != to {
            match p.step(direction, self.grid_size) {
                Some(q) => {
                    if self.covered.insert(q) {
                        added.push(q);
                    }
                    p = q;
                }
                None => break,
            }
        }
        added
    }

    /// Cells from `position` (excluded) to the grid edge. None if the run hits a mirror or
    /// leaves the grid anywhere else than through the exit.
    fn final_leg(&self, position: GridPosition, direction: Direction) -> Option<Vec<GridPosition>> {
        let mut cells: Vec<GridPosition> = Vec::new();
        let mut last: GridPosition = position;
        while let Some(q) = last.step(direction, self.grid_size) {
            if self.mirror_cells.contains(&q) {
                return None;
            }
            cells.push(q);
            last = q;
        }
        if last == self.exit { Some(cells) } else { None }
    }

    /// Build the [`PathPlan`] object from the route found.
    fn build_plan(&self, initial_direction: Direction) -> PathPlan {
        // Ordered route cells
        let mut route: Vec<GridPosition> = vec![self.entry];
        let mut seen: HashSet<GridPosition> = HashSet::from([self.entry]);
        let mut position: GridPosition = self.entry;
        let mut direction: Direction = initial_direction;
        for (q, _, out) in &self.mirrors {
            let mut p: GridPosition = position;
            while p != *q {
                match p.step(direction, self.grid_size) {
                    Some(next) => {
                        if seen.insert(next) {
                            route.push(next);
                        }
                        p = next;
                    }
                    None => break,
                }
            }
            position = *q;
            direction = *out;
        }
        for c in self.final_leg(position, direction).unwrap_or_default() {
            if seen.insert(c) {
                route.push(c);
            }
        }

        let mut requirements: Vec<MaterialRequirement> = self
            .mirrors
            .iter()
            .enumerate()
            .map(|(i, (q, incoming, outgoing))| MaterialRequirement {
                position: *q,
                material_type: MaterialType::Mirror,
                angle: Some(mirror_angle_for(*incoming, *outgoing)),
                priority: RequirementPriority::Critical,
                reflection_index: Some(i),
            })
            .collect();
        requirements.push(MaterialRequirement {
            position: self.entry,
            material_type: MaterialType::Empty,
            angle: None,
            priority: RequirementPriority::Supporting,
            reflection_index: None,
        });
        if !self.mirror_cells.contains(&self.exit) {
            requirements.push(MaterialRequirement {
                position: self.exit,
                material_type: MaterialType::Empty,
                angle: None,
                priority: RequirementPriority::Supporting,
                reflection_index: None,
            });
        }

        let score: f64 = complexity_score(self.mirrors.len(), self.grid_size, route.len());
        PathPlan {
            entry: self.entry,
            exit: self.exit,
            initial_direction,
            required_reflections: self.mirrors.len(),
            key_reflection_points: self.mirrors.iter().map(|(q, _, _)| *q).collect(),
            material_requirements: requirements,
            complexity_score: score,
            estimated_difficulty: estimate_difficulty(score),
            route,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuaranteedGenerationConfig;
    use crate::generator::grid;
    use crate::generator::materials::{Material, MaterialGrid};
    use crate::generator::physics::{BeamPhysics, ReflectionEngine};
    use crate::generator::placement::{self, PlacementType};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pair(entry: GridPosition, exit: GridPosition, difficulty: Difficulty) -> EntryExitPair {
        EntryExitPair {
            entry,
            exit,
            distance: grid::spacing_distance(entry, exit),
            difficulty,
            validation_score: 0.0,
            placement_type: PlacementType::Edge,
        }
    }

    /// Place the critical mirrors of the plan and simulate the beam.
    fn realize(plan: &PathPlan, grid_size: usize) -> Option<GridPosition> {
        let mut layout = MaterialGrid::new(grid_size);
        for r in plan.critical_requirements() {
            layout
                .place(Material::mirror(r.position, r.angle.unwrap_or(45)))
                .expect("free cell");
        }
        let mut rng = StdRng::seed_from_u64(0);
        ReflectionEngine
            .trace(&layout, plan.entry, plan.initial_direction, &mut rng)
            .exit()
    }

    #[test]
    fn single_mirror_on_exit_cell() {
        let config = GuaranteedGenerationConfig::default();
        let complexity = &config.profile(Difficulty::Easy).complexity;
        let p = pair(GridPosition::new(0, 0), GridPosition::new(3, 0), Difficulty::Easy);
        let mut planner = PathPlanner::new(6);
        assert_eq!(planner.reflection_counts(&p, complexity, 0), vec![1, 3]);

        let mut rng = StdRng::seed_from_u64(11);
        let plan = planner.plan(&p, complexity, 0, &mut rng).expect("route exists");
        assert_eq!(plan.required_reflections, 1);
        assert_eq!(plan.key_reflection_points, vec![GridPosition::new(3, 0)]);
        let mirror = plan.critical_requirements().next().expect("one mirror");
        assert_eq!(mirror.angle, Some(45));
        assert_eq!(mirror.reflection_index, Some(0));
        assert_eq!(realize(&plan, 6), Some(GridPosition::new(3, 0)));
        assert_eq!(plan.route.first(), Some(&GridPosition::new(0, 0)));
        assert_eq!(plan.route.last(), Some(&GridPosition::new(3, 0)));
    }

    #[test]
    fn reflection_counts_respect_parity_and_simplification() {
        let config = GuaranteedGenerationConfig::default();
        let complexity = &config.profile(Difficulty::Hard).complexity;
        let planner = PathPlanner::new(10);
        // Left edge to right edge: horizontal start and end, even number of turns
        let p = pair(GridPosition::new(0, 3), GridPosition::new(9, 6), Difficulty::Hard);
        assert_eq!(planner.reflection_counts(&p, complexity, 0), vec![4, 6]);
        // Corner exits accept both parities
        let p = pair(GridPosition::new(0, 3), GridPosition::new(9, 9), Difficulty::Hard);
        assert_eq!(planner.reflection_counts(&p, complexity, 0), vec![4, 3, 5, 6]);
        assert_eq!(planner.reflection_counts(&p, complexity, 3), vec![1, 0, 2, 3]);
    }

    #[test]
    fn planned_routes_are_realized_by_the_physics() {
        let config = GuaranteedGenerationConfig::default();
        for difficulty in Difficulty::ALL {
            let profile = config.profile(difficulty);
            let mut rng = StdRng::seed_from_u64(difficulty as u64 + 40);
            let candidates =
                placement::rank_candidates(profile.grid_size, difficulty, &profile.spacing, &mut rng);
            let mut planner = PathPlanner::new(profile.grid_size);
            let mut planned = 0;
            for c in candidates.iter().take(15) {
                if let Ok(plan) = planner.plan(c, &profile.complexity, 0, &mut rng) {
                    planned += 1;
                    assert_eq!(realize(&plan, profile.grid_size), Some(c.exit));
                    assert_eq!(plan.key_reflection_points.len(), plan.required_reflections);
                    assert!(plan.required_reflections <= profile.complexity.max_reflections);
                    assert!(plan.route.contains(&c.exit));
                    assert!((0.0..=100.0).contains(&plan.complexity_score));
                }
            }
            assert!(planned > 0, "no plan for {difficulty}");
        }
    }

    #[test]
    fn unreachable_exit_has_no_route() {
        // Straight line only, but the exit is not on it
        let complexity = ComplexityConfig {
            min_reflections: 0,
            max_reflections: 0,
            preferred_reflections: 0,
        };
        let p = pair(GridPosition::new(0, 2), GridPosition::new(5, 4), Difficulty::Easy);
        let mut planner = PathPlanner::new(6);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            planner.plan(&p, &complexity, 0, &mut rng),
            Err(RoutePlanError::NoRoute)
        );
    }

    #[test]
    fn complexity_maps_to_difficulty() {
        assert_eq!(estimate_difficulty(complexity_score(2, 6, 10)), Difficulty::Easy);
        assert_eq!(estimate_difficulty(complexity_score(3, 8, 16)), Difficulty::Medium);
        assert_eq!(estimate_difficulty(complexity_score(4, 10, 25)), Difficulty::Hard);
    }
}
