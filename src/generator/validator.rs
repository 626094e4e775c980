/*
validator.rs

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

//! Verify that a puzzle has exactly one solution.
//!
//! The validator re-simulates the puzzle from its entry and compares the exit with the stored
//! solution. It then explores every branch of the probabilistic materials (glass and water) from
//! the entry. Any reachable exit other than the solution is an alternative solution.
//!
//! The result carries a confidence score, from 0 to 100:
//!
//! * 40% for the physics compliance (mirror interactions that follow the reflection law),
//! * 40% for the uniqueness (`1 / (1 + alternatives)`, or 0 when the solution is unreachable),
//!   where a loop the beam can fall into counts as an alternative,
//! * 20% for the adherence to the path plan, when one is provided.

use log::{Level, debug, log_enabled};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::grid::{self, Direction, GridPosition};
use super::materials::{MaterialGrid, MaterialType};
use super::path::LaserPath;
use super::physics::{BeamOutcome, BeamPhysics, BeamTrace, Exploration, TraceEnd, reflect};
use super::planner::PathPlan;
use super::puzzles::Puzzle;

/// Seed of the random generator used for the re-simulation.
const VALIDATION_SEED: u64 = 0x4c50_5641_4c49_4400;

/// Kind of problem found in a puzzle.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssueType {
    MultipleSolutions,
    NoSolution,
    PhysicsViolation,
    InfiniteLoop,
    SpacingViolation,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Problem found in a puzzle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub issue_type: ValidationIssueType,

    pub description: String,
    pub affected_positions: Vec<GridPosition>,
    pub severity: Severity,
}

/// Thresholds the puzzle is validated against.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ValidationCriteria {
    /// Minimum distance between the entry and the solution.
    pub min_distance: f64,

    /// Minimum confidence score for the puzzle to be valid.
    pub confidence_threshold: f64,
}

impl Default for ValidationCriteria {
    fn default() -> Self {
        Self {
            min_distance: 0.0,
            confidence_threshold: 0.0,
        }
    }
}

/// Result of a validation.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// No critical issue and a confidence score above the threshold.
    pub is_valid: bool,

    /// The solution is reachable and no other exit is.
    pub has_unique_solution: bool,

    /// Number of reachable exits other than the solution.
    pub alternative_count: usize,

    /// Fraction of the mirror interactions that follow the reflection law.
    pub physics_compliance: f64,

    pub physics_compliant: bool,
    pub confidence_score: f64,
    pub issues: Vec<ValidationIssue>,

    /// Path of the re-simulated beam.
    pub solution_path: Option<LaserPath>,

    pub validation_time_ms: u64,
}

impl ValidationResult {
    pub fn has_critical_issue(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    /// Invalid result for a puzzle that cannot even be laid out.
    fn broken(description: String, start: Instant) -> Self {
        Self {
            is_valid: false,
            has_unique_solution: false,
            alternative_count: 0,
            physics_compliance: 0.0,
            physics_compliant: false,
            confidence_score: 0.0,
            issues: vec![ValidationIssue {
                issue_type: ValidationIssueType::PhysicsViolation,
                description,
                affected_positions: Vec::new(),
                severity: Severity::Critical,
            }],
            solution_path: None,
            validation_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Fraction of the mirror interactions of the trace that follow the reflection law, and the
/// positions of the offending mirrors.
pub fn physics_compliance(trace: &BeamTrace) -> (f64, Vec<GridPosition>) {
    let mut total: usize = 0;
    let mut violations: Vec<GridPosition> = Vec::new();
    for i in trace
        .interactions
        .iter()
        .filter(|i| i.material_type == MaterialType::Mirror)
    {
        total += 1;
        let expected = BeamOutcome::Continue(reflect(i.incoming, i.angle.unwrap_or(45)));
        if i.outcome != expected {
            violations.push(i.position);
        }
    }
    if total == 0 {
        return (1.0, violations);
    }
    ((total - violations.len()) as f64 / total as f64, violations)
}

/// Fraction of the planned reflection points the beam actually reflects on, or 0 when the beam
/// does not leave through the planned exit.
pub fn plan_adherence(trace: &BeamTrace, plan: &PathPlan) -> f64 {
    if trace.exit() != Some(plan.exit) {
        return 0.0;
    }
    if plan.key_reflection_points.is_empty() {
        return 1.0;
    }
    let hit: usize = plan
        .key_reflection_points
        .iter()
        .filter(|p| {
            trace
                .interactions
                .iter()
                .any(|i| i.position == **p && i.material_type == MaterialType::Mirror)
        })
        .count();
    hit as f64 / plan.key_reflection_points.len() as f64
}

/// [`SolutionValidator`] object.
pub struct SolutionValidator<'a, P: BeamPhysics> {
    physics: &'a P,
}

impl<'a, P: BeamPhysics> SolutionValidator<'a, P> {
    /// Create the object.
    pub fn new(physics: &'a P) -> Self {
        Self { physics }
    }

    /// Only verify that the puzzle has a single reachable exit.
    pub fn verify_unique_solution(&self, puzzle: &Puzzle) -> ValidationResult {
        self.verify(puzzle, None, &ValidationCriteria::default())
    }

    /// Fully validate a puzzle.
    ///
    /// When `plan` is provided, the confidence score includes how closely the beam follows it.
    pub fn verify(
        &self,
        puzzle: &Puzzle,
        plan: Option<&PathPlan>,
        criteria: &ValidationCriteria,
    ) -> ValidationResult {
        let start: Instant = Instant::now();
        let layout: MaterialGrid = match puzzle.layout() {
            Ok(l) => l,
            Err(e) => {
                return ValidationResult::broken(
                    format!("Inconsistent material layout: {e:?}"),
                    start,
                );
            }
        };
        let size: usize = puzzle.grid_size;
        let direction: Direction = puzzle.entry.inward_direction(size);
        let mut issues: Vec<ValidationIssue> = Vec::new();

        // Re-simulate
        let mut rng: StdRng = StdRng::seed_from_u64(VALIDATION_SEED);
        let trace: BeamTrace = self.physics.trace(&layout, puzzle.entry, direction, &mut rng);
        match trace.end {
            TraceEnd::Exit { position, .. } if position == puzzle.solution => (),
            TraceEnd::Exit { position, .. } => issues.push(ValidationIssue {
                issue_type: ValidationIssueType::NoSolution,
                description: format!(
                    "The beam leaves at {position} instead of {}",
                    puzzle.solution
                ),
                affected_positions: vec![position, puzzle.solution],
                severity: Severity::Critical,
            }),
            TraceEnd::Absorbed { position } => issues.push(ValidationIssue {
                issue_type: ValidationIssueType::NoSolution,
                description: format!("The beam is absorbed at {position}"),
                affected_positions: vec![position],
                severity: Severity::Critical,
            }),
            TraceEnd::InfiniteLoop { position, .. } => issues.push(ValidationIssue {
                issue_type: ValidationIssueType::InfiniteLoop,
                description: format!("The beam loops at {position}"),
                affected_positions: vec![position],
                severity: Severity::Critical,
            }),
            TraceEnd::StepLimit => issues.push(ValidationIssue {
                issue_type: ValidationIssueType::InfiniteLoop,
                description: String::from("The beam never leaves the grid"),
                affected_positions: Vec::new(),
                severity: Severity::Critical,
            }),
        }

        // Every outcome of the probabilistic materials
        let exploration: Exploration = self.physics.explore(&layout, puzzle.entry, direction);
        let reachable: bool = exploration.exits.contains(&puzzle.solution);
        let alternatives: Vec<GridPosition> = exploration
            .exits
            .iter()
            .filter(|p| **p != puzzle.solution)
            .copied()
            .collect();
        if log_enabled!(Level::Debug) {
            debug!(
                "Validating {}: {} states explored, exits = {:?}",
                puzzle.id, exploration.states, exploration.exits
            );
        }
        if !alternatives.is_empty() {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::MultipleSolutions,
                description: format!(
                    "The beam can also leave at {}",
                    alternatives
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<String>>()
                        .join(", ")
                ),
                affected_positions: alternatives.clone(),
                severity: Severity::Critical,
            });
        }
        if exploration.has_loop() {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::InfiniteLoop,
                description: format!(
                    "Some outcomes trap the beam in a loop through {} cell(s)",
                    exploration.loop_cells.len()
                ),
                affected_positions: exploration.loop_cells.iter().copied().collect(),
                severity: Severity::Critical,
            });
        }
        if exploration.absorbed && reachable {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::NoSolution,
                description: String::from("Some outcomes end in an absorber"),
                affected_positions: Vec::new(),
                severity: Severity::Warning,
            });
        }

        let (compliance, violations) = physics_compliance(&trace);
        if !violations.is_empty() {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::PhysicsViolation,
                description: format!(
                    "{} mirror(s) do not follow the reflection law",
                    violations.len()
                ),
                affected_positions: violations,
                severity: Severity::Critical,
            });
        }

        let distance: f64 = grid::spacing_distance(puzzle.entry, puzzle.solution);
        if distance < criteria.min_distance {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::SpacingViolation,
                description: format!(
                    "Entry and solution are {distance} apart (minimum {})",
                    criteria.min_distance
                ),
                affected_positions: vec![puzzle.entry, puzzle.solution],
                severity: Severity::Warning,
            });
        }

        // A loop counts as one more way out
        let outcomes: usize = alternatives.len() + usize::from(exploration.has_loop());
        let uniqueness: f64 = if reachable {
            1.0 / (1.0 + outcomes as f64)
        } else {
            0.0
        };
        let adherence: f64 = match plan {
            Some(p) => plan_adherence(&trace, p),
            None => 1.0,
        };
        let confidence: f64 = 100.0 * (0.4 * compliance + 0.4 * uniqueness + 0.2 * adherence);
        let critical: bool = issues.iter().any(|i| i.severity == Severity::Critical);

        ValidationResult {
            is_valid: !critical && confidence >= criteria.confidence_threshold,
            has_unique_solution: reachable && outcomes == 0,
            alternative_count: alternatives.len(),
            physics_compliance: compliance,
            physics_compliant: compliance >= 1.0,
            confidence_score: confidence,
            issues,
            solution_path: Some(trace.path),
            validation_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::hints;
    use crate::generator::materials::Material;
    use crate::generator::physics::{Deflection, ReflectionEngine};
    use crate::generator::puzzles::Difficulty;
    use chrono::Utc;

    fn puzzle(entry: GridPosition, solution: GridPosition, materials: Vec<Material>) -> Puzzle {
        Puzzle {
            id: String::from("test-easy"),
            difficulty: Difficulty::Easy,
            grid_size: 6,
            materials,
            entry,
            solution,
            solution_path: LaserPath::new(),
            hints: hints::build_hints(&LaserPath::new(), 6),
            created_at: Utc::now(),
            material_density: 0.0,
        }
    }

    #[test]
    fn single_mirror_puzzle_is_unique() {
        let p = puzzle(
            GridPosition::new(0, 1),
            GridPosition::new(3, 5),
            vec![
                Material::mirror(GridPosition::new(3, 1), 135),
                Material::new(MaterialType::Metal, GridPosition::new(0, 5)),
            ],
        );
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&p);
        assert!(result.is_valid, "{:?}", result.issues);
        assert!(result.has_unique_solution);
        assert_eq!(result.alternative_count, 0);
        assert_eq!(result.confidence_score, 100.0);
        assert!(result.physics_compliant);
    }

    #[test]
    fn loop_reachable_through_glass_is_rejected() {
        // Reflected by the glass, the beam goes round the four mirrors and comes back to the
        // glass, where it can pass through and go round again.
        let p = puzzle(
            GridPosition::new(3, 0),
            GridPosition::new(3, 5),
            vec![
                Material::new(MaterialType::Glass, GridPosition::new(3, 2)),
                Material::mirror(GridPosition::new(2, 2), 45),
                Material::mirror(GridPosition::new(4, 2), 135),
                Material::mirror(GridPosition::new(4, 4), 45),
                Material::mirror(GridPosition::new(2, 4), 135),
            ],
        );
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&p);
        assert!(!result.has_unique_solution);
        assert!(!result.is_valid);
        assert!(result.has_critical_issue());
        assert!(result.confidence_score < 100.0);
        assert!(result.issues.iter().any(|i| {
            i.issue_type == ValidationIssueType::InfiniteLoop
                && i.severity == Severity::Critical
                && i.affected_positions.contains(&GridPosition::new(4, 4))
                && i.affected_positions.contains(&GridPosition::new(2, 2))
        }));
    }

    #[test]
    fn glass_on_the_route_gives_alternatives() {
        let p = puzzle(
            GridPosition::new(0, 3),
            GridPosition::new(5, 3),
            vec![Material::new(MaterialType::Glass, GridPosition::new(2, 3))],
        );
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&p);
        assert!(!result.has_unique_solution);
        assert_eq!(result.alternative_count, 1);
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| {
            i.issue_type == ValidationIssueType::MultipleSolutions
                && i.affected_positions == vec![GridPosition::new(2, 0)]
        }));
    }

    #[test]
    fn wrong_solution_is_critical() {
        let p = puzzle(GridPosition::new(0, 2), GridPosition::new(5, 4), Vec::new());
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&p);
        assert!(!result.is_valid);
        assert!(result.has_critical_issue());
        assert!(result.issues.iter().any(|i| i.issue_type == ValidationIssueType::NoSolution));
        // Solution unreachable, one alternative exit
        assert_eq!(result.confidence_score, 100.0 * (0.4 + 0.2));
    }

    #[test]
    fn mirror_facing_the_entry_sends_the_beam_back() {
        let p = puzzle(
            GridPosition::new(0, 2),
            GridPosition::new(5, 2),
            vec![
                Material::mirror(GridPosition::new(1, 2), 90),
                Material::mirror(GridPosition::new(4, 2), 90),
            ],
        );
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&p);
        assert!(!result.is_valid);
        assert_eq!(
            result.solution_path.as_ref().and_then(|p| p.exit),
            Some(GridPosition::new(0, 2))
        );
    }

    #[test]
    fn material_on_entry_is_rejected() {
        let p = puzzle(
            GridPosition::new(0, 2),
            GridPosition::new(5, 2),
            vec![Material::new(MaterialType::Water, GridPosition::new(0, 2))],
        );
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&p);
        assert!(!result.is_valid);
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn spacing_and_threshold_criteria() {
        let p = puzzle(GridPosition::new(0, 0), GridPosition::new(5, 0), Vec::new());
        let validator = SolutionValidator::new(&ReflectionEngine);
        let strict = ValidationCriteria {
            min_distance: 8.0,
            confidence_threshold: 101.0,
        };
        let result = validator.verify(&p, None, &strict);
        assert!(!result.is_valid);
        assert!(!result.has_critical_issue());
        assert!(result
            .issues
            .iter()
            .any(|i| i.issue_type == ValidationIssueType::SpacingViolation
                && i.severity == Severity::Warning));
    }

    /// Physics that turns the beam the wrong way on mirrors.
    struct BrokenMirrors;

    impl BeamPhysics for BrokenMirrors {
        fn interact(&self, material: &Material, incoming: Direction) -> Vec<Deflection> {
            let outcome = match material.material_type {
                MaterialType::Mirror => BeamOutcome::Continue(incoming.opposite()),
                _ => BeamOutcome::Continue(incoming),
            };
            vec![Deflection {
                outcome,
                probability: 1.0,
            }]
        }
    }

    #[test]
    fn non_compliant_physics_is_detected() {
        let p = puzzle(
            GridPosition::new(0, 1),
            GridPosition::new(3, 5),
            vec![Material::mirror(GridPosition::new(3, 1), 135)],
        );
        let result = SolutionValidator::new(&BrokenMirrors).verify_unique_solution(&p);
        assert!(!result.physics_compliant);
        assert_eq!(result.physics_compliance, 0.0);
        assert!(result
            .issues
            .iter()
            .any(|i| i.issue_type == ValidationIssueType::PhysicsViolation));
    }
}
