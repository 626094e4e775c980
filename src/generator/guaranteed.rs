/*
guaranteed.rs

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

//! Generate puzzles with a single solution.
//!
//! Each attempt goes through the following stages:
//!
//! 1. Pick an entry/exit pair from the ranked candidates.
//! 2. Plan a route between them ([`PathPlanner`]).
//! 3. Place the planned mirrors, then scatter filler materials on the cells the route does not
//!    cross.
//! 4. Simulate the beam and compare the exit with the planned one.
//! 5. Validate the puzzle ([`SolutionValidator`]).
//!
//! When an attempt fails, the [`RecoveryController`] decides whether to retry (possibly with
//! relaxed constraints), to switch a Hard puzzle to an easier configuration, or to return a
//! fallback puzzle.

use chrono::Utc;
use log::{Level, debug, info, log_enabled, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use super::fallback::{self, BuiltinFallbacks, FallbackSource};
use super::grid::{self, GridPosition};
use super::hints;
use super::materials::{Material, MaterialGrid, MaterialWeights};
use super::physics::{BeamPhysics, BeamTrace, ReflectionEngine};
use super::placement::{self, EntryExitPair};
use super::planner::{PathPlan, PathPlanner, RoutePlanError};
use super::puzzles::{
    Difficulty, GenerationAlgorithm, GenerationResult, Puzzle, PuzzleGenerationMetadata,
};
use super::recovery::{GenerationFailure, RecoveryAction, RecoveryController};
use super::validator::{SolutionValidator, ValidationCriteria, ValidationResult};
use crate::config::{ConfigError, DifficultyProfile, GuaranteedGenerationConfig};

/// Hash a seed string and a difficulty into a random generator seed (FNV-1a, 64 bits).
pub fn seed_from_str(seed: &str, difficulty: Difficulty) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    seed.bytes()
        .chain([0, difficulty as u8])
        .fold(OFFSET, |hash, b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// Identifier of the puzzle generated for the given seed and difficulty.
pub fn puzzle_id(seed: &str, difficulty: Difficulty) -> String {
    format!("{seed}-{}", difficulty.to_string().to_lowercase())
}

/// Successful attempt.
struct Accepted {
    puzzle: Puzzle,
    plan: PathPlan,
    validation: ValidationResult,
}

/// [`GuaranteedGenerator`] object.
pub struct GuaranteedGenerator<
    P: BeamPhysics = ReflectionEngine,
    F: FallbackSource = BuiltinFallbacks,
> {
    config: GuaranteedGenerationConfig,
    physics: P,
    fallbacks: F,
}

impl GuaranteedGenerator {
    /// Create a generator with the default physics engine and fallback puzzles.
    ///
    /// # Errors
    ///
    /// Return an error if the configuration is invalid.
    pub fn new(config: GuaranteedGenerationConfig) -> Result<Self, ConfigError> {
        Self::with_components(config, ReflectionEngine, BuiltinFallbacks::new())
    }
}

impl<P: BeamPhysics, F: FallbackSource> GuaranteedGenerator<P, F> {
    /// Create a generator with the given physics engine and fallback source.
    ///
    /// # Errors
    ///
    /// Return an error if the configuration is invalid.
    pub fn with_components(
        config: GuaranteedGenerationConfig,
        physics: P,
        fallbacks: F,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            physics,
            fallbacks,
        })
    }

    pub fn config(&self) -> &GuaranteedGenerationConfig {
        &self.config
    }

    /// Generate a puzzle for the given difficulty. The same seed always gives the same puzzle
    /// (except for the creation date), unless the generation times out.
    pub fn generate_guaranteed_puzzle(
        &self,
        difficulty: Difficulty,
        seed: &str,
    ) -> GenerationResult {
        let mut rng: StdRng = StdRng::seed_from_u64(seed_from_str(seed, difficulty));
        self.generate_with_rng(difficulty, seed, &mut rng)
    }

    /// Generate a puzzle, drawing every random decision from `rng`.
    pub fn generate_with_rng<R: Rng>(
        &self,
        difficulty: Difficulty,
        seed: &str,
        rng: &mut R,
    ) -> GenerationResult {
        let id: String = puzzle_id(seed, difficulty);
        let mut controller: RecoveryController = RecoveryController::new(difficulty, &self.config);
        debug!("Generating {id}");

        while controller.can_continue() {
            let attempt: usize = controller.begin_attempt();
            match self.attempt(difficulty, &id, &controller, rng) {
                Ok(_) if controller.timed_out() => {
                    warn!(
                        "Attempt {attempt}: {id} finished after the {} ms timeout",
                        self.config.timeout_ms
                    );
                    break;
                }
                Ok(accepted) => {
                    debug!("Attempt {attempt}: {id} accepted");
                    return self.success(accepted, &controller);
                }
                Err(failure) => {
                    if matches!(
                        controller.on_failure(failure),
                        RecoveryAction::Fallback | RecoveryAction::GiveUp
                    ) {
                        break;
                    }
                }
            }
        }

        if controller.terminal_action() == RecoveryAction::Fallback {
            self.fallback(difficulty, &id, &controller, rng)
        } else {
            warn!(
                "Cannot generate {id} after {} attempt(s), fallback puzzles are disabled",
                controller.attempt()
            );
            self.failure(&id, &controller)
        }
    }

    /// Profile for one attempt: the grid and the spacing of the requested difficulty, and the
    /// materials, complexity, and threshold of the current configuration level.
    fn attempt_profile(&self, difficulty: Difficulty, level: Difficulty) -> DifficultyProfile {
        let requested: &DifficultyProfile = self.config.profile(difficulty);
        let current: &DifficultyProfile = self.config.profile(level);
        DifficultyProfile {
            grid_size: requested.grid_size,
            spacing: requested.spacing.clone(),
            materials: current.materials.clone(),
            complexity: current.complexity.clone(),
            confidence_threshold: current.confidence_threshold,
        }
    }

    /// Run one generation attempt.
    fn attempt<R: Rng>(
        &self,
        difficulty: Difficulty,
        id: &str,
        controller: &RecoveryController,
        rng: &mut R,
    ) -> Result<Accepted, GenerationFailure> {
        let profile: DifficultyProfile = self.attempt_profile(difficulty, controller.level());
        let size: usize = profile.grid_size;

        // Entry and exit
        let candidates: Vec<EntryExitPair> =
            placement::rank_candidates(size, difficulty, &profile.spacing, rng);
        if candidates.is_empty() {
            return Err(GenerationFailure::Spacing);
        }
        let pair: EntryExitPair = candidates[controller.candidate_offset() % candidates.len()];

        // Route
        let mut planner: PathPlanner = PathPlanner::new(size);
        let plan: PathPlan = planner
            .plan(
                &pair,
                &profile.complexity,
                controller.reflection_reduction(),
                rng,
            )
            .map_err(|e| match e {
                RoutePlanError::NoRoute => GenerationFailure::MaterialPlacement,
                RoutePlanError::BudgetExceeded => GenerationFailure::Timeout,
            })?;

        // Materials
        let layout: MaterialGrid =
            self.place_materials(&plan, &profile, controller.density_factor(), rng)?;

        // Simulation
        let trace: BeamTrace = self
            .physics
            .trace(&layout, plan.entry, plan.initial_direction, rng);
        let exit: GridPosition = match trace.exit() {
            Some(e) if e == plan.exit => e,
            other => {
                debug!("Planned exit {}, realized {other:?}", plan.exit);
                return Err(GenerationFailure::PhysicsViolation);
            }
        };
        if !placement::meets_spacing(plan.entry, exit, &profile.spacing) {
            return Err(GenerationFailure::Spacing);
        }

        let puzzle: Puzzle = Puzzle {
            id: id.to_string(),
            difficulty,
            grid_size: size,
            materials: layout.materials(),
            entry: plan.entry,
            solution: exit,
            hints: hints::build_hints(&trace.path, size),
            solution_path: trace.path,
            created_at: Utc::now(),
            material_density: layout.density(),
        };
        if log_enabled!(Level::Debug) {
            debug!("Candidate puzzle:\n{puzzle}");
        }

        // Validation
        let criteria: ValidationCriteria = ValidationCriteria {
            min_distance: profile.spacing.min_distance,
            confidence_threshold: profile.confidence_threshold,
        };
        let validation: ValidationResult =
            SolutionValidator::new(&self.physics).verify(&puzzle, Some(&plan), &criteria);
        if !validation.is_valid {
            debug!(
                "Validation failed: confidence {} (threshold {}), {} issue(s)",
                validation.confidence_score,
                criteria.confidence_threshold,
                validation.issues.len()
            );
            return Err(GenerationFailure::Validation {
                critical: validation.has_critical_issue(),
            });
        }

        Ok(Accepted {
            puzzle,
            plan,
            validation,
        })
    }

    /// Place the planned mirrors, then the filler materials away from the route.
    fn place_materials<R: Rng>(
        &self,
        plan: &PathPlan,
        profile: &DifficultyProfile,
        density_factor: f64,
        rng: &mut R,
    ) -> Result<MaterialGrid, GenerationFailure> {
        let size: usize = profile.grid_size;
        let mut layout: MaterialGrid = MaterialGrid::new(size);
        layout.reserve(plan.entry);

        for r in plan.critical_requirements() {
            let material: Material = match r.angle {
                Some(angle) => Material::mirror(r.position, angle),
                None => Material::new(r.material_type, r.position),
            };
            layout.place(material).map_err(|e| {
                debug!("Cannot place the planned {:?}: {e:?}", r.material_type);
                GenerationFailure::MaterialPlacement
            })?;
        }

        let weights: MaterialWeights = profile
            .materials
            .weights
            .to_weights()
            .ok_or(GenerationFailure::MaterialPlacement)?;
        let route: HashSet<GridPosition> = plan.route.iter().copied().collect();
        let mut free: Vec<GridPosition> = layout
            .free_cells()
            .into_iter()
            .filter(|c| !route.contains(c))
            .collect();
        free.shuffle(rng);

        let target: usize =
            (profile.materials.density * density_factor * (size * size) as f64).round() as usize;
        let filler: usize = target.saturating_sub(layout.len());
        for position in free.into_iter().take(filler) {
            layout
                .place(weights.random_material(position, rng))
                .map_err(|_| GenerationFailure::MaterialPlacement)?;
        }
        Ok(layout)
    }

    fn success(&self, accepted: Accepted, controller: &RecoveryController) -> GenerationResult {
        let Accepted {
            puzzle,
            plan,
            validation,
        } = accepted;
        if let Some(level) = controller.adapted_from() {
            info!("{} generated with the {level} configuration", puzzle.id);
        }
        GenerationResult {
            metadata: PuzzleGenerationMetadata {
                puzzle_id: puzzle.id.clone(),
                algorithm: GenerationAlgorithm::Guaranteed,
                attempts: controller.attempt(),
                generation_time_ms: controller.elapsed().as_millis() as u64,
                confidence_score: validation.confidence_score,
                validation_passed: true,
                spacing_distance: grid::spacing_distance(puzzle.entry, puzzle.solution),
                path_complexity: plan.complexity_score,
                material_density_achieved: puzzle.material_density,
                fallback_used: false,
                adapted_from_difficulty: controller.adapted_from(),
            },
            puzzle: Some(puzzle),
        }
    }

    fn fallback<R: Rng>(
        &self,
        difficulty: Difficulty,
        id: &str,
        controller: &RecoveryController,
        rng: &mut R,
    ) -> GenerationResult {
        let profile: &DifficultyProfile = self.config.profile(difficulty);
        let Some(mut puzzle) = self.fallbacks.fallback(difficulty, profile, rng) else {
            warn!(
                "No fallback puzzle for the {difficulty} level on a {0}x{0} grid",
                profile.grid_size
            );
            return self.failure(id, controller);
        };
        if !fallback::fits_profile(&puzzle, profile) {
            warn!(
                "The {difficulty} fallback puzzle does not fit the profile ({0}x{0} grid, {1} \
                 apart)",
                puzzle.grid_size,
                grid::spacing_distance(puzzle.entry, puzzle.solution)
            );
            return self.failure(id, controller);
        }
        info!(
            "Using a fallback puzzle for {id} after {} attempt(s)",
            controller.attempt()
        );
        puzzle.id = id.to_string();
        let validation: ValidationResult =
            SolutionValidator::new(&self.physics).verify_unique_solution(&puzzle);
        GenerationResult {
            metadata: PuzzleGenerationMetadata {
                puzzle_id: puzzle.id.clone(),
                algorithm: GenerationAlgorithm::Legacy,
                attempts: controller.attempt(),
                generation_time_ms: controller.elapsed().as_millis() as u64,
                confidence_score: validation.confidence_score,
                validation_passed: validation.is_valid,
                spacing_distance: grid::spacing_distance(puzzle.entry, puzzle.solution),
                path_complexity: 0.0,
                material_density_achieved: puzzle.material_density,
                fallback_used: true,
                adapted_from_difficulty: None,
            },
            puzzle: Some(puzzle),
        }
    }

    /// Metadata-only result when no puzzle can be returned.
    fn failure(&self, id: &str, controller: &RecoveryController) -> GenerationResult {
        GenerationResult {
            puzzle: None,
            metadata: PuzzleGenerationMetadata {
                puzzle_id: id.to_string(),
                algorithm: GenerationAlgorithm::Guaranteed,
                attempts: controller.attempt(),
                generation_time_ms: controller.elapsed().as_millis() as u64,
                confidence_score: 0.0,
                validation_passed: false,
                spacing_distance: 0.0,
                path_complexity: 0.0,
                material_density_achieved: 0.0,
                fallback_used: true,
                adapted_from_difficulty: controller.adapted_from(),
            },
        }
    }
}
