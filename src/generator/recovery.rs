/*
recovery.rs

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

//! Decide what to do after a failed generation attempt.
//!
//! The [`RecoveryController`] counts the attempts and tracks the relaxations applied so far: the
//! material density factor, the rank of the entry/exit candidate to use, and the number of
//! reflections to remove from the path plan.
//!
//! For the Hard level, repeated failures at one configuration switch to the next easier
//! configuration. The puzzle keeps its Hard label.

use log::{debug, info, warn};
use std::fmt;
use std::time::{Duration, Instant};

use super::puzzles::Difficulty;
use crate::config::GuaranteedGenerationConfig;

/// Factor applied to the material density on each relaxed retry.
const DENSITY_RELAX_FACTOR: f64 = 0.8;

/// Why an attempt failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    /// The path planner ran out of time.
    Timeout,

    /// The validator rejected the puzzle.
    Validation { critical: bool },

    /// No entry/exit pair, or the realized exit is too close to the entry.
    Spacing,

    /// The plan could not be realized with materials.
    MaterialPlacement,

    /// The beam did not follow the plan.
    PhysicsViolation,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenerationFailure::Timeout => write!(f, "timeout"),
            GenerationFailure::Validation { critical: true } => {
                write!(f, "validation failure (critical)")
            }
            GenerationFailure::Validation { critical: false } => write!(f, "validation failure"),
            GenerationFailure::Spacing => write!(f, "spacing failure"),
            GenerationFailure::MaterialPlacement => write!(f, "material placement failure"),
            GenerationFailure::PhysicsViolation => write!(f, "physics violation"),
        }
    }
}

/// Next step after a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Try again with the same constraints.
    Retry,

    /// Try again with a lower material density and the next candidate pair.
    RetryRelaxed,

    /// Try again with the next candidate pair.
    ExpandSearch,

    /// Try again with fewer reflections and the next candidate pair.
    Simplify,

    /// Try again with the configuration of the given easier level.
    ReduceDifficulty(Difficulty),

    /// Stop and use a fallback puzzle.
    Fallback,

    /// Stop without a puzzle. Only when fallback puzzles are disabled.
    GiveUp,
}

/// [`RecoveryController`] object.
#[derive(Debug)]
pub struct RecoveryController {
    /// Requested difficulty (the puzzle label).
    difficulty: Difficulty,

    /// Level whose configuration is currently used.
    level: Difficulty,

    max_attempts: usize,
    timeout: Duration,
    enable_fallback: bool,
    adapt_after_failures: usize,

    /// Number of attempts started so far.
    attempt: usize,

    /// Consecutive failures at the current configuration level.
    consecutive_failures: usize,

    density_factor: f64,
    candidate_offset: usize,
    reflection_reduction: usize,

    /// Time of the first attempt.
    start: Instant,
}

impl RecoveryController {
    /// Create the object. The timeout starts immediately.
    pub fn new(difficulty: Difficulty, config: &GuaranteedGenerationConfig) -> Self {
        Self {
            difficulty,
            level: difficulty,
            max_attempts: config.max_attempts,
            timeout: Duration::from_millis(config.timeout_ms),
            enable_fallback: config.enable_fallback,
            adapt_after_failures: config.adapt_after_failures,
            attempt: 0,
            consecutive_failures: 0,
            density_factor: 1.0,
            candidate_offset: 0,
            reflection_reduction: 0,
            start: Instant::now(),
        }
    }

    /// Start a new attempt and return its number, starting at 1.
    pub fn begin_attempt(&mut self) -> usize {
        self.attempt += 1;
        self.attempt
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn level(&self) -> Difficulty {
        self.level
    }

    /// Level whose configuration replaced the requested one, if any.
    pub fn adapted_from(&self) -> Option<Difficulty> {
        if self.level != self.difficulty {
            Some(self.level)
        } else {
            None
        }
    }

    pub fn density_factor(&self) -> f64 {
        self.density_factor
    }

    pub fn candidate_offset(&self) -> usize {
        self.candidate_offset
    }

    pub fn reflection_reduction(&self) -> usize {
        self.reflection_reduction
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn timed_out(&self) -> bool {
        self.start.elapsed() >= self.timeout
    }

    /// Whether another attempt can start.
    pub fn can_continue(&self) -> bool {
        self.attempt < self.max_attempts && !self.timed_out()
    }

    /// Action to take when the attempts stop without a puzzle.
    pub fn terminal_action(&self) -> RecoveryAction {
        if self.enable_fallback {
            RecoveryAction::Fallback
        } else {
            RecoveryAction::GiveUp
        }
    }

    /// Record a failure of the current attempt and return the next action.
    pub fn on_failure(&mut self, failure: GenerationFailure) -> RecoveryAction {
        self.consecutive_failures += 1;
        let action: RecoveryAction = self.next_action(failure);
        debug!(
            "Attempt {}/{} ({} configuration): {failure} -> {action:?}",
            self.attempt, self.max_attempts, self.level
        );
        action
    }

    fn next_action(&mut self, failure: GenerationFailure) -> RecoveryAction {
        if !self.can_continue() {
            if self.timed_out() {
                warn!(
                    "Generation of a {} puzzle timed out after {} attempt(s)",
                    self.difficulty, self.attempt
                );
            }
            return self.terminal_action();
        }

        let critical: bool = matches!(failure, GenerationFailure::Validation { critical: true });
        if critical {
            if self.enable_fallback {
                return RecoveryAction::Fallback;
            }
            // No fallback to go to: move on to another candidate
            self.candidate_offset += 1;
            return RecoveryAction::ExpandSearch;
        }

        if self.difficulty == Difficulty::Hard
            && self.consecutive_failures >= self.adapt_after_failures
            && let Some(easier) = self.level.easier()
        {
            info!(
                "Hard puzzle: {} consecutive failures, using the {easier} configuration",
                self.consecutive_failures
            );
            self.level = easier;
            self.consecutive_failures = 0;
            self.density_factor = 1.0;
            self.candidate_offset = 0;
            self.reflection_reduction = 0;
            return RecoveryAction::ReduceDifficulty(easier);
        }

        match failure {
            GenerationFailure::Validation { .. } => {
                self.candidate_offset += 1;
                if self.attempt <= self.max_attempts / 2 {
                    self.density_factor *= DENSITY_RELAX_FACTOR;
                    RecoveryAction::RetryRelaxed
                } else {
                    RecoveryAction::Retry
                }
            }
            GenerationFailure::Spacing => {
                self.candidate_offset += 1;
                RecoveryAction::ExpandSearch
            }
            GenerationFailure::MaterialPlacement => {
                self.candidate_offset += 1;
                self.reflection_reduction += 1;
                RecoveryAction::Simplify
            }
            GenerationFailure::PhysicsViolation => {
                self.candidate_offset += 1;
                RecoveryAction::Retry
            }
            GenerationFailure::Timeout => RecoveryAction::Retry,
        }
    }
}
