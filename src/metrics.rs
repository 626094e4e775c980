/*
metrics.rs

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

//! Aggregate generation statistics.
//!
//! The main object, [`GenerationMetrics`], receives the [`PuzzleGenerationMetadata`] records
//! returned with each puzzle. It can be shared between threads: the counters are atomic and the
//! per-difficulty statistics are protected by a mutex.
//! The generator never reads it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::generator::puzzles::{Difficulty, GenerationAlgorithm, PuzzleGenerationMetadata};

/// Accumulated values for one difficulty level.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    /// Number of generation requests.
    pub count: u64,

    pub total_attempts: u64,
    pub total_time_ms: u64,

    /// Slowest request.
    pub max_time_ms: u64,

    /// Sum of the confidence scores of the returned puzzles.
    pub total_confidence: f64,
}

impl DifficultyStats {
    pub fn average_attempts(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_attempts as f64 / self.count as f64
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_time_ms as f64 / self.count as f64
    }

    pub fn average_confidence(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_confidence / self.count as f64
    }
}

/// Point-in-time copy of the metrics.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total: u64,
    pub guaranteed: u64,
    pub fallback: u64,
    pub adapted: u64,

    /// Requests that returned no puzzle.
    pub failed: u64,

    pub by_difficulty: HashMap<Difficulty, DifficultyStats>,
}

impl MetricsSnapshot {
    /// Fraction of the requests served by the guaranteed generator.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.guaranteed as f64 / self.total as f64
    }
}

/// Metrics aggregator.
#[derive(Debug, Default)]
pub struct GenerationMetrics {
    total: AtomicU64,
    guaranteed: AtomicU64,
    fallback: AtomicU64,
    adapted: AtomicU64,
    failed: AtomicU64,
    by_difficulty: Mutex<HashMap<Difficulty, DifficultyStats>>,
}

impl GenerationMetrics {
    /// Create a [`GenerationMetrics`] object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generation result to the statistics.
    ///
    /// The difficulty is the one of the returned puzzle, or `difficulty` when no puzzle was
    /// returned.
    pub fn record(&self, difficulty: Difficulty, metadata: &PuzzleGenerationMetadata) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match (metadata.algorithm, metadata.fallback_used) {
            (GenerationAlgorithm::Guaranteed, false) => {
                self.guaranteed.fetch_add(1, Ordering::Relaxed);
            }
            (GenerationAlgorithm::Legacy, _) => {
                self.fallback.fetch_add(1, Ordering::Relaxed);
            }
            // No puzzle at all
            (GenerationAlgorithm::Guaranteed, true) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        if metadata.adapted_from_difficulty.is_some() && !metadata.fallback_used {
            self.adapted.fetch_add(1, Ordering::Relaxed);
        }

        let mut map = match self.by_difficulty.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stats: &mut DifficultyStats = map.entry(difficulty).or_default();
        stats.count += 1;
        stats.total_attempts += metadata.attempts as u64;
        stats.total_time_ms += metadata.generation_time_ms;
        stats.max_time_ms = stats.max_time_ms.max(metadata.generation_time_ms);
        stats.total_confidence += metadata.confidence_score;
    }

    /// Return a copy of the current statistics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_difficulty: HashMap<Difficulty, DifficultyStats> = match self.by_difficulty.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        MetricsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            guaranteed: self.guaranteed.load(Ordering::Relaxed),
            fallback: self.fallback.load(Ordering::Relaxed),
            adapted: self.adapted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            by_difficulty,
        }
    }
}
