/*
cli_options.rs

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

//! Process command-line options.
//!
//! These options are intended for developers tuning the generator.
//! Lightpath generates puzzles for a difficulty level and prints them as ASCII grids, or as JSON
//! documents with their generation metadata.
//!
//! # Examples
//!
//! Generate the puzzle of the day at the hard difficulty level:
//!
//! ```text
//! $ lightpath -f hard
//! ```
//!
//! Generate 50 easy puzzles from the `test` seed (`test`, `test#1`, `test#2`, ...) and print some
//! statistics:
//!
//! ```text
//! $ lightpath -f easy --seed test -c 50 -s
//! ```

use chrono::Local;
use clap::Parser;
use log::debug;
use std::env;
use std::path::PathBuf;

use lightpath::config::GuaranteedGenerationConfig;
use lightpath::generator::guaranteed::GuaranteedGenerator;
use lightpath::generator::puzzles::{Difficulty, GenerationResult};
use lightpath::metrics::{GenerationMetrics, MetricsSnapshot};

const COPYRIGHT_NOTICE: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nCopyright 2025 Hervé Quatremain\n",
    "License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>\n",
    "This is free software: you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

/// Generate Lightpath laser puzzles.
#[derive(Parser)]
#[command(about, long_about = None, version, long_version = COPYRIGHT_NOTICE)]
struct Args {
    /// Difficulty level for the puzzles
    #[arg(value_enum, short = 'f', long, default_value_t = Difficulty::Medium)]
    difficulty: Difficulty,

    /// Seed of the first puzzle (today's date by default)
    #[arg(long)]
    seed: Option<String>,

    /// Number of puzzles to generate
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not use predefined puzzles when generation fails
    #[arg(long, default_value_t = false)]
    no_fallback: bool,

    /// Print the puzzles and their metadata as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print some statistics after generating the puzzles
    #[arg(short, long, default_value_t = false)]
    summary: bool,

    /// Enable debug messages
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

/// Seed of the puzzle at the given position in the sequence.
fn nth_seed(seed: &str, i: usize) -> String {
    if i == 0 {
        seed.to_string()
    } else {
        format!("{seed}#{i}")
    }
}

fn print_result(result: &GenerationResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Cannot serialize {}: {e}", result.metadata.puzzle_id),
        }
        return;
    }
    match &result.puzzle {
        Some(puzzle) => {
            print!("{puzzle}");
            println!(
                "attempts = {}  time = {}ms  confidence = {:.1}  fallback = {}{}\n",
                result.metadata.attempts,
                result.metadata.generation_time_ms,
                result.metadata.confidence_score,
                result.metadata.fallback_used,
                match result.metadata.adapted_from_difficulty {
                    Some(d) => format!("  adapted from {d}"),
                    None => String::new(),
                }
            );
        }
        None => println!(
            "{}: no puzzle after {} attempt(s)\n",
            result.metadata.puzzle_id, result.metadata.attempts
        ),
    }
}

fn print_summary(s: &MetricsSnapshot) {
    println!(
        "
        puzzles = {}
     guaranteed = {}
       fallback = {}
        adapted = {}
         failed = {}
   success rate = {:.1}%",
        s.total,
        s.guaranteed,
        s.fallback,
        s.adapted,
        s.failed,
        s.success_rate() * 100.0
    );
    for difficulty in Difficulty::ALL {
        if let Some(stats) = s.by_difficulty.get(&difficulty) {
            println!(
                "
{difficulty}:
   average time = {:.1}ms
       max time = {}ms
average attempts = {:.2}
avg. confidence = {:.1}",
                stats.average_time_ms(),
                stats.max_time_ms,
                stats.average_attempts(),
                stats.average_confidence()
            );
        }
    }
}

/// Parse and process command-line options. Return the exit code.
pub fn parse() -> u8 {
    let args: Args = Args::parse();

    if args.debug {
        println!("DEBUG");
        unsafe {
            env::set_var("RUST_LOG", "debug");
        }
    }
    env_logger::init();

    let mut config: GuaranteedGenerationConfig = match &args.config {
        Some(path) => match GuaranteedGenerationConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}: {e}", path.display());
                return 1;
            }
        },
        None => GuaranteedGenerationConfig::default(),
    };
    if args.no_fallback {
        config.enable_fallback = false;
    }

    let generator: GuaranteedGenerator = match GuaranteedGenerator::new(config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let seed: String = args
        .seed
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
    let metrics: GenerationMetrics = GenerationMetrics::new();

    for i in 0..args.count {
        let s: String = nth_seed(&seed, i);
        debug!("Puzzle {i}: seed {s:?}");
        let result: GenerationResult = generator.generate_guaranteed_puzzle(args.difficulty, &s);
        metrics.record(args.difficulty, &result.metadata);
        print_result(&result, args.json);
    }

    if args.summary {
        print_summary(&metrics.snapshot());
    }
    0
}
