//! How scheduling behaviour is tuned per request.

use crate::data::Task;
use serde::{Deserialize, Serialize};

/// Which pipeline fills the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Constraint propagation, MRV greedy with forward checking, and a
    /// backtracking fallback.
    #[default]
    Enhanced,
    /// Per-day maximum bipartite matching followed by local-search
    /// optimisation over several seeded attempts.
    MaxMatching,
}

/// Tuning knobs for one scheduling call. Every field has a default, so a
/// request may carry an empty rules object (or none at all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// `true`: a missing skill disqualifies a candidate outright.
    /// `false`: it costs a soft penalty instead and the result carries a
    /// skill-mismatch warning.
    pub strict_skill_matching: bool,

    /// Allow an operator to work heavy stations on adjacent days.
    pub allow_consecutive_heavy_shifts: bool,

    /// Steer flex operators onto the Exceptions station and everybody
    /// else away from it.
    pub prioritize_flex_for_exceptions: bool,

    /// Reward assignments on an operator's preferred stations.
    pub respect_preferred_tasks: bool,

    /// Upper bound on how many days in a row anyone stays on one station.
    pub max_consecutive_days_on_same_task: u32,

    /// Spread heavy stations evenly over the week's heavy-capable pool.
    pub fair_distribution: bool,

    /// Keep total assignment counts close to the pool mean.
    pub balance_workload: bool,

    /// Run the coordinator rotation solver for coordinator stations.
    pub auto_assign_coordinators: bool,

    /// Range of the uniform jitter added to candidate scores. Zero makes
    /// the greedy pass fully deterministic regardless of seed.
    pub randomization_factor: f64,

    /// Reward touching rarely-used skills and penalise over-used ones.
    pub prioritize_skill_variety: bool,

    /// Pipeline selector.
    pub algorithm: Algorithm,

    /// Stations treated as heavy in addition to any `heavy` task flag.
    pub heavy_tasks: Vec<String>,

    /// Stations tolerating a two-day stay before rotation kicks in.
    pub soft_tasks: Vec<String>,

    /// Seed for the call-scoped RNG. The same seed with identical inputs
    /// reproduces the output exactly; absent, a fixed constant is used so
    /// unconfigured runs are still reproducible.
    pub scheduling_seed: Option<u64>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            strict_skill_matching: true,
            allow_consecutive_heavy_shifts: false,
            prioritize_flex_for_exceptions: true,
            respect_preferred_tasks: true,
            max_consecutive_days_on_same_task: 2,
            fair_distribution: true,
            balance_workload: true,
            auto_assign_coordinators: true,
            randomization_factor: 10.0,
            prioritize_skill_variety: false,
            algorithm: Algorithm::Enhanced,
            heavy_tasks: [
                "Troubleshooter",
                "Exceptions",
                "Quality checker",
                "Troubleshooter AD",
                "Platform",
            ]
            .map(String::from)
            .to_vec(),
            soft_tasks: ["Filler", "Exceptions", "Decanting"].map(String::from).to_vec(),
            scheduling_seed: None,
        }
    }
}

impl Rules {
    /// Seed used when the request doesn't carry one.
    pub const DEFAULT_SEED: u64 = 0x5EED;

    /// The effective RNG seed for this call.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.scheduling_seed.unwrap_or(Self::DEFAULT_SEED)
    }

    /// Whether `task` counts as heavy under these rules.
    pub fn is_heavy(&self, task: &Task) -> bool {
        task.heavy
            || self
                .heavy_tasks
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&task.name))
    }

    /// Whether the station named `name` tolerates a two-day stay.
    pub fn is_soft(&self, name: &str) -> bool {
        self.soft_tasks.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Longest run anyone may stay on a station of the given class.
    ///
    /// Heavy and ordinary stations rotate daily, soft stations tolerate
    /// two days; the global rule value caps all of them.
    pub fn run_limit(&self, heavy: bool, soft: bool) -> u32 {
        let category = if !heavy && soft { 2 } else { 1 };
        category.min(self.max_consecutive_days_on_same_task).max(1)
    }
}
