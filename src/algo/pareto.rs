//! Multi-objective evaluation of candidate rosters.
//!
//! Candidates are scored on five axes, the non-dominated ones form the
//! Pareto front, and a small diverse subset of the front can be picked by
//! farthest-point selection for presentation to a planner.

use crate::data::{Assignment, Operator, OperatorMap, Rules, Task, TaskMap};
use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Objective vector of one candidate roster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objectives {
    /// Standard deviation of total loads. Lower is better.
    pub fairness: f64,
    /// Spread between the most and least loaded operator. Lower is better.
    pub workload_balance: f64,
    /// Fraction of assignments where the operator holds the required
    /// skill. Higher is better.
    pub skill_match: f64,
    /// Standard deviation of heavy-station loads. Lower is better.
    pub heavy_fairness: f64,
    /// Mean number of distinct stations per operator. Higher is better.
    pub variety: f64,
}

impl Objectives {
    /// Measure a roster against the operator pool it was built for.
    pub fn measure(
        operators: &[Operator],
        tasks: &[Task],
        rules: &Rules,
        assignments: &[Assignment],
    ) -> Self {
        let pool: Vec<&Operator> = operators.iter().filter(|o| o.in_pool()).collect();
        let op_ix: OperatorMap<usize> = pool.iter().enumerate().map(|(i, o)| (o.id, i)).collect();
        let task_by_id: TaskMap<&Task> = tasks.iter().map(|t| (t.id, t)).collect();

        let mut totals = vec![0u32; pool.len()];
        let mut heavy = vec![0u32; pool.len()];
        let mut unique: Vec<FxHashSet<crate::data::TaskId>> =
            vec![FxHashSet::default(); pool.len()];
        let mut matched = 0usize;

        for assignment in assignments {
            let Some(&op) = op_ix.get(&assignment.operator) else {
                continue;
            };
            let Some(task) = task_by_id.get(&assignment.task) else {
                continue;
            };
            totals[op] += 1;
            if rules.is_heavy(task) {
                heavy[op] += 1;
            }
            unique[op].insert(task.id);
            if pool[op].has_skill(&task.required_skill) {
                matched += 1;
            }
        }

        let skill_match = if assignments.is_empty() {
            1.0
        } else {
            matched as f64 / assignments.len() as f64
        };
        let variety = if pool.is_empty() {
            0.0
        } else {
            unique.iter().map(|u| u.len() as f64).sum::<f64>() / pool.len() as f64
        };
        let (min, max) = totals
            .iter()
            .minmax()
            .into_option()
            .map(|(a, b)| (*a, *b))
            .unwrap_or((0, 0));

        Self {
            fairness: stddev(&totals),
            workload_balance: (max - min) as f64,
            skill_match,
            heavy_fairness: stddev(&heavy),
            variety,
        }
    }

    /// Strict Pareto dominance: at least as good on every axis and
    /// strictly better on one.
    pub fn dominates(&self, other: &Self) -> bool {
        let no_worse = self.fairness <= other.fairness
            && self.workload_balance <= other.workload_balance
            && self.skill_match >= other.skill_match
            && self.heavy_fairness <= other.heavy_fairness
            && self.variety >= other.variety;
        let better = self.fairness < other.fairness
            || self.workload_balance < other.workload_balance
            || self.skill_match > other.skill_match
            || self.heavy_fairness < other.heavy_fairness
            || self.variety > other.variety;
        no_worse && better
    }

    fn as_array(&self) -> [f64; 5] {
        [
            self.fairness,
            self.workload_balance,
            self.skill_match,
            self.heavy_fairness,
            self.variety,
        ]
    }

    /// Whether axis `i` is maximised (the others are minimised).
    const MAXIMIZE: [bool; 5] = [false, false, true, false, true];
}

fn stddev(counts: &[u32]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let mean = counts.iter().sum::<u32>() as f64 / counts.len() as f64;
    let var = counts
        .iter()
        .map(|&c| (c as f64 - mean).powi(2))
        .sum::<f64>()
        / counts.len() as f64;
    var.sqrt()
}

/// Indices of the non-dominated candidates.
pub fn pareto_front(candidates: &[Objectives]) -> Vec<usize> {
    (0..candidates.len())
        .filter(|&i| {
            !candidates
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.dominates(&candidates[i]))
        })
        .collect()
}

/// How many rosters [`diversify`] usually shortlists for a planner.
pub const DEFAULT_SHORTLIST: usize = 5;

/// Pick up to `k` spread-out members of `front` (typically
/// [`DEFAULT_SHORTLIST`]) by farthest-point selection in normalised
/// objective space, starting from the best total score.
pub fn diversify(candidates: &[Objectives], front: &[usize], k: usize) -> Vec<usize> {
    if front.is_empty() || k == 0 {
        return Vec::new();
    }

    // Min-max normalise each axis over the candidate set, flipped so
    // bigger is always better.
    let normalised: Vec<[f64; 5]> = {
        let arrays: Vec<[f64; 5]> = candidates.iter().map(Objectives::as_array).collect();
        let mut lo = [f64::INFINITY; 5];
        let mut hi = [f64::NEG_INFINITY; 5];
        for a in &arrays {
            for axis in 0..5 {
                lo[axis] = lo[axis].min(a[axis]);
                hi[axis] = hi[axis].max(a[axis]);
            }
        }
        arrays
            .iter()
            .map(|a| {
                std::array::from_fn(|axis| {
                    let span = hi[axis] - lo[axis];
                    let scaled = if span > 0.0 {
                        (a[axis] - lo[axis]) / span
                    } else {
                        0.5
                    };
                    if Objectives::MAXIMIZE[axis] {
                        scaled
                    } else {
                        1.0 - scaled
                    }
                })
            })
            .collect()
    };

    let total = |i: usize| normalised[i].iter().sum::<f64>();
    let distance = |i: usize, j: usize| {
        normalised[i]
            .iter()
            .zip(&normalised[j])
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    };

    let seed = *front
        .iter()
        .max_by(|&&a, &&b| total(a).total_cmp(&total(b)).then(b.cmp(&a)))
        .expect("front is non-empty");
    let mut picked = vec![seed];

    while picked.len() < k.min(front.len()) {
        let next = front
            .iter()
            .copied()
            .filter(|i| !picked.contains(i))
            .max_by(|&a, &b| {
                let spread = |i: usize| {
                    picked
                        .iter()
                        .map(|&p| distance(i, p))
                        .fold(f64::INFINITY, f64::min)
                };
                spread(a).total_cmp(&spread(b)).then(b.cmp(&a))
            });
        match next {
            Some(i) => picked.push(i),
            None => break,
        }
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OperatorId, TaskId};
    use crate::{operators, stations};
    use chrono::Weekday;

    fn objectives(
        fairness: f64,
        workload_balance: f64,
        skill_match: f64,
        heavy_fairness: f64,
        variety: f64,
    ) -> Objectives {
        Objectives {
            fairness,
            workload_balance,
            skill_match,
            heavy_fairness,
            variety,
        }
    }

    #[test]
    fn test_dominance_needs_a_strict_edge() {
        let a = objectives(1.0, 2.0, 0.9, 1.0, 2.0);
        let b = objectives(1.0, 3.0, 0.9, 1.0, 2.0);
        assert!(a.dominates(&b), "a is equal everywhere and better on balance");
        assert!(!b.dominates(&a));
        assert!(!a.dominates(&a), "nothing dominates itself");
    }

    #[test]
    fn test_front_keeps_trade_offs() {
        let candidates = vec![
            objectives(1.0, 2.0, 0.9, 1.0, 2.0), // balanced
            objectives(0.5, 4.0, 0.9, 1.0, 2.0), // fairer, worse balance
            objectives(1.0, 2.0, 0.8, 1.0, 2.0), // dominated by the first
        ];
        assert_eq!(pareto_front(&candidates), vec![0, 1]);
    }

    #[test]
    fn test_diversify_starts_from_the_best_total() {
        let candidates = vec![
            objectives(0.0, 0.0, 1.0, 0.0, 3.0), // ideal
            objectives(2.0, 4.0, 0.5, 2.0, 1.0),
            objectives(1.0, 2.0, 0.7, 1.0, 2.0),
        ];
        let front = vec![0, 1, 2];
        let picked = diversify(&candidates, &front, 2);
        assert_eq!(picked[0], 0, "selection starts from the best total score");
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[1], 1, "the farthest candidate joins second");
    }

    #[test]
    fn test_measure_counts_loads_and_matches() {
        let operators = operators! {
            1: "A" (Regular) ["X"],
            2: "B" (Regular) ["X", "Y"],
        };
        let tasks = stations! {
            10: "T1" needs "X",
            11: "T2" needs "Y",
        };
        let rules = Rules::default();
        let assignments = vec![
            Assignment {
                day: Weekday::Mon,
                operator: OperatorId(1),
                task: TaskId(10),
            },
            Assignment {
                day: Weekday::Tue,
                operator: OperatorId(1),
                task: TaskId(11),
            },
            Assignment {
                day: Weekday::Mon,
                operator: OperatorId(2),
                task: TaskId(11),
            },
        ];
        let objectives = Objectives::measure(&operators, &tasks, &rules, &assignments);
        assert_eq!(objectives.workload_balance, 1.0, "loads are 2 and 1");
        assert!(
            (objectives.skill_match - 2.0 / 3.0).abs() < 1e-9,
            "A lacks Y on Tuesday, so two of three match"
        );
        assert_eq!(objectives.variety, 1.5, "A saw two stations, B one");
    }
}
