//! Greedy fill in MRV order with forward checking.
//!
//! Slots are taken most-constrained first; candidates are ranked by a
//! soft-preference score and the best ones seated. After every seat the
//! remaining slots are re-checked, and any slot that can no longer be
//! filled is set aside as a dead end for the backtracking fallback.

use crate::algo::model::{DomainMap, Grid, Model};
use crate::algo::order::{self, candidates};
use crate::algo::propagate::{SlotDemand, consume_demand};
use crate::data::{OperatorType, task::is_exceptions};
use rand::{Rng, rngs::StdRng};

/// What one greedy pass produced.
pub(crate) struct GreedyOutcome {
    /// Seats filled, as (operator, day, task) index triples. The grid and
    /// domains already reflect them.
    pub placed: Vec<(usize, usize, usize)>,
    /// Slots (with their residual seat counts) the pass could not fill.
    pub dead_ends: Vec<SlotDemand>,
}

/// Soft-preference score of seating `op` on `slot`, before jitter.
///
/// [`None`] disqualifies outright: a skill miss under strict matching, or
/// a pairing across the coordinator partition.
pub(crate) fn base_score(
    model: &Model<'_>,
    grid: &Grid,
    slot: &SlotDemand,
    op: usize,
) -> Option<f64> {
    let operator = model.ops[op];
    let rules = model.rules;
    let task = slot.task;
    let heavy = model.heavy[task];

    if !model.skill_ok(op, task) && rules.strict_skill_matching {
        return None;
    }
    if !model.partition_ok(op, task) {
        return None;
    }

    let mut score = 100.0;

    if !model.skill_ok(op, task) {
        score -= 50.0;
    }

    // A single-skilled flex operator has no other station to rotate to.
    if !operator.single_skilled_flex() {
        let yesterday = slot.day.checked_sub(1).and_then(|d| grid.task_at(op, d));
        if operator.kind == OperatorType::Coordinator && yesterday == Some(task) {
            score -= 100.0;
        }
        if heavy
            && !rules.allow_consecutive_heavy_shifts
            && yesterday.is_some_and(|t| model.heavy[t])
        {
            score -= 30.0;
        }
        let streak = grid.streak_before(op, slot.day, task);
        if streak >= rules.run_limit(heavy, model.soft[task]) {
            score -= 80.0;
        }
    }

    if rules.prioritize_flex_for_exceptions && is_exceptions(&model.tasks[task].name) {
        score += if operator.kind == OperatorType::Flex {
            20.0
        } else {
            -10.0
        };
    }

    if rules.fair_distribution && heavy {
        let mine = grid.heavy_count(op) as f64;
        let mean = grid.mean_heavy();
        if mine > mean {
            score -= 15.0;
        } else if mine < mean {
            score += 10.0;
        }
    }

    if rules.balance_workload {
        let mine = grid.total(op) as f64;
        let mean = grid.mean_total();
        if mine > mean {
            score -= 10.0;
        } else if mine < mean {
            score += 5.0;
        }
    }

    if rules.respect_preferred_tasks && operator.prefers(&model.tasks[task].name) {
        score += 100.0;
    }

    if slot.is_typed()
        && slot
            .demands
            .iter()
            .any(|d| d.count > 0 && d.kind == Some(operator.kind))
    {
        score += 15.0;
    }

    Some(score)
}

/// Fill `slots` greedily. The grid and domains are updated in place;
/// pinned and forced seats must already be applied to both.
pub(crate) fn fill(
    model: &Model<'_>,
    domains: &mut DomainMap,
    grid: &mut Grid,
    mut slots: Vec<SlotDemand>,
    rng: &mut StdRng,
) -> GreedyOutcome {
    let mut placed = Vec::new();
    let mut dead_ends = Vec::new();

    while !slots.is_empty() {
        order::prioritize(model, domains, grid, &mut slots);
        let mut slot = slots.remove(0);

        let jitter = model.rules.randomization_factor.max(0.0);
        let mut scored: Vec<(usize, f64)> = candidates(model, domains, grid, &slot)
            .into_iter()
            .filter_map(|op| {
                base_score(model, grid, &slot, op).map(|s| {
                    let noise = if jitter > 0.0 {
                        rng.gen_range(0.0..jitter)
                    } else {
                        0.0
                    };
                    (op, s + noise)
                })
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        for (op, _) in scored.into_iter().take(slot.required as usize) {
            grid.assign(op, slot.day, slot.task, model.heavy[slot.task]);
            domains.clear(op, slot.day);
            consume_demand(&mut slot.demands, model.ops[op].kind);
            slot.required -= 1;
            placed.push((op, slot.day, slot.task));

            // Forward check: drop any slot that the seat just taken has
            // made unfillable.
            let mut i = 0;
            while i < slots.len() {
                let capable = candidates(model, domains, grid, &slots[i]).len() as u32;
                if capable < slots[i].required {
                    dead_ends.push(slots.remove(i));
                } else {
                    i += 1;
                }
            }
        }

        if slot.required > 0 {
            dead_ends.push(slot);
        }
    }

    GreedyOutcome { placed, dead_ends }
}
