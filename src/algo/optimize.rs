//! Soft-quality scoring and single-swap hill climbing.
//!
//! The optimiser never changes which seats are filled: it only exchanges
//! the stations of two operators within one day, accepting a swap when it
//! strictly lowers the total penalty. Pinned and forced seats never move.

use crate::algo::model::Model;
use crate::data::OperatorType;
use crate::data::requirement::demand_admits;
use crate::data::task::is_exceptions;
use rustc_hash::FxHashMap;

/// Assignment triple the optimiser shuffles: (operator, day, task), all
/// as model indices.
pub(crate) type Cell = (usize, usize, usize);

/// Total soft penalty of a full candidate roster. Lower is better.
///
/// Flex operators are exempt from every term except the Exceptions
/// steering bonus.
pub(crate) fn penalty(model: &Model<'_>, cells: &[Cell]) -> f64 {
    let rules = model.rules;
    let n_ops = model.ops.len();
    let n_days = model.n_days();

    let mut by_cell: Vec<Option<usize>> = vec![None; n_ops * n_days];
    let mut totals = vec![0u32; n_ops];
    let mut heavy_counts = vec![0u32; n_ops];
    let mut skill_use: Vec<FxHashMap<&str, u32>> = vec![FxHashMap::default(); n_ops];

    for &(op, day, task) in cells {
        by_cell[op * n_days + day] = Some(task);
        totals[op] += 1;
        if model.heavy[task] {
            heavy_counts[op] += 1;
        }
        *skill_use[op]
            .entry(model.tasks[task].required_skill.as_str())
            .or_insert(0) += 1;
    }

    let mean = |counts: &[u32]| {
        if counts.is_empty() {
            0.0
        } else {
            counts.iter().sum::<u32>() as f64 / counts.len() as f64
        }
    };
    let mean_total = mean(&totals);
    let mean_heavy = mean(&heavy_counts);

    let task_at = |op: usize, day: usize| by_cell[op * n_days + day];
    let mut total = 0.0;

    for &(op, day, task) in cells {
        let operator = model.ops[op];
        let heavy = model.heavy[task];

        let exceptions_term = if rules.prioritize_flex_for_exceptions
            && is_exceptions(&model.tasks[task].name)
        {
            if operator.kind == OperatorType::Flex {
                -20.0
            } else {
                10.0
            }
        } else {
            0.0
        };
        total += exceptions_term;

        if operator.kind == OperatorType::Flex {
            continue;
        }

        if heavy {
            let mut streak = 0u32;
            for d in (0..day).rev() {
                if task_at(op, d) == Some(task) {
                    streak += 1;
                } else {
                    break;
                }
            }
            if streak > 0 {
                total += if streak >= rules.max_consecutive_days_on_same_task {
                    50.0
                } else {
                    streak as f64 * 8.0
                };
            }

            if !rules.allow_consecutive_heavy_shifts
                && day > 0
                && task_at(op, day - 1).is_some_and(|t| model.heavy[t])
            {
                total += 30.0;
            }

            if rules.fair_distribution {
                let mine = heavy_counts[op] as f64;
                if mine > mean_heavy + 1.0 {
                    total += 15.0;
                } else if mine < mean_heavy - 1.0 {
                    total -= 10.0;
                }
            }
        }

        if rules.respect_preferred_tasks
            && operator.kind == OperatorType::Regular
            && operator.prefers(&model.tasks[task].name)
        {
            total -= 15.0;
        }

        if rules.balance_workload {
            let mine = totals[op] as f64;
            if mine > mean_total + 1.0 {
                total += 10.0;
            } else if mine < mean_total - 1.0 {
                total -= 5.0;
            }
        }

        if rules.prioritize_skill_variety {
            let uses = skill_use[op]
                .get(model.tasks[task].required_skill.as_str())
                .copied()
                .unwrap_or(0);
            if uses <= 1 {
                total -= 15.0;
            } else if uses >= 3 {
                total += 8.0;
            }
        }
    }

    total
}

/// Whether exchanging the stations of `cells[a]` and `cells[b]` is a
/// legal move: same day, two movable operators, each holding the other's
/// required skill, and each admitted by the other station's demand types.
pub(crate) fn swap_valid(model: &Model<'_>, cells: &[Cell], movable: &[bool], a: usize, b: usize) -> bool {
    let (op_a, day_a, task_a) = cells[a];
    let (op_b, day_b, task_b) = cells[b];
    if day_a != day_b || op_a == op_b || task_a == task_b {
        return false;
    }
    if !movable[a] || !movable[b] {
        return false;
    }

    let takes = |op: usize, task: usize, day: usize| {
        if !model.partition_ok(op, task) || !model.skill_ok(op, task) {
            return false;
        }
        let demands = model.demands(task, day);
        demands.iter().all(|d| d.kind.is_none() || d.count == 0)
            || demand_admits(demands, model.ops[op].kind)
    };
    takes(op_a, task_b, day_a) && takes(op_b, task_a, day_a)
}

/// Exchange the stations of two cells.
pub(crate) fn apply_swap(cells: &mut [Cell], a: usize, b: usize) {
    let (task_a, task_b) = (cells[a].2, cells[b].2);
    cells[a].2 = task_b;
    cells[b].2 = task_a;
}

/// Hill climbing over single-day swaps: apply the best strictly-improving
/// swap each round, until none exists or the iteration cap is reached.
/// Returns the final penalty.
pub(crate) fn hill_climb(
    model: &Model<'_>,
    cells: &mut [Cell],
    movable: &[bool],
    max_iters: usize,
) -> f64 {
    let mut current = penalty(model, cells);

    for _ in 0..max_iters {
        let mut best: Option<(f64, usize, usize)> = None;
        for a in 0..cells.len() {
            for b in a + 1..cells.len() {
                if !swap_valid(model, cells, movable, a, b) {
                    continue;
                }
                apply_swap(cells, a, b);
                let p = penalty(model, cells);
                apply_swap(cells, a, b);
                if p < current && best.as_ref().is_none_or(|(bp, _, _)| p < *bp) {
                    best = Some((p, a, b));
                }
            }
        }

        match best {
            Some((p, a, b)) => {
                apply_swap(cells, a, b);
                current = p;
            }
            None => break,
        }
    }

    current
}

/// Iteration cap used by both local-search strategies.
pub(crate) const HILL_CLIMB_ITERS: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ScheduleRequest;
    use crate::{demands, operators, stations};

    fn fixture() -> ScheduleRequest {
        ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["H", "L"],
                2: "B" (Regular) ["H", "L"],
            },
            tasks: stations! {
                10: "Heavy lift" needs "H" heavy,
                11: "Light sort" needs "L",
            },
            requirements: demands! {
                10 => Any x 1;
                11 => Any x 1
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_consecutive_heavy_costs_more() {
        let request = fixture();
        let model = Model::build(&request);
        // A on the heavy station both days.
        let clustered = vec![(0, 0, 0), (1, 0, 1), (0, 1, 0), (1, 1, 1)];
        // Alternating.
        let spread = vec![(0, 0, 0), (1, 0, 1), (1, 1, 0), (0, 1, 1)];
        assert!(
            penalty(&model, &clustered) > penalty(&model, &spread),
            "back-to-back heavy days must cost more than alternating"
        );
    }

    #[test]
    fn test_flex_is_exempt_except_for_exceptions() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "F" (Flex) ["H", "S"],
            },
            tasks: stations! {
                10: "Heavy lift" needs "H" heavy,
                11: "Exceptions" needs "S",
            },
            requirements: demands! {
                10 => Any x 1;
                11 => Any x 1
            },
            ..Default::default()
        };
        let model = Model::build(&request);
        let heavy_streak = vec![(0, 0, 0), (0, 1, 0), (0, 2, 0)];
        assert_eq!(
            penalty(&model, &heavy_streak),
            0.0,
            "flex operators pay no streak or heavy penalties"
        );
        let on_exceptions = vec![(0, 0, 1)];
        assert_eq!(
            penalty(&model, &on_exceptions),
            -20.0,
            "the Exceptions bonus still applies to flex"
        );
    }

    #[test]
    fn test_swap_requires_mutual_skills() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X", "Y"],
                2: "B" (Regular) ["X"],
            },
            tasks: stations! {
                10: "T1" needs "X",
                11: "T2" needs "Y",
            },
            requirements: demands! {
                10 => Any x 1;
                11 => Any x 1
            },
            ..Default::default()
        };
        let model = Model::build(&request);
        let cells = vec![(0, 0, 1), (1, 0, 0)];
        let movable = vec![true, true];
        assert!(
            !swap_valid(&model, &cells, &movable, 0, 1),
            "B lacks Y, so the pair must not swap"
        );
    }

    #[test]
    fn test_hill_climbing_unclusters_heavy_days() {
        let request = fixture();
        let model = Model::build(&request);
        let mut cells = vec![(0, 0, 0), (1, 0, 1), (0, 1, 0), (1, 1, 1)];
        let movable = vec![true; cells.len()];
        let before = penalty(&model, &cells);
        let after = hill_climb(&model, &mut cells, &movable, HILL_CLIMB_ITERS);
        assert!(
            after < before,
            "the optimiser should break up A's heavy cluster ({before} -> {after})"
        );
        assert_ne!(
            cells[2].2, 0,
            "after optimisation A no longer holds the heavy station on day 1"
        );
    }

    #[test]
    fn test_fixed_cells_never_move() {
        let request = fixture();
        let model = Model::build(&request);
        let mut cells = vec![(0, 0, 0), (1, 0, 1), (0, 1, 0), (1, 1, 1)];
        let movable = vec![true, true, false, false];
        hill_climb(&model, &mut cells, &movable, HILL_CLIMB_ITERS);
        assert_eq!(cells[2], (0, 1, 0), "a pinned cell must come back untouched");
        assert_eq!(cells[3], (1, 1, 1));
    }
}
