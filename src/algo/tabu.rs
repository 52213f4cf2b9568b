//! Tabu refinement over the same swap neighbourhood as the hill climber.
//!
//! Each round takes the best neighbour that is not tabu, remembering the
//! move in a bounded FIFO so the search cannot immediately walk back. A
//! tabu move is still allowed when it beats the best roster seen so far
//! (aspiration). Stops on the iteration cap, a stagnation run, or the
//! time budget, and returns the best roster visited.

use crate::algo::model::Model;
use crate::algo::optimize::{Cell, apply_swap, penalty, swap_valid};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Stop conditions and memory size for one refinement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TabuLimits {
    /// Hard cap on rounds.
    pub iters: usize,
    /// Stop after this many rounds without a new best.
    pub stagnation: usize,
    /// FIFO memory length.
    pub memory: usize,
    /// Wall-clock budget.
    pub time: Duration,
}

impl Default for TabuLimits {
    fn default() -> Self {
        Self {
            iters: 100,
            stagnation: 20,
            memory: 20,
            time: Duration::from_millis(1_000),
        }
    }
}

/// Symmetric identity of a swap: the two (day, operator, task) triples,
/// sorted, taken before the move is applied.
type MoveKey = ((usize, usize, usize), (usize, usize, usize));

fn move_key(cells: &[Cell], a: usize, b: usize) -> MoveKey {
    let tri = |i: usize| {
        let (op, day, task) = cells[i];
        (day, op, task)
    };
    let (ka, kb) = (tri(a), tri(b));
    if ka <= kb { (ka, kb) } else { (kb, ka) }
}

/// Refine `cells` in place; returns the penalty of the best roster found.
pub(crate) fn refine(
    model: &Model<'_>,
    cells: &mut Vec<Cell>,
    movable: &[bool],
    limits: TabuLimits,
) -> f64 {
    let deadline = Instant::now() + limits.time;
    let mut tabu: VecDeque<MoveKey> = VecDeque::with_capacity(limits.memory);

    let mut current = penalty(model, cells);
    let mut best_cells = cells.clone();
    let mut best = current;
    let mut stagnant = 0usize;

    for _ in 0..limits.iters {
        if stagnant >= limits.stagnation || Instant::now() >= deadline {
            break;
        }

        // Best admissible neighbour: non-tabu, or tabu but beating the
        // global best (aspiration).
        let mut chosen: Option<(f64, usize, usize)> = None;
        for a in 0..cells.len() {
            for b in a + 1..cells.len() {
                if !swap_valid(model, cells, movable, a, b) {
                    continue;
                }
                let key = move_key(cells, a, b);
                apply_swap(cells, a, b);
                let p = penalty(model, cells);
                apply_swap(cells, a, b);

                if tabu.contains(&key) && p >= best {
                    continue;
                }
                if chosen.as_ref().is_none_or(|(cp, _, _)| p < *cp) {
                    chosen = Some((p, a, b));
                }
            }
        }

        let Some((p, a, b)) = chosen else {
            break;
        };
        let key = move_key(cells, a, b);
        apply_swap(cells, a, b);
        current = p;

        tabu.push_back(key);
        while tabu.len() > limits.memory {
            tabu.pop_front();
        }

        if current < best {
            best = current;
            best_cells.clone_from(cells);
            stagnant = 0;
        } else {
            stagnant += 1;
        }
    }

    *cells = best_cells;
    best
}
