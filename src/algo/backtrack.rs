//! Depth-first completion search for the slots the greedy pass left open.
//!
//! Variables are slots picked MRV-first, values are candidate operators
//! with type-requirement matches tried first, and every tentative seat is
//! forward-checked against all other open slots. Domain edits are undone
//! through saved cell words, so a failed branch leaves no trace.

use crate::algo::model::{DomainMap, Grid, Model};
use crate::algo::order;
use crate::algo::propagate::{SlotDemand, consume_demand};
use std::time::{Duration, Instant};

/// Hard stop limits for one search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    /// Give up after this many undone seats.
    pub max_backtracks: u32,
    /// Give up after this much wall-clock time.
    pub time: Duration,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_backtracks: 8_000,
            time: Duration::from_millis(4_000),
        }
    }
}

/// How a completion search ended.
#[derive(Debug)]
pub(crate) enum Completion {
    /// Every open seat was filled; the grid and domains hold the
    /// solution, and these are the seats the search added.
    Solved(Vec<(usize, usize, usize)>),
    /// The whole tree was searched; no completion exists from this state.
    Exhausted,
    /// A budget tripped before the tree was exhausted.
    OutOfBudget(&'static str),
}

/// Search for an assignment of all seats in `slots` on top of the current
/// grid and domains. On failure both are restored to their entry state.
pub(crate) fn complete(
    model: &Model<'_>,
    domains: &mut DomainMap,
    grid: &mut Grid,
    slots: &[SlotDemand],
    budget: Budget,
) -> Completion {
    let mut searcher = Searcher {
        model,
        domains,
        grid,
        open: slots.to_vec(),
        placed: Vec::new(),
        backtracks: 0,
        deadline: Instant::now() + budget.time,
        max_backtracks: budget.max_backtracks,
        stopped: None,
    };
    if searcher.search() {
        Completion::Solved(searcher.placed)
    } else if let Some(reason) = searcher.stopped {
        Completion::OutOfBudget(reason)
    } else {
        Completion::Exhausted
    }
}

struct Searcher<'a, 'm> {
    model: &'a Model<'m>,
    domains: &'a mut DomainMap,
    grid: &'a mut Grid,
    open: Vec<SlotDemand>,
    placed: Vec<(usize, usize, usize)>,
    backtracks: u32,
    deadline: Instant,
    max_backtracks: u32,
    stopped: Option<&'static str>,
}

impl Searcher<'_, '_> {
    /// MRV variable selection: the open slot with the fewest candidates.
    /// A slot at zero kills the branch outright; at one it is taken
    /// without finishing the scan.
    fn select(&self) -> Option<(usize, Vec<usize>)> {
        let mut best: Option<(usize, Vec<usize>)> = None;
        for (si, slot) in self.open.iter().enumerate() {
            if slot.required == 0 {
                continue;
            }
            let eligible = order::candidates(self.model, self.domains, self.grid, slot);
            let count = eligible.len();
            if count <= 1 {
                return Some((si, eligible));
            }
            if best.as_ref().is_none_or(|(_, b)| count < b.len()) {
                best = Some((si, eligible));
            }
        }
        best
    }

    fn solved(&self) -> bool {
        self.open.iter().all(|s| s.required == 0)
    }

    fn forward_ok(&self, skip: usize) -> bool {
        self.open.iter().enumerate().all(|(si, slot)| {
            si == skip
                || slot.required == 0
                || order::candidates(self.model, self.domains, self.grid, slot).len() as u32
                    >= slot.required
        })
    }

    fn search(&mut self) -> bool {
        if self.solved() {
            return true;
        }
        if Instant::now() >= self.deadline {
            self.stopped = Some("time budget exceeded");
            return false;
        }
        if self.backtracks >= self.max_backtracks {
            self.stopped = Some("backtrack budget exceeded");
            return false;
        }

        let Some((si, mut eligible)) = self.select() else {
            return false;
        };
        if eligible.is_empty() {
            return false;
        }

        // Type-requirement matches first, stable within the groups.
        let slot = self.open[si].clone();
        eligible.sort_by_key(|&op| {
            let matches = slot
                .demands
                .iter()
                .any(|d| d.count > 0 && d.kind == Some(self.model.ops[op].kind));
            !matches
        });

        let (day, task) = (slot.day, slot.task);
        for op in eligible {
            let saved = self.domains.get(op, day);
            self.grid.assign(op, day, task, self.model.heavy[task]);
            self.domains.clear(op, day);
            let demand_ix = consume_demand(&mut self.open[si].demands, self.model.ops[op].kind);
            self.open[si].required -= 1;
            self.placed.push((op, day, task));

            if self.forward_ok(si) && self.search() {
                return true;
            }

            self.placed.pop();
            self.open[si].required += 1;
            if let Some(ix) = demand_ix {
                self.open[si].demands[ix].count += 1;
            }
            self.domains.set(op, day, saved);
            self.grid.unassign(op, day, self.model.heavy[task]);

            if self.stopped.is_some() {
                return false;
            }
            self.backtracks += 1;
        }
        false
    }
}
