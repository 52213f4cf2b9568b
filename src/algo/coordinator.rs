//! Daily rotation of coordinators over the coordinator stations.
//!
//! A disjoint sub-problem: coordinators never compete with the rest of
//! the pool, so each day is a small permutation search. Nobody repeats
//! yesterday's station (relaxed only when no permutation passes), no two
//! coordinators share a station, and among the valid permutations the one
//! that spreads stations over the week best is taken.

use crate::algo::model::{DomainMap, Grid, Model};
use crate::algo::propagate::{SlotDemand, consume_demand};
use crate::data::OperatorType;

/// Rotate coordinators over the week. Seats taken here are recorded in
/// the grid and consumed from `slots`; domains are cleared for the
/// assigned cells so later forward checks see them as spent.
pub(crate) fn assign_week(
    model: &Model<'_>,
    domains: &mut DomainMap,
    grid: &mut Grid,
    slots: &mut Vec<SlotDemand>,
) -> Vec<(usize, usize, usize)> {
    let coords: Vec<usize> = (0..model.ops.len())
        .filter(|&op| model.ops[op].kind == OperatorType::Coordinator)
        .collect();
    let mut placed = Vec::new();
    if coords.is_empty() {
        return placed;
    }

    for day in 0..model.n_days() {
        let tasks: Vec<usize> = slots
            .iter()
            .filter(|s| {
                s.day == day
                    && s.required > 0
                    && model.coordinator[s.task]
                    && s.admits(OperatorType::Coordinator)
            })
            .map(|s| s.task)
            .collect();
        if tasks.is_empty() {
            continue;
        }

        let free: Vec<usize> = coords
            .iter()
            .copied()
            .filter(|&op| {
                !grid.is_assigned(op, day) && model.ops[op].is_available(model.days[day])
            })
            .collect();
        if free.is_empty() {
            continue;
        }

        let chosen = best_permutation(model, grid, day, &free, &tasks, true)
            .or_else(|| best_permutation(model, grid, day, &free, &tasks, false));
        let Some(pairs) = chosen else {
            continue;
        };

        for (op, task) in pairs {
            grid.assign(op, day, task, model.heavy[task]);
            domains.clear(op, day);
            if let Some(slot) = slots
                .iter_mut()
                .find(|s| s.day == day && s.task == task && s.required > 0)
            {
                consume_demand(&mut slot.demands, OperatorType::Coordinator);
                slot.required -= 1;
            }
            placed.push((op, day, task));
        }
    }

    slots.retain(|s| s.required > 0);
    placed
}

/// The assignment of `coords` to distinct `tasks` minimising the weekly
/// variety score (times each coordinator already did the chosen station).
/// With `rotate`, yesterday's station is off limits per coordinator.
fn best_permutation(
    model: &Model<'_>,
    grid: &Grid,
    day: usize,
    coords: &[usize],
    tasks: &[usize],
    rotate: bool,
) -> Option<Vec<(usize, usize)>> {
    struct Search<'s, 'm> {
        model: &'s Model<'m>,
        grid: &'s Grid,
        day: usize,
        coords: &'s [usize],
        tasks: &'s [usize],
        rotate: bool,
        target: usize,
        current: Vec<(usize, usize)>,
        best: Option<(u32, Vec<(usize, usize)>)>,
    }

    impl Search<'_, '_> {
        /// Times `op` already worked `task` this week.
        fn done(&self, op: usize, task: usize) -> u32 {
            (0..self.model.n_days())
                .filter(|&d| self.grid.task_at(op, d) == Some(task))
                .count() as u32
        }

        fn admissible(&self, op: usize, task: usize) -> bool {
            if !self.model.eligible(op, task) {
                return false;
            }
            if self.rotate
                && self.day > 0
                && self.grid.task_at(op, self.day - 1) == Some(task)
            {
                return false;
            }
            true
        }

        fn dfs(&mut self, i: usize, used: u32) {
            if i == self.coords.len() {
                if self.current.len() == self.target {
                    let score: u32 = self
                        .current
                        .iter()
                        .map(|&(op, task)| self.done(op, task))
                        .sum();
                    if self.best.as_ref().is_none_or(|(b, _)| score < *b) {
                        self.best = Some((score, self.current.clone()));
                    }
                }
                return;
            }

            let op = self.coords[i];
            for (ti, &task) in self.tasks.iter().enumerate() {
                if used & (1 << ti) != 0 || !self.admissible(op, task) {
                    continue;
                }
                self.current.push((op, task));
                self.dfs(i + 1, used | (1 << ti));
                self.current.pop();
            }

            // Leaving this coordinator out is only allowed when there are
            // more coordinators left than stations.
            let stations_left = self.tasks.len() - used.count_ones() as usize;
            let coords_left = self.coords.len() - i;
            if stations_left < coords_left {
                self.dfs(i + 1, used);
            }
        }
    }

    let mut search = Search {
        model,
        grid,
        day,
        coords,
        tasks,
        rotate,
        target: coords.len().min(tasks.len()),
        current: Vec::new(),
        best: None,
    };
    search.dfs(0, 0);
    search.best.map(|(_, pairs)| pairs)
}
