//! Fill-order ranking of open slots.
//!
//! The key is (tier, constrainedness, seat count, day, station name):
//! critical stations first, then whichever slot has the fewest candidates
//! per open seat. Seat count, day and name only break ties, so the order
//! is fully deterministic.

use crate::algo::model::{DomainMap, Grid, Model};
use crate::algo::propagate::SlotDemand;

/// Candidates for a slot under the current search state: the station is
/// still in their day-domain, they hold no cell that day, and their type
/// is admitted by the residual demand.
pub(crate) fn candidates(
    model: &Model<'_>,
    domains: &DomainMap,
    grid: &Grid,
    slot: &SlotDemand,
) -> Vec<usize> {
    (0..model.ops.len())
        .filter(|&op| {
            !grid.is_assigned(op, slot.day)
                && domains.contains(op, slot.day, slot.task)
                && (!slot.is_typed() || slot.admits(model.ops[op].kind))
        })
        .collect()
}

/// How many candidates a slot has per open seat. Below `1.0` the slot
/// cannot be filled from the current state.
pub(crate) fn constrainedness(
    model: &Model<'_>,
    domains: &DomainMap,
    grid: &Grid,
    slot: &SlotDemand,
) -> f64 {
    candidates(model, domains, grid, slot).len() as f64 / slot.required.max(1) as f64
}

/// Sort open slots into fill order under the current state.
pub(crate) fn prioritize(
    model: &Model<'_>,
    domains: &DomainMap,
    grid: &Grid,
    slots: &mut [SlotDemand],
) {
    slots.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| {
                constrainedness(model, domains, grid, a)
                    .total_cmp(&constrainedness(model, domains, grid, b))
            })
            .then_with(|| b.required.cmp(&a.required))
            .then_with(|| a.day.cmp(&b.day))
            .then_with(|| model.tasks[a.task].name.cmp(&model.tasks[b.task].name))
    });
}
