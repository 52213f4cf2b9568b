//! Constraint propagation: domains, feasibility proof, forced assignments.
//!
//! Runs before any search. Either proves the request unsatisfiable and
//! says why, or hands the downstream passes pruned domains, the residual
//! slot list, and every assignment that is already decided.

use crate::algo::model::{DomainMap, Model, TaskSet};
use crate::data::{DemandList, OperatorType, Tier, Warning};
use smallvec::SmallVec;

/// A (day, station) demand still waiting to be filled.
#[derive(Debug, Clone)]
pub(crate) struct SlotDemand {
    /// Day index into the model's day list.
    pub day: usize,
    /// Task index into the model's task list.
    pub task: usize,
    /// Seats still open.
    pub required: u32,
    /// Residual demand entries; counts sum to `required`.
    pub demands: DemandList,
    /// Fill-order criticality.
    pub tier: Tier,
}

impl SlotDemand {
    /// Demand for one concrete operator type.
    pub fn typed_demand(&self, kind: OperatorType) -> u32 {
        self.demands
            .iter()
            .filter(|d| d.kind == Some(kind))
            .map(|d| d.count)
            .sum()
    }

    /// Whether any entry constrains operator types.
    pub fn is_typed(&self) -> bool {
        self.demands.iter().any(|d| d.kind.is_some() && d.count > 0)
    }

    /// Whether `kind` may still fill a seat here.
    pub fn admits(&self, kind: OperatorType) -> bool {
        crate::data::requirement::demand_admits(&self.demands, kind)
    }
}

/// Outcome of propagation.
pub(crate) enum Propagation {
    /// The request may be satisfiable; here is the pruned state.
    Feasible(Propagated),
    /// Proven unsatisfiable; one warning per independent reason.
    Infeasible(Vec<Warning>),
}

/// Pruned state handed to the search passes.
pub(crate) struct Propagated {
    /// Per-(operator, day) admissible tasks. Forced cells are collapsed
    /// to singletons.
    pub domains: DomainMap,
    /// Assignments every feasible roster must contain, as
    /// (operator, day, task) index triples.
    pub forced: Vec<(usize, usize, usize)>,
    /// Slots still open after fixed and forced seats are taken out.
    pub slots: Vec<SlotDemand>,
}

/// Decrement the demand entry that best matches `kind`: a concrete match
/// first, an untyped entry second, any non-empty entry as a last resort.
/// Returns the index decremented so callers can undo.
pub(crate) fn consume_demand(demands: &mut DemandList, kind: OperatorType) -> Option<usize> {
    let ix = demands
        .iter()
        .position(|d| d.count > 0 && d.kind == Some(kind))
        .or_else(|| demands.iter().position(|d| d.count > 0 && d.kind.is_none()))
        .or_else(|| demands.iter().position(|d| d.count > 0))?;
    demands[ix].count -= 1;
    Some(ix)
}

/// Build domains, prove or disprove feasibility, and extract forced
/// assignments.
pub(crate) fn propagate(model: &Model<'_>) -> Propagation {
    let n_ops = model.ops.len();
    let n_days = model.n_days();
    let n_tasks = model.tasks.len();

    // Domains. A fixed cell collapses to its pinned task; an unavailable
    // day stays empty; everything else follows the hard eligibility
    // predicate.
    let mut domains = DomainMap::new(n_ops, n_days);
    for op in 0..n_ops {
        for day in 0..n_days {
            if let Some(task) = model.fixed_task(op, day) {
                domains.set(op, day, TaskSet::singleton(task));
                continue;
            }
            if !model.ops[op].is_available(model.days[day]) {
                continue;
            }
            let mut admissible = TaskSet::empty();
            for task in 0..n_tasks {
                if model.eligible(op, task) {
                    admissible.insert(task);
                }
            }
            domains.set(op, day, admissible);
        }
    }

    // Residual slots: demanded seats minus the fixed assignees already
    // sitting on them.
    let mut slots = Vec::new();
    for task in 0..n_tasks {
        for day in 0..n_days {
            let demands = model.demands(task, day);
            if demands.iter().map(|d| d.count).sum::<u32>() == 0 {
                continue;
            }
            let mut residual: DemandList = SmallVec::from_slice(demands);
            for op in 0..n_ops {
                if model.fixed_task(op, day) == Some(task) {
                    consume_demand(&mut residual, model.ops[op].kind);
                }
            }
            let required: u32 = residual.iter().map(|d| d.count).sum();
            if required == 0 {
                continue;
            }
            slots.push(SlotDemand {
                day,
                task,
                required,
                demands: residual,
                tier: model.tasks[task].tier(),
            });
        }
    }

    let reasons = feasibility_reasons(model, &domains, &slots);
    if !reasons.is_empty() {
        return Propagation::Infeasible(reasons);
    }

    let forced = detect_forced(model, &domains, &mut slots);
    for &(op, day, task) in &forced {
        domains.set(op, day, TaskSet::singleton(task));
    }
    slots.retain(|s| s.required > 0);

    Propagation::Feasible(Propagated {
        domains,
        forced,
        slots,
    })
}

/// Operators who could take `(task, day)` and are not pinned elsewhere.
fn capable_ops(model: &Model<'_>, domains: &DomainMap, task: usize, day: usize) -> Vec<usize> {
    (0..model.ops.len())
        .filter(|&op| model.fixed_task(op, day).is_none() && domains.contains(op, day, task))
        .collect()
}

fn feasibility_reasons(
    model: &Model<'_>,
    domains: &DomainMap,
    slots: &[SlotDemand],
) -> Vec<Warning> {
    let mut reasons = Vec::new();

    for slot in slots {
        let capable = capable_ops(model, domains, slot.task, slot.day);
        let names = |ops: &[usize]| -> Vec<String> {
            ops.iter().map(|&op| model.ops[op].name.clone()).collect()
        };
        let understaffed = |capable: &[usize]| Warning::Understaffed {
            day: model.days[slot.day],
            task: model.tasks[slot.task].name.clone(),
            required: slot.required,
            assigned: 0,
            capable: names(capable),
        };

        if (capable.len() as u32) < slot.required {
            reasons.push(understaffed(&capable));
            continue;
        }

        if slot.is_typed() {
            let count_of = |kind: OperatorType| -> u32 {
                capable
                    .iter()
                    .filter(|&&op| model.ops[op].kind == kind)
                    .count() as u32
            };
            let regular_capable = count_of(OperatorType::Regular);
            let regular_demand = slot.typed_demand(OperatorType::Regular);
            let flex_shortfall = slot
                .typed_demand(OperatorType::Flex)
                .saturating_sub(count_of(OperatorType::Flex));
            let coordinator_short =
                slot.typed_demand(OperatorType::Coordinator) > count_of(OperatorType::Coordinator);

            // Regulars may stand in for missing flex seats, never the
            // other way around.
            if regular_demand > regular_capable
                || flex_shortfall > regular_capable.saturating_sub(regular_demand)
                || coordinator_short
            {
                reasons.push(understaffed(&capable));
            }
        }
    }

    // Each operator fills at most one seat a day, so a day's total demand
    // is bounded by the head count.
    for day in 0..model.n_days() {
        let required: u32 = slots.iter().filter(|s| s.day == day).map(|s| s.required).sum();
        let free: Vec<usize> = (0..model.ops.len())
            .filter(|&op| {
                model.fixed_task(op, day).is_none()
                    && model.ops[op].is_available(model.days[day])
            })
            .collect();
        if required > free.len() as u32 {
            reasons.push(Warning::Understaffed {
                day: model.days[day],
                task: "all stations".to_string(),
                required,
                assigned: 0,
                capable: free.iter().map(|&op| model.ops[op].name.clone()).collect(),
            });
        }
    }

    reasons
}

/// Find assignments that appear in every feasible roster.
///
/// Slots are visited most-constrained first. Inside one slot, a concrete
/// type whose capable pool exactly covers its demand forces that whole
/// pool; afterwards a pool matching the remaining requirement forces the
/// rest. A forced operator leaves the capable pools of every later slot
/// on the same day.
fn detect_forced(
    model: &Model<'_>,
    domains: &DomainMap,
    slots: &mut [SlotDemand],
) -> Vec<(usize, usize, usize)> {
    let mut order: Vec<usize> = (0..slots.len()).collect();
    order.sort_by(|&a, &b| {
        let constrainedness = |s: &SlotDemand| {
            let capable = capable_ops(model, domains, s.task, s.day).len() as f64;
            capable / s.required.max(1) as f64
        };
        slots[a]
            .tier
            .cmp(&slots[b].tier)
            .then_with(|| constrainedness(&slots[a]).total_cmp(&constrainedness(&slots[b])))
            .then(a.cmp(&b))
    });

    fn force(
        model: &Model<'_>,
        forced: &mut Vec<(usize, usize, usize)>,
        taken: &mut [bool],
        slot: &mut SlotDemand,
        op: usize,
    ) {
        forced.push((op, slot.day, slot.task));
        taken[model.cell(op, slot.day)] = true;
        consume_demand(&mut slot.demands, model.ops[op].kind);
        slot.required -= 1;
    }

    let mut forced = Vec::new();
    let mut taken = vec![false; model.ops.len() * model.n_days()];

    for &si in &order {
        let slot = &mut slots[si];
        let mut remaining: Vec<usize> = capable_ops(model, domains, slot.task, slot.day)
            .into_iter()
            .filter(|&op| !taken[model.cell(op, slot.day)])
            .collect();

        for kind in OperatorType::ALL {
            let demand = slot.typed_demand(kind);
            if demand == 0 {
                continue;
            }
            let of_kind: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&op| model.ops[op].kind == kind)
                .collect();
            if of_kind.len() as u32 == demand {
                for op in of_kind {
                    force(model, &mut forced, &mut taken, slot, op);
                    remaining.retain(|&o| o != op);
                }
            }
        }

        if slot.required > 0 && remaining.len() as u32 == slot.required {
            for op in remaining {
                force(model, &mut forced, &mut taken, slot, op);
            }
        }
    }

    forced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ScheduleRequest;
    use crate::{demands, operators, stations};

    fn feasible(request: &ScheduleRequest) -> Propagated {
        let model = Model::build(request);
        match propagate(&model) {
            Propagation::Feasible(p) => p,
            Propagation::Infeasible(reasons) => {
                panic!("expected feasible, got reasons: {reasons:?}")
            }
        }
    }

    #[test]
    fn test_unique_candidates_are_forced_every_day() {
        // A is the only one who can take T1, B the only one for T2.
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["Y"],
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
        let Propagation::Feasible(p) = propagate(&model) else {
            panic!("two disjoint singletons are trivially feasible");
        };
        assert_eq!(p.forced.len(), 10, "both operators forced on all five days");
        assert!(p.slots.is_empty(), "forcing should exhaust every slot");
        // A (index 0) always lands on T1 (index 0), B on T2.
        for &(op, _, task) in &p.forced {
            assert_eq!(op, task, "each operator is pinned to their only station");
        }
    }

    #[test]
    fn test_understaffed_reason_names_the_capable() {
        let request = ScheduleRequest {
            operators: operators! { 1: "A" (Regular) ["X"] },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Any x 2 },
            ..Default::default()
        };
        let model = Model::build(&request);
        let Propagation::Infeasible(reasons) = propagate(&model) else {
            panic!("two seats with one candidate must be infeasible");
        };
        assert!(
            reasons.iter().any(|r| matches!(
                r,
                Warning::Understaffed { task, required: 2, capable, .. }
                    if task == "T1" && capable == &vec!["A".to_string()]
            )),
            "the reason should name T1 and list A: {reasons:?}"
        );
    }

    #[test]
    fn test_regular_covers_flex_shortfall() {
        // One flex seat, no flex operators, but a spare regular.
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["X"],
            },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Regular x 1, Flex x 1 },
            ..Default::default()
        };
        feasible(&request);
    }

    #[test]
    fn test_flex_cannot_cover_regular_shortfall() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Flex) ["X"],
                2: "B" (Flex) ["X"],
            },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Regular x 1, Flex x 1 },
            ..Default::default()
        };
        let model = Model::build(&request);
        assert!(
            matches!(propagate(&model), Propagation::Infeasible(_)),
            "a regular seat must not fall back on flex operators"
        );
    }

    #[test]
    fn test_day_capacity_bound() {
        // Two stations want a seat each, only one operator exists.
        let request = ScheduleRequest {
            operators: operators! { 1: "A" (Regular) ["X", "Y"] },
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
        let Propagation::Infeasible(reasons) = propagate(&model) else {
            panic!("one operator cannot hold two seats a day");
        };
        assert!(
            reasons
                .iter()
                .any(|r| matches!(r, Warning::Understaffed { task, .. } if task == "all stations")),
            "the per-day bound should have its own reason: {reasons:?}"
        );
    }

    #[test]
    fn test_pinned_cell_collapses_domain_and_reduces_slot() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X", "Y"],
                2: "B" (Regular) ["X", "Y"],
            },
            tasks: stations! {
                10: "T1" needs "X",
                11: "T2" needs "Y",
            },
            requirements: demands! {
                10 => Any x 1;
                11 => Any x 1
            },
            current: vec![crate::data::CurrentAssignment {
                operator: crate::data::OperatorId(1),
                day: chrono::Weekday::Mon,
                task: crate::data::TaskId(10),
                locked: false,
                pinned: true,
            }],
            ..Default::default()
        };
        let p = feasible(&request);
        assert_eq!(
            p.domains.get(0, 0).sole(),
            Some(0),
            "the pinned cell should collapse to its pinned station"
        );
        // On Monday only T2 remains open, and only B can take it.
        assert!(
            p.forced.contains(&(1, 0, 1)),
            "B is the unique candidate left for T2 on Monday: {:?}",
            p.forced
        );
    }
}
