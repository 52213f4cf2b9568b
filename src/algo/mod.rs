//! Generate a weekly roster from the provided requirements.
//!
//! # Prioritization
//!
//! In descending order of importance:
//!
//! 1. Never break a hard constraint (availability, skill under strict
//!    matching, the coordinator partition, one seat per operator per day)
//! 1. Preserve pinned and locked cells verbatim
//! 1. Fill every demanded seat
//! 1. Maximize soft-preference quality (rotation, fairness, preferred
//!    stations, flex steering) within the time budget
//!
//! Two pipelines implement this. *Enhanced* propagates constraints,
//! applies forced assignments, fills seats greedily in MRV order with
//! forward checking, and falls back to backtracking on dead ends.
//! *Max-matching* runs a per-day Hopcroft–Karp matching over several
//! seeded attempts, polishes each with hill climbing and tabu search,
//! and returns the best attempt on the Pareto front.
//!
//! Either way the result is validated at the end and every problem a
//! planner should see comes back as a typed warning; the entry point
//! never fails.

pub(crate) mod backtrack;
pub(crate) mod coordinator;
pub(crate) mod greedy;
pub(crate) mod matching;
pub(crate) mod model;
pub(crate) mod optimize;
pub(crate) mod order;
pub mod pareto;
pub(crate) mod propagate;
pub(crate) mod tabu;
pub(crate) mod validate;

pub use pareto::{Objectives, diversify, pareto_front};

use crate::algo::backtrack::{Budget, Completion};
use crate::algo::model::{Grid, Model};
use crate::algo::optimize::{Cell, HILL_CLIMB_ITERS};
use crate::algo::propagate::{Propagated, Propagation, propagate};
use crate::algo::tabu::TabuLimits;
use crate::data::{Algorithm, Assignment, ScheduleRequest, ScheduleResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};

/// How many seeded attempts the max-matching driver makes.
const MATCHING_ATTEMPTS: u64 = 5;

/// Wall-clock cap across all max-matching attempts.
const DRIVER_TIME: Duration = Duration::from_millis(3_000);

/// Produce a roster and its warnings for one request.
///
/// This is the sole entry point of the core. It owns no I/O and no
/// global state, and it never fails: structural infeasibility, budget
/// exhaustion and rule breaches all surface as warnings on the result.
pub fn schedule(request: &ScheduleRequest) -> ScheduleResult {
    let model = Model::build(request);
    match request.rules.algorithm {
        Algorithm::Enhanced => enhanced(&model),
        Algorithm::MaxMatching => max_matching(request, &model),
    }
}

/// Seed the grid with the request's pinned cells and the propagator's
/// forced assignments.
fn seed_grid(model: &Model<'_>, propagated: &Propagated) -> Grid {
    let mut grid = Grid::new(model.ops.len(), model.n_days());
    for op in 0..model.ops.len() {
        for day in 0..model.n_days() {
            if let Some(task) = model.fixed_task(op, day) {
                grid.assign(op, day, task, model.heavy[task]);
            }
        }
    }
    for &(op, day, task) in &propagated.forced {
        grid.assign(op, day, task, model.heavy[task]);
    }
    grid
}

fn finish(model: &Model<'_>, assignments: Vec<Assignment>) -> ScheduleResult {
    let warnings = validate::validate(model, &assignments);
    ScheduleResult {
        assignments,
        warnings,
    }
}

/// Propagation → forced application → MRV greedy → backtracking fallback.
fn enhanced(model: &Model<'_>) -> ScheduleResult {
    let propagated = match propagate(model) {
        Propagation::Infeasible(warnings) => {
            return ScheduleResult {
                assignments: Vec::new(),
                warnings,
            };
        }
        Propagation::Feasible(p) => p,
    };

    let mut domains = propagated.domains.clone();
    let mut grid = seed_grid(model, &propagated);
    let mut slots = propagated.slots.clone();

    if model.rules.auto_assign_coordinators {
        coordinator::assign_week(model, &mut domains, &mut grid, &mut slots);
    }

    let mut rng = StdRng::seed_from_u64(model.rules.seed());
    let outcome = greedy::fill(model, &mut domains, &mut grid, slots, &mut rng);

    if !outcome.dead_ends.is_empty() {
        match backtrack::complete(model, &mut domains, &mut grid, &outcome.dead_ends, Budget::default())
        {
            Completion::Solved(_) | Completion::OutOfBudget(_) => {}
            Completion::Exhausted => {
                // The greedy pass painted itself into a corner: no
                // completion keeps its seats. Retry the whole residual
                // problem from the propagated state, where only pinned,
                // forced and rotation seats are committed.
                if let Some(redone) = solve_from_propagated(model, &propagated) {
                    grid = redone;
                }
            }
        }
    }

    finish(model, grid.to_assignments(model))
}

/// Backtracking over every open seat, starting from pinned + forced +
/// coordinator-rotation state only.
fn solve_from_propagated(model: &Model<'_>, propagated: &Propagated) -> Option<Grid> {
    let mut domains = propagated.domains.clone();
    let mut grid = seed_grid(model, propagated);
    let mut slots = propagated.slots.clone();

    if model.rules.auto_assign_coordinators {
        coordinator::assign_week(model, &mut domains, &mut grid, &mut slots);
    }

    match backtrack::complete(model, &mut domains, &mut grid, &slots, Budget::default()) {
        Completion::Solved(_) => Some(grid),
        Completion::Exhausted | Completion::OutOfBudget(_) => None,
    }
}

/// One max-matching attempt, already locally optimised.
struct Attempt {
    unfilled: u32,
    penalty: f64,
    assignments: Vec<Assignment>,
    objectives: Objectives,
}

/// Feasibility check → coordinator rotation → per-day Hopcroft–Karp →
/// hill climbing → tabu refinement, over several seeds; the best attempt
/// on the Pareto front wins.
fn max_matching(request: &ScheduleRequest, model: &Model<'_>) -> ScheduleResult {
    let propagated = match propagate(model) {
        Propagation::Infeasible(warnings) => {
            return ScheduleResult {
                assignments: Vec::new(),
                warnings,
            };
        }
        Propagation::Feasible(p) => p,
    };

    let immovable: FxHashSet<(usize, usize)> = propagated
        .forced
        .iter()
        .map(|&(op, day, _)| (op, day))
        .collect();
    let total_required: u32 = propagated.slots.iter().map(|s| s.required).sum();

    let deadline = Instant::now() + DRIVER_TIME;
    let mut attempts: Vec<Attempt> = Vec::new();

    for attempt in 0..MATCHING_ATTEMPTS {
        if !attempts.is_empty() && Instant::now() >= deadline {
            break;
        }

        let mut rng = StdRng::seed_from_u64(model.rules.seed().wrapping_add(attempt));
        let mut domains = propagated.domains.clone();
        let mut grid = seed_grid(model, &propagated);
        let mut slots = propagated.slots.clone();

        let mut placed = 0u32;
        if model.rules.auto_assign_coordinators {
            placed += coordinator::assign_week(model, &mut domains, &mut grid, &mut slots).len()
                as u32;
        }

        for day in 0..model.n_days() {
            let seats = matching::seats_for_day(&slots, day);
            if seats.is_empty() {
                continue;
            }
            let mut free: Vec<usize> = (0..model.ops.len())
                .filter(|&op| !grid.is_assigned(op, day))
                .collect();
            free.shuffle(&mut rng);
            for (seat, op) in seats.iter().zip(matching::match_day(model, &seats, day, &free)) {
                if let Some(op) = op {
                    grid.assign(op, day, seat.task, model.heavy[seat.task]);
                    placed += 1;
                }
            }
        }

        // Local search over the movable cells.
        let mut cells: Vec<Cell> = Vec::new();
        for op in 0..model.ops.len() {
            for day in 0..model.n_days() {
                if let Some(task) = grid.task_at(op, day) {
                    cells.push((op, day, task));
                }
            }
        }
        let movable: Vec<bool> = cells
            .iter()
            .map(|&(op, day, _)| {
                model.fixed_task(op, day).is_none() && !immovable.contains(&(op, day))
            })
            .collect();
        optimize::hill_climb(model, &mut cells, &movable, HILL_CLIMB_ITERS);
        let penalty = tabu::refine(model, &mut cells, &movable, TabuLimits::default());

        let mut triples: Vec<(usize, usize, usize)> =
            cells.iter().map(|&(op, day, task)| (day, task, op)).collect();
        triples.sort_unstable();
        let assignments: Vec<Assignment> = triples
            .into_iter()
            .map(|(day, task, op)| model.assignment(op, day, task))
            .collect();

        let unfilled = total_required - placed;
        let objectives = Objectives::measure(
            &request.operators,
            &request.tasks,
            &request.rules,
            &assignments,
        );
        attempts.push(Attempt {
            unfilled,
            penalty,
            assignments,
            objectives,
        });

        if unfilled == 0 && penalty <= 0.0 {
            break;
        }
    }

    if attempts.is_empty() {
        return finish(model, Vec::new());
    }

    // Candidates on the Pareto front compete on coverage, then penalty.
    let vectors: Vec<Objectives> = attempts.iter().map(|a| a.objectives).collect();
    let front = pareto_front(&vectors);
    let winner = front
        .iter()
        .copied()
        .min_by(|&a, &b| {
            attempts[a]
                .unfilled
                .cmp(&attempts[b].unfilled)
                .then_with(|| attempts[a].penalty.total_cmp(&attempts[b].penalty))
                .then(a.cmp(&b))
        })
        .expect("every non-empty candidate set has a non-empty front");

    finish(model, attempts.swap_remove(winner).assignments)
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;
    use crate::data::{CurrentAssignment, OperatorId, Rules, TaskId, Warning};
    use crate::{demands, operators, stations};
    use chrono::Weekday;

    fn exact(mut request: ScheduleRequest) -> ScheduleRequest {
        request.rules.randomization_factor = 0.0;
        request
    }

    #[test]
    fn test_trivial_feasibility() {
        // Scenario: two interchangeable operators, one seat a day.
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["X"],
            },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Any x 1 },
            ..Default::default()
        };
        let result = schedule(&request);
        assert_eq!(result.warnings, vec![], "nothing to warn about");
        assert_eq!(result.assignments.len(), 5, "one seat per workday");
        for day in crate::data::workweek() {
            assert_eq!(
                result.assignments.iter().filter(|a| a.day == day).count(),
                1,
                "exactly one assignment on {day}"
            );
        }
    }

    #[test]
    fn test_forced_assignments_fill_the_week() {
        // Scenario: each operator is the unique candidate for one station.
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
        let result = schedule(&request);
        assert_eq!(result.warnings, vec![]);
        assert_eq!(result.assignments.len(), 10);
        for assignment in &result.assignments {
            let expected = if assignment.operator == OperatorId(1) {
                TaskId(10)
            } else {
                TaskId(11)
            };
            assert_eq!(assignment.task, expected, "forced pairs must hold all week");
        }
    }

    #[test]
    fn test_infeasible_demand_reports_and_assigns_nothing() {
        // Scenario: one candidate for a two-seat station.
        let request = ScheduleRequest {
            operators: operators! { 1: "A" (Regular) ["X"] },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Any x 2 },
            ..Default::default()
        };
        let result = schedule(&request);
        assert_eq!(result.assignments, vec![], "infeasibility halts before assigning");
        assert!(
            result.warnings.iter().any(|w| matches!(
                w,
                Warning::Understaffed { task, capable, .. }
                    if task == "T1" && capable.contains(&"A".to_string())
            )),
            "{:?}",
            result.warnings
        );
    }

    #[test]
    fn test_coordinator_rotation_over_the_week() {
        // Scenario: three coordinators rotate over the three stations.
        let request = ScheduleRequest {
            operators: operators! {
                1: "C1" (Coordinator) ["Process", "People", "Off Process"],
                2: "C2" (Coordinator) ["Process", "People", "Off Process"],
                3: "C3" (Coordinator) ["Process", "People", "Off Process"],
            },
            tasks: stations! {
                10: "Process" needs "Process",
                11: "People" needs "People",
                12: "Off Process" needs "Off Process",
            },
            requirements: demands! {
                10 => Coordinator x 1;
                11 => Coordinator x 1;
                12 => Coordinator x 1
            },
            ..Default::default()
        };
        let result = schedule(&request);
        assert_eq!(result.warnings, vec![]);
        assert_eq!(result.assignments.len(), 15);

        let cell = |op: u64, day: Weekday| {
            result
                .assignments
                .iter()
                .find(|a| a.operator == OperatorId(op) && a.day == day)
                .map(|a| a.task)
        };
        for day in crate::data::workweek() {
            let mut tasks: Vec<TaskId> = (1..=3).filter_map(|op| cell(op, day)).collect();
            tasks.sort_unstable();
            assert_eq!(
                tasks,
                vec![TaskId(10), TaskId(11), TaskId(12)],
                "every day is a coordinator↔station bijection"
            );
        }
        let days = crate::data::workweek();
        for op in 1..=3u64 {
            for pair in days.windows(2) {
                assert_ne!(
                    cell(op, pair[0]),
                    cell(op, pair[1]),
                    "no coordinator repeats a station on adjacent days"
                );
            }
            for task in [10, 11, 12] {
                assert!(
                    days.iter().any(|&d| cell(op, d) == Some(TaskId(task))),
                    "coordinator {op} should see station {task} during the week"
                );
            }
        }
    }

    #[test]
    fn test_greedy_dead_end_is_repaired_by_backtracking() {
        // Scenario: the two-seat station tempts the greedy pass into
        // spending both Y-skilled operators, leaving the Y station dry;
        // the backtracking fallback must route C into one of the seats.
        let request = exact(ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X", "Y"],
                2: "B" (Regular) ["X", "Y"],
                3: "C" (Regular) ["X"],
            },
            tasks: stations! {
                10: "T1" needs "X",
                11: "T2" needs "Y",
            },
            requirements: demands! {
                10 => Any x 2;
                11 => Any x 1
            },
            ..Default::default()
        });
        let result = schedule(&request);
        assert_eq!(result.warnings, vec![], "{:?}", result.warnings);
        assert_eq!(result.assignments.len(), 15, "three seats a day, five days");
    }

    #[test]
    fn test_flex_priority_steers_exceptions() {
        // Scenario: same seed, the flex-priority rule toggled.
        let base = || {
            exact(ScheduleRequest {
                operators: operators! {
                    1: "R" (Regular) ["Sorting"],
                    2: "F" (Flex) ["Sorting", "Spare"],
                },
                tasks: stations! {
                    10: "Exceptions" needs "Sorting",
                },
                requirements: demands! { 10 => Any x 1 },
                ..Default::default()
            })
        };
        let flex_on_exceptions = |result: &ScheduleResult| {
            result
                .assignments
                .iter()
                .filter(|a| a.operator == OperatorId(2) && a.task == TaskId(10))
                .count()
        };

        let mut on = base();
        on.rules.prioritize_flex_for_exceptions = true;
        let mut off = base();
        off.rules.prioritize_flex_for_exceptions = false;

        assert!(
            flex_on_exceptions(&schedule(&on)) > flex_on_exceptions(&schedule(&off)),
            "the rule should raise the flex-on-Exceptions count, all else equal"
        );
    }

    #[test]
    fn test_same_seed_reproduces_the_roster() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["X"],
                3: "C" (Regular) ["X"],
                4: "D" (Flex) ["X"],
            },
            tasks: stations! {
                10: "T1" needs "X",
                11: "Exceptions" needs "X",
            },
            requirements: demands! {
                10 => Any x 2;
                11 => Any x 1
            },
            rules: Rules {
                scheduling_seed: Some(42),
                ..Rules::default()
            },
            ..Default::default()
        };
        assert_eq!(
            schedule(&request),
            schedule(&request),
            "same seed, same inputs, same roster"
        );
    }

    #[test]
    fn test_pinned_cells_are_preserved_verbatim() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["X"],
            },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Any x 1 },
            current: vec![CurrentAssignment {
                operator: OperatorId(2),
                day: Weekday::Wed,
                task: TaskId(10),
                locked: true,
                pinned: false,
            }],
            ..Default::default()
        };
        let result = schedule(&request);
        assert!(
            result.assignments.contains(&Assignment {
                day: Weekday::Wed,
                operator: OperatorId(2),
                task: TaskId(10),
            }),
            "the locked cell must come back verbatim"
        );
        assert_eq!(
            result
                .assignments
                .iter()
                .filter(|a| a.day == Weekday::Wed)
                .count(),
            1,
            "nobody else is seated next to the locked cell"
        );
    }

    #[test]
    fn test_no_operator_day_is_double_booked() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X", "Y"],
                2: "B" (Regular) ["X", "Y"],
                3: "C" (Regular) ["X", "Y"],
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
        let result = schedule(&request);
        let mut seen = FxHashSet::default();
        for assignment in &result.assignments {
            assert!(
                seen.insert((assignment.operator, assignment.day)),
                "{} holds two seats on {}",
                assignment.operator,
                assignment.day
            );
        }
    }

    #[test]
    fn test_max_matching_pipeline_covers_the_week() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["X"],
                3: "F" (Flex) ["X"],
            },
            tasks: stations! {
                10: "T1" needs "X",
                11: "Spares" needs "X",
            },
            requirements: demands! {
                10 => Regular x 1;
                11 => Any x 1
            },
            rules: Rules {
                algorithm: Algorithm::MaxMatching,
                ..Rules::default()
            },
            ..Default::default()
        };
        let result = schedule(&request);
        assert_eq!(result.assignments.len(), 10, "{:?}", result.warnings);
        assert_eq!(result.warnings, vec![]);
        assert_eq!(
            schedule(&request),
            result,
            "the matching pipeline is seeded and reproducible too"
        );
    }

    #[test]
    fn test_violating_pin_is_preserved_but_warned() {
        // A pinned cell violating the skill rule is preserved but warned
        // about, never silently edited.
        let request = ScheduleRequest {
            operators: operators! {
                1: "A" (Regular) ["X"],
                2: "B" (Regular) ["X"],
            },
            tasks: stations! {
                10: "T1" needs "X",
                11: "T2" needs "Z",
            },
            requirements: demands! { 10 => Any x 1 },
            current: vec![CurrentAssignment {
                operator: OperatorId(1),
                day: Weekday::Mon,
                task: TaskId(11),
                locked: false,
                pinned: true,
            }],
            ..Default::default()
        };
        let result = schedule(&request);
        assert!(
            result.assignments.contains(&Assignment {
                day: Weekday::Mon,
                operator: OperatorId(1),
                task: TaskId(11),
            }),
            "the pinned cell survives despite the violation"
        );
        assert!(
            result
                .warnings
                .iter()
                .any(|w| matches!(w, Warning::SkillMismatch { skill, .. } if skill == "Z")),
            "{:?}",
            result.warnings
        );
    }

    #[test]
    fn test_operator_type_matters_for_typed_seats() {
        let request = ScheduleRequest {
            operators: operators! {
                1: "R" (Regular) ["X"],
                2: "F" (Flex) ["X"],
            },
            tasks: stations! { 10: "T1" needs "X" },
            requirements: demands! { 10 => Flex x 1 },
            ..Default::default()
        };
        let result = schedule(&request);
        for assignment in &result.assignments {
            assert_eq!(
                assignment.operator,
                OperatorId(2),
                "a flex-only seat never goes to a regular"
            );
        }
        assert_eq!(result.assignments.len(), 5);
    }
}
