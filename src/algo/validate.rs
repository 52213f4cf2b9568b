//! Post-hoc validation of a finished roster.
//!
//! Runs after every pipeline and turns anything a planner must know into
//! typed warnings: coverage gaps, rule breaches, and hard-rule violations
//! carried in by pinned cells. The roster itself is never edited here.

use crate::algo::model::Model;
use crate::data::{Assignment, Warning};

/// Check `assignments` against the request and collect warnings.
///
/// Staffing warnings for a (station, day) are suppressed only when every
/// assignee sitting on it came in pinned or locked; a planner who pinned
/// the gap has already seen it.
pub(crate) fn validate(model: &Model<'_>, assignments: &[Assignment]) -> Vec<Warning> {
    let mut warnings = Vec::new();

    // Resolve to indices; ids the model does not know cannot be checked.
    let cells: Vec<(usize, usize, usize)> = assignments
        .iter()
        .filter_map(|a| {
            Some((
                model.op_index(a.operator)?,
                model.day_index(a.day)?,
                model.task_index(a.task)?,
            ))
        })
        .collect();

    // One cell per (operator, day).
    for op in 0..model.ops.len() {
        for day in 0..model.n_days() {
            let count = cells.iter().filter(|&&(o, d, _)| o == op && d == day).count();
            if count > 1 {
                warnings.push(Warning::DoubleAssignment {
                    day: model.days[day],
                    operator: model.ops[op].name.clone(),
                });
            }
        }
    }

    // Hard eligibility, pinned rows included.
    for &(op, day, task) in &cells {
        if !model.ops[op].is_available(model.days[day]) {
            warnings.push(Warning::AvailabilityConflict {
                day: model.days[day],
                operator: model.ops[op].name.clone(),
                task: model.tasks[task].name.clone(),
            });
        }
        if !model.skill_ok(op, task) {
            warnings.push(Warning::SkillMismatch {
                day: model.days[day],
                operator: model.ops[op].name.clone(),
                task: model.tasks[task].name.clone(),
                skill: model.tasks[task].required_skill.clone(),
            });
        }
    }

    // Coverage per demanded (station, day).
    for task in 0..model.tasks.len() {
        for day in 0..model.n_days() {
            let required = model.required(task, day);
            if required == 0 {
                continue;
            }
            let assignees: Vec<usize> = cells
                .iter()
                .filter(|&&(_, d, t)| d == day && t == task)
                .map(|&(o, _, _)| o)
                .collect();
            let assigned = assignees.len() as u32;
            if assigned == required {
                continue;
            }
            let all_fixed = !assignees.is_empty()
                && assignees
                    .iter()
                    .all(|&op| model.fixed_task(op, day) == Some(task));
            if all_fixed {
                continue;
            }
            if assigned < required {
                warnings.push(Warning::Understaffed {
                    day: model.days[day],
                    task: model.tasks[task].name.clone(),
                    required,
                    assigned,
                    capable: Vec::new(),
                });
            } else {
                warnings.push(Warning::Overstaffed {
                    day: model.days[day],
                    task: model.tasks[task].name.clone(),
                    required,
                    assigned,
                });
            }
        }
    }

    // Heavy stations on adjacent days.
    if !model.rules.allow_consecutive_heavy_shifts {
        for op in 0..model.ops.len() {
            for day in 1..model.n_days() {
                let today = cells
                    .iter()
                    .find(|&&(o, d, _)| o == op && d == day)
                    .map(|&(_, _, t)| t);
                let yesterday = cells
                    .iter()
                    .find(|&&(o, d, _)| o == op && d == day - 1)
                    .map(|&(_, _, t)| t);
                if let (Some(t), Some(y)) = (today, yesterday)
                    && model.heavy[t]
                    && model.heavy[y]
                {
                    warnings.push(Warning::ConsecutiveHeavy {
                        day: model.days[day],
                        operator: model.ops[op].name.clone(),
                        task: model.tasks[t].name.clone(),
                    });
                }
            }
        }
    }

    warnings
}
