//! Roster cells going in (pinned) and out (assignments, warnings).

use crate::data::{OperatorId, TaskId};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One cell of the weekly roster: `operator` works `task` on `day`.
///
/// For any (operator, day) at most one assignment ever exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Workday of the cell.
    pub day: Weekday,
    /// Who works.
    pub operator: OperatorId,
    /// Where they work.
    pub task: TaskId,
}

/// A pre-existing roster cell handed in with the request.
///
/// Locked and pinned cells are fixed: the core reproduces them verbatim
/// and schedules around them. Cells with neither flag are advisory
/// leftovers from an earlier run and carry no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAssignment {
    /// Who is already rostered.
    pub operator: OperatorId,
    /// On which day.
    pub day: Weekday,
    /// On which station.
    pub task: TaskId,
    /// Locked by the outer application; also blocks outer edits.
    #[serde(default)]
    pub locked: bool,
    /// Pinned by the planner.
    #[serde(default)]
    pub pinned: bool,
}

impl CurrentAssignment {
    /// Whether the core must preserve this cell untouched.
    #[inline]
    pub fn fixed(&self) -> bool {
        self.locked || self.pinned
    }
}

/// A problem the caller should surface to the planner.
///
/// Warnings never abort a run: the assignments that could be made are
/// returned alongside them.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A station has fewer assignees than its requirement demands, or the
    /// propagator proved the demand unsatisfiable before assigning.
    #[error("{task} on {day} is understaffed: {assigned} of {required} filled{}", fmt_names(.capable))]
    Understaffed {
        /// Day of the gap.
        day: Weekday,
        /// Station name.
        task: String,
        /// Seats demanded.
        required: u32,
        /// Seats actually filled.
        assigned: u32,
        /// Operators who could have taken the station, when the
        /// propagator identified them.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        capable: Vec<String>,
    },

    /// A station has more assignees than demanded.
    #[error("{task} on {day} is overstaffed: {assigned} of {required} filled")]
    Overstaffed {
        /// Day of the excess.
        day: Weekday,
        /// Station name.
        task: String,
        /// Seats demanded.
        required: u32,
        /// Seats actually filled.
        assigned: u32,
    },

    /// An assignee lacks the station's required skill.
    #[error("{operator} lacks {skill} required by {task} on {day}")]
    SkillMismatch {
        /// Day of the assignment.
        day: Weekday,
        /// Operator name.
        operator: String,
        /// Station name.
        task: String,
        /// The missing skill.
        skill: String,
    },

    /// An assignee is not available on the day they are rostered.
    #[error("{operator} is not available on {day} but is rostered on {task}")]
    AvailabilityConflict {
        /// Day of the conflict.
        day: Weekday,
        /// Operator name.
        operator: String,
        /// Station name.
        task: String,
    },

    /// An operator holds two cells on the same day.
    #[error("{operator} is rostered twice on {day}")]
    DoubleAssignment {
        /// Day of the clash.
        day: Weekday,
        /// Operator name.
        operator: String,
    },

    /// An operator works heavy stations on adjacent days although the
    /// rules forbid it.
    #[error("{operator} works heavy station {task} on {day} right after a heavy day")]
    ConsecutiveHeavy {
        /// The second of the two heavy days.
        day: Weekday,
        /// Operator name.
        operator: String,
        /// Station worked on the second day.
        task: String,
    },
}

fn fmt_names(names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!(" (capable: {})", names.join(", "))
    }
}

/// What one scheduling call produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// The roster, ordered by day, then station, then operator.
    pub assignments: Vec<Assignment>,
    /// Everything the planner should know about the roster.
    pub warnings: Vec<Warning>,
}
