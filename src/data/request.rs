//! The single input record the scheduling core consumes.

use crate::data::{CurrentAssignment, Operator, Rules, Task, TaskRequirement};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Everything one scheduling call needs, as pure data.
///
/// The core never reads anything else: no clocks, no persistence, no
/// global state. Two identical requests produce identical results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRequest {
    /// The operator pool. Inactive and archived entries are tolerated and
    /// filtered out.
    pub operators: Vec<Operator>,

    /// Every station on the floor, staffed or not.
    pub tasks: Vec<Task>,

    /// The days to roster, Monday through Friday when empty.
    #[serde(default = "workweek")]
    pub workdays: Vec<Weekday>,

    /// Staffing demands per station.
    pub requirements: Vec<TaskRequirement>,

    /// Station names to leave out of this run entirely.
    pub excluded_tasks: Vec<String>,

    /// Cells already on the roster. Locked and pinned ones are preserved
    /// verbatim.
    pub current: Vec<CurrentAssignment>,

    /// Behaviour tuning. Missing fields fall back to defaults.
    pub rules: Rules,
}

impl Default for ScheduleRequest {
    fn default() -> Self {
        Self {
            operators: Vec::new(),
            tasks: Vec::new(),
            workdays: workweek(),
            requirements: Vec::new(),
            excluded_tasks: Vec::new(),
            current: Vec::new(),
            rules: Rules::default(),
        }
    }
}

/// Monday through Friday, in order.
pub fn workweek() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}
