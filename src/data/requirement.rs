//! Per-station staffing demands and their per-day overrides.

use crate::data::{OperatorType, TaskId};
use chrono::Weekday;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One (operator type, head count) entry of a staffing demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDemand {
    /// [`None`] means any operator type may fill these seats.
    pub kind: Option<OperatorType>,

    /// How many seats of this entry the station needs.
    pub count: u32,
}

/// Demand entries for one station on one day. Rarely more than three
/// (one per operator type), hence inline storage.
pub type DemandList = SmallVec<[TypeDemand; 3]>;

/// Staffing requirement for one station: defaults plus per-day overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequirement {
    /// The station this requirement staffs.
    pub task: TaskId,

    /// Disabled requirements are skipped entirely, as are days whose
    /// demands sum to zero.
    #[serde(default = "enabled_default")]
    pub enabled: bool,

    /// Demands used on any day without an override.
    #[serde(default)]
    pub default_demands: DemandList,

    /// Demands replacing the defaults on specific days.
    #[serde(default)]
    pub overrides: FxHashMap<Weekday, DemandList>,
}

#[inline]
const fn enabled_default() -> bool {
    true
}

impl TaskRequirement {
    /// The demand list in force on `day`: the override if present, the
    /// defaults otherwise.
    pub fn demands_for(&self, day: Weekday) -> &[TypeDemand] {
        self.overrides
            .get(&day)
            .map(|d| d.as_slice())
            .unwrap_or(&self.default_demands)
    }

    /// Total seats the station needs on `day`, summed across all entries.
    pub fn total_for(&self, day: Weekday) -> u32 {
        self.demands_for(day).iter().map(|d| d.count).sum()
    }

    /// Whether the day's demand constrains operator types at all.
    pub fn typed_for(&self, day: Weekday) -> bool {
        self.demands_for(day)
            .iter()
            .any(|d| d.kind.is_some() && d.count > 0)
    }
}

/// Whether `kind` may fill a seat under `demands`.
///
/// A type is admitted when a matching concrete entry or an untyped entry
/// still carries demand.
pub(crate) fn demand_admits(demands: &[TypeDemand], kind: OperatorType) -> bool {
    demands
        .iter()
        .any(|d| d.count > 0 && d.kind.is_none_or(|k| k == kind))
}
