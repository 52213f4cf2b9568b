//! See [`Operator`]

use crate::data::id_type;
use bitflags::bitflags;
use chrono::Weekday;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

id_type! { impl Id<u64> for Operator as "o" }

/// Employment category of an [`Operator`].
///
/// The category partitions the station pool: coordinators only ever take
/// coordinator stations, everybody else only takes the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorType {
    /// Permanent staff; the bulk of the pool.
    Regular,
    /// Temporary staff, typically narrower skill sets.
    Flex,
    /// Team coordinator; rotates over the coordinator stations.
    Coordinator,
}

impl OperatorType {
    /// Every concrete operator type, in declaration order.
    pub const ALL: [Self; 3] = [Self::Regular, Self::Flex, Self::Coordinator];
}

impl std::fmt::Display for OperatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Regular => "regular",
            Self::Flex => "flex",
            Self::Coordinator => "coordinator",
        })
    }
}

/// Whether an [`Operator`] can be scheduled this week at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperatorStatus {
    /// In the pool.
    #[default]
    Active,
    /// Long-term leave.
    Leave,
    /// Reported sick.
    Sick,
    /// In training, not on the floor.
    Training,
    /// On holiday.
    Holiday,
}

bitflags! {
    /// The weekdays an operator can work, as a bit per workday.
    ///
    /// Replaces free-form availability rules with the one granularity the
    /// engine reasons about: a whole (operator, day) cell is either open
    /// or closed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DaySet: u8 {
        /// Monday
        const MON = 1 << 0;
        /// Tuesday
        const TUE = 1 << 1;
        /// Wednesday
        const WED = 1 << 2;
        /// Thursday
        const THU = 1 << 3;
        /// Friday
        const FRI = 1 << 4;
    }
}

impl DaySet {
    /// Monday through Friday.
    pub const WORKWEEK: Self = Self::MON
        .union(Self::TUE)
        .union(Self::WED)
        .union(Self::THU)
        .union(Self::FRI);

    /// The flag for a single workday. [`None`] for Saturday and Sunday,
    /// which are outside the scheduling horizon.
    pub const fn flag(day: Weekday) -> Option<Self> {
        match day {
            Weekday::Mon => Some(Self::MON),
            Weekday::Tue => Some(Self::TUE),
            Weekday::Wed => Some(Self::WED),
            Weekday::Thu => Some(Self::THU),
            Weekday::Fri => Some(Self::FRI),
            Weekday::Sat | Weekday::Sun => None,
        }
    }
}

impl Default for DaySet {
    #[inline]
    fn default() -> Self {
        Self::WORKWEEK
    }
}

/// A person who can be assigned to stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    /// Duplicate of the operator's ID.
    pub id: OperatorId,

    /// Display name, used in warnings and the manager-facing UI.
    pub name: String,

    /// Employment category.
    pub kind: OperatorType,

    /// Only [`Active`](OperatorStatus::Active) operators enter the pool.
    #[serde(default)]
    pub status: OperatorStatus,

    /// Skills this operator holds. A station is only eligible when its
    /// required skill appears here (hard constraint under strict matching).
    #[serde(default)]
    pub skills: FxHashSet<String>,

    /// Which workdays the operator can be scheduled.
    #[serde(default)]
    pub availability: DaySet,

    /// Stations the operator would rather work, most preferred first.
    #[serde(default)]
    pub preferred_tasks: Vec<String>,

    /// Archived operators never enter the pool, whatever their status.
    #[serde(default)]
    pub archived: bool,
}

impl Operator {
    /// Whether this operator belongs in the assignment pool at all.
    #[inline]
    pub fn in_pool(&self) -> bool {
        self.status == OperatorStatus::Active && !self.archived
    }

    /// Whether the operator can work on `day`.
    #[inline]
    pub fn is_available(&self, day: Weekday) -> bool {
        DaySet::flag(day).is_some_and(|flag| self.availability.contains(flag))
    }

    /// Whether the operator holds `skill`.
    #[inline]
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    /// Whether the station named `task_name` is on the preference list.
    pub fn prefers(&self, task_name: &str) -> bool {
        self.preferred_tasks
            .iter()
            .any(|p| p.eq_ignore_ascii_case(task_name))
    }

    /// A flex operator with exactly one skill has nowhere else to go, so
    /// rotation penalties never apply to them.
    #[inline]
    pub fn single_skilled_flex(&self) -> bool {
        self.kind == OperatorType::Flex && self.skills.len() == 1
    }
}
