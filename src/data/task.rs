//! See [`Task`]

use crate::data::id_type;
use serde::{Deserialize, Serialize};

id_type! { impl Id<u64> for Task as "t" }

/// Skills that mark a station as belonging to the coordinator rotation.
///
/// Coordinator stations and regular stations are disjoint worlds: a
/// coordinator never takes a regular station and vice versa.
pub const COORDINATOR_SKILLS: [&str; 3] = ["Process", "People", "Off Process"];

/// A station on the floor that needs staffing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Duplicate of the task's ID.
    pub id: TaskId,

    /// Display name. Name-based classification (tier, heavy/soft lists,
    /// the Exceptions bonus) compares case-insensitively.
    pub name: String,

    /// The single skill an operator must hold to work this station.
    pub required_skill: String,

    /// Physically demanding stations get rotation limits and fairness
    /// accounting.
    #[serde(default)]
    pub heavy: bool,

    /// Force-mark as a coordinator station regardless of skill name.
    #[serde(default)]
    pub coordinator_only: bool,
}

impl Task {
    /// Whether this station belongs to the coordinator rotation.
    pub fn is_coordinator(&self) -> bool {
        self.coordinator_only
            || COORDINATOR_SKILLS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&self.required_skill))
    }

    /// Fill-order criticality of this station.
    #[inline]
    pub fn tier(&self) -> Tier {
        Tier::of_name(&self.name)
    }
}

/// Whether a station counts as "Exceptions" for the flex-priority bonus.
pub(crate) fn is_exceptions(name: &str) -> bool {
    name.eq_ignore_ascii_case("Exceptions")
}

/// Fill-order criticality class. Lower tiers are filled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Must be staffed for the floor to run at all.
    Critical = 1,
    /// Staffed when capacity allows ("Exceptions", "Filler").
    Conditional = 2,
    /// Absorbs whoever is left ("Decanting").
    Fallback = 3,
}

impl Tier {
    /// Classify a station by name.
    pub fn of_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("Exceptions") || name.eq_ignore_ascii_case("Filler") {
            Self::Conditional
        } else if name.eq_ignore_ascii_case("Decanting") {
            Self::Fallback
        } else {
            Self::Critical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, skill: &str) -> Task {
        Task {
            id: TaskId(7),
            name: name.to_string(),
            required_skill: skill.to_string(),
            heavy: false,
            coordinator_only: false,
        }
    }

    #[test]
    fn test_tier_classification() {
        assert_eq!(task("Troubleshooter", "Mechanics").tier(), Tier::Critical);
        assert_eq!(task("exceptions", "Sorting").tier(), Tier::Conditional);
        assert_eq!(task("Filler", "Filling").tier(), Tier::Conditional);
        assert_eq!(task("Decanting", "Decanting").tier(), Tier::Fallback);
    }

    #[test]
    fn test_tiers_order_by_criticality() {
        assert!(Tier::Critical < Tier::Conditional);
        assert!(Tier::Conditional < Tier::Fallback);
    }

    #[test]
    fn test_coordinator_detection_by_skill() {
        assert!(task("Morning lead", "Process").is_coordinator());
        assert!(task("Team support", "people").is_coordinator());
        assert!(task("Floor walk", "OFF PROCESS").is_coordinator());
        assert!(!task("Decanting", "Decanting").is_coordinator());
    }

    #[test]
    fn test_coordinator_flag_wins() {
        let mut t = task("Special", "Sorting");
        t.coordinator_only = true;
        assert!(t.is_coordinator(), "the explicit flag should force the class");
    }
}
