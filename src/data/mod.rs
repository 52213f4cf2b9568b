//! Data that goes into and comes out of the scheduling core.
//!
//! Everything in here is a plain value type: the core consumes a
//! [`ScheduleRequest`] and produces a [`ScheduleResult`], and neither side
//! owns any I/O, persistence, or network state.

pub mod assignment;
pub mod operator;
pub mod request;
pub mod requirement;
pub mod rules;
pub mod task;

pub use assignment::*;
pub use operator::*;
pub use request::*;
pub use requirement::*;
pub use rules::*;
pub use task::*;

#[cfg(test)]
pub use crate::{demands, operators, stations};

macro_rules! id_type {
    ($(#[$m:meta])* impl Id<$repr:ty> for $Type:ident as $prefix:literal) => {
        ::paste::paste! {
            #[doc = " Code uniquely identifying a [`" $Type "`]."]
            $(#[$m])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
                ::serde::Serialize, ::serde::Deserialize,
            )]
            pub struct [<$Type Id>](pub $repr);

            impl std::fmt::Display for [<$Type Id>] {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, concat!($prefix, ".{:x}"), self.0)
                }
            }

            #[doc = " A dictionary associating [`" [<$Type Id>] "`]s with `T`."]
            pub type [<$Type Map>]<T = $Type> = ::rustc_hash::FxHashMap<[<$Type Id>], T>;

            #[doc = " A set of [`" [<$Type Id>] "`]s."]
            pub type [<$Type Set>] = ::rustc_hash::FxHashSet<[<$Type Id>]>;
        }
    };
}

pub(crate) use id_type;

/// Create a [`Vec`] of [`Operator`]s for testing.
///
/// Skills go in brackets, availability defaults to the full workweek and can
/// be restricted with `@ [MON, WED]`, preferred stations with `prefers [..]`.
#[macro_export]
macro_rules! operators {
    ($(
        $id:literal: $name:literal ($kind:ident)
        [$($skill:literal),* $(,)?]
        $(@ [$($day:ident),+ $(,)?])?
        $(prefers [$($pref:literal),+ $(,)?])?
    ),+ $(,)?) => {
        vec![$(
            $crate::data::Operator {
                id: $crate::data::OperatorId($id),
                name: $name.to_string(),
                kind: $crate::data::OperatorType::$kind,
                status: $crate::data::OperatorStatus::Active,
                skills: [$($skill.to_string()),*].into_iter().collect(),
                availability: None
                    $(.or(Some(
                        $crate::data::DaySet::empty()$(.union($crate::data::DaySet::$day))+
                    )))?
                    .unwrap_or($crate::data::DaySet::WORKWEEK),
                preferred_tasks: None
                    $(.or(Some(vec![$($pref.to_string()),+])))?
                    .unwrap_or_default(),
                archived: false,
            }
        ),+]
    };

    () => {
        Vec::<$crate::data::Operator>::new()
    };
}

/// Create a [`Vec`] of [`Task`]s for testing.
///
/// Flags after the skill mark the task `heavy` and/or `coordinator`.
#[macro_export]
macro_rules! stations {
    ($(
        $id:literal: $name:literal needs $skill:literal $($flag:ident)*
    ),+ $(,)?) => {
        vec![$(
            $crate::data::Task {
                id: $crate::data::TaskId($id),
                name: $name.to_string(),
                required_skill: $skill.to_string(),
                heavy: [$(stringify!($flag)),*].contains(&"heavy"),
                coordinator_only: [$(stringify!($flag)),*].contains(&"coordinator"),
            }
        ),+]
    };

    () => {
        Vec::<$crate::data::Task>::new()
    };
}

/// Create a [`Vec`] of [`TaskRequirement`]s for testing.
///
/// `Any` stands for a demand with no operator-type constraint.
#[macro_export]
macro_rules! demands {
    (@kind Any) => { None };
    (@kind $kind:ident) => { Some($crate::data::OperatorType::$kind) };

    ($(
        $task:literal => $($kind:ident x $count:literal),+
    );+ $(;)?) => {
        vec![$(
            $crate::data::TaskRequirement {
                task: $crate::data::TaskId($task),
                enabled: true,
                default_demands: ::smallvec::smallvec![$(
                    $crate::data::TypeDemand {
                        kind: $crate::demands!(@kind $kind),
                        count: $count,
                    }
                ),+],
                overrides: Default::default(),
            }
        ),+]
    };

    () => {
        Vec::<$crate::data::TaskRequirement>::new()
    };
}
