//! Indexed view of a request plus the flat state the solvers share.
//!
//! Operators, tasks and days are translated to dense indices once, at the
//! start of a call; every solver then works on flat vectors and bitsets
//! and only converts back to ids when producing [`Assignment`]s.

use crate::data::{
    Assignment, Operator, OperatorMap, Rules, ScheduleRequest, Task, TaskMap, TaskRequirement,
    TypeDemand,
};
use chrono::Weekday;

/// Bitset over task indices.
///
/// One word covers the whole floor: a request carries at most
/// [`TaskSet::CAPACITY`] distinct stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TaskSet(u128);

impl TaskSet {
    /// Maximum number of distinct tasks per request.
    pub const CAPACITY: usize = 128;

    /// The empty set.
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set containing exactly `ix`.
    #[inline]
    pub const fn singleton(ix: usize) -> Self {
        Self(1 << ix)
    }

    #[inline]
    pub fn insert(&mut self, ix: usize) {
        self.0 |= 1 << ix;
    }

    #[inline]
    pub fn remove(&mut self, ix: usize) {
        self.0 &= !(1 << ix);
    }

    #[inline]
    pub const fn contains(&self, ix: usize) -> bool {
        self.0 & (1 << ix) != 0
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The sole member, if there is exactly one.
    pub const fn sole(&self) -> Option<usize> {
        if self.0.count_ones() == 1 {
            Some(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Iterate members in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let ix = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(ix)
            }
        })
    }
}

/// Per-(operator, day) sets of still-admissible tasks.
///
/// Stored flat, operator-major, so a whole propagation is one allocation
/// and a backtracking undo record is a single copied word.
#[derive(Debug, Clone)]
pub(crate) struct DomainMap {
    days: usize,
    cells: Vec<TaskSet>,
}

impl DomainMap {
    pub fn new(n_ops: usize, n_days: usize) -> Self {
        Self {
            days: n_days,
            cells: vec![TaskSet::empty(); n_ops * n_days],
        }
    }

    #[inline]
    pub fn cell(&self, op: usize, day: usize) -> usize {
        op * self.days + day
    }

    #[inline]
    pub fn get(&self, op: usize, day: usize) -> TaskSet {
        self.cells[self.cell(op, day)]
    }

    #[inline]
    pub fn set(&mut self, op: usize, day: usize, tasks: TaskSet) {
        let cell = self.cell(op, day);
        self.cells[cell] = tasks;
    }

    #[inline]
    pub fn clear(&mut self, op: usize, day: usize) {
        self.set(op, day, TaskSet::empty());
    }

    #[inline]
    pub fn contains(&self, op: usize, day: usize, task: usize) -> bool {
        self.get(op, day).contains(task)
    }
}

/// Live assignment state during a pass: the roster grid plus the per-
/// operator counters every scoring path reads.
#[derive(Debug, Clone)]
pub(crate) struct Grid {
    days: usize,
    cells: Vec<Option<usize>>,
    totals: Vec<u32>,
    heavy_counts: Vec<u32>,
}

impl Grid {
    pub fn new(n_ops: usize, n_days: usize) -> Self {
        Self {
            days: n_days,
            cells: vec![None; n_ops * n_days],
            totals: vec![0; n_ops],
            heavy_counts: vec![0; n_ops],
        }
    }

    #[inline]
    fn cell(&self, op: usize, day: usize) -> usize {
        op * self.days + day
    }

    #[inline]
    pub fn task_at(&self, op: usize, day: usize) -> Option<usize> {
        self.cells[self.cell(op, day)]
    }

    #[inline]
    pub fn is_assigned(&self, op: usize, day: usize) -> bool {
        self.task_at(op, day).is_some()
    }

    pub fn assign(&mut self, op: usize, day: usize, task: usize, heavy: bool) {
        let cell = self.cell(op, day);
        debug_assert!(self.cells[cell].is_none(), "cell must be free before assigning");
        self.cells[cell] = Some(task);
        self.totals[op] += 1;
        if heavy {
            self.heavy_counts[op] += 1;
        }
    }

    pub fn unassign(&mut self, op: usize, day: usize, heavy: bool) {
        let cell = self.cell(op, day);
        debug_assert!(self.cells[cell].is_some(), "cell must be filled before unassigning");
        self.cells[cell] = None;
        self.totals[op] -= 1;
        if heavy {
            self.heavy_counts[op] -= 1;
        }
    }

    #[inline]
    pub fn total(&self, op: usize) -> u32 {
        self.totals[op]
    }

    #[inline]
    pub fn heavy_count(&self, op: usize) -> u32 {
        self.heavy_counts[op]
    }

    pub fn mean_total(&self) -> f64 {
        mean(&self.totals)
    }

    pub fn mean_heavy(&self) -> f64 {
        mean(&self.heavy_counts)
    }

    /// How many days in a row, immediately before `day`, the operator was
    /// already on `task`. Zero if yesterday was something else.
    pub fn streak_before(&self, op: usize, day: usize, task: usize) -> u32 {
        let mut streak = 0;
        for d in (0..day).rev() {
            if self.task_at(op, d) == Some(task) {
                streak += 1;
            } else {
                break;
            }
        }
        streak
    }

    /// Convert to public assignments, ordered by day, then task, then
    /// operator index.
    pub fn to_assignments(&self, model: &Model<'_>) -> Vec<Assignment> {
        let mut out = Vec::new();
        for day in 0..self.days {
            for op in 0..self.totals.len() {
                if let Some(task) = self.task_at(op, day) {
                    out.push((day, task, op));
                }
            }
        }
        out.sort_unstable();
        out.into_iter()
            .map(|(day, task, op)| model.assignment(op, day, task))
            .collect()
    }
}

fn mean(counts: &[u32]) -> f64 {
    if counts.is_empty() {
        0.0
    } else {
        counts.iter().sum::<u32>() as f64 / counts.len() as f64
    }
}

/// Indexed, filtered view of one request.
pub(crate) struct Model<'a> {
    /// The behaviour knobs for this call.
    pub rules: &'a Rules,
    /// Workdays in roster order.
    pub days: Vec<Weekday>,
    /// Pool operators (active, non-archived).
    pub ops: Vec<&'a Operator>,
    /// Stations in play (not excluded).
    pub tasks: Vec<&'a Task>,
    /// Requirement per station, parallel to `tasks`.
    pub reqs: Vec<Option<&'a TaskRequirement>>,
    /// Heavy classification per station, parallel to `tasks`.
    pub heavy: Vec<bool>,
    /// Soft classification per station, parallel to `tasks`.
    pub soft: Vec<bool>,
    /// Coordinator-rotation membership per station, parallel to `tasks`.
    pub coordinator: Vec<bool>,
    /// Pinned/locked cells, operator-major; the core never rewrites them.
    pub fixed: Vec<Option<usize>>,
    op_ix: OperatorMap<usize>,
    task_ix: TaskMap<usize>,
}

impl<'a> Model<'a> {
    pub fn build(request: &'a ScheduleRequest) -> Self {
        let days: Vec<Weekday> = if request.workdays.is_empty() {
            crate::data::workweek()
        } else {
            request
                .workdays
                .iter()
                .copied()
                .filter(|d| crate::data::DaySet::flag(*d).is_some())
                .collect()
        };

        let ops: Vec<&Operator> = request.operators.iter().filter(|o| o.in_pool()).collect();

        let excluded = &request.excluded_tasks;
        let mut tasks: Vec<&Task> = request
            .tasks
            .iter()
            .filter(|t| !excluded.iter().any(|x| x.eq_ignore_ascii_case(&t.name)))
            .collect();
        debug_assert!(tasks.len() <= TaskSet::CAPACITY, "too many stations for one request");
        tasks.truncate(TaskSet::CAPACITY);

        let op_ix: OperatorMap<usize> = ops.iter().enumerate().map(|(i, o)| (o.id, i)).collect();
        let task_ix: TaskMap<usize> = tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

        let reqs: Vec<Option<&TaskRequirement>> = tasks
            .iter()
            .map(|t| request.requirements.iter().find(|r| r.task == t.id))
            .collect();

        let rules = &request.rules;
        let heavy = tasks.iter().map(|t| rules.is_heavy(t)).collect();
        let soft = tasks.iter().map(|t| rules.is_soft(&t.name)).collect();
        let coordinator = tasks.iter().map(|t| t.is_coordinator()).collect();

        let mut fixed = vec![None; ops.len() * days.len()];
        for cell in request.current.iter().filter(|c| c.fixed()) {
            let (Some(&op), Some(&task)) = (op_ix.get(&cell.operator), task_ix.get(&cell.task))
            else {
                continue;
            };
            let Some(day) = days.iter().position(|d| *d == cell.day) else {
                continue;
            };
            fixed[op * days.len() + day] = Some(task);
        }

        Self {
            rules,
            days,
            ops,
            tasks,
            reqs,
            heavy,
            soft,
            coordinator,
            fixed,
            op_ix,
            task_ix,
        }
    }

    #[inline]
    pub fn n_days(&self) -> usize {
        self.days.len()
    }

    #[inline]
    pub fn cell(&self, op: usize, day: usize) -> usize {
        op * self.days.len() + day
    }

    #[inline]
    pub fn fixed_task(&self, op: usize, day: usize) -> Option<usize> {
        self.fixed[self.cell(op, day)]
    }

    /// Whether the coordinator-vs-everyone partition admits the pairing.
    #[inline]
    pub fn partition_ok(&self, op: usize, task: usize) -> bool {
        (self.ops[op].kind == crate::data::OperatorType::Coordinator) == self.coordinator[task]
    }

    /// Whether the operator holds the station's required skill.
    #[inline]
    pub fn skill_ok(&self, op: usize, task: usize) -> bool {
        self.ops[op].has_skill(&self.tasks[task].required_skill)
    }

    /// Hard admissibility of a pairing under the current rules: the
    /// partition always binds, the skill only under strict matching.
    pub fn eligible(&self, op: usize, task: usize) -> bool {
        self.partition_ok(op, task) && (self.skill_ok(op, task) || !self.rules.strict_skill_matching)
    }

    /// The demand list in force for a station on a day.
    pub fn demands(&self, task: usize, day: usize) -> &[TypeDemand] {
        self.reqs[task]
            .filter(|r| r.enabled)
            .map(|r| r.demands_for(self.days[day]))
            .unwrap_or(&[])
    }

    /// Seats a station needs on a day; zero when disabled or demand-free.
    pub fn required(&self, task: usize, day: usize) -> u32 {
        self.demands(task, day).iter().map(|d| d.count).sum()
    }

    pub fn op_index(&self, id: crate::data::OperatorId) -> Option<usize> {
        self.op_ix.get(&id).copied()
    }

    pub fn task_index(&self, id: crate::data::TaskId) -> Option<usize> {
        self.task_ix.get(&id).copied()
    }

    pub fn day_index(&self, day: Weekday) -> Option<usize> {
        self.days.iter().position(|d| *d == day)
    }

    pub fn assignment(&self, op: usize, day: usize, task: usize) -> Assignment {
        Assignment {
            day: self.days[day],
            operator: self.ops[op].id,
            task: self.tasks[task].id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{demands, operators, stations};

    #[test]
    fn test_task_set_basics() {
        let mut set = TaskSet::empty();
        assert!(set.is_empty());
        set.insert(0);
        set.insert(5);
        set.insert(127);
        assert_eq!(set.len(), 3);
        assert!(set.contains(5));
        assert!(!set.contains(4));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 5, 127]);

        set.remove(5);
        assert_eq!(set.len(), 2);
        assert_eq!(TaskSet::singleton(9).sole(), Some(9));
        assert_eq!(set.sole(), None, "two members means no sole member");
    }

    #[test]
    fn test_grid_counters_and_streaks() {
        let mut grid = Grid::new(2, 5);
        grid.assign(0, 0, 3, true);
        grid.assign(0, 1, 3, true);
        grid.assign(0, 2, 4, false);
        assert_eq!(grid.total(0), 3);
        assert_eq!(grid.heavy_count(0), 2);
        assert_eq!(
            grid.streak_before(0, 2, 3),
            2,
            "two days on station 3 precede day 2"
        );
        assert_eq!(grid.streak_before(0, 2, 4), 0);
        assert_eq!(grid.streak_before(0, 3, 4), 1);

        grid.unassign(0, 1, true);
        assert_eq!(grid.total(0), 2);
        assert_eq!(grid.heavy_count(0), 1);
        assert_eq!(
            grid.streak_before(0, 2, 3),
            0,
            "the streak breaks once the middle day is cleared"
        );
    }

    #[test]
    fn test_model_filters_pool_and_exclusions() {
        let mut ops = operators! {
            1: "Avery" (Regular) ["Sorting"],
            2: "Blake" (Flex) ["Sorting"],
        };
        ops[1].archived = true;
        let tasks = stations! {
            10: "Sorting" needs "Sorting",
            11: "Decanting" needs "Decanting",
        };
        let request = ScheduleRequest {
            operators: ops,
            tasks,
            requirements: demands! { 10 => Any x 1 },
            excluded_tasks: vec!["decanting".to_string()],
            ..Default::default()
        };
        let model = Model::build(&request);
        assert_eq!(model.ops.len(), 1, "archived operators should be filtered");
        assert_eq!(model.tasks.len(), 1, "exclusion should match case-insensitively");
        assert_eq!(model.required(0, 0), 1);
        assert_eq!(model.required(0, 2), 1);
    }

    #[test]
    fn test_partition_and_eligibility() {
        let ops = operators! {
            1: "Avery" (Regular) ["Sorting", "Process"],
            2: "Casey" (Coordinator) ["Process"],
        };
        let tasks = stations! {
            10: "Sorting" needs "Sorting",
            11: "Process lead" needs "Process",
        };
        let request = ScheduleRequest {
            operators: ops,
            tasks,
            ..Default::default()
        };
        let model = Model::build(&request);
        assert!(model.eligible(0, 0), "regular on regular station");
        assert!(
            !model.eligible(0, 1),
            "a regular never takes a coordinator station, even with the skill"
        );
        assert!(model.eligible(1, 1), "coordinator on coordinator station");
        assert!(!model.eligible(1, 0), "coordinator never takes a regular station");
    }
}
