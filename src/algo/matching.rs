//! Maximum bipartite matching between seats and operators.
//!
//! Hopcroft–Karp: a BFS builds layers from unmatched seats towards
//! unmatched operators, a DFS then takes vertex-disjoint augmenting paths
//! of minimum length, and the two alternate until no augmenting layer
//! remains. Runs in O(E·√V), which makes per-day rematching free for
//! floor-sized inputs.

use crate::algo::model::Model;
use crate::algo::propagate::SlotDemand;
use crate::data::OperatorType;
use std::collections::VecDeque;

/// Bipartite graph with seats on the left and operators on the right.
pub(crate) struct HopcroftKarp {
    n_left: usize,
    n_right: usize,
    adj: Vec<Vec<usize>>,
}

impl HopcroftKarp {
    pub fn new(n_left: usize, n_right: usize) -> Self {
        Self {
            n_left,
            n_right,
            adj: vec![Vec::new(); n_left],
        }
    }

    /// Declare that seat `l` accepts operator `r`.
    pub fn connect(&mut self, l: usize, r: usize) {
        debug_assert!(l < self.n_left && r < self.n_right);
        self.adj[l].push(r);
    }

    /// Compute a maximum matching; entry `l` holds the operator seat `l`
    /// got, or [`None`] if the seat stays open.
    pub fn matching(&self) -> Vec<Option<usize>> {
        let mut pair_left = vec![None; self.n_left];
        let mut pair_right = vec![None; self.n_right];
        let mut dist = vec![u32::MAX; self.n_left];

        while self.bfs(&pair_left, &pair_right, &mut dist) {
            for l in 0..self.n_left {
                if pair_left[l].is_none() {
                    self.dfs(l, &mut pair_left, &mut pair_right, &mut dist);
                }
            }
        }

        pair_left
    }

    /// Layer the graph from unmatched seats; true while an augmenting
    /// path exists.
    fn bfs(
        &self,
        pair_left: &[Option<usize>],
        pair_right: &[Option<usize>],
        dist: &mut [u32],
    ) -> bool {
        let mut queue = VecDeque::new();
        for l in 0..self.n_left {
            if pair_left[l].is_none() {
                dist[l] = 0;
                queue.push_back(l);
            } else {
                dist[l] = u32::MAX;
            }
        }

        let mut reachable = false;
        while let Some(l) = queue.pop_front() {
            for &r in &self.adj[l] {
                match pair_right[r] {
                    None => reachable = true,
                    Some(l2) if dist[l2] == u32::MAX => {
                        dist[l2] = dist[l] + 1;
                        queue.push_back(l2);
                    }
                    _ => {}
                }
            }
        }
        reachable
    }

    /// Take one augmenting path of minimum length from seat `l`.
    fn dfs(
        &self,
        l: usize,
        pair_left: &mut [Option<usize>],
        pair_right: &mut [Option<usize>],
        dist: &mut [u32],
    ) -> bool {
        for i in 0..self.adj[l].len() {
            let r = self.adj[l][i];
            let advance = match pair_right[r] {
                None => true,
                Some(l2) => {
                    dist[l2] == dist[l].saturating_add(1)
                        && self.dfs(l2, pair_left, pair_right, dist)
                }
            };
            if advance {
                pair_left[l] = Some(r);
                pair_right[r] = Some(l);
                return true;
            }
        }
        dist[l] = u32::MAX;
        false
    }
}

/// One seat of one day's demand: a station plus an optional type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Seat {
    pub task: usize,
    pub label: Option<OperatorType>,
}

/// Expand a day's open slots into individual labelled seats.
pub(crate) fn seats_for_day(slots: &[SlotDemand], day: usize) -> Vec<Seat> {
    let mut seats = Vec::new();
    for slot in slots.iter().filter(|s| s.day == day) {
        for demand in &slot.demands {
            for _ in 0..demand.count {
                seats.push(Seat {
                    task: slot.task,
                    label: demand.kind,
                });
            }
        }
    }
    seats
}

/// Match one day's seats against the free operators.
///
/// Adjacency is hard eligibility plus the seat's type label; labelled
/// seats therefore form disjoint sub-problems on their own. Returns one
/// operator (an index into `free_ops`' values) per matched seat.
pub(crate) fn match_day(
    model: &Model<'_>,
    seats: &[Seat],
    day: usize,
    free_ops: &[usize],
) -> Vec<Option<usize>> {
    let mut graph = HopcroftKarp::new(seats.len(), free_ops.len());
    for (si, seat) in seats.iter().enumerate() {
        for (oi, &op) in free_ops.iter().enumerate() {
            let kind = model.ops[op].kind;
            let label_ok = match seat.label {
                Some(required) => kind == required,
                None => true,
            };
            if label_ok && model.ops[op].is_available(model.days[day]) && model.eligible(op, seat.task)
            {
                graph.connect(si, oi);
            }
        }
    }
    graph
        .matching()
        .into_iter()
        .map(|m| m.map(|oi| free_ops[oi]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched_count(pairs: &[Option<usize>]) -> usize {
        pairs.iter().flatten().count()
    }

    #[test]
    fn test_perfect_matching_on_a_cycle() {
        // 0-0, 0-1, 1-1, 1-2, 2-2, 2-0: a 6-cycle has a perfect matching.
        let mut graph = HopcroftKarp::new(3, 3);
        for (l, r) in [(0, 0), (0, 1), (1, 1), (1, 2), (2, 2), (2, 0)] {
            graph.connect(l, r);
        }
        let pairs = graph.matching();
        assert_eq!(matched_count(&pairs), 3);
        let mut rights: Vec<usize> = pairs.into_iter().flatten().collect();
        rights.sort_unstable();
        assert_eq!(rights, vec![0, 1, 2], "no operator may be matched twice");
    }

    #[test]
    fn test_maximum_matching_with_a_bottleneck() {
        // Both seats only accept operator 0: at most one can be filled.
        let mut graph = HopcroftKarp::new(2, 2);
        graph.connect(0, 0);
        graph.connect(1, 0);
        let pairs = graph.matching();
        assert_eq!(
            matched_count(&pairs),
            1,
            "a shared sole candidate caps the matching at one"
        );
    }

    #[test]
    fn test_augmenting_path_reroutes_greedy_choices() {
        // Seat 0 accepts {0,1}, seat 1 accepts {0}: maximum is 2 but only
        // if seat 0 takes operator 1.
        let mut graph = HopcroftKarp::new(2, 2);
        graph.connect(0, 0);
        graph.connect(0, 1);
        graph.connect(1, 0);
        let pairs = graph.matching();
        assert_eq!(matched_count(&pairs), 2);
        assert_eq!(pairs[0], Some(1), "seat 0 must leave operator 0 for seat 1");
        assert_eq!(pairs[1], Some(0));
    }

    #[test]
    fn test_empty_graph_matches_nothing() {
        let graph = HopcroftKarp::new(3, 2);
        assert_eq!(matched_count(&graph.matching()), 0);
    }
}
