//! Post-compilation cleanups. The code generator leaves unreachable
//! continuation states behind (dead code after accept/reject/break) and
//! many structurally identical rewind loops; these passes prune and merge
//! them without changing accept/reject behavior on any input.

use crate::types::{State, Tm};
use std::collections::{BTreeSet, VecDeque};

/// Which optimization passes to run.
#[derive(Debug, Clone)]
pub struct OptConfig {
    pub eliminate_dead_states: bool,
    pub merge_equivalent_states: bool,
}

impl Default for OptConfig {
    fn default() -> Self {
        Self {
            eliminate_dead_states: true,
            merge_equivalent_states: true,
        }
    }
}

/// Runs the configured passes and re-finalizes the machine.
pub fn optimize(tm: &mut Tm, config: &OptConfig) {
    if config.eliminate_dead_states {
        eliminate_dead_states(tm);
    }
    if config.merge_equivalent_states {
        merge_equivalent_states(tm);
    }
    tm.finalize();
}

/// Removes states unreachable from the start state. Accept and reject are
/// always kept. Returns the number of removed states.
pub fn eliminate_dead_states(tm: &mut Tm) -> usize {
    let mut reachable: BTreeSet<State> = BTreeSet::new();
    let mut queue: VecDeque<State> = VecDeque::new();
    reachable.insert(tm.start.clone());
    queue.push_back(tm.start.clone());

    while let Some(state) = queue.pop_front() {
        if let Some(map) = tm.delta.get(&state) {
            for transition in map.values() {
                if reachable.insert(transition.next_state.clone()) {
                    queue.push_back(transition.next_state.clone());
                }
            }
        }
    }

    reachable.insert(tm.accept.clone());
    reachable.insert(tm.reject.clone());

    let doomed: Vec<State> = tm
        .states
        .iter()
        .filter(|s| !reachable.contains(*s))
        .cloned()
        .collect();

    for state in &doomed {
        tm.states.remove(state);
        tm.delta.remove(state);
    }
    doomed.len()
}

/// Merges pairs of states with identical transition tables, retargeting
/// every reference to the survivor, until a fixpoint. Start, accept and
/// reject are never merged away. Returns the number of merges.
pub fn merge_equivalent_states(tm: &mut Tm) -> usize {
    let mut merged = 0;

    loop {
        let candidates: Vec<State> = tm
            .states
            .iter()
            .filter(|s| **s != tm.start && **s != tm.accept && **s != tm.reject)
            .filter(|s| tm.delta.contains_key(*s))
            .cloned()
            .collect();

        let mut pair: Option<(State, State)> = None;
        'outer: for (i, a) in candidates.iter().enumerate() {
            for b in candidates.iter().skip(i + 1) {
                if tm.delta[a] == tm.delta[b] {
                    pair = Some((a.clone(), b.clone()));
                    break 'outer;
                }
            }
        }

        let Some((keep, drop)) = pair else {
            break;
        };

        for map in tm.delta.values_mut() {
            for transition in map.values_mut() {
                if transition.next_state == drop {
                    transition.next_state = keep.clone();
                }
            }
        }
        tm.delta.remove(&drop);
        tm.states.remove(&drop);
        merged += 1;
    }

    merged
}
