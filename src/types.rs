//! Core data structures shared across the compiler and simulator: tape
//! symbols, machine states, transitions, the compiled machine itself, and
//! the crate-wide error type.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::Rule;

/// The blank symbol filling every cell outside the written tape region.
pub const BLANK: char = '_';
/// Matches any read symbol in a transition lookup; as a write symbol it
/// means "write back whatever was read".
pub const WILDCARD: char = '?';
/// Sentinel written at cell 0 by the compiled preamble. Rewinding scans
/// left for this symbol; the left-bounded tape makes it a fixpoint.
pub const LEFT_END: char = '>';
/// Separator between variable regions on the tape.
pub const SEPARATOR: char = '#';
/// One unit of a unary tally inside a variable region.
pub const TALLY: char = '1';
/// A tally temporarily marked during a pairing pass.
pub const MARK: char = 'I';
/// Default simulator step budget.
pub const MAX_STEPS: usize = 1_000_000;

/// A single tape symbol.
pub type Symbol = char;

/// A machine state. Names are generated densely by the compiler and exist
/// for diagnostics and export; identity is the string itself.
pub type State = String;

/// The direction the head moves after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// One cell to the left (clamped at cell 0).
    Left,
    /// One cell to the right.
    Right,
    /// Stay in place.
    Stay,
}

/// A single transition rule: on reading `read`, write `write`, move
/// `direction` and enter `next_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub read: Symbol,
    pub write: Symbol,
    pub direction: Direction,
    pub next_state: State,
}

/// All transitions out of one state, keyed by the read symbol. The map
/// structure guarantees at most one transition per (state, symbol) pair.
pub type TransitionMap = BTreeMap<Symbol, Transition>;

/// A compiled single-tape deterministic Turing machine.
///
/// Built once by the compiler and immutable afterwards; the simulator
/// borrows it and owns its own configuration. Ordered collections keep
/// iteration (and therefore the exported form) stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tm {
    pub states: BTreeSet<State>,
    pub input_alphabet: BTreeSet<Symbol>,
    pub tape_alphabet: BTreeSet<Symbol>,
    pub start: State,
    pub accept: State,
    pub reject: State,
    pub delta: BTreeMap<State, TransitionMap>,
}

impl Tm {
    /// Inserts a transition, registering both states and both symbols as a
    /// side effect. An existing transition on the same (state, read) key is
    /// overwritten; callers are responsible for not doing so accidentally.
    pub fn add_transition(
        &mut self,
        from: &State,
        read: Symbol,
        write: Symbol,
        direction: Direction,
        to: &State,
    ) {
        self.states.insert(from.clone());
        self.states.insert(to.clone());
        self.tape_alphabet.insert(read);
        self.tape_alphabet.insert(write);
        self.delta.entry(from.clone()).or_default().insert(
            read,
            Transition {
                read,
                write,
                direction,
                next_state: to.clone(),
            },
        );
    }

    /// Ensures the blank and the declared input alphabet are in the tape
    /// alphabet, and that the three distinguished states are registered.
    pub fn finalize(&mut self) {
        self.tape_alphabet.insert(BLANK);
        let input: Vec<Symbol> = self.input_alphabet.iter().copied().collect();
        for s in input {
            self.tape_alphabet.insert(s);
        }
        self.states.insert(self.start.clone());
        self.states.insert(self.accept.clone());
        self.states.insert(self.reject.clone());
    }

    /// Total number of transitions across all states.
    pub fn transition_count(&self) -> usize {
        self.delta.values().map(|m| m.len()).sum()
    }
}

/// Outcome of a single simulator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A transition fired and the machine keeps running.
    Continue,
    /// The machine is halted (in the accept or reject state).
    Halted,
}

/// Result of running a machine on one input to completion or exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// True iff the machine halted in the accept state.
    pub accepted: bool,
    /// Number of transitions taken.
    pub steps: usize,
    /// Tape contents at the end, blanks trimmed from both ends.
    pub final_tape: String,
    /// True iff the step budget ran out while the machine was still running.
    pub hit_limit: bool,
}

/// A snapshot of the simulator at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub tape: Vec<Symbol>,
    pub head: usize,
    pub state: State,
}

/// Errors surfaced by parsing, compilation, validation and file loading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The source text is not a well-formed program.
    #[error("parse error: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    /// A well-formed statement uses a construct the lowering does not
    /// support. No machine is produced.
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    /// A compiled or imported machine failed a structural check.
    #[error("validation error: {0}")]
    Validation(String),
    /// A program file could not be read.
    #[error("file error: {0}")]
    File(String),
}
