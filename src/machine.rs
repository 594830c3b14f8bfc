//! Deterministic one-step-at-a-time executor for compiled machines. The
//! machine borrows an immutable [`Tm`] and owns its configuration (tape,
//! head, state, step counter), which `reset` rebuilds for each run.

use crate::types::{Config, RunResult, Step, Symbol, Tm, BLANK, MAX_STEPS, WILDCARD};

/// A simulator for a single-tape, left-bounded Turing machine.
pub struct Machine<'a> {
    tm: &'a Tm,
    max_steps: usize,
    tape: Vec<Symbol>,
    head: usize,
    state: String,
    steps: usize,
    halted: bool,
}

impl<'a> Machine<'a> {
    /// Creates a machine with the default step budget.
    pub fn new(tm: &'a Tm) -> Self {
        Self::with_max_steps(tm, MAX_STEPS)
    }

    /// Creates a machine with an explicit step budget.
    pub fn with_max_steps(tm: &'a Tm, max_steps: usize) -> Self {
        Self {
            tm,
            max_steps,
            tape: Vec::new(),
            head: 0,
            state: tm.start.clone(),
            steps: 0,
            halted: false,
        }
    }

    /// Loads an input starting at cell 0 and rewinds everything else. An
    /// empty input yields a single-blank tape.
    pub fn reset(&mut self, input: &str) {
        self.tape = input.chars().collect();
        if self.tape.is_empty() {
            self.tape.push(BLANK);
        }
        self.head = 0;
        self.state = self.tm.start.clone();
        self.steps = 0;
        self.halted = false;
    }

    /// Performs one transition.
    ///
    /// A missing transition falls back to the wildcard entry for the
    /// current state; if that is also absent, the machine moves to the
    /// reject state and halts without consuming a step. Moving left from
    /// cell 0 stays at cell 0.
    pub fn step(&mut self) -> Step {
        if self.halted {
            return Step::Halted;
        }
        if self.state == self.tm.accept || self.state == self.tm.reject {
            self.halted = true;
            return Step::Halted;
        }

        let read = self.tape.get(self.head).copied().unwrap_or(BLANK);

        let transition = self
            .tm
            .delta
            .get(&self.state)
            .and_then(|map| map.get(&read).or_else(|| map.get(&WILDCARD)));

        let transition = match transition {
            Some(t) => t.clone(),
            None => {
                self.state = self.tm.reject.clone();
                self.halted = true;
                return Step::Halted;
            }
        };

        if self.head >= self.tape.len() {
            self.tape.resize(self.head + 1, BLANK);
        }

        let write = if transition.write == WILDCARD {
            read
        } else {
            transition.write
        };
        self.tape[self.head] = write;

        match transition.direction {
            crate::types::Direction::Left => self.head = self.head.saturating_sub(1),
            crate::types::Direction::Right => self.head += 1,
            crate::types::Direction::Stay => {}
        }

        self.state = transition.next_state;
        self.steps += 1;

        if self.state == self.tm.accept || self.state == self.tm.reject {
            self.halted = true;
            Step::Halted
        } else {
            Step::Continue
        }
    }

    /// Resets and runs until the machine halts or the step budget is
    /// exhausted. Repeated calls with the same input produce identical
    /// results.
    pub fn run(&mut self, input: &str) -> RunResult {
        self.reset(input);

        while !self.halted && self.steps < self.max_steps {
            self.step();
        }

        RunResult {
            accepted: self.accepted(),
            steps: self.steps,
            final_tape: self.trimmed_tape(),
            hit_limit: self.steps >= self.max_steps && !self.halted,
        }
    }

    /// True once the machine has entered the accept or reject state.
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// True iff the machine halted in the accept state.
    pub fn accepted(&self) -> bool {
        self.halted && self.state == self.tm.accept
    }

    /// Number of transitions taken since the last reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The current state name.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// A snapshot of the current configuration.
    pub fn current_config(&self) -> Config {
        Config {
            tape: self.tape.clone(),
            head: self.head,
            state: self.state.clone(),
        }
    }

    fn trimmed_tape(&self) -> String {
        let s: String = self.tape.iter().collect();
        s.trim_matches(BLANK).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    /// A two-state machine that scans right over `a`s and accepts at the
    /// first blank.
    fn scan_machine() -> Tm {
        let mut tm = Tm {
            start: "q0".to_string(),
            accept: "qA".to_string(),
            reject: "qR".to_string(),
            ..Tm::default()
        };
        tm.input_alphabet.insert('a');
        let q0 = "q0".to_string();
        let qa = "qA".to_string();
        tm.add_transition(&q0, 'a', 'a', Direction::Right, &q0);
        tm.add_transition(&q0, BLANK, BLANK, Direction::Stay, &qa);
        tm.finalize();
        tm
    }

    #[test]
    fn test_run_accepts_and_counts_steps() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        let result = machine.run("aaaa");

        assert!(result.accepted);
        assert_eq!(result.steps, 5);
        assert!(!result.hit_limit);
    }

    #[test]
    fn test_run_is_idempotent() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        let first = machine.run("aaa");
        let second = machine.run("aaa");
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input_single_blank_tape() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        machine.reset("");

        let config = machine.current_config();
        assert_eq!(config.tape, vec![BLANK]);
        assert_eq!(config.head, 0);
        assert_eq!(config.state, "q0");
    }

    #[test]
    fn test_missing_transition_soft_rejects() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        let result = machine.run("b");

        assert!(!result.accepted);
        assert_eq!(result.steps, 0);
        assert!(machine.halted());
        assert_eq!(machine.state(), "qR");
    }

    #[test]
    fn test_wildcard_read_fallback_and_write() {
        let mut tm = Tm {
            start: "q0".to_string(),
            accept: "qA".to_string(),
            reject: "qR".to_string(),
            ..Tm::default()
        };
        tm.input_alphabet.insert('a');
        tm.input_alphabet.insert('b');
        let q0 = "q0".to_string();
        let q1 = "q1".to_string();
        let qa = "qA".to_string();
        // Only 'a' has an exact entry; everything else matches the wildcard
        // and keeps the read symbol.
        tm.add_transition(&q0, 'a', 'x', Direction::Right, &q1);
        tm.add_transition(&q0, WILDCARD, WILDCARD, Direction::Right, &q1);
        tm.add_transition(&q1, WILDCARD, WILDCARD, Direction::Stay, &qa);
        tm.finalize();

        let mut machine = Machine::new(&tm);
        let result = machine.run("b");
        assert!(result.accepted);
        assert_eq!(result.final_tape, "b");

        let result = machine.run("a");
        assert!(result.accepted);
        assert_eq!(result.final_tape, "x");
    }

    #[test]
    fn test_left_from_cell_zero_stays() {
        let mut tm = Tm {
            start: "q0".to_string(),
            accept: "qA".to_string(),
            reject: "qR".to_string(),
            ..Tm::default()
        };
        tm.input_alphabet.insert('a');
        let q0 = "q0".to_string();
        let q1 = "q1".to_string();
        let qa = "qA".to_string();
        tm.add_transition(&q0, 'a', 'a', Direction::Left, &q1);
        tm.add_transition(&q1, 'a', 'b', Direction::Stay, &qa);
        tm.finalize();

        let mut machine = Machine::new(&tm);
        let result = machine.run("a");
        // The L move clamps at cell 0, so q1 still reads the same cell.
        assert!(result.accepted);
        assert_eq!(result.final_tape, "b");
    }

    #[test]
    fn test_step_budget_reports_hit_limit() {
        let mut tm = Tm {
            start: "q0".to_string(),
            accept: "qA".to_string(),
            reject: "qR".to_string(),
            ..Tm::default()
        };
        tm.input_alphabet.insert('a');
        let q0 = "q0".to_string();
        tm.add_transition(&q0, 'a', 'a', Direction::Stay, &q0);
        tm.add_transition(&q0, BLANK, BLANK, Direction::Stay, &q0);
        tm.finalize();

        let mut machine = Machine::with_max_steps(&tm, 100);
        let result = machine.run("a");

        assert!(!result.accepted);
        assert!(result.hit_limit);
        assert_eq!(result.steps, 100);
    }

    #[test]
    fn test_final_tape_trims_blanks() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        let result = machine.run("aa");
        // The scan extends the tape with one blank on the right; trimming
        // removes it.
        assert_eq!(result.final_tape, "aa");
    }

    #[test]
    fn test_step_after_halt_is_inert() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        machine.run("a");
        let steps = machine.steps();
        assert_eq!(machine.step(), Step::Halted);
        assert_eq!(machine.steps(), steps);
    }

    #[test]
    fn test_tape_extends_right_with_blanks() {
        let tm = scan_machine();
        let mut machine = Machine::new(&tm);
        machine.reset("a");
        machine.step();
        let config = machine.current_config();
        assert_eq!(config.head, 1);
        machine.step();
        // Reading past the materialized end behaves as blank.
        assert!(machine.accepted());
    }
}
