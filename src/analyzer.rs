//! Structural validation of compiled machines. A successful compilation
//! followed by a failed validation is a bug in the code generator, so
//! these checks are cheap to run after every compile and import.

use crate::types::{CompileError, Tm, BLANK, WILDCARD};

/// Problems a machine can exhibit, found during analysis.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// One of start/accept/reject is missing from the state set.
    MissingSpecialState(String),
    /// A transition's source state is not in the state set.
    UnknownSourceState(String),
    /// A transition reads a symbol outside the tape alphabet.
    UnknownReadSymbol(String, char),
    /// A transition targets a state not in the state set.
    UnknownTargetState(String, String),
    /// The input alphabet is not contained in the tape alphabet.
    InputNotInTapeAlphabet(char),
    /// The blank symbol is missing from the tape alphabet.
    MissingBlank,
    /// The accept or reject state has outgoing transitions.
    HaltStateNotTerminal(String),
}

impl From<AnalysisError> for CompileError {
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::MissingSpecialState(state) => {
                CompileError::Validation(format!("state '{}' is not in the state set", state))
            }
            AnalysisError::UnknownSourceState(state) => CompileError::Validation(format!(
                "transition table references unknown state '{}'",
                state
            )),
            AnalysisError::UnknownReadSymbol(state, sym) => CompileError::Validation(format!(
                "state '{}' reads symbol '{}' outside the tape alphabet",
                state, sym
            )),
            AnalysisError::UnknownTargetState(state, target) => CompileError::Validation(format!(
                "state '{}' targets unknown state '{}'",
                state, target
            )),
            AnalysisError::InputNotInTapeAlphabet(sym) => CompileError::Validation(format!(
                "input symbol '{}' is not in the tape alphabet",
                sym
            )),
            AnalysisError::MissingBlank => {
                CompileError::Validation("blank symbol missing from tape alphabet".to_string())
            }
            AnalysisError::HaltStateNotTerminal(state) => CompileError::Validation(format!(
                "halt state '{}' has outgoing transitions",
                state
            )),
        }
    }
}

/// Validates a machine, returning the first problem found.
pub fn validate(tm: &Tm) -> Result<(), CompileError> {
    let checks = [
        check_special_states,
        check_transitions,
        check_alphabets,
        check_halt_states,
    ];

    for check in checks {
        check(tm)?;
    }

    Ok(())
}

fn check_special_states(tm: &Tm) -> Result<(), CompileError> {
    for state in [&tm.start, &tm.accept, &tm.reject] {
        if !tm.states.contains(state) {
            return Err(AnalysisError::MissingSpecialState(state.clone()).into());
        }
    }
    Ok(())
}

fn check_transitions(tm: &Tm) -> Result<(), CompileError> {
    for (state, map) in &tm.delta {
        if !tm.states.contains(state) {
            return Err(AnalysisError::UnknownSourceState(state.clone()).into());
        }
        for (&sym, transition) in map {
            if sym != WILDCARD && !tm.tape_alphabet.contains(&sym) {
                return Err(AnalysisError::UnknownReadSymbol(state.clone(), sym).into());
            }
            if !tm.states.contains(&transition.next_state) {
                return Err(AnalysisError::UnknownTargetState(
                    state.clone(),
                    transition.next_state.clone(),
                )
                .into());
            }
        }
    }
    Ok(())
}

fn check_alphabets(tm: &Tm) -> Result<(), CompileError> {
    for &sym in &tm.input_alphabet {
        if !tm.tape_alphabet.contains(&sym) {
            return Err(AnalysisError::InputNotInTapeAlphabet(sym).into());
        }
    }
    if !tm.tape_alphabet.contains(&BLANK) {
        return Err(AnalysisError::MissingBlank.into());
    }
    Ok(())
}

fn check_halt_states(tm: &Tm) -> Result<(), CompileError> {
    for state in [&tm.accept, &tm.reject] {
        if tm.delta.get(state).is_some_and(|map| !map.is_empty()) {
            return Err(AnalysisError::HaltStateNotTerminal(state.clone()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn minimal_tm() -> Tm {
        let mut tm = Tm {
            start: "q0".to_string(),
            accept: "qA".to_string(),
            reject: "qR".to_string(),
            ..Tm::default()
        };
        tm.input_alphabet.insert('a');
        tm.add_transition(&"q0".to_string(), 'a', 'a', Direction::Stay, &"qA".to_string());
        tm.add_transition(&"q0".to_string(), BLANK, BLANK, Direction::Stay, &"qR".to_string());
        tm.finalize();
        tm
    }

    #[test]
    fn test_valid_machine() {
        let tm = minimal_tm();
        assert!(validate(&tm).is_ok());
    }

    #[test]
    fn test_missing_start_state() {
        let mut tm = minimal_tm();
        tm.states.remove("q0");
        // The delta entry keeps the validation failing either way; the
        // special-state check fires first.
        let error = validate(&tm).unwrap_err();
        assert!(error.to_string().contains("'q0'"));
    }

    #[test]
    fn test_dangling_target_state() {
        let mut tm = minimal_tm();
        tm.add_transition(&"q0".to_string(), 'b', 'b', Direction::Stay, &"ghost".to_string());
        tm.states.remove("ghost");

        let error = validate(&tm).unwrap_err();
        assert!(error.to_string().contains("ghost"));
    }

    #[test]
    fn test_unknown_read_symbol() {
        let mut tm = minimal_tm();
        tm.add_transition(&"q0".to_string(), 'z', 'z', Direction::Stay, &"qA".to_string());
        tm.tape_alphabet.remove(&'z');

        let error = validate(&tm).unwrap_err();
        assert!(error.to_string().contains("'z'"));
    }

    #[test]
    fn test_wildcard_read_is_allowed() {
        let mut tm = minimal_tm();
        tm.add_transition(&"q0".to_string(), WILDCARD, WILDCARD, Direction::Stay, &"qA".to_string());
        tm.tape_alphabet.remove(&WILDCARD);
        assert!(validate(&tm).is_ok());
    }

    #[test]
    fn test_input_outside_tape_alphabet() {
        let mut tm = minimal_tm();
        tm.input_alphabet.insert('q');

        let error = validate(&tm).unwrap_err();
        assert!(error.to_string().contains("'q'"));
    }

    #[test]
    fn test_missing_blank() {
        let mut tm = minimal_tm();
        tm.delta.get_mut("q0").unwrap().remove(&BLANK);
        tm.tape_alphabet.remove(&BLANK);

        let error = validate(&tm).unwrap_err();
        assert!(error.to_string().contains("blank"));
    }

    #[test]
    fn test_halt_state_with_outgoing_transitions() {
        let mut tm = minimal_tm();
        tm.add_transition(&"qA".to_string(), 'a', 'a', Direction::Stay, &"q0".to_string());

        let error = validate(&tm).unwrap_err();
        assert!(error.to_string().contains("qA"));
    }
}
