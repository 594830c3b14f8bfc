//! Textual export of a compiled machine, and the inverse parse. The
//! format is a flat, human-readable declaration: states, alphabets, the
//! three distinguished state names, and a two-level transition map. The
//! accept and reject states carry no entries in the map.

use crate::types::{Direction, State, Symbol, Tm, BLANK, WILDCARD};
use std::collections::BTreeSet;

/// Symbols that need quoting to stay unambiguous in the output.
fn needs_quotes(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(
            c,
            ':' | '#' | '\'' | '"' | '[' | ']' | '{' | '}' | '!' | '|' | '>' | '*' | '&' | ','
        )
    })
}

fn escape_name(name: &str) -> String {
    if needs_quotes(name) {
        format!("'{}'", name)
    } else {
        name.to_string()
    }
}

fn symbol_to_str(sym: Symbol) -> String {
    if sym == BLANK {
        return "_".to_string();
    }
    if sym == WILDCARD {
        return "'?'".to_string();
    }
    escape_name(&sym.to_string())
}

fn direction_to_str(direction: Direction) -> &'static str {
    match direction {
        Direction::Left => "L",
        Direction::Right => "R",
        Direction::Stay => "S",
    }
}

/// Serializes a machine to its textual form.
pub fn encode(tm: &Tm) -> String {
    let mut out = String::new();

    let states: Vec<String> = tm.states.iter().map(|s| escape_name(s)).collect();
    out.push_str(&format!("states: [{}]\n", states.join(", ")));

    let input: Vec<String> = tm
        .input_alphabet
        .iter()
        .map(|&s| symbol_to_str(s))
        .collect();
    out.push_str(&format!("input_alphabet: [{}]\n", input.join(", ")));

    let extra: BTreeSet<Symbol> = tm
        .tape_alphabet
        .iter()
        .copied()
        .filter(|s| *s != BLANK && !tm.input_alphabet.contains(s))
        .collect();
    if !extra.is_empty() {
        let extra: Vec<String> = extra.iter().map(|&s| symbol_to_str(s)).collect();
        out.push_str(&format!("tape_alphabet_extra: [{}]\n", extra.join(", ")));
    }

    out.push_str(&format!("start_state: {}\n", escape_name(&tm.start)));
    out.push_str(&format!("accept_state: {}\n", escape_name(&tm.accept)));
    out.push_str(&format!("reject_state: {}\n", escape_name(&tm.reject)));

    out.push_str("\ndelta:\n");
    for (state, map) in &tm.delta {
        if *state == tm.accept || *state == tm.reject {
            continue;
        }
        out.push_str(&format!("  {}:\n", escape_name(state)));
        for (&sym, transition) in map {
            out.push_str(&format!(
                "    {}: [{}, {}, {}]\n",
                symbol_to_str(sym),
                escape_name(&transition.next_state),
                symbol_to_str(transition.write),
                direction_to_str(transition.direction)
            ));
        }
    }

    out
}

fn unescape(token: &str) -> String {
    let token = token.trim();
    token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(token)
        .to_string()
}

fn symbol_from_str(token: &str) -> Result<Symbol, String> {
    let unescaped = unescape(token);
    unescaped
        .chars()
        .next()
        .ok_or_else(|| format!("empty symbol token '{}'", token))
}

fn direction_from_str(token: &str) -> Result<Direction, String> {
    match token.trim() {
        "L" => Ok(Direction::Left),
        "R" => Ok(Direction::Right),
        "S" => Ok(Direction::Stay),
        other => Err(format!("invalid direction '{}'", other)),
    }
}

fn parse_bracket_list(value: &str) -> Result<Vec<String>, String> {
    let value = value.trim();
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| format!("expected a [..] list, got '{}'", value))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(unescape).collect())
}

/// Parses the textual form back into a machine.
///
/// Transition insertion registers states and symbols as a side effect, so
/// a decoded machine validates like a freshly compiled one.
pub fn decode(text: &str) -> Result<Tm, String> {
    let mut tm = Tm::default();
    let mut current_state: Option<State> = None;
    let mut in_delta = false;

    for raw in text.lines() {
        if raw.trim().is_empty() {
            continue;
        }

        if !in_delta {
            let line = raw.trim();
            if let Some(value) = line.strip_prefix("states:") {
                for name in parse_bracket_list(value)? {
                    tm.states.insert(name);
                }
            } else if let Some(value) = line.strip_prefix("input_alphabet:") {
                for sym in parse_bracket_list(value)? {
                    tm.input_alphabet.insert(symbol_from_str(&sym)?);
                }
            } else if let Some(value) = line.strip_prefix("tape_alphabet_extra:") {
                for sym in parse_bracket_list(value)? {
                    tm.tape_alphabet.insert(symbol_from_str(&sym)?);
                }
            } else if let Some(value) = line.strip_prefix("start_state:") {
                tm.start = unescape(value);
            } else if let Some(value) = line.strip_prefix("accept_state:") {
                tm.accept = unescape(value);
            } else if let Some(value) = line.strip_prefix("reject_state:") {
                tm.reject = unescape(value);
            } else if line == "delta:" {
                in_delta = true;
            } else {
                return Err(format!("unrecognized line '{}'", line));
            }
            continue;
        }

        // Inside delta: two-space indent introduces a state, four-space
        // indent a transition under the current state.
        if let Some(position) = raw.find(": [") {
            let state = current_state
                .clone()
                .ok_or_else(|| format!("transition line before any state: '{}'", raw.trim()))?;
            let sym = symbol_from_str(&raw[..position])?;
            let fields = parse_bracket_list(&raw[position + 2..])?;
            if fields.len() != 3 {
                return Err(format!("expected [next, write, dir] in '{}'", raw.trim()));
            }
            let next = fields[0].clone();
            let write = symbol_from_str(&fields[1])?;
            let direction = direction_from_str(&fields[2])?;
            tm.add_transition(&state, sym, write, direction, &next);
        } else if let Some(name) = raw.trim().strip_suffix(':') {
            current_state = Some(unescape(name));
        } else {
            return Err(format!("unrecognized delta line '{}'", raw.trim()));
        }
    }

    tm.finalize();
    Ok(tm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tm() -> Tm {
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
        tm.add_transition(&q0, 'a', 'A', Direction::Right, &q1);
        tm.add_transition(&q0, '>', '>', Direction::Right, &q0);
        tm.add_transition(&q0, BLANK, BLANK, Direction::Stay, &qa);
        tm.add_transition(&q1, 'b', 'b', Direction::Left, &q0);
        tm.finalize();
        tm
    }

    #[test]
    fn test_encode_contains_sections() {
        let tm = sample_tm();
        let text = encode(&tm);

        assert!(text.contains("states: ["));
        assert!(text.contains("input_alphabet: [a, b]"));
        assert!(text.contains("start_state: q0"));
        assert!(text.contains("accept_state: qA"));
        assert!(text.contains("reject_state: qR"));
        assert!(text.contains("delta:"));
        assert!(text.contains("a: [q1, A, R]"));
    }

    #[test]
    fn test_encode_quotes_special_symbols() {
        let tm = sample_tm();
        let text = encode(&tm);
        assert!(text.contains("'>'"));
        // The blank prints bare.
        assert!(text.contains("_: [qA, _, S]"));
    }

    #[test]
    fn test_halt_states_have_no_delta_entries() {
        let mut tm = sample_tm();
        // Force an entry that encode must skip.
        tm.delta.entry("qA".to_string()).or_default();
        let text = encode(&tm);
        assert!(!text.contains("  qA:\n"));
        assert!(!text.contains("  qR:\n"));
    }

    #[test]
    fn test_round_trip() {
        let tm = sample_tm();
        let text = encode(&tm);
        let back = decode(&text).unwrap();

        assert_eq!(back.start, tm.start);
        assert_eq!(back.accept, tm.accept);
        assert_eq!(back.reject, tm.reject);
        assert_eq!(back.input_alphabet, tm.input_alphabet);
        assert_eq!(back.tape_alphabet, tm.tape_alphabet);
        assert_eq!(back.delta, tm.delta);
        assert_eq!(back.states, tm.states);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("nonsense here").is_err());
    }

    #[test]
    fn test_decode_rejects_malformed_transition() {
        let text = "states: [q0]\nstart_state: q0\naccept_state: qA\nreject_state: qR\ndelta:\n  q0:\n    a: [q0, a]\n";
        assert!(decode(text).is_err());
    }
}
