//! End-to-end pipeline tests: every embedded program goes through parse,
//! compile, validate, optimize, export and import, and the machines on
//! both ends of the round trip must agree on a spread of inputs.

use tmc::machine::Machine;
use tmc::optimizer::{optimize, OptConfig};
use tmc::programs::ProgramManager;
use tmc::types::Tm;

fn compile_demo(name: &str) -> Tm {
    let program = ProgramManager::program_by_name(name).unwrap();
    let tm = tmc::compile(&program).unwrap();
    tmc::validate(&tm).unwrap();
    tm
}

fn accepts(tm: &Tm, input: &str) -> bool {
    let mut machine = Machine::with_max_steps(tm, 10_000_000);
    let result = machine.run(input);
    assert!(!result.hit_limit, "step limit hit on {:?}", input);
    result.accepted
}

/// Inputs used for the cross-stage agreement checks.
const SAMPLE_INPUTS: &[&str] = &[
    "", "a", "b", "ab", "ba", "aa", "bb", "aab", "abb", "aabb", "abab", "aabbb", "bbaa",
    "aaabbb", "aaabbbbbb",
];

#[test]
fn optimized_and_decoded_machines_agree_with_the_original() {
    for name in ProgramManager::list_program_names() {
        let original = compile_demo(&name);

        let mut optimized = original.clone();
        optimize(&mut optimized, &OptConfig::default());
        tmc::validate(&optimized).unwrap();

        let text = tmc::encode(&optimized);
        let decoded = tmc::decode(&text).unwrap();
        tmc::validate(&decoded).unwrap();

        for input in SAMPLE_INPUTS {
            let expected = accepts(&original, input);
            assert_eq!(
                accepts(&optimized, input),
                expected,
                "program '{}': optimization changed the verdict on {:?}",
                name,
                input
            );
            assert_eq!(
                accepts(&decoded, input),
                expected,
                "program '{}': export round trip changed the verdict on {:?}",
                name,
                input
            );
        }
    }
}

#[test]
fn optimization_shrinks_the_state_graph() {
    let original = compile_demo("triangular");
    let mut optimized = original.clone();
    optimize(&mut optimized, &OptConfig::default());
    assert!(optimized.states.len() < original.states.len());
}

#[test]
fn anbn_point_expectations() {
    let tm = compile_demo("anbn");
    for input in ["", "ab", "aabb", "aaabbb"] {
        assert!(accepts(&tm, input), "{:?} should accept", input);
    }
    for input in ["a", "b", "ba", "aab"] {
        assert!(!accepts(&tm, input), "{:?} should reject", input);
    }
}

#[test]
fn astar_bstar_point_expectations() {
    let tm = compile_demo("astar-bstar");
    for input in ["", "a", "aaa", "b", "bbb", "ab", "aabb"] {
        assert!(accepts(&tm, input), "{:?} should accept", input);
    }
    for input in ["ba", "aba", "abba"] {
        assert!(!accepts(&tm, input), "{:?} should reject", input);
    }
}

#[test]
fn triangular_point_expectations() {
    let tm = compile_demo("triangular");
    for input in ["", "ab", "aabbb", "aaabbbbbb"] {
        assert!(accepts(&tm, input), "{:?} should accept", input);
    }
    for input in ["a", "b", "aabb", "ba"] {
        assert!(!accepts(&tm, input), "{:?} should reject", input);
    }
}

#[test]
fn bookends_point_expectations() {
    let tm = compile_demo("bookends");
    for input in ["a", "aa", "aba", "abba", "aabba"] {
        assert!(accepts(&tm, input), "{:?} should accept", input);
    }
    for input in ["", "b", "ab", "ba", "bab"] {
        assert!(!accepts(&tm, input), "{:?} should reject", input);
    }
}

#[test]
fn double_point_expectations() {
    let tm = compile_demo("double");
    for input in ["", "abb", "bba", "aabbbb"] {
        assert!(accepts(&tm, input), "{:?} should accept", input);
    }
    for input in ["a", "b", "ab", "abbb", "aabb"] {
        assert!(!accepts(&tm, input), "{:?} should reject", input);
    }
}

#[test]
fn loading_from_disk_matches_the_embedded_copy() {
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let path = dir.path().join("anbn.tmc");
    File::create(&path)
        .unwrap()
        .write_all(ProgramManager::source_by_name("anbn").unwrap().as_bytes())
        .unwrap();

    let from_disk = tmc::ProgramLoader::load_program(&path).unwrap();
    let embedded = ProgramManager::program_by_name("anbn").unwrap();
    assert_eq!(from_disk, embedded);

    let tm = tmc::compile(&from_disk).unwrap();
    assert!(accepts(&tm, "aabb"));
    assert!(!accepts(&tm, "aab"));
}
