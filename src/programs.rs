//! Embedded demonstration programs. The sources live under `demos/` and
//! are parsed once into a shared registry.

use crate::ast::Program;
use crate::types::CompileError;
use std::sync::RwLock;

const PROGRAM_SOURCES: [(&str, &str); 6] = [
    ("anbn", include_str!("../demos/anbn.tmc")),
    ("astar-bstar", include_str!("../demos/astar-bstar.tmc")),
    ("triangular", include_str!("../demos/triangular.tmc")),
    ("bookends", include_str!("../demos/bookends.tmc")),
    ("count-copy", include_str!("../demos/count-copy.tmc")),
    ("double", include_str!("../demos/double.tmc")),
];

lazy_static::lazy_static! {
    pub static ref PROGRAMS: RwLock<Vec<(String, Program)>> = RwLock::new(Vec::new());
}

/// Access to the embedded program registry.
pub struct ProgramManager;

impl ProgramManager {
    /// Parses the embedded sources into the registry. Safe to call more
    /// than once.
    pub fn load() -> Result<(), CompileError> {
        let mut programs = Vec::new();
        for (name, source) in PROGRAM_SOURCES {
            let program = crate::parser::parse(source)?;
            programs.push((name.to_string(), program));
        }

        let mut guard = PROGRAMS
            .write()
            .map_err(|_| CompileError::File("failed to acquire registry lock".to_string()))?;
        *guard = programs;
        Ok(())
    }

    /// Number of embedded programs.
    pub fn program_count() -> usize {
        let _ = Self::load();
        PROGRAMS.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Fetches a program by position.
    pub fn program_by_index(index: usize) -> Result<Program, CompileError> {
        let _ = Self::load();
        PROGRAMS
            .read()
            .map_err(|_| CompileError::File("failed to acquire registry lock".to_string()))?
            .get(index)
            .map(|(_, program)| program.clone())
            .ok_or_else(|| {
                CompileError::Validation(format!("program index {} out of range", index))
            })
    }

    /// Fetches a program by name.
    pub fn program_by_name(name: &str) -> Result<Program, CompileError> {
        let _ = Self::load();
        PROGRAMS
            .read()
            .map_err(|_| CompileError::File("failed to acquire registry lock".to_string()))?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, program)| program.clone())
            .ok_or_else(|| CompileError::Validation(format!("program '{}' not found", name)))
    }

    /// Names of all embedded programs, in registry order.
    pub fn list_program_names() -> Vec<String> {
        let _ = Self::load();
        PROGRAMS
            .read()
            .map(|programs| programs.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    /// The original source text of a program.
    pub fn source_by_name(name: &str) -> Result<&'static str, CompileError> {
        PROGRAM_SOURCES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, source)| *source)
            .ok_or_else(|| CompileError::Validation(format!("program '{}' not found", name)))
    }
}
