//! Loading of `.tmc` program sources from files, strings, and
//! directories.

use crate::ast::Program;
use crate::parser::parse;
use crate::types::CompileError;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension a program file must carry to be picked up by the directory
/// walk.
const PROGRAM_EXTENSION: &str = "tmc";

/// Wraps a filesystem failure with the path it happened on.
fn read_error(path: &Path, cause: &dyn Display) -> CompileError {
    CompileError::File(format!("{}: {}", path.display(), cause))
}

/// Utility for loading decision-procedure programs.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Reads and parses a single `.tmc` file.
    ///
    /// # Arguments
    ///
    /// * `path` - The program file to load.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file was read and parsed.
    /// * `Err(CompileError::File)` if the file could not be read.
    /// * `Err(CompileError::Parse)` if its content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, CompileError> {
        match fs::read_to_string(path) {
            Ok(source) => parse(&source),
            Err(cause) => Err(read_error(path, &cause)),
        }
    }

    /// Parses a program from in-memory source text, for sources that never
    /// touch the filesystem (embedded programs, user input).
    pub fn load_program_from_string(content: &str) -> Result<Program, CompileError> {
        parse(content)
    }

    /// Loads every `.tmc` file in a directory.
    ///
    /// Failures are split by level: the outer `Result` covers the
    /// directory walk itself, while each file carries its own parse
    /// outcome so one broken program does not hide the rest. Entries come
    /// back sorted by path, so the order is stable across platforms.
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory to scan. Subdirectories and files
    ///   with other extensions are skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(entries)` with one `(path, Result<Program, _>)` per `.tmc`
    ///   file found.
    /// * `Err(CompileError::File)` if the directory itself cannot be read.
    pub fn load_programs(
        directory: &Path,
    ) -> Result<Vec<(PathBuf, Result<Program, CompileError>)>, CompileError> {
        let entries = fs::read_dir(directory).map_err(|cause| read_error(directory, &cause))?;

        let mut loaded = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|cause| read_error(directory, &cause))?
                .path();
            let is_program = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == PROGRAM_EXTENSION);
            if is_program {
                let result = Self::load_program(&path);
                loaded.push((path, result));
            }
        }

        loaded.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(loaded)
    }
}
