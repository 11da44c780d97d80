//! Lint contracts defined with the icontract library
//!
//! Statically checks that `@require`, `@ensure`, `@snapshot` and
//! `@invariant` decorators use argument names consistent with the decorated
//! function's signature, so that the mismatch is caught at parse time
//! instead of surfacing as a runtime error once the contract executes.
//!
//! Entry points are [`check_file`], [`check_recursively`] and
//! [`check_paths`]; all of them return the errors as data and never fail,
//! so no single bad file can abort a batch run.

pub mod error;
pub mod infer;
pub mod lint;
pub mod output;
pub mod parse;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

pub use error::{Error, ErrorId};

/// Line that disables linting for the whole file
fn disabled_directive() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(r"^\s*#\s*pyicontract-lint\s*:\s*disabled\s*$")
            .expect("the directive pattern is a valid regex")
    })
}

/// Parse the file as Python code and lint its contracts
///
/// A read failure yields a single `unreadable` error and a parse failure a
/// single `invalid-syntax` error; a file carrying the
/// `# pyicontract-lint: disabled` directive yields no errors at all, even
/// if it would not parse.
pub fn check_file(path: &Path) -> Vec<Error> {
    let filename = path.display().to_string();
    debug!(file = %filename, "checking");

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            return vec![Error::new(ErrorId::Unreadable, err.to_string(), filename, None)];
        }
    };

    // The directive gate runs before the parse so that it also shields
    // files with invalid syntax.
    if text.lines().any(|line| disabled_directive().is_match(line)) {
        debug!(file = %filename, "linting disabled by directive");
        return Vec::new();
    }

    let module = match parse::parse_module(&text, &filename) {
        Ok(module) => module,
        Err(failure) => {
            debug!(file = %filename, line = ?failure.lineno, "invalid syntax");
            return vec![Error::new(
                ErrorId::InvalidSyntax,
                failure.message,
                filename,
                failure.lineno,
            )];
        }
    };

    lint::lint_module(&module, &filename)
}

/// Lint all `*.py` files beneath the directory, in sorted path order
pub fn check_recursively(path: &Path) -> Vec<Error> {
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|extension| extension == "py"))
        .collect();
    files.sort();

    let mut errors = Vec::new();
    for file in &files {
        errors.extend(check_file(file));
    }
    errors
}

/// Lint the given paths, in input order
///
/// Directories are recursively linted for `*.py` files. A path that is
/// neither a file nor a directory degrades to an `unreadable` error so that
/// the rest of the batch still runs.
pub fn check_paths(paths: &[PathBuf]) -> Vec<Error> {
    let mut errors = Vec::new();
    for path in paths {
        if path.is_dir() {
            errors.extend(check_recursively(path));
        } else {
            errors.extend(check_file(path));
        }
    }
    debug!(paths = paths.len(), errors = errors.len(), "batch checked");
    errors
}
