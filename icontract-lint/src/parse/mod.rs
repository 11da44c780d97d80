//! Pinned adapter around the Python parser
//!
//! The crate is written against exactly one AST library
//! (`rustpython-parser`); this module is the only place that invokes it and
//! the only place that translates byte offsets into 1-based line numbers.

use rustpython_parser::{ast, Parse, ParseError};
use thiserror::Error;

/// Failure to parse a module
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SyntaxFailure {
    /// The parser's own error message
    pub message: String,
    /// 1-based line of the offending token
    pub lineno: Option<usize>,
}

/// Byte offset to 1-based line lookup, built once per source text
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    /// Line containing the given byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }
}

/// A parsed Python module together with its line index
#[derive(Debug)]
pub struct ParsedModule {
    pub body: Vec<ast::Stmt>,
    pub lines: LineIndex,
}

/// Parse the text as a Python module
pub fn parse_module(text: &str, source_path: &str) -> Result<ParsedModule, SyntaxFailure> {
    let lines = LineIndex::new(text);

    match ast::Suite::parse(text, source_path) {
        Ok(body) => Ok(ParsedModule { body, lines }),
        Err(err) => Err(syntax_failure(err, &lines)),
    }
}

fn syntax_failure(err: ParseError, lines: &LineIndex) -> SyntaxFailure {
    SyntaxFailure {
        message: err.error.to_string(),
        lineno: Some(lines.line_of(usize::from(err.offset))),
    }
}
