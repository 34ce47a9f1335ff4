//! Source-position tracking and parse-error reporting.
//!
//! Chumsky tracks byte spans natively; Nasin programs are diagnosed in
//! terms of 1-based line/column per spec, so a [`LineIndex`] is built once
//! over the source text and used to translate a span into a position.
//!
//! Parsing runs in two stages — a hand-written tokenizer, then chumsky over
//! the resulting token stream — so a [`ParseError`] can originate from
//! either a [`crate::lexer::LexError`] or a chumsky `Simple<Token>`.

use chumsky::error::Simple;

use crate::lexer::{LexError, Token};

/// Byte-offset -> (line, column) translator, built once per source file.
pub struct LineIndex {
    /// Byte offset of the start of each line (line 0 always starts at 0).
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex { line_starts }
    }

    /// 1-based (line, column) for a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let col = offset - self.line_starts[line];
        (line + 1, col + 1)
    }
}

/// A parse failure at a specific source position.
///
/// `alter`-style choice points (chumsky's `.or()`/`choice()`) keep the
/// error belonging to whichever alternative consumed the most input —
/// this is chumsky's built-in `Simple::merge` behaviour, so it already
/// implements spec's "furthest-advanced attempt wins" rule without any
/// extra bookkeeping on our part.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parsing error at line {line} column {column}:\n{message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn from_lex(err: &LexError, index: &LineIndex) -> Self {
        let (line, column) = index.position(err.offset);
        ParseError {
            line,
            column,
            message: err.message.clone(),
        }
    }

    /// `err` must come from parsing a `chumsky::Stream` built with
    /// `Range<usize>` byte-offset spans (see `grammar::parse_tokens`), so
    /// `err.span().start` is already a byte offset into the source.
    pub fn from_simple(err: &Simple<Token>, index: &LineIndex) -> Self {
        let (line, column) = index.position(err.span().start);
        ParseError {
            line,
            column,
            message: describe(err),
        }
    }
}

fn describe(err: &Simple<Token>) -> String {
    use chumsky::error::SimpleReason;
    match err.reason() {
        SimpleReason::Unexpected | SimpleReason::Unclosed { .. } => {
            let expected: Vec<String> = err
                .expected()
                .filter_map(|t| t.as_ref().map(|t| t.to_string()))
                .collect();
            match (err.found(), expected.len()) {
                (None, _) => "Unexpected EOF".to_string(),
                (Some(found), 0) => format!("Unexpected {found}"),
                (Some(found), 1) => format!("Expected {}, found {found}", expected[0]),
                (Some(found), _) => {
                    format!("Expected one of [{}], found {found}", expected.join(", "))
                }
            }
        }
        SimpleReason::Custom(message) => message.clone(),
    }
}
