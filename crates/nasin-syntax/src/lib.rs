//! Lexer, grammar and abstract syntax tree for the Nasin language.

pub mod ast;
mod combinators;
pub mod error;
pub mod grammar;
pub mod lexer;

use chumsky::Parser;
use chumsky::Stream;

pub use ast::Paragraph;
pub use error::ParseError;

/// Parse a whole Nasin source file into its root [`Paragraph`].
pub fn parse(source: &str) -> Result<Paragraph, ParseError> {
    let index = error::LineIndex::new(source);

    let tokens = lexer::tokenize(source).map_err(|e| ParseError::from_lex(&e, &index))?;
    let eof = source.len()..source.len();
    let stream = Stream::from_iter(eof, tokens.into_iter());

    grammar::parser()
        .parse(stream)
        .map_err(|errors| {
            let worst = errors
                .into_iter()
                .max_by_key(|e| e.span().start)
                .expect("chumsky reports at least one error on failure");
            ParseError::from_simple(&worst, &index)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(body: &str) -> String {
        format!("{body}pali sin li pini")
    }

    #[test]
    fn parses_empty_paragraph() {
        let par = parse("pali sin li pini").unwrap();
        assert!(par.arguments.is_empty());
        assert!(par.sentences.is_empty());
    }

    #[test]
    fn parses_paragraph_with_arguments() {
        let par = parse("pali ni li kepeken e ijo Ale e ijo Ije. pali sin li pini").unwrap();
        assert_eq!(par.arguments, vec!["Ale".to_string(), "Ije".to_string()]);
    }

    #[test]
    fn parses_assignment_sentence() {
        let par = parse(&minimal("ijo Ale li nanpa tu wan. ")).unwrap();
        assert_eq!(par.sentences.len(), 1);
    }

    #[test]
    fn rejects_increasing_numeral_sequence() {
        let err = parse(&minimal("o nanpa wan tu. ")).unwrap_err();
        assert!(err.message.contains("non-increasing"));
    }
}
