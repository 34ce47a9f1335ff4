//! Thin, named wrappers over chumsky's token-matching primitives.
//!
//! The grammar's combinator vocabulary — sequencing, ordered choice,
//! repetition, optionality — maps directly onto chumsky's `.then()`,
//! `.or()`/`choice()`, `.repeated()` and `.or_not()`, which `grammar.rs`
//! uses directly; chumsky's `Simple::merge` already keeps whichever
//! alternative's error advanced furthest into the input, which is exactly
//! the "furthest attempt wins" diagnostic rule the original hand-written
//! `alter` combinator implemented. What's left to wrap here is matching
//! specific token payloads.

use chumsky::prelude::*;

use crate::lexer::Token;

pub type TokErr = Simple<Token>;

/// Zero-or-one, as `Option<O>`.
pub fn option<P, O>(p: P) -> impl Parser<Token, Option<O>, Error = TokErr> + Clone
where
    P: Parser<Token, O, Error = TokErr> + Clone,
{
    p.or_not()
}

/// Match an exact keyword token.
pub fn word(w: &'static str) -> impl Parser<Token, (), Error = TokErr> + Clone {
    just(Token::Word(w)).ignored()
}

/// Match a fixed run of keyword tokens in sequence, e.g. `words(&["pali", "ni"])`.
pub fn words(ws: &'static [&'static str]) -> impl Parser<Token, (), Error = TokErr> + Clone {
    custom_seq(ws)
}

fn custom_seq(ws: &'static [&'static str]) -> impl Parser<Token, (), Error = TokErr> + Clone {
    let mut it = ws.iter();
    let first = it.next().expect("words() requires at least one keyword");
    let mut parser = word(first).boxed();
    for w in it {
        parser = parser.then(word(w)).ignored().boxed();
    }
    parser
}

/// Match any identifier token, returning its text.
pub fn ident() -> impl Parser<Token, String, Error = TokErr> + Clone {
    select! { Token::Ident(name) => name }
}

/// Match any string-literal token, returning its decoded body.
pub fn string_lit() -> impl Parser<Token, String, Error = TokErr> + Clone {
    select! { Token::Str(body) => body }
}

/// Match `.`.
pub fn dot() -> impl Parser<Token, (), Error = TokErr> + Clone {
    just(Token::Dot).ignored()
}
