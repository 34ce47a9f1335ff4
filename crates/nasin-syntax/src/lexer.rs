//! Hand-written tokenizer.
//!
//! The language's keyword vocabulary is entirely lowercase and every
//! identifier must start with an uppercase letter (see [`scan_identifier`]),
//! so lexing never has to choose between "keyword" and "identifier" for the
//! same run of letters — the two alphabets don't overlap. String literals
//! and numeral sequences are still introduced by the keywords `nimi` and
//! `nanpa` respectively, but only the quoted string body is special-cased
//! here; numeral words (`ali`, `ale`, `mute`, `luka`, `tu`, `wan`, `ala`,
//! `nasa`) are plain keyword tokens and their non-increasing-order rule is
//! enforced by the grammar, not the lexer, exactly as spec describes it.

use std::fmt;

const KEYWORDS: &[&str] = &[
    "pali", "ni", "li", "kepeken", "e", "ijo", "sin", "pini", "o", "la", "pi", "en", "ala", "lon",
    "kulupu", "lili", "suli", "pana", "lukin", "sitelen", "kipisi", "open", "nanpa", "nimi",
    "nasa", "ali", "ale", "mute", "luka", "tu", "wan",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A recognised keyword, e.g. `Word("pali")`.
    Word(&'static str),
    /// An uppercase-initial identifier lexeme.
    Ident(String),
    /// The decoded body of a `nimi "..."` string literal.
    Str(String),
    /// `.`
    Dot,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "{w}"),
            Token::Ident(s) => write!(f, "ijo {s}"),
            Token::Str(_) => write!(f, "a string literal"),
            Token::Dot => write!(f, "."),
        }
    }
}

/// A lexical failure, reported in the same `(line, column)` shape as a
/// grammar-level [`crate::error::ParseError`] so the two can share a
/// `Display` implementation at the top of `parse`.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub offset: usize,
    pub message: String,
}

/// Scan the identifier automaton from `chars[start..]`, returning the
/// number of characters matched.
///
/// Grammar (spec §4.1): an initial syllable is an uppercase vowel
/// optionally followed by `n`, or an uppercase consonant in `JKLMNPSTW`
/// followed by a lowercase vowel with an optional trailing `n`; further
/// syllables are a lowercase consonant in `jklmnpstw` plus a lowercase
/// vowel with an optional trailing `n`. A trailing `n` is only consumed
/// when the character after it is not a lowercase vowel, so that `n` is
/// left for the next syllable's leading consonant instead.
fn scan_identifier(chars: &[char], start: usize) -> Option<usize> {
    fn is_upper_vowel(c: char) -> bool {
        matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
    }
    fn is_upper_cons(c: char) -> bool {
        matches!(c, 'J' | 'K' | 'L' | 'M' | 'N' | 'P' | 'S' | 'T' | 'W')
    }
    fn is_lower_vowel(c: char) -> bool {
        matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
    }
    fn is_lower_cons(c: char) -> bool {
        matches!(c, 'j' | 'k' | 'l' | 'm' | 'n' | 'p' | 's' | 't' | 'w')
    }
    fn maybe_trailing_n(chars: &[char], i: usize) -> usize {
        let n = chars.len();
        if i < n && chars[i] == 'n' && !(i + 1 < n && is_lower_vowel(chars[i + 1])) {
            1
        } else {
            0
        }
    }

    let n = chars.len();
    let mut i = start;
    if i >= n {
        return None;
    }
    if is_upper_vowel(chars[i]) {
        i += 1;
    } else if is_upper_cons(chars[i]) && i + 1 < n && is_lower_vowel(chars[i + 1]) {
        i += 2;
    } else {
        return None;
    }
    i += maybe_trailing_n(chars, i);

    while i + 1 < n && is_lower_cons(chars[i]) && is_lower_vowel(chars[i + 1]) {
        i += 2;
        i += maybe_trailing_n(chars, i);
    }
    Some(i - start)
}

const ESCAPES: &[(char, char)] = &[('\\', '\\'), ('"', '"'), ('n', '\n')];

fn decode_escape(c: char) -> Option<char> {
    ESCAPES.iter().find(|(k, _)| *k == c).map(|(_, v)| *v)
}

/// Tokenize a whole source string, returning `(token, byte span)` pairs.
pub fn tokenize(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut byte_offset = Vec::with_capacity(chars.len() + 1);
    let mut acc = 0;
    for c in &chars {
        byte_offset.push(acc);
        acc += c.len_utf8();
    }
    byte_offset.push(acc);

    let mut tokens = Vec::new();
    let mut i = 0usize;
    let n = chars.len();

    while i < n {
        let c = chars[i];
        if matches!(c, '\n' | '\r' | '\t' | ' ') {
            i += 1;
            continue;
        }
        let start = i;
        if c == '.' {
            tokens.push((Token::Dot, byte_offset[start]..byte_offset[start + 1]));
            i += 1;
        } else if c == '"' {
            i += 1;
            let mut body = String::new();
            loop {
                if i >= n {
                    return Err(LexError {
                        offset: byte_offset[n],
                        message: "Unexpected EOF while parsing a string".to_string(),
                    });
                }
                if chars[i] == '"' {
                    i += 1;
                    break;
                }
                if chars[i] == '\\' {
                    i += 1;
                    if i >= n {
                        return Err(LexError {
                            offset: byte_offset[n],
                            message: "Unexpected EOF while parsing a string".to_string(),
                        });
                    }
                    match decode_escape(chars[i]) {
                        Some(decoded) => body.push(decoded),
                        None => {
                            return Err(LexError {
                                offset: byte_offset[i],
                                message: "Incorrect escape sequence. Did you mean \"\\\\\"?"
                                    .to_string(),
                            })
                        }
                    }
                } else {
                    body.push(chars[i]);
                }
                i += 1;
            }
            tokens.push((Token::Str(body), byte_offset[start]..byte_offset[i]));
        } else if c.is_ascii_uppercase() {
            match scan_identifier(&chars, start) {
                Some(len) => {
                    let ident: String = chars[start..start + len].iter().collect();
                    tokens.push((Token::Ident(ident), byte_offset[start]..byte_offset[start + len]));
                    i = start + len;
                }
                None => {
                    return Err(LexError {
                        offset: byte_offset[start],
                        message: "Expected an identifier".to_string(),
                    })
                }
            }
        } else if c.is_ascii_lowercase() {
            let mut end = start;
            while end < n && chars[end].is_ascii_lowercase() {
                end += 1;
            }
            let word: String = chars[start..end].iter().collect();
            match KEYWORDS.iter().find(|k| **k == word) {
                Some(canonical) => {
                    tokens.push((Token::Word(canonical), byte_offset[start]..byte_offset[end]));
                    i = end;
                }
                None => {
                    return Err(LexError {
                        offset: byte_offset[start],
                        message: format!("Unrecognized word {word:?}"),
                    })
                }
            }
        } else {
            return Err(LexError {
                offset: byte_offset[start],
                message: format!("Unexpected character {c:?}"),
            });
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_trailing_n_before_vowel_is_not_consumed() {
        let chars: Vec<char> = "Ana".chars().collect();
        assert_eq!(scan_identifier(&chars, 0), Some(3));
    }

    #[test]
    fn identifier_trailing_n_at_end_is_consumed() {
        let chars: Vec<char> = "An".chars().collect();
        assert_eq!(scan_identifier(&chars, 0), Some(2));
    }

    #[test]
    fn identifier_rejects_unsupported_initial() {
        let chars: Vec<char> = "Xan".chars().collect();
        assert_eq!(scan_identifier(&chars, 0), None);
    }

    #[test]
    fn tokenizes_keyword_sequence() {
        let toks = tokenize("pali sin li pini").unwrap();
        let words: Vec<_> = toks.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            words,
            vec![
                Token::Word("pali"),
                Token::Word("sin"),
                Token::Word("li"),
                Token::Word("pini"),
            ]
        );
    }

    #[test]
    fn tokenizes_string_literal_with_escapes() {
        let toks = tokenize(r#"nimi "a\nb""#).unwrap();
        assert_eq!(
            toks.into_iter().map(|(t, _)| t).collect::<Vec<_>>(),
            vec![Token::Word("nimi"), Token::Str("a\nb".to_string())]
        );
    }

    #[test]
    fn rejects_bad_escape() {
        let err = tokenize(r#"nimi "a\qb""#).unwrap_err();
        assert!(err.message.contains("escape"));
    }
}
