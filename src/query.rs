//! Text form of filter queries.
//!
//! ```text
//! query  := conj (('||' | 'OR') conj)*
//! conj   := clause (('&&' | 'AND') clause)*
//! clause := ['INFO/'] TAG OP NUMBER
//! OP     := '<' | '<=' | '=' | '==' | '!=' | '>=' | '>'
//! ```
//!
//! Keywords and the `INFO/` prefix are case-insensitive; tags are not.
//!
//! Examples:
//! - `SAS_AF < 0.001`
//! - `INFO/AF >= 0.5 && DP > 10 || SAS_AF == 0`

use crate::error::{Error, Result};
use crate::pipeline::{Condition, Query, Selector};

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Op(Selector),
    And,
    Or,
}

/// A token and the 1-based byte column it starts at.
type Spanned<'a> = (Token<'a>, usize);

fn error(column: usize, msg: impl Into<String>) -> Error {
    Error::Query {
        column,
        msg: msg.into(),
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'/' | b'.' | b'-' | b'+')
}

fn tokenize(text: &str) -> Result<Vec<Spanned<'_>>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let column = i + 1;

        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let two = bytes.get(i..i + 2);
        let (token, len) = match (b, two) {
            (_, Some(b"&&")) => (Token::And, 2),
            (_, Some(b"||")) => (Token::Or, 2),
            (_, Some(b"<=")) => (Token::Op(Selector::Le), 2),
            (_, Some(b">=")) => (Token::Op(Selector::Ge), 2),
            (_, Some(b"==")) => (Token::Op(Selector::Eq), 2),
            (_, Some(b"!=")) => (Token::Op(Selector::Ne), 2),
            (b'<', _) => (Token::Op(Selector::Lt), 1),
            (b'>', _) => (Token::Op(Selector::Gt), 1),
            (b'=', _) => (Token::Op(Selector::Eq), 1),
            _ if is_word_byte(b) => {
                let len = bytes[i..].iter().take_while(|&&c| is_word_byte(c)).count();
                let word = &text[i..i + len];
                let token = if word.eq_ignore_ascii_case("AND") {
                    Token::And
                } else if word.eq_ignore_ascii_case("OR") {
                    Token::Or
                } else {
                    Token::Word(word)
                };
                (token, len)
            }
            _ => {
                let ch = text[i..].chars().next().unwrap_or('?');
                return Err(error(column, format!("Unexpected character '{ch}'")));
            }
        };

        tokens.push((token, column));
        i += len;
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    end_column: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Spanned<'a>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn query(&mut self) -> Result<Vec<Vec<Condition>>> {
        let mut alternatives = vec![self.conj()?];
        while let Some((Token::Or, _)) = self.peek() {
            self.pos += 1;
            alternatives.push(self.conj()?);
        }
        if let Some((token, column)) = self.peek() {
            return Err(error(*column, format!("Unexpected {}", describe(token))));
        }
        Ok(alternatives)
    }

    fn conj(&mut self) -> Result<Vec<Condition>> {
        let mut clauses = vec![self.clause()?];
        while let Some((Token::And, _)) = self.peek() {
            self.pos += 1;
            clauses.push(self.clause()?);
        }
        Ok(clauses)
    }

    fn clause(&mut self) -> Result<Condition> {
        let tag = match self.advance() {
            Some((Token::Word(word), column)) => tag_name(word, column)?,
            Some((token, column)) => {
                return Err(error(column, format!("Expected INFO tag, found {}", describe(&token))));
            }
            None => return Err(error(self.end_column, "Expected INFO tag")),
        };

        let selector = match self.advance() {
            Some((Token::Op(selector), _)) => selector,
            Some((token, column)) => {
                return Err(error(
                    column,
                    format!("Expected comparison operator, found {}", describe(&token)),
                ));
            }
            None => return Err(error(self.end_column, "Expected comparison operator")),
        };

        let threshold = match self.advance() {
            Some((Token::Word(word), column)) => word
                .parse::<f64>()
                .map_err(|_| error(column, format!("Invalid number '{word}'")))?,
            Some((token, column)) => {
                return Err(error(column, format!("Expected number, found {}", describe(&token))));
            }
            None => return Err(error(self.end_column, "Expected number")),
        };

        Ok(Condition::new(tag, selector, threshold))
    }
}

fn describe(token: &Token<'_>) -> String {
    match token {
        Token::Word(word) => format!("'{word}'"),
        Token::Op(selector) => format!("'{}'", selector.symbol()),
        Token::And => "'&&'".to_string(),
        Token::Or => "'||'".to_string(),
    }
}

/// Strip an optional `INFO/` prefix; other `/`-qualified names are rejected.
fn tag_name(word: &str, column: usize) -> Result<&str> {
    let tag = match word.split_once('/') {
        Some((prefix, tag)) if prefix.eq_ignore_ascii_case("INFO") => tag,
        Some((prefix, _)) => {
            return Err(error(column, format!("Only INFO tags can be queried, not {prefix}")));
        }
        None => word,
    };
    if tag.is_empty() || tag.contains('/') {
        return Err(error(column, format!("Invalid tag '{word}'")));
    }
    Ok(tag)
}

/// Parse query text into a [`Query`].
pub fn parse_query(text: &str) -> Result<Query> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end_column: text.len() + 1,
    };
    let alternatives = parser.query()?;
    Query::any_of(alternatives).ok_or_else(|| error(1, "Empty query"))
}
