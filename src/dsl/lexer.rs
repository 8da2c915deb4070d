//! Parenthesis resolution and word scanning for the filter DSL.

use std::collections::HashMap;
use winnow::prelude::*;
use winnow::token::take_till;

use super::error::CompileError;

/// Byte offset of each `(` mapped to the offset of its matching `)`.
pub type ParenMap = HashMap<usize, usize>;

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Deepest parenthesis nesting a query may use. Each level is one recursive
/// extraction.
pub const MAX_NESTING: usize = 128;

/// Pair up parentheses in a single pass.
pub fn resolve_parens(query: &str) -> Result<ParenMap, CompileError> {
    let mut open = Vec::with_capacity(1 + query.len() / 4);
    let mut pairs = ParenMap::new();

    for (offset, byte) in query.bytes().enumerate() {
        match byte {
            b'(' => {
                if open.len() == MAX_NESTING {
                    return Err(CompileError::invalid("parentheses nested too deeply"));
                }
                open.push(offset);
            }
            b')' => {
                let start = open
                    .pop()
                    .ok_or(CompileError::UnbalancedParenthesis { offset })?;
                pairs.insert(start, offset);
            }
            _ => {}
        }
    }

    if let Some(&offset) = open.last() {
        return Err(CompileError::UnbalancedParenthesis { offset });
    }

    Ok(pairs)
}

fn is_delimiter(c: char) -> bool {
    c.is_ascii_whitespace() || c == '(' || c == ')'
}

/// Every word in the query, ignoring grouping.
pub fn words(query: &str) -> impl Iterator<Item = &str> {
    query.split(is_delimiter).filter(|word| !word.is_empty())
}

/// Lex a word: a field name, operator, combinator or literal.
fn lex_word<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_till(1.., is_delimiter).parse_next(input)
}

/// What the scanner found next in the current range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme<'q> {
    Word(&'q str),
    /// A parenthesized group; `open` and `close` are the offsets of its parentheses.
    Group { open: usize, close: usize },
}

/// Scans `query[pos..end]`, stepping over whole parenthesized groups.
pub struct Lexer<'q> {
    query: &'q str,
    parens: &'q ParenMap,
    pos: usize,
    end: usize,
}

impl<'q> Lexer<'q> {
    pub fn new(query: &'q str, parens: &'q ParenMap, from: usize, to: usize) -> Self {
        Lexer {
            query,
            parens,
            pos: from,
            end: to,
        }
    }
}

impl<'q> Iterator for Lexer<'q> {
    type Item = Result<Lexeme<'q>, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.query.as_bytes();
        while self.pos < self.end && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= self.end {
            return None;
        }

        let offset = self.pos;
        match bytes[offset] {
            b'(' => {
                let Some(&close) = self.parens.get(&offset) else {
                    self.pos = self.end;
                    return Some(Err(CompileError::UnbalancedParenthesis { offset }));
                };
                self.pos = close + 1;
                Some(Ok(Lexeme::Group {
                    open: offset,
                    close,
                }))
            }
            // Groups are skipped whole, so a `)` here has no opener in this range.
            b')' => {
                self.pos = self.end;
                Some(Err(CompileError::UnbalancedParenthesis { offset }))
            }
            _ => {
                let mut input = &self.query[offset..self.end];
                let word = lex_word(&mut input).ok()?;
                self.pos += word.len();
                Some(Ok(Lexeme::Word(word)))
            }
        }
    }
}
