//! Composable decoders over a positional argument vector.
//!
//! Every decoder is a plain function taking the cursor and returning a
//! value or an [`ArgumentError`] carrying the cursor position. Record
//! shapes are decoded by ordinary functions that read their fields in
//! order, so there is no schema object and no exception machinery.

use std::collections::HashSet;
use std::str::FromStr;

use thiserror::Error;

/// Malformed argument vector. `position` is the zero-based index of the
/// offending token (or of the end of the vector for missing tokens).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("missing argument at position {position}: expected {expected}")]
    Missing {
        position: usize,
        expected: &'static str,
    },
    #[error("invalid argument at position {position}: {value:?} is not a valid {expected}")]
    Invalid {
        position: usize,
        value: String,
        expected: &'static str,
    },
    #[error("argument at position {position} out of range: {message}")]
    Constraint {
        position: usize,
        message: &'static str,
    },
    #[error("unknown command {command:?} at position {position}")]
    UnknownCommand { position: usize, command: String },
}

/// Cursor state over an argument vector.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    argv: &'a [String],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(argv: &'a [String]) -> Self {
        Self { argv, position: 0 }
    }

    /// Zero-based index of the next token to be consumed.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.argv.len()
    }

    /// The next token without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.argv.get(self.position).map(String::as_str)
    }

    /// Consume one token. `expected` names what the caller wanted, for
    /// the error message.
    pub fn next(&mut self, expected: &'static str) -> Result<&'a str, ArgumentError> {
        match self.argv.get(self.position) {
            Some(token) => {
                self.position += 1;
                Ok(token.as_str())
            }
            None => Err(ArgumentError::Missing {
                position: self.position,
                expected,
            }),
        }
    }

    /// Consume one token and parse it. The scalar decoder.
    pub fn parse<T: FromStr>(&mut self, expected: &'static str) -> Result<T, ArgumentError> {
        let position = self.position;
        let token = self.next(expected)?;
        token.parse().map_err(|_| ArgumentError::Invalid {
            position,
            value: token.to_string(),
            expected,
        })
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}

/// Greedily consume tokens appearing in `vocabulary` and return the set
/// of flags seen. Stops at the first token outside the vocabulary.
pub fn flag_set<'v>(cursor: &mut Cursor<'_>, vocabulary: &[&'v str]) -> HashSet<&'v str> {
    let mut flags = HashSet::new();
    while let Some(token) = cursor.peek() {
        match vocabulary.iter().find(|flag| **flag == token) {
            Some(flag) => {
                cursor.advance();
                flags.insert(*flag);
            }
            None => break,
        }
    }
    flags
}

/// Decode a count, then that many items.
pub fn repeated<'a, T>(
    cursor: &mut Cursor<'a>,
    mut item: impl FnMut(&mut Cursor<'a>) -> Result<T, ArgumentError>,
) -> Result<Vec<T>, ArgumentError> {
    let count: usize = cursor.parse("count")?;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        items.push(item(cursor)?);
    }
    Ok(items)
}

/// Decode items until the cursor reaches the end of the vector.
pub fn variadic<'a, T>(
    cursor: &mut Cursor<'a>,
    mut item: impl FnMut(&mut Cursor<'a>) -> Result<T, ArgumentError>,
) -> Result<Vec<T>, ArgumentError> {
    let mut items = Vec::new();
    while !cursor.is_done() {
        items.push(item(cursor)?);
    }
    Ok(items)
}
