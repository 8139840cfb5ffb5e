use crate::error::ScanError;
use crate::scanner::TokenScanner;
use serde::{Deserialize, Serialize};

/// The shape an argument node matches. Closed set: the dispatch loop matches
/// exhaustively over these, one parse arm per tag.
///
/// Literal keywords are a node kind, not an argument kind — they never bind
/// a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgKind {
    /// One word, base-10 signed integer.
    Integer,
    /// Exactly one word, quoting honored.
    Word,
    /// The verbatim remainder of the input, embedded whitespace included.
    /// Only valid as the last node of a branch.
    Greedy,
}

/// A bound argument value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgValue {
    Int(i64),
    Text(String),
}

impl ArgValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(n) => Some(*n),
            ArgValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            ArgValue::Int(_) => None,
        }
    }
}

impl ArgKind {
    /// Consume one value of this shape from the scanner.
    pub fn parse(self, scanner: &mut TokenScanner<'_>) -> Result<ArgValue, ScanError> {
        match self {
            ArgKind::Integer => scanner.read_integer().map(ArgValue::Int),
            ArgKind::Word => scanner
                .read_word()
                .map(|word| ArgValue::Text(word.to_string())),
            ArgKind::Greedy => scanner
                .read_rest()
                .map(|rest| ArgValue::Text(rest.to_string())),
        }
    }
}
