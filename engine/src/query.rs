//! Boolean retrieval over the inverted index.
//!
//! A query line is tokenized, converted to postfix with a shunting-yard pass
//! and evaluated on a stack of posting sets. Operator precedence is
//! `NOT` > `AND` > `OR`. An incoming operator only displaces stacked operators
//! of strictly higher precedence, so a chain like `a OR b OR c` emits its
//! operators last-in-first-out and applies them right to left.

use crate::index::{InvertedIndex, PostingSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Operator keywords are matched case-sensitively.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            "NOT" => Some(Operator::Not),
            _ => None,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operator::Not => 3,
            Operator::And => 2,
            Operator::Or => 1,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    Operator(Operator),
    Term(String),
}

impl Token {
    // Parentheses rank below every operator so they are never displaced.
    fn precedence(&self) -> u8 {
        match self {
            Token::Operator(op) => op.precedence(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query is empty")]
    Empty,
    #[error("operator {0} is missing an operand")]
    MissingOperand(Operator),
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("{0} operands are not joined by an operator")]
    DanglingOperands(usize),
}

/// Splits a query line into tokens. Parentheses are always standalone tokens;
/// anything that is not an operator keyword becomes a lowercased term.
pub fn tokenize(query: &str) -> Vec<Token> {
    query
        .replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(|word| match word {
            "(" => Token::Open,
            ")" => Token::Close,
            _ => match Operator::from_keyword(word) {
                Some(op) => Token::Operator(op),
                None => Token::Term(word.to_lowercase()),
            },
        })
        .collect()
}

/// Infix to postfix. Parentheses are consumed and never appear in the output.
pub fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>, QueryError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Open => stack.push(Token::Open),
            Token::Close => loop {
                match stack.pop() {
                    Some(Token::Open) => break,
                    Some(op) => output.push(op),
                    None => return Err(QueryError::UnbalancedParentheses),
                }
            },
            Token::Operator(op) => {
                while stack.last().is_some_and(|top| top.precedence() > op.precedence()) {
                    if let Some(top) = stack.pop() {
                        output.push(top);
                    }
                }
                stack.push(Token::Operator(op));
            }
            Token::Term(term) => output.push(Token::Term(term)),
        }
    }

    while let Some(top) = stack.pop() {
        if top == Token::Open {
            return Err(QueryError::UnbalancedParentheses);
        }
        output.push(top);
    }
    Ok(output)
}

/// Evaluates a postfix token sequence. Every call works on its own stack.
pub fn evaluate(postfix: &[Token], index: &InvertedIndex) -> Result<PostingSet, QueryError> {
    let mut stack: Vec<PostingSet> = Vec::new();

    for token in postfix {
        match token {
            Token::Term(term) => stack.push(index.posting_set(term)),
            Token::Operator(op) => {
                let missing = || QueryError::MissingOperand(*op);
                let first = stack.pop().ok_or_else(missing)?;
                let result = match op {
                    Operator::Not => index.universe().difference(&first).copied().collect(),
                    Operator::And => {
                        let second = stack.pop().ok_or_else(missing)?;
                        first.intersection(&second).copied().collect()
                    }
                    Operator::Or => {
                        let second = stack.pop().ok_or_else(missing)?;
                        first.union(&second).copied().collect()
                    }
                };
                stack.push(result);
            }
            Token::Open | Token::Close => return Err(QueryError::UnbalancedParentheses),
        }
    }

    match stack.len() {
        0 => Err(QueryError::Empty),
        1 => Ok(stack.pop().unwrap_or_default()),
        n => Err(QueryError::DanglingOperands(n)),
    }
}

/// Tokenizes, converts and evaluates `query` against `index`.
pub fn search(index: &InvertedIndex, query: &str) -> Result<PostingSet, QueryError> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Err(QueryError::Empty);
    }
    let postfix = to_postfix(tokens)?;
    let result = evaluate(&postfix, index)?;
    tracing::debug!(query, hits = result.len(), "boolean query evaluated");
    Ok(result)
}
