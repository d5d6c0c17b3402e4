//! Query text to statement tree.

pub mod ast;
pub mod parser;
pub mod tokenizer;

use crate::error::QueryError;
use ast::Statement;
use parser::Parser;
use tokenizer::Tokenizer;

/// Tokenizes and parses one statement.
///
/// # Errors
/// [QueryError::Parse] describing the first offending token.
pub fn parse(sql: &str) -> Result<Statement, QueryError> {
    let tokens = Tokenizer::new(sql).tokenize().map_err(QueryError::Parse)?;
    Parser::new(tokens).parse().map_err(QueryError::Parse)
}
