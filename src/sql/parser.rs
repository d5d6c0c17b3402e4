use super::ast::*;
use super::tokenizer::Token;
use crate::schema::ColumnRef;
use crate::value::Value;

/// Recursive-descent parser for `SELECT` statements.
///
/// Precedence, loosest first: `OR`, `AND`, comparisons. Parentheses group.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Statement, String> {
        let statement = match self.current_token() {
            Token::Select => self.parse_select().map(Statement::Select),
            _ => Err(format!("Unexpected token: {:?}", self.current_token())),
        }?;

        // semicolon is optional in SQL so skip it
        if matches!(self.current_token(), Token::Semicolon) {
            self.advance();
        }

        // Check we are at the end of the statement
        if !self.is_at_end() {
            return Err(format!(
                "Unexpected token after statement: {:?}",
                self.current_token()
            ));
        }

        Ok(statement)
    }

    //helpers
    fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    /// Consumes the current token if it is `expected`.
    fn accept(&mut self, expected: &Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: Token) -> Result<(), String> {
        if self.accept(&expected) {
            Ok(())
        } else {
            Err(format!(
                "Expected {:?}, found {:?}",
                expected,
                self.current_token()
            ))
        }
    }

    fn consume_ident(&mut self) -> Result<String, String> {
        match self.current_token() {
            Token::Ident(string) => {
                let string = string.clone();
                self.advance();
                Ok(string)
            }
            _ => Err(format!(
                "Expected identifier, found {:?}",
                self.current_token()
            )),
        }
    }

    /// `name` or `qualifier.name`
    fn parse_column_ref(&mut self) -> Result<ColumnRef, String> {
        let first = self.consume_ident()?;
        if self.accept(&Token::Dot) {
            let name = self.consume_ident()?;
            return Ok(ColumnRef::qualified(first, name));
        }
        Ok(ColumnRef::new(first))
    }

    /// `name [[AS] alias]`
    fn parse_table_ref(&mut self) -> Result<TableRef, String> {
        let name = self.consume_ident()?;
        let alias = if self.accept(&Token::As) {
            Some(self.consume_ident()?)
        } else if let Token::Ident(alias) = self.current_token() {
            let alias = alias.clone();
            self.advance();
            Some(alias)
        } else {
            None
        };
        Ok(TableRef { name, alias })
    }

    fn parse_select(&mut self) -> Result<Select, String> {
        self.consume(Token::Select)?;
        let distinct = self.accept(&Token::Distinct);

        let items = if self.accept(&Token::Star) {
            SelectItems::Star
        } else {
            let mut columns = vec![self.parse_column_ref()?];
            while self.accept(&Token::Comma) {
                columns.push(self.parse_column_ref()?);
            }
            SelectItems::Columns(columns)
        };

        self.consume(Token::From)?;
        let mut from = vec![self.parse_table_ref()?];
        while self.accept(&Token::Comma) {
            from.push(self.parse_table_ref()?);
        }

        let mut joins = Vec::new();
        loop {
            if self.accept(&Token::Cross) {
                self.consume(Token::Join)?;
                joins.push(JoinClause {
                    table: self.parse_table_ref()?,
                    on: None,
                });
                continue;
            }
            let inner = self.accept(&Token::Inner);
            if !self.accept(&Token::Join) {
                if inner {
                    return Err(format!(
                        "Expected {:?}, found {:?}",
                        Token::Join,
                        self.current_token()
                    ));
                }
                break;
            }
            let table = self.parse_table_ref()?;
            self.consume(Token::On)?;
            joins.push(JoinClause {
                table,
                on: Some(self.parse_expr()?),
            });
        }

        let selection = if self.accept(&Token::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.accept(&Token::Order) {
            self.consume(Token::By)?;
            loop {
                let column = self.parse_column_ref()?;
                let descending = if self.accept(&Token::Desc) {
                    true
                } else {
                    self.accept(&Token::Asc);
                    false
                };
                order_by.push(OrderBy { column, descending });
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.accept(&Token::Limit) {
            match self.current_token() {
                Token::Number(n) if *n >= 0 => {
                    let n = *n as usize;
                    self.advance();
                    Some(n)
                }
                other => return Err(format!("Expected row count after LIMIT, found {other:?}")),
            }
        } else {
            None
        };

        Ok(Select {
            distinct,
            items,
            from,
            joins,
            selection,
            order_by,
            limit,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.accept(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_comparison()?;
        while self.accept(&Token::And) {
            let right = self.parse_comparison()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_primary()?;
        let op = match self.current_token() {
            Token::Equal => BinaryOp::Eq,
            Token::NotEqual => BinaryOp::NotEq,
            Token::Less => BinaryOp::Lt,
            Token::LessEqual => BinaryOp::LtEq,
            Token::Greater => BinaryOp::Gt,
            Token::GreaterEqual => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_primary()?;
        Ok(Expr::binary(left, op, right))
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let literal = match self.current_token() {
            Token::Number(n) => Some(Value::Int(*n)),
            Token::FloatNumber(f) => Some(Value::Float(*f)),
            Token::String(s) => Some(Value::from(s.as_str())),
            Token::True => Some(Value::Bool(true)),
            Token::False => Some(Value::Bool(false)),
            Token::Null => Some(Value::Null),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(Expr::Literal(value));
        }

        match self.current_token() {
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(Token::RightParen)?;
                Ok(expr)
            }
            Token::Ident(_) => Ok(Expr::Column(self.parse_column_ref()?)),
            other => Err(format!("Expected expression, found {other:?}")),
        }
    }
}
