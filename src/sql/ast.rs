use std::fmt;

use crate::schema::ColumnRef;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
}

/// Operators of a WHERE / ON expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(c) => write!(f, "{c}"),
            Self::Literal(Value::Text(s)) => write!(f, "'{s}'"),
            Self::Literal(v) => write!(f, "{v}"),
            Self::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItems {
    Star,
    Columns(Vec<ColumnRef>),
}

/// A table in FROM or JOIN, with its optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The name the table's columns are qualified with.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// `JOIN table ON condition`; `CROSS JOIN table` has no condition.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: TableRef,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub items: SelectItems,
    /// Comma-separated FROM items, in order.
    pub from: Vec<TableRef>,
    /// Explicit joins following the FROM items, in order.
    pub joins: Vec<JoinClause>,
    pub selection: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}
