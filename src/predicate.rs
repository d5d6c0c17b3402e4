//! WHERE / JOIN-ON conditions and their three-valued evaluation.
//!
//! A [Predicate] refers to columns by name. Before evaluation it is bound
//! against one schema (a filter) or two schemas (a join condition), which turns
//! every column reference into a position, so evaluating a row never looks up
//! names again.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::schema::{ColumnRef, Schema};
use crate::value::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Whether `left op right` holds for two values ordered as `ordering`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::LtEq => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::GtEq => ordering != Ordering::Less,
        }
    }

    /// The operator with its operands swapped: `a < b` is `b > a`.
    pub fn flipped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            op => op,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        };
        f.write_str(symbol)
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(c) => write!(f, "{c}"),
            Self::Literal(Value::Text(s)) => write!(f, "'{s}'"),
            Self::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// Boolean expression tree over comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Self::Compare { left, op, right }
    }

    /// `column op literal`
    pub fn column_literal(column: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::compare(
            Operand::Column(ColumnRef::parse(column)),
            op,
            Operand::Literal(value.into()),
        )
    }

    /// `left op right` between two columns
    pub fn columns(left: &str, op: CompareOp, right: &str) -> Self {
        Self::compare(
            Operand::Column(ColumnRef::parse(left)),
            op,
            Operand::Column(ColumnRef::parse(right)),
        )
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// The operands of the top-level chain of `AND`s, left to right.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Self::And(left, right) => {
                let mut conjuncts = left.conjuncts();
                conjuncts.extend(right.conjuncts());
                conjuncts
            }
            other => vec![other],
        }
    }

    /// Folds predicates into one conjunction; `None` for an empty input.
    pub fn conjunction(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        predicates.into_iter().reduce(Predicate::and)
    }

    /// Every column referenced anywhere in the tree.
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        match self {
            Self::Compare { left, right, .. } => [left, right]
                .into_iter()
                .filter_map(|operand| match operand {
                    Operand::Column(c) => Some(c),
                    Operand::Literal(_) => None,
                })
                .collect(),
            Self::And(left, right) | Self::Or(left, right) => {
                let mut refs = left.column_refs();
                refs.extend(right.column_refs());
                refs
            }
        }
    }

    /// Binds the predicate for evaluation against rows of `schema`.
    pub fn bind(&self, schema: &Schema) -> Result<BoundPredicate, SchemaError> {
        self.bind_with(&|reference| Ok((Side::Left, schema.resolve(reference)?)))
            .map(|root| BoundPredicate {
                root,
                widths: [schema.len(), 0],
            })
    }

    /// Binds the predicate for evaluation against pairs of rows, one from each schema.
    ///
    /// A reference must resolve in exactly one of the two schemas.
    pub fn bind_pair(&self, left: &Schema, right: &Schema) -> Result<BoundPredicate, SchemaError> {
        self.bind_with(&|reference| resolve_pair(left, right, reference))
            .map(|root| BoundPredicate {
                root,
                widths: [left.len(), right.len()],
            })
    }

    fn bind_with<F>(&self, resolve: &F) -> Result<Node, SchemaError>
    where
        F: Fn(&ColumnRef) -> Result<(Side, usize), SchemaError>,
    {
        let bind_operand = |operand: &Operand| -> Result<Slot, SchemaError> {
            Ok(match operand {
                Operand::Column(reference) => {
                    let (side, idx) = resolve(reference)?;
                    Slot::Column(side, idx)
                }
                Operand::Literal(value) => Slot::Literal(value.clone()),
            })
        };

        Ok(match self {
            Self::Compare { left, op, right } => Node::Compare {
                left: bind_operand(left)?,
                op: *op,
                right: bind_operand(right)?,
            },
            Self::And(l, r) => Node::And(
                Box::new(l.bind_with(resolve)?),
                Box::new(r.bind_with(resolve)?),
            ),
            Self::Or(l, r) => Node::Or(
                Box::new(l.bind_with(resolve)?),
                Box::new(r.bind_with(resolve)?),
            ),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::And(l, r) => write!(f, "({l} AND {r})"),
            Self::Or(l, r) => write!(f, "({l} OR {r})"),
        }
    }
}

/// Resolves a reference against the two inputs of a join.
pub(crate) fn resolve_pair(
    left: &Schema,
    right: &Schema,
    reference: &ColumnRef,
) -> Result<(Side, usize), SchemaError> {
    match (left.resolve(reference), right.resolve(reference)) {
        (Ok(idx), Err(SchemaError::UnknownColumn(_))) => Ok((Side::Left, idx)),
        (Err(SchemaError::UnknownColumn(_)), Ok(idx)) => Ok((Side::Right, idx)),
        (Ok(_), Ok(_)) => Err(SchemaError::AmbiguousColumn(reference.to_string())),
        (Err(err @ SchemaError::AmbiguousColumn(_)), _)
        | (_, Err(err @ SchemaError::AmbiguousColumn(_))) => Err(err),
        (Err(err), _) | (_, Err(err)) => Err(err),
    }
}

/// Result of a predicate in three-valued logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn is_true(self) -> bool {
        self == Self::True
    }

    /// Kleene conjunction
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    /// Kleene disjunction
    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }
}

/// Which input row a bound column reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
enum Slot {
    Column(Side, usize),
    Literal(Value),
}

impl Slot {
    fn fetch<'a>(&'a self, left: &'a [Value], right: &'a [Value]) -> &'a Value {
        match self {
            Self::Column(Side::Left, idx) => &left[*idx],
            Self::Column(Side::Right, idx) => &right[*idx],
            Self::Literal(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Compare { left: Slot, op: CompareOp, right: Slot },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Node {
    fn eval(&self, left: &[Value], right: &[Value]) -> Result<Truth> {
        match self {
            Self::Compare {
                left: l,
                op,
                right: r,
            } => Ok(
                match l.fetch(left, right).sql_cmp(r.fetch(left, right))? {
                    Some(ordering) if op.holds(ordering) => Truth::True,
                    Some(_) => Truth::False,
                    None => Truth::Unknown,
                },
            ),
            Self::And(l, r) => {
                let first = l.eval(left, right)?;
                if first == Truth::False {
                    return Ok(Truth::False);
                }
                Ok(first.and(r.eval(left, right)?))
            }
            Self::Or(l, r) => {
                let first = l.eval(left, right)?;
                if first == Truth::True {
                    return Ok(Truth::True);
                }
                Ok(first.or(r.eval(left, right)?))
            }
        }
    }
}

/// A predicate whose column references have been resolved to positions.
#[derive(Debug, Clone)]
pub struct BoundPredicate {
    root: Node,
    /// Row widths of the left and right schemas; 0 on the right for [Predicate::bind]
    widths: [usize; 2],
}

impl BoundPredicate {
    /// Evaluates a predicate bound with [Predicate::bind] against one row.
    ///
    /// # Errors
    /// - [Error::TypeMismatch][crate::error::Error::TypeMismatch] when a comparison mixes types
    /// - [SchemaError::ArityMismatch] when the row does not have the schema's width,
    ///   or the predicate was bound with [Predicate::bind_pair]
    pub fn eval(&self, row: &[Value]) -> Result<Truth> {
        self.eval_pair(row, &[])
    }

    /// Evaluates a predicate bound with [Predicate::bind_pair] against a pair of rows.
    ///
    /// # Errors
    /// As [BoundPredicate::eval], for either row.
    pub fn eval_pair(&self, left: &[Value], right: &[Value]) -> Result<Truth> {
        for (row, &expected) in [left, right].into_iter().zip(&self.widths) {
            if row.len() != expected {
                return Err(SchemaError::ArityMismatch {
                    expected,
                    found: row.len(),
                }
                .into());
            }
        }
        self.root.eval(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::error::Error;
    use crate::schema::ColumnDef;

    fn schema(qualifier: &str) -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("name", DataType::Text),
        ])
        .unwrap()
        .qualified(qualifier)
        .unwrap()
    }

    fn row(id: Option<i64>, name: &str) -> Vec<Value> {
        vec![Value::from(id), Value::from(name)]
    }

    #[test]
    fn test_comparison_operators() {
        let s = schema("t");
        let r = row(Some(5), "x");
        let cases = [
            (CompareOp::Eq, 5, Truth::True),
            (CompareOp::NotEq, 5, Truth::False),
            (CompareOp::Lt, 6, Truth::True),
            (CompareOp::LtEq, 5, Truth::True),
            (CompareOp::Gt, 5, Truth::False),
            (CompareOp::GtEq, 4, Truth::True),
        ];
        for (op, literal, expected) in cases {
            let bound = Predicate::column_literal("id", op, literal as i64)
                .bind(&s)
                .unwrap();
            assert_eq!(bound.eval(&r).unwrap(), expected, "id {op} {literal}");
        }
    }

    #[test]
    fn test_null_is_unknown() {
        let s = schema("t");
        let null_row = row(None, "x");
        for op in [CompareOp::Eq, CompareOp::NotEq, CompareOp::Lt] {
            let bound = Predicate::column_literal("id", op, 1_i64).bind(&s).unwrap();
            assert_eq!(bound.eval(&null_row).unwrap(), Truth::Unknown);
        }
        let null_literal = Predicate::compare(
            Operand::Column("id".into()),
            CompareOp::Eq,
            Operand::Literal(Value::Null),
        )
        .bind(&s)
        .unwrap();
        assert_eq!(null_literal.eval(&null_row).unwrap(), Truth::Unknown);
    }

    #[test]
    fn test_kleene_connectives() {
        let s = schema("t");
        let null_row = row(None, "x");
        let unknown = Predicate::column_literal("id", CompareOp::Eq, 1_i64);
        let yes = Predicate::column_literal("name", CompareOp::Eq, "x");
        let no = Predicate::column_literal("name", CompareOp::Eq, "y");

        let eval = |p: Predicate| p.bind(&s).unwrap().eval(&null_row).unwrap();
        assert_eq!(eval(unknown.clone().or(yes.clone())), Truth::True);
        assert_eq!(eval(unknown.clone().or(no.clone())), Truth::Unknown);
        assert_eq!(eval(unknown.clone().and(no.clone())), Truth::False);
        assert_eq!(eval(unknown.and(yes)), Truth::Unknown);
    }

    #[test]
    fn test_type_mismatch_at_evaluation() {
        let s = schema("t");
        let bound = Predicate::column_literal("name", CompareOp::Eq, 1_i64)
            .bind(&s)
            .unwrap();
        assert_eq!(
            bound.eval(&row(Some(1), "x")),
            Err(Error::TypeMismatch {
                left: DataType::Text,
                right: DataType::Int,
            })
        );
        // a NULL operand is unknown before types are compared
        assert_eq!(bound.eval(&[Value::Int(1), Value::Null]), Ok(Truth::Unknown));
    }

    #[test]
    fn test_bind_pair() {
        let left = schema("a");
        let right = schema("b");
        let bound = Predicate::columns("a.id", CompareOp::Lt, "b.id")
            .bind_pair(&left, &right)
            .unwrap();
        assert!(
            bound
                .eval_pair(&row(Some(1), "x"), &row(Some(2), "y"))
                .unwrap()
                .is_true()
        );

        assert_eq!(
            Predicate::columns("id", CompareOp::Eq, "b.id")
                .bind_pair(&left, &right)
                .unwrap_err(),
            SchemaError::AmbiguousColumn("id".into())
        );
        assert_eq!(
            Predicate::columns("a.id", CompareOp::Eq, "c.id")
                .bind_pair(&left, &right)
                .unwrap_err(),
            SchemaError::UnknownColumn("c.id".into())
        );
    }

    #[test]
    fn test_eval_checks_row_width() {
        let (left, right) = (schema("a"), schema("b"));
        let pair = Predicate::columns("a.id", CompareOp::Lt, "b.id")
            .bind_pair(&left, &right)
            .unwrap();
        assert_eq!(
            pair.eval(&row(Some(1), "x")),
            Err(Error::Schema(SchemaError::ArityMismatch {
                expected: 2,
                found: 0,
            }))
        );

        let single = Predicate::column_literal("name", CompareOp::Eq, "x")
            .bind(&left)
            .unwrap();
        assert_eq!(
            single.eval(&[Value::Int(1)]),
            Err(Error::Schema(SchemaError::ArityMismatch {
                expected: 2,
                found: 1,
            }))
        );
        assert!(
            single
                .eval_pair(&row(Some(1), "x"), &row(Some(2), "y"))
                .is_err()
        );
    }

    #[test]
    fn test_conjuncts_and_display() {
        let p = Predicate::column_literal("a", CompareOp::Gt, 1_i64)
            .and(Predicate::column_literal("b", CompareOp::Eq, "x"))
            .and(Predicate::columns("a", CompareOp::LtEq, "c"));
        assert_eq!(p.conjuncts().len(), 3);
        assert_eq!(p.column_refs().len(), 4);
        assert_eq!(p.to_string(), "((a > 1 AND b = 'x') AND a <= c)");
        assert_eq!(CompareOp::Lt.flipped(), CompareOp::Gt);
    }
}
