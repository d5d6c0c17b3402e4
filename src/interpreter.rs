//! Statement execution against a [Catalog].
//!
//! A `SELECT` is executed in this order:
//! 1. every FROM / JOIN table is resolved (and renamed when aliased)
//! 2. WHERE conjuncts that mention a single table are applied to that table
//!    first, through a catalog index when index selection is enabled
//! 3. tables are joined left to right; WHERE conjuncts relating a table to
//!    the ones before it join the ON condition of that step
//! 4. the remaining conjuncts filter the joined relation
//! 5. ORDER BY, projection, DISTINCT and LIMIT, in that order

use std::cmp::Ordering;
use std::ops::Bound;
use std::slice;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::PlanConfig;
use crate::error::{Error, QueryError, Result};
use crate::index::IndexKind;
use crate::join::{Algorithm, JoinCondition, JoinContext};
use crate::predicate::{CompareOp, Operand, Predicate};
use crate::relation::Relation;
use crate::schema::ColumnRef;
use crate::sql::{
    self,
    ast::{BinaryOp, Expr, Select, SelectItems, Statement, TableRef},
};
use crate::value::Value;

/// A table of the statement: its catalog name and its (possibly filtered) rows.
struct Source {
    table: String,
    relation: Arc<Relation>,
}

/// A `column op literal` conjunct of a single table, resolved.
struct Comparison {
    conjunct: usize,
    column: usize,
    op: CompareOp,
    value: Value,
}

/// Executes statements against a catalog with a given planner configuration.
///
/// # Example
/// ```
/// use reldb::catalog::Catalog;
/// use reldb::config::PlanConfig;
/// use reldb::interpreter::Interpreter;
/// use reldb::{ColumnDef, DataType, Relation, Schema, Value};
///
/// let schema = Schema::new(vec![
///     ColumnDef::new("k", DataType::Int),
///     ColumnDef::new("v", DataType::Text),
/// ])
/// .unwrap();
/// let mut catalog = Catalog::new();
/// catalog.register(
///     Relation::from_rows(
///         "a",
///         schema.clone(),
///         vec![vec![Value::Int(1), Value::from("x")], vec![Value::Int(2), Value::from("y")]],
///     )
///     .unwrap(),
/// );
/// catalog.register(
///     Relation::from_rows("b", schema, vec![vec![Value::Int(2), Value::from("p")]]).unwrap(),
/// );
///
/// let interpreter = Interpreter::new(&catalog, PlanConfig::default());
/// let result = interpreter
///     .query("SELECT a.v, b.v FROM a JOIN b ON a.k = b.k")
///     .unwrap();
/// assert_eq!(result.row(0), Some(vec![Value::from("y"), Value::from("p")]));
/// ```
pub struct Interpreter<'a> {
    catalog: &'a Catalog,
    config: PlanConfig,
}

impl<'a> Interpreter<'a> {
    pub fn new(catalog: &'a Catalog, config: PlanConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Parses and executes one statement.
    pub fn query(&self, sql: &str) -> Result<Relation, QueryError> {
        let statement = sql::parse(sql)?;
        self.execute(&statement)
    }

    /// Executes a parsed statement.
    ///
    /// # Errors
    /// [QueryError::Execution] with the first unresolvable table or column,
    /// type error or unsupported construct. No partial result is returned.
    pub fn execute(&self, statement: &Statement) -> Result<Relation, QueryError> {
        match statement {
            Statement::Select(select) => Ok(self.select(select)?),
        }
    }

    fn source(&self, table: &TableRef) -> Result<Source> {
        let relation = self.catalog.get(&table.name)?;
        let relation = match &table.alias {
            Some(alias) => Arc::new(relation.renamed(alias)?),
            None => relation,
        };
        Ok(Source {
            table: table.name.clone(),
            relation,
        })
    }

    fn select(&self, select: &Select) -> Result<Relation> {
        let tables: Vec<&TableRef> = select
            .from
            .iter()
            .chain(select.joins.iter().map(|join| &join.table))
            .collect();
        let mut sources = tables
            .iter()
            .map(|table| self.source(table))
            .collect::<Result<Vec<_>>>()?;

        // split WHERE into per-table, linking and residual conjuncts
        let mut pushed: Vec<Vec<Predicate>> = vec![Vec::new(); sources.len()];
        let mut linking: Vec<(usize, Predicate)> = Vec::new();
        let mut residual: Vec<Predicate> = Vec::new();
        if let Some(selection) = &select.selection {
            let predicate = to_predicate(selection)?;
            for conjunct in predicate.conjuncts() {
                match referenced_sources(conjunct, &sources) {
                    Some(used) if used.len() == 1 => pushed[used[0]].push(conjunct.clone()),
                    Some(used) if used.len() > 1 => {
                        let last = used.iter().copied().max().unwrap_or_default();
                        linking.push((last, conjunct.clone()));
                    }
                    _ => residual.push(conjunct.clone()),
                }
            }
        }

        for (source, conjuncts) in sources.iter_mut().zip(pushed) {
            self.push_down(source, conjuncts)?;
        }

        let mut sources = sources.into_iter();
        let Some(first) = sources.next() else {
            return Err(Error::UnsupportedOperation(
                "SELECT without a table".to_string(),
            ));
        };
        let first_table = first.table;
        let mut joined = first.relation;
        for (step, right) in sources.enumerate() {
            let position = step + 1;
            let mut parts = Vec::new();
            if let Some(clause) = position
                .checked_sub(select.from.len())
                .and_then(|j| select.joins.get(j))
            {
                if let Some(on) = &clause.on {
                    parts.push(to_predicate(on)?);
                }
            }
            let (ready, pending): (Vec<_>, Vec<_>) = linking
                .into_iter()
                .partition(|(last, _)| *last == position);
            linking = pending;
            parts.extend(ready.into_iter().map(|(_, conjunct)| conjunct));

            let condition = match Predicate::conjunction(parts) {
                Some(predicate) => {
                    JoinCondition::from_predicate(predicate, joined.schema(), right.relation.schema())
                }
                None => JoinCondition::Cross,
            };
            let left_table = (position == 1).then_some(first_table.as_str());
            joined = Arc::new(self.join(&joined, left_table, &right, &condition)?);
        }
        residual.extend(linking.into_iter().map(|(_, conjunct)| conjunct));

        let mut result = Arc::unwrap_or_clone(joined);
        if let Some(predicate) = Predicate::conjunction(residual) {
            result = result.filter(&predicate)?;
        }
        if !select.order_by.is_empty() {
            let keys: Vec<(ColumnRef, bool)> = select
                .order_by
                .iter()
                .map(|order| (order.column.clone(), order.descending))
                .collect();
            result = result.sorted_by(&keys)?;
        }
        if let SelectItems::Columns(columns) = &select.items {
            result = result.project(columns)?;
        }
        if select.distinct {
            result = result.distinct();
        }
        if let Some(limit) = select.limit.filter(|&limit| limit < result.row_count()) {
            let positions: Vec<usize> = (0..limit).collect();
            result = result.gather(&positions);
        }
        Ok(result)
    }

    /// Applies the conjuncts that only concern `source`.
    fn push_down(&self, source: &mut Source, mut conjuncts: Vec<Predicate>) -> Result<()> {
        if conjuncts.is_empty() {
            return Ok(());
        }
        if self.config.index_selection {
            if let Some(selected) = self.select_by_index(source, &mut conjuncts)? {
                source.relation = Arc::new(selected);
            }
        }
        if let Some(predicate) = Predicate::conjunction(conjuncts) {
            source.relation = Arc::new(source.relation.filter(&predicate)?);
        }
        Ok(())
    }

    /// Answers the comparisons on one indexed column through the catalog
    /// index, and removes them from `conjuncts`. Returns `None` if no
    /// comparison can use an index.
    fn select_by_index(
        &self,
        source: &Source,
        conjuncts: &mut Vec<Predicate>,
    ) -> Result<Option<Relation>> {
        let relation = &source.relation;
        let comparisons: Vec<Comparison> = conjuncts
            .iter()
            .enumerate()
            .filter_map(|(conjunct, predicate)| {
                let (column, op, value) = column_comparison(predicate)?;
                let column = relation.schema().resolve(column).ok()?;
                (op != CompareOp::NotEq).then(|| Comparison {
                    conjunct,
                    column,
                    op,
                    value: value.clone(),
                })
            })
            .collect();

        for candidate in &comparisons {
            let column = candidate.column;
            let on_column: Vec<&Comparison> =
                comparisons.iter().filter(|c| c.column == column).collect();
            let equality_only = on_column.iter().all(|c| c.op == CompareOp::Eq);
            let index = self
                .catalog
                .find_index(&source.table, &[column], Some(IndexKind::Ordered))
                .or_else(|| {
                    equality_only
                        .then(|| {
                            self.catalog
                                .find_index(&source.table, &[column], Some(IndexKind::Hash))
                        })
                        .flatten()
                })
                .filter(|index| index.covers(relation, &[column]));
            let Some(index) = index else {
                continue;
            };

            // a literal of another type is left to the filter, which reports
            // the mismatch when it evaluates a row
            let column_type = relation.schema().columns()[column].data_type;
            if on_column
                .iter()
                .any(|c| c.value.data_type().is_some_and(|t| t != column_type))
            {
                continue;
            }

            let mut positions = match key_range(&on_column) {
                None => Vec::new(),
                Some((lower, upper)) => match index.kind() {
                    IndexKind::Ordered => index.range(
                        lower.as_ref().map(slice::from_ref),
                        upper.as_ref().map(slice::from_ref),
                    )?,
                    IndexKind::Hash => match (&lower, &upper) {
                        (Bound::Included(lo), Bound::Included(hi)) if lo == hi => {
                            index.lookup(slice::from_ref(lo))?.to_vec()
                        }
                        _ => Vec::new(),
                    },
                },
            };
            positions.sort_unstable();
            log::debug!(
                "index selection on {}.{}: {} of {} rows",
                source.table,
                relation.schema().columns()[column].name,
                positions.len(),
                relation.row_count()
            );

            let used: Vec<usize> = on_column.iter().map(|c| c.conjunct).collect();
            let mut position = 0;
            conjuncts.retain(|_| {
                let keep = !used.contains(&position);
                position += 1;
                keep
            });
            return Ok(Some(relation.gather(&positions)));
        }
        Ok(None)
    }

    /// Joins the accumulated relation with the next table.
    fn join(
        &self,
        left: &Relation,
        left_table: Option<&str>,
        right: &Source,
        condition: &JoinCondition,
    ) -> Result<Relation> {
        let mut algorithm = self.config.algorithm_for(condition);
        if !algorithm.supports(condition) {
            log::debug!("{algorithm} join cannot evaluate {condition}, using nested loop");
            algorithm = Algorithm::NestedLoop;
        }

        let wanted = match algorithm {
            Algorithm::Hash => Some(IndexKind::Hash),
            Algorithm::SortMerge => Some(IndexKind::Ordered),
            _ => None,
        };
        let (mut left_index, mut right_index) = (None, None);
        if let (JoinCondition::Equi(pairs), Some(kind), true) =
            (condition, wanted, self.config.reuse_indexes)
        {
            let (left_refs, right_refs): (Vec<ColumnRef>, Vec<ColumnRef>) =
                pairs.iter().cloned().unzip();
            if let (Some(table), Ok(columns)) = (left_table, left.schema().resolve_all(&left_refs)) {
                left_index = self.catalog.find_index(table, &columns, Some(kind));
            }
            if let Ok(columns) = right.relation.schema().resolve_all(&right_refs) {
                right_index = self.catalog.find_index(&right.table, &columns, Some(kind));
            }
        }

        JoinContext::new(left, &right.relation, condition)
            .with_block_size(self.config.block_size)
            .with_indexes(left_index, right_index)
            .execute(algorithm)
    }
}

/// Translates a WHERE / ON expression into a predicate tree.
fn to_predicate(expr: &Expr) -> Result<Predicate> {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => Ok(to_predicate(left)?.and(to_predicate(right)?)),
        Expr::Binary {
            left,
            op: BinaryOp::Or,
            right,
        } => Ok(to_predicate(left)?.or(to_predicate(right)?)),
        Expr::Binary { left, op, right } => {
            let op = comparison(*op).ok_or_else(|| {
                Error::UnsupportedOperation(format!("{op} is not a comparison"))
            })?;
            Ok(Predicate::compare(to_operand(left)?, op, to_operand(right)?))
        }
        other => Err(Error::UnsupportedOperation(format!(
            "{other} is not a condition"
        ))),
    }
}

fn to_operand(expr: &Expr) -> Result<Operand> {
    match expr {
        Expr::Column(column) => Ok(Operand::Column(column.clone())),
        Expr::Literal(value) => Ok(Operand::Literal(value.clone())),
        other => Err(Error::UnsupportedOperation(format!(
            "{other} cannot be compared"
        ))),
    }
}

fn comparison(op: BinaryOp) -> Option<CompareOp> {
    match op {
        BinaryOp::Eq => Some(CompareOp::Eq),
        BinaryOp::NotEq => Some(CompareOp::NotEq),
        BinaryOp::Lt => Some(CompareOp::Lt),
        BinaryOp::LtEq => Some(CompareOp::LtEq),
        BinaryOp::Gt => Some(CompareOp::Gt),
        BinaryOp::GtEq => Some(CompareOp::GtEq),
        BinaryOp::And | BinaryOp::Or => None,
    }
}

/// Indexes (ascending) of the sources the predicate's columns belong to.
/// `None` when a column matches no source or several.
fn referenced_sources(predicate: &Predicate, sources: &[Source]) -> Option<Vec<usize>> {
    let mut used = Vec::new();
    for reference in predicate.column_refs() {
        let mut owners = sources
            .iter()
            .enumerate()
            .filter(|(_, source)| source.relation.schema().resolve(reference).is_ok())
            .map(|(i, _)| i);
        let owner = owners.next()?;
        if owners.next().is_some() {
            return None;
        }
        if !used.contains(&owner) {
            used.push(owner);
        }
    }
    used.sort_unstable();
    Some(used)
}

/// `column op literal`, with `literal op column` flipped around.
fn column_comparison(predicate: &Predicate) -> Option<(&ColumnRef, CompareOp, &Value)> {
    match predicate {
        Predicate::Compare {
            left: Operand::Column(column),
            op,
            right: Operand::Literal(value),
        } => Some((column, *op, value)),
        Predicate::Compare {
            left: Operand::Literal(value),
            op,
            right: Operand::Column(column),
        } => Some((column, op.flipped(), value)),
        _ => None,
    }
}

/// Keeps the tighter of two bounds: `wanted` is `Greater` for lower bounds
/// and `Less` for upper bounds.
fn tighten(current: Bound<Value>, new: Bound<Value>, wanted: Ordering) -> Bound<Value> {
    let (Bound::Included(old) | Bound::Excluded(old)) = &current else {
        return new;
    };
    let (Bound::Included(value) | Bound::Excluded(value)) = &new else {
        return current;
    };
    match value.cmp(old) {
        Ordering::Equal if matches!(new, Bound::Excluded(_)) => new,
        ordering if ordering == wanted => new,
        _ => current,
    }
}

/// The key range satisfying every comparison; `None` if a literal is `NULL`.
fn key_range(comparisons: &[&Comparison]) -> Option<(Bound<Value>, Bound<Value>)> {
    let mut lower = Bound::Unbounded;
    let mut upper = Bound::Unbounded;
    for comparison in comparisons {
        if comparison.value.is_null() {
            return None;
        }
        let value = comparison.value.clone();
        let (low, high) = match comparison.op {
            CompareOp::Eq => (Bound::Included(value.clone()), Bound::Included(value)),
            CompareOp::Gt => (Bound::Excluded(value), Bound::Unbounded),
            CompareOp::GtEq => (Bound::Included(value), Bound::Unbounded),
            CompareOp::Lt => (Bound::Unbounded, Bound::Excluded(value)),
            CompareOp::LtEq => (Bound::Unbounded, Bound::Included(value)),
            CompareOp::NotEq => (Bound::Unbounded, Bound::Unbounded),
        };
        lower = tighten(lower, low, Ordering::Greater);
        upper = tighten(upper, high, Ordering::Less);
    }
    Some((lower, upper))
}
