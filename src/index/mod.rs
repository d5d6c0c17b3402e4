//! Secondary indexes over the key columns of one relation.
//!
//! An index maps key tuples to the positions of the rows holding them. It is
//! built in one pass over an immutable [Relation] and stays valid as long as
//! that relation does; there is no incremental maintenance. Rows whose key
//! contains `NULL` are never indexed.

mod hash;
mod ordered;

use std::fmt;
use std::ops::Bound;

use allocative::Allocative;
use serde::{Deserialize, Serialize};

pub use hash::HashIndex;
pub use ordered::{DEFAULT_ORDER, OrderedIndex};

use crate::data_type::DataType;
use crate::error::{Error, Result, SchemaError};
use crate::relation::Relation;
use crate::schema::ColumnRef;
use crate::value::Value;

/// Kind selector for [Index::build].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Equality lookups only
    Hash,
    /// Equality and range lookups, sorted traversal
    Ordered,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => f.write_str("hash"),
            Self::Ordered => f.write_str("ordered"),
        }
    }
}

/// What an index was built over: the relation, its key columns and their types.
#[derive(Debug, Clone, Allocative)]
pub(crate) struct KeyInfo {
    relation: String,
    relation_id: u64,
    row_count: usize,
    columns: Vec<usize>,
    names: Vec<String>,
    types: Vec<DataType>,
}

impl KeyInfo {
    fn new(relation: &Relation, columns: &[ColumnRef]) -> Result<Self, SchemaError> {
        let indices = relation.schema().resolve_all(columns)?;
        let defs: Vec<_> = indices
            .iter()
            .filter_map(|&i| relation.schema().column(i))
            .collect();
        Ok(Self {
            relation: relation.name().to_string(),
            relation_id: relation.id(),
            row_count: relation.row_count(),
            names: defs.iter().map(|c| c.qualified_name()).collect(),
            types: defs.iter().map(|c| c.data_type).collect(),
            columns: indices,
        })
    }

    /// Checks a probe key against the key columns.
    ///
    /// Returns `Ok(false)` when the key contains `NULL`: such a key matches nothing.
    fn check(&self, key: &[Value]) -> Result<bool> {
        if key.len() != self.types.len() {
            return Err(SchemaError::ArityMismatch {
                expected: self.types.len(),
                found: key.len(),
            }
            .into());
        }
        let mut comparable = true;
        for (value, &expected) in key.iter().zip(&self.types) {
            match value.data_type() {
                None => comparable = false,
                Some(found) if found != expected => {
                    return Err(Error::TypeMismatch {
                        left: expected,
                        right: found,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(comparable)
    }

    fn check_bound(&self, bound: Bound<&[Value]>) -> Result<bool> {
        match bound {
            Bound::Included(key) | Bound::Excluded(key) => self.check(key),
            Bound::Unbounded => Ok(true),
        }
    }

    /// Every non-null key of the relation with its row position, in row order.
    fn entries(&self, relation: &Relation) -> Vec<(Vec<Value>, usize)> {
        (0..relation.row_count())
            .filter_map(|row| relation.key(row, &self.columns).map(|key| (key, row)))
            .collect()
    }
}

/// An index over one or more columns of a relation.
///
/// # Example
/// ```
/// use reldb::index::{Index, IndexKind};
/// use reldb::{ColumnDef, DataType, Relation, Schema, Value};
///
/// let schema = Schema::new(vec![
///     ColumnDef::new("id", DataType::Int),
///     ColumnDef::new("tag", DataType::Text),
/// ])
/// .unwrap();
/// let a = Relation::from_rows(
///     "a",
///     schema,
///     vec![
///         vec![Value::Int(1), Value::from("x")],
///         vec![Value::Int(2), Value::from("y")],
///         vec![Value::Int(2), Value::from("z")],
///     ],
/// )
/// .unwrap();
///
/// let index = Index::build(&a, &["id".into()], IndexKind::Hash).unwrap();
/// assert_eq!(index.lookup(&[Value::Int(2)]).unwrap(), &[1, 2]);
/// assert!(index.lookup(&[Value::Int(7)]).unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Allocative)]
pub enum Index {
    Hash(HashIndex),
    Ordered(OrderedIndex),
}

impl Index {
    /// Builds an index of the given kind over `columns` of `relation`.
    ///
    /// # Errors
    /// [SchemaError::UnknownColumn] / [SchemaError::AmbiguousColumn] when a key
    /// column cannot be resolved.
    pub fn build(
        relation: &Relation,
        columns: &[ColumnRef],
        kind: IndexKind,
    ) -> Result<Self, SchemaError> {
        let index = match kind {
            IndexKind::Hash => Self::Hash(HashIndex::build(relation, columns)?),
            IndexKind::Ordered => Self::Ordered(OrderedIndex::build(relation, columns)?),
        };
        log::debug!(
            "built {kind} index on {}({}): {} rows, {} distinct keys",
            relation.name(),
            index.info().names.join(", "),
            index.entry_count(),
            index.distinct_keys()
        );
        Ok(index)
    }

    /// Sorts `relation` by the key columns and builds an index over the sorted copy.
    ///
    /// Rows with equal keys keep their relative order; rows with a `NULL` key
    /// sort first.
    pub fn build_clustered(
        relation: &Relation,
        columns: &[ColumnRef],
        kind: IndexKind,
    ) -> Result<(Relation, Self), SchemaError> {
        let keys: Vec<_> = columns.iter().map(|c| (c.clone(), false)).collect();
        let sorted = relation.sorted_by(&keys)?;
        let index = Self::build(&sorted, columns, kind)?;
        Ok((sorted, index))
    }

    fn info(&self) -> &KeyInfo {
        match self {
            Self::Hash(index) => &index.info,
            Self::Ordered(index) => &index.info,
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Hash(_) => IndexKind::Hash,
            Self::Ordered(_) => IndexKind::Ordered,
        }
    }

    /// Name of the relation the index was built over.
    pub fn relation_name(&self) -> &str {
        &self.info().relation
    }

    /// Positions of the key columns within the indexed relation's schema.
    pub fn key_columns(&self) -> &[usize] {
        &self.info().columns
    }

    /// Types of the key columns, in key order.
    pub fn key_types(&self) -> &[DataType] {
        &self.info().types
    }

    /// Whether this index can answer probes for `columns` of `relation`.
    ///
    /// The relation may have been renamed since the build (a table alias), but
    /// it must hold the rows the index was built over: a filtered, sorted or
    /// otherwise rebuilt relation is not covered.
    pub fn covers(&self, relation: &Relation, columns: &[usize]) -> bool {
        let info = self.info();
        info.relation_id == relation.id()
            && info.row_count == relation.row_count()
            && info.columns == columns
    }

    /// Number of indexed (non-null) rows.
    pub fn entry_count(&self) -> usize {
        match self {
            Self::Hash(index) => index.entry_count(),
            Self::Ordered(index) => index.entry_count(),
        }
    }

    pub fn distinct_keys(&self) -> usize {
        match self {
            Self::Hash(index) => index.distinct_keys(),
            Self::Ordered(index) => index.distinct_keys(),
        }
    }

    /// Exact-match lookup: the positions of the rows whose key equals `key`,
    /// in row order. A key containing `NULL` matches nothing.
    ///
    /// # Errors
    /// [Error::TypeMismatch] if a key component has the wrong type,
    /// [SchemaError::ArityMismatch] if the key has the wrong length.
    pub fn lookup(&self, key: &[Value]) -> Result<&[usize]> {
        if !self.info().check(key)? {
            return Ok(&[][..]);
        }
        Ok(match self {
            Self::Hash(index) => index.get(key),
            Self::Ordered(index) => index.get(key),
        })
    }

    /// Range lookup over `[lower, upper]`: positions in ascending key order,
    /// row order within one key.
    ///
    /// # Errors
    /// [Error::UnsupportedOperation] on a hash index.
    pub fn range_lookup(&self, lower: &[Value], upper: &[Value]) -> Result<Vec<usize>> {
        self.range(Bound::Included(lower), Bound::Included(upper))
    }

    /// Range lookup with arbitrary bounds. An empty range yields no positions.
    pub fn range(&self, lower: Bound<&[Value]>, upper: Bound<&[Value]>) -> Result<Vec<usize>> {
        match self {
            Self::Hash(_) => Err(Error::UnsupportedOperation(
                "range lookup on a hash index".to_string(),
            )),
            Self::Ordered(index) => {
                let lower_ok = index.info.check_bound(lower)?;
                let upper_ok = index.info.check_bound(upper)?;
                if !(lower_ok && upper_ok) {
                    return Ok(Vec::new());
                }
                Ok(index.range(lower, upper))
            }
        }
    }

    /// Bytes allocated on the heap by the index.
    pub fn memory_footprint(&self) -> usize {
        allocative::size_of_unique_allocated_data(self)
    }
}
