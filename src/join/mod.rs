//! Join engine: one entry point, several algorithms with the same output multiset.
//!
//! Every algorithm computes the list of matching `(left row, right row)`
//! position pairs in its own emission order; the output relation is then
//! assembled column by column from those pairs. The output schema is the
//! concatenation of both input schemas.

mod hash;
mod nested_loop;
mod sort_merge;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, SchemaError};
use crate::index::Index;
use crate::predicate::{CompareOp, Operand, Predicate, Side, resolve_pair};
use crate::relation::Relation;
use crate::schema::{ColumnRef, Schema};
use crate::value::Value;

/// Outer rows buffered per block by [Algorithm::BlockNestedLoop] unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Join strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Every left row against every right row. Accepts any condition.
    NestedLoop,
    /// Nested loop over blocks of left rows, one scan of the right relation per block.
    BlockNestedLoop,
    /// Hash index on the right relation, probed once per left row. Equi-joins only.
    Hash,
    /// Both sides sorted by key, merged in one pass. Equi-joins only.
    SortMerge,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Self::NestedLoop,
        Self::BlockNestedLoop,
        Self::Hash,
        Self::SortMerge,
    ];

    /// Whether the algorithm can evaluate `condition`.
    pub fn supports(self, condition: &JoinCondition) -> bool {
        match self {
            Self::NestedLoop | Self::BlockNestedLoop => true,
            Self::Hash | Self::SortMerge => condition.is_equi(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NestedLoop => "nested-loop",
            Self::BlockNestedLoop => "block-nested-loop",
            Self::Hash => "hash",
            Self::SortMerge => "sort-merge",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "nested-loop" | "nl" | "nlj" => Ok(Self::NestedLoop),
            "block-nested-loop" | "bnl" | "bnlj" => Ok(Self::BlockNestedLoop),
            "hash" | "hj" => Ok(Self::Hash),
            "sort-merge" | "smj" => Ok(Self::SortMerge),
            _ => Err(Error::UnsupportedOperation(format!(
                "unknown join algorithm {s:?}"
            ))),
        }
    }
}

/// The condition two rows must satisfy to be joined.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// Pairwise equality of (left column, right column) pairs.
    Equi(Vec<(ColumnRef, ColumnRef)>),
    /// Arbitrary predicate over columns of both relations.
    Theta(Predicate),
    /// No condition: the full cross product.
    Cross,
}

impl JoinCondition {
    /// Single-column equi-join `left = right`.
    pub fn equi(left: &str, right: &str) -> Self {
        Self::Equi(vec![(ColumnRef::parse(left), ColumnRef::parse(right))])
    }

    pub fn is_equi(&self) -> bool {
        matches!(self, Self::Equi(pairs) if !pairs.is_empty())
    }

    /// Classifies an ON/WHERE condition between two relations.
    ///
    /// A conjunction of `column = column` comparisons, each relating one column
    /// of `left` to one of `right`, becomes [JoinCondition::Equi] (pairs
    /// oriented left-to-right); anything else stays a [JoinCondition::Theta].
    pub fn from_predicate(predicate: Predicate, left: &Schema, right: &Schema) -> Self {
        match Self::equi_pairs(&predicate, left, right) {
            Some(pairs) => Self::Equi(pairs),
            None => Self::Theta(predicate),
        }
    }

    fn equi_pairs(
        predicate: &Predicate,
        left: &Schema,
        right: &Schema,
    ) -> Option<Vec<(ColumnRef, ColumnRef)>> {
        predicate
            .conjuncts()
            .into_iter()
            .map(|conjunct| {
                let Predicate::Compare {
                    left: Operand::Column(a),
                    op: CompareOp::Eq,
                    right: Operand::Column(b),
                } = conjunct
                else {
                    return None;
                };
                match (resolve_pair(left, right, a), resolve_pair(left, right, b)) {
                    (Ok((Side::Left, _)), Ok((Side::Right, _))) => Some((a.clone(), b.clone())),
                    (Ok((Side::Right, _)), Ok((Side::Left, _))) => Some((b.clone(), a.clone())),
                    _ => None,
                }
            })
            .collect()
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equi(pairs) => {
                let parts: Vec<String> = pairs.iter().map(|(l, r)| format!("{l} = {r}")).collect();
                f.write_str(&parts.join(" AND "))
            }
            Self::Theta(predicate) => write!(f, "{predicate}"),
            Self::Cross => f.write_str("TRUE"),
        }
    }
}

/// Key column positions of an equi-join, resolved against both inputs.
#[derive(Debug, Clone)]
pub(crate) struct EquiKeys {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl EquiKeys {
    /// Resolves the pairs and checks that paired key columns have the same type.
    fn bind(pairs: &[(ColumnRef, ColumnRef)], left: &Schema, right: &Schema) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::UnsupportedOperation(
                "equi-join without key columns".to_string(),
            ));
        }
        let mut keys = Self {
            left: Vec::with_capacity(pairs.len()),
            right: Vec::with_capacity(pairs.len()),
        };
        for (l, r) in pairs {
            let li = left.resolve(l)?;
            let ri = right.resolve(r)?;
            let lt = left.columns()[li].data_type;
            let rt = right.columns()[ri].data_type;
            if lt != rt {
                return Err(Error::TypeMismatch {
                    left: lt,
                    right: rt,
                });
            }
            keys.left.push(li);
            keys.right.push(ri);
        }
        Ok(keys)
    }
}

/// The key of every row of `relation`, `None` where a component is `NULL`.
pub(crate) fn row_keys(relation: &Relation, columns: &[usize]) -> Vec<Option<Vec<Value>>> {
    (0..relation.row_count())
        .map(|row| relation.key(row, columns))
        .collect()
}

/// Ephemeral state of one join: inputs, condition and the knobs of the
/// algorithms. Prebuilt indexes are only used when they cover the join keys.
///
/// # Example
/// ```
/// use reldb::join::{Algorithm, JoinCondition, JoinContext};
/// use reldb::{ColumnDef, DataType, Relation, Schema, Value};
///
/// let schema = |tag: &str| {
///     Schema::new(vec![
///         ColumnDef::new("k", DataType::Int),
///         ColumnDef::new(tag, DataType::Text),
///     ])
///     .unwrap()
/// };
/// let a = Relation::from_rows(
///     "a",
///     schema("s"),
///     vec![
///         vec![Value::Int(1), Value::from("x")],
///         vec![Value::Int(2), Value::from("y")],
///         vec![Value::Int(2), Value::from("z")],
///     ],
/// )
/// .unwrap();
/// let b = Relation::from_rows(
///     "b",
///     schema("t"),
///     vec![vec![Value::Int(2), Value::from("p")], vec![Value::Int(3), Value::from("q")]],
/// )
/// .unwrap();
///
/// let condition = JoinCondition::equi("a.k", "b.k");
/// let joined = JoinContext::new(&a, &b, &condition)
///     .with_block_size(2)
///     .execute(Algorithm::BlockNestedLoop)
///     .unwrap();
/// assert_eq!(joined.row_count(), 2);
/// assert_eq!(joined.schema().len(), 4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JoinContext<'a> {
    left: &'a Relation,
    right: &'a Relation,
    condition: &'a JoinCondition,
    block_size: usize,
    left_index: Option<&'a Index>,
    right_index: Option<&'a Index>,
}

impl<'a> JoinContext<'a> {
    pub fn new(left: &'a Relation, right: &'a Relation, condition: &'a JoinCondition) -> Self {
        Self {
            left,
            right,
            condition,
            block_size: DEFAULT_BLOCK_SIZE,
            left_index: None,
            right_index: None,
        }
    }

    /// Outer rows per block for [Algorithm::BlockNestedLoop] (at least 1).
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Prebuilt indexes on the left and right relations. A hash join reuses a
    /// hash index on the right relation; a sort-merge join reuses ordered
    /// indexes on either side.
    pub fn with_indexes(mut self, left: Option<&'a Index>, right: Option<&'a Index>) -> Self {
        self.left_index = left;
        self.right_index = right;
        self
    }

    /// Runs the join with `algorithm`.
    ///
    /// # Errors
    /// - [Error::UnsupportedOperation] for hash or sort-merge on a non-equi condition
    /// - [SchemaError] for unresolvable join columns or colliding output columns
    /// - [Error::TypeMismatch] for equi-join keys of different types, or from
    ///   evaluating a theta condition
    pub fn execute(&self, algorithm: Algorithm) -> Result<Relation> {
        if !algorithm.supports(self.condition) {
            return Err(Error::UnsupportedOperation(format!(
                "{algorithm} join requires an equi-join condition, got {}",
                self.condition
            )));
        }
        let schema = self.left.schema().concat(self.right.schema())?;
        log::debug!(
            "{algorithm} join of {} ({} rows) and {} ({} rows) on {}",
            self.left.name(),
            self.left.row_count(),
            self.right.name(),
            self.right.row_count(),
            self.condition
        );

        let pairs = match algorithm {
            Algorithm::NestedLoop => nested_loop::nested_loop(self)?,
            Algorithm::BlockNestedLoop => nested_loop::block_nested_loop(self, self.block_size)?,
            Algorithm::Hash => hash::hash_join(self, &self.equi_keys()?)?,
            Algorithm::SortMerge => sort_merge::sort_merge_join(self, &self.equi_keys()?)?,
        };
        log::trace!("{algorithm} join produced {} rows", pairs.len());
        Ok(self.assemble(schema, &pairs))
    }

    fn equi_keys(&self) -> Result<EquiKeys> {
        match self.condition {
            JoinCondition::Equi(pairs) => {
                EquiKeys::bind(pairs, self.left.schema(), self.right.schema())
            }
            _ => Err(Error::UnsupportedOperation(format!(
                "not an equi-join condition: {}",
                self.condition
            ))),
        }
    }

    /// Builds the output relation from matching position pairs.
    fn assemble(&self, schema: Schema, pairs: &[(usize, usize)]) -> Relation {
        let (left_pos, right_pos): (Vec<usize>, Vec<usize>) = pairs.iter().copied().unzip();
        let columns = self
            .left
            .columns()
            .iter()
            .map(|c| c.gather(&left_pos))
            .chain(self.right.columns().iter().map(|c| c.gather(&right_pos)))
            .collect();
        Relation::from_columns(
            format!("{}_{}", self.left.name(), self.right.name()),
            schema,
            columns,
        )
    }
}

/// Joins `left` and `right` on `condition` with `algorithm`.
///
/// All algorithms return the same multiset of rows; only the order differs:
/// - nested-loop: left row order, then right row order
/// - block nested-loop: block order, then right row order, then left row order in the block
/// - hash: left row order, then right row order within the bucket
/// - sort-merge: ascending key, then left row order, then right row order
///
/// Rows with a `NULL` key component never match.
pub fn join(
    left: &Relation,
    right: &Relation,
    condition: &JoinCondition,
    algorithm: Algorithm,
) -> Result<Relation> {
    JoinContext::new(left, right, condition).execute(algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::index::IndexKind;
    use crate::relation::Row;
    use crate::schema::ColumnDef;
    use quickcheck_macros::quickcheck;
    use test_log::test;

    fn relation(name: &str, tag: &str, rows: &[(Option<i64>, &str)]) -> Relation {
        let schema = Schema::new(vec![
            ColumnDef::new("k", DataType::Int),
            ColumnDef::new(tag, DataType::Text),
        ])
        .unwrap();
        Relation::from_rows(
            name,
            schema,
            rows.iter()
                .map(|(k, s)| vec![Value::from(*k), Value::from(*s)]),
        )
        .unwrap()
    }

    fn a() -> Relation {
        relation("a", "s", &[(Some(1), "x"), (Some(2), "y"), (Some(2), "z")])
    }

    fn b() -> Relation {
        relation("b", "t", &[(Some(2), "p"), (Some(3), "q")])
    }

    fn sorted_rows(relation: &Relation) -> Vec<Row> {
        let mut rows: Vec<Row> = relation.rows().collect();
        rows.sort();
        rows
    }

    fn row(k1: i64, s: &str, k2: i64, t: &str) -> Row {
        vec![
            Value::Int(k1),
            Value::from(s),
            Value::Int(k2),
            Value::from(t),
        ]
    }

    // ─────────────────────────────────────────────────────────────
    // Test 1 : the reference scenario under every algorithm
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_equi_join_all_algorithms() {
        let condition = JoinCondition::equi("a.k", "b.k");
        for algorithm in Algorithm::ALL {
            let joined = join(&a(), &b(), &condition, algorithm).unwrap();
            assert_eq!(
                joined.rows().collect::<Vec<_>>(),
                vec![row(2, "y", 2, "p"), row(2, "z", 2, "p")],
                "{algorithm}"
            );
            let names: Vec<String> = joined
                .schema()
                .columns()
                .iter()
                .map(|c| c.qualified_name())
                .collect();
            assert_eq!(names, ["a.k", "a.s", "b.k", "b.t"]);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Test 2 : empty inputs keep the schema
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_empty_input() {
        let empty = relation("e", "t", &[]);
        for algorithm in Algorithm::ALL {
            let joined = join(&a(), &empty, &JoinCondition::equi("a.k", "e.k"), algorithm).unwrap();
            assert!(joined.is_empty());
            assert_eq!(joined.schema().len(), 4);

            let joined = join(&empty, &a(), &JoinCondition::equi("e.k", "a.k"), algorithm).unwrap();
            assert!(joined.is_empty());
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Test 3 : NULL keys never match, not even each other
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_null_keys() {
        let left = relation("l", "s", &[(None, "n1"), (Some(1), "x")]);
        let right = relation("r", "t", &[(None, "n2"), (Some(1), "y")]);
        let condition = JoinCondition::equi("l.k", "r.k");
        for algorithm in Algorithm::ALL {
            let joined = join(&left, &right, &condition, algorithm).unwrap();
            assert_eq!(
                joined.rows().collect::<Vec<_>>(),
                vec![row(1, "x", 1, "y")],
                "{algorithm}"
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Test 4 : emission orders
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_emission_orders() {
        let left = relation("l", "s", &[(Some(2), "a"), (Some(1), "b"), (Some(2), "c")]);
        let right = relation("r", "t", &[(Some(2), "p"), (Some(1), "q"), (Some(2), "r")]);
        let condition = JoinCondition::equi("l.k", "r.k");
        let tags = |algorithm| -> Vec<String> {
            join(&left, &right, &condition, algorithm)
                .unwrap()
                .rows()
                .map(|r| format!("{}{}", r[1], r[3]))
                .collect()
        };

        assert_eq!(tags(Algorithm::NestedLoop), ["ap", "ar", "bq", "cp", "cr"]);
        assert_eq!(tags(Algorithm::Hash), ["ap", "ar", "bq", "cp", "cr"]);
        assert_eq!(tags(Algorithm::SortMerge), ["bq", "ap", "ar", "cp", "cr"]);

        let block = JoinContext::new(&left, &right, &condition)
            .with_block_size(2)
            .execute(Algorithm::BlockNestedLoop)
            .unwrap();
        let block: Vec<String> = block.rows().map(|r| format!("{}{}", r[1], r[3])).collect();
        assert_eq!(block, ["ap", "bq", "ar", "cp", "cr"]);
    }

    // ─────────────────────────────────────────────────────────────
    // Test 5 : theta and cross joins
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_theta_and_cross() {
        let theta = JoinCondition::Theta(Predicate::columns("a.k", CompareOp::Lt, "b.k"));
        for algorithm in [Algorithm::NestedLoop, Algorithm::BlockNestedLoop] {
            let joined = join(&a(), &b(), &theta, algorithm).unwrap();
            assert_eq!(joined.row_count(), 4, "{algorithm}");

            let cross = join(&a(), &b(), &JoinCondition::Cross, algorithm).unwrap();
            assert_eq!(cross.row_count(), 6);
        }

        for algorithm in [Algorithm::Hash, Algorithm::SortMerge] {
            assert!(matches!(
                join(&a(), &b(), &theta, algorithm),
                Err(Error::UnsupportedOperation(_))
            ));
            assert!(matches!(
                join(&a(), &b(), &JoinCondition::Cross, algorithm),
                Err(Error::UnsupportedOperation(_))
            ));
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Test 6 : schema and type errors
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_join_errors() {
        for algorithm in Algorithm::ALL {
            assert_eq!(
                join(&a(), &b(), &JoinCondition::equi("a.k", "b.missing"), algorithm).unwrap_err(),
                Error::Schema(SchemaError::UnknownColumn("b.missing".into()))
            );
            assert_eq!(
                join(&a(), &b(), &JoinCondition::equi("a.s", "b.k"), algorithm).unwrap_err(),
                Error::TypeMismatch {
                    left: DataType::Text,
                    right: DataType::Int,
                }
            );
            assert_eq!(
                join(&a(), &a(), &JoinCondition::equi("a.k", "a.k"), algorithm).unwrap_err(),
                Error::Schema(SchemaError::DuplicateColumn("a.k".into()))
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Test 7 : composite keys and classification of predicates
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_composite_and_classification() {
        let left = relation("l", "s", &[(Some(1), "x"), (Some(1), "y")]);
        let right = relation("r", "s", &[(Some(1), "y"), (Some(1), "x"), (Some(2), "x")]);
        let predicate = Predicate::columns("r.k", CompareOp::Eq, "l.k")
            .and(Predicate::columns("l.s", CompareOp::Eq, "r.s"));
        let condition = JoinCondition::from_predicate(predicate, left.schema(), right.schema());
        assert_eq!(
            condition,
            JoinCondition::Equi(vec![
                ("l.k".into(), "r.k".into()),
                ("l.s".into(), "r.s".into())
            ])
        );
        for algorithm in Algorithm::ALL {
            let joined = join(&left, &right, &condition, algorithm).unwrap();
            assert_eq!(joined.row_count(), 2, "{algorithm}");
        }

        let theta = Predicate::columns("l.k", CompareOp::Eq, "r.k")
            .and(Predicate::column_literal("r.s", CompareOp::Eq, "x"));
        assert!(matches!(
            JoinCondition::from_predicate(theta, left.schema(), right.schema()),
            JoinCondition::Theta(_)
        ));
    }

    // ─────────────────────────────────────────────────────────────
    // Test 8 : prebuilt indexes give the same result
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_index_reuse() {
        let (left, right) = (a(), b());
        let condition = JoinCondition::equi("a.k", "b.k");
        let hash = Index::build(&right, &["k".into()], IndexKind::Hash).unwrap();
        let left_tree = Index::build(&left, &["k".into()], IndexKind::Ordered).unwrap();
        let right_tree = Index::build(&right, &["k".into()], IndexKind::Ordered).unwrap();

        let expected = join(&left, &right, &condition, Algorithm::NestedLoop).unwrap();
        let with_hash = JoinContext::new(&left, &right, &condition)
            .with_indexes(None, Some(&hash))
            .execute(Algorithm::Hash)
            .unwrap();
        assert_eq!(with_hash, expected);
        let with_trees = JoinContext::new(&left, &right, &condition)
            .with_indexes(Some(&left_tree), Some(&right_tree))
            .execute(Algorithm::SortMerge)
            .unwrap();
        assert_eq!(with_trees, expected);

        // an index over another relation is ignored
        let stale = Index::build(&left, &["k".into()], IndexKind::Hash).unwrap();
        let ignored = JoinContext::new(&left, &right, &condition)
            .with_indexes(None, Some(&stale))
            .execute(Algorithm::Hash)
            .unwrap();
        assert_eq!(ignored, expected);
    }

    #[test]
    fn test_index_over_equal_sized_relation_ignored() {
        let left = keyed("l", &[Some(1), Some(2)]);
        let right = keyed("r", &[Some(1), Some(2)]);
        let other = keyed("o", &[Some(2), Some(3)]);
        let condition = JoinCondition::equi("l.k", "r.k");
        let expected = join(&left, &right, &condition, Algorithm::NestedLoop).unwrap();
        assert_eq!(expected.row_count(), 2);

        let hash = Index::build(&other, &["k".into()], IndexKind::Hash).unwrap();
        let tree = Index::build(&other, &["k".into()], IndexKind::Ordered).unwrap();
        let with_hash = JoinContext::new(&left, &right, &condition)
            .with_indexes(None, Some(&hash))
            .execute(Algorithm::Hash)
            .unwrap();
        assert_eq!(with_hash, expected);
        let with_trees = JoinContext::new(&left, &right, &condition)
            .with_indexes(Some(&tree), Some(&tree))
            .execute(Algorithm::SortMerge)
            .unwrap();
        assert_eq!(with_trees, expected);
    }

    #[test]
    fn test_algorithm_names() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<Algorithm>(), Ok(algorithm));
        }
        assert_eq!("SMJ".parse::<Algorithm>(), Ok(Algorithm::SortMerge));
        assert!("merge".parse::<Algorithm>().is_err());
        assert_eq!(
            serde_json::to_string(&Algorithm::BlockNestedLoop).unwrap(),
            "\"block-nested-loop\""
        );
    }

    fn keyed(name: &str, keys: &[Option<u8>]) -> Relation {
        let schema = Schema::new(vec![ColumnDef::new("k", DataType::Int)]).unwrap();
        Relation::from_rows(
            name,
            schema,
            keys.iter()
                .map(|k| vec![Value::from(k.map(|k| i64::from(k % 8)))]),
        )
        .unwrap()
    }

    #[quickcheck]
    fn prop_algorithms_agree(left: Vec<Option<u8>>, right: Vec<Option<u8>>, block: u8) -> bool {
        let (left, right) = (keyed("l", &left), keyed("r", &right));
        let condition = JoinCondition::equi("l.k", "r.k");
        let reference = sorted_rows(&join(&left, &right, &condition, Algorithm::NestedLoop).unwrap());
        let block = JoinContext::new(&left, &right, &condition)
            .with_block_size(usize::from(block))
            .execute(Algorithm::BlockNestedLoop)
            .unwrap();
        sorted_rows(&block) == reference
            && [Algorithm::Hash, Algorithm::SortMerge].into_iter().all(|algorithm| {
                sorted_rows(&join(&left, &right, &condition, algorithm).unwrap()) == reference
            })
    }

    #[quickcheck]
    fn prop_duplicate_keys_cross_product(k: u8, m: u8) -> bool {
        let (k, m) = (usize::from(k % 12), usize::from(m % 12));
        let left = keyed("l", &vec![Some(3); k]);
        let right = keyed("r", &vec![Some(3); m]);
        let condition = JoinCondition::equi("l.k", "r.k");
        Algorithm::ALL
            .into_iter()
            .all(|algorithm| join(&left, &right, &condition, algorithm).unwrap().row_count() == k * m)
    }

    #[quickcheck]
    fn prop_null_keys_never_joined(left: Vec<Option<u8>>, right: Vec<Option<u8>>) -> bool {
        let (left, right) = (keyed("l", &left), keyed("r", &right));
        let condition = JoinCondition::equi("l.k", "r.k");
        Algorithm::ALL.into_iter().all(|algorithm| {
            join(&left, &right, &condition, algorithm)
                .unwrap()
                .rows()
                .all(|row| row.iter().all(|v| !v.is_null()))
        })
    }
}
