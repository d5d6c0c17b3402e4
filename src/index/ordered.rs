use std::ops::Bound;

use allocative::Allocative;

use super::KeyInfo;
use crate::error::SchemaError;
use crate::relation::Relation;
use crate::schema::ColumnRef;
use crate::value::Value;

/// Default tree order: leaves hold up to `2 * order` entries.
pub const DEFAULT_ORDER: usize = 15;

/// One key of the index together with every row holding it, in row order.
#[derive(Debug, Clone, Allocative)]
struct DataEntry {
    key: Vec<Value>,
    rows: Vec<usize>,
}

/// Routing node: `children[i]` holds the keys in `[keys[i - 1], keys[i])`.
#[derive(Debug, Clone, Allocative)]
struct InnerNode {
    keys: Vec<Vec<Value>>,
    children: Vec<usize>,
}

/// A B+-tree bulk-loaded from the sorted keys of a relation.
///
/// Leaves are stored left to right in `leaves`, so a range scan walks the
/// vector after locating its first leaf. `levels[0]` routes into the leaves,
/// the last level holds the root alone.
#[derive(Debug, Clone, Allocative)]
pub struct OrderedIndex {
    pub(super) info: KeyInfo,
    order: usize,
    leaves: Vec<Vec<DataEntry>>,
    levels: Vec<Vec<InnerNode>>,
    entry_count: usize,
}

/// Splits `total` items into nodes of at most `capacity` items. When the
/// remainder would leave the last node under `minimum`, the last two nodes
/// share the remainder evenly instead.
fn node_sizes(total: usize, capacity: usize, minimum: usize) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(total.div_ceil(capacity.max(1)));
    let mut remaining = total;
    while remaining > 0 {
        if remaining > capacity && remaining < capacity + minimum {
            sizes.push(remaining / 2);
            sizes.push(remaining - remaining / 2);
            break;
        }
        let size = remaining.min(capacity);
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

impl OrderedIndex {
    pub fn build(relation: &Relation, columns: &[ColumnRef]) -> Result<Self, SchemaError> {
        Self::build_with_order(relation, columns, DEFAULT_ORDER)
    }

    /// Builds the tree with the given order (clamped to at least 1).
    pub fn build_with_order(
        relation: &Relation,
        columns: &[ColumnRef],
        order: usize,
    ) -> Result<Self, SchemaError> {
        let order = order.max(1);
        let info = KeyInfo::new(relation, columns)?;
        let mut entries = info.entries(relation);
        let entry_count = entries.len();
        // stable: equal keys keep their row order
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut grouped: Vec<DataEntry> = Vec::new();
        for (key, row) in entries {
            match grouped.last_mut() {
                Some(last) if last.key == key => last.rows.push(row),
                _ => grouped.push(DataEntry {
                    key,
                    rows: vec![row],
                }),
            }
        }

        let mut leaves = Vec::new();
        let mut rest = grouped.into_iter();
        for size in node_sizes(rest.len(), 2 * order, order) {
            leaves.push(rest.by_ref().take(size).collect::<Vec<_>>());
        }

        let levels = Self::build_levels(&leaves, order);
        log::trace!(
            "ordered index on {}: {} leaves, height {}",
            relation.name(),
            leaves.len(),
            levels.len() + 1
        );

        Ok(Self {
            info,
            order,
            leaves,
            levels,
            entry_count,
        })
    }

    /// Builds the inner levels bottom-up until a single root remains.
    fn build_levels(leaves: &[Vec<DataEntry>], order: usize) -> Vec<Vec<InnerNode>> {
        let mut levels = Vec::new();
        // smallest key below each node of the level being grouped
        let mut lowest: Vec<Vec<Value>> = leaves
            .iter()
            .filter_map(|leaf| leaf.first().map(|entry| entry.key.clone()))
            .collect();

        while lowest.len() > 1 {
            let mut level = Vec::new();
            let mut next_lowest = Vec::new();
            let mut start = 0;
            for size in node_sizes(lowest.len(), 2 * order + 1, order + 1) {
                level.push(InnerNode {
                    keys: lowest[start + 1..start + size].to_vec(),
                    children: (start..start + size).collect(),
                });
                next_lowest.push(lowest[start].clone());
                start += size;
            }
            levels.push(level);
            lowest = next_lowest;
        }
        levels
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of levels, leaves included. An empty index has height 0.
    pub fn height(&self) -> usize {
        if self.leaves.is_empty() {
            0
        } else {
            self.levels.len() + 1
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn distinct_keys(&self) -> usize {
        self.leaves.iter().map(Vec::len).sum()
    }

    /// Descends from the root to the leaf that would hold `key`.
    fn find_leaf(&self, key: &[Value]) -> Option<usize> {
        if self.leaves.is_empty() {
            return None;
        }
        let mut node = 0;
        for level in self.levels.iter().rev() {
            let inner = &level[node];
            let slot = inner.keys.partition_point(|k| k.as_slice() <= key);
            node = inner.children[slot];
        }
        Some(node)
    }

    /// Positions for `key`, without type checks.
    pub(crate) fn get(&self, key: &[Value]) -> &[usize] {
        let Some(leaf) = self.find_leaf(key).map(|l| &self.leaves[l]) else {
            return &[];
        };
        match leaf.binary_search_by(|entry| entry.key.as_slice().cmp(key)) {
            Ok(i) => leaf[i].rows.as_slice(),
            Err(_) => &[],
        }
    }

    /// Positions with a key inside the bounds, ascending by key.
    pub(crate) fn range(&self, lower: Bound<&[Value]>, upper: Bound<&[Value]>) -> Vec<usize> {
        let above_lower = |key: &[Value]| match lower {
            Bound::Included(lo) => key >= lo,
            Bound::Excluded(lo) => key > lo,
            Bound::Unbounded => true,
        };
        let below_upper = |key: &[Value]| match upper {
            Bound::Included(hi) => key <= hi,
            Bound::Excluded(hi) => key < hi,
            Bound::Unbounded => true,
        };

        let first_leaf = match lower {
            Bound::Included(lo) | Bound::Excluded(lo) => self.find_leaf(lo),
            Bound::Unbounded => (!self.leaves.is_empty()).then_some(0),
        };
        let Some(first_leaf) = first_leaf else {
            return Vec::new();
        };

        let mut positions = Vec::new();
        let entries = self.leaves[first_leaf..].iter().flatten();
        for entry in entries.skip_while(|e| !above_lower(e.key.as_slice())) {
            if !below_upper(entry.key.as_slice()) {
                break;
            }
            positions.extend_from_slice(&entry.rows);
        }
        positions
    }

    /// All indexed positions, ordered by key and by row within one key.
    pub fn sorted_positions(&self) -> Vec<usize> {
        self.leaves
            .iter()
            .flatten()
            .flat_map(|entry| entry.rows.iter().copied())
            .collect()
    }

    /// The distinct keys with their positions, in key order.
    pub fn groups(&self) -> impl Iterator<Item = (&[Value], &[usize])> + '_ {
        self.leaves
            .iter()
            .flatten()
            .map(|entry| (entry.key.as_slice(), entry.rows.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::schema::{ColumnDef, Schema};

    fn numbers(n: i64) -> Relation {
        let schema = Schema::new(vec![ColumnDef::new("n", DataType::Int)]).unwrap();
        // every key twice, in descending order
        Relation::from_rows(
            "numbers",
            schema,
            (0..2 * n).map(|i| vec![Value::Int((2 * n - 1 - i) / 2)]),
        )
        .unwrap()
    }

    #[test]
    fn test_node_sizes() {
        assert_eq!(node_sizes(0, 4, 2), Vec::<usize>::new());
        assert_eq!(node_sizes(3, 4, 2), vec![3]);
        assert_eq!(node_sizes(8, 4, 2), vec![4, 4]);
        // 4 + 1 would leave an underfull node
        assert_eq!(node_sizes(5, 4, 2), vec![2, 3]);
        assert_eq!(node_sizes(9, 4, 2), vec![4, 2, 3]);
        assert_eq!(node_sizes(10, 4, 2), vec![4, 4, 2]);
    }

    #[test]
    fn test_multi_level_tree() {
        let relation = numbers(100);
        let index = OrderedIndex::build_with_order(&relation, &["n".into()], 2).unwrap();

        assert_eq!(index.order(), 2);
        assert_eq!(index.distinct_keys(), 100);
        assert_eq!(index.entry_count(), 200);
        assert!(index.height() >= 3);
        for leaf in &index.leaves {
            assert!((2..=4).contains(&leaf.len()));
        }

        for key in 0..100 {
            let rows = index.get(&[Value::Int(key)]);
            let expected_first = (199 - 2 * key - 1) as usize;
            assert_eq!(rows, &[expected_first, expected_first + 1]);
        }
        assert!(index.get(&[Value::Int(100)]).is_empty());
        assert!(index.get(&[Value::Int(-1)]).is_empty());
    }

    #[test]
    fn test_range_crosses_leaves() {
        let relation = numbers(50);
        let index = OrderedIndex::build_with_order(&relation, &["n".into()], 1).unwrap();
        let lo = [Value::Int(10)];
        let hi = [Value::Int(20)];
        let positions = index.range(Bound::Included(&lo[..]), Bound::Excluded(&hi[..]));
        assert_eq!(positions.len(), 20);

        let keys: Vec<Value> = positions
            .iter()
            .filter_map(|&p| relation.value(p, 0))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.first(), Some(&Value::Int(10)));
        assert_eq!(keys.last(), Some(&Value::Int(19)));
    }

    #[test]
    fn test_sorted_positions_and_groups() {
        let relation = numbers(3);
        let index = OrderedIndex::build(&relation, &["n".into()]).unwrap();
        assert_eq!(index.height(), 1);
        assert_eq!(index.sorted_positions(), vec![4, 5, 2, 3, 0, 1]);
        let keys: Vec<&[Value]> = index.groups().map(|(key, _)| key).collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], &[Value::Int(0)]);
    }

    #[test]
    fn test_empty_index() {
        let relation = numbers(0);
        let index = OrderedIndex::build(&relation, &["n".into()]).unwrap();
        assert_eq!(index.height(), 0);
        assert!(index.get(&[Value::Int(0)]).is_empty());
        assert!(index.range(Bound::Unbounded, Bound::Unbounded).is_empty());
        assert!(index.sorted_positions().is_empty());
    }
}
