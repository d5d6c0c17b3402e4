use std::cmp::Ordering;

use super::{EquiKeys, JoinContext, row_keys};
use crate::error::Result;
use crate::index::Index;
use crate::relation::Relation;
use crate::value::Value;

/// Positions of the rows with a non-null key, sorted by key then position.
fn sorted_side(relation: &Relation, index: Option<&Index>, columns: &[usize]) -> Vec<usize> {
    if let Some(Index::Ordered(tree)) = index.filter(|i| i.covers(relation, columns)) {
        log::trace!("sort-merge join: reusing index on {}", relation.name());
        return tree.sorted_positions();
    }
    let keys = row_keys(relation, columns);
    let mut positions: Vec<usize> = (0..relation.row_count())
        .filter(|&p| keys[p].is_some())
        .collect();
    positions.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    log::trace!("sort-merge join: sorted {} rows of {}", positions.len(), relation.name());
    positions
}

/// Length of the run of equal keys starting at `start`.
fn group_len(sorted: &[usize], keys: &[Option<Vec<Value>>], start: usize) -> usize {
    sorted[start..]
        .iter()
        .take_while(|&&p| keys[p] == keys[sorted[start]])
        .count()
}

/// Sorts both sides by key, then merges them, expanding each group of equal
/// keys into the cross product of its left and right rows.
pub(super) fn sort_merge_join(
    ctx: &JoinContext<'_>,
    keys: &EquiKeys,
) -> Result<Vec<(usize, usize)>> {
    let left = sorted_side(ctx.left, ctx.left_index, &keys.left);
    let right = sorted_side(ctx.right, ctx.right_index, &keys.right);
    let left_keys = row_keys(ctx.left, &keys.left);
    let right_keys = row_keys(ctx.right, &keys.right);

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left_keys[left[i]].cmp(&right_keys[right[j]]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let left_end = i + group_len(&left, &left_keys, i);
                let right_end = j + group_len(&right, &right_keys, j);
                for &l in &left[i..left_end] {
                    pairs.extend(right[j..right_end].iter().map(|&r| (l, r)));
                }
                i = left_end;
                j = right_end;
            }
        }
    }
    Ok(pairs)
}
