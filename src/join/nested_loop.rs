use super::{EquiKeys, JoinCondition, JoinContext, row_keys};
use crate::error::Result;
use crate::predicate::BoundPredicate;
use crate::relation::Row;
use crate::value::Value;

/// A join condition prepared for pairwise evaluation.
enum Matcher {
    Keys {
        left: Vec<Option<Vec<Value>>>,
        right: Vec<Option<Vec<Value>>>,
    },
    Predicate {
        bound: BoundPredicate,
        left: Vec<Row>,
        right: Vec<Row>,
    },
    All,
}

impl Matcher {
    fn new(ctx: &JoinContext<'_>) -> Result<Self> {
        Ok(match ctx.condition {
            JoinCondition::Equi(pairs) => {
                let keys = EquiKeys::bind(pairs, ctx.left.schema(), ctx.right.schema())?;
                Self::Keys {
                    left: row_keys(ctx.left, &keys.left),
                    right: row_keys(ctx.right, &keys.right),
                }
            }
            JoinCondition::Theta(predicate) => Self::Predicate {
                bound: predicate.bind_pair(ctx.left.schema(), ctx.right.schema())?,
                left: ctx.left.rows().collect(),
                right: ctx.right.rows().collect(),
            },
            JoinCondition::Cross => Self::All,
        })
    }

    fn matches(&self, l: usize, r: usize) -> Result<bool> {
        match self {
            Self::Keys { left, right } => Ok(match (&left[l], &right[r]) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }),
            Self::Predicate { bound, left, right } => {
                Ok(bound.eval_pair(&left[l], &right[r])?.is_true())
            }
            Self::All => Ok(true),
        }
    }
}

/// Left-row-major, right-row-minor.
pub(super) fn nested_loop(ctx: &JoinContext<'_>) -> Result<Vec<(usize, usize)>> {
    let matcher = Matcher::new(ctx)?;
    let mut pairs = Vec::new();
    for l in 0..ctx.left.row_count() {
        for r in 0..ctx.right.row_count() {
            if matcher.matches(l, r)? {
                pairs.push((l, r));
            }
        }
    }
    Ok(pairs)
}

/// Scans the right relation once per block of `block_size` left rows.
/// Emission order: block, then right row, then left row within the block.
pub(super) fn block_nested_loop(
    ctx: &JoinContext<'_>,
    block_size: usize,
) -> Result<Vec<(usize, usize)>> {
    let matcher = Matcher::new(ctx)?;
    let left_rows = ctx.left.row_count();
    let mut pairs = Vec::new();
    let mut start = 0;
    while start < left_rows {
        let end = (start + block_size.max(1)).min(left_rows);
        log::trace!("block nested-loop: block of rows {start}..{end}");
        for r in 0..ctx.right.row_count() {
            for l in start..end {
                if matcher.matches(l, r)? {
                    pairs.push((l, r));
                }
            }
        }
        start = end;
    }
    Ok(pairs)
}
