use super::{ensure_reachable, select_sorted, Selection, Utxo};
use crate::error::Result;

/// Above this many candidates the exhaustive search falls back to
/// largest-first greedy. Each half enumerates up to 2^16 subsets.
pub const MAX_EXHAUSTIVE_UTXOS: usize = 32;

#[derive(Debug, Clone)]
struct SubsetSum {
    sum: u64,
    indices: Vec<usize>,
}

/// Finds the subset whose total is the smallest value that still reaches
/// `target`.
///
/// The candidates are split into two halves and every pick/leave branch of
/// each half is enumerated, cutting a branch as soon as its running sum
/// reaches the target. The right half is sorted by sum, and for every left
/// subset a binary search finds the smallest right subset that closes the
/// remaining gap. Ties keep the first combination found.
pub fn select_meet_in_the_middle(utxos: &[Utxo], target: u64) -> Result<Selection> {
    ensure_reachable(utxos, target)?;
    if utxos.len() > MAX_EXHAUSTIVE_UTXOS {
        log::debug!(
            "{} utxos exceed the exhaustive limit of {MAX_EXHAUSTIVE_UTXOS}, using largest-first",
            utxos.len()
        );
        return select_sorted(utxos, target, true);
    }

    let mid = utxos.len() / 2;
    let left = enumerate_half(utxos, 0..mid, target);
    let mut right = enumerate_half(utxos, mid..utxos.len(), target);
    right.sort_by_key(|s| s.sum);

    let mut best: Option<(u64, &SubsetSum, Option<&SubsetSum>)> = None;
    for first in &left {
        let candidate = if first.sum >= target {
            Some((first.sum, None))
        } else {
            let gap = target - first.sum;
            smallest_reaching(&right, gap).map(|second| (first.sum + second.sum, Some(second)))
        };

        if let Some((total, second)) = candidate {
            let improves = best.as_ref().map_or(true, |(current, _, _)| total < *current);
            if improves {
                best = Some((total, first, second));
                if total == target {
                    break;
                }
            }
        }
    }

    // ensure_reachable guarantees the full set closes the gap, so some
    // left/right pairing is always found
    let mut indices = vec![];
    if let Some((_, first, second)) = best {
        indices.extend_from_slice(&first.indices);
        if let Some(second) = second {
            indices.extend_from_slice(&second.indices);
        }
    }
    Ok(Selection::from_indices(utxos, indices))
}

/// Enumerates the subsets of `utxos[range]`, stopping each branch once its
/// sum reaches the target
fn enumerate_half(utxos: &[Utxo], range: std::ops::Range<usize>, target: u64) -> Vec<SubsetSum> {
    let mut out = vec![];
    let mut picked = vec![];
    walk(utxos, range.start, range.end, 0, target, &mut picked, &mut out);
    out
}

fn walk(
    utxos: &[Utxo],
    pos: usize,
    end: usize,
    sum: u64,
    target: u64,
    picked: &mut Vec<usize>,
    out: &mut Vec<SubsetSum>,
) {
    if sum >= target || pos == end {
        out.push(SubsetSum {
            sum,
            indices: picked.clone(),
        });
        return;
    }

    picked.push(pos);
    walk(
        utxos,
        pos + 1,
        end,
        sum.saturating_add(utxos[pos].amount),
        target,
        picked,
        out,
    );
    picked.pop();

    walk(utxos, pos + 1, end, sum, target, picked, out);
}

/// Smallest entry of `sorted` whose sum is at least `gap`
fn smallest_reaching(sorted: &[SubsetSum], gap: u64) -> Option<&SubsetSum> {
    let idx = sorted.partition_point(|s| s.sum < gap);
    sorted.get(idx)
}
