use super::{ensure_reachable, Selection, Utxo};
use crate::error::Result;

/// Sorts by amount and accumulates a prefix until the target is met.
///
/// `largest_first` spends fewer, bigger inputs; otherwise the smallest
/// outputs (dust) are consumed first.
pub fn select_sorted(utxos: &[Utxo], target: u64, largest_first: bool) -> Result<Selection> {
    ensure_reachable(utxos, target)?;

    let mut order: Vec<usize> = (0..utxos.len()).collect();
    if largest_first {
        order.sort_by(|&a, &b| utxos[b].amount.cmp(&utxos[a].amount));
    } else {
        order.sort_by_key(|&i| utxos[i].amount);
    }

    let mut selected = vec![];
    let mut accumulated = 0u64;
    for idx in order {
        if accumulated >= target {
            break;
        }
        accumulated = accumulated.saturating_add(utxos[idx].amount);
        selected.push(utxos[idx].clone());
    }

    Ok(Selection {
        utxos: selected,
        total: accumulated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::testnet::test_utils::utxos;

    #[test]
    fn test_largest_first_uses_fewest_inputs() {
        let set = utxos(&[1, 2, 50, 3, 30]);
        let selection = select_sorted(&set, 60, true).unwrap();
        let amounts: Vec<u64> = selection.utxos.iter().map(|u| u.amount).collect();
        assert_eq!(amounts, vec![50, 30]);
        assert_eq!(selection.total, 80);
    }

    #[test]
    fn test_smallest_first_consumes_dust() {
        let set = utxos(&[1, 2, 50, 3, 30]);
        let selection = select_sorted(&set, 5, false).unwrap();
        let amounts: Vec<u64> = selection.utxos.iter().map(|u| u.amount).collect();
        assert_eq!(amounts, vec![1, 2, 3]);
        assert_eq!(selection.total, 6);
    }

    #[test]
    fn test_zero_target_selects_nothing() {
        let selection = select_sorted(&utxos(&[5]), 0, true).unwrap();
        assert!(selection.utxos.is_empty());
        assert_eq!(selection.total, 0);
    }

    #[test]
    fn test_insufficient() {
        assert!(matches!(
            select_sorted(&utxos(&[1, 1]), 3, false),
            Err(LedgerError::InsufficientFunds {
                required: 3,
                available: 2
            })
        ));
    }
}
