use super::{ensure_reachable, Selection, Utxo};
use crate::error::Result;
use rand::Rng;

/// Picks uniformly random, not yet chosen outputs until the target is met.
/// No optimality guarantee.
pub fn select_random(utxos: &[Utxo], target: u64) -> Result<Selection> {
    select_random_with(utxos, target, &mut rand::thread_rng())
}

pub fn select_random_with<R: Rng + ?Sized>(
    utxos: &[Utxo],
    target: u64,
    rng: &mut R,
) -> Result<Selection> {
    ensure_reachable(utxos, target)?;

    let mut remaining: Vec<usize> = (0..utxos.len()).collect();
    let mut picked = vec![];
    let mut accumulated = 0u64;
    while accumulated < target {
        let position = rng.gen_range(0..remaining.len());
        let idx = remaining.swap_remove(position);
        accumulated = accumulated.saturating_add(utxos[idx].amount);
        picked.push(idx);
    }

    Ok(Selection::from_indices(utxos, picked))
}
