//! UTXO selection policies
//!
//! All policies take the spendable outputs of one address and a target
//! amount and return a subset whose total reaches the target. They are pure
//! functions over in-memory lists and never touch persisted state.
//!
//! ## Policies
//! - **Meet-in-the-middle**: near-optimal, minimizes the overshoot
//! - **Largest first / smallest first**: sorted greedy accumulation
//! - **Random**: uniform random accumulation, a baseline only

pub mod greedy;
pub mod meet_in_middle;
pub mod random;

pub use greedy::select_sorted;
pub use meet_in_middle::{select_meet_in_the_middle, MAX_EXHAUSTIVE_UTXOS};
pub use random::{select_random, select_random_with};

use crate::core::OutPoint;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A spendable output together with its amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub amount: u64,
}

impl Utxo {
    pub fn new(transaction_id: &str, vout: u32, amount: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(transaction_id, vout),
            amount,
        }
    }
}

/// Chosen inputs and their total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub utxos: Vec<Utxo>,
    pub total: u64,
}

impl Selection {
    pub(crate) fn from_indices(utxos: &[Utxo], mut indices: Vec<usize>) -> Selection {
        indices.sort_unstable();
        let chosen: Vec<Utxo> = indices.iter().map(|&i| utxos[i].clone()).collect();
        let total = sum_amounts(&chosen);
        Selection {
            utxos: chosen,
            total,
        }
    }

    /// Amount left over after paying `target`
    pub fn change(&self, target: u64) -> u64 {
        self.total.saturating_sub(target)
    }

    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.utxos.iter().map(|u| u.outpoint.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionAlgorithm {
    #[default]
    MeetInTheMiddle,
    LargestFirst,
    SmallestFirst,
    Random,
}

impl FromStr for SelectionAlgorithm {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "meet-in-the-middle" | "mitm" | "optimal" => Ok(SelectionAlgorithm::MeetInTheMiddle),
            "largest-first" | "descending" => Ok(SelectionAlgorithm::LargestFirst),
            "smallest-first" | "ascending" => Ok(SelectionAlgorithm::SmallestFirst),
            "random" => Ok(SelectionAlgorithm::Random),
            _ => Err(LedgerError::Validation(format!(
                "Unknown selection algorithm {s:?}. Valid options: meet-in-the-middle, largest-first, smallest-first, random"
            ))),
        }
    }
}

impl fmt::Display for SelectionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionAlgorithm::MeetInTheMiddle => write!(f, "meet-in-the-middle"),
            SelectionAlgorithm::LargestFirst => write!(f, "largest-first"),
            SelectionAlgorithm::SmallestFirst => write!(f, "smallest-first"),
            SelectionAlgorithm::Random => write!(f, "random"),
        }
    }
}

/// Runs the chosen policy
pub fn select_utxos(utxos: &[Utxo], target: u64, algorithm: SelectionAlgorithm) -> Result<Selection> {
    let selection = match algorithm {
        SelectionAlgorithm::MeetInTheMiddle => select_meet_in_the_middle(utxos, target)?,
        SelectionAlgorithm::LargestFirst => select_sorted(utxos, target, true)?,
        SelectionAlgorithm::SmallestFirst => select_sorted(utxos, target, false)?,
        SelectionAlgorithm::Random => select_random(utxos, target)?,
    };
    log::debug!(
        "{algorithm} selected {} of {} utxos totalling {} for target {target}",
        selection.utxos.len(),
        utxos.len(),
        selection.total
    );
    Ok(selection)
}

pub(crate) fn sum_amounts(utxos: &[Utxo]) -> u64 {
    utxos
        .iter()
        .fold(0u64, |acc, u| acc.saturating_add(u.amount))
}

/// Fails with `InsufficientFunds` when even the full set misses the target
pub(crate) fn ensure_reachable(utxos: &[Utxo], target: u64) -> Result<u64> {
    let available = sum_amounts(utxos);
    if available < target {
        return Err(LedgerError::InsufficientFunds {
            required: target,
            available,
        });
    }
    Ok(available)
}
