//! Ledger engine
//!
//! [`Ledger`] is the single entry point used by the CLI and by any transport
//! layer. It ties the wallet registry, the account index, the transaction
//! stores and the block chain together and enforces the cross-cutting rules:
//!
//! - spends are serialized per address, so two concurrent requests can never
//!   select the same unspent output
//! - mining is serialized globally, so heights advance by exactly one
//! - every failure is returned as a typed [`LedgerError`]; nothing is rolled
//!   back or retried

use crate::config::Config;
use crate::core::selection::{select_utxos, Selection, SelectionAlgorithm};
use crate::core::{Block, ChainTip, Blockchain, OutPoint, TXInput, TXOutput, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{
    record_body_len, AccountIndex, BlockFiles, KeyValueStore, Namespace, SharedStore, SledStore,
    TransactionStore, MAX_RECORD_BODY_LEN,
};
use crate::utils::KeySpec;
use crate::wallet::{Wallet, WalletInfo, WalletManager, WalletSummary};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const WALLET_BONUS_MESSAGE: &str = "wallet creation bonus";

/// Block lookup key: a 64-char hash or a height
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    Hash(String),
    Height(u64),
}

impl FromStr for BlockRef {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LedgerError::Validation(
                "Block hash or height must not be empty".to_string(),
            ));
        }
        if s.len() < 64 && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u64>()
                .map(BlockRef::Height)
                .map_err(|e| LedgerError::Validation(format!("Invalid block height {s:?}: {e}")));
        }
        Ok(BlockRef::Hash(s.to_lowercase()))
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Hash(hash) => write!(f, "{hash}"),
            BlockRef::Height(height) => write!(f, "height {height}"),
        }
    }
}

/// A block together with the transactions it references, in block order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContent {
    pub block: Block,
    pub transactions: Vec<Transaction>,
}

/// Result of wallet creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWallet {
    pub wallet: Wallet,
    /// Id of the bonus transaction, when one was issued
    pub bonus_transaction_id: Option<String>,
}

pub struct Ledger {
    config: Config,
    store: SharedStore,
    wallets: WalletManager,
    accounts: AccountIndex,
    transactions: TransactionStore,
    blockchain: Blockchain,
    address_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    mining_lock: Mutex<()>,
}

impl Ledger {
    /// Opens (or creates) the ledger under `config.data_dir`
    pub fn open(config: Config) -> Result<Ledger> {
        config.validate()?;
        let store = SledStore::open(config.db_path())?;
        info!("Opened ledger at {}", config.data_dir.display());
        Self::with_store(config, Arc::new(store))
    }

    /// Builds a ledger over an existing store; block files still go to
    /// `config.blocks_dir()`
    pub fn with_store(config: Config, store: SharedStore) -> Result<Ledger> {
        config.validate()?;
        let files = BlockFiles::new(config.blocks_dir());
        Ok(Ledger {
            wallets: WalletManager::new(store.clone(), config.address_version),
            accounts: AccountIndex::new(store.clone()),
            transactions: TransactionStore::new(store.clone()),
            blockchain: Blockchain::new(store.clone(), files),
            store,
            config,
            address_locks: Mutex::new(HashMap::new()),
            mining_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn wallets(&self) -> &WalletManager {
        &self.wallets
    }

    pub fn tip(&self) -> Result<Option<ChainTip>> {
        self.blockchain.get_tip()
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Creates a wallet and, while the wallet count is within the configured
    /// bonus threshold, pays it the bonus from the admin address. A failed
    /// bonus is logged and does not undo the wallet.
    pub fn create_wallet(&self, name: &str, key_spec: KeySpec) -> Result<CreatedWallet> {
        let wallet = self.wallets.create_wallet(name, key_spec)?;
        let bonus_transaction_id = self.issue_wallet_bonus(&wallet)?;
        Ok(CreatedWallet {
            wallet,
            bonus_transaction_id,
        })
    }

    fn issue_wallet_bonus(&self, wallet: &Wallet) -> Result<Option<String>> {
        let admin = match &self.config.admin_address {
            Some(admin) if self.config.wallet_bonus_amount > 0 => admin.clone(),
            _ => return Ok(None),
        };
        if self.wallets.wallet_count()? > self.config.wallet_bonus_threshold {
            return Ok(None);
        }
        if admin == wallet.get_address() {
            return Ok(None);
        }

        match self.make_transaction(
            &admin,
            wallet.get_address(),
            self.config.wallet_bonus_amount,
            Some(self.config.default_fee),
            SelectionAlgorithm::MeetInTheMiddle,
            WALLET_BONUS_MESSAGE,
        ) {
            Ok(tx) => {
                info!(
                    "Issued bonus of {} to wallet {} in {}",
                    self.config.wallet_bonus_amount,
                    wallet.get_name(),
                    tx.get_id()
                );
                Ok(Some(tx.get_id().to_string()))
            }
            Err(e) => {
                warn!("Wallet bonus for {} failed: {e}", wallet.get_name());
                Ok(None)
            }
        }
    }

    pub fn fetch_wallet_info(&self, name: &str) -> Result<WalletInfo> {
        self.wallets.wallet_info(name)
    }

    pub fn fetch_all_wallets(&self) -> Result<Vec<WalletSummary>> {
        self.wallets.list_wallets()
    }

    pub fn verify_address(&self, address: &str, hash160_hex: &str) -> Result<bool> {
        self.wallets.verify_address(address, hash160_hex)
    }

    pub fn register_peer_address(&self, address: &str, peer_id: &str) -> Result<()> {
        self.wallets.register_peer_address(address, peer_id)
    }

    pub fn balance_of(&self, address: &str) -> Result<u64> {
        let address = self.resolve_address(address)?;
        self.wallets.balance_of(&address)
    }

    /// Previews the outputs `wallet_name` would spend to pay `amount` plus
    /// `fee` (the configured fee when `None`). Nothing is spent.
    pub fn fetch_utxos_for_transaction(
        &self,
        amount: u64,
        algorithm: SelectionAlgorithm,
        wallet_name: &str,
        fee: Option<u64>,
    ) -> Result<Selection> {
        let (_, target) = self.spend_target(amount, fee)?;
        let wallet = self.wallets.get_wallet(wallet_name)?;
        let utxos = self.wallets.utxos_of(wallet.get_address())?;
        select_utxos(&utxos, target, algorithm)
    }

    // Fee to charge and the total the selected inputs must cover
    fn spend_target(&self, amount: u64, fee: Option<u64>) -> Result<(u64, u64)> {
        if amount == 0 {
            return Err(LedgerError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let fee = fee.unwrap_or(self.config.default_fee);
        let target = amount.checked_add(fee).ok_or_else(|| {
            LedgerError::Validation(format!("Amount {amount} plus fee {fee} overflows"))
        })?;
        Ok((fee, target))
    }

    /// Builds, pools and indexes a spend of `amount` from `from` to `to`.
    ///
    /// An empty `from` spends from the admin address. `fee` defaults to the
    /// configured fee. The payment is split into `output_split_count`
    /// outputs and any change returns to the sender.
    pub fn make_transaction(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        fee: Option<u64>,
        algorithm: SelectionAlgorithm,
        message: &str,
    ) -> Result<Transaction> {
        let (fee, target) = self.spend_target(amount, fee)?;
        if to.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Recipient address must not be empty".to_string(),
            ));
        }

        let from = self.resolve_address(from)?;
        let to = self.resolve_address(to)?;
        let sender = self.wallets.wallet_for_address(&from)?.ok_or_else(|| {
            LedgerError::Validation(format!("Address {from} is not owned by a local wallet"))
        })?;

        let mut touched = vec![from.clone(), to.clone()];
        touched.sort();
        touched.dedup();
        let locks = touched
            .iter()
            .map(|address| self.address_lock(address))
            .collect::<Result<Vec<_>>>()?;
        let _guards = locks
            .iter()
            .map(|lock| lock_mutex(&**lock, "address"))
            .collect::<Result<Vec<_>>>()?;

        let utxos = self.wallets.utxos_of(&from)?;
        let selection = select_utxos(&utxos, target, algorithm)?;
        let consumed = selection.outpoints();
        debug!(
            "Spending {} outpoints of {from} totalling {} for {target}",
            consumed.len(),
            selection.total
        );

        let inputs: Vec<TXInput> = consumed
            .iter()
            .map(|outpoint| TXInput::new(outpoint, sender.get_public_key()))
            .collect();
        let mut outputs = vec![];
        for part in split_amount(amount, self.config.output_split_count) {
            outputs.push(TXOutput::new(part, outputs.len() as u32, &to)?);
        }
        let payment_count = outputs.len() as u32;
        let change = selection.change(target);
        if change > 0 {
            outputs.push(TXOutput::new(change, payment_count, &from)?);
        }

        let tx = Transaction::new(inputs, outputs, fee, message)?;

        self.accounts.remove_outpoints(&from, &consumed)?;
        self.transactions.pool().add(&tx)?;
        let paid: Vec<OutPoint> = (0..payment_count)
            .map(|vout| OutPoint::new(tx.get_id(), vout))
            .collect();
        self.accounts.append(&to, &paid)?;
        if change > 0 {
            self.accounts
                .append(&from, &[OutPoint::new(tx.get_id(), payment_count)])?;
        }

        info!(
            "Pooled transaction {}: {from} -> {to} amount {amount} fee {fee} change {change}",
            tx.get_id()
        );
        Ok(tx)
    }

    /// Mines the first block, paying the block reward to `wallet_name`
    pub fn mine_genesis_block(&self, wallet_name: &str) -> Result<Block> {
        let _mining = lock_mutex(&self.mining_lock, "mining")?;
        if self.blockchain.genesis_exists()? {
            return Err(LedgerError::GenesisAlreadyExists);
        }
        let miner = self.wallets.get_wallet(wallet_name)?;

        let coinbase = Transaction::new_coinbase_tx(
            miner.get_address(),
            self.config.block_reward,
            &coinbase_message(0),
        )?;
        let block = Block::new_block(
            String::new(),
            std::slice::from_ref(&coinbase),
            0,
            self.config.difficulty,
        )?;
        self.blockchain.check_block(&block)?;

        self.transactions.put_confirmed(&coinbase)?;
        self.blockchain.add_block(&block)?;
        self.credit_coinbase(miner.get_address(), &coinbase)?;

        info!(
            "Mined genesis block {} paying {} to {}",
            block.get_hash(),
            self.config.block_reward,
            miner.get_name()
        );
        Ok(block)
    }

    /// Folds the oldest pooled transactions into a new block on top of the
    /// tip. The coinbase pays the block reward plus the collected fees.
    ///
    /// At most `max_pool_transactions` are taken, fewer when the block
    /// would not fit in one block file record. Nothing is written until the
    /// assembled block has passed every check.
    pub fn mine_block(&self, wallet_name: &str) -> Result<Block> {
        let _mining = lock_mutex(&self.mining_lock, "mining")?;
        let tip = self.blockchain.get_tip()?.ok_or_else(|| {
            LedgerError::Validation("Genesis block has not been mined yet".to_string())
        })?;
        let miner = self.wallets.get_wallet(wallet_name)?;

        let available = self.transactions.pool().len()?;
        if available < self.config.min_pool_transactions {
            return Err(LedgerError::InsufficientPoolSize {
                required: self.config.min_pool_transactions,
                available,
            });
        }

        let mut pooled = self
            .transactions
            .pool()
            .oldest(self.config.max_pool_transactions)?;
        let (block, coinbase) = loop {
            let (block, coinbase) = self.assemble_block(&tip, miner.get_address(), &pooled)?;
            let body_len = record_body_len(&block)?;
            if body_len <= MAX_RECORD_BODY_LEN || pooled.is_empty() {
                break (block, coinbase);
            }
            // the pool lists parents before children, so a prefix stays spendable
            let keep = (pooled.len() * MAX_RECORD_BODY_LEN / body_len).min(pooled.len() - 1);
            debug!(
                "Block at height {} encodes to {body_len} bytes, keeping {keep} of {} pooled transactions",
                block.get_height(),
                pooled.len()
            );
            pooled.truncate(keep);
        };
        self.blockchain.check_block(&block)?;

        self.transactions.put_confirmed(&coinbase)?;
        self.blockchain.add_block(&block)?;
        for tx in &pooled {
            self.transactions.confirm(tx)?;
        }
        self.credit_coinbase(miner.get_address(), &coinbase)?;

        info!(
            "Mined block {} at height {} with {} pooled transactions, reward {}",
            block.get_hash(),
            block.get_height(),
            pooled.len(),
            coinbase.get_output_value()?
        );
        Ok(block)
    }

    // Coinbase paying reward plus fees, followed by `pooled`, on top of `tip`
    fn assemble_block(
        &self,
        tip: &ChainTip,
        miner_address: &str,
        pooled: &[Transaction],
    ) -> Result<(Block, Transaction)> {
        let fees = self.validate_block_transactions(pooled)?;
        let reward = self.config.block_reward.checked_add(fees).ok_or_else(|| {
            LedgerError::Integrity(format!("Block reward plus fees {fees} overflows"))
        })?;

        let height = tip.height + 1;
        let coinbase =
            Transaction::new_coinbase_tx(miner_address, reward, &coinbase_message(height))?;
        let mut block_transactions = Vec::with_capacity(pooled.len() + 1);
        block_transactions.push(coinbase.clone());
        block_transactions.extend(pooled.iter().cloned());
        let block = Block::new_block(
            tip.hash.clone(),
            &block_transactions,
            height,
            self.config.difficulty,
        )?;
        Ok((block, coinbase))
    }

    /// Checks id integrity, input/output balance and that no outpoint is
    /// spent twice within the candidate set. Every input must spend a
    /// confirmed transaction or one listed earlier in the candidate set.
    /// Returns the total fees.
    fn validate_block_transactions(&self, transactions: &[Transaction]) -> Result<u64> {
        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut earlier: HashMap<&str, &Transaction> = HashMap::new();
        let mut fees = 0u64;
        for tx in transactions {
            tx.verify_integrity()?;
            if tx.is_coinbase() {
                return Err(LedgerError::Integrity(format!(
                    "Pooled transaction {} is a coinbase",
                    tx.get_id()
                )));
            }

            let mut input_total = 0u64;
            for input in tx.get_inputs() {
                let outpoint = input.outpoint();
                if !spent.insert(outpoint.clone()) {
                    return Err(LedgerError::Integrity(format!(
                        "Outpoint {outpoint} is spent twice in the block"
                    )));
                }
                let output = self.block_input(&outpoint, &earlier)?;
                input_total = input_total.saturating_add(output.get_amount());
            }

            let required = tx.get_output_value()?.saturating_add(tx.get_fee());
            if input_total < required {
                return Err(LedgerError::Integrity(format!(
                    "Transaction {} spends {required} but its inputs hold {input_total}",
                    tx.get_id()
                )));
            }
            fees = fees.saturating_add(tx.get_fee());
            earlier.insert(tx.get_id(), tx);
        }
        Ok(fees)
    }

    fn block_input(
        &self,
        outpoint: &OutPoint,
        earlier: &HashMap<&str, &Transaction>,
    ) -> Result<TXOutput> {
        if let Some(parent) = earlier.get(outpoint.transaction_id.as_str()) {
            return parent.get_output(outpoint.vout).cloned().ok_or_else(|| {
                LedgerError::Integrity(format!(
                    "Transaction {} has no output {}",
                    outpoint.transaction_id, outpoint.vout
                ))
            });
        }
        if self.transactions.is_confirmed(&outpoint.transaction_id)? {
            return self.transactions.resolve_output(outpoint);
        }
        Err(LedgerError::Integrity(format!(
            "Outpoint {outpoint} spends a transaction that is neither confirmed nor earlier in the block"
        )))
    }

    fn credit_coinbase(&self, address: &str, coinbase: &Transaction) -> Result<()> {
        let lock = self.address_lock(address)?;
        let _guard = lock_mutex(&*lock, "address")?;
        self.accounts
            .append(address, &[OutPoint::new(coinbase.get_id(), 0)])
    }

    pub fn fetch_block_content(&self, block_ref: &BlockRef) -> Result<BlockContent> {
        let block = match block_ref {
            BlockRef::Hash(hash) => self.blockchain.get_block(hash)?,
            BlockRef::Height(height) => self.blockchain.get_block_by_height(*height)?,
        };
        let transactions = block
            .get_transaction_ids()
            .iter()
            .map(|id| self.transactions.get(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(BlockContent {
            block,
            transactions,
        })
    }

    /// Removes a raw key from a namespace. Deleting a wallet also drops its
    /// NODES and ACCOUNTS entries.
    pub fn delete_key(&self, key: &str, namespace: Namespace) -> Result<()> {
        if namespace == Namespace::Wallets {
            return self.delete_wallet(key);
        }
        if !self.store.delete(namespace, key)? {
            return Err(LedgerError::KeyNotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            });
        }
        warn!("Deleted {namespace}/{key}");
        Ok(())
    }

    fn delete_wallet(&self, name: &str) -> Result<()> {
        let wallet = match self.wallets.get_wallet(name) {
            Err(LedgerError::WalletNotFound(_)) => {
                return Err(LedgerError::KeyNotFound {
                    namespace: Namespace::Wallets.to_string(),
                    key: name.to_string(),
                })
            }
            other => other?,
        };
        let lock = self.address_lock(wallet.get_address())?;
        let _guard = lock_mutex(&*lock, "address")?;
        self.wallets.delete_wallet(name)?;
        warn!("Deleted wallet {name} and the records of {}", wallet.get_address());
        Ok(())
    }

    /// Number of blocks verified
    pub fn verify_chain(&self) -> Result<u64> {
        self.blockchain.verify_chain()
    }

    pub fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        self.transactions.pool().get_all()
    }

    pub fn get_transaction(&self, txid: &str) -> Result<Transaction> {
        self.transactions.get(txid)
    }

    /// Maps an empty address onto the admin address and checks that the
    /// address is known locally or as a peer
    fn resolve_address(&self, address: &str) -> Result<String> {
        let address = address.trim();
        let address = if address.is_empty() {
            self.config.admin_address.clone().ok_or_else(|| {
                LedgerError::Validation(
                    "No address given and no admin address configured".to_string(),
                )
            })?
        } else {
            address.to_string()
        };
        if self.wallets.owner_of(&address)?.is_none() {
            return Err(LedgerError::UnknownAddress(address));
        }
        Ok(address)
    }

    fn address_lock(&self, address: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = lock_mutex(&self.address_locks, "address table")?;
        Ok(locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}

fn lock_mutex<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| LedgerError::Integrity(format!("The {what} lock is poisoned")))
}

// A fresh uuid keeps coinbase ids unique across identical rewards
fn coinbase_message(height: u64) -> String {
    format!("coinbase height {height} {}", uuid::Uuid::new_v4())
}

/// Splits `amount` into at most `parts` positive outputs; the remainder is
/// spread one unit at a time over the first outputs
pub fn split_amount(amount: u64, parts: usize) -> Vec<u64> {
    let parts = (parts.max(1) as u64).min(amount.max(1));
    let base = amount / parts;
    let remainder = amount % parts;
    (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}
