use crate::core::{parse_amount, BlockRef, SelectionAlgorithm};
use crate::storage::Namespace;
use crate::utils::KeySpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parses a decimal coin string into base units for clap
pub fn parse_coin_amount(s: &str) -> Result<u64, String> {
    parse_amount(s).map_err(|e| e.to_string())
}

#[derive(Debug, Parser)]
#[command(name = "utxo-chain", about = "Single-node UTXO ledger")]
pub struct Opt {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create a new named wallet")]
    Createwallet {
        #[arg(help = "Wallet name (letters, digits, dashes)")]
        name: String,
        #[arg(
            long = "key-spec",
            default_value = "ecdsa-p256",
            help = "Key algorithm (ecdsa-p256, ed25519)"
        )]
        key_spec: KeySpec,
    },
    #[command(name = "walletinfo", about = "Show a wallet and its balance")]
    WalletInfo {
        #[arg(help = "Wallet name")]
        name: String,
    },
    #[command(name = "listwallets", about = "List local wallets with balances")]
    ListWallets,
    #[command(name = "getbalance", about = "Get the balance of an address")]
    GetBalance {
        #[arg(help = "The address (empty for the admin address)")]
        address: String,
    },
    #[command(
        name = "verifyaddress",
        about = "Check an address against its hash160"
    )]
    VerifyAddress {
        #[arg(help = "Base58Check address")]
        address: String,
        #[arg(help = "Expected hash160 as 40 hex characters")]
        hash160: String,
    },
    #[command(
        name = "selectutxos",
        about = "Preview the outputs a payment would spend"
    )]
    SelectUtxos {
        #[arg(help = "Wallet to select from")]
        wallet: String,
        #[arg(value_parser = parse_coin_amount, help = "Amount to pay in coins")]
        amount: u64,
        #[arg(long, value_parser = parse_coin_amount, help = "Fee in coins (defaults to config)")]
        fee: Option<u64>,
        #[arg(
            long,
            default_value = "meet-in-the-middle",
            help = "meet-in-the-middle, largest-first, smallest-first, random"
        )]
        algorithm: SelectionAlgorithm,
    },
    #[command(name = "send", about = "Send coins between addresses")]
    Send {
        #[arg(help = "Source address (empty string for the admin address)")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(value_parser = parse_coin_amount, help = "Amount to send in coins")]
        amount: u64,
        #[arg(long, value_parser = parse_coin_amount, help = "Fee in coins (defaults to config)")]
        fee: Option<u64>,
        #[arg(long, default_value = "meet-in-the-middle", help = "UTXO selection algorithm")]
        algorithm: SelectionAlgorithm,
        #[arg(long, default_value = "", help = "Free-form message")]
        message: String,
        #[arg(long, help = "Mine a block right away, paying WALLET")]
        mine: Option<String>,
    },
    #[command(name = "minegenesis", about = "Mine the genesis block")]
    MineGenesis {
        #[arg(help = "Wallet receiving the block reward")]
        wallet: String,
    },
    #[command(name = "mine", about = "Mine pooled transactions into a block")]
    Mine {
        #[arg(help = "Wallet receiving the block reward and fees")]
        wallet: String,
    },
    #[command(name = "block", about = "Show a block and its transactions")]
    Block {
        #[arg(help = "Block hash or height")]
        block: BlockRef,
    },
    #[command(name = "printchain", about = "Print all blocks from tip to genesis")]
    Printchain,
    #[command(name = "pending", about = "List pooled transactions")]
    Pending,
    #[command(name = "deletekey", about = "Delete a raw key from a namespace")]
    DeleteKey {
        #[arg(help = "BLOCKCHAIN, TRANSACTIONS, TRANSACTIONS_POOL, NODES, WALLETS or ACCOUNTS")]
        namespace: Namespace,
        #[arg(help = "Key to delete")]
        key: String,
    },
    #[command(name = "verifychain", about = "Re-verify every stored block")]
    VerifyChain,
    #[command(name = "registerpeer", about = "Record an address owned by a peer")]
    RegisterPeer {
        #[arg(help = "Base58Check address")]
        address: String,
        #[arg(help = "Peer identifier")]
        peer_id: String,
    },
}
