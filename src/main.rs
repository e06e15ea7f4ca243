// Entry point for the ledger CLI: parse arguments, load the configuration,
// open the ledger and run one command against it.
use clap::Parser;
use log::{error, LevelFilter};
use std::process;
use utxo_chain::core::format_amount;
use utxo_chain::{Command, Config, Ledger, Opt};

fn main() {
    // Info by default; RUST_LOG still overrides
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(opt.config.as_deref())?;
    let ledger = Ledger::open(config)?;
    run_command(&ledger, opt.command)?;
    ledger.flush()?;
    Ok(())
}

// Each arm maps one subcommand onto one ledger operation and prints the
// result as JSON or a short summary line
fn run_command(ledger: &Ledger, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Createwallet { name, key_spec } => {
            let created = ledger.create_wallet(&name, key_spec)?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        Command::WalletInfo { name } => {
            let info = ledger.fetch_wallet_info(&name)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::ListWallets => {
            for summary in ledger.fetch_all_wallets()? {
                println!(
                    "{:<24} {} {}",
                    summary.name,
                    summary.address,
                    format_amount(summary.balance)
                );
            }
        }
        Command::GetBalance { address } => {
            let balance = ledger.balance_of(&address)?;
            println!("Balance of {address}: {}", format_amount(balance));
        }
        Command::VerifyAddress { address, hash160 } => {
            ledger.verify_address(&address, &hash160)?;
            println!("Address {address} is valid");
        }
        Command::SelectUtxos {
            wallet,
            amount,
            fee,
            algorithm,
        } => {
            let selection = ledger.fetch_utxos_for_transaction(amount, algorithm, &wallet, fee)?;
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        Command::Send {
            from,
            to,
            amount,
            fee,
            algorithm,
            message,
            mine,
        } => {
            let tx = ledger.make_transaction(&from, &to, amount, fee, algorithm, &message)?;
            println!("Pooled transaction {}", tx.get_id());
            if let Some(wallet) = mine {
                let block = ledger.mine_block(&wallet)?;
                println!(
                    "Mined block {} at height {}",
                    block.get_hash(),
                    block.get_height()
                );
            }
        }
        Command::MineGenesis { wallet } => {
            let block = ledger.mine_genesis_block(&wallet)?;
            println!("Genesis block {}", block.get_hash());
        }
        Command::Mine { wallet } => {
            let block = ledger.mine_block(&wallet)?;
            println!(
                "Mined block {} at height {} with {} transactions",
                block.get_hash(),
                block.get_height(),
                block.get_num_tx()
            );
        }
        Command::Block { block } => {
            let content = ledger.fetch_block_content(&block)?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Command::Printchain => {
            for block in ledger.blockchain().iterator()? {
                let block = block?;
                println!("Height: {}", block.get_height());
                println!("Prev block hash: {}", block.get_previous_hash());
                println!("Cur block hash: {}", block.get_hash());
                println!("Merkle root: {}", block.get_merkle_root());
                for txid in block.get_transaction_ids() {
                    println!("- Transaction {txid}");
                }
                println!();
            }
        }
        Command::Pending => {
            for tx in ledger.pending_transactions()? {
                println!(
                    "{} outputs={} fee={}",
                    tx.get_id(),
                    format_amount(tx.get_output_value()?),
                    format_amount(tx.get_fee())
                );
            }
        }
        Command::DeleteKey { namespace, key } => {
            ledger.delete_key(&key, namespace)?;
            println!("Deleted {namespace}/{key}");
        }
        Command::VerifyChain => {
            let count = ledger.verify_chain()?;
            println!("Verified {count} blocks");
        }
        Command::RegisterPeer { address, peer_id } => {
            ledger.register_peer_address(&address, &peer_id)?;
            println!("Registered {address} for {peer_id}");
        }
    }
    Ok(())
}
