//! Interactive operator shell.
//!
//! A line-oriented command loop on stdin. Operational errors print to the
//! shell and never crash the process; the chain, mempool, and topics are
//! shared with the ingest loops.

use crate::node::Node;
use anyhow::Result;
use galena_chain::{Chain, Transaction};
use galena_sync::{publish_block, publish_transaction};
use galena_wallet::XPrv;
use num_bigint::BigUint;
use secp256k1::SecretKey;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Available commands:
  master-key gen            generate a master key (prints the mnemonic)
  master-key save <file>    save the master key to <file>.master
  master-key load <file>    load the master key from <file>.master
  wallet set <index>        select the child key at the given index
  wallet balance            print the balance of the selected address
  tx <to> <amount> <price>  sign and broadcast a transfer
  mine                      mine and broadcast the next block
  mine genesis              create and broadcast the genesis block
  chain save <file>         write the chain snapshot to <file>
  chain load <file>         restore the chain snapshot from <file>
  chain request             ask peers for missing history
  help                      show this help
  exit                      leave the shell";

/// Operator session: shell state layered over the shared node.
pub struct Session {
    node: Arc<Node>,
    master_key: Option<XPrv>,
    current_key: Option<SecretKey>,
    current_address: Option<String>,
}

impl Session {
    /// A session with no keys selected.
    pub fn new(node: Arc<Node>) -> Self {
        Self {
            node,
            master_key: None,
            current_key: None,
            current_address: None,
        }
    }

    /// Run the command loop until `exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Shell started. Type 'help' to see available commands.");

        loop {
            print!("$ ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let args: Vec<&str> = line.split_whitespace().collect();
            if args.is_empty() {
                continue;
            }

            match args[0] {
                "help" => println!("{HELP}"),
                "exit" => break,
                "master-key" => self.master_key_cmd(&args),
                "wallet" => self.wallet_cmd(&args),
                "tx" => self.tx_cmd(&args),
                "mine" => self.mine_cmd(&args).await,
                "chain" => self.chain_cmd(&args),
                _ => println!("Unknown command. Type 'help' for options."),
            }
        }

        Ok(())
    }

    fn master_key_cmd(&mut self, args: &[&str]) {
        match args.get(1).copied() {
            Some("gen") => match galena_wallet::generate_master() {
                Ok((mnemonic, master)) => {
                    self.master_key = Some(master);
                    println!("Master key generated. Mnemonic (store it safely):");
                    println!("  {mnemonic}");
                }
                Err(e) => println!("Failed to generate master key: {e}."),
            },
            Some("save") => {
                let (Some(file), Some(master)) = (args.get(2), self.master_key.as_ref()) else {
                    println!("Usage: master-key save <file> (generate or load a key first).");
                    return;
                };
                match galena_wallet::save_master(Path::new(file), master) {
                    Ok(()) => println!("Master key saved successfully."),
                    Err(e) => println!("Failed to save master key: {e}."),
                }
            }
            Some("load") => {
                let Some(file) = args.get(2) else {
                    println!("Usage: master-key load <file>");
                    return;
                };
                match galena_wallet::load_master(Path::new(file)) {
                    Ok(master) => {
                        self.master_key = Some(master);
                        println!("Master key loaded successfully.");
                    }
                    Err(e) => println!("Failed to load master key: {e}."),
                }
            }
            _ => println!("Usage: master-key {{gen|save <file>|load <file>}}"),
        }
    }

    fn wallet_cmd(&mut self, args: &[&str]) {
        match args.get(1).copied() {
            Some("set") => {
                let Some(master) = self.master_key.as_ref() else {
                    println!("No master key loaded. Please load it first.");
                    return;
                };
                let Some(index) = args.get(2).and_then(|s| s.parse::<u32>().ok()) else {
                    println!("Usage: wallet set <index>");
                    return;
                };
                match galena_wallet::derive_key(master, index) {
                    Ok((secret, address)) => {
                        println!("Wallet set to index {index}: {address}.");
                        self.current_key = Some(secret);
                        self.current_address = Some(address);
                    }
                    Err(e) => println!("Failed to derive wallet: {e}."),
                }
            }
            Some("balance") => {
                let Some(address) = self.current_address.as_ref() else {
                    println!("No current address set. Please set it first.");
                    return;
                };
                if !self.node.chain().is_initialized() {
                    println!("Blockchain not initialized. Please create genesis block first.");
                    return;
                }
                let balance = self.node.chain().balance_of(address);
                println!("Balance of {address}: {balance}.");
            }
            _ => println!("Usage: wallet {{set <index>|balance}}"),
        }
    }

    fn tx_cmd(&self, args: &[&str]) {
        let Some(key) = self.current_key.as_ref() else {
            println!("No current address set. Please set it first.");
            return;
        };
        let Some(address) = self.current_address.as_ref() else {
            println!("No current address set. Please set it first.");
            return;
        };
        if !self.node.chain().is_initialized() {
            println!("Blockchain not initialized. Please create genesis block first.");
            return;
        }

        let (Some(to), Some(amount), Some(price)) = (
            args.get(1),
            args.get(2).and_then(|s| BigUint::from_str(s).ok()),
            args.get(3).and_then(|s| BigUint::from_str(s).ok()),
        ) else {
            println!("Usage: tx <to> <amount> <price>");
            return;
        };

        // Nonce snapshot in the fixed order: chain first, then mempool.
        let confirmed = self.node.chain().nonce_of(address, 0);
        let pending = self.node.mempool().pending_from(address) as u64;
        let nonce = confirmed + pending;

        let tx = match Transaction::create(key, to, amount, price, nonce) {
            Ok(tx) => tx,
            Err(e) => {
                println!("Failed to create transaction: {e}.");
                return;
            }
        };

        // Admission into our own mempool happens through the tx ingest
        // loop, the same path every peer takes.
        match publish_transaction(self.node.tx_topic(), &tx) {
            Ok(()) => println!(
                "Transaction published: {} -> {to}, amount {}, price {}, nonce {nonce}.",
                tx.from, tx.amount, tx.price
            ),
            Err(e) => println!("Failed to publish transaction: {e}."),
        }
    }

    async fn mine_cmd(&mut self, args: &[&str]) {
        match args.get(1).copied() {
            None => self.mine_next().await,
            Some("genesis") => self.mine_genesis(),
            _ => println!("Usage: mine [genesis]"),
        }
    }

    fn mine_genesis(&mut self) {
        let Some(address) = self.current_address.clone() else {
            println!("No current address set. Please set it first.");
            return;
        };

        match self.node.chain().init_genesis(&address) {
            Ok(genesis) => {
                println!(
                    "Genesis block created: index {}, miner {}, hash {}.",
                    genesis.index,
                    genesis.miner,
                    hex::encode(&genesis.hash)
                );
                if let Err(e) = publish_block(self.node.block_topic(), &genesis) {
                    println!("Failed to publish block: {e}.");
                }
            }
            Err(e) => println!("Failed to create genesis block: {e}."),
        }
    }

    async fn mine_next(&self) {
        let Some(address) = self.current_address.clone() else {
            println!("No current address set. Please set it first.");
            return;
        };
        if !self.node.chain().is_initialized() {
            println!("Blockchain not initialized. Please create genesis block first.");
            return;
        }

        // The nonce search is a tight CPU loop; keep it off the runtime.
        let miner = Arc::clone(self.node.miner());
        let reward_address = address.clone();
        let mined =
            tokio::task::spawn_blocking(move || miner.mine_next(&reward_address)).await;

        let block = match mined {
            Ok(Ok(block)) => block,
            Ok(Err(e)) => {
                println!("Mining failed: {e}.");
                return;
            }
            Err(e) => {
                println!("Mining task failed: {e}.");
                return;
            }
        };

        if let Err(e) = self.node.chain().try_extend(&block) {
            println!("Mined block rejected: {e}.");
            return;
        }

        match publish_block(self.node.block_topic(), &block) {
            Ok(()) => println!(
                "Block mined and published: index {}, nonce {}, hash {}.",
                block.index,
                block.nonce,
                hex::encode(&block.hash)
            ),
            Err(e) => println!("Failed to publish block: {e}."),
        }
    }

    fn chain_cmd(&self, args: &[&str]) {
        match (args.get(1).copied(), args.get(2).copied()) {
            (Some("save"), Some(file)) => {
                if !self.node.chain().is_initialized() {
                    println!("Blockchain not initialized.");
                    return;
                }
                match self.node.chain().save(Path::new(file)) {
                    Ok(()) => println!("Blockchain saved successfully."),
                    Err(e) => println!("Failed to save blockchain: {e}."),
                }
            }
            (Some("load"), Some(file)) => {
                if self.node.chain().is_initialized() {
                    println!("Blockchain already loaded.");
                    return;
                }
                let loaded = match Chain::load(Path::new(file)) {
                    Ok(chain) => chain,
                    Err(e) => {
                        println!("Failed to load blockchain: {e}.");
                        return;
                    }
                };
                match self.node.chain().install(loaded.blocks()) {
                    Ok(()) => println!("Blockchain loaded successfully from {file}."),
                    Err(e) => println!("Failed to load blockchain: {e}."),
                }
            }
            (Some("request"), _) => {
                if !self.node.chain().is_initialized() {
                    println!("Blockchain not initialized.");
                    return;
                }
                match self.node.handler().request_chain() {
                    Ok(()) => println!("Block request sent successfully."),
                    Err(e) => println!("Failed to request blocks: {e}."),
                }
            }
            _ => println!("Usage: chain {{save <file>|load <file>|request}}"),
        }
    }
}

