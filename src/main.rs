// rune - single-node devnet CLI: every write command applies one
// transaction in a new block and persists the committed state

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use runechain::app::{App, ChainState, GenesisState, QueryHandle};
use runechain::gov::{ProposalFilter, ProposalStatus, ProposalType, VoteOption};
use runechain::identity::{Address, Keypair};
use runechain::storage::ChainStore;
use runechain::tx::{Msg, TxBuilder};
use runechain::types::{BlockHeader, Coin, Coins, Rational};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Genesis funding for the `init` account: 50_000_000_000 spendable plus the
/// genesis validator's self-bond
const GENESIS_SPENDABLE: u128 = 50_000_000_000;
const GENESIS_SELF_BOND: u128 = 100;

#[derive(Parser)]
#[command(name = "rune")]
#[command(about = "RUNE chain devnet node and client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Node home directory
    #[arg(long, global = true, default_value = ".rune")]
    home: PathBuf,

    /// Seconds between consecutive blocks
    #[arg(long, global = true, default_value = "5")]
    block_time: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create genesis with one funded account that also runs a validator
    Init {
        #[arg(long, default_value = "rune-devnet")]
        chain_id: String,

        /// Key label of the genesis account
        #[arg(long)]
        account: String,

        #[arg(long, default_value = "genesis")]
        moniker: String,
    },

    /// Local keyring
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },

    /// Transfer coins
    Send {
        #[arg(long)]
        from: String,
        /// Recipient key label or address
        #[arg(long)]
        to: String,
        /// e.g. 10RUNE
        #[arg(long)]
        amount: String,
        #[arg(long)]
        memo: Option<String>,
    },

    /// Register the signer as a validator
    CreateValidator {
        #[arg(long)]
        from: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        moniker: String,
    },

    Delegate {
        #[arg(long)]
        from: String,
        /// Validator owner key label or address
        #[arg(long)]
        validator: String,
        #[arg(long)]
        amount: String,
    },

    /// Begin unbonding shares from a validator
    Unbond {
        #[arg(long)]
        from: String,
        #[arg(long)]
        validator: String,
        /// Share amount, integer or "n/d"
        #[arg(long)]
        shares: String,
    },

    SubmitProposal {
        #[arg(long)]
        from: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "type", default_value = "Text")]
        proposal_type: String,
        #[arg(long)]
        deposit: String,
    },

    Deposit {
        #[arg(long)]
        from: String,
        #[arg(long)]
        proposal_id: u64,
        #[arg(long)]
        amount: String,
    },

    Vote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        proposal_id: u64,
        /// Yes, No, Abstain or NoWithVeto
        #[arg(long)]
        option: String,
    },

    /// Produce an empty block this many seconds after the last one
    Advance {
        #[arg(long)]
        seconds: u64,
    },

    /// Last committed height, time and app hash
    Status,

    Account {
        /// Key label or address
        address: String,
    },

    Validator {
        owner: String,
    },

    Validators,

    Proposal {
        proposal_id: u64,
    },

    /// Proposal listing, one "<id> - <title>" per line
    Proposals {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        depositor: Option<String>,
        #[arg(long)]
        voter: Option<String>,
        /// Only the N most recent proposals
        #[arg(long)]
        latest: Option<usize>,
    },

    QueryVote {
        #[arg(long)]
        proposal_id: u64,
        #[arg(long)]
        voter: String,
    },

    QueryVotes {
        #[arg(long)]
        proposal_id: u64,
    },

    Deposits {
        #[arg(long)]
        proposal_id: u64,
    },
}

#[derive(Subcommand)]
enum KeysCommand {
    Add { name: String },
    Show { name: String },
    List,
}

#[derive(Serialize)]
struct KeyInfo {
    name: String,
    address: String,
    pubkey: String,
}

#[derive(Serialize)]
struct BlockReport {
    height: u64,
    time: String,
    code: Option<String>,
    log: Option<String>,
    events: Vec<runechain::types::Event>,
    app_hash: String,
}

struct Node {
    store: ChainStore,
    block_time: u64,
}

impl Node {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&cli.home).with_context(|| format!("creating {}", cli.home.display()))?;
        let store = ChainStore::open(cli.home.join("data"))?;
        Ok(Self {
            store,
            block_time: cli.block_time,
        })
    }

    fn keypair(&self, label: &str) -> anyhow::Result<Keypair> {
        self.store
            .load_keypair_with_label(label)?
            .ok_or_else(|| anyhow!("no key named '{label}'"))
    }

    /// Key label from the keyring, otherwise a literal address
    fn resolve(&self, name: &str) -> anyhow::Result<Address> {
        if let Some(kp) = self.store.load_keypair_with_label(name)? {
            return Ok(Address::from_public_key(&kp.public_key()));
        }
        Address::parse(name).map_err(|_| anyhow!("'{name}' is neither a key name nor an address"))
    }

    fn state(&self) -> anyhow::Result<ChainState> {
        self.store
            .load_committed()?
            .ok_or_else(|| anyhow!("chain not initialized, run `rune init` first"))
    }

    fn queries(&self) -> anyhow::Result<QueryHandle> {
        Ok(App::new(self.state()?).query_handle())
    }

    fn next_header(&self, state: &ChainState, elapsed: u64) -> BlockHeader {
        BlockHeader::new(state.last_block.height + 1, state.last_block.time + elapsed)
    }

    /// Sign `msg` with `from`, apply it in a fresh block and persist
    fn submit(&self, from: &str, msg: Msg) -> anyhow::Result<BlockReport> {
        let keypair = self.keypair(from)?;
        let state = self.state()?;
        let signer = Address::from_public_key(&keypair.public_key());
        let sequence = state.ledger.account(&signer).map(|a| a.sequence()).unwrap_or(0);
        let tx = TxBuilder::new()
            .signer(&keypair)
            .chain_id(&state.chain_id)
            .sequence(sequence)
            .msg(msg)
            .build()?;

        let header = self.next_header(&state, self.block_time);
        let mut app = App::new(state);
        let (results, _) = app.apply_block(header, std::slice::from_ref(&tx))?;
        self.store.save_committed(app.state())?;

        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("block returned no result"))?;
        Ok(BlockReport {
            height: header.height,
            time: format_time(header.time),
            code: result.error().map(|e| e.code().to_string()),
            log: result.error().map(|e| e.to_string()),
            events: result.events,
            app_hash: hex::encode(app.state().app_hash()),
        })
    }

    fn advance(&self, seconds: u64) -> anyhow::Result<BlockReport> {
        let state = self.state()?;
        let header = self.next_header(&state, seconds);
        let mut app = App::new(state);
        app.apply_block(header, &[])?;
        self.store.save_committed(app.state())?;
        Ok(BlockReport {
            height: header.height,
            time: format_time(header.time),
            code: None,
            log: None,
            events: Vec::new(),
            app_hash: hex::encode(app.state().app_hash()),
        })
    }
}

fn format_time(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn key_info(name: &str, keypair: &Keypair) -> KeyInfo {
    KeyInfo {
        name: name.to_string(),
        address: Address::from_public_key(&keypair.public_key()).to_string(),
        pubkey: keypair.public_key().to_hex(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let node = Node::open(&cli)?;

    match &cli.command {
        Commands::Init {
            chain_id,
            account,
            moniker,
        } => {
            if node.store.load_committed()?.is_some() {
                bail!("chain already initialized in {}", cli.home.display());
            }
            let keypair = node.keypair(account)?;
            let owner = Address::from_public_key(&keypair.public_key());
            let genesis_time = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
            let genesis = GenesisState::new(chain_id, genesis_time)
                .with_account(owner, Coins::single(GENESIS_SPENDABLE + GENESIS_SELF_BOND, "RUNE"))
                .with_validator(owner, keypair.public_key(), Coin::new(GENESIS_SELF_BOND, "RUNE"), moniker);
            let state = genesis.build()?;
            node.store.save_committed(&state)?;
            info!(chain_id = %chain_id, "initialized");
            print_json(&serde_json::json!({
                "chain_id": chain_id,
                "genesis_time": format_time(genesis_time),
                "app_hash": hex::encode(state.app_hash()),
            }))
        }
        Commands::Keys { command } => match command {
            KeysCommand::Add { name } => {
                let keypair = Keypair::generate();
                node.store.save_keypair_with_label(&keypair, name)?;
                print_json(&key_info(name, &keypair))
            }
            KeysCommand::Show { name } => print_json(&key_info(name, &node.keypair(name)?)),
            KeysCommand::List => {
                let keys: Vec<KeyInfo> = node
                    .store
                    .list_keypairs()?
                    .iter()
                    .map(|(name, kp)| key_info(name, kp))
                    .collect();
                print_json(&keys)
            }
        },
        Commands::Send {
            from,
            to,
            amount,
            memo,
        } => {
            let msg = Msg::Send {
                from: node.resolve(from)?,
                to: node.resolve(to)?,
                amount: amount.parse::<Coins>()?,
                memo: memo.clone(),
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::CreateValidator { from, amount, moniker } => {
            let keypair = node.keypair(from)?;
            let msg = Msg::CreateValidator {
                owner: Address::from_public_key(&keypair.public_key()),
                consensus_pubkey: keypair.public_key(),
                self_bond: amount.parse::<Coin>()?,
                moniker: moniker.clone(),
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::Delegate {
            from,
            validator,
            amount,
        } => {
            let msg = Msg::Delegate {
                delegator: node.resolve(from)?,
                validator: node.resolve(validator)?,
                amount: amount.parse::<Coin>()?,
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::Unbond {
            from,
            validator,
            shares,
        } => {
            let msg = Msg::BeginUnbond {
                delegator: node.resolve(from)?,
                validator: node.resolve(validator)?,
                shares: shares.parse::<Rational>()?,
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::SubmitProposal {
            from,
            title,
            description,
            proposal_type,
            deposit,
        } => {
            let msg = Msg::SubmitProposal {
                proposer: node.resolve(from)?,
                title: title.clone(),
                description: description.clone(),
                proposal_type: proposal_type.parse::<ProposalType>()?,
                initial_deposit: deposit.parse::<Coins>()?,
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::Deposit {
            from,
            proposal_id,
            amount,
        } => {
            let msg = Msg::Deposit {
                depositor: node.resolve(from)?,
                proposal_id: *proposal_id,
                amount: amount.parse::<Coins>()?,
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::Vote {
            from,
            proposal_id,
            option,
        } => {
            let msg = Msg::Vote {
                voter: node.resolve(from)?,
                proposal_id: *proposal_id,
                option: option.parse::<VoteOption>()?.code(),
            };
            print_json(&node.submit(from, msg)?)
        }
        Commands::Advance { seconds } => print_json(&node.advance(*seconds)?),
        Commands::Status => {
            let q = node.queries()?;
            let block = q.last_block();
            let stats = node.store.stats()?;
            let tables: serde_json::Map<String, serde_json::Value> = node
                .store
                .table_counts()?
                .into_iter()
                .map(|(name, count)| (name.to_string(), count.into()))
                .collect();
            print_json(&serde_json::json!({
                "height": block.height,
                "time": format_time(block.time),
                "app_hash": hex::encode(q.app_hash()),
                "store_keys": stats.key_count,
                "store_bytes": stats.disk_size_bytes,
                "tables": tables,
            }))
        }
        Commands::Account { address } => print_json(&node.queries()?.account(&node.resolve(address)?)?),
        Commands::Validator { owner } => print_json(&node.queries()?.validator(&node.resolve(owner)?)?),
        Commands::Validators => print_json(&node.queries()?.validators()),
        Commands::Proposal { proposal_id } => print_json(&node.queries()?.proposal(*proposal_id)?),
        Commands::Proposals {
            status,
            depositor,
            voter,
            latest,
        } => {
            let mut filter = ProposalFilter::new();
            if let Some(s) = status {
                filter = filter.with_status(s.parse::<ProposalStatus>()?);
            }
            if let Some(d) = depositor {
                filter = filter.with_depositor(node.resolve(d)?);
            }
            if let Some(v) = voter {
                filter = filter.with_voter(node.resolve(v)?);
            }
            if let Some(n) = latest {
                filter = filter.with_latest(*n);
            }
            println!("{}", node.queries()?.list_proposals(&filter));
            Ok(())
        }
        Commands::QueryVote { proposal_id, voter } => {
            print_json(&node.queries()?.vote(*proposal_id, &node.resolve(voter)?)?)
        }
        Commands::QueryVotes { proposal_id } => print_json(&node.queries()?.votes(*proposal_id)?),
        Commands::Deposits { proposal_id } => print_json(&node.queries()?.deposits(*proposal_id)?),
    }
}
