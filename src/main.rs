use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use minichain::config::Settings;
use minichain::store::ChainStore;
use minichain::{Block, Chain, ConsensusStrategy, ProofOfWork, Seal, Transaction};

/// Builds a small ledger with one mined and one staked block, then verifies it.
#[derive(Parser, Debug)]
#[clap(name = "minichain", version, about)]
struct Cli {
    /// Settings file (TOML, JSON or YAML).
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,
    /// Leading hex zeros required of the mined block.
    #[clap(short, long, value_parser)]
    difficulty: Option<usize>,
    /// Seed for the validator draw.
    #[clap(long, value_parser)]
    seed: Option<u64>,
    /// Nonce search workers.
    #[clap(short, long, value_parser)]
    threads: Option<usize>,
    /// Persist the chain here and reload it.
    #[clap(long, value_parser)]
    store: Option<PathBuf>,
    /// Print block summaries as JSON.
    #[clap(long)]
    json: bool,
}

#[derive(Serialize)]
struct BlockSummary<'a> {
    index: u64,
    hash: &'a str,
    previous_hash: &'a str,
    merkle_root: &'a str,
    seal: &'a Seal,
    sealed_in_ms: Option<u128>,
}

#[derive(Serialize)]
struct Report<'a> {
    blocks: Vec<BlockSummary<'a>>,
    valid: bool,
    /// Index of the first block that failed verification.
    failed_at: Option<usize>,
}

fn summarize(block: &Block, sealed_in_ms: Option<u128>) -> BlockSummary<'_> {
    BlockSummary {
        index: block.index(),
        hash: &block.hash,
        previous_hash: block.previous_hash(),
        merkle_root: block.merkle_root(),
        seal: &block.seal,
        sealed_in_ms,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(difficulty) = cli.difficulty {
        settings.difficulty = difficulty;
    }
    if let Some(threads) = cli.threads {
        settings.threads = threads;
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    if let Some(store) = &cli.store {
        settings.store_path = Some(store.display().to_string());
    }
    settings.validate().context("validating settings")?;

    let level: tracing::Level = settings
        .log_level
        .parse()
        .with_context(|| format!("unknown log level {:?}", settings.log_level))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let roster = settings.roster()?;
    let mut chain = Chain::with_genesis(roster)?.with_pow_threads(settings.threads);
    if let Some(seed) = settings.seed {
        chain = chain.with_seed(seed);
    }

    let mut timings = vec![None; chain.len()];

    let mut pow = ProofOfWork::new(settings.difficulty)
        .with_threads(settings.threads)
        .with_cancel(chain.cancel_token());
    if let Some(max_attempts) = settings.max_attempts {
        pow = pow.with_max_attempts(max_attempts);
    }
    info!(strategy = pow.name(), difficulty = pow.difficulty(), "sealing block");
    let started = Instant::now();
    chain
        .append_with(vec![Transaction::new("1", "Alice", "Bob", 10.0)], &mut pow)
        .context("mining block")?;
    timings.push(Some(started.elapsed().as_millis()));

    let started = Instant::now();
    chain
        .append_with_pos(vec![Transaction::new("2", "Bob", "Charlie", 5.0)])
        .context("staking block")?;
    timings.push(Some(started.elapsed().as_millis()));

    let (valid, failed_at) = match chain.audit() {
        Ok(()) => (true, None),
        Err(violation) => {
            warn!(%violation, "chain verification failed");
            (false, violation.index())
        }
    };
    let report = Report {
        blocks: chain
            .blocks()
            .iter()
            .zip(timings.iter().copied())
            .map(|(block, ms)| summarize(block, ms))
            .collect(),
        valid,
        failed_at,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for summary in &report.blocks {
            let seal = match summary.seal {
                Seal::Work { nonce, difficulty } => format!("PoW nonce={} difficulty={}", nonce, difficulty),
                Seal::Stake { validator } => format!("PoS validator={}", validator),
            };
            println!(
                "Block {}, Hash: {}, PrevHash: {}, MerkleRoot: {}, {}",
                summary.index, summary.hash, summary.previous_hash, summary.merkle_root, seal
            );
        }
        match failed_at {
            Some(index) => println!("Chain valid? no (first bad block: {})", index),
            None => println!("Chain valid? {}", if valid { "yes" } else { "no" }),
        }
    }

    if let Some(path) = &settings.store_path {
        let store = ChainStore::open(path).with_context(|| format!("opening store at {}", path))?;
        store.save_chain(&chain)?;
        let reloaded = store.load_chain(chain.validators().to_vec()).context("reloading stored chain")?;
        info!(path = %path, blocks = reloaded.len(), valid = reloaded.verify(), "chain persisted and reloaded");
    }

    Ok(())
}
