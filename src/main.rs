//! dicebot - evaluate inline rolls from chat lines on stdin

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dicebot::dice::Routing;
use dicebot::message::{evaluate_formula, InlineOutcome, InlineRoll};
use dicebot::{evaluate_message, Engine, EngineConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Dice roller for tabletop chat
#[derive(Parser, Debug)]
#[command(name = "dicebot", version, about = "Evaluate [[...]] dice rolls in chat lines read from stdin")]
struct Args {
    /// TOML config file (default: dicebot.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed the random source for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn routing_prefix(routing: Option<Routing>) -> &'static str {
    match routing {
        Some(Routing::GameMasterChannel) => "[to GM channel] ",
        Some(Routing::GameMasterDirect) => "[to GM direct] ",
        None => "",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout carries the rolls
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "dicebot=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }

    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let engine = Engine::new(config);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!("dicebot ready, reading stdin");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let result = evaluate_message(&engine, trimmed, &mut rng);
        let (text, routing) = if result.rolls.is_empty() {
            // No inline groups: the whole line is the formula
            let roll = InlineRoll {
                span: 0..trimmed.len(),
                formula: trimmed.to_string(),
                outcome: evaluate_formula(&engine, trimmed, &mut rng),
            };
            let routing = match &roll.outcome {
                InlineOutcome::Roll(eval) => eval.formatted.routing,
                _ => None,
            };
            (roll.rendered(), routing)
        } else {
            (result.text, result.routing)
        };

        for roll in result.rolls.iter().filter(|r| matches!(r.outcome, InlineOutcome::Error { .. })) {
            warn!("Inline roll '{}' failed", roll.formula);
        }

        writeln!(stdout, "{}{}", routing_prefix(routing), text)?;
    }

    Ok(())
}
