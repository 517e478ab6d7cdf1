//! dicebot_roll - evaluate a single formula
//!
//! Fills macro placeholders from `--arg`, then rolls the formula (or
//! evaluates it as math) and prints the text or the structured result.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use dicebot::message::{evaluate_formula, InlineOutcome};
use dicebot::{evaluate_math, fill_placeholders, Arguments, Engine, EngineConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One-shot dice roller
#[derive(Parser, Debug)]
#[command(name = "dicebot_roll", version, about = "Roll one dice formula")]
struct Args {
    /// Formula to evaluate, e.g. "4d6dl1+2" (words are joined with spaces)
    #[arg(required = true)]
    formula: Vec<String>,

    /// Placeholder argument: positional value or name=value (can be repeated)
    #[arg(short, long = "arg")]
    args: Vec<String>,

    /// TOML config file (default: dicebot.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed the random source for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Print the structured result as JSON
    #[arg(long)]
    json: bool,

    /// Use the math evaluator instead of rolling
    #[arg(long)]
    math: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dicebot=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let template = args.formula.join(" ");
    let formula = fill_placeholders(template.trim(), &Arguments::parse(&args.args));
    let formula = formula
        .strip_prefix("[[")
        .and_then(|f| f.strip_suffix("]]"))
        .unwrap_or(&formula)
        .trim()
        .to_string();

    if args.math {
        let value = evaluate_math(&formula);
        if args.json {
            println!("{}", serde_json::json!({ "formula": formula, "value": value }));
        } else {
            println!("{}", value);
        }
        return Ok(());
    }

    let config = EngineConfig::load(args.config.as_deref())?;
    let engine = Engine::new(config);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let outcome = evaluate_formula(&engine, &formula, &mut rng);

    if args.json {
        let json = serde_json::to_string_pretty(&outcome).map_err(|e| anyhow!("Failed to encode result: {}", e))?;
        println!("{}", json);
        return match outcome {
            InlineOutcome::Error { message } => bail!("{}", message),
            _ => Ok(()),
        };
    }

    match outcome {
        InlineOutcome::Roll(eval) => println!("{}", eval.formatted.text),
        InlineOutcome::Math { value } => println!("{}", value),
        InlineOutcome::Error { message } => bail!("Invalid formula '{}': {}", formula, message),
    }

    Ok(())
}
