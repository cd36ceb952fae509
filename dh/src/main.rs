//! Command-line driver for the dh-core rules engine.
//!
//! Runs scripted encounters, prices a character's experience spend and
//! inspects weapon trait text.
//!
//! ```bash
//! cargo run -p dh -- run demos/hab_block.json --seed 7
//! cargo run -p dh -- xp demos/guardsman.json
//! cargo run -p dh -- traits "Tearing, Proven (3), Devastating (2)"
//! ```

mod scenario;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dh_core::{
    apply_effects, Combatant, CombatantId, EngineConfig, ExperienceMode, RngDice, RulesEngine,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "dh")]
#[command(about = "Percentile-dice rules engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every action in a scenario file in order
    Run {
        scenario: PathBuf,

        /// Seed for reproducible dice
        #[arg(long)]
        seed: Option<u64>,

        /// Engine configuration file, overriding the scenario's
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print each roll context as JSON instead of prose
        #[arg(long)]
        json: bool,
    },

    /// Summarise a character's experience spend
    Xp {
        combatant: PathBuf,

        /// Use the costs recorded on the sheet instead of computing them
        #[arg(long)]
        manual: bool,
    },

    /// Extract weapon traits from free text
    Traits {
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dh=info,dh_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            scenario,
            seed,
            config,
            json,
        } => run(scenario, seed, config, json).await,
        Command::Xp { combatant, manual } => experience(combatant, manual).await,
        Command::Traits { text } => {
            let traits = dh_core::TraitExtractor::default().extract(&text.join(" "));
            println!("{}", serde_json::to_string_pretty(&traits)?);
            Ok(())
        }
    }
}

async fn run(path: PathBuf, seed: Option<u64>, config: Option<PathBuf>, json: bool) -> Result<()> {
    let scenario = Scenario::load(&path).await?;

    let config = match config {
        Some(config_path) => EngineConfig::load_json(&config_path)
            .await
            .with_context(|| format!("loading config {}", config_path.display()))?,
        None => scenario.config.clone().unwrap_or_default(),
    };
    let engine = RulesEngine::with_config(config);
    let mut encounter = scenario.encounter();
    let hordes: Vec<CombatantId> = encounter
        .iter()
        .filter(|c| c.is_horde())
        .map(|c| c.id)
        .collect();

    let seed = seed.unwrap_or_else(rand::random);
    info!(scenario = %scenario.name, seed, actions = scenario.actions.len(), "Running scenario");
    let mut dice = RngDice::seeded(seed);

    for (step, action) in scenario.actions.iter().enumerate() {
        let intent = action
            .to_intent(&encounter)
            .with_context(|| format!("action {}", step + 1))?;
        debug!(step, ?intent, "Resolving");

        let resolution = engine.resolve(&encounter, intent, &mut dice);
        if json {
            match &resolution.context {
                Some(context) => println!("{}", serde_json::to_string(context)?),
                None => println!("null"),
            }
        } else {
            println!("{}. {}", step + 1, resolution.narrative);
            for notice in resolution.all_notices() {
                println!("   - {notice}");
            }
        }
        apply_effects(&mut encounter, &resolution.effects);
    }

    if !json {
        println!();
        let mut combatants: Vec<&Combatant> = encounter.iter().collect();
        combatants.sort_by(|a, b| a.name.cmp(&b.name));
        for combatant in combatants {
            if hordes.contains(&combatant.id) {
                println!("{}: magnitude {}", combatant.name, combatant.horde);
            } else {
                println!(
                    "{}: {}/{} wounds, {} critical, fatigue {}",
                    combatant.name,
                    combatant.wounds.value,
                    combatant.wounds.max,
                    combatant.wounds.critical,
                    combatant.fatigue.value,
                );
            }
        }
    }
    Ok(())
}

async fn experience(path: PathBuf, manual: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let combatant: Combatant = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    let mode = if manual {
        ExperienceMode::Manual
    } else {
        ExperienceMode::Automatic
    };
    let engine = RulesEngine::with_config(EngineConfig::new().with_experience_mode(mode));
    let summary = engine.experience(&combatant);

    println!("{} ({:?})", combatant.name, mode);
    println!("  characteristics {:>6}", summary.characteristics);
    println!("  skills          {:>6}", summary.skills);
    println!("  talents         {:>6}", summary.talents);
    println!("  psychic         {:>6}", summary.psychic);
    println!("  other           {:>6}", summary.other);
    println!("  spent           {:>6} of {}", summary.total_spent(), summary.total);
    println!("  remaining       {:>6}", summary.remaining());
    Ok(())
}
