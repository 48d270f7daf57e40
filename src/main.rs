//! qrbs CLI: run uncertain rule bases on a simulated register machine.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use qrbs::circuit::{IslandCompiler, Strategy};
use qrbs::config::QrbsConfig;
use qrbs::document::{Built, KnowledgeBase};
use qrbs::error::QrbsError;
use qrbs::id::IslandId;
use qrbs::qpu::Qpu;

#[derive(Parser)]
#[command(name = "qrbs", version, about = "Quantum rule-based system")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Uncertainty encoding: cf, fuzzy or bayes.
    #[arg(long, global = true)]
    strategy: Option<Strategy>,

    /// Sampled trials per island (0 for exact distributions).
    #[arg(long, global = true)]
    trials: Option<u64>,

    /// Seed for sampled runs.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Register limit of the simulator.
    #[arg(long, global = true)]
    max_registers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute every island and print the updated consequents.
    Run {
        /// Knowledge base (.toml or .json).
        kb: PathBuf,

        /// Print the execution report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check every island against the simulator's register limit.
    Evaluate {
        /// Knowledge base (.toml or .json).
        kb: PathBuf,
    },

    /// Print the circuit and register map of one island.
    Compile {
        /// Knowledge base (.toml or .json).
        kb: PathBuf,

        /// Island name.
        #[arg(long)]
        island: String,
    },
}

impl Cli {
    /// File configuration with command-line overrides applied.
    fn resolve_config(&self) -> Result<QrbsConfig> {
        let mut config = match &self.config {
            Some(path) => QrbsConfig::load(path).map_err(QrbsError::from)?,
            None => QrbsConfig::default(),
        };
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(max_registers) = self.max_registers {
            config.max_registers = max_registers;
        }
        config.validate().map_err(QrbsError::from)?;
        Ok(config)
    }
}

fn load(path: &Path) -> Result<Built> {
    let kb = KnowledgeBase::load(path).map_err(QrbsError::from)?;
    Ok(kb.build().map_err(QrbsError::from)?)
}

fn island_label(built: &Built, id: IslandId) -> String {
    built
        .island_name(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match &cli.command {
        Commands::Run { kb, json } => {
            let mut built = load(kb)?;
            let qpu = Qpu::new(config.to_backend(), config.to_execution_config())
                .map_err(QrbsError::from)?;
            let report = qpu
                .execute(&mut built.qrbs, None)
                .map_err(QrbsError::from)?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).into_diagnostic()?
                );
                return Ok(());
            }

            println!(
                "Executed {} island(s) with strategy {} ({}):",
                report.islands.len(),
                report.strategy,
                if report.trials == 0 {
                    "exact".to_string()
                } else {
                    format!("{} trials", report.trials)
                }
            );
            for run in &report.islands {
                println!(
                    "  {} [stage {}, {} registers, {} instructions]",
                    island_label(&built, run.island),
                    run.stage,
                    run.registers,
                    run.instructions
                );
                for update in &run.updates {
                    let name = built.fact_name(update.fact).unwrap_or("?");
                    println!("    {name} = {:.4}", update.precision);
                }
            }
        }

        Commands::Evaluate { kb } => {
            let built = load(kb)?;
            let qpu = Qpu::new(config.to_backend(), config.to_execution_config())
                .map_err(QrbsError::from)?;
            let capacities = qpu.capacity(&built.qrbs, None).map_err(QrbsError::from)?;

            println!("Register limit: {}", config.max_registers);
            for capacity in &capacities {
                println!(
                    "  {}: {} registers, {} instructions [{}]",
                    island_label(&built, capacity.island),
                    capacity.required,
                    capacity.instructions,
                    if capacity.fits() { "ok" } else { "exceeds" }
                );
            }
            qpu.evaluate(&built.qrbs, None).map_err(QrbsError::from)?;
            println!("All islands fit.");
        }

        Commands::Compile { kb, island } => {
            let built = load(kb)?;
            let Some(&id) = built.islands.get(island) else {
                miette::bail!("no island named \"{island}\" in {}", kb.display());
            };
            let compiled = IslandCompiler::new(&built.qrbs, config.strategy)
                .compile(id)
                .map_err(QrbsError::from)?;

            println!("Island {island} ({id}), strategy {}", config.strategy);
            print!("{}", compiled.circuit);
            println!("Register map:");
            print!("{}", compiled.symbols);
        }
    }

    Ok(())
}
