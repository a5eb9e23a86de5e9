use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use snake_evo::{Trainer, TrainingConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evolve snake controllers without a window
    Train {
        #[command(flatten)]
        common: CommonArgs,
        /// Number of generations to run
        #[arg(long)]
        generations: Option<usize>,
        /// Write per-generation statistics as JSON
        #[arg(long)]
        history_out: Option<PathBuf>,
    },
    /// Open the interactive trainer window (needs the `viewer` feature)
    View {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON config file; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Genomes per generation
    #[arg(long)]
    population: Option<usize>,
    /// Hidden layer width, repeat for more layers
    #[arg(long = "hidden")]
    hidden: Vec<usize>,
    /// Drop all hidden layers
    #[arg(long, conflicts_with = "hidden")]
    no_hidden: bool,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Evaluation worker threads
    #[arg(long)]
    threads: Option<usize>,
}

impl CommonArgs {
    fn into_config(self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path)?,
            None => TrainingConfig::default(),
        };
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if self.no_hidden {
            config.hidden_layers.clear();
        } else if !self.hidden.is_empty() {
            config.hidden_layers = self.hidden;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train {
            common,
            generations,
            history_out,
        } => {
            let mut config = common.into_config()?;
            if let Some(generations) = generations {
                config.generations = generations;
            }
            train(config, history_out)
        }
        Command::View { common } => view(common.into_config()?),
    }
}

#[cfg(feature = "viewer")]
fn view(config: TrainingConfig) -> anyhow::Result<()> {
    snake_evo::viewer::run(config)
}

#[cfg(not(feature = "viewer"))]
fn view(_config: TrainingConfig) -> anyhow::Result<()> {
    anyhow::bail!("this binary was built without the `viewer` feature")
}

fn train(config: TrainingConfig, history_out: Option<PathBuf>) -> anyhow::Result<()> {
    let generations = config.generations;
    let mut trainer = Trainer::new(config)?;
    log::info!("Training for {generations} generations");
    trainer.run(generations)?;

    if let Some(stats) = trainer.history().last() {
        log::info!(
            "Done: last best {:.0}, last avg {:.2}, most food {}",
            stats.best_fitness,
            stats.average_fitness,
            trainer.history().iter().map(|s| s.best_food).max().unwrap_or(0)
        );
    }

    if let Some(path) = history_out {
        let file = File::create(&path)
            .with_context(|| format!("creating history file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), trainer.history())
            .with_context(|| format!("writing history to {}", path.display()))?;
        log::info!("Wrote history to {}", path.display());
    }
    Ok(())
}
