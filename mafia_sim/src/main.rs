//! Mafia simulator CLI
//!
//! Plays seeded batches of games and tunes policy parameters.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mafia_core::{Alignment, EventBus, EventKind};
use mafia_sim::runner::DEFAULT_ROUND_LIMIT;
use mafia_sim::{
    optimise_all, BatchRunner, EventRenderer, GameExport, GameOutcome, HistoryStore,
    OptimisationConfig, RosterPreset, RunnerError, SimConfig, SledHistoryStore, WinRateFitness,
};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Mafia round engine simulator
#[derive(Parser, Debug)]
#[command(name = "mafia-sim")]
#[command(about = "Simulate mafia games and optimise policy parameters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging; also prints every game event
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a batch of games and report win rates
    Simulate(SimulateArgs),

    /// Hill-climb policy parameters described in a plan file
    Optimize(OptimizeArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Number of games to play
    #[arg(default_value = "10")]
    games: usize,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Roster preset (classic, compact, extended, leaderless, blind)
    #[arg(short, long, default_value = "classic")]
    preset: RosterPreset,

    /// JSON file choosing a policy per role
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// sled database for finished games
    #[arg(long)]
    db: Option<PathBuf>,

    /// Games buffered before each database write
    #[arg(long, default_value = "1")]
    batch_size: usize,

    /// Parallel workers
    #[arg(short, long, default_value = "1")]
    workers: usize,

    /// Rounds before a game is abandoned
    #[arg(long, default_value_t = DEFAULT_ROUND_LIMIT)]
    round_limit: u32,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Write the rendered event log to this file
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Export one game as JSON instead of running the batch
    #[arg(long)]
    export: Option<String>,

    /// Game index used with --export
    #[arg(long, default_value = "0")]
    export_game: usize,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    /// Optimisation plan (JSON)
    config: PathBuf,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Command::Simulate(args) => simulate(args, cli.verbose).await,
        Command::Optimize(args) => optimize(args).await,
    }
}

async fn simulate(args: SimulateArgs, verbose: bool) -> Result<()> {
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .context("System clock is before 1970")?
            .as_nanos() as u64
    } else {
        args.seed
    };

    let config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("Loading policy config {}", path.display()))?,
        None => SimConfig::default(),
    };

    let mut renderer = EventRenderer::new().with_echo(verbose);
    if let Some(path) = &args.log_file {
        renderer = renderer
            .with_file(path)
            .with_context(|| format!("Opening log file {}", path.display()))?;
    }

    let mut runner = BatchRunner::new(seed)
        .with_config(config)
        .with_preset(args.preset)
        .with_round_limit(args.round_limit);

    if let Some(export_path) = &args.export {
        let mut events = EventBus::new();
        renderer.attach(&mut events);
        let export = GameExport::record(&runner, args.export_game, events)?;
        export
            .write_to_file(export_path)
            .with_context(|| format!("Writing export {}", export_path))?;
        info!(
            "Exported game {} (seed={}) with {} events to {}",
            args.export_game,
            seed,
            export.events.len(),
            export_path
        );
        return Ok(());
    }

    let mut workers = args.workers.max(1);
    if renderer.is_active() {
        if workers > 1 {
            warn!("Event log requested; running on a single worker");
            workers = 1;
        }
        let renderer = renderer.clone();
        runner = runner.with_events(move |index| {
            let mut bus = EventBus::new();
            let header = renderer.clone();
            bus.subscribe(EventKind::GameStarted, move |_| {
                header.log_line(&format!("game {}", index + 1))?;
                Ok(())
            });
            renderer.attach(&mut bus);
            bus
        });
    }

    let mut store = match &args.db {
        Some(path) => Some(
            SledHistoryStore::open(path)
                .with_context(|| format!("Opening game database {}", path.display()))?
                .with_batch_size(args.batch_size),
        ),
        None => None,
    };

    if !args.json {
        info!("Mafia simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("{} games, roster {} ({})", args.games, args.preset, args.preset.description());
    }

    let on_game = |outcome: &GameOutcome| -> Result<(), RunnerError> {
        if let (Some(store), Some(record)) = (store.as_mut(), outcome.record()) {
            store.log_game(record)?;
        }
        Ok(())
    };
    let summary = if workers > 1 {
        runner.run_parallel(args.games, workers, on_game).await?
    } else {
        runner.run(args.games, on_game)?
    };

    let stored = match store.as_mut() {
        Some(store) => {
            store.flush()?;
            Some(store.stored_count())
        }
        None => None,
    };

    if args.json {
        let output = serde_json::json!({
            "seed": seed,
            "preset": args.preset.name(),
            "games": summary.games,
            "civilian_wins": summary.civilian_wins,
            "mafia_wins": summary.mafia_wins,
            "unfinished": summary.unfinished,
            "civilian_win_rate": summary.win_rate(Alignment::Civilian),
            "mafia_win_rate": summary.win_rate(Alignment::Mafia),
            "average_rounds": summary.average_rounds(),
            "stored": stored,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for side in [Alignment::Civilian, Alignment::Mafia] {
            info!(
                "{} wins: {} ({:.1}%)",
                side,
                summary.wins(side),
                summary.win_rate(side) * 100.0
            );
        }
        if summary.unfinished > 0 {
            warn!(
                "{} games hit the {}-round limit",
                summary.unfinished, args.round_limit
            );
        }
        info!("Average game length: {:.2} rounds", summary.average_rounds());
        if let Some(stored) = stored {
            info!("{} games in database", stored);
        }
    }
    Ok(())
}

async fn optimize(args: OptimizeArgs) -> Result<()> {
    let plan = OptimisationConfig::load(&args.config)
        .with_context(|| format!("Loading optimisation plan {}", args.config.display()))?;
    info!(
        "Optimising for {} over {} games x {} rounds (seed={})",
        plan.target, plan.games, plan.rounds, plan.seed
    );

    let fitness = WinRateFitness::from_plan(&plan);
    let report = tokio::task::spawn_blocking(move || optimise_all(&fitness, &plan)).await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        for (role, params) in &report.results {
            for (param, result) in params {
                println!(
                    "{}.{}: {:.3} -> {:.1}%",
                    role,
                    param,
                    result.value,
                    result.win_rate * 100.0
                );
            }
        }
    }
    Ok(())
}
