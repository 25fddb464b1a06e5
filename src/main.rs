use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dino_rl::checkpoint::{load_policy, load_state};
use dino_rl::config::{DinoConfig, PerceptionMode};
use dino_rl::dqn::preferred_device;
use dino_rl::{DinoEnv, Trainer, evaluate};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "dino-rl", version, about = "Train and run a DQN agent on a headless dino runner")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a new agent or continue a checkpointed one
    Train {
        /// JSON config; missing fields take defaults
        #[arg(long, conflicts_with = "resume")]
        config: Option<PathBuf>,
        #[arg(long)]
        episodes: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Use the scalar-feature observation instead of the ray fan
        #[arg(long, conflicts_with = "resume")]
        lean: bool,
        /// Directory to write checkpoints into
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Continue from this checkpoint directory, under its saved config
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// Greedy rollouts of a checkpointed policy, one per seed, in parallel
    Eval {
        #[arg(long)]
        checkpoint: PathBuf,
        #[arg(long, default_value_t = 8)]
        episodes: u64,
        #[arg(long, default_value_t = 1000)]
        seed: u64,
    },
    /// Print one render snapshot per tick as JSON lines
    Trace {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Drive with this policy instead of holding no input
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        #[arg(long, default_value_t = 500)]
        ticks: u64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}

fn load_config(path: Option<&Path>) -> Result<DinoConfig> {
    match path {
        Some(p) => DinoConfig::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(DinoConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let device = preferred_device();

    match cli.command {
        Command::Train { config, episodes, seed, lean, checkpoint, resume } => {
            let mut cfg = match &resume {
                Some(dir) => load_state(dir).context("reading checkpoint state")?.config,
                None => load_config(config.as_deref())?,
            };
            if let Some(n) = episodes {
                cfg.training.episodes = n;
            }
            if let Some(s) = seed {
                cfg.training.seed = s;
                cfg.agent.seed = s;
            }
            if lean {
                cfg.perception.mode = PerceptionMode::Lean;
            }
            cfg.validate().context("invalid configuration")?;

            let target = cfg.training.episodes;
            let mut trainer = Trainer::new(cfg, &device)?;
            if let Some(dir) = checkpoint.or_else(|| resume.clone()) {
                trainer = trainer.with_checkpoints(dir);
            }
            if let Some(dir) = &resume {
                trainer.resume(dir).with_context(|| format!("resuming from {}", dir.display()))?;
            }
            let report = trainer.run(target).context("training run aborted")?;
            let summary = serde_json::json!({
                "episodes": trainer.episodes_done(),
                "best_score": report.best_score,
                "mean_score": report.mean_score,
                "updates": report.total_updates,
                "epsilon": trainer.agent.epsilon,
            });
            println!("{summary}");
        }
        Command::Eval { checkpoint, episodes, seed } => {
            let (net, cfg) = load_policy(&checkpoint, &device)
                .with_context(|| format!("loading policy from {}", checkpoint.display()))?;
            let seeds: Vec<u64> = (seed..seed + episodes).collect();
            let report = evaluate(&net, &cfg, &seeds)?;
            tracing::info!(best = report.best_score, mean = report.mean_score, "evaluation finished");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Trace { config, checkpoint, ticks, seed } => {
            let (policy, cfg) = match &checkpoint {
                Some(dir) => {
                    let (net, cfg) = load_policy(dir, &device)?;
                    (Some(net), cfg)
                }
                None => (None, load_config(config.as_deref())?),
            };
            let mut env = DinoEnv::new(&cfg, seed);
            let scale = env.perception().input_scale();
            let mut obs = env.reset();
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for _ in 0..ticks {
                let action = match &policy {
                    Some(net) => net.greedy_action(&obs.scaled(&scale))?,
                    None => 2,
                };
                let step = env.step(action);
                writeln!(out, "{}", serde_json::to_string(&env.snapshot())?)?;
                obs = step.observation;
                if step.done {
                    tracing::info!(score = step.score, collided = step.collided, "episode over");
                    break;
                }
            }
        }
    }
    Ok(())
}
