//! tc - drive the task chain engine against a simulated world
//!
//! CLI entry point: runs a resumable terrain search with hazard avoidance
//! and prints what happened.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Serialize;
use tracing::{debug, info, warn};

use taskchain::cli::{Cli, Command, ConfigFormat, OutputFormat};
use taskchain::config::Config;
use taskchain::sim::{SimRig, SimWorld, spawn_loader};
use taskchain::{
    CellPos, CellSearchTask, Clock, DispatcherStats, FinishedTask, HazardChain, Runner, RunnerStatus, SystemClock,
    TaskChain, Terrain, TerrainSearch, UserTaskChain,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskchain")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("taskchain.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            ticks,
            seed,
            terrain,
            format,
        } => cmd_run(config, ticks, seed, terrain, format).await,
        Command::Config { format } => cmd_config(&config, format),
    }
}

/// What a `tc run` did
#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    terrain: Terrain,
    search_start: CellPos,
    ticks: u64,
    searched: usize,
    loaded_cells: usize,
    finished: Vec<FinishedTask>,
    messages: Vec<String>,
    dispatcher: DispatcherStats,
    runner: RunnerStatus,
}

/// Closest cell of `terrain` to the origin, if the world has one nearby
fn find_patch(world: &SimWorld, terrain: Terrain, radius: i32) -> Option<CellPos> {
    let origin = CellPos::new(0, 0);
    (0..=radius).find_map(|ring| {
        (-ring..=ring)
            .flat_map(|x| (-ring..=ring).map(move |z| CellPos::new(x, z)))
            .filter(|cell| cell.grid_distance(origin) == ring)
            .find(|cell| world.terrain_of(*cell) == terrain)
    })
}

async fn cmd_run(
    config: Config,
    ticks: Option<u64>,
    seed: Option<u64>,
    terrain: Option<Terrain>,
    format: OutputFormat,
) -> Result<()> {
    let mut sim = config.sim.clone();
    if let Some(seed) = seed {
        sim.seed = seed;
    }
    if let Some(terrain) = terrain {
        sim.search_terrain = terrain;
    }
    let max_ticks = ticks.unwrap_or(sim.max_ticks);
    debug!(?sim, max_ticks, "cmd_run: called");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let world = Arc::new(SimWorld::generate(sim.seed, sim.world_radius));
    let search_start = find_patch(&world, sim.search_terrain, sim.world_radius).unwrap_or(CellPos::new(0, 0));
    info!(seed = sim.seed, terrain = %sim.search_terrain, start = %search_start, "Starting simulated run");

    let (mut agent, rig) = SimRig::agent(
        world.clone(),
        CellPos::new(0, 0),
        sim.agent_speed,
        config.behavior.clone(),
        config.dispatcher.clone(),
        clock.clone(),
    );
    let loader = spawn_loader(world.clone(), rig.body.clone(), sim.load_radius, sim.loader_interval());

    let mut runner = Runner::new();
    let user_id = runner.register_chain(Box::new(UserTaskChain::new(clock.clone())));
    runner.register_chain(Box::new(HazardChain::new()));
    runner
        .chain_as_mut::<UserTaskChain>(user_id)
        .ok_or_else(|| eyre!("User chain not registered"))?
        .run_task(
            &mut agent,
            CellSearchTask::new(search_start, TerrainSearch::new(sim.search_terrain)),
        );
    if config.runner.start_enabled {
        runner.enable(&mut agent);
    }

    let mut interval = tokio::time::interval(config.runner.tick_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticks_run = 0;
    let mut searched = 0;
    while ticks_run < max_ticks {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                info!(ticks_run, "Interrupted, stopping");
                break;
            }
        }

        runner.tick(&mut agent);
        rig.driver.step();
        if let Err(e) = agent.messages.tick() {
            warn!(error = %e, "Message dropped");
        }
        ticks_run += 1;

        let user = runner
            .chain_as::<UserTaskChain>(user_id)
            .ok_or_else(|| eyre!("User chain not registered"))?;
        if let Some(search) = user
            .current_task()
            .and_then(|node| node.downcast_ref::<CellSearchTask<TerrainSearch>>())
        {
            searched = search.searched().len();
        }
        if !user.is_active() {
            info!(ticks_run, "User chain idle, stopping");
            break;
        }
    }

    let finished = runner
        .chain_as::<UserTaskChain>(user_id)
        .map(|user| user.history().to_vec())
        .unwrap_or_default();
    let status = runner.status();
    runner.disable(&mut agent);
    loader.abort();

    let summary = RunSummary {
        seed: sim.seed,
        terrain: sim.search_terrain,
        search_start,
        ticks: ticks_run,
        searched,
        loaded_cells: world.loaded_count(),
        finished,
        messages: rig.transport.sent(),
        dispatcher: agent.messages.stats().clone(),
        runner: status,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?);
        }
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let outcome = if summary.finished.is_empty() {
        "still running"
    } else {
        "finished"
    };
    println!(
        "Search for {} from {} (seed {}): {} after {} ticks",
        summary.terrain, summary.search_start, summary.seed, outcome, summary.ticks
    );
    println!("  searched: {} cells", summary.searched);
    println!("  loaded:   {} cells", summary.loaded_cells);
    println!(
        "  messages: {} sent, {} failed, {} dropped",
        summary.dispatcher.total_sent, summary.dispatcher.total_failed, summary.dispatcher.total_dropped
    );
    for message in &summary.messages {
        println!("    > {}", message);
    }
    match &summary.runner.current_chain {
        Some(chain) => println!("  chain:    {} ({})", chain, summary.runner.task_path.join(" -> ")),
        None => println!("  chain:    none"),
    }
}

fn cmd_config(config: &Config, format: ConfigFormat) -> Result<()> {
    debug!(%format, "cmd_config: called");
    let text = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).context("Failed to serialize config")?,
        ConfigFormat::Json => serde_json::to_string_pretty(config).context("Failed to serialize config")?,
    };
    println!("{}", text.trim_end());
    Ok(())
}
