use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use cueflow_core::{
    Action, ActionExecutor, CodeExecutionPort, ConfigManager, Cue, CueEngine, CueStore,
    CueTarget, EngineCommand, ExecuteOutcome, JsonFileStore, MemoryParameterPort,
    MemoryTimelinePort, MemoryTransportFactory, ParameterPort, ParameterStyle,
    RecordingCodePort, Settings, SnapshotEngine, TimelineCommand,
};
use tokio::sync::mpsc;

/// Cue sequencing engine for show control.
#[derive(Parser, Debug)]
#[command(name = "cueflow")]
#[command(about = "Cueflow show-control cue sequencer")]
struct Args {
    /// Path to the configuration file (default: config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cue sheet
    List,
    /// Validate the actions of every cue without executing anything
    Check,
    /// Execute a single cue by id or index
    Go {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        index: Option<u32>,
    },
    /// Execute cues starting at an index, following autofollow chains
    Run {
        /// Index to start from
        #[arg(long, default_value = "1")]
        from: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = ConfigManager::new(args.config);
    let settings = config.load()?;

    match args.command {
        Command::List => list(&settings),
        Command::Check => check(&settings),
        Command::Go { id, index } => {
            let target = match (id, index) {
                (Some(id), _) => CueTarget::Id(id),
                (None, Some(index)) => CueTarget::Index(index),
                (None, None) => return Err(anyhow!("No cue ID or index provided")),
            };
            let (mut engine, _rx) = build_engine(&settings)?;
            let outcome = engine.go(target)?;
            print_outcome(&outcome)
        }
        Command::Run { from } => run(&settings, from).await,
    }
}

fn list(settings: &Settings) -> Result<()> {
    let (engine, _rx) = build_engine(settings)?;
    let listing = engine.list();

    println!(
        "{:>5}  {:<12}  {:<24}  {:>8}  {:>10}  {:>6}  {:>7}",
        "index", "id", "name", "duration", "autofollow", "nodes", "actions"
    );
    for overview in &listing.cues {
        let cue = &overview.cue;
        println!(
            "{:>5}  {:<12}  {:<24}  {:>7}s  {:>10}  {:>6}  {:>7}",
            cue.index,
            cue.id,
            cue.name,
            cue.duration,
            cue.autofollow,
            overview.component_count,
            cue.actions.len()
        );
    }
    println!("{} cues", listing.count);
    Ok(())
}

fn check(settings: &Settings) -> Result<()> {
    let store = CueStore::new(Box::new(JsonFileStore::new(&settings.cue_file)))?;
    let mut problems = Vec::new();

    for cue in store.list() {
        for (i, action) in cue.actions.iter().enumerate() {
            if let Some(problem) = action_problem(action) {
                problems.push(format!("cue {} action {}: {}", cue.id, i + 1, problem));
            }
        }
    }

    if problems.is_empty() {
        println!("All cues OK");
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("{}", problem);
        }
        Err(anyhow!("{} problem(s) found", problems.len()))
    }
}

fn action_problem(action: &Action) -> Option<String> {
    match action {
        Action::Unknown => Some("unknown action type".to_string()),
        Action::Parameter {
            path, parameter, ..
        } if path.is_empty() || parameter.is_empty() => {
            Some("parameter action with empty path or parameter".to_string())
        }
        Action::Timeline { action, frame, .. }
            if *action == TimelineCommand::JumpFrame && frame.is_none() =>
        {
            Some("jump_frame without a frame".to_string())
        }
        Action::Timeline { action, rate, .. }
            if *action == TimelineCommand::SetRate && rate.is_none() =>
        {
            Some("set_rate without a rate".to_string())
        }
        Action::Timeline { action, .. } if *action == TimelineCommand::Unknown => {
            Some("unknown timeline action".to_string())
        }
        _ => None,
    }
}

async fn run(settings: &Settings, from: u32) -> Result<()> {
    let (mut engine, mut rx) = build_engine(settings)?;

    let outcome = engine.go(CueTarget::Index(from))?;
    print_outcome(&outcome)?;

    // Autofollow chains re-enter through the command channel; keep draining
    // it for as long as a transition is pending.
    while engine.autofollow_armed() {
        let Some(EngineCommand::Go { index }) = rx.recv().await else {
            break;
        };
        match engine.go(CueTarget::Index(index)) {
            Ok(outcome) => print_outcome(&outcome)?,
            Err(e) => {
                log::warn!("Autofollow advance to index {} failed: {}", index, e);
                break;
            }
        }
    }
    Ok(())
}

/// Build an engine over the configured cue file, rehearsing against an
/// in-memory scene graph seeded from the cue snapshots themselves so every
/// recorded node resolves.
fn build_engine(
    settings: &Settings,
) -> Result<(CueEngine, mpsc::Receiver<EngineCommand>)> {
    let store = CueStore::new(Box::new(JsonFileStore::new(&settings.cue_file)))?;
    let cues: Vec<Cue> = store.list().into_iter().cloned().collect();

    let params = Arc::new(MemoryParameterPort::new());
    params.add_node(&settings.snapshot_root);
    for cue in &cues {
        for (path, node) in &cue.snapshot {
            for (name, value) in &node.params {
                params.add_param(path, name, ParameterStyle::Value, value.clone());
            }
        }
    }

    let snapshots = SnapshotEngine::new(
        Arc::clone(&params) as Arc<dyn ParameterPort>,
        settings.exclude_marker.clone(),
    );
    let actions = ActionExecutor::new(
        params as Arc<dyn ParameterPort>,
        Arc::new(RecordingCodePort::new()) as Arc<dyn CodeExecutionPort>,
        Box::new(MemoryTimelinePort::new()),
        Box::new(MemoryTransportFactory::new()),
    );

    let (engine, rx) = CueEngine::new(store, snapshots, actions, settings.frame_rate);
    Ok((engine, rx))
}

fn print_outcome(outcome: &ExecuteOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
