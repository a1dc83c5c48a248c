//! Headless WARFRONT match runner.

use std::error::Error;
use std::f32::consts::TAU;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use glam::Vec2;
use tracing::{info, warn};

use warfront_core::settings::SimSettings;
use warfront_core::types::ClientId;
use warfront_server::game_loop::{spawn_game_loop, LoopConfig};
use warfront_server::orders::gather_orders;
use warfront_server::state::ServerState;
use warfront_sim::engine::SimConfig;

/// Distance of each player's base from the enemy objective.
const BASE_DISTANCE: f32 = 40.0;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings JSON overriding the builtin tuning
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Seed for wave spawning
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Ticks to simulate before stopping
    #[arg(short, long, default_value = "9000")]
    ticks: u64,

    /// Number of players, placed in a ring around the objective
    #[arg(short, long, default_value = "2")]
    players: u32,

    /// Hold the real tick rate instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Write the final snapshot as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => SimSettings::from_file(path)?,
        None => SimSettings::builtin(),
    };

    let objective = settings.waves.objective;
    let players: Vec<(ClientId, Vec2)> = (0..args.players)
        .map(|i| {
            let angle = TAU * i as f32 / args.players as f32;
            let base = objective + Vec2::new(angle.sin(), angle.cos()) * BASE_DISTANCE;
            (ClientId(i + 1), base)
        })
        .collect();

    let state = ServerState::new();
    let (tx, handle) = spawn_game_loop(
        LoopConfig {
            sim: SimConfig {
                seed: args.seed,
                settings: settings.clone(),
            },
            players,
            max_ticks: Some(args.ticks),
            paced: args.realtime,
        },
        state.latest_snapshot.clone(),
    )?;
    state.attach(tx);
    info!(seed = args.seed, ticks = args.ticks, players = args.players, "match started");

    // Put the starting workers to work once the first snapshot is out.
    while state.snapshot().is_none() && !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(5));
    }
    if let Some(snapshot) = state.snapshot() {
        let orders = gather_orders(&snapshot, &settings);
        info!(orders = orders.len(), "workers sent to gather");
        for order in orders {
            if let Err(err) = state.submit(order) {
                warn!(%err, "could not submit order");
                break;
            }
        }
    }

    let summary = handle.join().map_err(|_| "game loop thread panicked")?;
    info!(
        ticks = summary.ticks,
        phase = summary.phase,
        kills = summary.kills,
        "match finished"
    );

    let Some(snapshot) = state.snapshot() else {
        return Ok(());
    };
    for ledger in &snapshot.ledgers {
        info!(
            client = ledger.client.0,
            currency = ledger.currency,
            population = ledger.population,
            population_cap = ledger.population_cap,
            "final ledger"
        );
    }
    if let Some(path) = &args.output {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &snapshot)?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}
