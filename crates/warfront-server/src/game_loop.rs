//! Game loop thread: runs the simulation engine at 30Hz and publishes snapshots.
//!
//! The engine is created inside the thread so it never crosses threads.
//! Commands arrive via an `mpsc` channel; the latest snapshot is stored in
//! shared state for polling.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use glam::Vec2;
use tracing::{info, warn};

use warfront_core::constants::TICK_RATE;
use warfront_core::state::GameStateSnapshot;
use warfront_core::types::ClientId;
use warfront_sim::engine::{SimConfig, SimulationEngine};

use crate::state::GameLoopCommand;

/// Nominal duration of one tick.
const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// Ticks between periodic summary log lines.
const SUMMARY_INTERVAL: u64 = TICK_RATE as u64 * 10;

pub struct LoopConfig {
    pub sim: SimConfig,
    /// Players joined before the first tick.
    pub players: Vec<(ClientId, Vec2)>,
    /// Stop after this many ticks; run until shutdown when `None`.
    pub max_ticks: Option<u64>,
    /// Sleep between ticks to hold the tick rate. Off for batch runs.
    pub paced: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            players: Vec::new(),
            max_ticks: None,
            paced: true,
        }
    }
}

/// How a finished loop ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub phase: usize,
    pub kills: u32,
}

/// Spawns the game loop in a new thread.
///
/// Returns the command sender and a handle resolving to the loop summary.
pub fn spawn_game_loop(
    config: LoopConfig,
    latest_snapshot: Arc<Mutex<Option<GameStateSnapshot>>>,
) -> std::io::Result<(mpsc::Sender<GameLoopCommand>, JoinHandle<LoopSummary>)> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<GameLoopCommand>();

    let handle = std::thread::Builder::new()
        .name("warfront-game-loop".into())
        .spawn(move || run_game_loop(config, cmd_rx, &latest_snapshot))?;

    Ok((cmd_tx, handle))
}

/// The game loop. Runs until the tick limit, a Shutdown command or channel
/// disconnect.
pub fn run_game_loop(
    config: LoopConfig,
    cmd_rx: mpsc::Receiver<GameLoopCommand>,
    latest_snapshot: &Mutex<Option<GameStateSnapshot>>,
) -> LoopSummary {
    let mut engine = SimulationEngine::new(config.sim);
    for (client, base) in config.players {
        join(&mut engine, client, base);
    }
    let mut next_tick_time = Instant::now();

    loop {
        if config.max_ticks.is_some_and(|max| engine.time().tick >= max) {
            break;
        }

        // 1. Drain all pending commands
        loop {
            match cmd_rx.try_recv() {
                Ok(GameLoopCommand::Request(request)) => engine.queue_request(request),
                Ok(GameLoopCommand::AddPlayer { client, base }) => join(&mut engine, client, base),
                Ok(GameLoopCommand::RemovePlayer(client)) => {
                    if let Err(err) = engine.remove_player(client) {
                        warn!(client = client.0, %err, "remove player failed");
                    }
                }
                Ok(GameLoopCommand::Shutdown) => return summarize(&engine),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return summarize(&engine),
            }
        }

        // 2. Advance one tick
        let snapshot = engine.tick();

        if snapshot.time.tick % SUMMARY_INTERVAL == 0 {
            info!(
                tick = snapshot.time.tick,
                phase = %snapshot.wave.phase_name,
                kills = snapshot.wave.kills,
                objects = snapshot.objects.len(),
                "match progress"
            );
        }

        // 3. Store latest snapshot for polling
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        // 4. Sleep until next tick
        if config.paced {
            next_tick_time += TICK_DURATION;
            let now = Instant::now();
            if next_tick_time > now {
                std::thread::sleep(next_tick_time - now);
            } else if now - next_tick_time > TICK_DURATION * 2 {
                // Too far behind, reset instead of catching up
                next_tick_time = now;
            }
        }
    }

    summarize(&engine)
}

fn join(engine: &mut SimulationEngine, client: ClientId, base: Vec2) {
    if let Err(err) = engine.add_player(client, base) {
        warn!(client = client.0, %err, "add player failed");
    }
}

fn summarize(engine: &SimulationEngine) -> LoopSummary {
    let waves = engine.waves();
    LoopSummary {
        ticks: engine.time().tick,
        phase: waves.phase,
        kills: waves.kills,
    }
}
