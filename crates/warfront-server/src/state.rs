//! Server state shared between the request side and the game loop thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use glam::Vec2;
use thiserror::Error;

use warfront_core::commands::RemoteRequest;
use warfront_core::state::GameStateSnapshot;
use warfront_core::types::ClientId;

/// Commands sent to the game loop thread.
#[derive(Debug)]
pub enum GameLoopCommand {
    /// A remote request to queue for the next tick.
    Request(RemoteRequest),
    /// A client joined with its base at the given ground position.
    AddPlayer { client: ClientId, base: Vec2 },
    /// A client left; everything it owns is destroyed.
    RemovePlayer(ClientId),
    /// Shut down the game loop thread gracefully.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("game loop is not running")]
    NotRunning,
    #[error("game loop thread has exited")]
    Disconnected,
}

/// Handles held by whoever talks to the game loop.
///
/// The sender sits behind a `Mutex` so the state can be shared across
/// threads (`Sender` is `Send` but not `Sync`).
pub struct ServerState {
    /// `None` until the loop is started.
    pub command_tx: Mutex<Option<mpsc::Sender<GameLoopCommand>>>,
    /// Updated by the game loop thread after each tick.
    pub latest_snapshot: Arc<Mutex<Option<GameStateSnapshot>>>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
        }
    }
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, tx: mpsc::Sender<GameLoopCommand>) {
        if let Ok(mut slot) = self.command_tx.lock() {
            *slot = Some(tx);
        }
    }

    pub fn send(&self, command: GameLoopCommand) -> Result<(), ServerError> {
        let slot = self.command_tx.lock().map_err(|_| ServerError::Disconnected)?;
        let tx = slot.as_ref().ok_or(ServerError::NotRunning)?;
        tx.send(command).map_err(|_| ServerError::Disconnected)
    }

    pub fn submit(&self, request: RemoteRequest) -> Result<(), ServerError> {
        self.send(GameLoopCommand::Request(request))
    }

    /// Copy of the most recent snapshot, if a tick has run.
    pub fn snapshot(&self) -> Option<GameStateSnapshot> {
        self.latest_snapshot.lock().ok().and_then(|s| s.clone())
    }
}
