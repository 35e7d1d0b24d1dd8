mod room;

use crate::protocol::ServerMessage;
use crate::types::GameState;
use std::collections::HashMap;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Shared application state: the authoritative store of all active rooms.
pub struct AppState {
    pub(crate) rooms: RwLock<HashMap<String, std::sync::Arc<RoomHandle>>>,
}

/// One room: the snapshot plus its notification channel.
///
/// The room code is the lock granularity: all transitions for a room apply
/// one at a time, in lock-acquisition order. The loser of a concurrent
/// hit/fail race sees the engine's precondition rejection instead of a
/// double-applied turn.
pub struct RoomHandle {
    pub(crate) state: Mutex<GameState>,
    /// Best-effort fan-out to clients watching this room.
    pub notify: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
