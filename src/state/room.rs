use std::sync::Arc;

use rand::Rng;
use tokio::sync::broadcast;

use super::{AppState, RoomHandle};
use crate::engine::{self, EngineError, Event, Outcome};
use crate::protocol::ServerMessage;
use crate::types::*;

/// Room codes use the full uppercase-alphanumeric alphabet; codes are
/// upper-cased on generation and on lookup.
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// Create a room with a fresh, collision-free code.
    pub async fn create_room(&self, config: GameConfig) -> GameState {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
            // Collision - try again (extremely rare with 2 billion codes)
        };

        let state = GameState::new(code.clone(), config);
        let snapshot = state.clone();
        let (tx, _rx) = broadcast::channel(64);
        rooms.insert(
            code.clone(),
            Arc::new(RoomHandle {
                state: tokio::sync::Mutex::new(state),
                notify: tx,
            }),
        );
        tracing::info!("created room {code}");
        snapshot
    }

    /// Look up a room handle; codes are case-insensitive on the way in.
    pub(crate) async fn room(&self, code: &str) -> Result<Arc<RoomHandle>, EngineError> {
        let code = code.trim().to_uppercase();
        self.rooms
            .read()
            .await
            .get(&code)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("no room with code {code}")))
    }

    /// Read the current snapshot. Always legal, even once finished.
    pub async fn get_state(&self, code: &str) -> Result<GameState, EngineError> {
        let room = self.room(code).await?;
        let state = room.state.lock().await;
        Ok(state.clone())
    }

    /// Subscribe to a room's change notifications.
    pub async fn subscribe(
        &self,
        code: &str,
    ) -> Result<broadcast::Receiver<ServerMessage>, EngineError> {
        let room = self.room(code).await?;
        Ok(room.notify.subscribe())
    }

    pub async fn join_room(
        &self,
        code: &str,
        display_name: &str,
        team: Option<TeamId>,
    ) -> Result<(GameState, Player), EngineError> {
        let room = self.room(code).await?;
        let mut state = room.state.lock().await;
        let player = state.add_player(display_name, team)?;
        let snapshot = commit(&room, &mut state);
        tracing::info!(
            "player {} joined room {} on team {}",
            player.display_name,
            snapshot.room_code,
            player.team
        );
        Ok((snapshot, player))
    }

    pub async fn submit_characters(
        &self,
        code: &str,
        player_id: &str,
        names: &[String],
    ) -> Result<GameState, EngineError> {
        let room = self.room(code).await?;
        let mut state = room.state.lock().await;
        state.submit_characters(player_id, names)?;
        Ok(commit(&room, &mut state))
    }

    pub async fn seed_pool(&self, code: &str, names: &[String]) -> Result<GameState, EngineError> {
        let room = self.room(code).await?;
        let mut state = room.state.lock().await;
        state.seed_pool(names)?;
        Ok(commit(&room, &mut state))
    }

    /// Apply one transition event to a room, serialized with every other
    /// mutation of that room. On success the new snapshot is stored,
    /// versioned, and announced; on error nothing changes.
    pub async fn apply_event(
        &self,
        code: &str,
        event: &Event,
    ) -> Result<(GameState, Outcome), EngineError> {
        let room = self.room(code).await?;
        let mut state = room.state.lock().await;
        let (next, outcome) = {
            let mut rng = rand::rng();
            engine::transition(&state, event, &mut rng)?
        };
        *state = next;
        let snapshot = commit(&room, &mut state);
        tracing::debug!(
            "room {}: {:?} -> {:?} (v{})",
            snapshot.room_code,
            event,
            outcome,
            snapshot.version
        );
        Ok((snapshot, outcome))
    }

    /// Drop rooms nobody has touched in a while. Finished games linger only
    /// for `finished_ttl_minutes`; everything else gets `ttl_minutes`.
    /// Returns the removed codes.
    pub async fn prune_stale(&self, ttl_minutes: i64, finished_ttl_minutes: i64) -> Vec<String> {
        let now = chrono::Utc::now();
        let mut stale = Vec::new();

        {
            let rooms = self.rooms.read().await;
            for (code, handle) in rooms.iter() {
                let state = handle.state.lock().await;
                let ttl = match state.status {
                    GameStatus::Finished => finished_ttl_minutes,
                    _ => ttl_minutes,
                };
                let idle_enough = chrono::DateTime::parse_from_rfc3339(&state.updated_at)
                    .map(|updated| now.signed_duration_since(updated).num_minutes() >= ttl)
                    .unwrap_or(true);
                if idle_enough {
                    stale.push(code.clone());
                }
            }
        }

        if !stale.is_empty() {
            let mut rooms = self.rooms.write().await;
            for code in &stale {
                rooms.remove(code);
            }
        }
        stale
    }
}

/// Version-bump, timestamp, and announce a just-applied mutation.
fn commit(room: &RoomHandle, state: &mut GameState) -> GameState {
    state.version += 1;
    state.updated_at = chrono::Utc::now().to_rfc3339();
    let snapshot = state.clone();
    // Ignore send errors (no watchers connected is fine)
    let _ = room.notify.send(ServerMessage::StateChanged {
        room_code: snapshot.room_code.clone(),
        version: snapshot.version,
    });
    snapshot
}
