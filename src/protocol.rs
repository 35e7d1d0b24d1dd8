use crate::engine::EngineError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        config: Option<GameConfig>,
    },
    JoinRoom {
        code: String,
        display_name: String,
        team: Option<TeamId>,
    },
    SubmitCharacters {
        code: String,
        player_id: PlayerId,
        characters: Vec<String>,
    },
    /// Host-provided category pool instead of per-player collection.
    SeedPool {
        code: String,
        characters: Vec<String>,
    },
    StartGame {
        code: String,
    },
    Hit {
        code: String,
        player_id: PlayerId,
    },
    Fail {
        code: String,
        player_id: PlayerId,
    },
    /// Raised by the client that watched `time_left` reach zero.
    TimeUp {
        code: String,
    },
    PlayerReady {
        code: String,
    },
    RoundIntroSeen {
        code: String,
    },
    FetchState {
        code: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room: RoomSnapshot,
        server_now: String,
    },
    PlayerJoined {
        room: RoomSnapshot,
        player: Player,
    },
    RoomState {
        room: RoomSnapshot,
        server_now: String,
    },
    /// Best-effort change ping; clients re-fetch the snapshot rather than
    /// trusting their own optimistic copy.
    StateChanged {
        room_code: String,
        version: u64,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn room_state(state: &GameState) -> Self {
        Self::RoomState {
            room: RoomSnapshot::from(state),
            server_now: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl From<&EngineError> for ServerMessage {
    fn from(err: &EngineError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

/// Snapshot sent to clients: the full game state plus fields the engine
/// derives, so consumers can render without re-implementing the selection
/// and rotation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub state: GameState,
    pub current_character: Option<String>,
    pub current_player_id: Option<PlayerId>,
    pub team_totals: BTreeMap<TeamId, u32>,
    pub mvp_player_id: Option<PlayerId>,
}

impl From<&GameState> for RoomSnapshot {
    fn from(state: &GameState) -> Self {
        let team_totals = (1..=state.team_count())
            .map(|team| (team, state.team_total(team)))
            .collect();
        Self {
            current_character: state.displayed_character().map(|c| c.to_string()),
            current_player_id: state.current_player().map(|p| p.id.clone()),
            team_totals,
            mvp_player_id: state.mvp().map(|p| p.id.clone()),
            state: state.clone(),
        }
    }
}
