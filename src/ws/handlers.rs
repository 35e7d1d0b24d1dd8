//! WebSocket message dispatch
//!
//! Single entry point mapping client messages onto room-store calls. Every
//! engine rejection comes back as a typed error message; successful calls
//! answer with the fresh snapshot.

use crate::engine::Event;
use crate::protocol::{ClientMessage, RoomSnapshot, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

/// Handle a client message and return the optional direct response.
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom { config } => {
            let room = state.create_room(config.unwrap_or_default()).await;
            Some(ServerMessage::RoomCreated {
                room: RoomSnapshot::from(&room),
                server_now: chrono::Utc::now().to_rfc3339(),
            })
        }

        ClientMessage::JoinRoom {
            code,
            display_name,
            team,
        } => match state.join_room(&code, &display_name, team).await {
            Ok((room, player)) => Some(ServerMessage::PlayerJoined {
                room: RoomSnapshot::from(&room),
                player,
            }),
            Err(e) => Some(ServerMessage::from(&e)),
        },

        ClientMessage::SubmitCharacters {
            code,
            player_id,
            characters,
        } => reply(state.submit_characters(&code, &player_id, &characters).await),

        ClientMessage::SeedPool { code, characters } => {
            reply(state.seed_pool(&code, &characters).await)
        }

        ClientMessage::StartGame { code } => apply(state, &code, Event::StartGame).await,

        ClientMessage::Hit { code, player_id } => {
            apply(state, &code, Event::Hit { player_id }).await
        }

        ClientMessage::Fail { code, player_id } => {
            apply(state, &code, Event::Fail { player_id }).await
        }

        ClientMessage::TimeUp { code } => apply(state, &code, Event::TimeUp).await,

        ClientMessage::PlayerReady { code } => apply(state, &code, Event::PlayerReady).await,

        ClientMessage::RoundIntroSeen { code } => {
            apply(state, &code, Event::RoundIntroSeen).await
        }

        ClientMessage::FetchState { code } => reply(state.get_state(&code).await),
    }
}

async fn apply(state: &Arc<AppState>, code: &str, event: Event) -> Option<ServerMessage> {
    match state.apply_event(code, &event).await {
        Ok((room, _outcome)) => Some(ServerMessage::room_state(&room)),
        Err(e) => Some(ServerMessage::from(&e)),
    }
}

fn reply(
    result: Result<crate::types::GameState, crate::engine::EngineError>,
) -> Option<ServerMessage> {
    match result {
        Ok(room) => Some(ServerMessage::room_state(&room)),
        Err(e) => Some(ServerMessage::from(&e)),
    }
}
