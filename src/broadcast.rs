use crate::config::ServerConfig;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// How often the reaper sweeps for stale rooms.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a background task that drops rooms nobody touches anymore.
///
/// Leaving a room never mutates shared state, so abandoned rooms only go
/// away through this sweep. Finished games linger briefly for post-game
/// score screens, idle lobbies and stalled games considerably longer.
pub fn spawn_room_reaper(state: Arc<AppState>, config: &ServerConfig) {
    let ttl = config.room_ttl_minutes;
    let finished_ttl = config.finished_room_ttl_minutes;

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;

            let removed = state.prune_stale(ttl, finished_ttl).await;
            for code in &removed {
                tracing::info!("reaped stale room {code}");
            }
            if !removed.is_empty() {
                tracing::debug!(
                    "room sweep removed {} rooms, {} remain",
                    removed.len(),
                    state.room_count().await
                );
            }
        }
    });
}
