//! Single-device game session.
//!
//! Runs the exact same transition engine as the room store, synchronously
//! and without any network or locking: one UI thread, one snapshot. Event
//! scripts written against the server host validate unchanged against this
//! one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{self, EngineError, Event, Outcome};
use crate::types::*;

pub struct LocalSession {
    state: GameState,
    rng: StdRng,
}

impl LocalSession {
    /// New session with OS-seeded shuffles.
    pub fn new(config: GameConfig) -> Self {
        Self::with_seed(config, rand::rng().random())
    }

    /// New session with deterministic shuffles, for tests and replays.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        let code = local_session_code(seed);
        Self {
            state: GameState::new(code, config),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn add_player(
        &mut self,
        display_name: &str,
        team: Option<TeamId>,
    ) -> Result<Player, EngineError> {
        let player = self.state.add_player(display_name, team)?;
        self.bump();
        Ok(player)
    }

    pub fn submit_characters(
        &mut self,
        player_id: &str,
        names: &[String],
    ) -> Result<(), EngineError> {
        self.state.submit_characters(player_id, names)?;
        self.bump();
        Ok(())
    }

    pub fn seed_pool(&mut self, names: &[String]) -> Result<(), EngineError> {
        self.state.seed_pool(names)?;
        self.bump();
        Ok(())
    }

    /// Apply one transition event; same semantics as the server store.
    pub fn apply(&mut self, event: &Event) -> Result<Outcome, EngineError> {
        let (next, outcome) = engine::transition(&self.state, event, &mut self.rng)?;
        self.state = next;
        self.bump();
        Ok(outcome)
    }

    /// One second of countdown. Decrements the timer when it is running and
    /// raises TimeUp synchronously when it reaches zero. Returns the outcome
    /// of that implicit transition, if one fired.
    pub fn tick(&mut self) -> Result<Option<Outcome>, EngineError> {
        if self.state.status != GameStatus::Playing || self.state.timer.is_paused {
            return Ok(None);
        }
        if self.state.timer.time_left > 1 {
            self.state.timer.time_left -= 1;
            self.bump();
            return Ok(None);
        }
        self.state.timer.time_left = 0;
        self.apply(&Event::TimeUp).map(Some)
    }

    fn bump(&mut self) {
        self.state.version += 1;
        self.state.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Local sessions still carry an opaque room-code-shaped identifier so
/// snapshots look the same to consumers.
fn local_session_code(seed: u64) -> String {
    const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = StdRng::seed_from_u64(seed ^ 0x6c6f_6361_6c00);
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}
