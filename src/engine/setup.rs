//! Waiting-phase mutations: creating a game, joining players, collecting the
//! character pool. These run before the first `StartGame` transition and are
//! shared by the room store and the local session.

use std::collections::BTreeMap;

use super::error::EngineError;
use crate::types::*;

impl GameState {
    /// Fresh game in the waiting lobby.
    pub fn new(room_code: String, config: GameConfig) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            room_code,
            version: 1,
            status: GameStatus::Waiting,
            players: Vec::new(),
            character_pool: Vec::new(),
            pool_seeded: false,
            round_characters: Vec::new(),
            blocked_characters: Vec::new(),
            current_round: 1,
            current_character_index: 0,
            turn_cursor: 0,
            current_team: 1,
            round_scores: vec![BTreeMap::new(); ROUND_COUNT as usize],
            player_stats: Default::default(),
            timer: TimerState::paused(config.time_per_round),
            waiting_for_player: true,
            showing_round_intro: true,
            created_at: now.clone(),
            updated_at: now,
            config,
        }
    }

    /// Add a player to a waiting game.
    ///
    /// Teams mode requires an explicit team pick (1 or 2); Pairs mode assigns
    /// pairs by join order, two players per team.
    pub fn add_player(
        &mut self,
        display_name: &str,
        team: Option<TeamId>,
    ) -> Result<Player, EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::invalid_state(
                "players can only join while the room is waiting",
            ));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(EngineError::validation(format!(
                "room is full ({MAX_PLAYERS} players max)"
            )));
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(EngineError::validation("display name must not be empty"));
        }

        let team = match self.config.mode {
            GameMode::Teams => match team {
                Some(t @ 1..=2) => t,
                Some(t) => {
                    return Err(EngineError::validation(format!(
                        "team {t} does not exist, pick team 1 or 2"
                    )))
                }
                None => return Err(EngineError::validation("a team pick is required")),
            },
            // Join order pairs players up: 1st+2nd = team 1, 3rd+4th = team 2.
            GameMode::Pairs => (self.players.len() as TeamId / 2) + 1,
        };

        let player = Player {
            id: ulid::Ulid::new().to_string(),
            display_name: display_name.to_string(),
            team,
            score: 0,
            characters_submitted: false,
        };
        self.player_stats
            .insert(player.id.clone(), PlayerStats::default());
        self.players.push(player.clone());
        Ok(player)
    }

    /// Record a player's character contributions.
    ///
    /// The list cardinality must match `characters_per_player` exactly, and
    /// names must be non-empty and unique (case-sensitive) both within the
    /// submission and against the pool collected so far.
    pub fn submit_characters(
        &mut self,
        player_id: &str,
        names: &[String],
    ) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::invalid_state(
                "characters can only be submitted while the room is waiting",
            ));
        }
        if self.pool_seeded {
            return Err(EngineError::validation(
                "this game uses a seeded category pool",
            ));
        }
        let player = self
            .players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or_else(|| EngineError::validation("unknown player"))?;
        if player.characters_submitted {
            return Err(EngineError::validation(
                "this player already submitted their characters",
            ));
        }

        let expected = self.config.characters_per_player as usize;
        if names.len() != expected {
            return Err(EngineError::validation(format!(
                "expected exactly {expected} characters, got {}",
                names.len()
            )));
        }
        let cleaned = clean_names(names)?;
        for name in &cleaned {
            if self.character_pool.contains(name) {
                return Err(EngineError::validation(format!(
                    "character \"{name}\" is already in the pool"
                )));
            }
        }

        self.character_pool.extend(cleaned);
        if let Some(p) = self.players.iter_mut().find(|p| p.id == player_id) {
            p.characters_submitted = true;
        }
        Ok(())
    }

    /// Replace the pool with a host-provided category pool.
    ///
    /// Only allowed before any player has submitted characters; a seeded game
    /// skips per-player collection and only requires `MIN_SEEDED_POOL` names
    /// at start.
    pub fn seed_pool(&mut self, names: &[String]) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::invalid_state(
                "the pool can only be seeded while the room is waiting",
            ));
        }
        if self.players.iter().any(|p| p.characters_submitted) {
            return Err(EngineError::validation(
                "players already started submitting characters",
            ));
        }
        let cleaned = clean_names(names)?;
        self.character_pool = cleaned;
        self.pool_seeded = true;
        Ok(())
    }

    /// All StartGame preconditions, checked before any mutation so a
    /// rejected start leaves the state untouched.
    pub(crate) fn validate_start(&self) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::invalid_state(
                "the game has already been started",
            ));
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(EngineError::validation(format!(
                "need at least {MIN_PLAYERS} players to start"
            )));
        }
        match self.config.mode {
            GameMode::Pairs => {
                if self.players.len() % 2 != 0 {
                    return Err(EngineError::validation(
                        "pairs mode needs an even number of players",
                    ));
                }
            }
            GameMode::Teams => {
                for team in 1..=2 {
                    if self.players_on_team(team).is_empty() {
                        return Err(EngineError::validation(format!(
                            "team {team} has no players"
                        )));
                    }
                }
            }
        }

        if self.pool_seeded {
            if self.character_pool.len() < MIN_SEEDED_POOL {
                return Err(EngineError::precondition_failed(format!(
                    "seeded pool needs at least {MIN_SEEDED_POOL} characters, got {}",
                    self.character_pool.len()
                )));
            }
        } else {
            let required = self.team_count() as usize * self.config.characters_per_player as usize;
            if self.character_pool.len() < required {
                return Err(EngineError::precondition_failed(format!(
                    "character pool needs at least {required} entries, got {}",
                    self.character_pool.len()
                )));
            }
        }
        Ok(())
    }
}

/// Trim names and reject empties and duplicates within the list.
fn clean_names(names: &[String]) -> Result<Vec<String>, EngineError> {
    let mut cleaned = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("character names must not be empty"));
        }
        if cleaned.iter().any(|c: &String| c == name) {
            return Err(EngineError::validation(format!(
                "duplicate character name \"{name}\""
            )));
        }
        cleaned.push(name.to_string());
    }
    Ok(cleaned)
}
