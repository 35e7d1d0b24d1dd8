use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type TeamId = u32;

/// Number of rounds in a full game (1 = describe, 2 = one word, 3 = mime).
pub const ROUND_COUNT: u32 = 3;
/// Room codes are always this many characters from [A-Z0-9].
pub const ROOM_CODE_LENGTH: usize = 6;
/// Minimum players needed to start a game.
pub const MIN_PLAYERS: usize = 2;
/// Hard cap on players per room.
pub const MAX_PLAYERS: usize = 16;
/// Minimum pool size when the host seeds a category pool instead of
/// collecting characters from the players.
pub const MIN_SEEDED_POOL: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

/// Team layout: two fixed teams, or two-player pairs formed by join order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Teams,
    Pairs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub mode: GameMode,
    /// Seconds each player gets per turn.
    pub time_per_round: u32,
    /// How many characters each player contributes to the pool.
    pub characters_per_player: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Teams,
            time_per_round: 60,
            characters_per_player: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub team: TeamId,
    pub score: u32,
    /// Whether this player has already contributed their characters.
    pub characters_submitted: bool,
}

/// Per-player hit/fail counters accumulated across the whole game.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStats {
    pub hits: u32,
    pub fails: u32,
}

/// Advisory countdown state. The server never enforces the deadline itself;
/// clients observe `time_left` reach zero and raise the TimeUp event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerState {
    pub time_left: u32,
    pub is_paused: bool,
}

impl TimerState {
    pub fn paused(time_left: u32) -> Self {
        Self {
            time_left,
            is_paused: true,
        }
    }
}

/// Full game snapshot: one per room on the server, one per local session.
///
/// Mutated exclusively through `engine::transition` and the setup operations
/// in `engine::setup`; consumers re-render from the snapshot they fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub room_code: String,
    /// Bumped by the host on every applied mutation.
    pub version: u64,
    pub status: GameStatus,
    pub config: GameConfig,
    /// Join order preserved; drives the MVP tiebreak.
    pub players: Vec<Player>,
    /// The full game-long set of character names, unique, case-sensitive.
    pub character_pool: Vec<String>,
    /// True when the pool came from a host-seeded category.
    pub pool_seeded: bool,
    /// Characters still unguessed in the current round.
    pub round_characters: Vec<String>,
    /// Characters shown and failed during the current turn; always a subset
    /// of `round_characters`.
    pub blocked_characters: Vec<String>,
    pub current_round: u32,
    /// Offset into the available (round minus blocked) list, taken modulo its
    /// length when selecting the displayed character.
    pub current_character_index: usize,
    /// Global turn index: team for index i is `i % team_count`, the player
    /// within that team is `(i / team_count) % team_size`.
    pub turn_cursor: u64,
    pub current_team: TeamId,
    /// Per-round per-team hit counters, exactly `ROUND_COUNT` entries.
    pub round_scores: Vec<BTreeMap<TeamId, u32>>,
    pub player_stats: HashMap<PlayerId, PlayerStats>,
    pub timer: TimerState,
    /// Turn is paused until the upcoming player acknowledges; hit/fail are
    /// rejected while set.
    pub waiting_for_player: bool,
    /// Round intro screen is up; hit/fail are rejected while set.
    pub showing_round_intro: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl GameState {
    /// Number of teams: fixed at two in Teams mode, one per pair in Pairs mode.
    pub fn team_count(&self) -> u32 {
        match self.config.mode {
            GameMode::Teams => 2,
            GameMode::Pairs => (self.players.len() as u32 / 2).max(1),
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn players_on_team(&self, team: TeamId) -> Vec<&Player> {
        self.players.iter().filter(|p| p.team == team).collect()
    }

    /// Character selection rule: the displayed character is taken from the
    /// round characters minus the blocked ones, by index modulo the available
    /// count. `None` means the pool needs a recompute (round advance or turn
    /// end) before anything can be displayed.
    pub fn displayed_character(&self) -> Option<&str> {
        let available: Vec<&String> = self
            .round_characters
            .iter()
            .filter(|c| !self.blocked_characters.contains(c))
            .collect();
        if available.is_empty() {
            return None;
        }
        Some(available[self.current_character_index % available.len()].as_str())
    }

    /// Total score for a team: sum of its hits across all rounds.
    pub fn team_total(&self, team: TeamId) -> u32 {
        self.round_scores
            .iter()
            .map(|per_team| per_team.get(&team).copied().unwrap_or(0))
            .sum()
    }

    /// The player whose turn it currently is, per the rotation cursor.
    pub fn current_player(&self) -> Option<&Player> {
        let members = self.players_on_team(self.current_team);
        if members.is_empty() {
            return None;
        }
        let slot = (self.turn_cursor as usize / self.team_count() as usize) % members.len();
        Some(members[slot])
    }

    /// Player with the most hits across the game. Ties go to whoever joined
    /// first; no hits at all means no MVP.
    pub fn mvp(&self) -> Option<&Player> {
        let mut best: Option<(&Player, u32)> = None;
        for player in &self.players {
            let hits = self
                .player_stats
                .get(&player.id)
                .map(|s| s.hits)
                .unwrap_or(0);
            if hits == 0 {
                continue;
            }
            match best {
                Some((_, best_hits)) if hits <= best_hits => {}
                _ => best = Some((player, hits)),
            }
        }
        best.map(|(p, _)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_state() -> GameState {
        GameState {
            room_code: "ABC123".to_string(),
            version: 1,
            status: GameStatus::Waiting,
            config: GameConfig::default(),
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
            player_stats: HashMap::new(),
            timer: TimerState::paused(60),
            waiting_for_player: true,
            showing_round_intro: true,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn player(id: &str, team: TeamId) -> Player {
        Player {
            id: id.to_string(),
            display_name: id.to_string(),
            team,
            score: 0,
            characters_submitted: false,
        }
    }

    #[test]
    fn test_displayed_character_skips_blocked() {
        let mut state = bare_state();
        state.round_characters = vec!["A".into(), "B".into(), "C".into()];
        state.blocked_characters = vec!["A".into()];
        state.current_character_index = 0;

        assert_eq!(state.displayed_character(), Some("B"));

        state.current_character_index = 3; // wraps modulo the 2 available
        assert_eq!(state.displayed_character(), Some("C"));
    }

    #[test]
    fn test_displayed_character_empty_available() {
        let mut state = bare_state();
        state.round_characters = vec!["A".into()];
        state.blocked_characters = vec!["A".into()];
        assert_eq!(state.displayed_character(), None);
    }

    #[test]
    fn test_team_total_sums_rounds() {
        let mut state = bare_state();
        state.round_scores[0].insert(1, 2);
        state.round_scores[1].insert(1, 3);
        state.round_scores[2].insert(2, 5);

        assert_eq!(state.team_total(1), 5);
        assert_eq!(state.team_total(2), 5);
        assert_eq!(state.team_total(3), 0);
    }

    #[test]
    fn test_mvp_requires_hits_and_breaks_ties_by_join_order() {
        let mut state = bare_state();
        state.players = vec![player("p1", 1), player("p2", 2), player("p3", 1)];

        assert!(state.mvp().is_none());

        state
            .player_stats
            .insert("p2".to_string(), PlayerStats { hits: 2, fails: 0 });
        state
            .player_stats
            .insert("p3".to_string(), PlayerStats { hits: 2, fails: 1 });

        // p2 and p3 are tied; p2 joined earlier
        assert_eq!(state.mvp().unwrap().id, "p2");
    }

    #[test]
    fn test_pairs_team_count_derives_from_player_count() {
        let mut state = bare_state();
        state.config.mode = GameMode::Pairs;
        state.players = vec![
            player("p1", 1),
            player("p2", 1),
            player("p3", 2),
            player("p4", 2),
        ];
        assert_eq!(state.team_count(), 2);

        state.players.push(player("p5", 3));
        state.players.push(player("p6", 3));
        assert_eq!(state.team_count(), 3);
    }
}
