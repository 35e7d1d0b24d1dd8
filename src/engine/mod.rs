//! Pure turn/round progression engine.
//!
//! `transition` computes the next game snapshot from the current one and a
//! single event. It performs no I/O and never blocks; the room store and the
//! local session both drive it, which is what keeps the two hosts from
//! drifting apart behaviorally. Validation happens before any mutation, so a
//! rejected event leaves the input state untouched.

pub mod error;
pub mod rotation;
pub mod setup;

pub use error::EngineError;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::*;
use rotation::TurnRotation;

/// The five client-driven transition events plus the timer expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    StartGame,
    Hit { player_id: PlayerId },
    Fail { player_id: PlayerId },
    TimeUp,
    PlayerReady,
    RoundIntroSeen,
}

/// What a successful transition did, for host logging and broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started,
    /// Hit with characters remaining: the same player keeps going.
    TurnContinues,
    /// Fail or TimeUp handed the turn to the next team within the round.
    TurnPassed { to_team: TeamId },
    RoundAdvanced { round: u32 },
    GameFinished,
    /// PlayerReady or RoundIntroSeen acknowledged.
    Acknowledged,
}

/// Apply one event to a snapshot, producing the next snapshot.
///
/// Randomness (shuffles) is the only non-determinism; callers inject the RNG
/// so tests and the local session can seed it.
pub fn transition<R: Rng>(
    state: &GameState,
    event: &Event,
    rng: &mut R,
) -> Result<(GameState, Outcome), EngineError> {
    match event {
        Event::StartGame => apply_start(state, rng),
        Event::Hit { player_id } => apply_hit(state, player_id, rng),
        Event::Fail { player_id } => apply_fail(state, player_id, rng),
        Event::TimeUp => apply_time_up(state, rng),
        Event::PlayerReady => apply_ready(state),
        Event::RoundIntroSeen => apply_intro_seen(state),
    }
}

/// Common Hit/Fail preconditions: game in progress, turn not paused for an
/// acknowledgment, acting player on the current team.
fn ensure_turn_active(state: &GameState, player_id: &str) -> Result<(), EngineError> {
    if state.status != GameStatus::Playing {
        return Err(EngineError::invalid_state("game is not in progress"));
    }
    if state.waiting_for_player || state.showing_round_intro {
        return Err(EngineError::invalid_state("turn not active"));
    }
    let player = state
        .player(player_id)
        .ok_or_else(|| EngineError::validation("unknown player"))?;
    if player.team != state.current_team {
        return Err(EngineError::not_your_turn(format!(
            "team {} is up, not team {}",
            state.current_team, player.team
        )));
    }
    Ok(())
}

fn apply_start<R: Rng>(
    state: &GameState,
    rng: &mut R,
) -> Result<(GameState, Outcome), EngineError> {
    state.validate_start()?;

    let mut next = state.clone();
    next.character_pool.shuffle(rng);
    next.round_characters = next.character_pool.clone();
    next.blocked_characters.clear();
    next.current_round = 1;
    next.current_character_index = 0;
    next.turn_cursor = 0;
    next.current_team = 1;
    next.round_scores = vec![Default::default(); ROUND_COUNT as usize];
    for player in &mut next.players {
        player.score = 0;
    }
    for stats in next.player_stats.values_mut() {
        *stats = PlayerStats::default();
    }
    next.status = GameStatus::Playing;
    next.showing_round_intro = true;
    next.waiting_for_player = true;
    next.timer = TimerState::paused(next.config.time_per_round);
    Ok((next, Outcome::Started))
}

fn apply_hit<R: Rng>(
    state: &GameState,
    player_id: &str,
    rng: &mut R,
) -> Result<(GameState, Outcome), EngineError> {
    ensure_turn_active(state, player_id)?;
    let displayed = state
        .displayed_character()
        .ok_or_else(|| EngineError::invalid_state("no character available to guess"))?
        .to_string();

    let mut next = state.clone();
    let team = next.current_team;
    if let Some(player) = next.players.iter_mut().find(|p| p.id == player_id) {
        player.score += 1;
    }
    *next.round_scores[(next.current_round - 1) as usize]
        .entry(team)
        .or_insert(0) += 1;
    next.player_stats
        .entry(player_id.to_string())
        .or_default()
        .hits += 1;

    // Solved for the rest of this round; it stays in the game-long pool and
    // returns in later rounds.
    next.round_characters.retain(|c| c != &displayed);

    if next.round_characters.is_empty() {
        if next.current_round < ROUND_COUNT {
            advance_round(&mut next, rng);
            let round = next.current_round;
            Ok((next, Outcome::RoundAdvanced { round }))
        } else {
            finish(&mut next);
            Ok((next, Outcome::GameFinished))
        }
    } else {
        // Same player keeps playing; next character comes from the front of
        // the already-shuffled remainder.
        next.current_character_index = 0;
        Ok((next, Outcome::TurnContinues))
    }
}

fn apply_fail<R: Rng>(
    state: &GameState,
    player_id: &str,
    rng: &mut R,
) -> Result<(GameState, Outcome), EngineError> {
    ensure_turn_active(state, player_id)?;
    let displayed = state
        .displayed_character()
        .ok_or_else(|| EngineError::invalid_state("no character available to guess"))?
        .to_string();

    let mut next = state.clone();
    next.player_stats
        .entry(player_id.to_string())
        .or_default()
        .fails += 1;
    // Not removed from the round; it can reappear next turn.
    next.blocked_characters.push(displayed);

    let outcome = end_turn(&mut next, rng, false);
    Ok((next, outcome))
}

fn apply_time_up<R: Rng>(
    state: &GameState,
    rng: &mut R,
) -> Result<(GameState, Outcome), EngineError> {
    if state.status != GameStatus::Playing {
        return Err(EngineError::invalid_state("game is not in progress"));
    }
    if state.waiting_for_player || state.showing_round_intro {
        return Err(EngineError::invalid_state("turn not active"));
    }

    // An implicit fail for turn-ending purposes only: nobody's fail counter
    // moves and the displayed character is not blocked.
    let mut next = state.clone();
    let outcome = end_turn(&mut next, rng, true);
    Ok((next, outcome))
}

/// Shared Fail/TimeUp tail: round or game end when the closing team is up,
/// otherwise a within-round handoff to the next team.
fn end_turn<R: Rng>(next: &mut GameState, rng: &mut R, clear_blocked: bool) -> Outcome {
    let rotation = TurnRotation::new(next.team_count());
    if rotation.is_last_team(next.current_team) {
        if next.current_round < ROUND_COUNT {
            advance_round(next, rng);
            Outcome::RoundAdvanced {
                round: next.current_round,
            }
        } else {
            finish(next);
            Outcome::GameFinished
        }
    } else {
        advance_turn(next);
        if clear_blocked {
            next.blocked_characters.clear();
        }
        // Blocked cards otherwise stay blocked until the next player's ready
        // acknowledgment; the remainder is reshuffled so the next team does
        // not inherit a predictable order.
        next.round_characters.shuffle(rng);
        next.current_character_index = 0;
        next.waiting_for_player = true;
        next.timer = TimerState::paused(next.config.time_per_round);
        Outcome::TurnPassed {
            to_team: next.current_team,
        }
    }
}

fn apply_ready(state: &GameState) -> Result<(GameState, Outcome), EngineError> {
    if state.status != GameStatus::Playing {
        return Err(EngineError::invalid_state("game is not in progress"));
    }
    if !state.waiting_for_player {
        return Err(EngineError::invalid_state("no player acknowledgment pending"));
    }

    let mut next = state.clone();
    next.waiting_for_player = false;
    next.blocked_characters.clear();
    next.timer.time_left = next.config.time_per_round;
    next.timer.is_paused = false;
    Ok((next, Outcome::Acknowledged))
}

fn apply_intro_seen(state: &GameState) -> Result<(GameState, Outcome), EngineError> {
    if state.status != GameStatus::Playing {
        return Err(EngineError::invalid_state("game is not in progress"));
    }
    if !state.showing_round_intro {
        return Err(EngineError::invalid_state("no round intro is showing"));
    }

    let mut next = state.clone();
    next.showing_round_intro = false;
    Ok((next, Outcome::Acknowledged))
}

/// New round: next team in rotation opens it, fresh shuffle of the full
/// pool, intro screen up, timer refilled and paused.
fn advance_round<R: Rng>(next: &mut GameState, rng: &mut R) {
    next.current_round += 1;
    advance_turn(next);
    let mut fresh = next.character_pool.clone();
    fresh.shuffle(rng);
    next.round_characters = fresh;
    next.blocked_characters.clear();
    next.current_character_index = 0;
    next.showing_round_intro = true;
    next.waiting_for_player = true;
    next.timer = TimerState::paused(next.config.time_per_round);
}

fn advance_turn(next: &mut GameState) {
    next.turn_cursor += 1;
    let rotation = TurnRotation::new(next.team_count());
    next.current_team = rotation.team_for(next.turn_cursor);
}

fn finish(next: &mut GameState) {
    next.status = GameStatus::Finished;
    next.timer.is_paused = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Two teams, one player each, one character per player: the smallest
    /// playable game (pool of two).
    fn tiny_game() -> (GameState, PlayerId, PlayerId) {
        let config = GameConfig {
            characters_per_player: 1,
            ..GameConfig::default()
        };
        let mut state = GameState::new("ABC123".into(), config);
        let ana = state.add_player("Ana", Some(1)).unwrap();
        let bo = state.add_player("Bo", Some(2)).unwrap();
        state.submit_characters(&ana.id, &strings(&["A"])).unwrap();
        state.submit_characters(&bo.id, &strings(&["B"])).unwrap();
        (state, ana.id, bo.id)
    }

    fn started(state: &GameState) -> GameState {
        let (next, outcome) = transition(state, &Event::StartGame, &mut rng()).unwrap();
        assert_eq!(outcome, Outcome::Started);
        next
    }

    /// Clear the intro and waiting gates so hits/fails are accepted.
    fn live(state: &GameState) -> GameState {
        let (state, _) = transition(state, &Event::RoundIntroSeen, &mut rng()).unwrap();
        let (state, _) = transition(&state, &Event::PlayerReady, &mut rng()).unwrap();
        state
    }

    #[test]
    fn test_start_enters_round_one_paused() {
        let (state, _, _) = tiny_game();
        let playing = started(&state);

        assert_eq!(playing.status, GameStatus::Playing);
        assert_eq!(playing.current_round, 1);
        assert_eq!(playing.current_team, 1);
        assert_eq!(playing.round_characters.len(), 2);
        assert!(playing.blocked_characters.is_empty());
        assert!(playing.showing_round_intro);
        assert!(playing.waiting_for_player);
        assert!(playing.timer.is_paused);
        assert_eq!(playing.timer.time_left, 60);
    }

    #[test]
    fn test_start_rejected_twice() {
        let (state, _, _) = tiny_game();
        let playing = started(&state);
        let err = transition(&playing, &Event::StartGame, &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn test_hit_rejected_while_gated() {
        let (state, ana, _) = tiny_game();
        let playing = started(&state);

        // Both gates up.
        let err = transition(&playing, &Event::Hit { player_id: ana.clone() }, &mut rng())
            .unwrap_err();
        assert_eq!(err, EngineError::invalid_state("turn not active"));

        // Intro acknowledged but still waiting for the player.
        let (seen, _) = transition(&playing, &Event::RoundIntroSeen, &mut rng()).unwrap();
        let err = transition(&seen, &Event::Hit { player_id: ana }, &mut rng()).unwrap_err();
        assert_eq!(err, EngineError::invalid_state("turn not active"));
    }

    #[test]
    fn test_hit_rejected_for_wrong_team() {
        let (state, _, bo) = tiny_game();
        let playing = live(&started(&state));

        let err = transition(&playing, &Event::Hit { player_id: bo }, &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::NotYourTurn(_)));
    }

    #[test]
    fn test_hit_scores_and_consumes_character() {
        let (state, ana, _) = tiny_game();
        let playing = live(&started(&state));
        let displayed = playing.displayed_character().unwrap().to_string();

        let (next, outcome) =
            transition(&playing, &Event::Hit { player_id: ana.clone() }, &mut rng()).unwrap();

        assert_eq!(outcome, Outcome::TurnContinues);
        assert_eq!(next.round_characters.len(), 1);
        assert!(!next.round_characters.contains(&displayed));
        // Solved for the round, not for the game.
        assert!(next.character_pool.contains(&displayed));
        assert_eq!(next.player(&ana).unwrap().score, 1);
        assert_eq!(next.player_stats[&ana].hits, 1);
        assert_eq!(next.round_scores[0][&1], 1);
        // Turn did not end.
        assert_eq!(next.current_team, 1);
        assert!(!next.waiting_for_player);
    }

    #[test]
    fn test_round_exhaustion_advances_round_and_flips_team() {
        let (state, ana, _) = tiny_game();
        let playing = live(&started(&state));

        let (after_one, _) =
            transition(&playing, &Event::Hit { player_id: ana.clone() }, &mut rng()).unwrap();
        let (after_two, outcome) =
            transition(&after_one, &Event::Hit { player_id: ana.clone() }, &mut rng()).unwrap();

        assert_eq!(outcome, Outcome::RoundAdvanced { round: 2 });
        assert_eq!(after_two.current_round, 2);
        assert_eq!(after_two.current_team, 2);
        assert_eq!(after_two.round_characters.len(), 2);
        assert!(after_two.blocked_characters.is_empty());
        assert!(after_two.showing_round_intro);
        assert!(after_two.waiting_for_player);
        assert!(after_two.timer.is_paused);
        assert_eq!(after_two.current_character_index, 0);
        assert_eq!(after_two.round_scores[0][&1], 2);
    }

    #[test]
    fn test_fail_passes_turn_and_blocks_card() {
        let (state, ana, _) = tiny_game();
        let playing = live(&started(&state));
        let displayed = playing.displayed_character().unwrap().to_string();

        let (next, outcome) =
            transition(&playing, &Event::Fail { player_id: ana.clone() }, &mut rng()).unwrap();

        assert_eq!(outcome, Outcome::TurnPassed { to_team: 2 });
        // Round characters untouched, failed card only blocked.
        assert_eq!(next.round_characters.len(), 2);
        assert_eq!(next.blocked_characters, vec![displayed]);
        assert_eq!(next.player_stats[&ana].fails, 1);
        assert_eq!(next.current_team, 2);
        assert!(next.waiting_for_player);
        assert!(next.timer.is_paused);
        assert_eq!(next.timer.time_left, 60);

        // Ready clears the blocked card for the next player.
        let (ready, _) = transition(&next, &Event::PlayerReady, &mut rng()).unwrap();
        assert!(ready.blocked_characters.is_empty());
        assert!(!ready.timer.is_paused);
    }

    #[test]
    fn test_fail_by_closing_team_advances_round() {
        let (state, ana, bo) = tiny_game();
        let playing = live(&started(&state));

        let (handed, _) =
            transition(&playing, &Event::Fail { player_id: ana }, &mut rng()).unwrap();
        let (live2, _) = transition(&handed, &Event::PlayerReady, &mut rng()).unwrap();
        let (next, outcome) =
            transition(&live2, &Event::Fail { player_id: bo }, &mut rng()).unwrap();

        assert_eq!(outcome, Outcome::RoundAdvanced { round: 2 });
        assert_eq!(next.current_round, 2);
        // Cursor moved past the closing team; team 1 opens round two.
        assert_eq!(next.current_team, 1);
        assert_eq!(next.round_characters.len(), 2);
        assert!(next.blocked_characters.is_empty());
    }

    #[test]
    fn test_final_fail_of_round_three_finishes() {
        let (state, ana, bo) = tiny_game();
        let mut current = live(&started(&state));

        // Fail through rounds 1 and 2 (two turns each), then team 1's turn in
        // round 3.
        for _ in 0..2 {
            let (s, _) = transition(
                &current,
                &Event::Fail { player_id: ana.clone() },
                &mut rng(),
            )
            .unwrap();
            let (s, _) = transition(&s, &Event::PlayerReady, &mut rng()).unwrap();
            let (s, _) = transition(&s, &Event::Fail { player_id: bo.clone() }, &mut rng())
                .unwrap();
            current = live(&s);
        }
        assert_eq!(current.current_round, 3);

        let (s, _) = transition(&current, &Event::Fail { player_id: ana }, &mut rng()).unwrap();
        let (s, _) = transition(&s, &Event::PlayerReady, &mut rng()).unwrap();
        let (finished, outcome) =
            transition(&s, &Event::Fail { player_id: bo.clone() }, &mut rng()).unwrap();

        assert_eq!(outcome, Outcome::GameFinished);
        assert_eq!(finished.status, GameStatus::Finished);
        assert!(finished.timer.is_paused);

        // Immutable once finished: every further event is rejected.
        for event in [
            Event::Hit { player_id: bo.clone() },
            Event::Fail { player_id: bo },
            Event::TimeUp,
            Event::PlayerReady,
            Event::RoundIntroSeen,
            Event::StartGame,
        ] {
            let err = transition(&finished, &event, &mut rng()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidState(_)), "{event:?}");
        }
    }

    #[test]
    fn test_round_three_exhaustion_finishes() {
        let (state, ana, bo) = tiny_game();
        let mut current = live(&started(&state));
        let mut scorer = ana.clone();

        // Hit out all three rounds; the opener alternates with each advance.
        for round in 1..=3 {
            assert_eq!(current.current_round, round);
            let (s, _) = transition(
                &current,
                &Event::Hit { player_id: scorer.clone() },
                &mut rng(),
            )
            .unwrap();
            let (s, outcome) =
                transition(&s, &Event::Hit { player_id: scorer.clone() }, &mut rng()).unwrap();
            if round < 3 {
                assert_eq!(outcome, Outcome::RoundAdvanced { round: round + 1 });
                scorer = if scorer == ana { bo.clone() } else { ana.clone() };
                current = live(&s);
            } else {
                assert_eq!(outcome, Outcome::GameFinished);
                current = s;
            }
        }

        assert_eq!(current.status, GameStatus::Finished);
        // Ana opened rounds 1 and 3, Bo round 2.
        assert_eq!(current.player_stats[&ana].hits, 4);
        assert_eq!(current.player_stats[&bo].hits, 2);
        assert_eq!(current.team_total(1), 4);
        assert_eq!(current.team_total(2), 2);
        assert_eq!(current.mvp().unwrap().id, ana);
    }

    #[test]
    fn test_time_up_ends_turn_without_penalty() {
        let (state, ana, _) = tiny_game();
        let playing = live(&started(&state));

        // Put one fail on the books first so the counter assertion below
        // proves TimeUp adds nothing on top.
        let (failed, _) =
            transition(&playing, &Event::Fail { player_id: ana.clone() }, &mut rng()).unwrap();
        let (live2, _) = transition(&failed, &Event::PlayerReady, &mut rng()).unwrap();

        // Team 2 is the closing team, so TimeUp advances the round.
        let (next, outcome) = transition(&live2, &Event::TimeUp, &mut rng()).unwrap();
        assert_eq!(outcome, Outcome::RoundAdvanced { round: 2 });
        assert_eq!(next.player_stats[&ana].fails, 1);
        assert_eq!(
            next.player_stats.values().map(|s| s.fails).sum::<u32>(),
            1,
            "TimeUp must not add fail counts"
        );
    }

    #[test]
    fn test_time_up_mid_round_clears_blocked() {
        // Three characters so team 1's turn can time out mid-round.
        let config = GameConfig {
            characters_per_player: 2,
            ..GameConfig::default()
        };
        let mut state = GameState::new("ABC123".into(), config);
        let ana = state.add_player("Ana", Some(1)).unwrap();
        let bo = state.add_player("Bo", Some(2)).unwrap();
        state
            .submit_characters(&ana.id, &strings(&["A", "B"]))
            .unwrap();
        state
            .submit_characters(&bo.id, &strings(&["C", "D"]))
            .unwrap();
        let playing = live(&started(&state));

        let (next, outcome) = transition(&playing, &Event::TimeUp, &mut rng()).unwrap();
        assert_eq!(outcome, Outcome::TurnPassed { to_team: 2 });
        assert!(next.blocked_characters.is_empty());
        assert!(next.waiting_for_player);
        assert!(next.timer.is_paused);
        assert_eq!(next.round_characters.len(), 4);

        // While gated, TimeUp is not accepted again.
        let err = transition(&next, &Event::TimeUp, &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn test_ready_only_legal_when_pending() {
        let (state, _, _) = tiny_game();
        let playing = live(&started(&state));

        let err = transition(&playing, &Event::PlayerReady, &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn test_intro_seen_clears_only_the_intro() {
        let (state, _, _) = tiny_game();
        let playing = started(&state);

        let (seen, _) = transition(&playing, &Event::RoundIntroSeen, &mut rng()).unwrap();
        assert!(!seen.showing_round_intro);
        // Timer pause and the ready gate are untouched.
        assert!(seen.waiting_for_player);
        assert!(seen.timer.is_paused);

        let err = transition(&seen, &Event::RoundIntroSeen, &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn test_rejected_event_leaves_state_untouched() {
        let (state, _, bo) = tiny_game();
        let playing = live(&started(&state));
        let before = serde_json::to_value(&playing).unwrap();

        let _ = transition(&playing, &Event::Hit { player_id: bo }, &mut rng()).unwrap_err();
        let _ = transition(&playing, &Event::PlayerReady, &mut rng()).unwrap_err();

        assert_eq!(serde_json::to_value(&playing).unwrap(), before);
    }

    #[test]
    fn test_invariants_hold_across_a_scripted_game() {
        let (state, ana, bo) = tiny_game();
        let mut current = started(&state);
        let script = [
            Event::RoundIntroSeen,
            Event::PlayerReady,
            Event::Hit { player_id: ana.clone() },
            Event::Fail { player_id: ana.clone() },
            Event::PlayerReady,
            Event::Fail { player_id: bo.clone() }, // closes round 1
            Event::RoundIntroSeen,
            Event::PlayerReady,
            Event::Hit { player_id: ana.clone() },
            Event::Hit { player_id: ana.clone() }, // exhausts round 2
            Event::RoundIntroSeen,
            Event::PlayerReady,
            Event::Fail { player_id: bo.clone() }, // closing team, round 3: finished
        ];

        let mut statuses = vec![current.status];
        for event in script {
            let (next, _) = transition(&current, &event, &mut rng()).unwrap();
            // Blocked-set containment after every transition.
            for blocked in &next.blocked_characters {
                assert!(next.round_characters.contains(blocked));
            }
            for c in &next.round_characters {
                assert!(next.character_pool.contains(c));
            }
            assert_eq!(
                next.current_team,
                TurnRotation::new(next.team_count()).team_for(next.turn_cursor)
            );
            statuses.push(next.status);
            current = next;
        }

        assert_eq!(current.status, GameStatus::Finished);
        // Monotonic status: never finished -> playing or playing -> waiting.
        for pair in statuses.windows(2) {
            let order = |s: GameStatus| match s {
                GameStatus::Waiting => 0,
                GameStatus::Playing => 1,
                GameStatus::Finished => 2,
            };
            assert!(order(pair[0]) <= order(pair[1]));
        }

        // Score conservation: per-team round scores equal per-team player hits.
        for team in 1..=2 {
            let from_rounds = current.team_total(team);
            let from_stats: u32 = current
                .players
                .iter()
                .filter(|p| p.team == team)
                .map(|p| current.player_stats[&p.id].hits)
                .sum();
            assert_eq!(from_rounds, from_stats);
        }
    }
}
