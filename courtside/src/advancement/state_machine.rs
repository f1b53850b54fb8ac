//! Match lifecycle transitions and winner/loser propagation.
//!
//! Every operation validates the whole request before touching the arena, so
//! a rejected call leaves it unchanged. Successful calls return the ids of
//! every match they modified, which the caller persists in one transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::arena::MatchArena;
use crate::tournament::models::{MatchId, MatchSlot, MatchStatus, ParticipantId};

/// Match advancement errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdvancementError {
    #[error("Match not found: {0}")]
    NotFound(MatchId),

    #[error("Match {match_id} is already {status:?}")]
    AlreadyFinished {
        match_id: MatchId,
        status: MatchStatus,
    },

    #[error("Match {0} is still waiting for a participant")]
    MissingParticipant(MatchId),

    #[error("Participant {participant_id} is not playing match {match_id}")]
    NotAParticipant {
        match_id: MatchId,
        participant_id: ParticipantId,
    },

    #[error("Match {0} feeds a later round and cannot end in a draw")]
    DrawNotAllowed(MatchId),

    #[error("Match {match_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        match_id: MatchId,
        from: MatchStatus,
        to: MatchStatus,
    },
}

pub type AdvancementResult<T> = Result<T, AdvancementError>;

/// Final score of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub team1_score: u32,
    pub team2_score: u32,
}

impl MatchResult {
    pub fn new(team1_score: u32, team2_score: u32) -> Self {
        Self {
            team1_score,
            team2_score,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.team1_score == self.team2_score
    }
}

/// Two participants whose ratings the result should move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedPair {
    pub team1: ParticipantId,
    pub team2: ParticipantId,
    pub team1_score: u32,
    pub team2_score: u32,
}

/// What a transition changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advancement {
    /// Modified matches, the triggering match first
    pub changed: Vec<MatchId>,
    pub winner: Option<ParticipantId>,
    /// Present only for played results (never walkovers)
    pub rated_pair: Option<RatedPair>,
}

impl Advancement {
    fn touch(&mut self, id: MatchId) {
        if !self.changed.contains(&id) {
            self.changed.push(id);
        }
    }
}

fn ensure_open(arena: &MatchArena, match_id: MatchId) -> AdvancementResult<()> {
    let m = arena
        .get(match_id)
        .ok_or(AdvancementError::NotFound(match_id))?;
    if m.status.is_terminal() {
        return Err(AdvancementError::AlreadyFinished {
            match_id,
            status: m.status,
        });
    }
    Ok(())
}

/// SCHEDULED -> IN_PROGRESS
pub fn start(arena: &mut MatchArena, match_id: MatchId) -> AdvancementResult<Advancement> {
    ensure_open(arena, match_id)?;
    let m = arena
        .get_mut(match_id)
        .ok_or(AdvancementError::NotFound(match_id))?;

    if m.status != MatchStatus::Scheduled {
        return Err(AdvancementError::InvalidTransition {
            match_id,
            from: m.status,
            to: MatchStatus::InProgress,
        });
    }
    if !m.is_resolved() {
        return Err(AdvancementError::MissingParticipant(match_id));
    }

    m.status = MatchStatus::InProgress;
    Ok(Advancement {
        changed: vec![match_id],
        ..Default::default()
    })
}

/// Record a played result and move the winner (and loser, when the match
/// feeds a losers draw) forward.
pub fn complete(
    arena: &mut MatchArena,
    match_id: MatchId,
    result: MatchResult,
) -> AdvancementResult<Advancement> {
    ensure_open(arena, match_id)?;
    let m = arena
        .get(match_id)
        .ok_or(AdvancementError::NotFound(match_id))?;
    let (team1, team2) = m
        .participants()
        .ok_or(AdvancementError::MissingParticipant(match_id))?;
    if result.is_draw() && m.has_successor() {
        return Err(AdvancementError::DrawNotAllowed(match_id));
    }

    let (winner, loser) = match result.team1_score.cmp(&result.team2_score) {
        std::cmp::Ordering::Greater => (Some(team1), Some(team2)),
        std::cmp::Ordering::Less => (Some(team2), Some(team1)),
        std::cmp::Ordering::Equal => (None, None),
    };

    let mut outcome = Advancement {
        winner,
        rated_pair: Some(RatedPair {
            team1,
            team2,
            team1_score: result.team1_score,
            team2_score: result.team2_score,
        }),
        ..Default::default()
    };

    let (winner_to, loser_to) = {
        let m = arena
            .get_mut(match_id)
            .ok_or(AdvancementError::NotFound(match_id))?;
        m.status = MatchStatus::Completed;
        m.team1_score = Some(result.team1_score);
        m.team2_score = Some(result.team2_score);
        m.winner = winner;
        (m.winner_advances_to, m.loser_advances_to)
    };
    outcome.touch(match_id);

    forward(arena, winner_to, winner, &mut outcome);
    forward(arena, loser_to, loser, &mut outcome);

    Ok(outcome)
}

/// Award the match without play. No rating change.
pub fn walkover(
    arena: &mut MatchArena,
    match_id: MatchId,
    winner: ParticipantId,
) -> AdvancementResult<Advancement> {
    ensure_open(arena, match_id)?;
    let m = arena
        .get(match_id)
        .ok_or(AdvancementError::NotFound(match_id))?;
    if !m.is_resolved() {
        return Err(AdvancementError::MissingParticipant(match_id));
    }

    let loser = match (m.team1, m.team2) {
        (MatchSlot::Participant(a), other) if a == winner => other.participant(),
        (other, MatchSlot::Participant(b)) if b == winner => other.participant(),
        _ => {
            return Err(AdvancementError::NotAParticipant {
                match_id,
                participant_id: winner,
            });
        }
    };

    let (winner_to, loser_to) = {
        let m = arena
            .get_mut(match_id)
            .ok_or(AdvancementError::NotFound(match_id))?;
        m.status = MatchStatus::Walkover;
        m.winner = Some(winner);
        (m.winner_advances_to, m.loser_advances_to)
    };

    let mut outcome = Advancement {
        winner: Some(winner),
        ..Default::default()
    };
    outcome.touch(match_id);
    forward(arena, winner_to, Some(winner), &mut outcome);
    forward(arena, loser_to, loser, &mut outcome);

    Ok(outcome)
}

/// Any open match -> CANCELLED
pub fn cancel(arena: &mut MatchArena, match_id: MatchId) -> AdvancementResult<Advancement> {
    ensure_open(arena, match_id)?;
    let m = arena
        .get_mut(match_id)
        .ok_or(AdvancementError::NotFound(match_id))?;
    m.status = MatchStatus::Cancelled;
    Ok(Advancement {
        changed: vec![match_id],
        ..Default::default()
    })
}

fn forward(
    arena: &mut MatchArena,
    target: Option<MatchId>,
    participant: Option<ParticipantId>,
    outcome: &mut Advancement,
) {
    if let (Some(target), Some(participant)) = (target, participant) {
        place(arena, target, participant, outcome);
    }
}

/// Write `participant` into the first open slot of `target`, team1 first.
///
/// Both slots already filled, or a target that is already decided, means the
/// advancement has nowhere to go; that is logged and ignored. Landing
/// opposite a BYE wins the match by walkover and keeps going.
fn place(
    arena: &mut MatchArena,
    target: MatchId,
    participant: ParticipantId,
    outcome: &mut Advancement,
) {
    let Some(next) = arena.get_mut(target) else {
        log::warn!("advancement target {target} is not in this bracket");
        return;
    };
    if next.status.is_terminal() {
        log::warn!(
            "match {target} is already {:?}, dropping advancement of {participant}",
            next.status
        );
        return;
    }

    if next.team1.is_tbd() {
        next.team1 = MatchSlot::Participant(participant);
    } else if next.team2.is_tbd() {
        next.team2 = MatchSlot::Participant(participant);
    } else {
        log::warn!(
            "match {target} already has both participants, dropping advancement of {participant}"
        );
        return;
    }
    outcome.touch(target);

    let bye = next.team1.is_bye() || next.team2.is_bye();
    if bye && next.status == MatchStatus::Scheduled {
        next.status = MatchStatus::Walkover;
        next.winner = Some(participant);
        let onward = next.winner_advances_to;
        forward(arena, onward, Some(participant), outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{BracketSide, Match};

    fn blank(id: MatchId, round: u32, number: u32) -> Match {
        Match {
            id,
            tournament_id: 1,
            category_id: 1,
            bracket: BracketSide::Main,
            round,
            match_number: number,
            team1: MatchSlot::Tbd,
            team2: MatchSlot::Tbd,
            status: MatchStatus::Scheduled,
            assignment: None,
            team1_score: None,
            team2_score: None,
            winner: None,
            winner_advances_to: None,
            loser_advances_to: None,
        }
    }

    /// Four-team knockout: 101 (1v4), 102 (2v3) feed final 103
    fn four_team_bracket() -> MatchArena {
        let mut semi_1 = blank(101, 1, 1);
        semi_1.team1 = MatchSlot::Participant(1);
        semi_1.team2 = MatchSlot::Participant(4);
        semi_1.winner_advances_to = Some(103);

        let mut semi_2 = blank(102, 1, 2);
        semi_2.team1 = MatchSlot::Participant(2);
        semi_2.team2 = MatchSlot::Participant(3);
        semi_2.winner_advances_to = Some(103);

        MatchArena::new(vec![semi_1, semi_2, blank(103, 2, 1)])
    }

    #[test]
    fn test_complete_advances_winner_to_first_empty_slot() {
        let mut arena = four_team_bracket();

        let outcome = complete(&mut arena, 102, MatchResult::new(6, 3)).unwrap();
        assert_eq!(outcome.winner, Some(2));
        assert_eq!(outcome.changed, vec![102, 103]);
        assert_eq!(arena.get(103).unwrap().team1, MatchSlot::Participant(2));

        complete(&mut arena, 101, MatchResult::new(2, 6)).unwrap();
        let final_match = arena.get(103).unwrap();
        assert_eq!(final_match.team2, MatchSlot::Participant(4));
        assert!(final_match.is_resolved());
    }

    #[test]
    fn test_complete_reports_rated_pair() {
        let mut arena = four_team_bracket();
        let outcome = complete(&mut arena, 101, MatchResult::new(6, 4)).unwrap();
        assert_eq!(
            outcome.rated_pair,
            Some(RatedPair {
                team1: 1,
                team2: 4,
                team1_score: 6,
                team2_score: 4
            })
        );
        let m = arena.get(101).unwrap();
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.team1_score, Some(6));
        assert_eq!(m.winner, Some(1));
    }

    #[test]
    fn test_completing_twice_is_rejected_without_changes() {
        let mut arena = four_team_bracket();
        complete(&mut arena, 101, MatchResult::new(6, 4)).unwrap();
        let before = arena.get(103).cloned();

        let err = complete(&mut arena, 101, MatchResult::new(0, 6)).unwrap_err();
        assert_eq!(
            err,
            AdvancementError::AlreadyFinished {
                match_id: 101,
                status: MatchStatus::Completed
            }
        );
        assert_eq!(arena.get(103).cloned(), before);
        assert_eq!(arena.get(101).unwrap().winner, Some(1));
    }

    #[test]
    fn test_missing_participant_rejected() {
        let mut arena = four_team_bracket();
        assert_eq!(
            complete(&mut arena, 103, MatchResult::new(6, 0)),
            Err(AdvancementError::MissingParticipant(103))
        );
        assert_eq!(arena.get(103).unwrap().status, MatchStatus::Scheduled);
    }

    #[test]
    fn test_draw_rejected_when_match_feeds_forward() {
        let mut arena = four_team_bracket();
        assert_eq!(
            complete(&mut arena, 101, MatchResult::new(5, 5)),
            Err(AdvancementError::DrawNotAllowed(101))
        );
    }

    #[test]
    fn test_draw_allowed_in_round_robin() {
        let mut game = blank(1, 1, 1);
        game.team1 = MatchSlot::Participant(10);
        game.team2 = MatchSlot::Participant(20);
        let mut arena = MatchArena::new(vec![game]);

        let outcome = complete(&mut arena, 1, MatchResult::new(4, 4)).unwrap();
        assert_eq!(outcome.winner, None);
        assert!(outcome.rated_pair.is_some());
        assert_eq!(arena.get(1).unwrap().status, MatchStatus::Completed);
    }

    #[test]
    fn test_full_successor_is_a_no_op() {
        let mut arena = four_team_bracket();
        {
            let final_match = arena.get_mut(103).unwrap();
            final_match.team1 = MatchSlot::Participant(7);
            final_match.team2 = MatchSlot::Participant(8);
        }
        let outcome = complete(&mut arena, 101, MatchResult::new(6, 1)).unwrap();
        assert_eq!(outcome.changed, vec![101]);
        assert_eq!(arena.get(103).unwrap().team1, MatchSlot::Participant(7));
    }

    #[test]
    fn test_start_then_complete() {
        let mut arena = four_team_bracket();
        start(&mut arena, 101).unwrap();
        assert_eq!(arena.get(101).unwrap().status, MatchStatus::InProgress);
        assert!(matches!(
            start(&mut arena, 101),
            Err(AdvancementError::InvalidTransition { .. })
        ));
        complete(&mut arena, 101, MatchResult::new(6, 2)).unwrap();
    }

    #[test]
    fn test_start_requires_both_participants() {
        let mut arena = four_team_bracket();
        assert_eq!(
            start(&mut arena, 103),
            Err(AdvancementError::MissingParticipant(103))
        );
    }

    #[test]
    fn test_walkover_advances_without_rating() {
        let mut arena = four_team_bracket();
        let outcome = walkover(&mut arena, 101, 4).unwrap();
        assert_eq!(outcome.rated_pair, None);
        assert_eq!(arena.get(101).unwrap().status, MatchStatus::Walkover);
        assert_eq!(arena.get(103).unwrap().team1, MatchSlot::Participant(4));

        assert_eq!(
            walkover(&mut arena, 102, 9),
            Err(AdvancementError::NotAParticipant {
                match_id: 102,
                participant_id: 9
            })
        );
    }

    #[test]
    fn test_walkover_needs_a_known_opponent() {
        let mut arena = four_team_bracket();
        complete(&mut arena, 101, MatchResult::new(6, 2)).unwrap();
        let before = arena.get(103).cloned();

        assert_eq!(
            walkover(&mut arena, 103, 1),
            Err(AdvancementError::MissingParticipant(103))
        );
        assert_eq!(arena.get(103).cloned(), before);
    }

    #[test]
    fn test_decided_successor_is_left_alone() {
        let mut arena = four_team_bracket();
        arena.get_mut(103).unwrap().status = MatchStatus::Cancelled;

        let outcome = complete(&mut arena, 101, MatchResult::new(6, 1)).unwrap();
        assert_eq!(outcome.changed, vec![101]);
        let final_match = arena.get(103).unwrap();
        assert_eq!(final_match.team1, MatchSlot::Tbd);
        assert_eq!(final_match.status, MatchStatus::Cancelled);
    }

    #[test]
    fn test_loser_drops_and_bye_cascades() {
        // 201 sends its loser to 202, which has a BYE and feeds 203
        let mut opener = blank(201, 1, 1);
        opener.team1 = MatchSlot::Participant(1);
        opener.team2 = MatchSlot::Participant(2);
        opener.loser_advances_to = Some(202);

        let mut losers = blank(202, 2, 1);
        losers.bracket = BracketSide::Losers;
        losers.team2 = MatchSlot::Bye;
        losers.winner_advances_to = Some(203);

        let mut grand_final = blank(203, 3, 1);
        grand_final.bracket = BracketSide::GrandFinal;

        let mut arena = MatchArena::new(vec![opener, losers, grand_final]);
        let outcome = complete(&mut arena, 201, MatchResult::new(6, 3)).unwrap();

        assert_eq!(outcome.changed, vec![201, 202, 203]);
        let losers = arena.get(202).unwrap();
        assert_eq!(losers.status, MatchStatus::Walkover);
        assert_eq!(losers.winner, Some(2));
        assert_eq!(arena.get(203).unwrap().team1, MatchSlot::Participant(2));
    }

    #[test]
    fn test_cancel() {
        let mut arena = four_team_bracket();
        cancel(&mut arena, 103).unwrap();
        assert_eq!(arena.get(103).unwrap().status, MatchStatus::Cancelled);
        assert!(cancel(&mut arena, 103).is_err());
        assert_eq!(cancel(&mut arena, 999), Err(AdvancementError::NotFound(999)));
    }
}
