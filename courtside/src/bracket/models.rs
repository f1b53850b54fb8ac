//! Bracket plan: the match graph produced before anything is persisted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tournament::models::{
    BracketSide, CategoryId, Match, MatchId, MatchSlot, MatchStatus, ParticipantId, TournamentId,
};

/// Bracket generation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("need at least {needed} participants, have {actual}")]
    TooFewParticipants { needed: usize, actual: usize },

    #[error("at least one court is required to pack round-robin rounds")]
    NoCourts,

    #[error("participant {0} appears more than once")]
    DuplicateParticipant(ParticipantId),
}

pub type BracketResult<T> = Result<T, BracketError>;

/// Index of a match inside a [`BracketPlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey(pub usize);

/// A participant with its seed (1 = strongest)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeededEntry {
    pub participant_id: ParticipantId,
    pub seed: u32,
    pub rating: f64,
}

/// A match in the plan; pointers are keys into the same plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMatch {
    pub key: MatchKey,
    pub bracket: BracketSide,
    pub round: u32,
    pub match_number: u32,
    pub team1: MatchSlot,
    pub team2: MatchSlot,
    pub status: MatchStatus,
    pub winner: Option<ParticipantId>,
    pub winner_to: Option<MatchKey>,
    pub loser_to: Option<MatchKey>,
}

impl PlannedMatch {
    pub fn new(key: MatchKey, bracket: BracketSide, round: u32, match_number: u32) -> Self {
        Self {
            key,
            bracket,
            round,
            match_number,
            team1: MatchSlot::Tbd,
            team2: MatchSlot::Tbd,
            status: MatchStatus::Scheduled,
            winner: None,
            winner_to: None,
            loser_to: None,
        }
    }

    pub fn has_bye(&self) -> bool {
        self.team1.is_bye() || self.team2.is_bye()
    }
}

/// Generated match graph for one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPlan {
    /// Rounds in the main draw (round-robin: packed rounds)
    pub main_rounds: u32,
    /// Highest round number across all sides
    pub total_rounds: u32,
    pub matches: Vec<PlannedMatch>,
}

impl BracketPlan {
    pub fn get(&self, key: MatchKey) -> Option<&PlannedMatch> {
        self.matches.get(key.0)
    }

    pub fn get_mut(&mut self, key: MatchKey) -> Option<&mut PlannedMatch> {
        self.matches.get_mut(key.0)
    }

    /// Append a blank match and return its key
    pub fn push(&mut self, bracket: BracketSide, round: u32, match_number: u32) -> MatchKey {
        let key = MatchKey(self.matches.len());
        self.matches
            .push(PlannedMatch::new(key, bracket, round, match_number));
        key
    }

    pub fn round(&self, bracket: BracketSide, round: u32) -> impl Iterator<Item = &PlannedMatch> {
        self.matches
            .iter()
            .filter(move |m| m.bracket == bracket && m.round == round)
    }

    /// Matches that will actually be played (no BYE involved)
    pub fn playable(&self) -> impl Iterator<Item = &PlannedMatch> {
        self.matches.iter().filter(|m| !m.has_bye())
    }

    pub fn bye_count(&self) -> usize {
        self.matches
            .iter()
            .map(|m| usize::from(m.team1.is_bye()) + usize::from(m.team2.is_bye()))
            .sum()
    }

    /// Persisted form of the plan once every key has an id.
    ///
    /// `ids[k]` is the id given to the match with key `k`; pointers are
    /// rewritten to ids. Returns `None` if `ids` does not cover the plan.
    pub fn to_matches(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
        ids: &[MatchId],
    ) -> Option<Vec<Match>> {
        if ids.len() != self.matches.len() {
            return None;
        }
        let id_of = |key: Option<MatchKey>| key.and_then(|k| ids.get(k.0).copied());

        Some(
            self.matches
                .iter()
                .map(|m| Match {
                    id: ids[m.key.0],
                    tournament_id,
                    category_id,
                    bracket: m.bracket,
                    round: m.round,
                    match_number: m.match_number,
                    team1: m.team1,
                    team2: m.team2,
                    status: m.status,
                    assignment: None,
                    team1_score: None,
                    team2_score: None,
                    winner: m.winner,
                    winner_advances_to: id_of(m.winner_to),
                    loser_advances_to: id_of(m.loser_to),
                })
                .collect(),
        )
    }

    /// Write a participant into the first open slot of `key`.
    ///
    /// A participant landing opposite a BYE wins by walkover and moves on
    /// immediately.
    pub(crate) fn place(&mut self, key: MatchKey, participant: ParticipantId) {
        let Some(target) = self.get_mut(key) else {
            return;
        };
        if target.team1.is_tbd() {
            target.team1 = MatchSlot::Participant(participant);
        } else if target.team2.is_tbd() {
            target.team2 = MatchSlot::Participant(participant);
        } else {
            log::warn!("bracket plan: both slots of match {key:?} already filled");
            return;
        }

        if target.has_bye() && target.status == MatchStatus::Scheduled {
            target.status = MatchStatus::Walkover;
            target.winner = Some(participant);
            if let Some(next) = target.winner_to {
                self.place(next, participant);
            }
        }
    }
}
