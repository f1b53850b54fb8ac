//! Flat match table keyed by id.
//!
//! Forward pointers between matches are plain ids resolved through the
//! arena, so the match graph never owns references into itself.

use std::collections::HashMap;

use crate::tournament::models::{Match, MatchId};

#[derive(Debug, Clone, Default)]
pub struct MatchArena {
    matches: Vec<Match>,
    index: HashMap<MatchId, usize>,
}

impl MatchArena {
    pub fn new(matches: Vec<Match>) -> Self {
        let index = matches
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, i))
            .collect();
        Self { matches, index }
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.index.get(&id).map(|&i| &self.matches[i])
    }

    pub fn get_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.index.get(&id).map(|&i| &mut self.matches[i])
    }

    pub fn contains(&self, id: MatchId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Clone out the matches with the given ids, in the given order
    pub fn snapshot(&self, ids: &[MatchId]) -> Vec<Match> {
        ids.iter().filter_map(|id| self.get(*id).cloned()).collect()
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches
    }
}
