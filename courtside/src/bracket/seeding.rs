//! Seed assignment from registration rating snapshots.

use super::models::SeededEntry;
use crate::tournament::models::Participant;

/// Rank participants by frozen rating, strongest first.
///
/// Ties go to the earlier registration, then the lower id, so the order is
/// stable across regenerations.
pub fn seed_participants(participants: &[Participant]) -> Vec<SeededEntry> {
    let mut ranked: Vec<&Participant> = participants.iter().collect();
    ranked.sort_by(|a, b| {
        b.elo_at_registration
            .total_cmp(&a.elo_at_registration)
            .then(a.registered_at.cmp(&b.registered_at))
            .then(a.id.cmp(&b.id))
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(rank, p)| SeededEntry {
            participant_id: p.id,
            seed: rank as u32 + 1,
            rating: p.elo_at_registration,
        })
        .collect()
}
