//! Per-format bracket generation.
//!
//! [`BracketGenerator`] is a closed set of formats; each variant wraps a
//! generator struct and calls are dispatched through [`GenerateBracket`].

use enum_dispatch::enum_dispatch;
use std::collections::{HashSet, VecDeque};

use super::models::{BracketError, BracketPlan, BracketResult, MatchKey, SeededEntry};
use crate::tournament::models::{
    BracketSide, MatchSlot, MatchStatus, ParticipantId, TournamentFormat,
};

/// Build a match graph from participants already sorted by seed
#[enum_dispatch]
pub trait GenerateBracket {
    fn generate(&self, seeded: &[SeededEntry]) -> BracketResult<BracketPlan>;
}

/// Knockout: lose once and you are out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleElimination;

/// Main draw plus a losers draw for first-round losers, joined by a grand
/// final. A simplified split, not the canonical double-elimination layout:
/// losers of later main rounds are eliminated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoubleElimination;

/// Everyone plays everyone once, packed into rounds by court count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRobin {
    pub courts_available: usize,
}

#[enum_dispatch(GenerateBracket)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketGenerator {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl BracketGenerator {
    pub fn for_format(format: TournamentFormat, courts_available: usize) -> Self {
        match format {
            TournamentFormat::SingleElimination => SingleElimination.into(),
            TournamentFormat::DoubleElimination => DoubleElimination.into(),
            TournamentFormat::Americano | TournamentFormat::FixedAmericano => {
                RoundRobin { courts_available }.into()
            }
        }
    }
}

/// Rounds needed for `participant_count` in a knockout draw
pub fn elimination_rounds(participant_count: usize) -> u32 {
    participant_count.max(1).next_power_of_two().trailing_zeros()
}

/// Seeds in draw order for a bracket of `size` (a power of two).
///
/// Adjacent pairs are `(i, size + 1 - i)` and the top two seeds sit in
/// opposite halves: `[1, 8, 4, 5, 2, 7, 3, 6]` for eight.
pub fn draw_order(size: usize) -> Vec<usize> {
    let mut order = vec![1];
    let mut width = 1;
    while width < size {
        width *= 2;
        order = order
            .into_iter()
            .flat_map(|seed| [seed, width + 1 - seed])
            .collect();
    }
    order
}

fn check_unique(seeded: &[SeededEntry]) -> BracketResult<()> {
    let mut seen = HashSet::new();
    for entry in seeded {
        if !seen.insert(entry.participant_id) {
            return Err(BracketError::DuplicateParticipant(entry.participant_id));
        }
    }
    Ok(())
}

/// Lay out a knockout tree for `slots` (seed order; `None` is a BYE).
///
/// Returns the keys of each round, first round first. Round numbers start at
/// `first_round`.
fn build_knockout(
    plan: &mut BracketPlan,
    bracket: BracketSide,
    first_round: u32,
    entrants: &[Option<ParticipantId>],
) -> Vec<Vec<MatchKey>> {
    let size = entrants.len().max(2).next_power_of_two();
    let order = draw_order(size);
    let rounds = size.trailing_zeros();

    let mut keys: Vec<Vec<MatchKey>> = Vec::with_capacity(rounds as usize);
    for r in 0..rounds {
        let count = size >> (r + 1);
        let round_keys = (0..count)
            .map(|j| plan.push(bracket, first_round + r, j as u32 + 1))
            .collect();
        keys.push(round_keys);
    }

    for r in 0..keys.len().saturating_sub(1) {
        for (j, &key) in keys[r].iter().enumerate() {
            let next = keys[r + 1][j / 2];
            if let Some(m) = plan.get_mut(key) {
                m.winner_to = Some(next);
            }
        }
    }

    let slot_for = |seed: usize| -> MatchSlot {
        match entrants.get(seed - 1).copied().flatten() {
            Some(id) => MatchSlot::Participant(id),
            None => MatchSlot::Bye,
        }
    };

    for (j, &key) in keys[0].iter().enumerate() {
        if let Some(m) = plan.get_mut(key) {
            m.team1 = slot_for(order[2 * j]);
            m.team2 = slot_for(order[2 * j + 1]);
        }
    }

    keys
}

/// Walk first-round BYEs forward
fn resolve_byes(plan: &mut BracketPlan, first_round: &[MatchKey]) {
    for &key in first_round {
        let Some(m) = plan.get_mut(key) else {
            continue;
        };
        let lone = match (m.team1, m.team2) {
            (MatchSlot::Participant(id), MatchSlot::Bye)
            | (MatchSlot::Bye, MatchSlot::Participant(id)) => id,
            _ => continue,
        };
        m.status = MatchStatus::Walkover;
        m.winner = Some(lone);
        if let Some(next) = m.winner_to {
            plan.place(next, lone);
        }
    }
}

impl GenerateBracket for SingleElimination {
    fn generate(&self, seeded: &[SeededEntry]) -> BracketResult<BracketPlan> {
        if seeded.len() < 2 {
            return Err(BracketError::TooFewParticipants {
                needed: 2,
                actual: seeded.len(),
            });
        }
        check_unique(seeded)?;

        let entrants: Vec<_> = seeded.iter().map(|e| Some(e.participant_id)).collect();
        let mut plan = BracketPlan::default();
        let keys = build_knockout(&mut plan, BracketSide::Main, 1, &entrants);
        resolve_byes(&mut plan, &keys[0]);

        plan.main_rounds = keys.len() as u32;
        plan.total_rounds = plan.main_rounds;
        Ok(plan)
    }
}

impl GenerateBracket for DoubleElimination {
    fn generate(&self, seeded: &[SeededEntry]) -> BracketResult<BracketPlan> {
        if seeded.len() < 2 {
            return Err(BracketError::TooFewParticipants {
                needed: 2,
                actual: seeded.len(),
            });
        }
        check_unique(seeded)?;

        let entrants: Vec<_> = seeded.iter().map(|e| Some(e.participant_id)).collect();
        let mut plan = BracketPlan::default();
        let main = build_knockout(&mut plan, BracketSide::Main, 1, &entrants);
        let main_rounds = main.len() as u32;

        // Only real first-round matches produce a loser
        let feeders: Vec<MatchKey> = main[0]
            .iter()
            .copied()
            .filter(|&k| plan.get(k).is_some_and(|m| !m.has_bye()))
            .collect();

        let mut losers_rounds = 0;
        let losers_champion_source: MatchKey;

        if feeders.len() >= 2 {
            let placeholders = vec![None; feeders.len()];
            let losers = build_knockout(
                &mut plan,
                BracketSide::Losers,
                main_rounds + 1,
                &placeholders,
            );
            losers_rounds = losers.len() as u32;

            // Every placeholder became a BYE; reopen the slots the feeders fill
            let order = draw_order(feeders.len().next_power_of_two());
            for (j, &key) in losers[0].iter().enumerate() {
                let top = order[2 * j];
                let bottom = order[2 * j + 1];
                if let Some(m) = plan.get_mut(key) {
                    m.team1 = MatchSlot::Tbd;
                    m.team2 = if bottom <= feeders.len() {
                        MatchSlot::Tbd
                    } else {
                        MatchSlot::Bye
                    };
                }
                for seed in [top, bottom] {
                    let feeder = feeders.get(seed - 1).and_then(|&k| plan.get_mut(k));
                    if let Some(m) = feeder {
                        m.loser_to = Some(key);
                    }
                }
            }
            losers_champion_source = match losers.last().and_then(|round| round.first()) {
                Some(&key) => key,
                None => feeders[0],
            };
        } else {
            losers_champion_source = feeders[0];
        }

        let final_round = main_rounds + losers_rounds + 1;
        let grand_final = plan.push(BracketSide::GrandFinal, final_round, 1);

        let main_final = main[main.len() - 1][0];
        if let Some(m) = plan.get_mut(main_final) {
            m.winner_to = Some(grand_final);
        }
        if let Some(m) = plan.get_mut(losers_champion_source) {
            if losers_rounds == 0 {
                m.loser_to = Some(grand_final);
            } else {
                m.winner_to = Some(grand_final);
            }
        }

        resolve_byes(&mut plan, &main[0]);

        plan.main_rounds = main_rounds;
        plan.total_rounds = final_round;
        Ok(plan)
    }
}

impl GenerateBracket for RoundRobin {
    fn generate(&self, seeded: &[SeededEntry]) -> BracketResult<BracketPlan> {
        if seeded.len() < 2 {
            return Err(BracketError::TooFewParticipants {
                needed: 2,
                actual: seeded.len(),
            });
        }
        if self.courts_available == 0 {
            return Err(BracketError::NoCourts);
        }
        check_unique(seeded)?;

        let mut queue: VecDeque<(ParticipantId, ParticipantId)> =
            circle_pairings(seeded.iter().map(|e| e.participant_id).collect()).into();

        let mut plan = BracketPlan::default();
        let mut round = 0;
        while !queue.is_empty() {
            round += 1;
            let mut busy = HashSet::new();
            let mut taken = 0;
            let mut deferred = VecDeque::with_capacity(queue.len());

            while let Some((a, b)) = queue.pop_front() {
                if taken < self.courts_available && !busy.contains(&a) && !busy.contains(&b) {
                    busy.insert(a);
                    busy.insert(b);
                    taken += 1;
                    let key = plan.push(BracketSide::Main, round, taken as u32);
                    if let Some(m) = plan.get_mut(key) {
                        m.team1 = MatchSlot::Participant(a);
                        m.team2 = MatchSlot::Participant(b);
                    }
                } else {
                    deferred.push_back((a, b));
                }
            }
            queue = deferred;
        }

        plan.main_rounds = round;
        plan.total_rounds = round;
        Ok(plan)
    }
}

/// Every unordered pair once, in circle-method order so consecutive pairs
/// rarely share a participant.
pub fn circle_pairings(mut ids: Vec<ParticipantId>) -> Vec<(ParticipantId, ParticipantId)> {
    let mut ring: Vec<Option<ParticipantId>> = ids.drain(..).map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();
    let mut pairs = Vec::with_capacity(n * (n - 1) / 2);

    for _ in 0..n.saturating_sub(1) {
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) {
                pairs.push((a, b));
            }
        }
        // Keep the first entry fixed and rotate the rest
        let last = ring.pop().flatten();
        ring.insert(1, last);
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seeded(n: usize) -> Vec<SeededEntry> {
        (1..=n)
            .map(|i| SeededEntry {
                participant_id: i as ParticipantId * 10,
                seed: i as u32,
                rating: 7.0 - i as f64 * 0.1,
            })
            .collect()
    }

    #[test]
    fn test_draw_order() {
        assert_eq!(draw_order(2), vec![1, 2]);
        assert_eq!(draw_order(4), vec![1, 4, 2, 3]);
        assert_eq!(draw_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn test_single_elimination_four() {
        let plan = SingleElimination.generate(&seeded(4)).unwrap();
        assert_eq!(plan.main_rounds, 2);
        assert_eq!(plan.matches.len(), 3);
        assert_eq!(plan.bye_count(), 0);

        let first: Vec<_> = plan.round(BracketSide::Main, 1).collect();
        assert_eq!(first[0].team1, MatchSlot::Participant(10));
        assert_eq!(first[0].team2, MatchSlot::Participant(40));
        assert_eq!(first[1].team1, MatchSlot::Participant(20));
        assert_eq!(first[1].team2, MatchSlot::Participant(30));
        assert!(first.iter().all(|m| m.winner_to == Some(MatchKey(2))));
    }

    #[test]
    fn test_single_elimination_three_has_one_bye() {
        let plan = SingleElimination.generate(&seeded(3)).unwrap();
        assert_eq!(plan.main_rounds, 2);
        assert_eq!(plan.matches.len(), 3);
        assert_eq!(plan.bye_count(), 1);

        let bye_match = plan.matches.iter().find(|m| m.has_bye()).unwrap();
        assert_eq!(bye_match.round, 1);
        assert_eq!(bye_match.status, MatchStatus::Walkover);
        assert_eq!(bye_match.winner, Some(10));

        // Top seed waits in the final
        let final_match = plan.round(BracketSide::Main, 2).next().unwrap();
        assert_eq!(final_match.team1, MatchSlot::Participant(10));
        assert_eq!(final_match.team2, MatchSlot::Tbd);
    }

    #[test]
    fn test_single_elimination_five() {
        let plan = SingleElimination.generate(&seeded(5)).unwrap();
        assert_eq!(plan.main_rounds, 3);
        assert_eq!(plan.matches.len(), 7);
        assert_eq!(plan.bye_count(), 3);
        assert_eq!(plan.playable().filter(|m| m.round == 1).count(), 1);
    }

    #[test]
    fn test_top_seeds_in_opposite_halves() {
        let plan = SingleElimination.generate(&seeded(8)).unwrap();
        let first: Vec<_> = plan.round(BracketSide::Main, 1).collect();
        let half_of = |id: ParticipantId| {
            first
                .iter()
                .position(|m| {
                    m.team1.participant() == Some(id) || m.team2.participant() == Some(id)
                })
                .unwrap()
                / 2
        };
        assert_ne!(half_of(10), half_of(20));
    }

    #[test]
    fn test_rejects_single_participant() {
        assert_eq!(
            SingleElimination.generate(&seeded(1)),
            Err(BracketError::TooFewParticipants {
                needed: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut entries = seeded(3);
        entries[2].participant_id = entries[0].participant_id;
        assert_eq!(
            SingleElimination.generate(&entries),
            Err(BracketError::DuplicateParticipant(10))
        );
    }

    #[test]
    fn test_double_elimination_eight() {
        let plan = DoubleElimination.generate(&seeded(8)).unwrap();
        // 7 main + 3 losers (4 first-round losers) + grand final
        assert_eq!(plan.matches.len(), 11);
        assert_eq!(plan.main_rounds, 3);
        assert_eq!(plan.total_rounds, 6);

        let losers_first: Vec<_> = plan.round(BracketSide::Losers, 4).collect();
        assert_eq!(losers_first.len(), 2);
        for m in plan.round(BracketSide::Main, 1) {
            let target = m.loser_to.expect("first-round loser drops");
            assert_eq!(plan.get(target).unwrap().bracket, BracketSide::Losers);
        }

        let grand_final = plan
            .matches
            .iter()
            .filter(|m| m.bracket == BracketSide::GrandFinal)
            .count();
        assert_eq!(grand_final, 1);
    }

    #[test]
    fn test_double_elimination_two_goes_straight_to_final() {
        let plan = DoubleElimination.generate(&seeded(2)).unwrap();
        assert_eq!(plan.matches.len(), 2);
        let opener = &plan.matches[0];
        assert_eq!(opener.winner_to, Some(MatchKey(1)));
        assert_eq!(opener.loser_to, Some(MatchKey(1)));
    }

    #[test]
    fn test_double_elimination_six_has_losers_bye() {
        // 6 entrants: 8-draw with 2 byes, so 2 real first-round matches
        let plan = DoubleElimination.generate(&seeded(6)).unwrap();
        let losers: Vec<_> = plan
            .matches
            .iter()
            .filter(|m| m.bracket == BracketSide::Losers)
            .collect();
        assert_eq!(losers.len(), 1);
        assert_eq!(losers[0].team1, MatchSlot::Tbd);
        assert_eq!(losers[0].team2, MatchSlot::Tbd);
    }

    #[test]
    fn test_circle_pairings_cover_all_pairs() {
        for n in 2..=9 {
            let ids: Vec<ParticipantId> = (1..=n).collect();
            let pairs = circle_pairings(ids);
            let n = n as usize;
            assert_eq!(pairs.len(), n * (n - 1) / 2);
            let unique: HashSet<_> = pairs
                .iter()
                .map(|&(a, b)| (a.min(b), a.max(b)))
                .collect();
            assert_eq!(unique.len(), pairs.len());
        }
    }

    #[test]
    fn test_round_robin_packs_by_courts_without_conflicts() {
        let plan = RoundRobin { courts_available: 2 }.generate(&seeded(6)).unwrap();
        assert_eq!(plan.matches.len(), 15);

        for round in 1..=plan.main_rounds {
            let games: Vec<_> = plan.round(BracketSide::Main, round).collect();
            assert!(games.len() <= 2);
            let mut seen = HashSet::new();
            for g in games {
                assert!(seen.insert(g.team1.participant().unwrap()));
                assert!(seen.insert(g.team2.participant().unwrap()));
            }
        }
    }

    #[test]
    fn test_round_robin_needs_a_court() {
        assert_eq!(
            RoundRobin { courts_available: 0 }.generate(&seeded(4)),
            Err(BracketError::NoCourts)
        );
    }

    #[test]
    fn test_generator_dispatch() {
        let generator = BracketGenerator::for_format(TournamentFormat::FixedAmericano, 3);
        assert_eq!(generator, BracketGenerator::RoundRobin(RoundRobin { courts_available: 3 }));
        let plan = generator.generate(&seeded(4)).unwrap();
        assert_eq!(plan.matches.len(), 6);
    }

    #[test]
    fn test_elimination_rounds() {
        assert_eq!(elimination_rounds(2), 1);
        assert_eq!(elimination_rounds(3), 2);
        assert_eq!(elimination_rounds(4), 2);
        assert_eq!(elimination_rounds(5), 3);
        assert_eq!(elimination_rounds(16), 4);
    }
}
