//! Court and time slot allocation.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use super::models::{
    CourtReservation, MatchAssignment, NewReservation, RoundSchedule, ScheduleError, SchedulePlan,
    ScheduleResult, ScheduleWarning, TimeSlot,
};
use crate::tournament::models::{
    BracketSide, CourtId, Match, MatchId, MatchStatus, ParticipantId, TournamentFormat,
    TournamentId,
};

/// Slots must be non-empty, start on the hour, and be sorted without overlap.
pub fn validate_slots(slots: &[TimeSlot]) -> ScheduleResult<()> {
    if slots.is_empty() {
        return Err(ScheduleError::NoSlots);
    }
    for (index, slot) in slots.iter().enumerate() {
        if slot.ends_at <= slot.starts_at {
            return Err(ScheduleError::EmptySlot { index });
        }
        if !slot.is_hour_aligned() {
            return Err(ScheduleError::MisalignedSlot { index });
        }
        if index > 0 && slot.starts_at < slots[index - 1].ends_at {
            return Err(ScheduleError::UnorderedSlot { index });
        }
    }
    Ok(())
}

/// Open matches whose two sides are both known participants
pub fn required_matches(matches: &[Match]) -> Vec<&Match> {
    matches
        .iter()
        .filter(|m| !m.status.is_terminal() && m.is_resolved())
        .collect()
}

/// Build a schedule for every open match of a tournament.
///
/// Knockout formats play round by round: each round gets its own group of
/// consecutive slots, even when its matches are still waiting for earlier
/// results. Round-robin formats are packed into the earliest slot that has a
/// free court and does not already hold either participant.
pub fn plan(
    format: TournamentFormat,
    matches: &[Match],
    slots: &[TimeSlot],
    courts: &[CourtId],
) -> ScheduleResult<SchedulePlan> {
    validate_slots(slots)?;
    if courts.is_empty() {
        return Err(ScheduleError::NoCourts);
    }

    let mut plan = if format.is_elimination() {
        plan_rounds(matches, slots, courts)
    } else {
        plan_packed(matches, slots, courts)
    };
    warn_unscheduled(&mut plan);

    log::debug!(
        "schedule plan: {} assignments, {} unscheduled, {} warnings",
        plan.assignments.len(),
        plan.unscheduled.len(),
        plan.warnings.len()
    );
    Ok(plan)
}

/// Re-plan inside the court blocks a tournament already holds.
///
/// Matches that became playable since the blocks were taken, such as a final
/// whose semi-finals are decided, get the earliest free block. Elimination
/// formats keep the round order: a block is only used once every earlier
/// round already on court has finished. A participant is never in two
/// overlapping blocks.
pub fn plan_within_blocks(
    format: TournamentFormat,
    matches: &[Match],
    blocks: &[CourtReservation],
) -> SchedulePlan {
    let mut held: Vec<(TimeSlot, CourtId)> = blocks
        .iter()
        .filter(|b| b.active)
        .map(|b| (TimeSlot::new(b.starts_at, b.ends_at), b.court_id))
        .collect();
    held.sort();
    held.dedup();

    let mut placed: Vec<(&Match, TimeSlot)> = Vec::new();
    let mut taken: HashSet<(CourtId, DateTime<Utc>)> = HashSet::new();
    for m in matches.iter().filter(|m| m.status != MatchStatus::Cancelled) {
        if let Some(a) = m.assignment {
            placed.push((m, TimeSlot::new(a.starts_at, a.ends_at)));
            taken.insert((a.court_id, a.starts_at));
        }
    }

    let mut required: Vec<&Match> = required_matches(matches)
        .into_iter()
        .filter(|m| m.assignment.is_none())
        .collect();
    required.sort_by_key(|m| (m.round, bracket_rank(m.bracket), m.category_id, m.match_number));

    let mut assignments = Vec::new();
    let mut unscheduled = Vec::new();
    for m in required {
        let Some((a, b)) = m.participants() else {
            continue;
        };
        let key = (m.round, bracket_rank(m.bracket));
        let barrier = placed
            .iter()
            .filter(|(p, _)| format.is_elimination() && (p.round, bracket_rank(p.bracket)) < key)
            .map(|(_, slot)| slot.ends_at)
            .max();

        let target = held.iter().copied().find(|(slot, court)| {
            !taken.contains(&(*court, slot.starts_at))
                && barrier.is_none_or(|end| slot.starts_at >= end)
                && !placed
                    .iter()
                    .any(|(p, other)| other.overlaps(slot) && plays_in(p, a, b))
        });
        match target {
            Some((slot, court_id)) => {
                taken.insert((court_id, slot.starts_at));
                placed.push((m, slot));
                assignments.push(MatchAssignment {
                    match_id: m.id,
                    court_id,
                    slot,
                });
            }
            None => unscheduled.push(m.id),
        }
    }

    let slots: Vec<TimeSlot> = held
        .iter()
        .map(|(slot, _)| *slot)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let courts: BTreeSet<CourtId> = held.iter().map(|(_, court)| *court).collect();
    let mut per_slot: BTreeMap<TimeSlot, usize> = BTreeMap::new();
    for a in &assignments {
        *per_slot.entry(a.slot).or_default() += 1;
    }
    let last_slot = assignments
        .iter()
        .filter_map(|a| slots.iter().position(|s| *s == a.slot))
        .max();

    let mut plan = SchedulePlan {
        rounds: Vec::new(),
        assignments,
        unscheduled,
        total_matches: matches.iter().filter(|m| !m.status.is_terminal()).count(),
        total_slots: slots.len(),
        courts_per_slot: courts.len(),
        courts_required: per_slot.values().copied().max().unwrap_or(0),
        estimated_minutes: estimated_minutes(&slots, last_slot),
        warnings: Vec::new(),
    };
    warn_unscheduled(&mut plan);
    plan
}

fn plays_in(m: &Match, a: ParticipantId, b: ParticipantId) -> bool {
    [m.team1.participant(), m.team2.participant()]
        .into_iter()
        .flatten()
        .any(|p| p == a || p == b)
}

fn warn_unscheduled(plan: &mut SchedulePlan) {
    if !plan.unscheduled.is_empty() {
        plan.warnings.push(ScheduleWarning::MatchesUnscheduled {
            matches: plan.unscheduled.clone(),
        });
    }
}

fn bracket_rank(side: BracketSide) -> u8 {
    match side {
        BracketSide::Main => 0,
        BracketSide::Losers => 1,
        BracketSide::GrandFinal => 2,
    }
}

fn plan_rounds(matches: &[Match], slots: &[TimeSlot], courts: &[CourtId]) -> SchedulePlan {
    let mut groups: BTreeMap<(u32, u8), Vec<&Match>> = BTreeMap::new();
    for m in matches.iter().filter(|m| !m.status.is_terminal()) {
        groups
            .entry((m.round, bracket_rank(m.bracket)))
            .or_default()
            .push(m);
    }

    let per_slot = courts.len();
    let total_matches: usize = groups.values().map(Vec::len).sum();
    let mut rounds = Vec::new();
    let mut assignments = Vec::new();
    let mut unscheduled = Vec::new();
    let mut unplaced_rounds = Vec::new();
    let mut cursor = 0;

    for group in groups.values_mut() {
        group.sort_by_key(|m| (m.category_id, m.match_number));
        let (ready, waiting): (Vec<&Match>, Vec<&Match>) =
            group.iter().copied().partition(|m| m.is_resolved());

        let needed = group.len().div_ceil(per_slot);
        let end = (cursor + needed).min(slots.len());
        if cursor + needed > slots.len() {
            unplaced_rounds.push(group[0].round);
        }

        let mut assigned = 0;
        for (i, m) in ready.iter().enumerate() {
            match slots.get(cursor + i / per_slot).filter(|_| cursor + i / per_slot < end) {
                Some(slot) => {
                    assignments.push(MatchAssignment {
                        match_id: m.id,
                        court_id: courts[i % per_slot],
                        slot: *slot,
                    });
                    assigned += 1;
                }
                None => unscheduled.push(m.id),
            }
        }

        if cursor < end {
            rounds.push(RoundSchedule {
                bracket: group[0].bracket,
                round: group[0].round,
                slots: slots[cursor..end].to_vec(),
                courts: courts[..group.len().min(per_slot)].to_vec(),
                matches: group.len(),
                assigned,
                pending: waiting.len(),
            });
        }
        cursor += needed;
    }

    let mut warnings = Vec::new();
    let capacity = slots.len() * per_slot;
    if total_matches > capacity {
        warnings.push(ScheduleWarning::CapacityShortfall {
            total_matches,
            capacity,
        });
    }
    if !unplaced_rounds.is_empty() {
        warnings.push(ScheduleWarning::RoundsUnplaced {
            rounds: unplaced_rounds,
        });
    }

    let last_slot = cursor.min(slots.len()).checked_sub(1);
    let courts_required = rounds.iter().map(|r| r.courts.len()).max().unwrap_or(0);

    SchedulePlan {
        rounds,
        assignments,
        unscheduled,
        total_matches,
        total_slots: slots.len(),
        courts_per_slot: per_slot,
        courts_required,
        estimated_minutes: estimated_minutes(slots, last_slot),
        warnings,
    }
}

#[derive(Default)]
struct PackedSlot {
    matches: Vec<(MatchId, CourtId)>,
    players: HashSet<ParticipantId>,
}

fn plan_packed(matches: &[Match], slots: &[TimeSlot], courts: &[CourtId]) -> SchedulePlan {
    let mut required = required_matches(matches);
    required.sort_by_key(|m| (m.round, m.category_id, m.match_number));

    let total_matches = required.len();
    let per_slot = courts.len().min(total_matches.div_ceil(slots.len())).max(1);

    let mut packed: Vec<PackedSlot> = slots.iter().map(|_| PackedSlot::default()).collect();
    let mut unscheduled = Vec::new();

    for m in &required {
        let Some((a, b)) = m.participants() else {
            continue;
        };
        let target = packed.iter_mut().find(|slot| {
            slot.matches.len() < per_slot
                && !slot.players.contains(&a)
                && !slot.players.contains(&b)
        });
        match target {
            Some(slot) => {
                let court = courts[slot.matches.len()];
                slot.matches.push((m.id, court));
                slot.players.insert(a);
                slot.players.insert(b);
            }
            None => unscheduled.push(m.id),
        }
    }

    let mut rounds = Vec::new();
    let mut assignments = Vec::new();
    let mut last_slot = None;
    for (index, (slot, usage)) in slots.iter().zip(&packed).enumerate() {
        if usage.matches.is_empty() {
            continue;
        }
        last_slot = Some(index);
        assignments.extend(usage.matches.iter().map(|&(match_id, court_id)| MatchAssignment {
            match_id,
            court_id,
            slot: *slot,
        }));
        rounds.push(RoundSchedule {
            bracket: BracketSide::Main,
            round: rounds.len() as u32 + 1,
            slots: vec![*slot],
            courts: usage.matches.iter().map(|&(_, court)| court).collect(),
            matches: usage.matches.len(),
            assigned: usage.matches.len(),
            pending: 0,
        });
    }

    let mut warnings = Vec::new();
    let capacity = slots.len() * per_slot;
    if total_matches > capacity {
        warnings.push(ScheduleWarning::CapacityShortfall {
            total_matches,
            capacity,
        });
    }

    let courts_required = rounds.iter().map(|r| r.courts.len()).max().unwrap_or(0);

    SchedulePlan {
        rounds,
        assignments,
        unscheduled,
        total_matches,
        total_slots: slots.len(),
        courts_per_slot: per_slot,
        courts_required,
        estimated_minutes: estimated_minutes(slots, last_slot),
        warnings,
    }
}

fn estimated_minutes(slots: &[TimeSlot], last_slot: Option<usize>) -> i64 {
    match (slots.first(), last_slot.and_then(|i| slots.get(i))) {
        (Some(first), Some(last)) => (last.ends_at - first.starts_at).num_minutes(),
        _ => 0,
    }
}

/// One TOURNAMENT_BLOCK per (court, slot) the plan holds, including slots
/// held for rounds that are still waiting on results.
pub fn reservations_for(plan: &SchedulePlan, tournament_id: TournamentId) -> Vec<NewReservation> {
    let mut held: BTreeSet<(TimeSlot, CourtId)> = BTreeSet::new();
    for round in &plan.rounds {
        for (index, slot) in round.slots.iter().enumerate() {
            for &court in round.courts_in_slot(index) {
                held.insert((*slot, court));
            }
        }
    }
    held.into_iter()
        .map(|(slot, court)| NewReservation::tournament_block(tournament_id, court, slot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::ReservationKind;
    use crate::tournament::models::{CourtAssignment, MatchSlot};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap()
    }

    fn hourly(count: i64) -> Vec<TimeSlot> {
        TimeSlot::consecutive(base(), base() + Duration::hours(count), Duration::hours(1))
    }

    fn game(id: MatchId, round: u32, number: u32, team1: MatchSlot, team2: MatchSlot) -> Match {
        Match {
            id,
            tournament_id: 1,
            category_id: 1,
            bracket: BracketSide::Main,
            round,
            match_number: number,
            team1,
            team2,
            status: MatchStatus::Scheduled,
            assignment: None,
            team1_score: None,
            team2_score: None,
            winner: None,
            winner_advances_to: None,
            loser_advances_to: None,
        }
    }

    fn p(id: ParticipantId) -> MatchSlot {
        MatchSlot::Participant(id)
    }

    /// Eight-team knockout: 4 quarter-finals, 2 TBD semis, 1 TBD final
    fn eight_team_knockout() -> Vec<Match> {
        let mut matches: Vec<Match> = (0..4)
            .map(|i| game(i + 1, 1, i as u32 + 1, p(i * 2 + 1), p(i * 2 + 2)))
            .collect();
        matches.push(game(5, 2, 1, MatchSlot::Tbd, MatchSlot::Tbd));
        matches.push(game(6, 2, 2, MatchSlot::Tbd, MatchSlot::Tbd));
        matches.push(game(7, 3, 1, MatchSlot::Tbd, MatchSlot::Tbd));
        matches
    }

    #[test]
    fn test_validate_slots() {
        assert_eq!(validate_slots(&[]), Err(ScheduleError::NoSlots));
        assert!(validate_slots(&hourly(3)).is_ok());

        let misaligned = [TimeSlot::new(
            base() + Duration::minutes(30),
            base() + Duration::minutes(90),
        )];
        assert_eq!(
            validate_slots(&misaligned),
            Err(ScheduleError::MisalignedSlot { index: 0 })
        );

        let mut reversed = hourly(2);
        reversed.reverse();
        assert_eq!(
            validate_slots(&reversed),
            Err(ScheduleError::UnorderedSlot { index: 1 })
        );
    }

    #[test]
    fn test_no_courts_is_an_error() {
        assert_eq!(
            plan(TournamentFormat::SingleElimination, &[], &hourly(2), &[]),
            Err(ScheduleError::NoCourts)
        );
    }

    #[test]
    fn test_elimination_round_barrier() {
        let matches = eight_team_knockout();
        let slots = hourly(6);
        let plan = plan(TournamentFormat::SingleElimination, &matches, &slots, &[10, 11]).unwrap();

        // QF: 2 slots, SF: 1 slot, F: 1 slot
        assert_eq!(plan.rounds.len(), 3);
        assert_eq!(plan.rounds[0].slots, slots[0..2].to_vec());
        assert_eq!(plan.rounds[1].slots, vec![slots[2]]);
        assert_eq!(plan.rounds[1].pending, 2);
        assert_eq!(plan.rounds[2].slots, vec![slots[3]]);

        assert_eq!(plan.assignments.len(), 4);
        let qf3 = plan.assignment_for(3).unwrap();
        assert_eq!((qf3.court_id, qf3.slot), (10, slots[1]));
        assert!(plan.assignment_for(5).is_none());

        assert_eq!(plan.total_matches, 7);
        assert_eq!(plan.courts_required, 2);
        assert_eq!(plan.estimated_minutes, 4 * 60);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_elimination_shortfall_is_a_warning() {
        let matches = eight_team_knockout();
        let plan =
            plan(TournamentFormat::SingleElimination, &matches, &hourly(2), &[10, 11]).unwrap();

        assert_eq!(plan.assignments.len(), 4);
        assert!(plan.warnings.contains(&ScheduleWarning::CapacityShortfall {
            total_matches: 7,
            capacity: 4
        }));
        assert!(plan.warnings.contains(&ScheduleWarning::RoundsUnplaced { rounds: vec![2, 3] }));
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_finished_matches_are_skipped() {
        let mut matches = eight_team_knockout();
        for m in matches.iter_mut().take(4) {
            m.status = MatchStatus::Completed;
        }
        matches[4].team1 = p(1);
        matches[4].team2 = p(3);

        let plan =
            plan(TournamentFormat::SingleElimination, &matches, &hourly(4), &[10, 11]).unwrap();
        assert_eq!(plan.rounds[0].round, 2);
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignment_for(5).unwrap().slot, hourly(1)[0]);
    }

    #[test]
    fn test_round_robin_packs_without_double_booking() {
        // four players, six matches, three slots, plenty of courts
        let pairs = [(1, 2), (3, 4), (1, 3), (2, 4), (1, 4), (2, 3)];
        let matches: Vec<Match> = pairs
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| {
                game(i as MatchId + 1, i as u32 / 2 + 1, i as u32 % 2 + 1, p(a), p(b))
            })
            .collect();

        let plan = plan(TournamentFormat::Americano, &matches, &hourly(3), &[1, 2, 3, 4]).unwrap();
        assert_eq!(plan.courts_per_slot, 2);
        assert_eq!(plan.assignments.len(), 6);
        assert!(plan.unscheduled.is_empty());

        for slot in hourly(3) {
            let players: Vec<ParticipantId> = plan
                .assignments
                .iter()
                .filter(|a| a.slot == slot)
                .flat_map(|a| {
                    let m = &matches[a.match_id as usize - 1];
                    [m.team1.participant().unwrap(), m.team2.participant().unwrap()]
                })
                .collect();
            let unique: HashSet<_> = players.iter().collect();
            assert_eq!(unique.len(), players.len());
        }
    }

    #[test]
    fn test_round_robin_shortfall() {
        let matches: Vec<Match> = (0..5)
            .map(|i| game(i + 1, 1, i as u32 + 1, p(i * 2 + 1), p(i * 2 + 2)))
            .collect();
        let plan = plan(TournamentFormat::FixedAmericano, &matches, &hourly(2), &[1, 2]).unwrap();
        assert_eq!(plan.assignments.len(), 4);
        assert_eq!(plan.unscheduled, vec![5]);
        assert_eq!(
            plan.warnings,
            vec![
                ScheduleWarning::CapacityShortfall {
                    total_matches: 5,
                    capacity: 4
                },
                ScheduleWarning::MatchesUnscheduled { matches: vec![5] },
            ]
        );
    }

    #[test]
    fn test_player_clash_leaves_match_unscheduled_with_warning() {
        // player 1 is in every match: one per slot, the third does not fit
        let matches = vec![
            game(1, 1, 1, p(1), p(2)),
            game(2, 1, 2, p(1), p(3)),
            game(3, 1, 3, p(1), p(4)),
        ];
        let plan = plan(TournamentFormat::Americano, &matches, &hourly(2), &[1, 2]).unwrap();

        assert_eq!(plan.courts_per_slot, 2);
        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.unscheduled, vec![3]);
        assert_eq!(
            plan.warnings,
            vec![ScheduleWarning::MatchesUnscheduled { matches: vec![3] }]
        );
        assert!(!plan.is_complete());
    }

    fn block(court_id: CourtId, slot: TimeSlot) -> CourtReservation {
        CourtReservation {
            id: 0,
            court_id,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            kind: ReservationKind::TournamentBlock,
            tournament_id: Some(1),
            active: true,
        }
    }

    fn on_court(m: &mut Match, court_id: CourtId, slot: TimeSlot) {
        m.assignment = Some(CourtAssignment {
            court_id,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
        });
    }

    /// Blocks an eight-team knockout holds on courts 10 and 11 over four
    /// hours, with the quarter-finals on court
    fn held_knockout() -> (Vec<Match>, Vec<CourtReservation>) {
        let slots = hourly(4);
        let mut matches = eight_team_knockout();
        for (i, m) in matches.iter_mut().take(4).enumerate() {
            on_court(m, [10, 11][i % 2], slots[i / 2]);
        }
        let mut blocks: Vec<CourtReservation> = slots[..3]
            .iter()
            .flat_map(|slot| [block(10, *slot), block(11, *slot)])
            .collect();
        blocks.push(block(10, slots[3]));
        (matches, blocks)
    }

    #[test]
    fn test_decided_semifinals_take_their_held_blocks() {
        let slots = hourly(4);
        let (mut matches, blocks) = held_knockout();
        for m in matches.iter_mut().take(4) {
            m.status = MatchStatus::Completed;
        }
        matches[4].team1 = p(1);
        matches[4].team2 = p(3);
        matches[5].team1 = p(5);
        matches[5].team2 = p(7);

        let plan = plan_within_blocks(TournamentFormat::SingleElimination, &matches, &blocks);
        assert_eq!(plan.assignments.len(), 2);
        let sf1 = plan.assignment_for(5).unwrap();
        let sf2 = plan.assignment_for(6).unwrap();
        assert_eq!((sf1.court_id, sf1.slot), (10, slots[2]));
        assert_eq!((sf2.court_id, sf2.slot), (11, slots[2]));

        // The final is still waiting and keeps its block
        assert!(plan.assignment_for(7).is_none());
        assert!(plan.unscheduled.is_empty());
        assert!(plan.warnings.is_empty());
        assert_eq!(plan.total_matches, 3);
        assert_eq!(plan.courts_required, 2);
        assert_eq!(plan.estimated_minutes, 3 * 60);
    }

    #[test]
    fn test_held_blocks_keep_round_order() {
        let slots = hourly(4);
        let (mut matches, mut blocks) = held_knockout();
        // An early block on a third court must not pull the semi ahead of
        // quarter-finals still on court
        blocks.push(block(12, slots[0]));
        matches[0].status = MatchStatus::Completed;
        matches[1].status = MatchStatus::Completed;
        matches[4].team1 = p(1);
        matches[4].team2 = p(3);

        let plan = plan_within_blocks(TournamentFormat::SingleElimination, &matches, &blocks);
        assert_eq!(plan.assignment_for(5).unwrap().slot, slots[2]);
    }

    #[test]
    fn test_no_free_block_is_a_warning() {
        let (mut matches, blocks) = held_knockout();
        for m in matches.iter_mut().take(4) {
            m.status = MatchStatus::Completed;
        }
        matches[4].team1 = p(1);
        matches[4].team2 = p(3);
        matches[5].team1 = p(5);
        matches[5].team2 = p(7);
        let quarter_final_blocks: Vec<CourtReservation> = blocks[..4].to_vec();

        let plan = plan_within_blocks(
            TournamentFormat::SingleElimination,
            &matches,
            &quarter_final_blocks,
        );
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.unscheduled, vec![5, 6]);
        assert_eq!(
            plan.warnings,
            vec![ScheduleWarning::MatchesUnscheduled { matches: vec![5, 6] }]
        );
    }

    #[test]
    fn test_reservations_cover_held_courts_only() {
        let matches = eight_team_knockout();
        let slots = hourly(4);
        let plan = plan(TournamentFormat::SingleElimination, &matches, &slots, &[10, 11]).unwrap();
        let reservations = reservations_for(&plan, 42);

        // QF: 2 slots x 2 courts, SF: 1 x 2, F: 1 x 1
        assert_eq!(reservations.len(), 7);
        assert!(reservations.iter().all(|r| r.tournament_id == Some(42)));
        let final_slot: Vec<_> = reservations
            .iter()
            .filter(|r| r.starts_at == slots[3].starts_at)
            .collect();
        assert_eq!(final_slot.len(), 1);
        assert_eq!(final_slot[0].court_id, 10);
    }
}
