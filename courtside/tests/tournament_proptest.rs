/// Property-based tests for ratings, brackets, reservations and recurrence
///
/// These check the invariants that must hold for any input, not just the
/// hand-picked cases in the unit tests.
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use courtside::bracket::{
    BracketGenerator, GenerateBracket, RoundRobin, SeededEntry, SingleElimination,
};
use courtside::db::{MemoryStore, ReservationRepository};
use courtside::rating::{
    KFactor, MAX_RATING, MIN_RATING, PlayerRating, expected_score, update_ratings,
};
use courtside::recurrence::{GenerationWindow, RecurrenceRule, occurrences};
use courtside::scheduling::{NewReservation, ReservationKind};
use courtside::tournament::{MatchSlot, TournamentFormat};
use proptest::prelude::*;
use std::collections::HashSet;

fn rating_strategy() -> impl Strategy<Value = f64> {
    MIN_RATING..=MAX_RATING
}

fn k_strategy() -> impl Strategy<Value = KFactor> {
    prop_oneof![Just(KFactor::STANDARD), Just(KFactor::TOURNAMENT)]
}

fn seeded(n: usize) -> Vec<SeededEntry> {
    (1..=n)
        .map(|i| SeededEntry {
            participant_id: i as i64 * 10,
            seed: i as u32,
            rating: 7.0 - i as f64 * 0.1,
        })
        .collect()
}

fn weekday_strategy() -> impl Strategy<Value = Vec<Weekday>> {
    prop::collection::btree_set(0u8..7, 1..=7).prop_map(|days| {
        days.into_iter()
            .map(|d| match d {
                0 => Weekday::Mon,
                1 => Weekday::Tue,
                2 => Weekday::Wed,
                3 => Weekday::Thu,
                4 => Weekday::Fri,
                5 => Weekday::Sat,
                _ => Weekday::Sun,
            })
            .collect()
    })
}

// (court, start hour offset, length in hours)
fn reservation_strategy() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((1i64..=3, 0i64..24, 1i64..=4), 1..30)
}

proptest! {
    #[test]
    fn test_expected_scores_sum_to_one(a in rating_strategy(), b in rating_strategy()) {
        let total = expected_score(a, b) + expected_score(b, a);
        prop_assert!((total - 1.0).abs() < 1e-9, "sum was {}", total);
    }

    #[test]
    fn test_equal_teams_trade_equal_points(
        r1 in 2.0f64..=6.0,
        r2 in 2.0f64..=6.0,
        score_a in 0u32..10,
        score_b in 0u32..10,
        k in k_strategy(),
    ) {
        prop_assume!(score_a != score_b);
        let team_a = [PlayerRating::new(1, r1), PlayerRating::new(2, r2)];
        let team_b = [PlayerRating::new(3, r2), PlayerRating::new(4, r1)];

        let update = update_ratings(&team_a, &team_b, score_a, score_b, k).unwrap();
        prop_assert!((update.delta_a + update.delta_b).abs() < 1e-9);
        prop_assert!(update.delta_a != 0.0);
    }

    #[test]
    fn test_ratings_stay_in_range(
        team_a in prop::collection::vec(rating_strategy(), 1..=2),
        team_b in prop::collection::vec(rating_strategy(), 1..=2),
        score_a in 0u32..10,
        score_b in 0u32..10,
        k in k_strategy(),
    ) {
        let players = |ratings: &[f64], offset: i64| -> Vec<PlayerRating> {
            ratings
                .iter()
                .enumerate()
                .map(|(i, r)| PlayerRating::new(offset + i as i64, *r))
                .collect()
        };
        let update = update_ratings(&players(&team_a, 1), &players(&team_b, 10), score_a, score_b, k)
            .unwrap();

        prop_assert_eq!(update.changes.len(), team_a.len() + team_b.len());
        for change in &update.changes {
            prop_assert!((MIN_RATING..=MAX_RATING).contains(&change.after));
        }
    }

    #[test]
    fn test_knockout_size_and_byes(n in 2usize..=40) {
        let plan = SingleElimination.generate(&seeded(n)).unwrap();
        let size = n.next_power_of_two();

        prop_assert_eq!(plan.matches.len(), size - 1);
        prop_assert_eq!(plan.main_rounds, size.trailing_zeros());
        prop_assert_eq!(plan.bye_count(), size - n);

        // Every entrant starts in exactly one first-round slot
        let mut entrants = HashSet::new();
        for m in plan.matches.iter().filter(|m| m.round == 1) {
            for slot in [m.team1, m.team2] {
                if let MatchSlot::Participant(id) = slot {
                    prop_assert!(entrants.insert(id));
                }
            }
        }
        prop_assert_eq!(entrants.len(), n);
    }

    #[test]
    fn test_round_robin_plays_every_pair_once(n in 2usize..=16, courts in 1usize..=6) {
        let plan = BracketGenerator::from(RoundRobin { courts_available: courts })
            .generate(&seeded(n))
            .unwrap();
        prop_assert_eq!(plan.matches.len(), n * (n - 1) / 2);

        let mut pairs = HashSet::new();
        for m in &plan.matches {
            let (MatchSlot::Participant(a), MatchSlot::Participant(b)) = (m.team1, m.team2) else {
                return Err(TestCaseError::fail("round-robin match without two participants"));
            };
            prop_assert!(a != b);
            prop_assert!(pairs.insert((a.min(b), a.max(b))));
        }
    }

    #[test]
    fn test_generator_matches_format(n in 2usize..=12) {
        let knockout = BracketGenerator::for_format(TournamentFormat::SingleElimination, 2);
        let americano = BracketGenerator::for_format(TournamentFormat::Americano, 2);
        prop_assert_eq!(
            knockout.generate(&seeded(n)).unwrap().matches.len(),
            n.next_power_of_two() - 1
        );
        prop_assert_eq!(americano.generate(&seeded(n)).unwrap().matches.len(), n * (n - 1) / 2);
    }

    #[test]
    fn test_active_reservations_never_overlap(requests in reservation_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let base = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let batch: Vec<NewReservation> = requests
            .iter()
            .map(|&(court_id, offset, hours)| NewReservation {
                court_id,
                starts_at: base + Duration::hours(offset),
                ends_at: base + Duration::hours(offset + hours),
                kind: ReservationKind::Regular,
                tournament_id: None,
            })
            .collect();

        let (report, active) = runtime.block_on(async {
            let store = MemoryStore::new();
            let report = store.create_reservations(&batch).await.unwrap();
            let active = store
                .active_reservations(None, base, base + Duration::days(2))
                .await
                .unwrap();
            (report, active)
        });

        prop_assert_eq!(report.created.len() + report.failed.len(), batch.len());
        prop_assert_eq!(active.len(), report.created.len());
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                prop_assert!(!a.blocks(b.court_id, b.starts_at, b.ends_at));
            }
        }
    }

    #[test]
    fn test_weekly_occurrences_are_distinct_and_repeatable(
        weekdays in weekday_strategy(),
        interval in 1u32..=3,
        start_offset in 0i64..28,
        window_days in 1u32..=60,
    ) {
        let starts_on = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap() + Duration::days(start_offset);
        let rule = RecurrenceRule::weekly(
            weekdays.clone(),
            starts_on,
            NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
        )
        .with_interval(interval);
        let window =
            GenerationWindow::ahead(starts_on.and_hms_opt(0, 0, 0).unwrap().and_utc(), window_days)
                .unwrap();

        let first = occurrences(&rule, &window, &HashSet::new()).unwrap();
        let stamped: HashSet<_> = first.iter().map(|o| o.starts_at).collect();
        prop_assert_eq!(stamped.len(), first.len());
        for o in &first {
            prop_assert!(weekdays.contains(&o.starts_at.weekday()));
            prop_assert!(window.contains(o.starts_at));
            prop_assert!(o.starts_at.date_naive() >= starts_on);
        }

        let again = occurrences(&rule, &window, &stamped).unwrap();
        prop_assert!(again.is_empty());
    }
}

#[test]
fn test_weekly_monday_wednesday_two_weeks() {
    let monday = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    let rule = RecurrenceRule::weekly(
        vec![Weekday::Mon, Weekday::Wed],
        monday,
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
    );
    let window =
        GenerationWindow::ahead(monday.and_hms_opt(0, 0, 0).unwrap().and_utc(), 14).unwrap();

    let dates: Vec<u32> = occurrences(&rule, &window, &HashSet::new())
        .unwrap()
        .iter()
        .map(|o| o.starts_at.day())
        .collect();
    assert_eq!(dates, vec![4, 6, 11, 13]);
}
