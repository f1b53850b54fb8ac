//! Integration tests for the PostgreSQL store.
//!
//! Run with a disposable database:
//! `DATABASE_URL=postgres://postgres@localhost/courtside_test cargo test -- --ignored`
//!
//! User and court ids are derived from the clock so runs never collide.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use courtside::advancement::MatchResult;
use courtside::auth::Principal;
use courtside::booking::ReservationBooking;
use courtside::db::{Database, DatabaseConfig, PgStore, RatingRepository};
use courtside::eligibility::RatingBand;
use courtside::tournament::{
    CategoryConfig, CoreConfig, MatchStatus, ScheduleRequest, TeamSize, TournamentConfig,
    TournamentError, TournamentFormat, TournamentManager, TournamentStatus,
};

/// Helper to connect and migrate a test database
async fn setup_store() -> Arc<PgStore> {
    let mut config = DatabaseConfig::from_env();
    config.max_connections = 10;
    config.min_connections = 1;

    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to apply migrations");
    Arc::new(db.store())
}

fn manager(store: Arc<PgStore>) -> TournamentManager {
    let booking = Arc::new(ReservationBooking::new(store.clone()));
    TournamentManager::new(store, booking, CoreConfig::default())
}

/// Id range unique to this test run
fn run_base() -> i64 {
    Utc::now().timestamp_micros() * 10
}

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 6, 9, 0, 0).unwrap()
}

fn doubles_knockout(capacity: usize) -> TournamentConfig {
    TournamentConfig {
        name: "Bronze Doubles Cup".to_string(),
        format: TournamentFormat::SingleElimination,
        team_size: TeamSize::Doubles,
        starts_at: morning(),
        ends_at: morning() + Duration::hours(3),
        categories: vec![CategoryConfig::new("Bronze", RatingBand::new(1.0, 3.0), capacity)],
    }
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server at DATABASE_URL"]
async fn test_knockout_round_trip() {
    let store = setup_store().await;
    let mgr = manager(store.clone());
    let base = run_base();

    let ratings = [1.2, 1.2, 1.8, 1.8, 2.1, 2.1, 2.9, 2.9];
    for (offset, rating) in (0..).zip(ratings) {
        store.set_rating(base + offset, rating).await.unwrap();
    }

    let tournament = mgr.create_tournament(doubles_knockout(4)).await.unwrap();
    mgr.open_registration(tournament.id).await.unwrap();
    let bronze = mgr.get_tournament_info(tournament.id).await.unwrap().categories[0].id;
    for captain in [0, 2, 4, 6] {
        mgr.register(
            tournament.id,
            bronze,
            &Principal::player(base + captain, 1.0),
            Some(base + captain + 1),
        )
        .await
        .unwrap();
    }

    let matches = mgr.close_registration(tournament.id, 2).await.unwrap();
    assert_eq!(matches.len(), 3);

    let outcome = mgr
        .schedule(
            tournament.id,
            ScheduleRequest {
                courts: vec![base, base + 1],
                slots: None,
                reserve: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.plan.assignments.len(), 2);
    assert!(outcome.reservations.all_succeeded());

    mgr.start_tournament(tournament.id).await.unwrap();
    let bracket = mgr.bracket(tournament.id, bronze).await.unwrap();
    mgr.complete_match(bracket[0].id, MatchResult::new(6, 3))
        .await
        .unwrap();
    mgr.complete_match(bracket[1].id, MatchResult::new(2, 6))
        .await
        .unwrap();

    let final_match = mgr
        .bracket(tournament.id, bronze)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.round == 2)
        .unwrap();
    assert!(final_match.is_resolved());

    // The final takes the block held for it
    let again = mgr
        .schedule(
            tournament.id,
            ScheduleRequest {
                courts: vec![base, base + 1],
                slots: None,
                reserve: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(again.plan.assignments.len(), 1);
    assert_eq!(
        again.plan.assignment_for(final_match.id).unwrap().court_id,
        base
    );
    assert!(again.reservations.created.is_empty());

    let last = mgr
        .complete_match(final_match.id, MatchResult::new(7, 5))
        .await
        .unwrap();
    assert!(last.tournament_completed);

    let info = mgr.get_tournament_info(tournament.id).await.unwrap();
    assert_eq!(info.tournament.status, TournamentStatus::Completed);
    assert_eq!(info.completed_matches, 3);
    assert!(
        mgr.list_matches(tournament.id)
            .await
            .unwrap()
            .iter()
            .all(|m| m.status == MatchStatus::Completed)
    );

    let history = store.rating_history(base + 6).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server at DATABASE_URL"]
async fn test_concurrent_registrations_respect_capacity() {
    let store = setup_store().await;
    let mgr = Arc::new(manager(store));
    let base = run_base();

    let start = morning() + Duration::days(1);
    let tournament = mgr
        .create_tournament(TournamentConfig::americano(
            "Crowded Americano",
            start,
            start + Duration::hours(2),
            3,
        ))
        .await
        .unwrap();
    mgr.open_registration(tournament.id).await.unwrap();
    let open = mgr.get_tournament_info(tournament.id).await.unwrap().categories[0].id;

    let mut handles = Vec::new();
    for offset in 0..8 {
        let mgr = mgr.clone();
        handles.push(tokio::spawn(async move {
            mgr.register(tournament.id, open, &Principal::player(base + offset, 3.0), None)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(TournamentError::CapacityExceeded { capacity, .. }) => assert_eq!(capacity, 3),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(accepted, 3);
    assert_eq!(mgr.list_participants(tournament.id).await.unwrap().len(), 3);
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server at DATABASE_URL"]
async fn test_held_courts_are_not_scheduled_twice() {
    let store = setup_store().await;
    let mgr = manager(store);
    let base = run_base();
    let courts = vec![base, base + 1];

    let mut ids = Vec::new();
    for _ in 0..2 {
        let tournament = mgr
            .create_tournament(TournamentConfig::americano(
                "Evening Americano",
                morning(),
                morning() + Duration::hours(3),
                8,
            ))
            .await
            .unwrap();
        mgr.open_registration(tournament.id).await.unwrap();
        let open = mgr.get_tournament_info(tournament.id).await.unwrap().categories[0].id;
        for offset in 0..4 {
            mgr.register(
                tournament.id,
                open,
                &Principal::player(base + offset, 3.0),
                None,
            )
            .await
            .unwrap();
        }
        mgr.close_registration(tournament.id, 2).await.unwrap();
        ids.push(tournament.id);
    }

    let request = ScheduleRequest {
        courts,
        slots: None,
        reserve: true,
    };
    let first = mgr.schedule(ids[0], request.clone()).await.unwrap();
    assert!(first.reservations.all_succeeded());

    assert!(matches!(
        mgr.schedule(ids[1], request).await,
        Err(TournamentError::SchedulingInfeasible(_))
    ));

    let report = mgr.cancel_tournament(ids[0]).await.unwrap();
    // Six round-robin matches fill both courts for three hours
    assert_eq!(report.released_reservations, 6);
}
