//! PostgreSQL implementation of the repository traits.
//!
//! Every multi-row operation runs in one transaction. Contended rows are
//! locked explicitly: the category row before a capacity check, the
//! tournament row before a lifecycle change, and a per-court advisory lock
//! before a reservation overlap check.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Connection, PgConnection, PgPool, Row};

use super::repository::{
    BracketWrite, CancellationReport, MatchRepository, RatingHistoryEntry, RatingRepository,
    ReservationRepository, ResultWrite, TemplateRepository, TournamentRepository,
};
use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, within};
use crate::eligibility::RatingBand;
use crate::recurrence::{NewTemplate, RecurringTournamentTemplate, TemplateId};
use crate::scheduling::{
    BulkReservationReport, CourtReservation, MatchAssignment, NewReservation, ReservationFailure,
    ReservationKind,
};
use crate::tournament::errors::{Entity, TournamentError, TournamentResult};
use crate::tournament::models::{
    BracketSide, Category, CourtAssignment, CourtId, Match, MatchId, MatchSlot, MatchStatus,
    NewParticipant, NewTournament, Participant, ParticipantId, TeamSize, Tournament,
    TournamentFormat, TournamentId, TournamentStatus, UserId,
};

const TOURNAMENT_COLUMNS: &str =
    "id, name, format, team_size, status, starts_at, ends_at, template_id, created_at";

const MATCH_COLUMNS: &str = "id, tournament_id, category_id, bracket, round, match_number, \
     team1_id, team1_bye, team2_id, team2_bye, status, court_id, slot_starts_at, slot_ends_at, \
     team1_score, team2_score, winner_id, winner_advances_to, loser_advances_to";

const PARTICIPANT_SELECT: &str = "SELECT p.id, p.tournament_id, p.category_id, \
     p.elo_at_registration, p.seed, p.registered_at, \
     ARRAY_AGG(m.user_id ORDER BY m.position) AS members \
     FROM participants p JOIN participant_members m ON m.participant_id = p.id";

const RESERVATION_COLUMNS: &str = "id, court_id, starts_at, ends_at, kind, tournament_id, active";

const TEMPLATE_COLUMNS: &str = "id, rule, blueprint, advance_days, active, created_at";

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for exclusion_violation
const EXCLUSION_VIOLATION: &str = "23P01";

fn sql_state(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|code| code.into_owned())
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> TournamentError {
    TournamentError::CorruptRow(format!("{column} = {value}"))
}

fn to_u32(value: i32, column: &str) -> TournamentResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}

fn tournament_from_row(r: &PgRow) -> TournamentResult<Tournament> {
    let format: String = r.try_get("format")?;
    let team_size: String = r.try_get("team_size")?;
    let status: String = r.try_get("status")?;
    Ok(Tournament {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        format: TournamentFormat::from_db_str(&format).ok_or_else(|| corrupt("format", &format))?,
        team_size: TeamSize::from_db_str(&team_size)
            .ok_or_else(|| corrupt("team_size", &team_size))?,
        status: TournamentStatus::from_db_str(&status).ok_or_else(|| corrupt("status", &status))?,
        starts_at: r.try_get("starts_at")?,
        ends_at: r.try_get("ends_at")?,
        template_id: r.try_get("template_id")?,
        created_at: r.try_get("created_at")?,
    })
}

fn category_from_row(r: &PgRow) -> TournamentResult<Category> {
    let capacity: i32 = r.try_get("capacity")?;
    let registered: i64 = r.try_get("registered_count")?;
    Ok(Category {
        id: r.try_get("id")?,
        tournament_id: r.try_get("tournament_id")?,
        name: r.try_get("name")?,
        band: RatingBand {
            min: r.try_get("min_rating")?,
            max: r.try_get("max_rating")?,
            open_ended: r.try_get("open_ended")?,
        },
        capacity: usize::try_from(capacity).map_err(|_| corrupt("capacity", capacity))?,
        registered_count: usize::try_from(registered)
            .map_err(|_| corrupt("registered_count", registered))?,
    })
}

fn participant_from_row(r: &PgRow) -> TournamentResult<Participant> {
    let seed: Option<i32> = r.try_get("seed")?;
    Ok(Participant {
        id: r.try_get("id")?,
        tournament_id: r.try_get("tournament_id")?,
        category_id: r.try_get("category_id")?,
        members: r.try_get("members")?,
        elo_at_registration: r.try_get("elo_at_registration")?,
        seed: seed.map(|s| to_u32(s, "seed")).transpose()?,
        registered_at: r.try_get("registered_at")?,
    })
}

fn match_from_row(r: &PgRow) -> TournamentResult<Match> {
    let bracket: String = r.try_get("bracket")?;
    let status: String = r.try_get("status")?;
    let court_id: Option<CourtId> = r.try_get("court_id")?;
    let starts_at: Option<DateTime<Utc>> = r.try_get("slot_starts_at")?;
    let ends_at: Option<DateTime<Utc>> = r.try_get("slot_ends_at")?;
    let score1: Option<i32> = r.try_get("team1_score")?;
    let score2: Option<i32> = r.try_get("team2_score")?;

    Ok(Match {
        id: r.try_get("id")?,
        tournament_id: r.try_get("tournament_id")?,
        category_id: r.try_get("category_id")?,
        bracket: BracketSide::from_db_str(&bracket).ok_or_else(|| corrupt("bracket", &bracket))?,
        round: to_u32(r.try_get("round")?, "round")?,
        match_number: to_u32(r.try_get("match_number")?, "match_number")?,
        team1: MatchSlot::from_columns(r.try_get("team1_id")?, r.try_get("team1_bye")?),
        team2: MatchSlot::from_columns(r.try_get("team2_id")?, r.try_get("team2_bye")?),
        status: MatchStatus::from_db_str(&status).ok_or_else(|| corrupt("status", &status))?,
        assignment: match (court_id, starts_at, ends_at) {
            (Some(court_id), Some(starts_at), Some(ends_at)) => Some(CourtAssignment {
                court_id,
                starts_at,
                ends_at,
            }),
            _ => None,
        },
        team1_score: score1.map(|s| to_u32(s, "team1_score")).transpose()?,
        team2_score: score2.map(|s| to_u32(s, "team2_score")).transpose()?,
        winner: r.try_get("winner_id")?,
        winner_advances_to: r.try_get("winner_advances_to")?,
        loser_advances_to: r.try_get("loser_advances_to")?,
    })
}

fn reservation_from_row(r: &PgRow) -> TournamentResult<CourtReservation> {
    let kind: String = r.try_get("kind")?;
    Ok(CourtReservation {
        id: r.try_get("id")?,
        court_id: r.try_get("court_id")?,
        starts_at: r.try_get("starts_at")?,
        ends_at: r.try_get("ends_at")?,
        kind: ReservationKind::from_db_str(&kind).ok_or_else(|| corrupt("kind", &kind))?,
        tournament_id: r.try_get("tournament_id")?,
        active: r.try_get("active")?,
    })
}

fn template_from_row(r: &PgRow) -> TournamentResult<RecurringTournamentTemplate> {
    let advance_days: i32 = r.try_get("advance_days")?;
    Ok(RecurringTournamentTemplate {
        id: r.try_get("id")?,
        rule: serde_json::from_value(r.try_get("rule")?)?,
        advance_days: u32::try_from(advance_days)
            .map_err(|_| corrupt("advance_days", advance_days))?,
        active: r.try_get("active")?,
        blueprint: serde_json::from_value(r.try_get("blueprint")?)?,
        created_at: r.try_get("created_at")?,
    })
}

/// Lock the tournament row and return its status
async fn lock_tournament(
    conn: &mut PgConnection,
    id: TournamentId,
) -> TournamentResult<TournamentStatus> {
    let row = sqlx::query("SELECT status FROM tournaments WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TournamentError::NotFound(Entity::Tournament(id)))?;
    let status: String = row.try_get("status")?;
    TournamentStatus::from_db_str(&status).ok_or_else(|| corrupt("status", &status))
}

/// Insert a tournament and its categories. With `skip_duplicate`, an
/// existing `(template_id, starts_at)` pair yields `None`.
async fn insert_tournament(
    conn: &mut PgConnection,
    new: &NewTournament,
    skip_duplicate: bool,
) -> TournamentResult<Option<Tournament>> {
    let config = &new.config;
    let conflict = if skip_duplicate {
        "ON CONFLICT (template_id, starts_at) DO NOTHING"
    } else {
        ""
    };
    let sql = format!(
        "INSERT INTO tournaments (name, format, team_size, status, starts_at, ends_at, template_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7) {conflict}
         RETURNING {TOURNAMENT_COLUMNS}"
    );
    let Some(row) = sqlx::query(&sql)
        .bind(&config.name)
        .bind(config.format.as_db_str())
        .bind(config.team_size.as_db_str())
        .bind(new.status.as_db_str())
        .bind(config.starts_at)
        .bind(config.ends_at)
        .bind(new.template_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    let tournament = tournament_from_row(&row)?;

    for category in &config.categories {
        sqlx::query(
            "INSERT INTO categories (tournament_id, name, min_rating, max_rating, open_ended, capacity)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(tournament.id)
        .bind(&category.name)
        .bind(category.band.min)
        .bind(category.band.max)
        .bind(category.band.open_ended)
        .bind(category.capacity as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(Some(tournament))
}

/// Validate and insert reservations one by one on an open transaction.
async fn reserve_in(
    conn: &mut PgConnection,
    batch: &[NewReservation],
) -> TournamentResult<BulkReservationReport> {
    let mut report = BulkReservationReport::default();

    for reservation in batch {
        let fail = |reason: &str| ReservationFailure {
            court_id: reservation.court_id,
            starts_at: reservation.starts_at,
            ends_at: reservation.ends_at,
            reason: reason.to_string(),
        };
        if reservation.ends_at <= reservation.starts_at {
            report.failed.push(fail("empty time window"));
            continue;
        }

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(reservation.court_id)
            .execute(&mut *conn)
            .await?;

        let overlapping: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM court_reservations
                WHERE active AND court_id = $1 AND starts_at < $3 AND $2 < ends_at
             )",
        )
        .bind(reservation.court_id)
        .bind(reservation.starts_at)
        .bind(reservation.ends_at)
        .fetch_one(&mut *conn)
        .await?;
        if overlapping {
            report.failed.push(fail("overlaps an active reservation"));
            continue;
        }

        let mut savepoint = Connection::begin(&mut *conn).await?;
        let sql = format!(
            "INSERT INTO court_reservations (court_id, starts_at, ends_at, kind, tournament_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {RESERVATION_COLUMNS}"
        );
        let inserted = sqlx::query(&sql)
            .bind(reservation.court_id)
            .bind(reservation.starts_at)
            .bind(reservation.ends_at)
            .bind(reservation.kind.as_db_str())
            .bind(reservation.tournament_id)
            .fetch_one(&mut *savepoint)
            .await;

        match inserted {
            Ok(row) => {
                savepoint.commit().await?;
                report.created.push(reservation_from_row(&row)?);
            }
            Err(e) if sql_state(&e).as_deref() == Some(EXCLUSION_VIOLATION) => {
                savepoint.rollback().await?;
                report.failed.push(fail("overlaps an active reservation"));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn register_tx(&self, new: &NewParticipant) -> TournamentResult<Participant> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM tournaments WHERE id = $1 FOR SHARE")
                .bind(new.tournament_id)
                .fetch_optional(&mut *tx)
                .await?;
        let status =
            status.ok_or(TournamentError::NotFound(Entity::Tournament(new.tournament_id)))?;
        let status =
            TournamentStatus::from_db_str(&status).ok_or_else(|| corrupt("status", &status))?;
        if status != TournamentStatus::RegistrationOpen {
            return Err(TournamentError::InvalidState {
                tournament_id: new.tournament_id,
                status,
                operation: "register",
            });
        }

        let capacity: Option<i32> = sqlx::query_scalar(
            "SELECT capacity FROM categories WHERE id = $1 AND tournament_id = $2 FOR UPDATE",
        )
        .bind(new.category_id)
        .bind(new.tournament_id)
        .fetch_optional(&mut *tx)
        .await?;
        let capacity =
            capacity.ok_or(TournamentError::NotFound(Entity::Category(new.category_id)))?;
        let capacity = usize::try_from(capacity).map_err(|_| corrupt("capacity", capacity))?;

        let taken: Option<UserId> = sqlx::query_scalar(
            "SELECT user_id FROM participant_members
             WHERE tournament_id = $1 AND user_id = ANY($2) LIMIT 1",
        )
        .bind(new.tournament_id)
        .bind(&new.members)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(user) = taken {
            return Err(TournamentError::AlreadyRegistered(user));
        }

        let registered: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE category_id = $1")
                .bind(new.category_id)
                .fetch_one(&mut *tx)
                .await?;
        if registered as usize >= capacity {
            return Err(TournamentError::CapacityExceeded {
                category_id: new.category_id,
                capacity,
            });
        }

        let row = sqlx::query(
            "INSERT INTO participants (tournament_id, category_id, elo_at_registration)
             VALUES ($1, $2, $3)
             RETURNING id, registered_at",
        )
        .bind(new.tournament_id)
        .bind(new.category_id)
        .bind(new.elo_at_registration)
        .fetch_one(&mut *tx)
        .await?;
        let id: ParticipantId = row.try_get("id")?;

        for (position, user_id) in new.members.iter().enumerate() {
            let inserted = sqlx::query(
                "INSERT INTO participant_members (participant_id, tournament_id, user_id, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(new.tournament_id)
            .bind(user_id)
            .bind(position as i16)
            .execute(&mut *tx)
            .await;
            if let Err(e) = inserted {
                if sql_state(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                    return Err(TournamentError::AlreadyRegistered(*user_id));
                }
                return Err(e.into());
            }
        }

        tx.commit().await?;

        Ok(Participant {
            id,
            tournament_id: new.tournament_id,
            category_id: new.category_id,
            members: new.members.clone(),
            elo_at_registration: new.elo_at_registration,
            seed: None,
            registered_at: row.try_get("registered_at")?,
        })
    }

    async fn cancel_tx(&self, id: TournamentId) -> TournamentResult<CancellationReport> {
        let mut tx = self.pool.begin().await?;
        let status = lock_tournament(&mut tx, id).await?;
        if status.is_terminal() {
            return Err(TournamentError::InvalidState {
                tournament_id: id,
                status,
                operation: "cancel",
            });
        }

        let released = sqlx::query(
            "UPDATE court_reservations SET active = FALSE WHERE tournament_id = $1 AND active",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let cancelled = sqlx::query(
            "UPDATE matches SET status = 'cancelled'
             WHERE tournament_id = $1 AND status IN ('scheduled', 'in_progress')",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("UPDATE tournaments SET status = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CancellationReport {
            cancelled_matches: cancelled as usize,
            released_reservations: released as usize,
        })
    }

    async fn commit_brackets_tx(&self, write: &BracketWrite) -> TournamentResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;
        let status = lock_tournament(&mut tx, write.tournament_id).await?;
        if status != TournamentStatus::RegistrationOpen {
            return Err(TournamentError::InvalidState {
                tournament_id: write.tournament_id,
                status,
                operation: "close registration",
            });
        }

        for &(participant_id, seed) in &write.seeds {
            sqlx::query("UPDATE participants SET seed = $1 WHERE id = $2 AND tournament_id = $3")
                .bind(seed as i32)
                .bind(participant_id)
                .bind(write.tournament_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut created = Vec::new();
        for (category_id, plan) in &write.plans {
            let mut ids = Vec::with_capacity(plan.matches.len());
            for planned in &plan.matches {
                let (team1_id, team1_bye) = planned.team1.to_columns();
                let (team2_id, team2_bye) = planned.team2.to_columns();
                let id: MatchId = sqlx::query_scalar(
                    "INSERT INTO matches (tournament_id, category_id, bracket, round, match_number,
                         team1_id, team1_bye, team2_id, team2_bye, status, winner_id)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                     RETURNING id",
                )
                .bind(write.tournament_id)
                .bind(category_id)
                .bind(planned.bracket.as_db_str())
                .bind(planned.round as i32)
                .bind(planned.match_number as i32)
                .bind(team1_id)
                .bind(team1_bye)
                .bind(team2_id)
                .bind(team2_bye)
                .bind(planned.status.as_db_str())
                .bind(planned.winner)
                .fetch_one(&mut *tx)
                .await?;
                ids.push(id);
            }

            let matches = plan
                .to_matches(write.tournament_id, *category_id, &ids)
                .ok_or_else(|| TournamentError::CorruptRow("bracket plan id mismatch".into()))?;
            for m in &matches {
                if m.winner_advances_to.is_none() && m.loser_advances_to.is_none() {
                    continue;
                }
                sqlx::query(
                    "UPDATE matches SET winner_advances_to = $1, loser_advances_to = $2 WHERE id = $3",
                )
                .bind(m.winner_advances_to)
                .bind(m.loser_advances_to)
                .bind(m.id)
                .execute(&mut *tx)
                .await?;
            }
            created.extend(matches);
        }

        sqlx::query("UPDATE tournaments SET status = 'registration_closed' WHERE id = $1")
            .bind(write.tournament_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn record_result_tx(&self, write: &ResultWrite) -> TournamentResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Results for one tournament are applied one at a time
        let status = lock_tournament(&mut tx, write.tournament_id).await?;
        if status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                tournament_id: write.tournament_id,
                status,
                operation: "record results",
            });
        }

        let select = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE");
        for previous in &write.previous {
            let row = sqlx::query(&select)
                .bind(previous.id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(TournamentError::NotFound(Entity::Match(previous.id)))?;
            if !match_from_row(&row)?.same_progress(previous) {
                return Err(TournamentError::ConcurrentUpdate(previous.id));
            }
        }

        let users: Vec<UserId> = write.ratings.iter().map(|c| c.user_id).collect();
        let stored = sqlx::query(
            "SELECT user_id, rating FROM user_ratings WHERE user_id = ANY($1) FOR UPDATE",
        )
        .bind(&users)
        .fetch_all(&mut *tx)
        .await?;
        for row in &stored {
            let user_id: UserId = row.try_get("user_id")?;
            let rating: f64 = row.try_get("rating")?;
            if write
                .ratings
                .iter()
                .any(|c| c.user_id == user_id && c.before != rating)
            {
                return Err(TournamentError::ConcurrentUpdate(write.trigger));
            }
        }

        for m in &write.matches {
            let (team1_id, team1_bye) = m.team1.to_columns();
            let (team2_id, team2_bye) = m.team2.to_columns();
            sqlx::query(
                "UPDATE matches SET team1_id = $1, team1_bye = $2, team2_id = $3, team2_bye = $4,
                     status = $5, team1_score = $6, team2_score = $7, winner_id = $8
                 WHERE id = $9",
            )
            .bind(team1_id)
            .bind(team1_bye)
            .bind(team2_id)
            .bind(team2_bye)
            .bind(m.status.as_db_str())
            .bind(m.team1_score.map(|s| s as i32))
            .bind(m.team2_score.map(|s| s as i32))
            .bind(m.winner)
            .bind(m.id)
            .execute(&mut *tx)
            .await?;
        }

        for change in &write.ratings {
            sqlx::query(
                "INSERT INTO user_ratings (user_id, rating) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO UPDATE SET rating = EXCLUDED.rating, updated_at = NOW()",
            )
            .bind(change.user_id)
            .bind(change.after)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO rating_history (user_id, match_id, rating_before, rating_after)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(change.user_id)
            .bind(write.trigger)
            .bind(change.before)
            .bind(change.after)
            .execute(&mut *tx)
            .await?;
        }

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM matches
             WHERE tournament_id = $1 AND status IN ('scheduled', 'in_progress')",
        )
        .bind(write.tournament_id)
        .fetch_one(&mut *tx)
        .await?;
        let finished = open == 0;
        if finished {
            sqlx::query("UPDATE tournaments SET status = 'completed' WHERE id = $1")
                .bind(write.tournament_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(finished)
    }

    async fn commit_schedule_tx(
        &self,
        assignments: &[MatchAssignment],
        reservations: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport> {
        let mut tx = self.pool.begin().await?;

        for a in assignments {
            let updated = sqlx::query(
                "UPDATE matches SET court_id = $1, slot_starts_at = $2, slot_ends_at = $3 WHERE id = $4",
            )
            .bind(a.court_id)
            .bind(a.slot.starts_at)
            .bind(a.slot.ends_at)
            .bind(a.match_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if updated == 0 {
                return Err(TournamentError::NotFound(Entity::Match(a.match_id)));
            }
        }

        let report = reserve_in(&mut tx, reservations).await?;
        tx.commit().await?;
        Ok(report)
    }

    async fn stamp_tx(
        &self,
        id: TemplateId,
        new: &NewTournament,
    ) -> TournamentResult<Option<Tournament>> {
        let mut tx = self.pool.begin().await?;
        let new = NewTournament {
            template_id: Some(id),
            ..new.clone()
        };
        let stamped = insert_tournament(&mut tx, &new, true).await?;
        tx.commit().await?;
        Ok(stamped)
    }
}

#[async_trait]
impl TournamentRepository for PgStore {
    async fn create_tournament(&self, new: &NewTournament) -> TournamentResult<Tournament> {
        let mut tx = self.pool.begin().await?;
        let tournament = insert_tournament(&mut tx, new, false)
            .await?
            .ok_or_else(|| {
                TournamentError::CorruptRow("tournament insert returned no row".into())
            })?;
        tx.commit().await?;
        Ok(tournament)
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;
        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let sql = format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE $1::TEXT IS NULL OR status = $1
             ORDER BY starts_at, id"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(status.map(|s| s.as_db_str()))
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(tournament_from_row).collect()
    }

    async fn transition_status(
        &self,
        id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        if from.can_transition_to(to) {
            let sql = format!(
                "UPDATE tournaments SET status = $1 WHERE id = $2 AND status = $3
                 RETURNING {TOURNAMENT_COLUMNS}"
            );
            let row = sqlx::query(&sql)
                .bind(to.as_db_str())
                .bind(id)
                .bind(from.as_db_str())
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                return tournament_from_row(&row);
            }
        }

        let current = self
            .get_tournament(id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Tournament(id)))?;
        Err(TournamentError::InvalidState {
            tournament_id: id,
            status: current.status,
            operation: to.transition_verb(),
        })
    }

    async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<CancellationReport> {
        within(DEFAULT_TRANSACTION_TIMEOUT, self.cancel_tx(id)).await
    }

    async fn list_categories(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Category>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT c.id, c.tournament_id, c.name, c.min_rating, c.max_rating, c.open_ended,
                        c.capacity,
                        (SELECT COUNT(*) FROM participants p WHERE p.category_id = c.id)
                            AS registered_count
                 FROM categories c WHERE c.tournament_id = $1 ORDER BY c.id",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn register_participant(&self, new: &NewParticipant) -> TournamentResult<Participant> {
        within(DEFAULT_TRANSACTION_TIMEOUT, self.register_tx(new)).await
    }

    async fn remove_participant(&self, participant_id: ParticipantId) -> TournamentResult<()> {
        let deleted = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(participant_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(TournamentError::NotFound(Entity::Participant(participant_id)));
        }
        Ok(())
    }

    async fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> TournamentResult<Option<Participant>> {
        let sql = format!("{PARTICIPANT_SELECT} WHERE p.id = $1 GROUP BY p.id");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(participant_id)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(participant_from_row).transpose()
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Participant>> {
        let sql =
            format!("{PARTICIPANT_SELECT} WHERE p.tournament_id = $1 GROUP BY p.id ORDER BY p.id");
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(participant_from_row).collect()
    }
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn commit_brackets(&self, write: &BracketWrite) -> TournamentResult<Vec<Match>> {
        within(DEFAULT_TRANSACTION_TIMEOUT, self.commit_brackets_tx(write)).await
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1
             ORDER BY category_id, round, match_number"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn record_result(&self, write: &ResultWrite) -> TournamentResult<bool> {
        within(DEFAULT_TRANSACTION_TIMEOUT, self.record_result_tx(write)).await
    }

    async fn commit_schedule(
        &self,
        assignments: &[MatchAssignment],
        reservations: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport> {
        within(
            DEFAULT_TRANSACTION_TIMEOUT,
            self.commit_schedule_tx(assignments, reservations),
        )
        .await
    }
}

#[async_trait]
impl ReservationRepository for PgStore {
    async fn active_reservations(
        &self,
        court_id: Option<CourtId>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> TournamentResult<Vec<CourtReservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM court_reservations
             WHERE active AND ($1::BIGINT IS NULL OR court_id = $1)
               AND starts_at < $3 AND $2 < ends_at
             ORDER BY court_id, starts_at"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(court_id)
                .bind(from)
                .bind(until)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(reservation_from_row).collect()
    }

    async fn create_reservations(
        &self,
        batch: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport> {
        within(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            let report = reserve_in(&mut tx, batch).await?;
            tx.commit().await?;
            Ok(report)
        })
        .await
    }

    async fn tournament_reservations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<CourtReservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM court_reservations
             WHERE tournament_id = $1 ORDER BY starts_at, court_id"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(reservation_from_row).collect()
    }
}

#[async_trait]
impl TemplateRepository for PgStore {
    async fn create_template(
        &self,
        new: &NewTemplate,
    ) -> TournamentResult<RecurringTournamentTemplate> {
        let sql = format!(
            "INSERT INTO recurring_templates (pattern, rule, blueprint, advance_days)
             VALUES ($1, $2, $3, $4)
             RETURNING {TEMPLATE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new.rule.pattern.as_db_str())
            .bind(serde_json::to_value(&new.rule)?)
            .bind(serde_json::to_value(&new.blueprint)?)
            .bind(new.advance_days as i32)
            .fetch_one(&self.pool)
            .await?;
        template_from_row(&row)
    }

    async fn get_template(
        &self,
        id: TemplateId,
    ) -> TournamentResult<Option<RecurringTournamentTemplate>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;
        row.as_ref().map(template_from_row).transpose()
    }

    async fn list_templates(
        &self,
        active_only: bool,
    ) -> TournamentResult<Vec<RecurringTournamentTemplate>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates
             WHERE active OR NOT $1 ORDER BY id"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(active_only)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(template_from_row).collect()
    }

    async fn set_template_active(&self, id: TemplateId, active: bool) -> TournamentResult<()> {
        let updated = sqlx::query("UPDATE recurring_templates SET active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(TournamentError::NotFound(Entity::Template(id)));
        }
        Ok(())
    }

    async fn instance_starts(&self, id: TemplateId) -> TournamentResult<HashSet<DateTime<Utc>>> {
        let starts: Vec<DateTime<Utc>> = with_default_timeout(
            sqlx::query_scalar("SELECT starts_at FROM tournaments WHERE template_id = $1")
                .bind(id)
                .fetch_all(&self.pool),
        )
        .await?;
        Ok(starts.into_iter().collect())
    }

    async fn stamp_instance(
        &self,
        id: TemplateId,
        new: &NewTournament,
    ) -> TournamentResult<Option<Tournament>> {
        within(DEFAULT_TRANSACTION_TIMEOUT, self.stamp_tx(id, new)).await
    }
}

#[async_trait]
impl RatingRepository for PgStore {
    async fn get_ratings(&self, user_ids: &[UserId]) -> TournamentResult<HashMap<UserId, f64>> {
        let rows = with_default_timeout(
            sqlx::query("SELECT user_id, rating FROM user_ratings WHERE user_id = ANY($1)")
                .bind(user_ids)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter()
            .map(|r| -> TournamentResult<(UserId, f64)> {
                Ok((r.try_get("user_id")?, r.try_get("rating")?))
            })
            .collect()
    }

    async fn set_rating(&self, user_id: UserId, rating: f64) -> TournamentResult<()> {
        sqlx::query(
            "INSERT INTO user_ratings (user_id, rating) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET rating = EXCLUDED.rating, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rating_history(&self, user_id: UserId) -> TournamentResult<Vec<RatingHistoryEntry>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT user_id, match_id, rating_before, rating_after, recorded_at
                 FROM rating_history WHERE user_id = $1 ORDER BY recorded_at, id",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter()
            .map(|r| -> TournamentResult<RatingHistoryEntry> {
                Ok(RatingHistoryEntry {
                    user_id: r.try_get("user_id")?,
                    match_id: r.try_get("match_id")?,
                    before: r.try_get("rating_before")?,
                    after: r.try_get("rating_after")?,
                    recorded_at: r.try_get("recorded_at")?,
                })
            })
            .collect()
    }
}
