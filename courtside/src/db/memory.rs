//! In-process store.
//!
//! All state sits behind one async mutex, so every trait method is a single
//! atomic unit of work. Used by tests and by embedders without PostgreSQL.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::repository::{
    BracketWrite, CancellationReport, MatchRepository, RatingHistoryEntry, RatingRepository,
    ReservationRepository, ResultWrite, TemplateRepository, TournamentRepository,
};
use crate::recurrence::{NewTemplate, RecurringTournamentTemplate, TemplateId};
use crate::scheduling::{
    BulkReservationReport, CourtReservation, MatchAssignment, NewReservation, ReservationFailure,
};
use crate::tournament::errors::{Entity, TournamentError, TournamentResult};
use crate::tournament::models::{
    Category, CourtAssignment, CourtId, Match, MatchId, MatchStatus, NewParticipant, NewTournament,
    Participant, ParticipantId, Tournament, TournamentId, TournamentStatus, UserId,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    tournaments: BTreeMap<TournamentId, Tournament>,
    categories: BTreeMap<i64, Category>,
    participants: BTreeMap<ParticipantId, Participant>,
    matches: BTreeMap<MatchId, Match>,
    reservations: BTreeMap<i64, CourtReservation>,
    templates: BTreeMap<TemplateId, RecurringTournamentTemplate>,
    ratings: HashMap<UserId, f64>,
    history: Vec<RatingHistoryEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tournament(&self, id: TournamentId) -> TournamentResult<&Tournament> {
        self.tournaments
            .get(&id)
            .ok_or(TournamentError::NotFound(Entity::Tournament(id)))
    }

    fn tournament_mut(&mut self, id: TournamentId) -> TournamentResult<&mut Tournament> {
        self.tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(Entity::Tournament(id)))
    }

    fn registered(&self, category_id: i64) -> usize {
        self.participants
            .values()
            .filter(|p| p.category_id == category_id)
            .count()
    }

    fn with_count(&self, category: &Category) -> Category {
        Category {
            registered_count: self.registered(category.id),
            ..category.clone()
        }
    }

    fn insert_tournament(&mut self, new: &NewTournament) -> Tournament {
        let id = self.next_id();
        let config = &new.config;
        let tournament = Tournament {
            id,
            name: config.name.clone(),
            format: config.format,
            team_size: config.team_size,
            status: new.status,
            starts_at: config.starts_at,
            ends_at: config.ends_at,
            template_id: new.template_id,
            created_at: Utc::now(),
        };
        self.tournaments.insert(id, tournament.clone());

        for category in &config.categories {
            let category_id = self.next_id();
            self.categories.insert(
                category_id,
                Category {
                    id: category_id,
                    tournament_id: id,
                    name: category.name.clone(),
                    band: category.band,
                    capacity: category.capacity,
                    registered_count: 0,
                },
            );
        }
        tournament
    }

    fn conflicting(&self, reservation: &NewReservation) -> bool {
        self.reservations.values().any(|existing| {
            existing.blocks(
                reservation.court_id,
                reservation.starts_at,
                reservation.ends_at,
            )
        })
    }

    fn reserve(&mut self, batch: &[NewReservation]) -> BulkReservationReport {
        let mut report = BulkReservationReport::default();
        for reservation in batch {
            if reservation.ends_at <= reservation.starts_at {
                report.failed.push(failure(reservation, "empty time window"));
                continue;
            }
            if self.conflicting(reservation) {
                report
                    .failed
                    .push(failure(reservation, "overlaps an active reservation"));
                continue;
            }
            let id = self.next_id();
            let created = CourtReservation {
                id,
                court_id: reservation.court_id,
                starts_at: reservation.starts_at,
                ends_at: reservation.ends_at,
                kind: reservation.kind,
                tournament_id: reservation.tournament_id,
                active: true,
            };
            self.reservations.insert(id, created.clone());
            report.created.push(created);
        }
        report
    }
}

fn failure(reservation: &NewReservation, reason: &str) -> ReservationFailure {
    ReservationFailure {
        court_id: reservation.court_id,
        starts_at: reservation.starts_at,
        ends_at: reservation.ends_at,
        reason: reason.to_string(),
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed stored ratings
    pub async fn with_ratings(self, ratings: impl IntoIterator<Item = (UserId, f64)>) -> Self {
        self.state.lock().await.ratings.extend(ratings);
        self
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn create_tournament(&self, new: &NewTournament) -> TournamentResult<Tournament> {
        Ok(self.state.lock().await.insert_tournament(new))
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.state.lock().await.tournaments.get(&id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let state = self.state.lock().await;
        Ok(state
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let mut state = self.state.lock().await;
        let tournament = state.tournament_mut(id)?;
        if tournament.status != from || !from.can_transition_to(to) {
            return Err(TournamentError::InvalidState {
                tournament_id: id,
                status: tournament.status,
                operation: to.transition_verb(),
            });
        }
        tournament.status = to;
        Ok(tournament.clone())
    }

    async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<CancellationReport> {
        let mut state = self.state.lock().await;
        let status = state.tournament(id)?.status;
        if status.is_terminal() {
            return Err(TournamentError::InvalidState {
                tournament_id: id,
                status,
                operation: "cancel",
            });
        }

        let mut report = CancellationReport::default();
        for reservation in state.reservations.values_mut() {
            if reservation.active && reservation.tournament_id == Some(id) {
                reservation.active = false;
                report.released_reservations += 1;
            }
        }
        for m in state.matches.values_mut() {
            if m.tournament_id == id && !m.status.is_terminal() {
                m.status = MatchStatus::Cancelled;
                report.cancelled_matches += 1;
            }
        }
        state.tournament_mut(id)?.status = TournamentStatus::Cancelled;
        Ok(report)
    }

    async fn list_categories(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Category>> {
        let state = self.state.lock().await;
        state.tournament(tournament_id)?;
        Ok(state
            .categories
            .values()
            .filter(|c| c.tournament_id == tournament_id)
            .map(|c| state.with_count(c))
            .collect())
    }

    async fn register_participant(&self, new: &NewParticipant) -> TournamentResult<Participant> {
        let mut state = self.state.lock().await;
        let status = state.tournament(new.tournament_id)?.status;
        if status != TournamentStatus::RegistrationOpen {
            return Err(TournamentError::InvalidState {
                tournament_id: new.tournament_id,
                status,
                operation: "register",
            });
        }

        let category = state
            .categories
            .get(&new.category_id)
            .filter(|c| c.tournament_id == new.tournament_id)
            .ok_or(TournamentError::NotFound(Entity::Category(new.category_id)))?;
        let capacity = category.capacity;

        let taken = state
            .participants
            .values()
            .filter(|p| p.tournament_id == new.tournament_id)
            .flat_map(|p| p.members.iter())
            .find(|user| new.members.contains(user));
        if let Some(&user) = taken {
            return Err(TournamentError::AlreadyRegistered(user));
        }

        if state.registered(new.category_id) >= capacity {
            return Err(TournamentError::CapacityExceeded {
                category_id: new.category_id,
                capacity,
            });
        }

        let id = state.next_id();
        let participant = Participant {
            id,
            tournament_id: new.tournament_id,
            category_id: new.category_id,
            members: new.members.clone(),
            elo_at_registration: new.elo_at_registration,
            seed: None,
            registered_at: Utc::now(),
        };
        state.participants.insert(id, participant.clone());
        Ok(participant)
    }

    async fn remove_participant(&self, participant_id: ParticipantId) -> TournamentResult<()> {
        self.state
            .lock()
            .await
            .participants
            .remove(&participant_id)
            .map(|_| ())
            .ok_or(TournamentError::NotFound(Entity::Participant(participant_id)))
    }

    async fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> TournamentResult<Option<Participant>> {
        Ok(self
            .state
            .lock()
            .await
            .participants
            .get(&participant_id)
            .cloned())
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Participant>> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn commit_brackets(&self, write: &BracketWrite) -> TournamentResult<Vec<Match>> {
        let mut state = self.state.lock().await;
        let status = state.tournament(write.tournament_id)?.status;
        if status != TournamentStatus::RegistrationOpen {
            return Err(TournamentError::InvalidState {
                tournament_id: write.tournament_id,
                status,
                operation: "close registration",
            });
        }

        for &(participant_id, seed) in &write.seeds {
            if let Some(p) = state.participants.get_mut(&participant_id) {
                p.seed = Some(seed);
            }
        }

        let mut created = Vec::new();
        for (category_id, plan) in &write.plans {
            let ids: Vec<MatchId> = plan.matches.iter().map(|_| state.next_id()).collect();
            let matches = plan
                .to_matches(write.tournament_id, *category_id, &ids)
                .ok_or_else(|| TournamentError::CorruptRow("bracket plan id mismatch".into()))?;
            for m in matches {
                state.matches.insert(m.id, m.clone());
                created.push(m);
            }
        }

        state.tournament_mut(write.tournament_id)?.status = TournamentStatus::RegistrationClosed;
        Ok(created)
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.state.lock().await.matches.get(&id).cloned())
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let state = self.state.lock().await;
        Ok(state
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn record_result(&self, write: &ResultWrite) -> TournamentResult<bool> {
        let mut state = self.state.lock().await;
        let status = state.tournament(write.tournament_id)?.status;
        if status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                tournament_id: write.tournament_id,
                status,
                operation: "record results",
            });
        }
        for previous in &write.previous {
            let current = state
                .matches
                .get(&previous.id)
                .ok_or(TournamentError::NotFound(Entity::Match(previous.id)))?;
            if !current.same_progress(previous) {
                return Err(TournamentError::ConcurrentUpdate(previous.id));
            }
        }
        for change in &write.ratings {
            if state
                .ratings
                .get(&change.user_id)
                .is_some_and(|stored| *stored != change.before)
            {
                return Err(TournamentError::ConcurrentUpdate(write.trigger));
            }
        }

        for m in &write.matches {
            // Results never move a match to another court
            let assignment = state.matches.get(&m.id).and_then(|stored| stored.assignment);
            state.matches.insert(
                m.id,
                Match {
                    assignment,
                    ..m.clone()
                },
            );
        }
        let now = Utc::now();
        for change in &write.ratings {
            state.ratings.insert(change.user_id, change.after);
            state.history.push(RatingHistoryEntry {
                user_id: change.user_id,
                match_id: Some(write.trigger),
                before: change.before,
                after: change.after,
                recorded_at: now,
            });
        }

        let finished = state
            .matches
            .values()
            .filter(|m| m.tournament_id == write.tournament_id)
            .all(|m| m.status.is_terminal());
        if finished {
            state.tournament_mut(write.tournament_id)?.status = TournamentStatus::Completed;
        }
        Ok(finished)
    }

    async fn commit_schedule(
        &self,
        assignments: &[MatchAssignment],
        reservations: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport> {
        let mut state = self.state.lock().await;
        if let Some(missing) = assignments
            .iter()
            .find(|a| !state.matches.contains_key(&a.match_id))
        {
            return Err(TournamentError::NotFound(Entity::Match(missing.match_id)));
        }
        for a in assignments {
            if let Some(m) = state.matches.get_mut(&a.match_id) {
                m.assignment = Some(CourtAssignment {
                    court_id: a.court_id,
                    starts_at: a.slot.starts_at,
                    ends_at: a.slot.ends_at,
                });
            }
        }
        Ok(state.reserve(reservations))
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn active_reservations(
        &self,
        court_id: Option<CourtId>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> TournamentResult<Vec<CourtReservation>> {
        let state = self.state.lock().await;
        Ok(state
            .reservations
            .values()
            .filter(|r| court_id.is_none_or(|c| r.court_id == c))
            .filter(|r| r.blocks(r.court_id, from, until))
            .cloned()
            .collect())
    }

    async fn create_reservations(
        &self,
        batch: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport> {
        Ok(self.state.lock().await.reserve(batch))
    }

    async fn tournament_reservations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<CourtReservation>> {
        let state = self.state.lock().await;
        Ok(state
            .reservations
            .values()
            .filter(|r| r.tournament_id == Some(tournament_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TemplateRepository for MemoryStore {
    async fn create_template(
        &self,
        new: &NewTemplate,
    ) -> TournamentResult<RecurringTournamentTemplate> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let template = RecurringTournamentTemplate {
            id,
            rule: new.rule.clone(),
            advance_days: new.advance_days,
            active: true,
            blueprint: new.blueprint.clone(),
            created_at: Utc::now(),
        };
        state.templates.insert(id, template.clone());
        Ok(template)
    }

    async fn get_template(
        &self,
        id: TemplateId,
    ) -> TournamentResult<Option<RecurringTournamentTemplate>> {
        Ok(self.state.lock().await.templates.get(&id).cloned())
    }

    async fn list_templates(
        &self,
        active_only: bool,
    ) -> TournamentResult<Vec<RecurringTournamentTemplate>> {
        let state = self.state.lock().await;
        Ok(state
            .templates
            .values()
            .filter(|t| t.active || !active_only)
            .cloned()
            .collect())
    }

    async fn set_template_active(&self, id: TemplateId, active: bool) -> TournamentResult<()> {
        let mut state = self.state.lock().await;
        let template = state
            .templates
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(Entity::Template(id)))?;
        template.active = active;
        Ok(())
    }

    async fn instance_starts(&self, id: TemplateId) -> TournamentResult<HashSet<DateTime<Utc>>> {
        let state = self.state.lock().await;
        Ok(state
            .tournaments
            .values()
            .filter(|t| t.template_id == Some(id))
            .map(|t| t.starts_at)
            .collect())
    }

    async fn stamp_instance(
        &self,
        id: TemplateId,
        new: &NewTournament,
    ) -> TournamentResult<Option<Tournament>> {
        let mut state = self.state.lock().await;
        let exists = state
            .tournaments
            .values()
            .any(|t| t.template_id == Some(id) && t.starts_at == new.config.starts_at);
        if exists {
            return Ok(None);
        }
        let new = NewTournament {
            template_id: Some(id),
            ..new.clone()
        };
        Ok(Some(state.insert_tournament(&new)))
    }
}

#[async_trait]
impl RatingRepository for MemoryStore {
    async fn get_ratings(&self, user_ids: &[UserId]) -> TournamentResult<HashMap<UserId, f64>> {
        let state = self.state.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.ratings.get(id).map(|r| (*id, *r)))
            .collect())
    }

    async fn set_rating(&self, user_id: UserId, rating: f64) -> TournamentResult<()> {
        self.state.lock().await.ratings.insert(user_id, rating);
        Ok(())
    }

    async fn rating_history(&self, user_id: UserId) -> TournamentResult<Vec<RatingHistoryEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }
}
