//! Tournament manager: registration, brackets, scheduling, results and
//! recurring instances.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::config::CoreConfig;
use super::errors::{Entity, TournamentError, TournamentResult};
use super::models::{
    BracketSide, BulkRegistrationReport, Category, CategoryId, Match, MatchId, MatchOutcome,
    NewParticipant, NewTournament, Participant, ParticipantId, RegistrationFailure,
    RegistrationRequest, ScheduleOutcome, ScheduleRequest, Tournament, TournamentConfig,
    TournamentId, TournamentInfo, TournamentStatus, UserId,
};
use crate::advancement::{self, Advancement, AdvancementResult, MatchArena, MatchResult, RatedPair};
use crate::auth::Principal;
use crate::booking::{BookingService, courts_free_for_all};
use crate::bracket::{BracketError, BracketGenerator, GenerateBracket, seed_participants};
use crate::db::{BracketWrite, CancellationReport, ResultWrite, Store};
use crate::eligibility::{EligibilityReport, ExclusionReason, evaluate, team_rating};
use crate::rating::{PlayerRating, RatingChange, update_ratings};
use crate::recurrence::{
    GenerationReport, GenerationWindow, MAX_ADVANCE_DAYS, NewTemplate, RecurrenceError,
    RecurringTournamentTemplate, TemplateId, occurrences, validate_rule,
};
use crate::scheduling::{self, CourtReservation, TimeSlot};

/// How often a result is re-applied after losing a race with another write
const RESULT_ATTEMPTS: usize = 5;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn Store>,
    booking: Arc<dyn BookingService>,
    config: CoreConfig,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(
        store: Arc<dyn Store>,
        booking: Arc<dyn BookingService>,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            booking,
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    async fn tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.store
            .get_tournament(id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Tournament(id)))
    }

    async fn participant(&self, id: ParticipantId) -> TournamentResult<Participant> {
        self.store
            .get_participant(id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Participant(id)))
    }

    fn require_status(
        tournament: &Tournament,
        allowed: &[TournamentStatus],
        operation: &'static str,
    ) -> TournamentResult<()> {
        if allowed.contains(&tournament.status) {
            Ok(())
        } else {
            Err(TournamentError::InvalidState {
                tournament_id: tournament.id,
                status: tournament.status,
                operation,
            })
        }
    }

    /// Create a tournament in DRAFT
    pub async fn create_tournament(
        &self,
        config: TournamentConfig,
    ) -> TournamentResult<Tournament> {
        validate_config(&config)?;
        let tournament = self
            .store
            .create_tournament(&NewTournament {
                config,
                status: TournamentStatus::Draft,
                template_id: None,
            })
            .await?;

        log::info!(
            "Created tournament {} '{}' ({:?})",
            tournament.id,
            tournament.name,
            tournament.format
        );
        Ok(tournament)
    }

    /// DRAFT -> REGISTRATION_OPEN
    pub async fn open_registration(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let tournament = self
            .store
            .transition_status(id, TournamentStatus::Draft, TournamentStatus::RegistrationOpen)
            .await?;
        log::info!("Tournament {id} opened registration");
        Ok(tournament)
    }

    /// Rating a group of users would register with.
    ///
    /// Stored ratings win; the caller falls back to the rating on their
    /// principal, anyone else to the configured default.
    async fn registration_rating(
        &self,
        tournament: &Tournament,
        members: &[UserId],
        caller: Option<&Principal>,
    ) -> TournamentResult<f64> {
        let stored = self.store.get_ratings(members).await?;
        let ratings: Vec<f64> = members
            .iter()
            .map(|user| match stored.get(user) {
                Some(rating) => *rating,
                None => caller
                    .filter(|p| p.user_id == *user)
                    .map_or(self.config.default_rating, |p| p.rating),
            })
            .collect();
        Ok(team_rating(tournament.team_size, &ratings)?)
    }

    fn members_of(principal: &Principal, partner: Option<UserId>) -> Vec<UserId> {
        std::iter::once(principal.user_id).chain(partner).collect()
    }

    /// Categories of a tournament the caller (with an optional partner) may
    /// enter, and why the others are closed to them
    pub async fn check_eligibility(
        &self,
        tournament_id: TournamentId,
        principal: &Principal,
        partner: Option<UserId>,
    ) -> TournamentResult<EligibilityReport> {
        let tournament = self.tournament(tournament_id).await?;
        let members = Self::members_of(principal, partner);
        let rating = self
            .registration_rating(&tournament, &members, Some(principal))
            .await?;
        let categories = self.store.list_categories(tournament_id).await?;
        Ok(evaluate(rating, &categories))
    }

    async fn register_members(
        &self,
        tournament: &Tournament,
        categories: &[Category],
        category_id: CategoryId,
        members: Vec<UserId>,
        caller: Option<&Principal>,
    ) -> TournamentResult<Participant> {
        Self::require_status(tournament, &[TournamentStatus::RegistrationOpen], "register")?;
        if !categories.iter().any(|c| c.id == category_id) {
            return Err(TournamentError::NotFound(Entity::Category(category_id)));
        }

        let rating = self
            .registration_rating(tournament, &members, caller)
            .await?;
        let report = evaluate(rating, categories);
        if !report.is_eligible_for(category_id) {
            let full = report
                .exclusion_for(category_id)
                .and_then(|exclusion| match exclusion.reason {
                    ExclusionReason::CapacityFull { capacity } => Some(capacity),
                    _ => None,
                });
            return Err(match full {
                Some(capacity) => TournamentError::CapacityExceeded {
                    category_id,
                    capacity,
                },
                None => TournamentError::IneligibleRating {
                    rating,
                    exclusions: report.excluded,
                },
            });
        }

        let participant = self
            .store
            .register_participant(&NewParticipant {
                tournament_id: tournament.id,
                category_id,
                members,
                elo_at_registration: rating,
            })
            .await?;

        log::info!(
            "Participant {} registered in tournament {} category {} at {:.2}",
            participant.id,
            tournament.id,
            category_id,
            rating
        );
        Ok(participant)
    }

    /// Register the caller (and partner, for doubles) into a category
    pub async fn register(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
        principal: &Principal,
        partner: Option<UserId>,
    ) -> TournamentResult<Participant> {
        let tournament = self.tournament(tournament_id).await?;
        let categories = self.store.list_categories(tournament_id).await?;
        let members = Self::members_of(principal, partner);

        let result = self
            .register_members(&tournament, &categories, category_id, members, Some(principal))
            .await;
        if let Err(e) = &result {
            log::warn!(
                "Registration of user {} in tournament {tournament_id} rejected: {e}",
                principal.user_id
            );
        }
        result
    }

    /// Register many entries; each one succeeds or fails on its own
    pub async fn register_bulk(
        &self,
        tournament_id: TournamentId,
        requests: Vec<RegistrationRequest>,
    ) -> TournamentResult<BulkRegistrationReport> {
        let tournament = self.tournament(tournament_id).await?;
        Self::require_status(&tournament, &[TournamentStatus::RegistrationOpen], "register")?;

        let mut report = BulkRegistrationReport::default();
        for request in requests {
            // Counts change with every accepted entry
            let categories = self.store.list_categories(tournament_id).await?;
            match self
                .register_members(
                    &tournament,
                    &categories,
                    request.category_id,
                    request.members.clone(),
                    None,
                )
                .await
            {
                Ok(participant) => report.registered.push(participant),
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => report.failed.push(RegistrationFailure {
                    members: request.members,
                    reason: e.client_message(),
                }),
            }
        }

        log::info!(
            "Bulk registration for tournament {tournament_id}: {} accepted, {} refused",
            report.registered.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Withdraw a participant while registration is still open.
    ///
    /// Only a member of the participant or an admin may do this.
    pub async fn unregister(
        &self,
        participant_id: ParticipantId,
        principal: &Principal,
    ) -> TournamentResult<()> {
        let participant = self.participant(participant_id).await?;
        if !principal.is_admin && !participant.members.contains(&principal.user_id) {
            return Err(TournamentError::Forbidden(
                "only a member or an admin can withdraw a participant".to_string(),
            ));
        }

        let tournament = self.tournament(participant.tournament_id).await?;
        Self::require_status(&tournament, &[TournamentStatus::RegistrationOpen], "unregister")?;

        self.store.remove_participant(participant_id).await?;
        log::info!(
            "Participant {participant_id} withdrew from tournament {}",
            tournament.id
        );
        Ok(())
    }

    /// Close registration: seed every category and generate its bracket.
    ///
    /// Categories with fewer than two participants get no bracket.
    /// `courts_available` sizes round-robin rounds.
    pub async fn close_registration(
        &self,
        tournament_id: TournamentId,
        courts_available: usize,
    ) -> TournamentResult<Vec<Match>> {
        let tournament = self.tournament(tournament_id).await?;
        Self::require_status(
            &tournament,
            &[TournamentStatus::RegistrationOpen],
            "close registration",
        )?;

        let participants = self.store.list_participants(tournament_id).await?;
        let categories = self.store.list_categories(tournament_id).await?;
        let generator = BracketGenerator::for_format(tournament.format, courts_available);

        let mut write = BracketWrite {
            tournament_id,
            seeds: Vec::new(),
            plans: Vec::new(),
        };
        let mut largest = 0;
        for category in &categories {
            let entries: Vec<Participant> = participants
                .iter()
                .filter(|p| p.category_id == category.id)
                .cloned()
                .collect();
            largest = largest.max(entries.len());
            if entries.len() < 2 {
                log::warn!(
                    "Tournament {tournament_id} category '{}' has {} participant(s), no bracket generated",
                    category.name,
                    entries.len()
                );
                continue;
            }

            let seeded = seed_participants(&entries);
            let plan = generator.generate(&seeded)?;
            write
                .seeds
                .extend(seeded.iter().map(|s| (s.participant_id, s.seed)));
            write.plans.push((category.id, plan));
        }

        if write.plans.is_empty() {
            return Err(BracketError::TooFewParticipants {
                needed: 2,
                actual: largest,
            }
            .into());
        }

        let matches = self.store.commit_brackets(&write).await?;
        log::info!(
            "Tournament {tournament_id} closed registration: {} categories, {} matches",
            write.plans.len(),
            matches.len()
        );
        Ok(matches)
    }

    /// Assign courts and times to the open matches of a tournament.
    ///
    /// Once the tournament holds court blocks, later runs place newly
    /// playable matches inside those blocks; the requested courts and slots
    /// are not used and no further blocks are taken.
    pub async fn schedule(
        &self,
        tournament_id: TournamentId,
        request: ScheduleRequest,
    ) -> TournamentResult<ScheduleOutcome> {
        let tournament = self.tournament(tournament_id).await?;
        Self::require_status(
            &tournament,
            &[TournamentStatus::RegistrationClosed, TournamentStatus::InProgress],
            "schedule",
        )?;

        let held: Vec<CourtReservation> = self
            .store
            .tournament_reservations(tournament_id)
            .await?
            .into_iter()
            .filter(|r| r.active)
            .collect();
        if !held.is_empty() {
            return self.schedule_within_blocks(&tournament, &held).await;
        }

        let slots = match request.slots {
            Some(slots) => slots,
            None => TimeSlot::consecutive(
                tournament.starts_at,
                tournament.ends_at,
                Duration::minutes(self.config.slot_minutes),
            ),
        };
        scheduling::validate_slots(&slots)?;

        let courts = courts_free_for_all(self.booking.as_ref(), &request.courts, &slots).await?;
        let matches = self.store.list_matches(tournament_id).await?;
        let plan = scheduling::plan(tournament.format, &matches, &slots, &courts)?;
        for warning in &plan.warnings {
            log::warn!("Tournament {tournament_id} schedule: {warning:?}");
        }

        let reservations = if request.reserve {
            scheduling::reservations_for(&plan, tournament_id)
        } else {
            Vec::new()
        };
        let report = self
            .store
            .commit_schedule(&plan.assignments, &reservations)
            .await?;
        for failure in &report.failed {
            log::warn!(
                "Tournament {tournament_id}: court {} not held at {}: {}",
                failure.court_id,
                failure.starts_at,
                failure.reason
            );
        }

        log::info!(
            "Tournament {tournament_id} scheduled: {} of {} matches on {} courts, {} blocks held",
            plan.assignments.len(),
            plan.total_matches,
            courts.len(),
            report.created.len()
        );
        Ok(ScheduleOutcome {
            plan,
            reservations: report,
        })
    }

    async fn schedule_within_blocks(
        &self,
        tournament: &Tournament,
        held: &[CourtReservation],
    ) -> TournamentResult<ScheduleOutcome> {
        let matches = self.store.list_matches(tournament.id).await?;
        let plan = scheduling::plan_within_blocks(tournament.format, &matches, held);
        for warning in &plan.warnings {
            log::warn!("Tournament {} schedule: {warning:?}", tournament.id);
        }
        let report = self.store.commit_schedule(&plan.assignments, &[]).await?;
        log::info!(
            "Tournament {} rescheduled inside {} held blocks: {} matches placed",
            tournament.id,
            held.len(),
            plan.assignments.len()
        );
        Ok(ScheduleOutcome {
            plan,
            reservations: report,
        })
    }

    /// REGISTRATION_CLOSED -> IN_PROGRESS
    pub async fn start_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let tournament = self
            .store
            .transition_status(
                id,
                TournamentStatus::RegistrationClosed,
                TournamentStatus::InProgress,
            )
            .await?;
        log::info!("Tournament {id} started");
        Ok(tournament)
    }

    /// Rating changes for a played result, using stored ratings and the
    /// registration snapshot for users without one
    async fn rate(&self, pair: RatedPair) -> TournamentResult<Vec<RatingChange>> {
        let team1 = self.participant(pair.team1).await?;
        let team2 = self.participant(pair.team2).await?;

        let users: Vec<UserId> = team1
            .members
            .iter()
            .chain(&team2.members)
            .copied()
            .collect();
        let stored: HashMap<UserId, f64> = self.store.get_ratings(&users).await?;
        let players = |p: &Participant| -> Vec<PlayerRating> {
            p.members
                .iter()
                .map(|u| {
                    PlayerRating::new(*u, stored.get(u).copied().unwrap_or(p.elo_at_registration))
                })
                .collect()
        };

        let update = update_ratings(
            &players(&team1),
            &players(&team2),
            pair.team1_score,
            pair.team2_score,
            self.config.tournament_k,
        )?;
        Ok(update.changes)
    }

    /// Run one state-machine transition and persist what it touched. A
    /// write that loses a race with another result is re-run against fresh
    /// state.
    async fn transition<F>(
        &self,
        match_id: MatchId,
        operation: &'static str,
        apply: F,
    ) -> TournamentResult<MatchOutcome>
    where
        F: Fn(&mut MatchArena, MatchId) -> AdvancementResult<Advancement>,
    {
        let mut attempt = 1;
        loop {
            match self.try_transition(match_id, operation, &apply).await {
                Err(TournamentError::ConcurrentUpdate(moved)) if attempt < RESULT_ATTEMPTS => {
                    log::debug!(
                        "Match {moved} changed before match {match_id} could {operation}, \
                         retrying ({attempt}/{RESULT_ATTEMPTS})"
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_transition<F>(
        &self,
        match_id: MatchId,
        operation: &'static str,
        apply: &F,
    ) -> TournamentResult<MatchOutcome>
    where
        F: Fn(&mut MatchArena, MatchId) -> AdvancementResult<Advancement>,
    {
        let current = self
            .store
            .get_match(match_id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Match(match_id)))?;
        let tournament = self.tournament(current.tournament_id).await?;
        Self::require_status(&tournament, &[TournamentStatus::InProgress], operation)?;

        let before = MatchArena::new(self.store.list_matches(tournament.id).await?);
        let mut arena = before.clone();
        let advancement = apply(&mut arena, match_id)?;

        let ratings = match advancement.rated_pair {
            Some(pair) => self.rate(pair).await?,
            None => Vec::new(),
        };
        let matches = arena.snapshot(&advancement.changed);

        let finished = self
            .store
            .record_result(&ResultWrite {
                tournament_id: tournament.id,
                trigger: match_id,
                previous: before.snapshot(&advancement.changed),
                matches: matches.clone(),
                ratings: ratings.clone(),
            })
            .await?;

        if finished {
            log::info!("Tournament {} completed", tournament.id);
        }
        Ok(MatchOutcome {
            matches,
            winner: advancement.winner,
            ratings,
            tournament_completed: finished,
        })
    }

    /// SCHEDULED -> IN_PROGRESS
    pub async fn start_match(&self, match_id: MatchId) -> TournamentResult<MatchOutcome> {
        self.transition(match_id, "start a match", advancement::start)
            .await
    }

    /// Record a played result, advance the winner and update ratings
    pub async fn complete_match(
        &self,
        match_id: MatchId,
        result: MatchResult,
    ) -> TournamentResult<MatchOutcome> {
        let outcome = self
            .transition(match_id, "record results", |arena, id| {
                advancement::complete(arena, id, result)
            })
            .await?;
        log::info!(
            "Match {match_id} completed {}-{}, {} rating changes",
            result.team1_score,
            result.team2_score,
            outcome.ratings.len()
        );
        Ok(outcome)
    }

    /// Award a match without play; ratings are untouched
    pub async fn record_walkover(
        &self,
        match_id: MatchId,
        winner: ParticipantId,
    ) -> TournamentResult<MatchOutcome> {
        let outcome = self
            .transition(match_id, "record results", |arena, id| {
                advancement::walkover(arena, id, winner)
            })
            .await?;
        log::info!("Match {match_id} awarded to participant {winner} by walkover");
        Ok(outcome)
    }

    pub async fn cancel_match(&self, match_id: MatchId) -> TournamentResult<MatchOutcome> {
        let outcome = self
            .transition(match_id, "cancel a match", advancement::cancel)
            .await?;
        log::info!("Match {match_id} cancelled");
        Ok(outcome)
    }

    /// Cancel a tournament, releasing its court blocks and open matches
    pub async fn cancel_tournament(
        &self,
        id: TournamentId,
    ) -> TournamentResult<CancellationReport> {
        let report = self.store.cancel_tournament(id).await?;
        log::info!(
            "Tournament {id} cancelled: {} matches cancelled, {} reservations released",
            report.cancelled_matches,
            report.released_reservations
        );
        Ok(report)
    }

    pub async fn get_tournament_info(&self, id: TournamentId) -> TournamentResult<TournamentInfo> {
        let tournament = self.tournament(id).await?;
        let categories = self.store.list_categories(id).await?;
        let matches = self.store.list_matches(id).await?;
        Ok(TournamentInfo {
            tournament,
            categories,
            match_count: matches.len(),
            completed_matches: matches.iter().filter(|m| m.status.is_terminal()).count(),
        })
    }

    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        self.store.list_tournaments(status).await
    }

    pub async fn list_participants(&self, id: TournamentId) -> TournamentResult<Vec<Participant>> {
        self.tournament(id).await?;
        self.store.list_participants(id).await
    }

    pub async fn list_matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>> {
        self.tournament(id).await?;
        self.store.list_matches(id).await
    }

    /// Matches of one category, ordered for display
    pub async fn bracket(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
    ) -> TournamentResult<Vec<Match>> {
        let categories = self.store.list_categories(tournament_id).await?;
        if !categories.iter().any(|c| c.id == category_id) {
            return Err(TournamentError::NotFound(Entity::Category(category_id)));
        }
        let mut matches: Vec<Match> = self
            .store
            .list_matches(tournament_id)
            .await?
            .into_iter()
            .filter(|m| m.category_id == category_id)
            .collect();
        matches.sort_by_key(|m| (m.round, side_order(m.bracket), m.match_number));
        Ok(matches)
    }

    /// Store a recurring template; an advance window of zero takes the
    /// configured default
    pub async fn create_template(
        &self,
        mut new: NewTemplate,
    ) -> TournamentResult<RecurringTournamentTemplate> {
        validate_rule(&new.rule)?;
        if new.blueprint.categories.is_empty() {
            return Err(TournamentError::InvalidConfig(
                "a template needs at least one category".to_string(),
            ));
        }
        new.blueprint.validate()?;
        if new.advance_days == 0 {
            new.advance_days = self.config.default_advance_days;
        }
        if new.advance_days > MAX_ADVANCE_DAYS {
            return Err(RecurrenceError::AdvanceTooFar {
                days: new.advance_days,
                max: MAX_ADVANCE_DAYS,
            }
            .into());
        }

        let template = self.store.create_template(&new).await?;
        log::info!(
            "Created recurring template {} '{}' ({})",
            template.id,
            template.blueprint.name,
            template.rule.pattern.as_db_str()
        );
        Ok(template)
    }

    pub async fn set_template_active(&self, id: TemplateId, active: bool) -> TournamentResult<()> {
        self.store.set_template_active(id, active).await?;
        log::info!(
            "Template {id} {}",
            if active { "activated" } else { "deactivated" }
        );
        Ok(())
    }

    pub async fn list_templates(
        &self,
        active_only: bool,
    ) -> TournamentResult<Vec<RecurringTournamentTemplate>> {
        self.store.list_templates(active_only).await
    }

    async fn stamp(
        &self,
        template: &RecurringTournamentTemplate,
        now: DateTime<Utc>,
    ) -> TournamentResult<GenerationReport> {
        let mut report = GenerationReport {
            template_id: template.id,
            ..GenerationReport::default()
        };
        if !template.active {
            log::debug!("Template {} is inactive, nothing generated", template.id);
            return Ok(report);
        }
        if template.blueprint.categories.is_empty() {
            return Err(RecurrenceError::NoCategories(template.id).into());
        }

        let window = GenerationWindow::ahead(now, template.advance_days)?;
        let existing = self.store.instance_starts(template.id).await?;
        let status = if template.blueprint.open_registration {
            TournamentStatus::RegistrationOpen
        } else {
            TournamentStatus::Draft
        };

        for occurrence in occurrences(&template.rule, &window, &existing)? {
            let new = NewTournament {
                config: template.blueprint.instance_config(occurrence.starts_at)?,
                status,
                template_id: Some(template.id),
            };
            match self.store.stamp_instance(template.id, &new).await? {
                Some(tournament) => report.created.push(tournament.id),
                None => report.skipped.push(occurrence.starts_at),
            }
        }

        if !report.created.is_empty() {
            log::info!(
                "Template {} stamped {} instance(s)",
                template.id,
                report.created.len()
            );
        }
        Ok(report)
    }

    /// Stamp the instances of one template that fall in its advance window
    /// and do not exist yet. Safe to repeat.
    pub async fn generate_recurring_instances(
        &self,
        template_id: TemplateId,
        now: DateTime<Utc>,
    ) -> TournamentResult<GenerationReport> {
        let template = self
            .store
            .get_template(template_id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Template(template_id)))?;
        self.stamp(&template, now).await
    }

    /// Run generation for every active template. A failing template is
    /// logged and skipped.
    pub async fn generate_all_due(
        &self,
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<GenerationReport>> {
        let templates = self.store.list_templates(true).await?;
        let mut reports = Vec::with_capacity(templates.len());
        for template in &templates {
            match self.stamp(template, now).await {
                Ok(report) => reports.push(report),
                Err(e) => log::warn!("Template {} generation failed: {e}", template.id),
            }
        }
        Ok(reports)
    }
}

fn side_order(side: BracketSide) -> u8 {
    match side {
        BracketSide::Main => 0,
        BracketSide::Losers => 1,
        BracketSide::GrandFinal => 2,
    }
}

fn validate_config(config: &TournamentConfig) -> TournamentResult<()> {
    let invalid = |reason: &str| Err(TournamentError::InvalidConfig(reason.to_string()));
    if config.name.trim().is_empty() {
        return invalid("a tournament needs a name");
    }
    if config.ends_at <= config.starts_at {
        return invalid("a tournament must end after it starts");
    }
    if config.categories.is_empty() {
        return invalid("a tournament needs at least one category");
    }
    for category in &config.categories {
        if category.capacity == 0 {
            return invalid("category capacity must be at least 1");
        }
        let band = &category.band;
        if !band.min.is_finite()
            || (!band.open_ended && (!band.max.is_finite() || band.min >= band.max))
        {
            return invalid("category band must have min below max");
        }
    }
    Ok(())
}
