//! Court availability as seen by the scheduler.
//!
//! Court ownership and regular bookings belong to the club side of the
//! platform; the tournament core only asks whether a court is free for a
//! window.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::Store;
use crate::scheduling::TimeSlot;
use crate::tournament::errors::TournamentResult;
use crate::tournament::models::CourtId;

/// Answers court availability questions
#[async_trait]
pub trait BookingService: Send + Sync {
    /// True when no active reservation on `court_id` overlaps `[start, end)`
    async fn is_slot_free(
        &self,
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TournamentResult<bool>;
}

/// Every court is always free
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFree;

#[async_trait]
impl BookingService for AlwaysFree {
    async fn is_slot_free(
        &self,
        _court_id: CourtId,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> TournamentResult<bool> {
        Ok(true)
    }
}

/// Availability read from the store's reservation table
#[derive(Clone)]
pub struct ReservationBooking {
    store: Arc<dyn Store>,
}

impl ReservationBooking {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BookingService for ReservationBooking {
    async fn is_slot_free(
        &self,
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TournamentResult<bool> {
        let active = self
            .store
            .active_reservations(Some(court_id), start, end)
            .await?;
        Ok(active.iter().all(|r| !r.blocks(court_id, start, end)))
    }
}

/// Courts that are free in every one of `slots`, in input order
pub async fn courts_free_for_all(
    booking: &dyn BookingService,
    courts: &[CourtId],
    slots: &[TimeSlot],
) -> TournamentResult<Vec<CourtId>> {
    let mut free = Vec::with_capacity(courts.len());
    'courts: for &court_id in courts {
        for slot in slots {
            if !booking
                .is_slot_free(court_id, slot.starts_at, slot.ends_at)
                .await?
            {
                log::debug!(
                    "court {court_id} is busy at {}, leaving it out of the schedule",
                    slot.starts_at
                );
                continue 'courts;
            }
        }
        free.push(court_id);
    }
    Ok(free)
}
