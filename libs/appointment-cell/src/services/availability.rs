// libs/appointment-cell/src/services/availability.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use doctor_cell::DoctorAvailabilityService;

use crate::models::{AppointmentError, AvailabilityWindow, TimeSlot};

/// Source of raw slot availability for a doctor on a date.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    async fn available_slots(&self, doctor_id: i64, date: NaiveDate) -> Result<Vec<i32>, AppointmentError>;
}

#[async_trait]
impl AvailabilityProvider for DoctorAvailabilityService {
    async fn available_slots(&self, doctor_id: i64, date: NaiveDate) -> Result<Vec<i32>, AppointmentError> {
        self.get_available_slots(doctor_id, date)
            .await
            .map_err(|e| AppointmentError::AvailabilityFetch(e.user_message()))
    }
}

/// The (doctor, date) a fetch was issued for. Results are matched back to
/// the current selection by this key when they resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityTicket {
    pub doctor_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityResponse {
    pub ticket: AvailabilityTicket,
    pub result: Result<AvailabilityWindow, AppointmentError>,
}

/// Fetches bookable slots. Every call goes to the provider; nothing is
/// cached between dates.
#[derive(Clone)]
pub struct AvailabilityQuery {
    provider: Arc<dyn AvailabilityProvider>,
}

impl AvailabilityQuery {
    pub fn new(provider: Arc<dyn AvailabilityProvider>) -> Self {
        Self { provider }
    }

    pub async fn fetch(&self, doctor_id: i64, date: NaiveDate) -> Result<AvailabilityWindow, AppointmentError> {
        if doctor_id <= 0 {
            return Err(AppointmentError::Validation(format!(
                "Doctor id must be positive, got {}",
                doctor_id
            )));
        }

        debug!("Querying availability for doctor {} on {}", doctor_id, date);
        let raw = self.provider.available_slots(doctor_id, date).await?;

        let mut available = BTreeSet::new();
        for index in raw {
            match TimeSlot::new(index) {
                Some(slot) => {
                    available.insert(slot);
                }
                None => warn!("Ignoring out-of-range slot {} reported for doctor {}", index, doctor_id),
            }
        }

        Ok(AvailabilityWindow {
            doctor_id,
            date,
            available,
        })
    }

    /// Runs the fetch a ticket was issued for, keeping the ticket attached
    /// so the caller can detect a superseded response.
    pub async fn resolve(&self, ticket: AvailabilityTicket) -> AvailabilityResponse {
        let result = self.fetch(ticket.doctor_id, ticket.date).await;
        AvailabilityResponse { ticket, result }
    }
}
