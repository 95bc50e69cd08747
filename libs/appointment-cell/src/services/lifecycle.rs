// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use shared_models::auth::Role;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::appointment::AppointmentGateway;
use crate::services::cache::AppointmentPatch;

/// Dates a draft may pick: from `earliest` through `latest` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub earliest: NaiveDate,
    pub latest: Option<NaiveDate>,
}

impl BookingWindow {
    /// Tomorrow through `horizon_days` after today.
    pub fn fresh(today: NaiveDate, horizon_days: i64) -> Self {
        Self {
            earliest: tomorrow(today),
            latest: Some(today.checked_add_signed(Duration::days(horizon_days)).unwrap_or(NaiveDate::MAX)),
        }
    }

    /// Tomorrow onwards, no upper bound.
    pub fn reschedule(today: NaiveDate) -> Self {
        Self {
            earliest: tomorrow(today),
            latest: None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.earliest && self.latest.map_or(true, |latest| date <= latest)
    }

    pub fn validate(&self, date: NaiveDate) -> Result<(), AppointmentError> {
        if self.contains(date) {
            return Ok(());
        }

        let message = match self.latest {
            Some(latest) => format!("Please choose a date between {} and {}", self.earliest, latest),
            None => format!("Please choose a date on or after {}", self.earliest),
        };
        Err(AppointmentError::Validation(message))
    }
}

fn tomorrow(today: NaiveDate) -> NaiveDate {
    today.succ_opt().unwrap_or(NaiveDate::MAX)
}

/// Which affordances to offer for an appointment. Advisory only: the
/// server still rejects invalid transitions on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentActions {
    pub can_reschedule: bool,
    pub can_cancel: bool,
    pub can_complete: bool,
}

impl AppointmentActions {
    pub fn any(&self) -> bool {
        self.can_reschedule || self.can_cancel || self.can_complete
    }
}

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {:?} to {:?}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(AppointmentError::Validation(format!(
                "Appointment cannot change from {} to {}",
                current_status, new_status
            )));
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Scheduled and dated strictly after today.
    pub fn is_modifiable(&self, appointment: &Appointment, today: NaiveDate) -> bool {
        appointment.status == AppointmentStatus::Scheduled && appointment.date > today
    }

    pub fn actions_for(&self, role: Role, appointment: &Appointment, today: NaiveDate) -> AppointmentActions {
        let modifiable = self.is_modifiable(appointment, today);
        let scheduled = appointment.status == AppointmentStatus::Scheduled;

        match role {
            Role::Patient => AppointmentActions {
                can_reschedule: modifiable,
                can_cancel: modifiable,
                can_complete: false,
            },
            Role::Doctor => AppointmentActions {
                can_reschedule: false,
                can_cancel: modifiable,
                can_complete: scheduled,
            },
            Role::Admin => AppointmentActions {
                can_reschedule: false,
                can_cancel: modifiable,
                can_complete: false,
            },
        }
    }

    /// Marks a scheduled appointment completed and returns the patch for
    /// the caller's cached list.
    pub async fn complete_appointment(
        &self,
        gateway: &dyn AppointmentGateway,
        appointment: &Appointment,
    ) -> Result<AppointmentPatch, AppointmentError> {
        self.validate_status_transition(&appointment.status, &AppointmentStatus::Completed)?;

        gateway
            .complete_appointment(appointment.appointment_id)
            .await
            .map_err(|e| AppointmentError::Mutation(e.user_message()))?;

        info!("Appointment {} marked completed", appointment.appointment_id);
        Ok(AppointmentPatch::Complete {
            appointment_id: appointment.appointment_id,
        })
    }
}
