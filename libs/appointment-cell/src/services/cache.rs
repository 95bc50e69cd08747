// libs/appointment-cell/src/services/cache.rs
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentStatus, TimeSlot};

/// A confirmed change to exactly one cached appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentPatch {
    Reschedule {
        appointment_id: i64,
        date: NaiveDate,
        slot: TimeSlot,
    },
    Cancel {
        appointment_id: i64,
    },
    Complete {
        appointment_id: i64,
    },
}

impl AppointmentPatch {
    pub fn appointment_id(&self) -> i64 {
        match self {
            AppointmentPatch::Reschedule { appointment_id, .. }
            | AppointmentPatch::Cancel { appointment_id }
            | AppointmentPatch::Complete { appointment_id } => *appointment_id,
        }
    }

    /// Rewrites the matching entry in place. Returns false when the list
    /// does not hold that appointment.
    pub fn apply_to(&self, appointments: &mut [Appointment]) -> bool {
        let id = self.appointment_id();
        let Some(target) = appointments.iter_mut().find(|a| a.appointment_id == id) else {
            return false;
        };

        match self {
            AppointmentPatch::Reschedule { date, slot, .. } => {
                target.date = *date;
                target.time_slot = slot.index();
            }
            AppointmentPatch::Cancel { .. } => target.status = AppointmentStatus::Cancelled,
            AppointmentPatch::Complete { .. } => target.status = AppointmentStatus::Completed,
        }

        true
    }
}

/// The host's in-memory appointment list. Mutations only ever arrive as
/// single-appointment patches; a full replace happens only on a list fetch.
#[derive(Debug, Clone, Default)]
pub struct AppointmentCache {
    appointments: Vec<Appointment>,
}

impl AppointmentCache {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self { appointments }
    }

    pub fn replace_all(&mut self, appointments: Vec<Appointment>) {
        debug!("Appointment cache refreshed with {} entries", appointments.len());
        self.appointments = appointments;
    }

    pub fn apply(&mut self, patch: &AppointmentPatch) -> bool {
        let applied = patch.apply_to(&mut self.appointments);
        if !applied {
            warn!("Patch for appointment {} has no cached entry", patch.appointment_id());
        }
        applied
    }

    pub fn get(&self, appointment_id: i64) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.appointment_id == appointment_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Appointment> {
        self.appointments.iter()
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }
}
