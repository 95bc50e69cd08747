// libs/appointment-cell/src/models.rs
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// One of the sixteen fixed half-hour clinic windows of a day, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct TimeSlot(u8);

impl TimeSlot {
    pub const FIRST: i32 = 1;
    pub const LAST: i32 = 16;

    pub fn new(index: i32) -> Option<Self> {
        if (Self::FIRST..=Self::LAST).contains(&index) {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> i32 {
        i32::from(self.0)
    }
}

impl TryFrom<i32> for TimeSlot {
    type Error = String;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        TimeSlot::new(index).ok_or_else(|| format!("Time slot {} is outside 1..=16", index))
    }
}

impl From<TimeSlot> for i32 {
    fn from(slot: TimeSlot) -> Self {
        slot.index()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// An appointment as the server reports it. The slot is kept as the raw
/// integer so a malformed value never breaks decoding of a whole list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub appointment_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub department_name: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(rename = "appointmentDate", alias = "date")]
    pub date: NaiveDate,
    pub time_slot: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Appointment {
    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::new(self.time_slot)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleAppointmentRequest {
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCreated {
    pub appointment_id: i64,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// CLIENT-SIDE BOOKING STATE
// ==============================================================================

/// The not-yet-committed selection behind a create or reschedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub doctor_id: i64,
    pub selected_date: Option<NaiveDate>,
    pub selected_slot: Option<TimeSlot>,
}

impl AppointmentDraft {
    pub fn new(doctor_id: i64) -> Self {
        Self {
            doctor_id,
            selected_date: None,
            selected_slot: None,
        }
    }
}

/// Slots the server reported bookable for one doctor on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityWindow {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub available: BTreeSet<TimeSlot>,
}

impl AvailabilityWindow {
    pub fn contains(&self, slot: TimeSlot) -> bool {
        self.available.contains(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Selecting,
    Submitting,
    Success,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => write!(f, "idle"),
            WorkflowState::Selecting => write!(f, "selecting"),
            WorkflowState::Submitting => write!(f, "submitting"),
            WorkflowState::Success => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    AvailabilityFetch(String),

    #[error("{0}")]
    Mutation(String),

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Operation not allowed while the booking is {0}")]
    InvalidState(WorkflowState),
}

impl AppointmentError {
    /// Text suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            AppointmentError::Validation(msg)
            | AppointmentError::AvailabilityFetch(msg)
            | AppointmentError::Mutation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
