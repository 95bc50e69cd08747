use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

/// Payload of `getAvailableSlots`: the raw slot indices the server reports
/// as bookable for one doctor on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableSlotsResponse {
    #[serde(rename = "listOfAvailableTimeSlots", default)]
    pub list_of_available_time_slots: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailableSlotsQuery {
    pub doctor_id: i64,
    pub date: NaiveDate,
}

impl AvailableSlotsQuery {
    pub fn path(&self) -> String {
        format!(
            "/api/doctors/{}/available-slots?date={}",
            self.doctor_id,
            self.date.format("%Y-%m-%d")
        )
    }
}

// Error types specific to doctor operations
#[derive(Debug, Clone, PartialEq)]
pub enum DoctorError {
    ValidationError(String),
    Api(AppError),
}

impl DoctorError {
    pub fn user_message(&self) -> String {
        match self {
            DoctorError::ValidationError(msg) => msg.clone(),
            DoctorError::Api(err) => err.user_message(),
        }
    }
}

impl std::fmt::Display for DoctorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoctorError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            DoctorError::Api(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DoctorError {}

impl From<AppError> for DoctorError {
    fn from(err: AppError) -> Self {
        DoctorError::Api(err)
    }
}
