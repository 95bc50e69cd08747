use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use tracing::{debug, warn};

use shared_api_client::ApiClient;

use crate::models::{AvailableSlotsQuery, AvailableSlotsResponse, DoctorError};

/// Client for the doctor-availability endpoint.
pub struct DoctorAvailabilityService {
    client: Arc<ApiClient>,
}

impl DoctorAvailabilityService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Fetch the slot indices currently bookable for `doctor_id` on `date`.
    /// An absent payload is reported as no availability.
    pub async fn get_available_slots(&self, doctor_id: i64, date: NaiveDate) -> Result<Vec<i32>, DoctorError> {
        if doctor_id <= 0 {
            return Err(DoctorError::ValidationError(format!(
                "Doctor id must be positive, got {}",
                doctor_id
            )));
        }

        let query = AvailableSlotsQuery { doctor_id, date };
        debug!("Fetching available slots for doctor {} on {}", doctor_id, date);

        let response: Option<AvailableSlotsResponse> = self
            .client
            .request(Method::GET, &query.path(), None)
            .await
            .map_err(|e| {
                warn!("Availability lookup failed for doctor {} on {}: {}", doctor_id, date, e);
                DoctorError::Api(e)
            })?;

        let slots = response
            .map(|r| r.list_of_available_time_slots)
            .unwrap_or_default();

        debug!("Doctor {} has {} open slots on {}", doctor_id, slots.len(), date);
        Ok(slots)
    }
}
