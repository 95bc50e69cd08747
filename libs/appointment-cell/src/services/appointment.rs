// libs/appointment-cell/src/services/appointment.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_api_client::ApiClient;
use shared_models::error::AppError;

use crate::models::{Appointment, AppointmentCreated, CreateAppointmentRequest, RescheduleAppointmentRequest};

/// Mutating calls against the appointment service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    async fn create_appointment(&self, request: CreateAppointmentRequest) -> Result<AppointmentCreated, AppError>;

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        request: RescheduleAppointmentRequest,
    ) -> Result<(), AppError>;

    async fn cancel_appointment(&self, appointment_id: i64) -> Result<(), AppError>;

    async fn complete_appointment(&self, appointment_id: i64) -> Result<(), AppError>;
}

pub struct AppointmentService {
    client: Arc<ApiClient>,
}

impl AppointmentService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list_patient_appointments(&self) -> Result<Vec<Appointment>, AppError> {
        debug!("Fetching patient appointments");
        self.list("/api/appointments/patient").await
    }

    pub async fn list_doctor_appointments(&self) -> Result<Vec<Appointment>, AppError> {
        debug!("Fetching doctor appointments");
        self.list("/api/appointments/doctor").await
    }

    async fn list(&self, path: &str) -> Result<Vec<Appointment>, AppError> {
        let appointments: Option<Vec<Appointment>> = self.client.request(Method::GET, path, None).await?;
        Ok(appointments.unwrap_or_default())
    }

    fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
        serde_json::to_value(value).map_err(|e| AppError::InvalidResponse(format!("Failed to encode request: {}", e)))
    }
}

#[async_trait]
impl AppointmentGateway for AppointmentService {
    async fn create_appointment(&self, request: CreateAppointmentRequest) -> Result<AppointmentCreated, AppError> {
        debug!(
            "Creating appointment with doctor {} on {} slot {}",
            request.doctor_id,
            request.date,
            request.time_slot.index()
        );

        let created: AppointmentCreated = self
            .client
            .fetch(Method::POST, "/api/appointments", Some(Self::to_body(&request)?))
            .await?;

        info!("Appointment {} created", created.appointment_id);
        Ok(created)
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        request: RescheduleAppointmentRequest,
    ) -> Result<(), AppError> {
        debug!(
            "Rescheduling appointment {} to {} slot {}",
            appointment_id,
            request.appointment_date,
            request.time_slot.index()
        );

        let path = format!("/api/appointments/{}/reschedule", appointment_id);
        self.client
            .send(Method::PUT, &path, Some(Self::to_body(&request)?))
            .await?;

        info!("Appointment {} rescheduled", appointment_id);
        Ok(())
    }

    async fn cancel_appointment(&self, appointment_id: i64) -> Result<(), AppError> {
        debug!("Cancelling appointment {}", appointment_id);

        let path = format!("/api/appointments/{}/cancel", appointment_id);
        self.client.send(Method::PUT, &path, None).await?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(())
    }

    async fn complete_appointment(&self, appointment_id: i64) -> Result<(), AppError> {
        debug!("Completing appointment {}", appointment_id);

        let path = format!("/api/appointments/{}/complete", appointment_id);
        self.client.send(Method::PUT, &path, None).await?;

        info!("Appointment {} completed", appointment_id);
        Ok(())
    }
}
