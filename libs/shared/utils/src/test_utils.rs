use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub jwt_secret: String,
    pub api_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            request_timeout_secs: 5,
            booking_horizon_days: 30,
            session_jwt_secret: Some(self.jwt_secret.clone()),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Response bodies in the booking API's envelope format.
pub struct MockApiResponses;

impl MockApiResponses {
    pub fn envelope(data: serde_json::Value) -> serde_json::Value {
        json!({
            "success": true,
            "data": data,
            "status": 200
        })
    }

    pub fn ack() -> serde_json::Value {
        json!({
            "success": true,
            "status": 200
        })
    }

    pub fn failure(message: &str, status: u16) -> serde_json::Value {
        json!({
            "success": false,
            "message": message,
            "status": status
        })
    }

    pub fn available_slots(indices: &[i32]) -> serde_json::Value {
        Self::envelope(json!({ "listOfAvailableTimeSlots": indices }))
    }

    pub fn appointment(
        appointment_id: i64,
        doctor_id: i64,
        date: &str,
        time_slot: i32,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "appointmentId": appointment_id,
            "doctorId": doctor_id,
            "doctorName": "Dr. Test",
            "departmentName": "General Medicine",
            "patientName": "Test Patient",
            "appointmentDate": date,
            "timeSlot": time_slot,
            "status": status,
            "notes": null
        })
    }

    pub fn appointment_created(appointment_id: i64) -> serde_json::Value {
        Self::envelope(json!({
            "appointmentId": appointment_id,
            "status": "SCHEDULED"
        }))
    }
}
