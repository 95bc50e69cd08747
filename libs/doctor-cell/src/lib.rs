pub mod models;
pub mod services;

pub use models::{AvailableSlotsQuery, AvailableSlotsResponse, DoctorError};
pub use services::availability::DoctorAvailabilityService;
