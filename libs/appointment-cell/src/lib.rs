pub mod models;
pub mod services;

pub use models::*;

pub use services::appointment::{AppointmentGateway, AppointmentService};
pub use services::availability::{AvailabilityProvider, AvailabilityQuery, AvailabilityResponse, AvailabilityTicket};
pub use services::booking::{AvailabilityApplied, BookingWorkflow, Submission, SubmitOutcome};
pub use services::cache::{AppointmentCache, AppointmentPatch};
pub use services::lifecycle::{AppointmentActions, AppointmentLifecycleService, BookingWindow};
pub use services::slots::{SlotButton, SlotCatalog, INVALID_SLOT_LABEL};
