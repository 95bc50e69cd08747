// libs/appointment-cell/src/services/booking.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentCreated, AppointmentDraft, AppointmentError, AvailabilityWindow, CreateAppointmentRequest,
    RescheduleAppointmentRequest, TimeSlot, WorkflowState,
};
use crate::services::appointment::AppointmentGateway;
use crate::services::availability::{AvailabilityQuery, AvailabilityResponse, AvailabilityTicket};
use crate::services::cache::AppointmentPatch;
use crate::services::lifecycle::BookingWindow;
use crate::services::slots::{SlotButton, SlotCatalog};

#[derive(Debug, Clone, PartialEq)]
enum AvailabilityState {
    NotRequested,
    Pending(AvailabilityTicket),
    Ready(AvailabilityWindow),
    Failed(AppointmentError),
}

/// Whether a resolved availability fetch was taken or dropped as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityApplied {
    Applied,
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
enum SubmissionIntent {
    Create(CreateAppointmentRequest),
    Reschedule {
        appointment_id: i64,
        request: RescheduleAppointmentRequest,
    },
    Cancel {
        appointment_id: i64,
    },
}

/// A mutating call the workflow has committed to. Obtained from one of the
/// `begin_*` methods, sent, then handed back through
/// [`BookingWorkflow::finish`]. Not `Clone`: each submission is finished
/// at most once.
#[derive(Debug, PartialEq)]
pub struct Submission {
    intent: SubmissionIntent,
    resume: WorkflowState,
}

impl Submission {
    /// Issues exactly one outbound call for this submission.
    pub async fn send(&self, gateway: &dyn AppointmentGateway) -> Result<SubmitOutcome, AppError> {
        match &self.intent {
            SubmissionIntent::Create(request) => gateway
                .create_appointment(request.clone())
                .await
                .map(SubmitOutcome::Created),
            SubmissionIntent::Reschedule { appointment_id, request } => {
                gateway.reschedule_appointment(*appointment_id, request.clone()).await?;
                Ok(SubmitOutcome::Patched(AppointmentPatch::Reschedule {
                    appointment_id: *appointment_id,
                    date: request.appointment_date,
                    slot: request.time_slot,
                }))
            }
            SubmissionIntent::Cancel { appointment_id } => {
                gateway.cancel_appointment(*appointment_id).await?;
                Ok(SubmitOutcome::Patched(AppointmentPatch::Cancel {
                    appointment_id: *appointment_id,
                }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(AppointmentCreated),
    /// Apply to the host's cached list; no other entry is affected.
    Patched(AppointmentPatch),
}

/// Drives one appointment draft from slot selection to a create,
/// reschedule or cancel call.
///
/// Every operation is synchronous except the availability fetch and the
/// submit calls. Each of those is split so the host can drive the await
/// itself: a date change hands back an [`AvailabilityTicket`] to resolve
/// with [`AvailabilityQuery::resolve`] and feed into
/// [`BookingWorkflow::apply_availability`]; a submit hands back a
/// [`Submission`] to send and pass to [`BookingWorkflow::finish`]. The
/// `change_date` and `submit_*` helpers do both halves in one call.
pub struct BookingWorkflow {
    draft: AppointmentDraft,
    window: BookingWindow,
    state: WorkflowState,
    availability: AvailabilityState,
    last_error: Option<AppointmentError>,
    /// Date and slot of the appointment a reschedule draft was seeded from.
    original: Option<(NaiveDate, TimeSlot)>,
    query: AvailabilityQuery,
    gateway: Arc<dyn AppointmentGateway>,
}

impl BookingWorkflow {
    pub fn new(
        doctor_id: i64,
        window: BookingWindow,
        query: AvailabilityQuery,
        gateway: Arc<dyn AppointmentGateway>,
    ) -> Self {
        Self {
            draft: AppointmentDraft::new(doctor_id),
            window,
            state: WorkflowState::Idle,
            availability: AvailabilityState::NotRequested,
            last_error: None,
            original: None,
            query,
            gateway,
        }
    }

    /// Starts from an existing appointment's doctor, date and slot. The
    /// seeded slot is dropped as soon as another date is picked, and a
    /// reschedule back onto the original date and slot is refused.
    pub fn for_reschedule(
        appointment: &Appointment,
        window: BookingWindow,
        query: AvailabilityQuery,
        gateway: Arc<dyn AppointmentGateway>,
    ) -> Self {
        let mut workflow = Self::new(appointment.doctor_id, window, query, gateway);
        workflow.draft.selected_date = Some(appointment.date);
        workflow.draft.selected_slot = appointment.slot();
        workflow.original = appointment.slot().map(|slot| (appointment.date, slot));
        workflow.state = WorkflowState::Selecting;
        workflow
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn draft(&self) -> &AppointmentDraft {
        &self.draft
    }

    pub fn doctor_id(&self) -> i64 {
        self.draft.doctor_id
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.draft.selected_date
    }

    pub fn selected_slot(&self) -> Option<TimeSlot> {
        self.draft.selected_slot
    }

    pub fn window(&self) -> BookingWindow {
        self.window
    }

    pub fn is_submitting(&self) -> bool {
        self.state == WorkflowState::Submitting
    }

    pub fn is_loading_availability(&self) -> bool {
        matches!(self.availability, AvailabilityState::Pending(_))
    }

    /// The most recent user-facing failure, cleared by the next successful
    /// step.
    pub fn last_error(&self) -> Option<&AppointmentError> {
        self.last_error.as_ref()
    }

    /// Slots that may be selected right now. Empty until a fetch for the
    /// current selection has succeeded.
    pub fn available_slots(&self) -> BTreeSet<TimeSlot> {
        match &self.availability {
            AvailabilityState::Ready(window) => window.available.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn availability_error(&self) -> Option<&AppointmentError> {
        match &self.availability {
            AvailabilityState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn slot_grid(&self) -> Vec<SlotButton> {
        SlotCatalog::grid(&self.available_slots(), self.draft.selected_slot)
    }

    fn ensure_editable(&self) -> Result<(), AppointmentError> {
        match self.state {
            WorkflowState::Submitting => Err(AppointmentError::SubmissionInProgress),
            WorkflowState::Success => Err(AppointmentError::InvalidState(WorkflowState::Success)),
            WorkflowState::Idle | WorkflowState::Selecting => Ok(()),
        }
    }

    fn reject(&mut self, err: AppointmentError) -> AppointmentError {
        self.last_error = Some(err.clone());
        err
    }

    fn issue_ticket(&mut self, date: NaiveDate) -> AvailabilityTicket {
        let ticket = AvailabilityTicket {
            doctor_id: self.draft.doctor_id,
            date,
        };
        self.availability = AvailabilityState::Pending(ticket);
        ticket
    }

    /// Picks a date. The slot is cleared before this returns, ahead of the
    /// fetch the returned ticket stands for. `None` when the date is
    /// already selected.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<Option<AvailabilityTicket>, AppointmentError> {
        self.ensure_editable()?;

        if self.draft.selected_date == Some(date) {
            return Ok(None);
        }

        if let Err(err) = self.window.validate(date) {
            return Err(self.reject(err));
        }

        self.draft.selected_date = Some(date);
        self.draft.selected_slot = None;
        self.last_error = None;
        self.state = WorkflowState::Selecting;

        debug!("Draft for doctor {} moved to {}", self.draft.doctor_id, date);
        Ok(Some(self.issue_ticket(date)))
    }

    /// [`BookingWorkflow::select_date`] for a `yyyy-MM-dd` string.
    pub fn select_iso_date(&mut self, raw: &str) -> Result<Option<AvailabilityTicket>, AppointmentError> {
        self.ensure_editable()?;

        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => self.select_date(date),
            Err(_) => Err(self.reject(AppointmentError::Validation(format!("Invalid date: {}", raw)))),
        }
    }

    /// Switches doctor. Clears the slot; returns a ticket when a date is
    /// already selected and its availability must be fetched again.
    pub fn select_doctor(&mut self, doctor_id: i64) -> Result<Option<AvailabilityTicket>, AppointmentError> {
        self.ensure_editable()?;

        if doctor_id <= 0 {
            return Err(self.reject(AppointmentError::Validation(format!(
                "Doctor id must be positive, got {}",
                doctor_id
            ))));
        }

        if doctor_id == self.draft.doctor_id {
            return Ok(None);
        }

        self.draft.doctor_id = doctor_id;
        self.draft.selected_slot = None;
        self.last_error = None;

        match self.draft.selected_date {
            Some(date) => Ok(Some(self.issue_ticket(date))),
            None => {
                self.availability = AvailabilityState::NotRequested;
                Ok(None)
            }
        }
    }

    /// Re-fetches availability for the current selection. The selected slot
    /// survives unless the fresh result no longer offers it.
    pub fn refresh_availability(&mut self) -> Result<AvailabilityTicket, AppointmentError> {
        self.ensure_editable()?;

        match self.draft.selected_date {
            Some(date) => Ok(self.issue_ticket(date)),
            None => Err(self.reject(AppointmentError::Validation(
                "Please select an appointment date".to_string(),
            ))),
        }
    }

    /// Takes a resolved fetch if it is still for the current doctor and
    /// date; otherwise drops it. Nothing is applied while a submission is
    /// outstanding, so a failed submit comes back with its selection intact.
    pub fn apply_availability(&mut self, response: AvailabilityResponse) -> AvailabilityApplied {
        if self.state == WorkflowState::Submitting {
            debug!(
                "Discarding availability for doctor {} on {} during submission",
                response.ticket.doctor_id, response.ticket.date
            );
            if self.availability == AvailabilityState::Pending(response.ticket) {
                self.availability = AvailabilityState::NotRequested;
            }
            return AvailabilityApplied::Discarded;
        }

        let current = self.draft.selected_date.map(|date| AvailabilityTicket {
            doctor_id: self.draft.doctor_id,
            date,
        });

        if current != Some(response.ticket) || self.state == WorkflowState::Success {
            debug!(
                "Discarding stale availability for doctor {} on {}",
                response.ticket.doctor_id, response.ticket.date
            );
            return AvailabilityApplied::Discarded;
        }

        match response.result {
            Ok(window) => {
                if let Some(slot) = self.draft.selected_slot {
                    if !window.contains(slot) {
                        info!("Selected slot {} is no longer available on {}", slot.index(), window.date);
                        self.draft.selected_slot = None;
                    }
                }
                debug!("{} slots available on {}", window.available.len(), window.date);
                self.availability = AvailabilityState::Ready(window);
            }
            Err(err) => {
                warn!(
                    "Availability fetch failed for doctor {} on {}: {}",
                    response.ticket.doctor_id, response.ticket.date, err
                );
                self.draft.selected_slot = None;
                self.last_error = Some(err.clone());
                self.availability = AvailabilityState::Failed(err);
            }
        }

        AvailabilityApplied::Applied
    }

    /// Selects a date and waits for its availability. Fails with the fetch
    /// error when availability could not be loaded.
    pub async fn change_date(&mut self, date: NaiveDate) -> Result<(), AppointmentError> {
        let Some(ticket) = self.select_date(date)? else {
            return Ok(());
        };

        let response = self.query.resolve(ticket).await;
        self.apply_availability(response);

        match self.availability_error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Picks a slot. Only slots in the current availability are accepted;
    /// nothing is clamped.
    pub fn select_slot(&mut self, slot: TimeSlot) -> Result<(), AppointmentError> {
        self.ensure_editable()?;

        if self.state == WorkflowState::Idle || self.draft.selected_date.is_none() {
            return Err(self.reject(AppointmentError::Validation(
                "Please select an appointment date first".to_string(),
            )));
        }

        let offered = matches!(&self.availability, AvailabilityState::Ready(window) if window.contains(slot));
        if !offered {
            return Err(self.reject(AppointmentError::Validation(format!(
                "Time slot {} is not available",
                slot.label()
            ))));
        }

        self.draft.selected_slot = Some(slot);
        self.last_error = None;
        Ok(())
    }

    pub fn select_slot_index(&mut self, index: i32) -> Result<(), AppointmentError> {
        match TimeSlot::new(index) {
            Some(slot) => self.select_slot(slot),
            None => {
                self.ensure_editable()?;
                Err(self.reject(AppointmentError::Validation(format!("Invalid time slot: {}", index))))
            }
        }
    }

    fn complete_selection(&mut self) -> Result<(NaiveDate, TimeSlot), AppointmentError> {
        self.ensure_editable()?;

        let Some(date) = self.draft.selected_date else {
            return Err(self.reject(AppointmentError::Validation(
                "Please select an appointment date".to_string(),
            )));
        };
        let Some(slot) = self.draft.selected_slot else {
            return Err(self.reject(AppointmentError::Validation("Please select a time slot".to_string())));
        };
        if let Err(err) = self.window.validate(date) {
            return Err(self.reject(err));
        }

        Ok((date, slot))
    }

    fn start(&mut self, intent: SubmissionIntent) -> Submission {
        let submission = Submission {
            intent,
            resume: self.state,
        };
        self.state = WorkflowState::Submitting;
        self.last_error = None;
        submission
    }

    pub fn begin_create(&mut self, notes: Option<String>) -> Result<Submission, AppointmentError> {
        let (date, slot) = self.complete_selection()?;

        let request = CreateAppointmentRequest {
            doctor_id: self.draft.doctor_id,
            date,
            time_slot: slot,
            notes: notes.filter(|n| !n.trim().is_empty()),
        };
        Ok(self.start(SubmissionIntent::Create(request)))
    }

    pub fn begin_reschedule(&mut self, appointment_id: i64) -> Result<Submission, AppointmentError> {
        let (date, slot) = self.complete_selection()?;

        if self.original == Some((date, slot)) {
            return Err(self.reject(AppointmentError::Validation(
                "Please choose a different date or time slot".to_string(),
            )));
        }

        let request = RescheduleAppointmentRequest {
            appointment_date: date,
            time_slot: slot,
        };
        Ok(self.start(SubmissionIntent::Reschedule {
            appointment_id,
            request,
        }))
    }

    /// Cancel needs no date or slot; it acts on an existing appointment.
    pub fn begin_cancel(&mut self, appointment_id: i64) -> Result<Submission, AppointmentError> {
        self.ensure_editable()?;

        if appointment_id <= 0 {
            return Err(self.reject(AppointmentError::Validation(format!(
                "Invalid appointment id: {}",
                appointment_id
            ))));
        }

        Ok(self.start(SubmissionIntent::Cancel { appointment_id }))
    }

    /// Records the result of a sent submission. On failure the workflow
    /// goes back to where the submission started with the selection intact.
    /// Only valid while `Submitting`.
    pub fn finish(
        &mut self,
        submission: Submission,
        result: Result<SubmitOutcome, AppError>,
    ) -> Result<SubmitOutcome, AppointmentError> {
        if self.state != WorkflowState::Submitting {
            warn!("Ignoring submission result while the booking is {}", self.state);
            return Err(AppointmentError::InvalidState(self.state));
        }

        match result {
            Ok(outcome) => {
                if matches!(submission.intent, SubmissionIntent::Create(_) | SubmissionIntent::Reschedule { .. }) {
                    self.draft = AppointmentDraft::new(self.draft.doctor_id);
                    self.availability = AvailabilityState::NotRequested;
                    self.original = None;
                }
                self.state = WorkflowState::Success;
                self.last_error = None;

                info!("Booking submission succeeded: {:?}", outcome);
                Ok(outcome)
            }
            Err(err) => {
                warn!("Booking submission failed: {}", err);
                self.state = submission.resume;
                Err(self.reject(AppointmentError::Mutation(err.user_message())))
            }
        }
    }

    async fn run(&mut self, submission: Submission) -> Result<SubmitOutcome, AppointmentError> {
        let gateway = Arc::clone(&self.gateway);
        let result = submission.send(gateway.as_ref()).await;
        self.finish(submission, result)
    }

    pub async fn submit_create(&mut self, notes: Option<String>) -> Result<SubmitOutcome, AppointmentError> {
        let submission = self.begin_create(notes)?;
        self.run(submission).await
    }

    pub async fn submit_reschedule(&mut self, appointment_id: i64) -> Result<SubmitOutcome, AppointmentError> {
        let submission = self.begin_reschedule(appointment_id)?;
        self.run(submission).await
    }

    pub async fn submit_cancel(&mut self, appointment_id: i64) -> Result<SubmitOutcome, AppointmentError> {
        let submission = self.begin_cancel(appointment_id)?;
        self.run(submission).await
    }

    /// Starts a new draft for the same doctor.
    pub fn reset(&mut self) -> Result<(), AppointmentError> {
        if self.state == WorkflowState::Submitting {
            return Err(AppointmentError::SubmissionInProgress);
        }

        self.draft = AppointmentDraft::new(self.draft.doctor_id);
        self.availability = AvailabilityState::NotRequested;
        self.last_error = None;
        self.original = None;
        self.state = WorkflowState::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use crate::services::appointment::MockAppointmentGateway;
    use crate::services::availability::MockAvailabilityProvider;
    use assert_matches::assert_matches;
    use mockall::predicate::eq;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn slot(index: i32) -> TimeSlot {
        TimeSlot::new(index).unwrap()
    }

    fn today() -> NaiveDate {
        date("2025-11-01")
    }

    fn window_of(doctor_id: i64, on: &str, indices: &[i32]) -> AvailabilityWindow {
        AvailabilityWindow {
            doctor_id,
            date: date(on),
            available: indices.iter().map(|&i| slot(i)).collect(),
        }
    }

    fn respond(ticket: AvailabilityTicket, indices: &[i32]) -> AvailabilityResponse {
        AvailabilityResponse {
            ticket,
            result: Ok(AvailabilityWindow {
                doctor_id: ticket.doctor_id,
                date: ticket.date,
                available: indices.iter().map(|&i| slot(i)).collect(),
            }),
        }
    }

    fn silent_provider() -> AvailabilityQuery {
        let mut provider = MockAvailabilityProvider::new();
        provider.expect_available_slots().times(0);
        AvailabilityQuery::new(Arc::new(provider))
    }

    fn silent_gateway() -> Arc<dyn AppointmentGateway> {
        let mut gateway = MockAppointmentGateway::new();
        gateway.expect_create_appointment().times(0);
        gateway.expect_reschedule_appointment().times(0);
        gateway.expect_cancel_appointment().times(0);
        gateway.expect_complete_appointment().times(0);
        Arc::new(gateway)
    }

    fn workflow_with(gateway: Arc<dyn AppointmentGateway>) -> BookingWorkflow {
        BookingWorkflow::new(7, BookingWindow::fresh(today(), 30), silent_provider(), gateway)
    }

    /// Selecting with availability [3, 4, 9] on 2025-11-10 loaded.
    fn ready_workflow(gateway: Arc<dyn AppointmentGateway>) -> BookingWorkflow {
        let mut workflow = workflow_with(gateway);
        let ticket = workflow.select_date(date("2025-11-10")).unwrap().unwrap();
        assert_eq!(workflow.apply_availability(respond(ticket, &[3, 4, 9])), AvailabilityApplied::Applied);
        workflow
    }

    #[test]
    fn test_starts_idle_with_empty_draft() {
        let workflow = workflow_with(silent_gateway());

        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert_eq!(workflow.draft(), &AppointmentDraft::new(7));
        assert!(workflow.available_slots().is_empty());
        assert!(workflow.slot_grid().iter().all(|b| !b.enabled));
    }

    #[test]
    fn test_date_change_clears_slot_before_fetch_resolves() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(4)).unwrap();
        assert_eq!(workflow.selected_slot(), Some(slot(4)));

        let ticket = workflow.select_date(date("2025-11-11")).unwrap();

        assert!(ticket.is_some());
        assert_eq!(workflow.selected_slot(), None);
        assert_eq!(workflow.selected_date(), Some(date("2025-11-11")));
        assert!(workflow.is_loading_availability());
        assert!(workflow.available_slots().is_empty());
    }

    #[test]
    fn test_reselecting_same_date_is_noop() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(3)).unwrap();

        assert_eq!(workflow.select_date(date("2025-11-10")).unwrap(), None);
        assert_eq!(workflow.selected_slot(), Some(slot(3)));
        assert!(!workflow.is_loading_availability());
    }

    #[test]
    fn test_dates_outside_window_are_rejected() {
        let mut workflow = workflow_with(silent_gateway());

        assert_matches!(workflow.select_date(today()), Err(AppointmentError::Validation(_)));
        assert_matches!(workflow.select_date(date("2025-12-02")), Err(AppointmentError::Validation(_)));
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(workflow.selected_date().is_none());
        assert!(workflow.last_error().is_some());
    }

    #[test]
    fn test_malformed_iso_date_is_rejected() {
        let mut workflow = workflow_with(silent_gateway());

        assert_matches!(workflow.select_iso_date("10/11/2025"), Err(AppointmentError::Validation(_)));
        assert_matches!(workflow.select_iso_date("2025-02-30"), Err(AppointmentError::Validation(_)));
        assert!(workflow.select_iso_date("2025-11-10").unwrap().is_some());
    }

    #[test]
    fn test_failed_fetch_fails_closed() {
        let mut workflow = workflow_with(silent_gateway());
        let ticket = workflow.select_date(date("2025-11-10")).unwrap().unwrap();

        let applied = workflow.apply_availability(AvailabilityResponse {
            ticket,
            result: Err(AppointmentError::AvailabilityFetch("Service unavailable".to_string())),
        });

        assert_eq!(applied, AvailabilityApplied::Applied);
        assert!(workflow.available_slots().is_empty());
        assert_eq!(
            workflow.availability_error(),
            Some(&AppointmentError::AvailabilityFetch("Service unavailable".to_string()))
        );
        for index in 1..=16 {
            assert_matches!(workflow.select_slot_index(index), Err(AppointmentError::Validation(_)));
        }
        assert!(workflow.selected_slot().is_none());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut workflow = workflow_with(silent_gateway());
        let ticket_a = workflow.select_date(date("2025-11-10")).unwrap().unwrap();
        let ticket_b = workflow.select_date(date("2025-11-12")).unwrap().unwrap();

        assert_eq!(workflow.apply_availability(respond(ticket_b, &[1, 2])), AvailabilityApplied::Applied);
        assert_eq!(workflow.apply_availability(respond(ticket_a, &[5, 6, 7])), AvailabilityApplied::Discarded);

        assert_eq!(workflow.available_slots(), window_of(7, "2025-11-12", &[1, 2]).available);
        assert_matches!(workflow.select_slot(slot(5)), Err(AppointmentError::Validation(_)));
        workflow.select_slot(slot(2)).unwrap();
    }

    #[test]
    fn test_stale_response_arriving_first_is_discarded() {
        let mut workflow = workflow_with(silent_gateway());
        let ticket_a = workflow.select_date(date("2025-11-10")).unwrap().unwrap();
        let ticket_b = workflow.select_date(date("2025-11-12")).unwrap().unwrap();

        assert_eq!(workflow.apply_availability(respond(ticket_a, &[5])), AvailabilityApplied::Discarded);
        assert!(workflow.is_loading_availability());
        assert_eq!(workflow.apply_availability(respond(ticket_b, &[1])), AvailabilityApplied::Applied);
        assert_eq!(workflow.available_slots(), window_of(7, "2025-11-12", &[1]).available);
    }

    #[test]
    fn test_doctor_change_invalidates_slot_and_refetches() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(9)).unwrap();

        let ticket = workflow.select_doctor(8).unwrap().unwrap();
        assert_eq!(ticket, AvailabilityTicket { doctor_id: 8, date: date("2025-11-10") });
        assert!(workflow.selected_slot().is_none());

        let old_doctor = AvailabilityTicket { doctor_id: 7, date: date("2025-11-10") };
        assert_eq!(workflow.apply_availability(respond(old_doctor, &[9])), AvailabilityApplied::Discarded);
        assert_matches!(workflow.select_doctor(0), Err(AppointmentError::Validation(_)));
    }

    #[test]
    fn test_refresh_keeps_slot_only_if_still_offered() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(4)).unwrap();

        let ticket = workflow.refresh_availability().unwrap();
        assert_eq!(workflow.selected_slot(), Some(slot(4)));
        workflow.apply_availability(respond(ticket, &[3, 4]));
        assert_eq!(workflow.selected_slot(), Some(slot(4)));

        let ticket = workflow.refresh_availability().unwrap();
        workflow.apply_availability(respond(ticket, &[3]));
        assert_eq!(workflow.selected_slot(), None);
    }

    #[test]
    fn test_slot_outside_availability_is_rejected() {
        let mut workflow = ready_workflow(silent_gateway());

        assert_matches!(workflow.select_slot(slot(5)), Err(AppointmentError::Validation(_)));
        assert_matches!(workflow.select_slot_index(0), Err(AppointmentError::Validation(_)));
        assert!(workflow.selected_slot().is_none());
    }

    #[test]
    fn test_slot_before_date_is_rejected() {
        let mut workflow = workflow_with(silent_gateway());
        assert_matches!(workflow.select_slot(slot(1)), Err(AppointmentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_create_without_selection_skips_network() {
        let mut workflow = workflow_with(silent_gateway());
        assert_matches!(workflow.submit_create(None).await, Err(AppointmentError::Validation(_)));

        let mut workflow = ready_workflow(silent_gateway());
        assert_matches!(workflow.submit_create(None).await, Err(AppointmentError::Validation(_)));
        assert_eq!(workflow.state(), WorkflowState::Selecting);
    }

    #[tokio::test]
    async fn test_submit_create_success_discards_draft() {
        let mut gateway = MockAppointmentGateway::new();
        gateway
            .expect_create_appointment()
            .with(eq(CreateAppointmentRequest {
                doctor_id: 7,
                date: date("2025-11-10"),
                time_slot: slot(4),
                notes: Some("test".to_string()),
            }))
            .times(1)
            .returning(|_| {
                Ok(AppointmentCreated {
                    appointment_id: 31,
                    status: Some(AppointmentStatus::Scheduled),
                })
            });

        let mut workflow = ready_workflow(Arc::new(gateway));
        workflow.select_slot(slot(4)).unwrap();

        let outcome = workflow.submit_create(Some("test".to_string())).await.unwrap();

        assert_matches!(outcome, SubmitOutcome::Created(AppointmentCreated { appointment_id: 31, .. }));
        assert_eq!(workflow.state(), WorkflowState::Success);
        assert_eq!(workflow.draft(), &AppointmentDraft::new(7));
        assert!(workflow.last_error().is_none());
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_selection_and_message() {
        let mut gateway = MockAppointmentGateway::new();
        gateway.expect_create_appointment().times(1).returning(|_| {
            Err(AppError::Rejected {
                status: Some(409),
                message: Some("This slot was just taken".to_string()),
            })
        });

        let mut workflow = ready_workflow(Arc::new(gateway));
        workflow.select_slot(slot(9)).unwrap();

        let err = workflow.submit_create(None).await.unwrap_err();

        assert_eq!(err, AppointmentError::Mutation("This slot was just taken".to_string()));
        assert_eq!(workflow.state(), WorkflowState::Selecting);
        assert_eq!(workflow.selected_date(), Some(date("2025-11-10")));
        assert_eq!(workflow.selected_slot(), Some(slot(9)));
        assert_eq!(workflow.last_error(), Some(&err));
    }

    #[tokio::test]
    async fn test_transport_failure_uses_generic_message() {
        let mut gateway = MockAppointmentGateway::new();
        gateway
            .expect_create_appointment()
            .returning(|_| Err(AppError::Transport("connection reset".to_string())));

        let mut workflow = ready_workflow(Arc::new(gateway));
        workflow.select_slot(slot(3)).unwrap();

        assert_eq!(
            workflow.submit_create(None).await,
            Err(AppointmentError::Mutation(shared_models::GENERIC_FAILURE_MESSAGE.to_string()))
        );
    }

    #[test]
    fn test_second_submit_while_submitting_is_rejected() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(3)).unwrap();

        let first = workflow.begin_create(None).unwrap();
        assert!(workflow.is_submitting());

        assert_eq!(workflow.begin_create(None), Err(AppointmentError::SubmissionInProgress));
        assert_eq!(workflow.begin_reschedule(12), Err(AppointmentError::SubmissionInProgress));
        assert_eq!(workflow.begin_cancel(12), Err(AppointmentError::SubmissionInProgress));
        assert_eq!(
            workflow.select_date(date("2025-11-11")),
            Err(AppointmentError::SubmissionInProgress)
        );
        assert_eq!(workflow.reset(), Err(AppointmentError::SubmissionInProgress));

        let result = workflow.finish(
            first,
            Err(AppError::Rejected { status: Some(500), message: None }),
        );
        assert!(result.is_err());
        assert_eq!(workflow.state(), WorkflowState::Selecting);
        assert!(workflow.begin_create(None).is_ok());
    }

    #[test]
    fn test_finish_outside_submitting_is_rejected() {
        let mut workflow = workflow_with(silent_gateway());

        let first = workflow.begin_cancel(5).unwrap();
        let outcome = workflow.finish(first, Ok(SubmitOutcome::Patched(AppointmentPatch::Cancel { appointment_id: 5 })));
        assert!(outcome.is_ok());
        assert_eq!(workflow.state(), WorkflowState::Success);

        let late = Submission {
            intent: SubmissionIntent::Cancel { appointment_id: 5 },
            resume: WorkflowState::Idle,
        };
        let result = workflow.finish(late, Err(AppError::Transport("connection reset".to_string())));

        assert_eq!(result, Err(AppointmentError::InvalidState(WorkflowState::Success)));
        assert_eq!(workflow.state(), WorkflowState::Success);
        assert!(workflow.last_error().is_none());
    }

    #[test]
    fn test_finish_without_begin_is_rejected() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(3)).unwrap();

        let unsolicited = Submission {
            intent: SubmissionIntent::Cancel { appointment_id: 5 },
            resume: WorkflowState::Idle,
        };
        let result = workflow.finish(unsolicited, Ok(SubmitOutcome::Patched(AppointmentPatch::Cancel { appointment_id: 5 })));

        assert_eq!(result, Err(AppointmentError::InvalidState(WorkflowState::Selecting)));
        assert_eq!(workflow.state(), WorkflowState::Selecting);
        assert_eq!(workflow.selected_slot(), Some(slot(3)));
    }

    #[test]
    fn test_refresh_resolving_mid_submit_keeps_selection() {
        let mut workflow = ready_workflow(silent_gateway());
        workflow.select_slot(slot(4)).unwrap();

        let ticket = workflow.refresh_availability().unwrap();
        let submission = workflow.begin_create(None).unwrap();

        assert_eq!(workflow.apply_availability(respond(ticket, &[])), AvailabilityApplied::Discarded);
        assert_eq!(workflow.selected_slot(), Some(slot(4)));
        assert!(!workflow.is_loading_availability());

        let result = workflow.finish(
            submission,
            Err(AppError::Rejected { status: Some(500), message: None }),
        );
        assert!(result.is_err());
        assert_eq!(workflow.state(), WorkflowState::Selecting);
        assert_eq!(workflow.selected_date(), Some(date("2025-11-10")));
        assert_eq!(workflow.selected_slot(), Some(slot(4)));
    }

    #[tokio::test]
    async fn test_availability_after_success_is_discarded() {
        let mut gateway = MockAppointmentGateway::new();
        gateway.expect_cancel_appointment().times(1).returning(|_| Ok(()));

        let mut workflow = ready_workflow(Arc::new(gateway));
        workflow.select_slot(slot(4)).unwrap();
        let ticket = workflow.refresh_availability().unwrap();
        workflow.submit_cancel(5).await.unwrap();

        assert_eq!(workflow.apply_availability(respond(ticket, &[1])), AvailabilityApplied::Discarded);
        assert_eq!(workflow.state(), WorkflowState::Success);
    }

    #[tokio::test]
    async fn test_reschedule_returns_patch() {
        let mut gateway = MockAppointmentGateway::new();
        gateway
            .expect_reschedule_appointment()
            .with(
                eq(12),
                eq(RescheduleAppointmentRequest {
                    appointment_date: date("2025-12-02"),
                    time_slot: slot(1),
                }),
            )
            .times(1)
            .returning(|_, _| Ok(()));

        let mut workflow = BookingWorkflow::new(
            7,
            BookingWindow::reschedule(date("2025-11-20")),
            silent_provider(),
            Arc::new(gateway),
        );
        let ticket = workflow.select_date(date("2025-12-02")).unwrap().unwrap();
        workflow.apply_availability(respond(ticket, &[1, 2]));
        workflow.select_slot(slot(1)).unwrap();

        let outcome = workflow.submit_reschedule(12).await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Patched(AppointmentPatch::Reschedule {
                appointment_id: 12,
                date: date("2025-12-02"),
                slot: slot(1),
            })
        );
        assert_eq!(workflow.state(), WorkflowState::Success);
    }

    #[test]
    fn test_reschedule_draft_starts_from_appointment() {
        let appointment = Appointment {
            appointment_id: 12,
            doctor_id: 7,
            doctor_name: "Dr. Test".to_string(),
            department_name: "General Medicine".to_string(),
            patient_name: None,
            date: date("2025-12-01"),
            time_slot: 2,
            status: AppointmentStatus::Scheduled,
            notes: None,
        };

        let mut workflow = BookingWorkflow::for_reschedule(
            &appointment,
            BookingWindow::reschedule(date("2025-11-20")),
            silent_provider(),
            silent_gateway(),
        );
        assert_eq!(workflow.state(), WorkflowState::Selecting);
        assert_eq!(workflow.selected_slot(), Some(slot(2)));

        workflow.select_date(date("2025-12-02")).unwrap();
        assert_eq!(workflow.selected_slot(), None);
    }

    #[test]
    fn test_reschedule_onto_original_slot_is_refused() {
        let appointment = Appointment {
            appointment_id: 12,
            doctor_id: 7,
            doctor_name: "Dr. Test".to_string(),
            department_name: "General Medicine".to_string(),
            patient_name: None,
            date: date("2025-12-01"),
            time_slot: 2,
            status: AppointmentStatus::Scheduled,
            notes: None,
        };

        let mut workflow = BookingWorkflow::for_reschedule(
            &appointment,
            BookingWindow::reschedule(date("2025-11-20")),
            silent_provider(),
            silent_gateway(),
        );

        assert_matches!(workflow.begin_reschedule(12), Err(AppointmentError::Validation(_)));
        assert_eq!(workflow.state(), WorkflowState::Selecting);

        let ticket = workflow.refresh_availability().unwrap();
        workflow.apply_availability(respond(ticket, &[2, 3]));
        workflow.select_slot(slot(3)).unwrap();
        assert!(workflow.begin_reschedule(12).is_ok());
    }

    #[tokio::test]
    async fn test_cancel_needs_no_selection() {
        let mut gateway = MockAppointmentGateway::new();
        gateway
            .expect_cancel_appointment()
            .with(eq(5))
            .times(1)
            .returning(|_| Ok(()));

        let mut workflow = workflow_with(Arc::new(gateway));
        let outcome = workflow.submit_cancel(5).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Patched(AppointmentPatch::Cancel { appointment_id: 5 }));
        assert_eq!(workflow.state(), WorkflowState::Success);
    }

    #[tokio::test]
    async fn test_failed_cancel_returns_to_previous_state() {
        let mut gateway = MockAppointmentGateway::new();
        gateway.expect_cancel_appointment().returning(|_| {
            Err(AppError::Rejected {
                status: Some(400),
                message: Some("Appointment already completed".to_string()),
            })
        });

        let mut workflow = workflow_with(Arc::new(gateway));
        let err = workflow.submit_cancel(5).await.unwrap_err();

        assert_eq!(err.user_message(), "Appointment already completed");
        assert_eq!(workflow.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_success_is_terminal_until_reset() {
        let mut gateway = MockAppointmentGateway::new();
        gateway.expect_cancel_appointment().times(1).returning(|_| Ok(()));

        let mut workflow = workflow_with(Arc::new(gateway));
        workflow.submit_cancel(5).await.unwrap();

        assert_eq!(
            workflow.select_date(date("2025-11-10")),
            Err(AppointmentError::InvalidState(WorkflowState::Success))
        );
        assert_matches!(workflow.begin_cancel(5), Err(AppointmentError::InvalidState(_)));

        workflow.reset().unwrap();
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(workflow.select_date(date("2025-11-10")).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_change_date_fetches_through_query() {
        let mut provider = MockAvailabilityProvider::new();
        provider
            .expect_available_slots()
            .with(eq(7), eq(date("2025-11-10")))
            .times(1)
            .returning(|_, _| Ok(vec![3, 4, 9]));
        provider
            .expect_available_slots()
            .with(eq(7), eq(date("2025-11-11")))
            .times(1)
            .returning(|_, _| Err(AppointmentError::AvailabilityFetch("Service unavailable".to_string())));

        let mut workflow = BookingWorkflow::new(
            7,
            BookingWindow::fresh(today(), 30),
            AvailabilityQuery::new(Arc::new(provider)),
            silent_gateway(),
        );

        workflow.change_date(date("2025-11-10")).await.unwrap();
        assert_eq!(workflow.available_slots(), window_of(7, "2025-11-10", &[3, 4, 9]).available);

        let err = workflow.change_date(date("2025-11-11")).await.unwrap_err();
        assert_eq!(err.user_message(), "Service unavailable");
        assert!(workflow.available_slots().is_empty());
    }
}
