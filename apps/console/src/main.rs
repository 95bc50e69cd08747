use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_cell::{
    Appointment, AppointmentLifecycleService, AppointmentService, AvailabilityQuery, BookingWindow,
    BookingWorkflow, SlotCatalog, SubmitOutcome,
};
use auth_cell::SessionStore;
use doctor_cell::DoctorAvailabilityService;
use shared_api_client::ApiClient;
use shared_config::AppConfig;
use shared_models::Role;

const USAGE: &str = "usage: booking-console [slots <doctorId> <yyyy-MM-dd> | book <doctorId> <yyyy-MM-dd> <slot> [notes] | cancel <appointmentId>]";

struct Console {
    config: AppConfig,
    session: Arc<SessionStore>,
    client: Arc<ApiClient>,
    today: NaiveDate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting booking console");

    let config = AppConfig::from_env();
    let session = Arc::new(SessionStore::new(&config));

    match env::var("BOOKING_SESSION_TOKEN") {
        Ok(token) if !token.trim().is_empty() => {
            let current = session.login(token.trim())?;
            info!("Signed in as {} ({})", current.display_name(), current.role());
        }
        _ => warn!("BOOKING_SESSION_TOKEN not set, requests will be sent without credentials"),
    }

    let client = Arc::new(ApiClient::new(&config, session.clone())?);
    let console = Console {
        config,
        session,
        client,
        today: Local::now().date_naive(),
    };

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => console.list_appointments().await,
        ["slots", doctor_id, date] => console.show_slots(parse_id(doctor_id)?, parse_date(date)?).await,
        ["book", doctor_id, date, slot, notes @ ..] => {
            let notes = (!notes.is_empty()).then(|| notes.join(" "));
            console
                .book(parse_id(doctor_id)?, parse_date(date)?, slot.parse().context("slot must be a number")?, notes)
                .await
        }
        ["cancel", appointment_id] => console.cancel(parse_id(appointment_id)?).await,
        _ => bail!(USAGE),
    }
}

fn parse_id(raw: &str) -> anyhow::Result<i64> {
    raw.parse().with_context(|| format!("invalid id: {}", raw))
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {}", raw))
}

impl Console {
    fn workflow(&self, doctor_id: i64) -> BookingWorkflow {
        let availability = DoctorAvailabilityService::new(Arc::clone(&self.client));
        BookingWorkflow::new(
            doctor_id,
            BookingWindow::fresh(self.today, self.config.booking_horizon_days),
            AvailabilityQuery::new(Arc::new(availability)),
            Arc::new(AppointmentService::new(Arc::clone(&self.client))),
        )
    }

    async fn list_appointments(&self) -> anyhow::Result<()> {
        let role = self
            .session
            .role()
            .ok_or_else(|| anyhow!("Sign in with BOOKING_SESSION_TOKEN to list appointments"))?;
        let service = AppointmentService::new(Arc::clone(&self.client));

        let appointments = match role {
            Role::Patient => service.list_patient_appointments().await?,
            Role::Doctor => service.list_doctor_appointments().await?,
            Role::Admin => {
                println!("Administrators have no personal appointment list.");
                return Ok(());
            }
        };

        if appointments.is_empty() {
            println!("No appointments.");
        }
        let lifecycle = AppointmentLifecycleService::new();
        for appointment in &appointments {
            print_appointment(&lifecycle, role, appointment, self.today);
        }
        Ok(())
    }

    async fn show_slots(&self, doctor_id: i64, date: NaiveDate) -> anyhow::Result<()> {
        let mut workflow = self.workflow(doctor_id);
        workflow.change_date(date).await?;

        println!("Doctor {} on {}:", doctor_id, date);
        for button in workflow.slot_grid() {
            let marker = if button.enabled { "open" } else { "-" };
            println!("  {:>2}  {:<15} {}", button.slot.index(), button.label, marker);
        }
        Ok(())
    }

    async fn book(&self, doctor_id: i64, date: NaiveDate, slot: i32, notes: Option<String>) -> anyhow::Result<()> {
        let mut workflow = self.workflow(doctor_id);
        workflow.change_date(date).await?;
        workflow.select_slot_index(slot)?;

        match workflow.submit_create(notes).await? {
            SubmitOutcome::Created(created) => println!(
                "Booked appointment {} on {} at {}",
                created.appointment_id,
                date,
                SlotCatalog::display(slot)
            ),
            SubmitOutcome::Patched(patch) => println!("Updated appointment {}", patch.appointment_id()),
        }
        Ok(())
    }

    async fn cancel(&self, appointment_id: i64) -> anyhow::Result<()> {
        let mut workflow = self.workflow(0);
        workflow.submit_cancel(appointment_id).await?;
        println!("Cancelled appointment {}", appointment_id);
        Ok(())
    }
}

fn print_appointment(lifecycle: &AppointmentLifecycleService, role: Role, appointment: &Appointment, today: NaiveDate) {
    let actions = lifecycle.actions_for(role, appointment, today);

    let mut offered = Vec::new();
    if actions.can_reschedule {
        offered.push("reschedule");
    }
    if actions.can_cancel {
        offered.push("cancel");
    }
    if actions.can_complete {
        offered.push("complete");
    }

    println!(
        "#{:<6} {} {:<15} {:<20} {:<10} {}",
        appointment.appointment_id,
        appointment.date,
        SlotCatalog::display(appointment.time_slot),
        appointment.doctor_name,
        appointment.status,
        offered.join(", ")
    );
}
