use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::SubmissionConfig;
use crate::workflows::intake::domain::{Application, FormPatch, FormStep, FormValues};
use crate::workflows::intake::gateway::{ApplicationGateway, InsertError};
use crate::workflows::intake::session::{IntakeSessionService, SessionId};
use crate::workflows::intake::sinks::RecordingSink;
use crate::workflows::intake::StepFormController;

/// Gateway that records every insert and replies with a scripted result.
#[derive(Default)]
pub(super) struct MemoryGateway {
    calls: Mutex<Vec<Vec<Application>>>,
    failure: Mutex<Option<InsertError>>,
}

impl MemoryGateway {
    pub(super) fn failing(error: InsertError) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(Some(error)),
        }
    }

    pub(super) fn recover(&self) {
        *self.failure.lock().expect("gateway mutex poisoned") = None;
    }

    pub(super) fn calls(&self) -> Vec<Vec<Application>> {
        self.calls.lock().expect("gateway mutex poisoned").clone()
    }
}

#[async_trait]
impl ApplicationGateway for MemoryGateway {
    async fn insert(&self, rows: Vec<Application>) -> Result<(), InsertError> {
        self.calls.lock().expect("gateway mutex poisoned").push(rows);
        match self.failure.lock().expect("gateway mutex poisoned").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub(super) type TestController = StepFormController<MemoryGateway, RecordingSink, RecordingSink>;

pub(super) fn settings() -> SubmissionConfig {
    SubmissionConfig {
        success_route: "/?submitted=true".to_string(),
        redirect_delay: Duration::from_millis(1500),
    }
}

pub(super) fn controller_with(
    gateway: MemoryGateway,
) -> (TestController, Arc<MemoryGateway>, Arc<RecordingSink>) {
    let gateway = Arc::new(gateway);
    let sink = Arc::new(RecordingSink::default());
    let controller =
        StepFormController::new(gateway.clone(), sink.clone(), sink.clone(), settings());
    (controller, gateway, sink)
}

pub(super) fn controller() -> (TestController, Arc<MemoryGateway>, Arc<RecordingSink>) {
    controller_with(MemoryGateway::default())
}

/// The scenario applicant: every field valid.
pub(super) fn jane() -> FormValues {
    FormValues {
        has_only_fans: "yes".to_string(),
        only_fans_duration: "1-2 years".to_string(),
        has_agency: "no".to_string(),
        monthly_earning: "$1000-5000".to_string(),
        instagram_handle: "@jane".to_string(),
        content_type: vec!["photos".to_string()],
        help_needed: vec!["marketing".to_string()],
        full_name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone_number: "555-0100".to_string(),
        additional_notes: None,
    }
}

pub(super) fn step_patch(values: &FormValues, step: FormStep) -> FormPatch {
    FormPatch::for_step(values, step)
}

/// Fill and advance through the first two steps, then fill the contact step.
pub(super) fn fill_to_contact(controller: &mut TestController, values: &FormValues) {
    controller
        .edit(step_patch(values, FormStep::Background))
        .expect("background fields editable");
    controller.next().expect("background valid");
    controller
        .edit(step_patch(values, FormStep::ContentDetails))
        .expect("content fields editable");
    controller.next().expect("content details valid");
    controller
        .edit(step_patch(values, FormStep::Contact))
        .expect("contact fields editable");
}

pub(super) fn session_service<G>(gateway: Arc<G>) -> Arc<IntakeSessionService<G>>
where
    G: ApplicationGateway + 'static,
{
    Arc::new(IntakeSessionService::new(gateway, settings()))
}

/// Gateway that holds every insert open until released, then replies with the
/// scripted outcome.
#[derive(Default)]
pub(super) struct GatedGateway {
    pub(super) entered: Notify,
    pub(super) release: Notify,
    failure: Option<InsertError>,
}

impl GatedGateway {
    pub(super) fn failing(error: InsertError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ApplicationGateway for GatedGateway {
    async fn insert(&self, _rows: Vec<Application>) -> Result<(), InsertError> {
        self.entered.notify_one();
        self.release.notified().await;
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Open a session and fill it up to the contact step.
pub(super) fn session_on_contact<G>(service: &IntakeSessionService<G>) -> SessionId
where
    G: ApplicationGateway + 'static,
{
    let id = service.open().expect("session opens").session_id;
    for step in FormStep::ordered() {
        service
            .edit(&id, step_patch(&jane(), step))
            .expect("step fields editable");
        if !step.is_last() {
            service.next(&id).expect("step valid");
        }
    }
    id
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
