use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::domain::{Application, FormField, FormPatch, FormStep, FormValues};
use super::form_state::{FormStateHolder, SchemaFormState};
use super::gateway::{ApplicationGateway, InsertError};
use super::machine::{transition, TransitionRefused, WizardEvent, WizardState};
use super::schema::ValidationReport;
use super::sinks::{Navigator, Notification, Notifier};
use crate::config::SubmissionConfig;

pub const SUCCESS_TITLE: &str = "Application submitted";
pub const SUCCESS_DESCRIPTION: &str =
    "Thank you! We will review your application and get back to you soon.";
pub const FAILURE_TITLE: &str = "Submission failed";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("fields not shown on the current step: {}", join_fields(.fields))]
    FieldsNotOnStep { fields: Vec<FormField> },
    #[error("values cannot change while a submission is in flight")]
    SubmissionInFlight,
}

fn join_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Refused(#[from] TransitionRefused),
    #[error(transparent)]
    Insert(#[from] InsertError),
}

/// Handed back after the backend acknowledged the application.
#[derive(Debug)]
pub struct SubmissionReceipt {
    pub route: String,
    /// Completes once the delayed navigation has fired.
    pub redirect: JoinHandle<()>,
}

/// Drives the three-step application form.
///
/// Owns the step state and a [`FormStateHolder`]; validation gates `next` and
/// `submit`, `back` never validates. Submission talks to the gateway once and
/// reports through the notifier and navigator.
pub struct StepFormController<G, N, V, H = SchemaFormState> {
    form: H,
    state: WizardState,
    gateway: Arc<G>,
    notifier: Arc<N>,
    navigator: Arc<V>,
    settings: SubmissionConfig,
}

impl<G, N, V> StepFormController<G, N, V, SchemaFormState>
where
    G: ApplicationGateway + 'static,
    N: Notifier + 'static,
    V: Navigator + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        notifier: Arc<N>,
        navigator: Arc<V>,
        settings: SubmissionConfig,
    ) -> Self {
        Self::with_form(
            SchemaFormState::default(),
            gateway,
            notifier,
            navigator,
            settings,
        )
    }
}

impl<G, N, V, H> StepFormController<G, N, V, H>
where
    G: ApplicationGateway + 'static,
    N: Notifier + 'static,
    V: Navigator + 'static,
    H: FormStateHolder,
{
    pub fn with_form(
        form: H,
        gateway: Arc<G>,
        notifier: Arc<N>,
        navigator: Arc<V>,
        settings: SubmissionConfig,
    ) -> Self {
        Self {
            form,
            state: WizardState::initial(),
            gateway,
            notifier,
            navigator,
            settings,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Step on screen; `None` while submitting.
    pub fn current_step(&self) -> Option<FormStep> {
        self.state.step()
    }

    pub fn values(&self) -> &FormValues {
        self.form.values()
    }

    pub fn errors(&self) -> &ValidationReport {
        self.form.errors()
    }

    pub fn is_submitting(&self) -> bool {
        self.state == WizardState::Submitting
    }

    /// Apply edits made on the current step.
    pub fn edit(&mut self, patch: FormPatch) -> Result<(), EditError> {
        let step = self.current_step().ok_or(EditError::SubmissionInFlight)?;
        let foreign: Vec<FormField> = patch
            .fields()
            .into_iter()
            .filter(|field| field.step() != step)
            .collect();
        if !foreign.is_empty() {
            return Err(EditError::FieldsNotOnStep { fields: foreign });
        }

        self.form.edit(patch);
        Ok(())
    }

    pub fn next(&mut self) -> Result<FormStep, TransitionRefused> {
        let report = match self.state {
            WizardState::Editing(step) if !step.is_last() => {
                self.form.validate_fields(step.fields())
            }
            _ => ValidationReport::passed(),
        };
        self.apply(WizardEvent::Next, &report)
    }

    pub fn back(&mut self) -> Result<FormStep, TransitionRefused> {
        self.apply(WizardEvent::Back, &ValidationReport::passed())
    }

    /// Validate everything and enter `Submitting`, returning the row to insert.
    ///
    /// Pair with [`finish_submit`](Self::finish_submit) when the insert has to run
    /// outside of `&mut self`, e.g. behind a lock that must not be held across the
    /// network call.
    pub fn begin_submit(&mut self) -> Result<Application, TransitionRefused> {
        let validated = match self.state {
            WizardState::Editing(step) if step.is_last() => self.form.validate_all(),
            _ => Err(ValidationReport::passed()),
        };

        let report = validated
            .as_ref()
            .err()
            .cloned()
            .unwrap_or_else(ValidationReport::passed);
        let next = transition(self.state, WizardEvent::Submit, &report).map_err(|refused| {
            warn!(state = %self.state, %refused, "submission refused");
            refused
        })?;

        let application = validated.map_err(TransitionRefused::Invalid)?;
        self.state = next;
        info!("application validated, submitting");
        Ok(application)
    }

    /// Resolve an in-flight submission with the gateway result.
    ///
    /// Success resets the form to step 1 right away and schedules navigation after
    /// the configured delay. Failure keeps every value and returns to the last step.
    pub fn finish_submit(
        &mut self,
        result: Result<(), InsertError>,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let event = if result.is_ok() {
            WizardEvent::SubmissionSucceeded
        } else {
            WizardEvent::SubmissionFailed
        };
        self.state = transition(self.state, event, &ValidationReport::passed())?;

        match result {
            Ok(()) => {
                info!("application submitted");
                self.notifier
                    .notify(Notification::success(SUCCESS_TITLE, SUCCESS_DESCRIPTION));
                self.form.reset();
                Ok(self.schedule_redirect())
            }
            Err(err) => {
                warn!(error = %err, "application submission failed");
                self.notifier
                    .notify(Notification::error(FAILURE_TITLE, err.user_message()));
                Err(SubmitError::Insert(err))
            }
        }
    }

    /// Validate, insert exactly one row, and resolve the outcome.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, SubmitError> {
        let application = self.begin_submit()?;
        let result = self.gateway.insert(vec![application]).await;
        self.finish_submit(result)
    }

    fn apply(
        &mut self,
        event: WizardEvent,
        report: &ValidationReport,
    ) -> Result<FormStep, TransitionRefused> {
        match transition(self.state, event, report) {
            Ok(next) => {
                info!(from = %self.state, to = %next, %event, "form step changed");
                self.state = next;
                Ok(next.step().unwrap_or(FormStep::first()))
            }
            Err(refused) => {
                warn!(state = %self.state, %event, %refused, "form transition refused");
                Err(refused)
            }
        }
    }

    fn schedule_redirect(&self) -> SubmissionReceipt {
        let navigator = Arc::clone(&self.navigator);
        let route = self.settings.success_route.clone();
        let delay = self.settings.redirect_delay;
        let target = route.clone();
        let redirect = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(&target);
        });
        SubmissionReceipt { route, redirect }
    }
}
