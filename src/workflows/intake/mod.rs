//! Creator application intake: a three-step form gated by per-step validation.
//!
//! [`StepFormController`] owns the step state and a [`FormStateHolder`]. Moving
//! forward validates only the fields of the current step, moving back never
//! validates, and submission validates everything before handing exactly one row
//! to an [`ApplicationGateway`]. Outcomes are reported through [`Notifier`] and
//! [`Navigator`] so the same controller serves the HTTP session surface and the CLI.

pub mod controller;
pub mod domain;
pub mod form_state;
pub mod gateway;
pub mod machine;
pub mod router;
pub mod schema;
pub mod session;
pub mod sinks;

#[cfg(test)]
mod tests;

pub use controller::{EditError, StepFormController, SubmissionReceipt, SubmitError};
pub use domain::{Application, FormField, FormPatch, FormStep, FormValues, YesNo};
pub use form_state::{FormStateHolder, SchemaFormState};
pub use gateway::{ApplicationGateway, InsertError, RestApplicationGateway};
pub use machine::{transition, TransitionRefused, WizardEvent, WizardState};
pub use router::intake_router;
pub use schema::{ApplicationSchema, ValidationReport};
pub use session::{IntakeSessionService, SessionError, SessionId, SessionView};
pub use sinks::{Navigator, Notification, NotificationVariant, Notifier, RecordingSink};
