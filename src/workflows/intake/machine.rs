use std::fmt;

use serde::Serialize;

use super::domain::FormStep;
use super::schema::ValidationReport;

/// Where the applicant is in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum WizardState {
    Editing(FormStep),
    /// The insert request is in flight; every action except its resolution is refused.
    Submitting,
}

impl WizardState {
    pub const fn initial() -> Self {
        Self::Editing(FormStep::first())
    }

    pub const fn step(self) -> Option<FormStep> {
        match self {
            Self::Editing(step) => Some(step),
            Self::Submitting => None,
        }
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Editing(step) => write!(f, "{step}"),
            Self::Submitting => f.write_str("submitting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardEvent {
    Next,
    Back,
    Submit,
    SubmissionSucceeded,
    SubmissionFailed,
}

impl fmt::Display for WizardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Next => "next",
            Self::Back => "back",
            Self::Submit => "submit",
            Self::SubmissionSucceeded => "submission succeeded",
            Self::SubmissionFailed => "submission failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionRefused {
    #[error("{} field(s) need attention: {}", .0.len(), .0.summary())]
    Invalid(ValidationReport),
    #[error("'{event}' is not available at {state}")]
    Unavailable {
        state: WizardState,
        event: WizardEvent,
    },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

/// Compute the next state.
///
/// `validation` must cover the fields the event gates on: the current step's fields
/// for `Next`, every field for `Submit`. It is ignored for the other events.
pub fn transition(
    state: WizardState,
    event: WizardEvent,
    validation: &ValidationReport,
) -> Result<WizardState, TransitionRefused> {
    use WizardEvent::*;
    use WizardState::*;

    let unavailable = || TransitionRefused::Unavailable { state, event };

    match (state, event) {
        (Editing(step), Next) => {
            let next = step.next().ok_or_else(unavailable)?;
            if validation.is_valid() {
                Ok(Editing(next))
            } else {
                Err(TransitionRefused::Invalid(validation.clone()))
            }
        }
        (Editing(step), Back) => step.previous().map(Editing).ok_or_else(unavailable),
        (Editing(step), Submit) if step.is_last() => {
            if validation.is_valid() {
                Ok(Submitting)
            } else {
                Err(TransitionRefused::Invalid(validation.clone()))
            }
        }
        (Submitting, SubmissionSucceeded) => Ok(Editing(FormStep::first())),
        (Submitting, SubmissionFailed) => Ok(Editing(FormStep::Contact)),
        (Submitting, _) => Err(TransitionRefused::SubmissionInFlight),
        (Editing(_), Submit | SubmissionSucceeded | SubmissionFailed) => Err(unavailable()),
    }
}
