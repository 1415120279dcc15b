use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::controller::{EditError, StepFormController, SubmitError};
use super::domain::{FormPatch, FormValues};
use super::gateway::{ApplicationGateway, InsertError};
use super::machine::{TransitionRefused, WizardState};
use super::schema::{ApplicationSchema, ValidationReport};
use super::sinks::{Notification, RecordingSink};
use crate::config::{SessionConfig, SubmissionConfig};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("intake-{id:06}"))
}

type SessionController<G> = StepFormController<G, RecordingSink, RecordingSink>;

struct IntakeSession<G> {
    controller: SessionController<G>,
    feed: Arc<RecordingSink>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

type SessionStore<G> = Arc<Mutex<HashMap<SessionId, IntakeSession<G>>>>;

/// Snapshot of one session returned by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub state: WizardState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_title: Option<&'static str>,
    pub progress_percent: u8,
    pub values: FormValues,
    pub errors: BTreeMap<String, String>,
    pub notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("intake session not found")]
    NotFound,
    #[error("too many open intake sessions, try again later")]
    AtCapacity,
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Refused(#[from] TransitionRefused),
    #[error(transparent)]
    Insert(#[from] InsertError),
}

impl From<SubmitError> for SessionError {
    fn from(value: SubmitError) -> Self {
        match value {
            SubmitError::Refused(refused) => Self::Refused(refused),
            SubmitError::Insert(err) => Self::Insert(err),
        }
    }
}

/// In-memory store of form sessions sharing one gateway.
///
/// Idle sessions are evicted when a new one is opened; the store refuses new
/// sessions once `capacity` are open.
pub struct IntakeSessionService<G> {
    gateway: Arc<G>,
    settings: SubmissionConfig,
    limits: SessionConfig,
    sessions: SessionStore<G>,
}

impl<G> IntakeSessionService<G>
where
    G: ApplicationGateway + 'static,
{
    pub fn new(gateway: Arc<G>, settings: SubmissionConfig) -> Self {
        Self {
            gateway,
            settings,
            limits: SessionConfig::default(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_limits(mut self, limits: SessionConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn open(&self) -> Result<SessionView, SessionError> {
        let now = Utc::now();
        self.evict_idle(now);

        let feed = Arc::new(RecordingSink::default());
        let controller = StepFormController::new(
            Arc::clone(&self.gateway),
            Arc::clone(&feed),
            Arc::clone(&feed),
            self.settings.clone(),
        );
        let id = next_session_id();
        let session = IntakeSession {
            controller,
            feed,
            created_at: now,
            last_active: now,
        };
        let view = view_of(&id, &session);

        let mut sessions = lock(&self.sessions);
        if sessions.len() >= self.limits.capacity {
            warn!(open = sessions.len(), "intake session store full");
            return Err(SessionError::AtCapacity);
        }
        sessions.insert(id.clone(), session);
        info!(session = %id.0, "intake session opened");
        Ok(view)
    }

    pub fn view(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        with_session(&self.sessions, id, |_| Ok(()))
    }

    pub fn edit(&self, id: &SessionId, patch: FormPatch) -> Result<SessionView, SessionError> {
        with_session(&self.sessions, id, |session| {
            session.controller.edit(patch)?;
            Ok(())
        })
    }

    pub fn next(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        with_session(&self.sessions, id, |session| {
            session.controller.next()?;
            Ok(())
        })
    }

    pub fn back(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        with_session(&self.sessions, id, |session| {
            session.controller.back()?;
            Ok(())
        })
    }

    /// Submit the session's application.
    ///
    /// The insert and its resolution run on a spawned task, so the session leaves
    /// `Submitting` even when the caller stops waiting. The store lock is not held
    /// across the insert; `Submitting` turns away a concurrent submit.
    pub async fn submit(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        let application = {
            let mut sessions = lock(&self.sessions);
            let session = sessions.get_mut(id).ok_or(SessionError::NotFound)?;
            session.last_active = Utc::now();
            session.controller.begin_submit()?
        };

        let gateway = Arc::clone(&self.gateway);
        let sessions = Arc::clone(&self.sessions);
        let session_id = id.clone();
        let resolution = tokio::spawn(async move {
            let result = gateway.insert(vec![application]).await;
            with_session(&sessions, &session_id, |session| {
                session.controller.finish_submit(result)?;
                Ok(())
            })
        });

        resolution.await.map_err(|err| {
            SessionError::Insert(InsertError::Unknown(Some(format!(
                "submission task failed: {err}"
            ))))
        })?
    }

    /// Validate and insert a complete application without a session.
    pub async fn submit_once(&self, values: &FormValues) -> Result<(), SessionError> {
        let application = ApplicationSchema
            .parse(values)
            .map_err(TransitionRefused::Invalid)?;
        self.gateway.insert(vec![application]).await?;
        Ok(())
    }

    /// Drop sessions idle for longer than the configured TTL at `now`.
    ///
    /// Sessions with an insert in flight are kept until it resolves.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.limits.idle_ttl;
        let mut sessions = lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, session| {
            let idle = (now - session.last_active)
                .to_std()
                .map(|age| age > ttl)
                .unwrap_or(false);
            !idle || session.controller.is_submitting()
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "idle intake sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }

    /// Current view of a session without touching it; used for error responses.
    pub fn peek(&self, id: &SessionId) -> Option<SessionView> {
        let sessions = lock(&self.sessions);
        sessions.get(id).map(|session| view_of(id, session))
    }
}

fn lock<G>(
    sessions: &Mutex<HashMap<SessionId, IntakeSession<G>>>,
) -> std::sync::MutexGuard<'_, HashMap<SessionId, IntakeSession<G>>> {
    sessions.lock().expect("session store mutex poisoned")
}

/// Run `action` against a session, mark it active and return its view.
fn with_session<G, F>(
    sessions: &Mutex<HashMap<SessionId, IntakeSession<G>>>,
    id: &SessionId,
    action: F,
) -> Result<SessionView, SessionError>
where
    G: ApplicationGateway + 'static,
    F: FnOnce(&mut IntakeSession<G>) -> Result<(), SessionError>,
{
    let mut sessions = lock(sessions);
    let session = sessions.get_mut(id).ok_or(SessionError::NotFound)?;
    session.last_active = Utc::now();
    action(session)?;
    Ok(view_of(id, session))
}

fn view_of<G>(id: &SessionId, session: &IntakeSession<G>) -> SessionView
where
    G: ApplicationGateway + 'static,
{
    let controller = &session.controller;
    let step = controller.current_step();
    let errors = error_map(controller.errors());

    SessionView {
        session_id: id.clone(),
        state: controller.state(),
        step: step.map(|step| step.index()),
        step_title: step.map(|step| step.title()),
        progress_percent: step.map(|step| step.progress_percent()).unwrap_or(100),
        values: controller.values().clone(),
        errors,
        notifications: session.feed.notifications(),
        redirect: session.feed.last_route(),
        created_at: session.created_at,
    }
}

pub(crate) fn error_map(report: &ValidationReport) -> BTreeMap<String, String> {
    report
        .errors()
        .iter()
        .map(|(field, message)| (field.name().to_string(), message.clone()))
        .collect()
}
