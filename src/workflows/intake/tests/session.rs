use std::sync::Arc;

use chrono::Utc;

use super::common::*;
use crate::workflows::intake::domain::FormStep;
use crate::workflows::intake::gateway::InsertError;
use crate::workflows::intake::machine::WizardState;
use crate::workflows::intake::session::{IntakeSessionService, SessionError, SessionId, SessionView};
use crate::workflows::intake::sinks::NotificationVariant;

/// Start a submit on its own task, wait until the insert is in flight, then
/// cancel the caller the way a dropped connection does.
async fn abandon_submit(
    service: &Arc<IntakeSessionService<GatedGateway>>,
    gateway: &GatedGateway,
    id: &SessionId,
) {
    let request = tokio::spawn({
        let service = Arc::clone(service);
        let id = id.clone();
        async move { service.submit(&id).await }
    });
    gateway.entered.notified().await;

    request.abort();
    let joined = request.await.expect_err("request cancelled");
    assert!(joined.is_cancelled());
}

async fn settled_view(
    service: &IntakeSessionService<GatedGateway>,
    id: &SessionId,
) -> SessionView {
    for _ in 0..100 {
        let view = service.view(id).expect("session kept");
        if view.state != WizardState::Submitting {
            return view;
        }
        tokio::task::yield_now().await;
    }
    panic!("submission never resolved");
}

#[tokio::test]
async fn abandoned_failing_submit_returns_to_contact_step() {
    let gateway = Arc::new(GatedGateway::failing(InsertError::Connectivity {
        detail: "connection reset".to_string(),
    }));
    let service = session_service(gateway.clone());
    let id = session_on_contact(&service);

    abandon_submit(&service, &gateway, &id).await;
    assert_eq!(
        service.view(&id).expect("session kept").state,
        WizardState::Submitting
    );

    gateway.release.notify_one();
    let view = settled_view(&service, &id).await;

    assert_eq!(view.state, WizardState::Editing(FormStep::Contact));
    assert_eq!(view.values, jane());
    assert_eq!(
        view.notifications.last().map(|n| n.variant),
        Some(NotificationVariant::Destructive)
    );

    let view = service.back(&id).expect("back is available again");
    assert_eq!(view.step, Some(2));
}

#[tokio::test]
async fn abandoned_successful_submit_still_resets_the_form() {
    let gateway = Arc::new(GatedGateway::default());
    let service = session_service(gateway.clone());
    let id = session_on_contact(&service);

    abandon_submit(&service, &gateway, &id).await;
    gateway.release.notify_one();
    let view = settled_view(&service, &id).await;

    assert_eq!(view.state, WizardState::initial());
    assert_eq!(view.notifications.len(), 1);
    assert_eq!(view.notifications[0].variant, NotificationVariant::Default);
}

#[test]
fn idle_sessions_are_evicted() {
    let service = session_service(Arc::new(MemoryGateway::default()));
    let stale = service.open().expect("session opens").session_id;

    assert_eq!(service.evict_idle(Utc::now()), 0);
    assert_eq!(service.len(), 1);

    let later = Utc::now() + chrono::Duration::hours(2);
    assert_eq!(service.evict_idle(later), 1);
    assert!(matches!(service.view(&stale), Err(SessionError::NotFound)));
    assert!(service.is_empty());
}

#[tokio::test]
async fn sessions_with_an_insert_in_flight_are_not_evicted() {
    let gateway = Arc::new(GatedGateway::default());
    let service = session_service(gateway.clone());
    let id = session_on_contact(&service);

    let request = tokio::spawn({
        let service = Arc::clone(&service);
        let id = id.clone();
        async move { service.submit(&id).await }
    });
    gateway.entered.notified().await;

    let later = Utc::now() + chrono::Duration::hours(2);
    assert_eq!(service.evict_idle(later), 0);

    gateway.release.notify_one();
    let view = request
        .await
        .expect("submit task joins")
        .expect("submit succeeds");
    assert_eq!(view.step, Some(1));
}
