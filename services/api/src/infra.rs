use async_trait::async_trait;
use creator_intake::workflows::intake::{
    Application, ApplicationGateway, InsertError, Navigator, Notification, NotificationVariant,
    Notifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Gateway that prints the insert payload instead of sending it.
#[derive(Default, Clone)]
pub(crate) struct DryRunGateway {
    rows: Arc<Mutex<Vec<Application>>>,
}

impl DryRunGateway {
    pub(crate) fn rows(&self) -> Vec<Application> {
        self.rows.lock().expect("dry-run mutex poisoned").clone()
    }
}

#[async_trait]
impl ApplicationGateway for DryRunGateway {
    async fn insert(&self, rows: Vec<Application>) -> Result<(), InsertError> {
        let payload = serde_json::to_string_pretty(&rows)
            .map_err(|err| InsertError::Unknown(Some(format!("payload not serializable: {err}"))))?;
        info!(rows = rows.len(), "dry run, payload not sent");
        println!("{payload}");

        self.rows
            .lock()
            .expect("dry-run mutex poisoned")
            .extend(rows);
        Ok(())
    }
}

/// Notifier and navigator for the terminal.
#[derive(Default, Clone, Copy)]
pub(crate) struct ConsoleSink;

impl Notifier for ConsoleSink {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            NotificationVariant::Default => {
                println!("{}: {}", notification.title, notification.description)
            }
            NotificationVariant::Destructive => {
                eprintln!("{}: {}", notification.title, notification.description)
            }
        }
    }
}

impl Navigator for ConsoleSink {
    fn navigate(&self, route: &str) {
        println!("navigating to {route}");
    }
}
