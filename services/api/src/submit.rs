use crate::infra::{ConsoleSink, DryRunGateway};
use clap::Args;
use creator_intake::config::{AppConfig, SubmissionConfig};
use creator_intake::error::AppError;
use creator_intake::telemetry;
use creator_intake::workflows::intake::{
    ApplicationGateway, ApplicationSchema, FormPatch, FormStep, FormValues,
    RestApplicationGateway, StepFormController, SubmitError, TransitionRefused,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// JSON file holding the form values, keyed by the form's camelCase field names
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Print the insert payload instead of sending it to the backend
    #[arg(long)]
    pub(crate) dry_run: bool,
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let raw = std::fs::read_to_string(&args.file)?;
    let values: FormValues = serde_json::from_str(&raw)?;

    if args.dry_run {
        let gateway = Arc::new(DryRunGateway::default());
        return walk_and_submit(gateway, config.submission, &values).await;
    }

    let gateway = RestApplicationGateway::new(config.backend()?)?;
    walk_and_submit(Arc::new(gateway), config.submission, &values).await
}

/// Fill each step in order, advancing with `next`, then submit from the last step.
pub(crate) async fn walk_and_submit<G>(
    gateway: Arc<G>,
    settings: SubmissionConfig,
    values: &FormValues,
) -> Result<(), AppError>
where
    G: ApplicationGateway + 'static,
{
    let console = Arc::new(ConsoleSink);
    let mut controller = StepFormController::new(gateway, console.clone(), console, settings);

    for step in FormStep::ordered() {
        println!("{step}");
        controller.edit(FormPatch::for_step(values, step))?;
        if step.is_last() {
            break;
        }
        if let Err(refused) = controller.next() {
            report_refusal(&refused);
            return Err(SubmitError::Refused(refused).into());
        }
    }

    match controller.submit().await {
        Ok(receipt) => {
            if let Err(err) = receipt.redirect.await {
                warn!(error = %err, "redirect task did not complete");
            }
            Ok(())
        }
        Err(err) => {
            if let SubmitError::Refused(refused) = &err {
                report_refusal(refused);
            }
            Err(err.into())
        }
    }
}

fn report_refusal(refused: &TransitionRefused) {
    match refused {
        TransitionRefused::Invalid(report) => {
            for (field, message) in report.errors() {
                eprintln!("  {field}: {message}");
            }
        }
        other => eprintln!("  {other}"),
    }
}

pub(crate) fn print_schema() {
    for step in FormStep::ordered() {
        println!("{step} [{}%]", step.progress_percent());
        for field in step.fields() {
            let rule = match ApplicationSchema::message_for(*field) {
                "" => "optional",
                message => message,
            };
            println!("  {:<18} {:<20} {rule}", field.name(), field.column());
        }
    }
}
