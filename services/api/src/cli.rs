use crate::server;
use crate::submit::{print_schema, run_submit, SubmitArgs};
use clap::{Args, Parser, Subcommand};
use creator_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Creator Intake",
    about = "Serve and exercise the creator application intake form",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk an application file through the three form steps and submit it
    Submit(SubmitArgs),
    /// Print every step with its fields, columns and validation messages
    Schema,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Submit(args) => run_submit(args).await,
        Command::Schema => {
            print_schema();
            Ok(())
        }
    }
}
