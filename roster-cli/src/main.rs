//! Roster command-line client.
//!
//! Usage:
//!   roster --url https://abc.example.co --key <anon key> list
//!   roster add --name Ann --custom-id E1 --age 34
//!   roster delete 7
//!   roster watch
//!
//! `ROSTER_URL` and `ROSTER_KEY` may stand in for `--url` and `--key`.

use anyhow::Result;
use clap::Parser;
use roster_cli::{Args, Command, RosterConfig, TerminalPrompt, commands};
use roster_sync::SubmitOutcome;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let mut config = RosterConfig::load(args.config.as_deref())?;
    config.apply(args.overrides());
    debug!("Configuration: {:?}", config.sync);

    let mut sync = commands::connect(&config)?;

    let outcome = match &args.command {
        Command::List { format } => {
            println!("{}", commands::list(&mut sync, *format).await);
            return Ok(ExitCode::SUCCESS);
        }
        command @ Command::Add { .. } => {
            let form = command.form().unwrap_or_default();
            commands::add(&sync, &form, &TerminalPrompt::default()).await
        }
        Command::Delete { id, yes } => {
            commands::delete(&mut sync, id, &TerminalPrompt::new(*yes)).await?
        }
        Command::Watch => {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            commands::watch(sync, Arc::new(TerminalPrompt::default()), shutdown, |view| {
                println!("{}\n", view.to_text());
            })
            .await?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    Ok(match outcome {
        SubmitOutcome::Submitted => {
            info!("Submitted");
            ExitCode::SUCCESS
        }
        SubmitOutcome::Cancelled => ExitCode::SUCCESS,
        SubmitOutcome::Rejected(_) | SubmitOutcome::Failed(_) => ExitCode::FAILURE,
    })
}
