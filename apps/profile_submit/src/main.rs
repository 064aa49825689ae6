use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use client_core::{load_settings, load_settings_from, AuthSession, SupabaseClient};
use shared::protocol::InsertOutcome;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wizard::{Navigation, SubmissionError, WizardController};

mod draft;

use draft::{load_logo, ProfileDraft};

const ACCESS_TOKEN_ENV: &str = "SUPABASE_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(about = "Walk a startup profile draft through the wizard and submit it")]
struct Args {
    /// TOML file holding the profile fields.
    #[arg(long)]
    draft: PathBuf,
    /// Backend settings file; defaults to ./backend.toml.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Access token of the signed-in user.
    #[arg(long)]
    access_token: Option<String>,
}

/// Stops before submitting when the session ended while the draft was walked.
fn ensure_still_signed_in(navigation: Option<Navigation>) -> Result<()> {
    match navigation {
        Some(Navigation::SignIn) => bail!("signed out before submission; sign in again"),
        Some(Navigation::Directory) | None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok()),
        None => load_settings(),
    }
    .context("invalid backend settings")?;
    let policy = settings.upload_failure_policy;
    let client = SupabaseClient::new(settings);

    match args
        .access_token
        .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
        .filter(|token| !token.trim().is_empty())
    {
        Some(token) => {
            let session = AuthSession::from_access_token(token.trim())
                .context("access token rejected")?;
            client.install_session(session).await;
        }
        None => warn!("no access token supplied; submission will be refused"),
    }

    let draft = ProfileDraft::load(&args.draft).await?;
    let mut form = draft.to_form()?;
    if let Some(path) = draft.logo_path(&args.draft) {
        form.logo = Some(load_logo(&path).await?);
    }

    let mut controller = WizardController::new(client.clone(), client.clone(), client.clone())
        .with_upload_failure_policy(policy)
        .with_form(form);
    controller.initialize().await;

    while !controller.step().is_last() {
        let step = controller.step();
        println!("[{:>3}%] {step}: {}", step.progress_percent(), step.description());
        if controller.next() == step {
            for error in controller.errors().iter() {
                println!("    {error}");
            }
            bail!("{step} is incomplete");
        }
    }
    let last = controller.step();
    println!("[{:>3}%] {last}: {}", last.progress_percent(), last.description());
    ensure_still_signed_in(controller.poll_auth_events())?;

    match controller.submit().await {
        Ok(receipt) => {
            let outcome = match receipt.outcome {
                InsertOutcome::Created => "created",
                InsertOutcome::AlreadyRecorded => "already recorded",
            };
            println!(
                "Profile {outcome}: submission_id={} user_id={} logo_url={}",
                receipt.submission_id,
                receipt.user_id,
                receipt.logo_url.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Err(error) => {
            eprintln!("{}", error.user_message());
            if let SubmissionError::Validation(failed) = &error {
                for field_error in failed.errors.iter() {
                    eprintln!("    {field_error}");
                }
            }
            if error.requires_reauth() {
                eprintln!("Supply a fresh token with --access-token or {ACCESS_TOKEN_ENV}.");
            }
            Err(anyhow!(error))
        }
    }
}
