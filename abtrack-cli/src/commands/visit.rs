use std::path::{Path, PathBuf};
use std::sync::Arc;

use abtrack_core::{TrackingAgent, TrackingParameters, TriggerOutcome, VISIT_PAGE_EVENT};
use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::config::ConfigLoader;
use crate::profile::{self, Profile};

#[derive(Args)]
pub struct VisitArgs {
    /// JSON file with the tracking parameters rendered into the page
    #[arg(short, long)]
    pub params: PathBuf,

    /// Custom events the page fires after loading (repeatable)
    #[arg(short, long = "event")]
    pub events: Vec<String>,

    /// Profile directory (defaults to the configured one)
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

#[derive(Args)]
pub struct TriggerArgs {
    /// Event name to fire
    pub event: String,

    /// JSON file with the tracking parameters of the page firing the event
    #[arg(short, long)]
    pub params: PathBuf,

    /// Profile directory (defaults to the configured one)
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

/// Load a page: consent, load-time visit-page, registration, then any
/// custom events.
pub async fn run_visit(args: VisitArgs) -> Result<()> {
    let params = read_params(&args.params)?;
    let agent = start(params, args.profile)?;

    if !agent.is_active() {
        println!("Page not tracked (no parameters or tracking refused)");
        return Ok(());
    }

    if let Some(outcome) = agent.page_visit() {
        print_outcome(VISIT_PAGE_EVENT, outcome);
    }

    for event in &args.events {
        if let Some(outcome) = agent.trigger_event(event) {
            print_outcome(event, &outcome);
        }
    }

    agent.settle().await;
    info!("Page load settled");
    Ok(())
}

/// Fire a single event on an already-loaded page.
///
/// The page's own visit-page event still runs first, as it would in a
/// browser, but no registration is attempted for the page's test.
pub async fn run_trigger(args: TriggerArgs) -> Result<()> {
    let mut params = read_params(&args.params)?;
    if let Some(params) = params.as_mut() {
        params.test_id = None;
    }

    let agent = start(params, args.profile)?;
    if !agent.is_active() {
        println!("Event not processed (page not tracked)");
        return Ok(());
    }

    if let Some(outcome) = agent.page_visit() {
        print_outcome(VISIT_PAGE_EVENT, outcome);
    }

    // visit-page already fired when the page loaded
    if args.event != VISIT_PAGE_EVENT
        && let Some(outcome) = agent.trigger_event(&args.event)
    {
        print_outcome(&args.event, &outcome);
    }

    agent.settle().await;
    Ok(())
}

fn start(params: Option<TrackingParameters>, profile_dir: Option<PathBuf>) -> Result<TrackingAgent> {
    let config = ConfigLoader::load()?;
    let profile = Profile::open(&config, profile_dir)?;
    let transport = profile::transport(&config)?;

    Ok(TrackingAgent::start(
        params,
        &profile::consent(&config),
        profile.stores(),
        Arc::new(transport),
    ))
}

fn read_params(path: &Path) -> Result<Option<TrackingParameters>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    TrackingParameters::from_json(&json)
        .with_context(|| format!("Invalid tracking parameters in {}", path.display()))
}

fn print_outcome(event: &str, outcome: &TriggerOutcome) {
    if outcome.is_noop() {
        println!("{event}: no pending goals");
        return;
    }

    for (test_id, version) in &outcome.reported {
        println!("{event}: reported goal for test {test_id} ({version})");
    }
    for test_id in &outcome.skipped {
        println!("{event}: dropped goal for test {test_id} (no assignment cookie)");
    }
}
