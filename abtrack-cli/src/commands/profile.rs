use std::path::PathBuf;

use abtrack_core::{AssignmentStore, TestId};
use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ConfigLoader;
use crate::profile::Profile;

#[derive(Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,

    /// Profile directory (defaults to the configured one)
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show cookies and pending goals
    Show,
    /// Clear cookies and/or pending goals (both when neither flag is given)
    Clear {
        #[arg(long)]
        cookies: bool,
        #[arg(long)]
        ledger: bool,
    },
    /// Delete the assignment cookie of one test
    Forget {
        /// Test id
        test_id: String,
    },
}

pub fn run(args: ProfileArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let profile = Profile::open(&config, args.profile)?;

    match args.command {
        ProfileCommands::Show => show(&profile),
        ProfileCommands::Clear { cookies, ledger } => {
            let both = !cookies && !ledger;
            if cookies || both {
                profile.assignments.clear()?;
                println!("Cookies cleared");
            }
            if ledger || both {
                profile.ledger.clear()?;
                println!("Pending goals cleared");
            }
            Ok(())
        }
        ProfileCommands::Forget { test_id } => {
            let test_id = TestId::new(test_id);
            if profile.assignments.forget(&test_id)? {
                println!("Forgot assignment for test {test_id}");
            } else {
                println!("No assignment for test {test_id}");
            }
            Ok(())
        }
    }
}

fn show(profile: &Profile) -> Result<()> {
    println!("Profile: {}", profile.dir.display());

    let jar = profile.assignments.snapshot()?;
    println!("\nCookies ({}):", jar.len());
    for cookie in jar.iter() {
        println!("  {}", cookie.to_set_cookie());
    }

    let ledger = profile.pending_goals().snapshot()?;
    println!("\nPending goals ({}):", ledger.len());
    for (scope, event, test_id) in ledger.iter() {
        let version = profile
            .assignments
            .get_assigned_version(test_id)?
            .map(|v| v.to_string())
            .unwrap_or_else(|| "no cookie".to_string());
        println!("  [{scope}] {event}: test {test_id} ({version})");
    }

    Ok(())
}
