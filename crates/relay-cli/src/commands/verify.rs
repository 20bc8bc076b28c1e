//! The `verify` command.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use relay_config::Overrides;
use relay_telegram::{CheckOutcome, build_bot, verify};

/// Run every check and print the results. Returns whether all passed.
pub(crate) async fn run(config: Option<&Path>) -> Result<bool> {
    let settings = relay_config::load(config, &Overrides::default())
        .context("failed to load configuration")?;
    relay_telemetry::setup_logging(&settings.logging).context("failed to set up logging")?;

    println!("{}", "Telegram Relay - Connectivity Check".cyan().bold());
    println!("  Chat: {}", settings.chat);
    println!();

    let bot = build_bot(&settings.bot_token);
    let outcomes = verify(&bot, settings.chat).await;
    for outcome in &outcomes {
        println!("{}", render(outcome));
    }

    let failed = failures(&outcomes);
    println!();
    if failed == 0 {
        println!("{}", "All checks passed".green().bold());
    } else {
        println!("{}", format!("{failed} check(s) failed").red().bold());
    }
    Ok(failed == 0)
}

fn render(outcome: &CheckOutcome) -> String {
    let state = if outcome.passed {
        "PASS".green()
    } else {
        "FAIL".red()
    };
    format!("  {state} {} - {}", outcome.name, outcome.detail.dimmed())
}

fn failures(outcomes: &[CheckOutcome]) -> usize {
    outcomes.iter().filter(|o| !o.passed).count()
}
