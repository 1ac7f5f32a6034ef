//! Example: generate a summary for a pull request.
//!
//! Run with: `cargo run --example generate -- https://github.com/acme/widgets/pull/42 PROJ-7`
//!
//! Configuration comes from `PR_SUMMARY_API_*` environment variables; log
//! verbosity from `RUST_LOG`.

use pr_summary_client::ui::{user_message, HealthIndicator};
use pr_summary_client::{ClientConfig, HealthMonitor, SubmitOutcome, SummaryClient, SummaryForm};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let pr_url = args
        .next()
        .ok_or("usage: generate <github-pr-url> [ticket-id]")?;
    let ticket = args.next().unwrap_or_default();

    let client = Arc::new(SummaryClient::new(ClientConfig::from_env()?)?);

    // Probe once up front so an unreachable service is reported before submitting.
    let monitor = HealthMonitor::spawn_default(client.clone());
    let mut health = monitor.subscribe();
    health.changed().await?;
    if *health.borrow() == HealthIndicator::Unhealthy {
        eprintln!("Summary service is unhealthy; not submitting.");
        return Ok(());
    }

    let form = SummaryForm::new().with_health(health);
    form.set_source(pr_url);
    form.set_secondary(ticket);

    match form.submit(&client).await {
        SubmitOutcome::Completed(summary) => {
            println!("Business context:\n{}\n", summary.business_context());
            println!("Code changes:\n{}\n", summary.code_change_summary());
            println!("Impact:\n{}\n", summary.business_code_impact());
            println!("Suggested tests:");
            for case in summary.suggested_test_cases() {
                println!("  - {}", case);
            }
            println!("\nRisk: {}", summary.risk_complexity());
            println!("Reviewer guidance:\n{}", summary.reviewer_guidance());
        }
        SubmitOutcome::Invalid(errors) => {
            for e in errors {
                eprintln!("{}: {}", e.field, e.message);
            }
        }
        SubmitOutcome::Failed(err) => eprintln!("{}", user_message(&err)),
        SubmitOutcome::Suppressed | SubmitOutcome::Discarded => {
            eprintln!("Submission did not run.");
        }
    }

    Ok(())
}
