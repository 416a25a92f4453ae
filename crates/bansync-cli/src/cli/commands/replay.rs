//! `bansync replay` - run a scenario against an in-memory fleet.

use anyhow::Result;
use async_trait::async_trait;
use bansync::core::WebhookPayload;
use bansync::{NotificationSink, Router};
use colored::Colorize;
use std::sync::Arc;

use super::Context;
use crate::cli::args::ReplayArgs;
use crate::config;
use crate::output::OutputFormat;
use crate::scenario::{self, ReplayReport, Scenario};

/// Prints payloads instead of posting them.
struct StdoutSink {
    label: &'static str,
}

#[async_trait]
impl NotificationSink for StdoutSink {
    async fn deliver(&self, payload: &WebhookPayload) -> bansync::core::Result<()> {
        let body = serde_json::to_string_pretty(payload)?;
        println!("--- {} ---\n{body}", self.label);
        Ok(())
    }
}

pub async fn execute(ctx: Context, args: ReplayArgs) -> Result<()> {
    let settings = config::load_effective(&ctx.config_path)?;
    let scenario = Scenario::load(&args.file)?;
    let fleet = Arc::new(scenario.fleet());

    let mut builder = Router::builder(fleet.clone(), fleet.clone()).config(settings);
    if args.dry_run {
        builder = builder
            .sync_sink(Arc::new(StdoutSink { label: "sync result" }))
            .mass_sink(Arc::new(StdoutSink { label: "mass alert" }));
    }
    let router = Arc::new(builder.build()?);

    let report = scenario::replay(&scenario, router, &fleet, args.realtime).await?;

    match ctx.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Pretty => print_report(&report, ctx.verbose),
    }
    Ok(())
}

fn print_report(report: &ReplayReport, verbose: bool) {
    println!();
    println!("{}", "Final ban lists:".bold());
    for node in &report.nodes {
        let bans = if node.bans.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            node.bans
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("  {} ({}): {}", node.name.cyan(), node.id, bans);
    }

    if verbose {
        println!();
        println!(
            "{} events, {} peer calls, {} fleet notifications fed back",
            report.events, report.peer_calls, report.echoes
        );
    }
}
