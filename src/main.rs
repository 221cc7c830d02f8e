// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::Parser;

use robots_fleet::config::{load_rows, CliArgs, RuntimeBuilder};
use robots_fleet::engine::{JobPlan, JobReport};
use robots_fleet::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing("info")?;

    let config = args.resolve_config().context("loading configuration")?;
    let rows = load_rows(&config.worker.input)
        .with_context(|| format!("reading input {}", config.worker.input.display()))?;
    let plan = JobPlan::from_config(&config.job)?;
    if (rows.len() as u64) < plan.total_items() {
        tracing::warn!(
            rows = rows.len(),
            items = plan.total_items(),
            "Input has fewer rows than the job covers; trailing units will come back short"
        );
    }

    println!("🚀 robots-fleet");
    println!("═══════════════════════════════════");
    println!("Strategy:  {}", config.dispatch.strategy.as_str());
    println!("Input:     {} ({} rows)", config.worker.input.display(), rows.len());
    println!("Units:     {}", plan.split()?.len());
    println!();

    let runtime = RuntimeBuilder::local(&config, rows)?;
    let store = runtime.store();
    let outcome = runtime.runner().run(&plan).await;
    runtime.shutdown().await;
    let report = outcome?;

    print_summary(&report);

    if let Some(path) = &args.output {
        let merged = store.get(&report.consolidation.output_key).await?;
        tokio::fs::write(path, merged)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        println!("📄 Wrote {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &JobReport) {
    println!("{}", "─".repeat(40));
    println!(
        "Dispatched {}/{} units in {} calls",
        report.dispatch.dispatched, report.planned, report.dispatch.calls
    );
    for error in &report.dispatch.errors {
        println!("  ❌ {}", error);
    }
    if let Some(reserved) = report.reservation {
        println!("Reserved concurrency: {}", reserved);
    }
    if let Some(tracking) = &report.tracking {
        println!(
            "Drained after {} polls ({} failed) in {:?}",
            tracking.ticks, tracking.failed_polls, tracking.elapsed
        );
    }
    match report.dead_letter.as_ref().map(|d| d.failed_count) {
        Some(Some(0)) => println!("Dead-letter queue is empty"),
        Some(Some(count)) => println!("⚠️  {} units dead-lettered", count),
        Some(None) => println!("⚠️  Dead-letter queue could not be read"),
        None => {}
    }
    println!(
        "Merged {} artifacts, {} records -> {} ({} bytes{})",
        report.consolidation.artifacts,
        report.consolidation.records,
        report.consolidation.output_key,
        report.consolidation.bytes,
        if report.consolidation.compressed {
            ", gzip"
        } else {
            ""
        }
    );
    println!(
        "{} in {:?}",
        if report.is_clean() { "✅ Done" } else { "⚠️  Done with failures" },
        report.elapsed
    );
}
