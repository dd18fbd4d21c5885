//! CLI mode
//!
//! 单次执行后台任务，便于 cron 调度或排查问题。

use anyhow::Result;
use colored::Colorize;

use crate::runtime::lifetime::AppState;

pub async fn run_payouts_once(state: &AppState) -> Result<()> {
    let report = state.payout_scheduler.run_once().await?;
    println!(
        "{} {} payouts created, {} below minimum, {} already claimed, {} failed ({} groups across {} events)",
        "[payouts]".green().bold(),
        report.payouts_created,
        report.skipped_below_minimum,
        report.already_claimed,
        report.failed,
        report.groups_seen,
        report.events_scanned
    );
    if report.failed > 0 {
        anyhow::bail!("{} payout groups failed", report.failed);
    }
    Ok(())
}

pub async fn run_performance_once(state: &AppState) -> Result<()> {
    let report = state
        .performance_refresher
        .run_once(&state.config.jobs.performance_periods)
        .await?;
    println!(
        "{} {} snapshots written across {} periods, {} failed",
        "[performance]".green().bold(),
        report.snapshots_written,
        report.periods,
        report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} performance snapshots failed", report.failed);
    }
    Ok(())
}
