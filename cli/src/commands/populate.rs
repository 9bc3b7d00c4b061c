use anyhow::Result;
use chrono::Utc;
use shared::fixtures::{FixtureConfig, FixtureGenerator};
use shared::populate::{populate, PopulateSummary};
use shared::AppContext;
use tracing::info;

use super::{to_json, Output};
use crate::render::format_count;

const SAMPLE_ACCOUNTS: usize = 10;

pub async fn handle_populate(
    ctx: &AppContext,
    config: FixtureConfig,
    output: Output,
) -> Result<String> {
    let data = FixtureGenerator::new(config).generate(Utc::now());
    let summary = populate(ctx, &data).await?;
    info!(
        accounts = summary.accounts_count(),
        positions = summary.positions_count,
        trades = summary.trades_count,
        "Populate finished"
    );

    match output {
        Output::Json => to_json(&summary),
        Output::Table => Ok(render_summary(&summary)),
    }
}

fn render_summary(summary: &PopulateSummary) -> String {
    let sample: Vec<&String> = summary.accounts.iter().take(SAMPLE_ACCOUNTS).collect();
    let mut lines = vec![
        "Populate summary:".to_string(),
        format!(
            "- Accounts created: {}",
            format_count(summary.accounts_count() as i64)
        ),
        format!(
            "- Positions created: {}",
            format_count(summary.positions_count as i64)
        ),
        format!(
            "- Trades created: {}",
            format_count(summary.trades_count as i64)
        ),
        format!("- Sample account IDs (first {}):", sample.len()),
    ];
    lines.extend(sample.into_iter().map(|account| format!("    {}", account)));
    lines.join("\n")
}
