use anyhow::Result;
use shared::AppContext;
use tracing::info;

use super::{to_json, Output};
use crate::render::{format_count, format_money, Align, Table};

pub async fn handle_positions(ctx: &AppContext, account: &str, output: Output) -> Result<String> {
    info!(account, "Retrieving positions");
    let positions = ctx.positions.list_positions(account).await?;

    if output == Output::Json {
        return to_json(&positions);
    }

    let mut text = format!("Positions for account {}:\n", account);
    if positions.is_empty() {
        text.push_str("No positions found for this account.");
        return Ok(text);
    }

    let mut table = Table::new(&[
        ("Symbol", Align::Left),
        ("Quantity", Align::Right),
        ("Cost Basis", Align::Right),
    ]);
    for position in &positions {
        table.push(vec![
            position.symbol.clone(),
            format_count(position.quantity.into()),
            format_money(position.cost_basis),
        ]);
    }
    text.push_str(&table.render());
    Ok(text)
}
