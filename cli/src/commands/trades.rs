use anyhow::Result;
use futures::TryStreamExt;
use serde::Serialize;
use shared::{AppContext, Trade, TradeQuery};

use super::{to_json, Output};
use crate::render::{format_count, format_money, Align, Table};

#[derive(Serialize)]
struct TradeView<'a> {
    #[serde(flatten)]
    trade: &'a Trade,
    amount: f64,
}

/// Prints trade history for the already validated `query`.
pub async fn handle_trades(ctx: &AppContext, query: &TradeQuery, output: Output) -> Result<String> {
    let trades: Vec<Trade> = ctx
        .trades
        .fetch(query)
        .await?
        .try_collect()
        .await
        .map_err(shared::Error::store("read trades"))?;

    if output == Output::Json {
        let views: Vec<TradeView> = trades
            .iter()
            .map(|trade| TradeView {
                trade,
                amount: trade.amount(),
            })
            .collect();
        return to_json(&views);
    }
    if trades.is_empty() {
        return Ok("No trades found for this account with the given filters.".to_string());
    }

    let mut table = Table::new(&[
        ("Datetime", Align::Left),
        ("Type", Align::Left),
        ("Symbol", Align::Left),
        ("Shares", Align::Right),
        ("Price", Align::Right),
        ("Amount", Align::Right),
    ]);
    for trade in &trades {
        table.push(vec![
            trade.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            trade.trade_type.to_string(),
            trade.symbol.clone(),
            format_count(trade.quantity.into()),
            format_money(trade.price),
            format_money(trade.amount()),
        ]);
    }
    Ok(table.render())
}
