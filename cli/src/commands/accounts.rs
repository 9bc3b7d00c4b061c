use anyhow::Result;
use shared::AppContext;
use tracing::info;

use super::{to_json, Output};
use crate::render::{format_money, Align, Table};

pub async fn handle_accounts(ctx: &AppContext, username: &str, output: Output) -> Result<String> {
    info!(username, "Retrieving accounts");
    let accounts = ctx.accounts.list_accounts(username).await?;

    if output == Output::Json {
        return to_json(&accounts);
    }
    if accounts.is_empty() {
        return Ok(format!("No accounts found for user {}.", username));
    }

    let mut table = Table::new(&[
        ("Account", Align::Left),
        ("Name", Align::Left),
        ("Cash Balance", Align::Right),
    ]);
    for account in &accounts {
        table.push(vec![
            account.account_number.clone(),
            account.name.clone().unwrap_or_default(),
            format_money(account.cash_balance),
        ]);
    }
    Ok(table.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use chrono::{Duration, TimeZone, Utc};
    use shared::Account;

    #[tokio::test]
    async fn test_unknown_user_message() {
        let ctx = context();
        let text = handle_accounts(&ctx, "nobody", Output::Table).await.unwrap();
        assert_eq!(text, "No accounts found for user nobody.");
        let json = handle_accounts(&ctx, "nobody", Output::Json).await.unwrap();
        assert_eq!(json, "[]");
    }

    #[tokio::test]
    async fn test_accounts_listed_in_insertion_order() {
        let ctx = context();
        let opened = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, number) in ["acct-b", "acct-a"].iter().enumerate() {
            ctx.accounts
                .insert_account(&Account {
                    username: "mike".to_string(),
                    account_number: number.to_string(),
                    name: Some("Michael Jones".to_string()),
                    cash_balance: 1234.5,
                    opened_at: opened + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }

        let text = handle_accounts(&ctx, "mike", Output::Table).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "| Account | Name          | Cash Balance |");
        assert_eq!(lines[2], "| acct-b  | Michael Jones |    $1,234.50 |");
        assert!(lines[3].starts_with("| acct-a "));
    }
}
