//! Synthetic demo data: users, instruments, accounts, positions and trades.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::{Builder, Context, Timestamp, Uuid};

use crate::models::{Account, Position, Trade, TradeType, User};

/// (username, full name)
pub const DEMO_USERS: [(&str, &str); 5] = [
    ("mike", "Michael Jones"),
    ("stacy", "Stacy Malibu"),
    ("john", "John Doe"),
    ("marie", "Marie Condo"),
    ("tom", "Tomas Train"),
];

pub const DEMO_INSTRUMENTS: [&str; 28] = [
    "ETSY", "PINS", "SE", "SHOP", "SQ", "MELI", "ISRG", "DIS", "BRK.A", "AMZN", "VOO", "VEA",
    "VGT", "VIG", "MBB", "QQQ", "SPY", "BSV", "BND", "MUB", "VSMPX", "VFIAX", "FXAIX", "VTSAX",
    "SPAXX", "VMFXX", "FDRXX", "FGXX",
];

/// 2020-01-01T00:00:00Z, start of the generated trade history.
const EARLIEST_TRADE_SECS: i64 = 1_577_836_800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    pub accounts_count: usize,
    pub positions_per_account: usize,
    pub trades_per_account: usize,
    /// Fixed seed for reproducible datasets.
    pub seed: Option<u64>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            accounts_count: 10,
            positions_per_account: 10,
            trades_per_account: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemoData {
    pub users: Vec<User>,
    pub instruments: Vec<String>,
    pub accounts: Vec<Account>,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
}

/// Issues time-based (v1) trade ids, as required by `TIMEUUID` columns.
pub struct TradeIdGenerator {
    context: Context,
    node_id: [u8; 6],
}

impl TradeIdGenerator {
    pub fn new(clock_seq: u16, node_id: [u8; 6]) -> Self {
        Self {
            context: Context::new(clock_seq),
            node_id,
        }
    }

    pub fn next_id(&self, at: DateTime<Utc>) -> Uuid {
        let seconds = at.timestamp().max(0) as u64;
        let ts = Timestamp::from_unix(&self.context, seconds, at.timestamp_subsec_nanos());
        Uuid::new_v1(ts, &self.node_id)
    }
}

pub struct FixtureGenerator {
    config: FixtureConfig,
    rng: StdRng,
    ids: TradeIdGenerator,
}

/// Mock quote for `symbol`: a random price up to the sum of its bytes.
fn mock_price(rng: &mut StdRng, symbol: &str) -> f64 {
    let ceiling: u32 = symbol.bytes().map(u32::from).sum();
    let price = rng.gen_range(1.0..(ceiling.max(2) as f64));
    (price * 100.0).round() / 100.0
}

impl FixtureGenerator {
    pub fn new(config: FixtureConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let ids = TradeIdGenerator::new(rng.gen(), rng.gen());
        Self { config, rng, ids }
    }

    pub fn users() -> Vec<User> {
        DEMO_USERS
            .iter()
            .map(|(username, full_name)| User {
                username: username.to_string(),
                full_name: full_name.to_string(),
            })
            .collect()
    }

    /// Builds a dataset whose timestamps all fall at or before `now`.
    pub fn generate(&mut self, now: DateTime<Utc>) -> DemoData {
        let users = Self::users();
        let accounts = self.accounts(&users, now);
        let mut positions = Vec::new();
        let mut trades = Vec::new();
        for account in &accounts {
            positions.extend(self.positions(&account.account_number));
            trades.extend(self.trades(&account.account_number, now));
        }
        DemoData {
            users,
            instruments: DEMO_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
            accounts,
            positions,
            trades,
        }
    }

    fn accounts(&mut self, users: &[User], now: DateTime<Utc>) -> Vec<Account> {
        let count = self.config.accounts_count;
        let mut accounts = Vec::with_capacity(count);
        for i in 0..count {
            let Some(user) = users.choose(&mut self.rng) else {
                break;
            };
            let cash_balance: f64 = self.rng.gen_range(0.1..100_000.0);
            accounts.push(Account {
                username: user.username.clone(),
                account_number: Builder::from_random_bytes(self.rng.gen())
                    .into_uuid()
                    .to_string(),
                name: Some(user.full_name.clone()),
                cash_balance: (cash_balance * 100.0).round() / 100.0,
                // one second apart so the clustering order follows creation order
                opened_at: now - Duration::seconds((count - i) as i64),
            });
        }
        accounts
    }

    fn positions(&mut self, account: &str) -> Vec<Position> {
        let symbols: Vec<&str> = DEMO_INSTRUMENTS
            .choose_multiple(&mut self.rng, self.config.positions_per_account)
            .copied()
            .collect();
        symbols
            .into_iter()
            .map(|symbol| {
                let quantity = self.rng.gen_range(1..=500);
                let cost_basis = quantity as f64 * mock_price(&mut self.rng, symbol);
                Position {
                    account: account.to_string(),
                    symbol: symbol.to_string(),
                    quantity,
                    cost_basis: (cost_basis * 100.0).round() / 100.0,
                }
            })
            .collect()
    }

    fn trades(&mut self, account: &str, now: DateTime<Utc>) -> Vec<Trade> {
        let earliest = Utc
            .timestamp_opt(EARLIEST_TRADE_SECS, 0)
            .single()
            .unwrap_or(now);
        let span = (now - earliest).num_seconds().max(1);
        (0..self.config.trades_per_account)
            .map(|_| {
                let timestamp = earliest + Duration::seconds(self.rng.gen_range(0..span));
                let symbol = DEMO_INSTRUMENTS[self.rng.gen_range(0..DEMO_INSTRUMENTS.len())];
                let trade_type = TradeType::ALL[self.rng.gen_range(0..TradeType::ALL.len())];
                Trade {
                    account: account.to_string(),
                    trade_id: self.ids.next_id(timestamp),
                    symbol: symbol.to_string(),
                    trade_type,
                    quantity: self.rng.gen_range(1..=5000),
                    price: mock_price(&mut self.rng, symbol),
                    timestamp,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seeded(accounts: usize, positions: usize, trades: usize) -> FixtureGenerator {
        FixtureGenerator::new(FixtureConfig {
            accounts_count: accounts,
            positions_per_account: positions,
            trades_per_account: trades,
            seed: Some(42),
        })
    }

    #[test]
    fn test_generate_sizes() {
        let now = Utc::now();
        let data = seeded(3, 4, 20).generate(now);
        assert_eq!(data.users.len(), DEMO_USERS.len());
        assert_eq!(data.instruments.len(), DEMO_INSTRUMENTS.len());
        assert_eq!(data.accounts.len(), 3);
        assert_eq!(data.positions.len(), 12);
        assert_eq!(data.trades.len(), 60);
        assert!(data.trades.iter().all(|t| t.timestamp <= now));
    }

    #[test]
    fn test_positions_are_unique_per_account() {
        let data = seeded(2, 50, 0).generate(Utc::now());
        // capped by the number of instruments
        assert_eq!(data.positions.len(), 2 * DEMO_INSTRUMENTS.len());
        let keys: HashSet<(&str, &str)> = data
            .positions
            .iter()
            .map(|p| (p.account.as_str(), p.symbol.as_str()))
            .collect();
        assert_eq!(keys.len(), data.positions.len());
    }

    #[test]
    fn test_trade_ids_are_unique_time_uuids() {
        let data = seeded(1, 0, 500).generate(Utc::now());
        let ids: HashSet<Uuid> = data.trades.iter().map(|t| t.trade_id).collect();
        assert_eq!(ids.len(), 500);
        assert!(data.trades.iter().all(|t| t.trade_id.get_version_num() == 1));
    }

    #[test]
    fn test_accounts_open_in_order() {
        let data = seeded(5, 0, 0).generate(Utc::now());
        assert!(data
            .accounts
            .windows(2)
            .all(|pair| pair[0].opened_at < pair[1].opened_at));
    }

    #[test]
    fn test_seed_reproduces_dataset() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let first = seeded(2, 3, 5).generate(now);
        let second = seeded(2, 3, 5).generate(now);
        assert_eq!(first.accounts, second.accounts);
        assert_eq!(first.trades, second.trades);
    }
}
